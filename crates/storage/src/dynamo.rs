use std::collections::HashMap;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, ReturnValue, WriteRequest};
use aws_sdk_dynamodb::Client;
use pantry_core::{parse_iso_date, InventoryItem, ItemId, NewItem, Quantity, ISO_DATE_FORMAT};
use tracing::instrument;

use crate::store::{sort_by_expiry, InventoryStore, StorageError};

/// BatchWriteItem accepts at most this many requests per call.
const BATCH_WRITE_LIMIT: usize = 25;
const MAX_BATCH_RETRIES: u32 = 8;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Wait before resubmitting unprocessed batch items: 50 ms doubling per attempt, capped at 3.2 s.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.pow(attempt.min(6))
}

type Attributes = HashMap<String, AttributeValue>;

/// DynamoDB backend.
///
/// The table is created out of band with a string partition key `id`. Items
/// carry `name`, `purchase_date`, `expiry_date` and `quantity` as string
/// attributes; `quantity` may also be a number when written by other tools.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Credentials come from the default AWS provider chain
    /// (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, profile files, ...).
    pub async fn connect(table: String, region: String, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = endpoint {
            tracing::info!(%endpoint, "Using custom DynamoDB endpoint");
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        Self {
            client: Client::new(&config),
            table,
        }
    }

    async fn scan_all(&self, projection: Option<&str>) -> Result<Vec<Attributes>, StorageError> {
        let mut items = Vec::new();
        let mut start_key: Option<Attributes> = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .set_projection_expression(projection.map(str::to_string))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(dynamo_err)?;

            items.extend(output.items().iter().cloned());
            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn dynamo_err<E: std::error::Error>(e: E) -> StorageError {
    StorageError::Dynamo(DisplayErrorContext(&e).to_string())
}

fn string_attr(attrs: &Attributes, key: &str) -> Option<String> {
    match attrs.get(key)? {
        AttributeValue::S(s) => Some(s.clone()),
        AttributeValue::N(n) => Some(n.clone()),
        _ => None,
    }
}

fn attrs_to_item(attrs: &Attributes) -> Result<InventoryItem, StorageError> {
    let id = string_attr(attrs, "id").ok_or_else(|| StorageError::Corrupt {
        id: "?".into(),
        reason: "missing id".into(),
    })?;
    let corrupt = |reason: String| StorageError::Corrupt {
        id: id.clone(),
        reason,
    };
    let field = |key: &'static str| {
        string_attr(attrs, key).ok_or_else(|| corrupt(format!("missing {key}")))
    };

    let name = field("name")?;
    let purchase_raw = field("purchase_date")?;
    let expiry_raw = field("expiry_date")?;
    let purchase_date =
        parse_iso_date(&purchase_raw).ok_or_else(|| corrupt(format!("purchase_date '{purchase_raw}'")))?;
    let expiry_date =
        parse_iso_date(&expiry_raw).ok_or_else(|| corrupt(format!("expiry_date '{expiry_raw}'")))?;
    let quantity = field("quantity")?
        .parse::<Quantity>()
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(InventoryItem {
        id: ItemId::new(id.clone()),
        name,
        purchase_date,
        expiry_date,
        quantity,
    })
}

fn item_to_attrs(item: &InventoryItem) -> Attributes {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(item.id.to_string())),
        ("name".to_string(), AttributeValue::S(item.name.clone())),
        (
            "purchase_date".to_string(),
            AttributeValue::S(item.purchase_date.format(ISO_DATE_FORMAT).to_string()),
        ),
        (
            "expiry_date".to_string(),
            AttributeValue::S(item.expiry_date.format(ISO_DATE_FORMAT).to_string()),
        ),
        ("quantity".to_string(), AttributeValue::S(item.quantity.to_string())),
    ])
}

impl InventoryStore for DynamoStore {
    #[instrument(skip(self, item), fields(table = %self.table))]
    async fn create(&self, item: NewItem) -> Result<InventoryItem, StorageError> {
        let item = item.with_id(ItemId::new(uuid::Uuid::new_v4().to_string()));
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item_to_attrs(&item)))
            .send()
            .await
            .map_err(dynamo_err)?;
        Ok(item)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn list(&self) -> Result<Vec<InventoryItem>, StorageError> {
        let mut items = self
            .scan_all(None)
            .await?
            .iter()
            .map(attrs_to_item)
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_expiry(&mut items);
        Ok(items)
    }

    #[instrument(skip(self, quantity), fields(table = %self.table))]
    async fn update_quantity(&self, id: &ItemId, quantity: &Quantity) -> Result<(), StorageError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("SET quantity = :val")
            .condition_expression("attribute_exists(id)")
            .expression_attribute_values(":val", AttributeValue::S(quantity.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(StorageError::NotFound(id.clone()))
            }
            Err(e) => Err(dynamo_err(e)),
        }
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn delete(&self, id: &ItemId) -> Result<bool, StorageError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key("id", AttributeValue::S(id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(dynamo_err)?;
        Ok(output.attributes().is_some_and(|a| !a.is_empty()))
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn clear_all(&self) -> Result<u64, StorageError> {
        let keys: Vec<String> = self
            .scan_all(Some("id"))
            .await?
            .iter()
            .filter_map(|attrs| string_attr(attrs, "id"))
            .collect();

        for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
            let mut requests = Vec::with_capacity(chunk.len());
            for key in chunk {
                let delete = DeleteRequest::builder()
                    .key("id", AttributeValue::S(key.clone()))
                    .build()
                    .map_err(dynamo_err)?;
                requests.push(WriteRequest::builder().delete_request(delete).build());
            }

            let mut pending = HashMap::from([(self.table.clone(), requests)]);
            let mut attempt = 0;
            while !pending.is_empty() {
                if attempt > 0 {
                    if attempt > MAX_BATCH_RETRIES {
                        return Err(StorageError::Dynamo(format!(
                            "Batch delete still throttled after {MAX_BATCH_RETRIES} retries"
                        )));
                    }
                    let delay = retry_delay(attempt - 1);
                    tracing::debug!(attempt, ?delay, "Retrying unprocessed deletes");
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
                let output = self
                    .client
                    .batch_write_item()
                    .set_request_items(Some(pending))
                    .send()
                    .await
                    .map_err(dynamo_err)?;
                pending = output
                    .unprocessed_items()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|(_, reqs)| !reqs.is_empty())
                    .collect();
            }
        }

        tracing::info!(removed = keys.len(), "Cleared DynamoDB inventory");
        Ok(keys.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> InventoryItem {
        InventoryItem {
            id: ItemId::new("0b6f1c2e-0000-4000-8000-000000000001"),
            name: "にんじん".into(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
            quantity: "3".parse().unwrap(),
        }
    }

    #[test]
    fn attributes_round_trip() {
        let item = sample();
        assert_eq!(attrs_to_item(&item_to_attrs(&item)).unwrap(), item);
    }

    #[test]
    fn numeric_quantity_attribute_is_accepted() {
        let mut attrs = item_to_attrs(&sample());
        attrs.insert("quantity".into(), AttributeValue::N("2.5".into()));
        let item = attrs_to_item(&attrs).unwrap();
        assert_eq!(item.quantity.to_string(), "2.5");
    }

    #[test]
    fn retry_delay_doubles_up_to_a_cap() {
        assert_eq!(retry_delay(0), Duration::from_millis(50));
        assert_eq!(retry_delay(1), Duration::from_millis(100));
        assert_eq!(retry_delay(3), Duration::from_millis(400));
        assert_eq!(retry_delay(6), Duration::from_millis(3200));
        assert_eq!(retry_delay(20), Duration::from_millis(3200));
    }

    #[test]
    fn missing_attribute_is_corrupt() {
        let mut attrs = item_to_attrs(&sample());
        attrs.remove("expiry_date");
        assert!(matches!(attrs_to_item(&attrs), Err(StorageError::Corrupt { .. })));
    }
}
