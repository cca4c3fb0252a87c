use chrono::NaiveDate;
use pantry_core::{
    default_expiry, quantity_text, ItemForm, NewItem, Quantity, ValidationError, ISO_DATE_FORMAT,
};
use serde::{Deserialize, Serialize};

/// A grocery line recognised on a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannedItem {
    pub name: String,
    pub quantity: Quantity,
}

/// What a receipt scan produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// At least one item was recognised.
    Items {
        items: Vec<ScannedItem>,
        raw_text: String,
    },
    /// The OCR service returned text but no line looked like an item.
    /// The raw text is shown so the user can read it manually.
    NothingExtracted { raw_text: String },
    /// The OCR service found no text at all.
    NoText,
}

/// One editable row of a receipt import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftRow {
    pub name: String,
    #[serde(deserialize_with = "quantity_text")]
    pub quantity: String,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

impl DraftRow {
    /// Rows left without a name are skipped on import rather than rejected.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    pub fn to_new_item(&self) -> Result<NewItem, ValidationError> {
        ItemForm {
            name: self.name.clone(),
            purchase_date: self.purchase_date.format(ISO_DATE_FORMAT).to_string(),
            expiry_date: self.expiry_date.format(ISO_DATE_FORMAT).to_string(),
            quantity: self.quantity.clone(),
        }
        .validate()
    }
}

/// Receipt items awaiting review before they are written to the inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptDraft {
    pub rows: Vec<DraftRow>,
}

impl ReceiptDraft {
    /// Every item is assumed bought on `purchase_date` and to keep for the
    /// default shelf life.
    pub fn from_items(items: &[ScannedItem], purchase_date: NaiveDate) -> Self {
        let expiry_date = default_expiry(purchase_date);
        let rows = items
            .iter()
            .map(|item| DraftRow {
                name: item.name.clone(),
                quantity: item.quantity.to_string(),
                purchase_date,
                expiry_date,
            })
            .collect();
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn draft_defaults_dates() {
        let items = vec![ScannedItem {
            name: "キャベツ".into(),
            quantity: Quantity::placeholder(),
        }];
        let draft = ReceiptDraft::from_items(&items, may(1));
        assert_eq!(
            draft.rows,
            vec![DraftRow {
                name: "キャベツ".into(),
                quantity: "1".into(),
                purchase_date: may(1),
                expiry_date: may(8),
            }]
        );
    }

    #[test]
    fn draft_row_validates_quantity() {
        let row = DraftRow {
            name: "牛乳".into(),
            quantity: " ".into(),
            purchase_date: may(1),
            expiry_date: may(8),
        };
        assert!(row.to_new_item().is_err());

        let row = DraftRow { quantity: "2".into(), ..row };
        let item = row.to_new_item().unwrap();
        assert_eq!(item.quantity.to_string(), "2");
        assert_eq!(item.expiry_date, may(8));
    }

    #[test]
    fn blank_rows_are_detected() {
        let row = DraftRow {
            name: "  ".into(),
            quantity: "1".into(),
            purchase_date: may(1),
            expiry_date: may(8),
        };
        assert!(row.is_blank());
    }

    #[test]
    fn edited_rows_accept_numeric_quantity() {
        let draft: ReceiptDraft = serde_json::from_str(
            r#"{"rows":[{"name":"卵","quantity":10,"purchase_date":"2024-05-01","expiry_date":"2024-05-15"}]}"#,
        )
        .unwrap();
        assert_eq!(draft.rows[0].quantity, "10");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ScanOutcome::NothingExtracted {
            raw_text: "???".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "nothing_extracted");
        assert_eq!(json["raw_text"], "???");
        assert_eq!(serde_json::to_value(ScanOutcome::NoText).unwrap()["status"], "no_text");
    }
}
