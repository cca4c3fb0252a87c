use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::dates::{default_expiry, parse_iso_date, ISO_DATE_FORMAT};
use crate::quantity::{quantity_text, Quantity};

/// Opaque row identifier. SQLite hands out a sequence number, DynamoDB a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId(n.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub quantity: Quantity,
}

/// An item that has passed validation but has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub quantity: Quantity,
}

impl NewItem {
    pub fn with_id(self, id: ItemId) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name,
            purchase_date: self.purchase_date,
            expiry_date: self.expiry_date,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Dates must be in YYYY-MM-DD format: {0}")]
    InvalidDate(String),
}

/// Raw values of the "add ingredient" form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub purchase_date: String,
    #[serde(default)]
    pub expiry_date: String,
    #[serde(default, deserialize_with = "quantity_text")]
    pub quantity: String,
}

impl ItemForm {
    /// Blank form with purchase date `today` and the default expiry filled in.
    pub fn with_defaults(today: NaiveDate) -> Self {
        ItemForm {
            name: String::new(),
            purchase_date: today.format(ISO_DATE_FORMAT).to_string(),
            expiry_date: default_expiry(today).format(ISO_DATE_FORMAT).to_string(),
            quantity: String::new(),
        }
    }

    pub fn validate(&self) -> Result<NewItem, ValidationError> {
        let missing: Vec<&'static str> = [
            ("name", &self.name),
            ("purchase_date", &self.purchase_date),
            ("expiry_date", &self.expiry_date),
            ("quantity", &self.quantity),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let purchase_date = parse_iso_date(&self.purchase_date)
            .ok_or_else(|| ValidationError::InvalidDate(self.purchase_date.clone()))?;
        let expiry_date = parse_iso_date(&self.expiry_date)
            .ok_or_else(|| ValidationError::InvalidDate(self.expiry_date.clone()))?;
        let quantity = self
            .quantity
            .parse::<Quantity>()
            .map_err(|_| ValidationError::MissingFields(vec!["quantity"]))?;

        Ok(NewItem {
            name: self.name.trim().to_string(),
            purchase_date,
            expiry_date,
            quantity,
        })
    }
}
