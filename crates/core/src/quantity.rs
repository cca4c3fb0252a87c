use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unit-less amount of an inventory item.
///
/// Users type whatever they like into the quantity field ("2", "0.5", "1 pack"),
/// so a quantity is numeric when it parses as a decimal and free text otherwise.
/// It always travels as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quantity {
    Amount(Decimal),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Quantity must not be empty")]
pub struct EmptyQuantity;

impl Quantity {
    /// Quantity assigned to receipt lines until the user corrects it.
    pub fn placeholder() -> Self {
        Quantity::Amount(Decimal::ONE)
    }

    pub fn from_amount(amount: Decimal) -> Self {
        Quantity::Amount(amount.normalize())
    }
}

/// Raw quantity field that may arrive as a JSON string or number. Numbers are
/// kept as their text so that validation sees exactly one representation.
pub fn quantity_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Number(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Integer(n) => n.to_string(),
        Raw::Number(n) => n.to_string(),
    })
}

impl FromStr for Quantity {
    type Err = EmptyQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmptyQuantity);
        }
        match Decimal::from_str(s) {
            Ok(d) => Ok(Quantity::from_amount(d)),
            Err(_) => Ok(Quantity::Text(s.to_string())),
        }
    }
}

impl TryFrom<String> for Quantity {
    type Error = EmptyQuantity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        q.to_string()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Amount(d) => write!(f, "{d}"),
            Quantity::Text(s) => write!(f, "{s}"),
        }
    }
}
