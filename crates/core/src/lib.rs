pub mod config;
pub mod dates;
pub mod item;
pub mod quantity;

pub use config::{AppConfig, ConfigError, LlmConfig, LogFormat, OcrConfig, ServerConfig, StorageConfig};
pub use dates::{default_expiry, parse_iso_date, today, DEFAULT_SHELF_LIFE_DAYS, ISO_DATE_FORMAT};
pub use item::{InventoryItem, ItemForm, ItemId, NewItem, ValidationError};
pub use quantity::{quantity_text, EmptyQuantity, Quantity};
