pub mod sqlite;
pub mod store;

#[cfg(feature = "dynamodb")]
pub mod dynamo;

pub use sqlite::{DbPool, SqliteStore};
pub use store::{AnyStore, InventoryStore, StorageError};

#[cfg(feature = "dynamodb")]
pub use dynamo::DynamoStore;
