use pantry_core::{InventoryItem, ItemId, NewItem, Quantity, StorageConfig};
use std::future::Future;
use std::path::Path;
use thiserror::Error;

use crate::sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("DynamoDB error: {0}")]
    Dynamo(String),
    #[error("Item not found: {0}")]
    NotFound(ItemId),
    #[error("Stored row {id} is unreadable: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("Storage backend '{0}' is not compiled in")]
    BackendUnavailable(&'static str),
}

/// The single-table datastore behind every page of the application.
///
/// Backends are interchangeable; callers never see which one is in use.
pub trait InventoryStore: Send + Sync {
    fn create(
        &self,
        item: NewItem,
    ) -> impl Future<Output = Result<InventoryItem, StorageError>> + Send;

    /// All items, soonest expiry first.
    fn list(&self) -> impl Future<Output = Result<Vec<InventoryItem>, StorageError>> + Send;

    /// Fails with [`StorageError::NotFound`] when no row has `id`.
    fn update_quantity(
        &self,
        id: &ItemId,
        quantity: &Quantity,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Returns whether a row was removed.
    fn delete(&self, id: &ItemId) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Removes every row and returns how many were removed.
    fn clear_all(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;
}

/// Sort by expiry date, then id, matching the SQLite backend's `ORDER BY`.
#[cfg(any(test, feature = "dynamodb"))]
pub(crate) fn sort_by_expiry(items: &mut [InventoryItem]) {
    items.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}

/// Backend chosen at startup from [`StorageConfig`].
pub enum AnyStore {
    Sqlite(SqliteStore),
    #[cfg(feature = "dynamodb")]
    Dynamo(crate::dynamo::DynamoStore),
}

impl AnyStore {
    /// Open the configured backend. `default_sqlite_path` is used when the
    /// SQLite backend has no explicit path.
    pub async fn connect(
        config: &StorageConfig,
        default_sqlite_path: &Path,
    ) -> Result<Self, StorageError> {
        match config {
            StorageConfig::Sqlite { path } => {
                let path = path.as_deref().unwrap_or(default_sqlite_path);
                tracing::info!(path = %path.display(), "Opening SQLite inventory");
                Ok(AnyStore::Sqlite(SqliteStore::open(path).await?))
            }
            #[cfg(feature = "dynamodb")]
            StorageConfig::Dynamodb { table, region, endpoint } => {
                let table = table
                    .clone()
                    .ok_or_else(|| StorageError::Dynamo("table name is not configured".into()))?;
                let region = region
                    .clone()
                    .ok_or_else(|| StorageError::Dynamo("region is not configured".into()))?;
                tracing::info!(%table, %region, "Using DynamoDB inventory");
                let store =
                    crate::dynamo::DynamoStore::connect(table, region, endpoint.clone()).await;
                Ok(AnyStore::Dynamo(store))
            }
            #[cfg(not(feature = "dynamodb"))]
            StorageConfig::Dynamodb { .. } => Err(StorageError::BackendUnavailable("dynamodb")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyStore::Sqlite(_) => "sqlite",
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(_) => "dynamodb",
        }
    }
}

impl InventoryStore for AnyStore {
    async fn create(&self, item: NewItem) -> Result<InventoryItem, StorageError> {
        match self {
            AnyStore::Sqlite(s) => s.create(item).await,
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(s) => s.create(item).await,
        }
    }

    async fn list(&self) -> Result<Vec<InventoryItem>, StorageError> {
        match self {
            AnyStore::Sqlite(s) => s.list().await,
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(s) => s.list().await,
        }
    }

    async fn update_quantity(&self, id: &ItemId, quantity: &Quantity) -> Result<(), StorageError> {
        match self {
            AnyStore::Sqlite(s) => s.update_quantity(id, quantity).await,
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(s) => s.update_quantity(id, quantity).await,
        }
    }

    async fn delete(&self, id: &ItemId) -> Result<bool, StorageError> {
        match self {
            AnyStore::Sqlite(s) => s.delete(id).await,
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(s) => s.delete(id).await,
        }
    }

    async fn clear_all(&self) -> Result<u64, StorageError> {
        match self {
            AnyStore::Sqlite(s) => s.clear_all().await,
            #[cfg(feature = "dynamodb")]
            AnyStore::Dynamo(s) => s.clear_all().await,
        }
    }
}
