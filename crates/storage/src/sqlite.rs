use pantry_core::{parse_iso_date, InventoryItem, ItemId, NewItem, Quantity, ISO_DATE_FORMAT};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use crate::store::{InventoryStore, StorageError};

pub type DbPool = Pool<Sqlite>;

/// Older databases declare `quantity REAL`, so the column is always read back
/// through `CAST(quantity AS TEXT)`.
type ItemRow = (i64, String, String, String, String);

/// Embedded single-file backend.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database; lives as long as the store.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS food_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            purchase_date TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            quantity TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn row_to_item(r: ItemRow) -> Result<InventoryItem, StorageError> {
    let corrupt = |reason: String| StorageError::Corrupt {
        id: r.0.to_string(),
        reason,
    };
    let purchase_date =
        parse_iso_date(&r.2).ok_or_else(|| corrupt(format!("purchase_date '{}'", r.2)))?;
    let expiry_date =
        parse_iso_date(&r.3).ok_or_else(|| corrupt(format!("expiry_date '{}'", r.3)))?;
    let quantity = r
        .4
        .parse::<Quantity>()
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(InventoryItem {
        id: ItemId::from(r.0),
        name: r.1,
        purchase_date,
        expiry_date,
        quantity,
    })
}

/// Ids handed out by this backend are always integers; anything else cannot exist.
fn row_id(id: &ItemId) -> Option<i64> {
    id.as_str().parse().ok()
}

impl InventoryStore for SqliteStore {
    async fn create(&self, item: NewItem) -> Result<InventoryItem, StorageError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO food_items (name, purchase_date, expiry_date, quantity) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&item.name)
        .bind(item.purchase_date.format(ISO_DATE_FORMAT).to_string())
        .bind(item.expiry_date.format(ISO_DATE_FORMAT).to_string())
        .bind(item.quantity.to_string())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id, name = %item.name, "Inserted food item");
        Ok(item.with_id(ItemId::from(id)))
    }

    async fn list(&self) -> Result<Vec<InventoryItem>, StorageError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT id, name, purchase_date, expiry_date, CAST(quantity AS TEXT) FROM food_items ORDER BY expiry_date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn update_quantity(&self, id: &ItemId, quantity: &Quantity) -> Result<(), StorageError> {
        let row_id = row_id(id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
        let result = sqlx::query("UPDATE food_items SET quantity = ? WHERE id = ?")
            .bind(quantity.to_string())
            .bind(row_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<bool, StorageError> {
        let Some(row_id) = row_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM food_items WHERE id = ?")
            .bind(row_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_all(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM food_items")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_item(name: &str, expiry: (i32, u32, u32), quantity: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2).unwrap(),
            quantity: quantity.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = SqliteStore::in_memory().await.unwrap();
        let a = store.create(new_item("キャベツ", (2024, 5, 8), "1")).await.unwrap();
        let b = store.create(new_item("牛乳", (2024, 5, 5), "2")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "キャベツ");
        assert_eq!(b.quantity.to_string(), "2");
    }

    #[tokio::test]
    async fn list_is_sorted_by_expiry() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create(new_item("late", (2024, 6, 1), "1")).await.unwrap();
        store.create(new_item("early", (2024, 5, 2), "1")).await.unwrap();
        store.create(new_item("middle", (2024, 5, 20), "1")).await.unwrap();

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn update_quantity_accepts_free_text() {
        let store = SqliteStore::in_memory().await.unwrap();
        let item = store.create(new_item("豆腐", (2024, 5, 3), "2")).await.unwrap();

        let half = Quantity::Text("半丁".into());
        store.update_quantity(&item.id, &half).await.unwrap();

        let items = store.list().await.unwrap();
        assert_eq!(items[0].quantity, half);
    }

    #[tokio::test]
    async fn update_quantity_unknown_id_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        let q = Quantity::placeholder();
        assert!(matches!(
            store.update_quantity(&ItemId::new("999"), &q).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.update_quantity(&ItemId::new("not-a-number"), &q).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let keep = store.create(new_item("keep", (2024, 5, 3), "1")).await.unwrap();
        let gone = store.create(new_item("gone", (2024, 5, 4), "1")).await.unwrap();

        assert!(store.delete(&gone.id).await.unwrap());
        assert!(!store.delete(&gone.id).await.unwrap());
        assert!(!store.delete(&ItemId::new("abc")).await.unwrap());

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, keep.id);
    }

    #[tokio::test]
    async fn clear_all_reports_count() {
        let store = SqliteStore::in_memory().await.unwrap();
        for n in 0..3 {
            store.create(new_item(&format!("item {n}"), (2024, 5, 3), "1")).await.unwrap();
        }
        assert_eq!(store.clear_all().await.unwrap(), 3);
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.clear_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_rows_are_reported() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO food_items (name, purchase_date, expiry_date, quantity) VALUES ('x', 'yesterday', '2024-05-01', '1')",
        )
        .execute(store.pool())
        .await
        .unwrap();
        assert!(matches!(store.list().await, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn real_quantity_column_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food_items.db");
        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
            sqlx::query(
                "CREATE TABLE food_items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, purchase_date TEXT NOT NULL, expiry_date TEXT NOT NULL, quantity REAL NOT NULL)",
            )
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query(
                "INSERT INTO food_items (name, purchase_date, expiry_date, quantity) VALUES ('牛乳', '2024-05-01', '2024-05-05', 2)",
            )
            .execute(&pool)
            .await
            .unwrap();
            pool.close().await;
        }

        let store = SqliteStore::open(&path).await.unwrap();
        store.create(new_item("卵", (2024, 5, 10), "1.5")).await.unwrap();
        store.create(new_item("豆腐", (2024, 5, 20), "半丁")).await.unwrap();

        let quantities: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.quantity.to_string())
            .collect();
        assert_eq!(quantities, ["2", "1.5", "半丁"]);
    }

    #[tokio::test]
    async fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food_items.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.create(new_item("味噌", (2024, 12, 31), "1")).await.unwrap();
            store.pool().close().await;
        }
        let store = SqliteStore::open(&path).await.unwrap();
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "味噌");
    }
}
