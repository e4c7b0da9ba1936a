//! Todo Storage Layer
//!
//! Implements the `ItemStore` trait on SQLite.
//!
//! # Concurrency contract
//!
//! - Every record carries a `version` counter.
//! - A locking read (`get_by_id(id, true)`) bumps the version in the same
//!   statement that reads the row, so a copy read earlier becomes stale.
//! - `save` is a single conditional `UPDATE ... WHERE id = ? AND version = ?`;
//!   SQLite executes it atomically, which keeps the check correct across
//!   process restarts and across processes sharing the database file.
//!
//! # Examples
//!
//! ```no_run
//! use todo_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for item operations
//! ```

#![warn(missing_docs)]

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use todo_domain::{Item, ItemId, ItemStore, NewItem, Status, StoreFailure};

/// Column list shared by every statement that materializes an `Item`
const ITEM_COLUMNS: &str =
    "id, description, status, creation_date, due_date, completion_date, version";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Save carried a stale version
    #[error("Version conflict on item {id}: expected {expected}, found {actual}")]
    Conflict {
        /// Item that was being saved
        id: ItemId,
        /// Version carried by the rejected write
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreFailure for StoreError {
    fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// SQLite-based implementation of ItemStore
///
/// # Thread Safety
///
/// The connection sits behind a mutex that is held for exactly one store
/// operation, never across calls. The store is `Send + Sync` and can be
/// shared through an `Arc`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use todo_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("todo.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // Other processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn().execute_batch(schema)?;
        Ok(())
    }

    /// Acquire the connection for one operation
    ///
    /// A panic mid-statement leaves no open transaction behind (every write is
    /// a single statement), so a poisoned lock is still safe to reuse.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Convert ItemId to bytes for storage
    ///
    /// Big-endian keeps BLOB ordering equal to id (and therefore creation) order.
    fn item_id_to_bytes(id: ItemId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to ItemId
    fn bytes_to_item_id(bytes: &[u8]) -> Result<ItemId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for ItemId, got {}", bytes.len()))
        })?;
        Ok(ItemId::from_value(u128::from_be_bytes(arr)))
    }

    /// Fixed-width text form; lexicographic order equals chronological order
    fn timestamp_to_text(instant: DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn text_to_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidData(format!("Bad timestamp '{}': {}", text, e)))
    }

    fn conversion_failure(index: usize, ty: rusqlite::types::Type, err: StoreError) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(err))
    }

    /// Map a row selected with `ITEM_COLUMNS` to an Item
    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
        use rusqlite::types::Type;

        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_item_id(&id_bytes)
            .map_err(|e| Self::conversion_failure(0, Type::Blob, e))?;

        let status_str: String = row.get(2)?;
        let status = Status::parse(&status_str).ok_or_else(|| {
            Self::conversion_failure(
                2,
                Type::Text,
                StoreError::InvalidData(format!("Unknown status: {}", status_str)),
            )
        })?;

        let timestamp = |index: usize| -> rusqlite::Result<Option<DateTime<Utc>>> {
            row.get::<_, Option<String>>(index)?
                .map(|text| {
                    Self::text_to_timestamp(&text)
                        .map_err(|e| Self::conversion_failure(index, Type::Text, e))
                })
                .transpose()
        };

        let creation_date = timestamp(3)?.ok_or_else(|| {
            Self::conversion_failure(
                3,
                Type::Null,
                StoreError::InvalidData("Missing creation_date".to_string()),
            )
        })?;

        Ok(Item {
            id,
            description: row.get(1)?,
            status,
            creation_date,
            due_date: timestamp(4)?,
            completion_date: timestamp(5)?,
            version: row.get::<_, i64>(6)? as u64,
        })
    }

    /// Run a SELECT over `ITEM_COLUMNS` and collect every row
    fn query_items(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items {filter} ORDER BY id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params, Self::row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

impl ItemStore for SqliteStore {
    type Error = StoreError;

    fn create(&self, item: NewItem) -> Result<Item, Self::Error> {
        let id = ItemId::new();
        let item = item.into_item(id);

        let stored = self.conn().query_row(
            &format!(
                "INSERT INTO items (id, description, status, creation_date, due_date, completion_date, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0)
                 RETURNING {ITEM_COLUMNS}"
            ),
            params![
                Self::item_id_to_bytes(id),
                &item.description,
                item.status.as_str(),
                Self::timestamp_to_text(item.creation_date),
                item.due_date.map(Self::timestamp_to_text),
            ],
            Self::row_to_item,
        )?;

        tracing::debug!(item_id = %stored.id, "Inserted item");
        Ok(stored)
    }

    fn get_by_id(&self, id: ItemId, lock_for_update: bool) -> Result<Option<Item>, Self::Error> {
        let id_bytes = Self::item_id_to_bytes(id);

        let sql = if lock_for_update {
            format!("UPDATE items SET version = version + 1 WHERE id = ?1 RETURNING {ITEM_COLUMNS}")
        } else {
            format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1")
        };

        let item = self
            .conn()
            .query_row(&sql, params![id_bytes], Self::row_to_item)
            .optional()?;

        Ok(item)
    }

    fn save(&self, item: &Item) -> Result<Item, Self::Error> {
        let id_bytes = Self::item_id_to_bytes(item.id);
        let conn = self.conn();

        let saved = conn
            .query_row(
                &format!(
                    "UPDATE items
                     SET description = ?1, status = ?2, due_date = ?3, completion_date = ?4,
                         version = version + 1
                     WHERE id = ?5 AND version = ?6
                     RETURNING {ITEM_COLUMNS}"
                ),
                params![
                    &item.description,
                    item.status.as_str(),
                    item.due_date.map(Self::timestamp_to_text),
                    item.completion_date.map(Self::timestamp_to_text),
                    &id_bytes,
                    item.version as i64,
                ],
                Self::row_to_item,
            )
            .optional()?;

        if let Some(saved) = saved {
            return Ok(saved);
        }

        // Nothing matched: tell a stale version apart from a missing row
        let actual: Option<i64> = conn
            .query_row(
                "SELECT version FROM items WHERE id = ?1",
                params![&id_bytes],
                |row| row.get(0),
            )
            .optional()?;

        match actual {
            Some(actual) => Err(StoreError::Conflict {
                id: item.id,
                expected: item.version,
                actual: actual as u64,
            }),
            None => Err(StoreError::NotFound(item.id)),
        }
    }

    fn find_all(&self) -> Result<Vec<Item>, Self::Error> {
        self.query_items("", &[])
    }

    fn find_by_status(&self, status: Status) -> Result<Vec<Item>, Self::Error> {
        self.query_items("WHERE status = ?1", &[&status.as_str()])
    }

    fn find_by_status_and_due_date_before(
        &self,
        status: Status,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, Self::Error> {
        let cutoff = Self::timestamp_to_text(instant);
        self.query_items(
            "WHERE status = ?1 AND due_date IS NOT NULL AND due_date < ?2",
            &[&status.as_str(), &cutoff],
        )
    }

    fn count(&self) -> Result<u64, Self::Error> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_id_bytes_roundtrip() {
        let id = ItemId::new();
        let bytes = SqliteStore::item_id_to_bytes(id);
        assert_eq!(bytes.len(), 16);
        assert_eq!(SqliteStore::bytes_to_item_id(&bytes).unwrap(), id);
        assert!(SqliteStore::bytes_to_item_id(&bytes[..8]).is_err());
    }

    #[test]
    fn test_timestamp_text_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let text = SqliteStore::timestamp_to_text(whole);
        assert_eq!(text, "2026-01-02T03:04:05.000Z");
        assert_eq!(SqliteStore::text_to_timestamp(&text).unwrap(), whole);

        let later = whole + chrono::Duration::milliseconds(7);
        assert!(SqliteStore::timestamp_to_text(later) > text);
    }

    #[test]
    fn test_error_classification() {
        let id = ItemId::new();
        let conflict = StoreError::Conflict { id, expected: 1, actual: 2 };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert!(StoreError::NotFound(id).is_not_found());
        assert!(!StoreError::InvalidData("x".into()).is_conflict());
    }
}
