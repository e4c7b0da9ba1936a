//! Trait definitions for storage interactions
//!
//! These traits define the boundary between lifecycle logic and persistence.
//! Implementations live in other crates.

use crate::{Item, ItemId, NewItem, Status};
use chrono::{DateTime, Utc};

/// Classification every store error must expose
///
/// Lifecycle code reacts differently to a stale-version rejection and to a
/// missing row than to an I/O failure, without knowing the backend.
pub trait StoreFailure: std::error::Error + Send + Sync + 'static {
    /// The write carried a version that no longer matches the stored one
    fn is_conflict(&self) -> bool;

    /// The addressed record does not exist
    fn is_not_found(&self) -> bool;
}

/// Trait for storing and retrieving items
///
/// Implemented by the infrastructure layer (todo-store). Methods take `&self`
/// so one store can serve many concurrent callers; implementations provide
/// their own internal synchronization, scoped to a single call.
pub trait ItemStore: Send + Sync {
    /// Error type for store operations
    type Error: StoreFailure;

    /// Persist a new item; assigns the id and version 0
    fn create(&self, item: NewItem) -> Result<Item, Self::Error>;

    /// Get an item by id
    ///
    /// With `lock_for_update` the read atomically increments the stored
    /// version and returns the bumped record, so any copy read earlier can no
    /// longer be saved.
    fn get_by_id(&self, id: ItemId, lock_for_update: bool) -> Result<Option<Item>, Self::Error>;

    /// Compare-and-swap write
    ///
    /// Succeeds only if `item.version` equals the stored version; the stored
    /// version is then incremented and the updated record returned.
    fn save(&self, item: &Item) -> Result<Item, Self::Error>;

    /// Every item, in insertion order
    fn find_all(&self) -> Result<Vec<Item>, Self::Error>;

    /// Items with the given status, in insertion order
    fn find_by_status(&self, status: Status) -> Result<Vec<Item>, Self::Error>;

    /// Items with the given status whose due date is strictly before `instant`
    fn find_by_status_and_due_date_before(
        &self,
        status: Status,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, Self::Error>;

    /// Number of stored items
    fn count(&self) -> Result<u64, Self::Error>;
}
