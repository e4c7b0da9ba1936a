//! Item lifecycle service
//!
//! Enforces the status state machine and input validation on top of an
//! `ItemStore`. Every update validates against a plain read, then takes one
//! locking read and one compare-and-swap save; nothing is retried here.

use crate::LifecycleError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use todo_domain::{Clock, Item, ItemId, ItemStore, NewItem, Status, StoreFailure, SystemClock};

/// Lifecycle service for to-do items
///
/// Stateless apart from the store and the clock, so a single instance can be
/// shared by any number of concurrent callers.
///
/// # Examples
///
/// ```no_run
/// use todo_lifecycle::LifecycleService;
/// use todo_domain::Status;
/// use todo_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = LifecycleService::new(SqliteStore::new(":memory:")?);
///
/// let item = service.add_item("groceries", None)?;
/// let done = service.update_status(item.id, Status::Done)?;
/// assert!(done.completion_date.is_some());
/// # Ok(())
/// # }
/// ```
pub struct LifecycleService<S: ItemStore> {
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S: ItemStore> LifecycleService<S> {
    /// Create a service over `store` using wall-clock time
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a new item
    ///
    /// The item always starts as `NotDone` with no completion date,
    /// whatever the caller intended.
    ///
    /// # Errors
    ///
    /// `Validation` when the description is blank or the due date lies
    /// strictly before now. Nothing is written in that case.
    pub fn add_item(
        &self,
        description: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Item, LifecycleError> {
        let description = description.into();
        validate_description(&description)?;

        let now = self.clock.now();
        if due_date.is_some_and(|due| due < now) {
            return Err(LifecycleError::Validation(
                "Due date time cannot be before current time".to_string(),
            ));
        }

        let item = self
            .store
            .create(NewItem::new(description, due_date, now))
            .map_err(store_failure)?;

        tracing::info!(item_id = %item.id, "Item added");
        Ok(item)
    }

    /// Replace an item's description
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such item exists
    /// - `Validation` if the item is past due or the description is blank
    /// - `Concurrency` if another writer claimed the item before the save
    pub fn update_description(
        &self,
        id: ItemId,
        description: impl Into<String>,
    ) -> Result<Item, LifecycleError> {
        let description = description.into();
        let mut item = self.load_for_update(id, |_| validate_description(&description))?;

        item.description = description;
        let saved = self.save(&item)?;

        tracing::info!(item_id = %id, version = saved.version, "Item description updated");
        Ok(saved)
    }

    /// Move an item to `status`
    ///
    /// Entering `Done` stamps `completion_date` with the current time.
    /// Leaving `Done` keeps the previous completion date.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such item exists
    /// - `Validation` if the item is past due, or `status` is `PastDue`
    ///   (only the sweep may set it)
    /// - `Concurrency` if another writer claimed the item before the save
    pub fn update_status(&self, id: ItemId, status: Status) -> Result<Item, LifecycleError> {
        let mut item = self.load_for_update(id, |current| {
            if current.status.can_request(status) {
                Ok(())
            } else {
                Err(LifecycleError::Validation(format!(
                    "Invalid status value is used to update Item with id : {}",
                    id
                )))
            }
        })?;

        item.status = status;
        if status == Status::Done {
            item.completion_date = Some(self.clock.now());
        }
        let saved = self.save(&item)?;

        tracing::info!(item_id = %id, status = %status, "Item status updated");
        Ok(saved)
    }

    /// Get an item by id without claiming it
    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>, LifecycleError> {
        self.store.get_by_id(id, false).map_err(store_failure)
    }

    /// List items
    ///
    /// With `include_all` every item is returned; otherwise only `NotDone`
    /// items. An empty list is a normal result.
    pub fn list_items(&self, include_all: bool) -> Result<Vec<Item>, LifecycleError> {
        let items = if include_all {
            self.store.find_all()
        } else {
            self.store.find_by_status(Status::NotDone)
        };
        items.map_err(store_failure)
    }

    /// Claim an item for update once `check` accepts it
    ///
    /// Existence, the past-due rule and `check` are evaluated on a plain read,
    /// so a rejected request leaves the stored version untouched. The locking
    /// read only happens for requests that will be saved; the past-due rule is
    /// checked again on the claimed copy in case the sweep got there first.
    fn load_for_update<F>(&self, id: ItemId, check: F) -> Result<Item, LifecycleError>
    where
        F: FnOnce(&Item) -> Result<(), LifecycleError>,
    {
        let current = self
            .store
            .get_by_id(id, false)
            .map_err(store_failure)?
            .ok_or(LifecycleError::NotFound(id))?;
        ensure_mutable(&current)?;
        check(&current)?;

        let claimed = self
            .store
            .get_by_id(id, true)
            .map_err(store_failure)?
            .ok_or(LifecycleError::NotFound(id))?;
        ensure_mutable(&claimed)?;

        Ok(claimed)
    }

    pub(crate) fn save(&self, item: &Item) -> Result<Item, LifecycleError> {
        self.store.save(item).map_err(|e| {
            if e.is_conflict() {
                tracing::debug!(item_id = %item.id, "Save rejected: {}", e);
                LifecycleError::Concurrency { id: item.id }
            } else if e.is_not_found() {
                LifecycleError::NotFound(item.id)
            } else {
                store_failure(e)
            }
        })
    }
}

/// Map a store error outside a save path
pub(crate) fn store_failure<E: StoreFailure>(err: E) -> LifecycleError {
    LifecycleError::Store(err.to_string())
}

fn ensure_mutable(item: &Item) -> Result<(), LifecycleError> {
    if item.is_past_due() {
        return Err(LifecycleError::Validation(
            "Item with status as past due cannot be updated".to_string(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), LifecycleError> {
    if description.trim().is_empty() {
        return Err(LifecycleError::Validation(
            "Description must not be empty".to_string(),
        ));
    }
    Ok(())
}
