//! Item module - the single entity tracked by the service

use crate::Status;
use chrono::{DateTime, Utc};
use std::fmt;

/// Unique identifier for an item based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability, so id order is insertion order
/// - 128-bit uniqueness; identifiers are never reused
/// - No coordination required between store instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u128);

impl ItemId {
    /// Generate a new UUIDv7-based ItemId
    ///
    /// Only stores call this; callers receive ids from `ItemStore::create`.
    ///
    /// # Examples
    ///
    /// ```
    /// use todo_domain::ItemId;
    ///
    /// let id = ItemId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ItemId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ItemId from its hyphenated UUID string
    ///
    /// # Examples
    ///
    /// ```
    /// use todo_domain::ItemId;
    ///
    /// let id = ItemId::new();
    /// let parsed = ItemId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid item id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl std::str::FromStr for ItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// A to-do item as persisted by the store
///
/// `version` is owned by the store: it is bumped on every successful save and
/// on every locking read. A save carrying a version other than the stored one
/// is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Store-assigned identifier, immutable
    pub id: ItemId,

    /// Free-text description, never empty
    pub description: String,

    /// Current lifecycle stage
    pub status: Status,

    /// When the item was created, immutable
    pub creation_date: DateTime<Utc>,

    /// Optional deadline; never earlier than `creation_date`
    pub due_date: Option<DateTime<Utc>>,

    /// When the item most recently entered `Done`
    pub completion_date: Option<DateTime<Utc>>,

    /// Optimistic concurrency token
    pub version: u64,
}

impl Item {
    /// Whether the item has reached the terminal `PastDue` state
    pub fn is_past_due(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the sweep should expire this item at `now`
    ///
    /// Only `NotDone` items with a due date strictly before `now` qualify.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status == Status::NotDone && self.due_date.is_some_and(|due| due < now)
    }
}

/// Insert payload for `ItemStore::create`
///
/// The store assigns the id and the initial version; status always starts as
/// `NotDone` with no completion date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Description of the new item
    pub description: String,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Creation instant chosen by the caller
    pub creation_date: DateTime<Utc>,
}

impl NewItem {
    /// Create an insert payload
    pub fn new(
        description: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            due_date,
            creation_date,
        }
    }

    /// Materialize the record a store persists for this payload
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            description: self.description,
            status: Status::NotDone,
            creation_date: self.creation_date,
            due_date: self.due_date,
            completion_date: None,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_item_id_ordering() {
        let id1 = ItemId::from_value(1000);
        let id2 = ItemId::from_value(2000);

        assert!(id1 < id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_item_id_chronological() {
        let id1 = ItemId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ItemId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort before later UUIDv7");
    }

    #[test]
    fn test_item_id_invalid_string() {
        assert!(ItemId::from_string("not-a-valid-uuid").is_err());
        assert!("".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_new_item_starts_not_done() {
        let now = Utc::now();
        let item = NewItem::new("groceries", None, now).into_item(ItemId::new());

        assert_eq!(item.status, Status::NotDone);
        assert_eq!(item.completion_date, None);
        assert_eq!(item.version, 0);
        assert_eq!(item.creation_date, now);
    }

    #[test]
    fn test_is_overdue_at() {
        let now = Utc::now();
        let mut item = NewItem::new("task", Some(now), now - Duration::hours(1))
            .into_item(ItemId::new());

        // Due exactly now is not overdue
        assert!(!item.is_overdue_at(now));
        assert!(item.is_overdue_at(now + Duration::milliseconds(1)));

        item.status = Status::Done;
        assert!(!item.is_overdue_at(now + Duration::hours(1)));

        item.due_date = None;
        item.status = Status::NotDone;
        assert!(!item.is_overdue_at(now + Duration::days(365)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: id ordering matches u128 ordering
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = ItemId::from_value(a);
            let id_b = ItemId::from_value(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: round trip through the string form preserves the id
        #[test]
        fn test_id_string_roundtrip(value: u128) {
            let id = ItemId::from_value(value);

            match ItemId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
