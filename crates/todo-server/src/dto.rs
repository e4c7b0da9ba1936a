//! JSON shapes exchanged over HTTP

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_domain::Item;

/// Item as seen by clients
///
/// The version counter stays internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    /// Hyphenated UUID
    pub id: String,
    /// Free-text description
    pub description: String,
    /// `NOT_DONE`, `DONE` or `PAST_DUE`
    pub status: String,
    /// When the item was added
    pub creation_date: DateTime<Utc>,
    /// Deadline, if any
    pub due_date: Option<DateTime<Utc>>,
    /// When the item was last marked done
    pub completion_date: Option<DateTime<Utc>>,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id: item.id.to_string(),
            description: item.description,
            status: item.status.as_str().to_string(),
            creation_date: item.creation_date,
            due_date: item.due_date,
            completion_date: item.completion_date,
        }
    }
}

/// Body of `POST /item`
///
/// Any status the client sends is ignored; new items start as `NOT_DONE`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// Free-text description
    pub description: String,
    /// Optional deadline (RFC 3339)
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Error body returned by every failing route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    /// HTTP status code, repeated in the body
    pub status_code: u16,
    /// When the error was produced
    pub timestamp: DateTime<Utc>,
    /// What went wrong
    pub message: String,
    /// Error category
    pub description: String,
}
