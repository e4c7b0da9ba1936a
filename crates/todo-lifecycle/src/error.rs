//! Error types for lifecycle operations

use thiserror::Error;
use todo_domain::ItemId;

/// Errors that can occur during lifecycle operations
///
/// `Validation` and `NotFound` describe bad caller input. `Concurrency` means
/// another writer claimed the item first; the caller should re-fetch and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Input or requested transition rejected
    #[error("{0}")]
    Validation(String),

    /// No item with this id
    #[error("Item not found with ID: {0}")]
    NotFound(ItemId),

    /// Write lost an optimistic version race
    #[error("Item with: {id} is already locked by another transaction")]
    Concurrency {
        /// Contended item
        id: ItemId,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Past-due sweep finished with per-item failures
    ///
    /// Items not listed in `failed` were committed before this was returned.
    #[error(
        "Items with ids [{}] were not moved to past due; they were changed concurrently or could not be written",
        join_ids(.failed)
    )]
    SweepIncomplete {
        /// Every item the sweep could not expire
        failed: Vec<ItemId>,
        /// Items expired during the same sweep
        committed: usize,
    },
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_incomplete_lists_every_id() {
        let a = ItemId::from_value(1);
        let b = ItemId::from_value(2);
        let err = LifecycleError::SweepIncomplete {
            failed: vec![a, b],
            committed: 3,
        };

        let message = err.to_string();
        assert!(message.contains(&a.to_string()));
        assert!(message.contains(&b.to_string()));
        assert!(message.contains("could not be written"));
        assert!(!message.contains("locked by other transactions"));
    }
}
