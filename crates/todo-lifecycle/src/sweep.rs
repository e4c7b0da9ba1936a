//! Past-due sweep
//!
//! Expires `NotDone` items whose due date has passed. Each item gets its own
//! locking-read/modify/save cycle; a failure on one item never stops the
//! others, and items that succeed stay committed.

use crate::service::store_failure;
use crate::{LifecycleError, LifecycleService};
use chrono::{DateTime, Utc};
use todo_domain::{ItemId, ItemStore, Status};

/// Result of a sweep in which every candidate was handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// When the sweep evaluated due dates
    pub swept_at: Option<DateTime<Utc>>,

    /// Items moved to `PastDue`
    pub expired: Vec<ItemId>,

    /// Candidates that no longer qualified once claimed
    /// (completed or removed between query and lock)
    pub skipped: Vec<ItemId>,
}

impl SweepReport {
    /// Whether the sweep found no candidates at all
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.skipped.is_empty()
    }
}

/// Per-candidate outcome
enum Expiry {
    Expired,
    Skipped,
}

impl<S: ItemStore> LifecycleService<S> {
    /// Expire every overdue `NotDone` item
    ///
    /// Candidates are re-checked after the locking read, so an item a user
    /// completed in the meantime is skipped rather than expired. `Done` items
    /// are never moved to `PastDue`.
    ///
    /// # Errors
    ///
    /// - `Store` if the candidate query itself fails (nothing was attempted)
    /// - `SweepIncomplete` naming every item that could not be expired;
    ///   all other candidates have already been committed
    pub fn sweep_past_due(&self) -> Result<SweepReport, LifecycleError> {
        let now = self.clock.now();

        let candidates = self
            .store
            .find_by_status_and_due_date_before(Status::NotDone, now)
            .map_err(store_failure)?;

        let mut report = SweepReport {
            swept_at: Some(now),
            ..Default::default()
        };
        let mut failed = Vec::new();

        for candidate in candidates {
            match self.expire_one(candidate.id, now) {
                Ok(Expiry::Expired) => report.expired.push(candidate.id),
                Ok(Expiry::Skipped) => report.skipped.push(candidate.id),
                Err(e) => {
                    tracing::warn!(item_id = %candidate.id, "Could not expire item: {}", e);
                    failed.push(candidate.id);
                }
            }
        }

        if !failed.is_empty() {
            tracing::error!(
                "Past-due sweep incomplete: {} expired, {} failed",
                report.expired.len(),
                failed.len()
            );
            return Err(LifecycleError::SweepIncomplete {
                failed,
                committed: report.expired.len(),
            });
        }

        if !report.expired.is_empty() {
            tracing::info!("Past-due sweep expired {} item(s)", report.expired.len());
        }

        Ok(report)
    }

    fn expire_one(&self, id: ItemId, now: DateTime<Utc>) -> Result<Expiry, LifecycleError> {
        let Some(mut item) = self.store.get_by_id(id, true).map_err(store_failure)? else {
            return Ok(Expiry::Skipped);
        };

        if !item.is_overdue_at(now) {
            tracing::debug!(item_id = %id, status = %item.status, "No longer overdue, skipping");
            return Ok(Expiry::Skipped);
        }

        item.status = Status::PastDue;
        self.save(&item)?;
        Ok(Expiry::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_emptiness_counts_skipped_items() {
        assert!(SweepReport::default().is_empty());

        let report = SweepReport {
            skipped: vec![ItemId::new()],
            ..Default::default()
        };
        assert!(!report.is_empty());
        assert!(report.expired.is_empty());
    }
}
