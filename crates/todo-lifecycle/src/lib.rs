//! Todo Lifecycle
//!
//! The consistency core of the to-do service: the item state machine, input
//! validation, and the past-due sweep.
//!
//! # State machine
//!
//! | From | To | Who |
//! |------|----|-----|
//! | `NOT_DONE` | `DONE` | client |
//! | `DONE` | `NOT_DONE` / `DONE` | client |
//! | `NOT_DONE` | `PAST_DUE` | sweep only, when the due date has passed |
//! | `PAST_DUE` | - | terminal: no status or description change |
//!
//! # Concurrency
//!
//! Updates are validated against a plain read first, so a rejected request
//! never touches the stored version. Accepted updates then take a locking read
//! (which bumps the version) and a compare-and-swap save. Of two writers racing
//! on one item, at most one succeeds; the other receives
//! [`LifecycleError::Concurrency`]. Nothing is retried internally.
//!
//! # Usage
//!
//! ```no_run
//! use todo_lifecycle::LifecycleService;
//! use todo_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = LifecycleService::new(SqliteStore::new("todo.db")?);
//!
//! match service.sweep_past_due() {
//!     Ok(report) => println!("expired {} items", report.expired.len()),
//!     Err(e) => eprintln!("{}", e),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod service;
mod sweep;

pub use error::LifecycleError;
pub use service::LifecycleService;
pub use sweep::SweepReport;
