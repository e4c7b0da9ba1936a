//! Todo Domain Layer
//!
//! This crate contains the core domain model for the to-do service. It keeps
//! its dependencies to two primitives (UUIDv7 identifiers and UTC instants) and
//! defines the value types and trait interfaces every other layer builds on.
//!
//! ## Key Concepts
//!
//! - **Item**: The single tracked entity - a description with an optional due date
//! - **Status**: Lifecycle stage (not done → done, or not done → past due)
//! - **Version**: Per-record counter used for optimistic concurrency
//! - **Clock**: Source of "now", injectable so lifecycle rules are testable
//!
//! ## Architecture
//!
//! - Pure business types only
//! - Infrastructure implementations (SQLite, HTTP) live in other crates
//! - Trait definitions for all storage interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod item;
pub mod status;
pub mod traits;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use item::{Item, ItemId, NewItem};
pub use status::Status;
pub use traits::{ItemStore, StoreFailure};
