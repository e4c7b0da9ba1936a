//! Todo Sweeper
//!
//! Background scheduling for the past-due sweep.
//!
//! # Overview
//!
//! The sweeper is responsible for:
//! - **Scheduling**: triggering `sweep_past_due` at a fixed interval
//! - **Single flight**: a trigger that arrives while a sweep is still running
//!   is skipped and counted, never queued
//! - **Metrics collection**: counting expired items, failures and skipped
//!   triggers for logs and the health endpoint
//!
//! # Usage
//!
//! ## One-off trigger
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo_lifecycle::LifecycleService;
//! use todo_store::SqliteStore;
//! use todo_sweeper::{SweepOutcome, SweepWorker, SweeperConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(LifecycleService::new(SqliteStore::new("todo.db")?));
//!     let worker = SweepWorker::new(service, &SweeperConfig::default())?;
//!
//!     if let SweepOutcome::Completed(report) = worker.trigger().await? {
//!         println!("expired {} items", report.expired.len());
//!     }
//!     println!("{}", worker.metrics().summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [sweeper]
//! interval_secs = 60
//! enabled = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod guard;
mod metrics;
mod worker;

pub use config::SweeperConfig;
pub use error::SweeperError;
pub use guard::{FlightPermit, SingleFlight};
pub use metrics::SweepMetrics;
pub use worker::{SweepOutcome, SweepWorker};
