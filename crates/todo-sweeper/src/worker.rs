//! Background worker that expires past-due items on a schedule

use crate::guard::SingleFlight;
use crate::{SweepMetrics, SweeperConfig, SweeperError};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use todo_domain::{ItemId, ItemStore};
use todo_lifecycle::{LifecycleError, LifecycleService, SweepReport};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// What a single trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Every candidate was handled
    Completed(SweepReport),

    /// Some items were expired, the listed ones were not
    Incomplete {
        /// Items left behind
        failed: Vec<ItemId>,
        /// Items expired during the same sweep
        committed: usize,
    },

    /// Another sweep was still running; nothing was done
    Skipped,
}

/// Runs `sweep_past_due` at a fixed interval, one sweep at a time
///
/// All methods take `&self`, so the worker can be shared through an `Arc`
/// while its loop runs on another task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use todo_lifecycle::LifecycleService;
/// use todo_store::SqliteStore;
/// use todo_sweeper::{SweepWorker, SweeperConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = Arc::new(LifecycleService::new(SqliteStore::new("todo.db")?));
///     let worker = SweepWorker::new(service, &SweeperConfig::default())?;
///
///     // Run until Ctrl+C
///     worker
///         .run_until(async {
///             let _ = tokio::signal::ctrl_c().await;
///         })
///         .await?;
///     Ok(())
/// }
/// ```
pub struct SweepWorker<S: ItemStore> {
    service: Arc<LifecycleService<S>>,
    interval: Duration,
    guard: SingleFlight,
    metrics: Mutex<SweepMetrics>,
}

impl<S: ItemStore + 'static> SweepWorker<S> {
    /// Create a worker over a shared service
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid.
    pub fn new(
        service: Arc<LifecycleService<S>>,
        config: &SweeperConfig,
    ) -> Result<Self, SweeperError> {
        config.validate()?;
        Ok(Self {
            service,
            interval: config.interval(),
            guard: SingleFlight::new(),
            metrics: Mutex::new(SweepMetrics::new()),
        })
    }

    /// Guard shared with every trigger of this worker
    pub fn guard(&self) -> &SingleFlight {
        &self.guard
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> SweepMetrics {
        self.lock_metrics().clone()
    }

    fn lock_metrics(&self) -> MutexGuard<'_, SweepMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one sweep unless another is in flight
    ///
    /// The sweep itself runs on the blocking pool and keeps the guard until
    /// it finishes, even if the returned future is dropped early.
    ///
    /// # Errors
    ///
    /// `Sweep` if the candidate query failed; `Worker` if the blocking task
    /// panicked or was cancelled.
    pub async fn trigger(&self) -> Result<SweepOutcome, SweeperError> {
        let Some(permit) = self.guard.try_acquire() else {
            tracing::debug!("Sweep already in progress, skipping trigger");
            self.lock_metrics().record_skipped();
            return Ok(SweepOutcome::Skipped);
        };

        tracing::debug!("Starting past-due sweep");
        let service = Arc::clone(&self.service);
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            service.sweep_past_due()
        })
        .await
        .map_err(|e| SweeperError::Worker(e.to_string()))?;

        let elapsed = started.elapsed();
        let mut metrics = self.lock_metrics();

        match result {
            Ok(report) => {
                metrics.record_sweep(report.expired.len(), elapsed);
                tracing::info!(
                    "Sweep completed: {} expired, {} skipped",
                    report.expired.len(),
                    report.skipped.len()
                );
                Ok(SweepOutcome::Completed(report))
            }
            Err(LifecycleError::SweepIncomplete { failed, committed }) => {
                metrics.record_incomplete(committed, failed.len(), elapsed);
                tracing::warn!(
                    "Sweep incomplete: {} expired, {} left for the next run",
                    committed,
                    failed.len()
                );
                Ok(SweepOutcome::Incomplete { failed, committed })
            }
            Err(e) => {
                metrics.record_failure(elapsed);
                Err(SweeperError::Sweep(e))
            }
        }
    }

    /// Run until `shutdown` resolves
    ///
    /// Sweep failures are logged and the loop keeps going. A sweep already
    /// running when shutdown arrives is allowed to finish.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature leaves room for fatal worker errors.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), SweeperError>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!("Sweep worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.trigger().await {
                        tracing::error!("Sweep failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping sweep worker");
                    break;
                }
            }
        }

        tracing::info!("Sweep worker stopped. Final metrics:\n{}", self.metrics().summary());
        Ok(())
    }

    /// Run for a fixed number of ticks
    ///
    /// # Errors
    ///
    /// Stops at the first sweep that could not start.
    pub async fn run_cycles(&self, cycles: usize) -> Result<(), SweeperError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);

            if let Err(e) = self.trigger().await {
                tracing::error!("Sweep {}/{} failed: {}", cycle + 1, cycles, e);
                return Err(e);
            }
        }

        tracing::info!(
            "Sweep worker finished {} cycles. Final metrics:\n{}",
            cycles,
            self.metrics().summary()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use todo_domain::{Clock, Item, ManualClock, NewItem, Status};
    use todo_store::{SqliteStore, StoreError};

    /// Delegates to SQLite but refuses to save one item
    struct RejectingStore {
        inner: SqliteStore,
        reject: Mutex<Option<ItemId>>,
    }

    impl ItemStore for RejectingStore {
        type Error = StoreError;

        fn create(&self, item: NewItem) -> Result<Item, StoreError> {
            self.inner.create(item)
        }

        fn get_by_id(&self, id: ItemId, lock_for_update: bool) -> Result<Option<Item>, StoreError> {
            self.inner.get_by_id(id, lock_for_update)
        }

        fn save(&self, item: &Item) -> Result<Item, StoreError> {
            if *self.reject.lock().unwrap() == Some(item.id) {
                return Err(StoreError::Conflict {
                    id: item.id,
                    expected: item.version,
                    actual: item.version + 1,
                });
            }
            self.inner.save(item)
        }

        fn find_all(&self) -> Result<Vec<Item>, StoreError> {
            self.inner.find_all()
        }

        fn find_by_status(&self, status: Status) -> Result<Vec<Item>, StoreError> {
            self.inner.find_by_status(status)
        }

        fn find_by_status_and_due_date_before(
            &self,
            status: Status,
            before: DateTime<Utc>,
        ) -> Result<Vec<Item>, StoreError> {
            self.inner.find_by_status_and_due_date_before(status, before)
        }

        fn count(&self) -> Result<u64, StoreError> {
            self.inner.count()
        }
    }

    fn service_at<S: ItemStore>(store: S) -> (Arc<LifecycleService<S>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = LifecycleService::with_clock(store, clock.clone());
        (Arc::new(service), clock)
    }

    fn test_config() -> SweeperConfig {
        SweeperConfig {
            interval_secs: 1,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_worker_creation() {
        let (service, _) = service_at(SqliteStore::new(":memory:").unwrap());
        let worker = SweepWorker::new(service, &test_config()).unwrap();
        assert_eq!(worker.metrics(), SweepMetrics::default());
        assert!(!worker.guard().is_busy());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (service, _) = service_at(SqliteStore::new(":memory:").unwrap());
        let config = SweeperConfig {
            interval_secs: 0,
            enabled: true,
        };
        assert!(matches!(
            SweepWorker::new(service, &config),
            Err(SweeperError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_trigger_expires_overdue_items() {
        let (service, clock) = service_at(SqliteStore::new(":memory:").unwrap());
        let due = clock.now() + ChronoDuration::hours(1);
        let item = service.add_item("Renew passport", Some(due)).unwrap();
        let worker = SweepWorker::new(Arc::clone(&service), &test_config()).unwrap();

        let outcome = worker.trigger().await.unwrap();
        assert_eq!(
            outcome,
            SweepOutcome::Completed(SweepReport {
                swept_at: Some(clock.now()),
                ..Default::default()
            })
        );

        clock.advance(ChronoDuration::hours(2));
        match worker.trigger().await.unwrap() {
            SweepOutcome::Completed(report) => assert_eq!(report.expired, vec![item.id]),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let stored = service.get_item(item.id).unwrap().unwrap();
        assert_eq!(stored.status, Status::PastDue);

        let metrics = worker.metrics();
        assert_eq!(metrics.sweep_count, 2);
        assert_eq!(metrics.expired_total, 1);
        assert!(!worker.guard().is_busy());
    }

    #[tokio::test]
    async fn test_trigger_skipped_while_in_flight() {
        let (service, clock) = service_at(SqliteStore::new(":memory:").unwrap());
        let item = service
            .add_item("Water plants", Some(clock.now() + ChronoDuration::minutes(5)))
            .unwrap();
        clock.advance(ChronoDuration::minutes(10));
        let worker = SweepWorker::new(Arc::clone(&service), &test_config()).unwrap();

        let permit = worker.guard().try_acquire().unwrap();
        assert_eq!(worker.trigger().await.unwrap(), SweepOutcome::Skipped);
        assert_eq!(
            service.get_item(item.id).unwrap().unwrap().status,
            Status::NotDone
        );
        drop(permit);

        assert!(matches!(
            worker.trigger().await.unwrap(),
            SweepOutcome::Completed(_)
        ));

        let metrics = worker.metrics();
        assert_eq!(metrics.skipped_count, 1);
        assert_eq!(metrics.sweep_count, 1);
    }

    #[tokio::test]
    async fn test_trigger_reports_incomplete_sweep() {
        let store = RejectingStore {
            inner: SqliteStore::new(":memory:").unwrap(),
            reject: Mutex::new(None),
        };
        let (service, clock) = service_at(store);
        let due = clock.now() + ChronoDuration::minutes(1);
        let a = service.add_item("Pay rent", Some(due)).unwrap();
        let b = service.add_item("Call plumber", Some(due)).unwrap();
        *service.store().reject.lock().unwrap() = Some(b.id);
        clock.advance(ChronoDuration::minutes(2));

        let worker = SweepWorker::new(Arc::clone(&service), &test_config()).unwrap();
        let outcome = worker.trigger().await.unwrap();

        assert_eq!(
            outcome,
            SweepOutcome::Incomplete {
                failed: vec![b.id],
                committed: 1,
            }
        );
        assert_eq!(
            service.get_item(a.id).unwrap().unwrap().status,
            Status::PastDue
        );

        let metrics = worker.metrics();
        assert_eq!(metrics.failed_sweeps, 1);
        assert_eq!(metrics.failed_total, 1);
        assert_eq!(metrics.expired_total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles() {
        let (service, _) = service_at(SqliteStore::new(":memory:").unwrap());
        let worker = SweepWorker::new(service, &test_config()).unwrap();

        worker.run_cycles(3).await.unwrap();

        assert_eq!(worker.metrics().sweep_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_on_shutdown() {
        let (service, _) = service_at(SqliteStore::new(":memory:").unwrap());
        let worker = Arc::new(SweepWorker::new(service, &test_config()).unwrap());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let running = Arc::clone(&worker);
        let handle = tokio::spawn(async move {
            running
                .run_until(async {
                    let _ = rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert!(worker.metrics().sweep_count >= 1);
    }
}
