//! Bounded worker pool.
//!
//! Job ids arrive on an unbounded channel (so submitting never waits) and,
//! optionally, from a periodic scan of the store for PENDING jobs. Each id
//! is run by its own task holding one semaphore permit, so at most
//! `max_workers` jobs generate at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::worker::Worker;
use crate::error::{Error, Result};
use crate::model::job::JobId;
use crate::store::JobStore;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum jobs generating concurrently.
    pub max_workers: usize,
    /// How often to rescan the store for PENDING jobs. `None` disables
    /// scanning; only ids sent through the [`JobQueue`] run.
    pub poll_interval: Option<Duration>,
    /// Maximum PENDING ids picked up per scan.
    pub scan_batch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval: Some(Duration::from_secs(2)),
            scan_batch: 100,
        }
    }
}

/// Sending side of the pool's intake. Cloned into dispatchers.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<JobId>,
}

impl JobQueue {
    /// Hand a job id to the pool. Never blocks.
    pub fn enqueue(&self, id: JobId) -> Result<()> {
        self.tx
            .send(id)
            .map_err(|_| Error::Other("worker pool is not running".to_string()))
    }
}

/// The pool before it is started.
pub struct WorkerPool {
    worker: Worker,
    store: Arc<dyn JobStore>,
    config: PoolConfig,
}

/// A running pool.
pub struct PoolHandle {
    queue: JobQueue,
    shutdown: Arc<Notify>,
    permits: Arc<Semaphore>,
    max_workers: usize,
    intake: JoinHandle<()>,
}

impl WorkerPool {
    pub fn new(worker: Worker, store: Arc<dyn JobStore>, config: PoolConfig) -> Self {
        Self {
            worker,
            store,
            config,
        }
    }

    /// Start the intake loop on the current runtime.
    pub fn spawn(self) -> PoolHandle {
        let max_workers = self.config.max_workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let permits = Arc::new(Semaphore::new(max_workers));

        let intake = Intake {
            worker: self.worker,
            store: self.store,
            config: self.config,
            permits: Arc::clone(&permits),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        };
        let intake = tokio::spawn(intake.run(rx, Arc::clone(&shutdown)));

        PoolHandle {
            queue: JobQueue { tx },
            shutdown,
            permits,
            max_workers,
            intake,
        }
    }
}

impl PoolHandle {
    /// A queue handle for dispatchers.
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    /// Jobs currently generating.
    pub fn active_workers(&self) -> usize {
        self.max_workers - self.permits.available_permits()
    }

    /// Stop taking new ids and wait for in-flight jobs to finish.
    ///
    /// Ids still queued stay PENDING in the store and are picked up by the
    /// next pool that scans for them.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.intake.await {
            error!("worker pool intake ended abnormally: {e}");
        }
        // Every permit back means every worker task is done.
        match self.permits.acquire_many(self.max_workers as u32).await {
            Ok(_all) => info!("worker pool stopped"),
            Err(e) => warn!("worker pool semaphore closed: {e}"),
        }
    }
}

struct Intake {
    worker: Worker,
    store: Arc<dyn JobStore>,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    /// Ids dispatched but not yet finished, so a scan does not re-send them.
    in_flight: Arc<Mutex<HashSet<JobId>>>,
}

impl Intake {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<JobId>, shutdown: Arc<Notify>) {
        let scanning = self.config.poll_interval.is_some();
        let mut ticker = tokio::time::interval(
            self.config
                .poll_interval
                .unwrap_or(Duration::from_secs(3600)),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            max_workers = self.config.max_workers,
            scanning, "worker pool started"
        );

        loop {
            let batch = tokio::select! {
                _ = shutdown.notified() => {
                    info!("worker pool shutting down");
                    return;
                }
                msg = rx.recv() => match msg {
                    Some(id) => vec![id],
                    None => {
                        debug!("job queue closed");
                        return;
                    }
                },
                _ = ticker.tick(), if scanning => self.scan().await,
            };

            for id in batch {
                tokio::select! {
                    _ = shutdown.notified() => {
                        info!("worker pool shutting down");
                        return;
                    }
                    _ = self.dispatch(id) => {}
                }
            }
        }
    }

    async fn scan(&self) -> Vec<JobId> {
        match self.store.pending_ids(self.config.scan_batch).await {
            Ok(ids) => {
                if !ids.is_empty() {
                    debug!(count = ids.len(), "found pending jobs");
                }
                ids
            }
            Err(e) => {
                warn!("pending scan failed: {e}");
                Vec::new()
            }
        }
    }

    /// Wait for a free slot, then run the job on its own task.
    async fn dispatch(&self, id: JobId) {
        if !self.mark_in_flight(id) {
            debug!(job_id = %id, "already dispatched");
            return;
        }

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.clear_in_flight(id);
                return;
            }
        };

        let worker = self.worker.clone();
        let guard = InFlightGuard {
            id,
            set: Arc::clone(&self.in_flight),
        };
        tokio::spawn(async move {
            // Dropped on return or unwind, so a panicking store cannot pin
            // the id and hide the job from later scans.
            let _guard = guard;
            let _permit = permit;
            // A store failure here can leave the job GENERATING; nothing
            // in the pool retries it.
            if let Err(e) = worker.run(id).await {
                error!(job_id = %id, "job store error during generation: {e}");
            }
        });
    }

    fn mark_in_flight(&self, id: JobId) -> bool {
        self.in_flight
            .lock()
            .map(|mut set| set.insert(id))
            .unwrap_or(true)
    }

    fn clear_in_flight(&self, id: JobId) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&id);
        }
    }
}

/// Clears a dispatched id from the in-flight set when the job task ends.
struct InFlightGuard {
    id: JobId,
    set: Arc<Mutex<HashSet<JobId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = match self.set.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.id);
    }
}
