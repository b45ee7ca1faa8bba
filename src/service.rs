//! Wires store, storage, builders and pool into one handle.

use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::builder::BuilderRegistry;
use crate::config::Config;
use crate::db::Db;
use crate::engine::{Dispatcher, PoolConfig, PoolHandle, Tracker, Worker, WorkerPool};
use crate::error::Result;
use crate::model::job::{
    Download, JobId, JobStatus, ReportJob, ReportRequest, ReportSummary, Submission,
};
use crate::source::ReportDataSource;
use crate::storage::{FileStorage, LocalFileStorage};
use crate::store::{InMemoryJobStore, JobStore};

/// Backends and settings for a [`ReportService`].
pub struct ServiceParts {
    pub store: Arc<dyn JobStore>,
    pub storage: Arc<dyn FileStorage>,
    pub source: Arc<dyn ReportDataSource>,
    pub builders: BuilderRegistry,
    pub pool: PoolConfig,
    pub job_timeout: Option<Duration>,
}

/// Submit, poll and download reports.
///
/// A service built with [`ReportService::start`] or
/// [`ReportService::from_config`] runs a worker pool. One built with
/// [`ReportService::detached`] or [`ReportService::connect`] never claims
/// or generates jobs; it only writes PENDING records and reads the store.
pub struct ReportService {
    dispatcher: Dispatcher,
    tracker: Tracker,
    pool: Option<PoolHandle>,
}

impl ReportService {
    /// Start the worker pool and build the front-end handles.
    pub fn start(parts: ServiceParts) -> Self {
        let worker = Worker::new(
            Arc::clone(&parts.store),
            Arc::clone(&parts.storage),
            Arc::new(parts.builders),
            Arc::clone(&parts.source),
        )
        .with_timeout(parts.job_timeout);

        let pool = WorkerPool::new(worker, Arc::clone(&parts.store), parts.pool).spawn();
        let dispatcher = Dispatcher::new(Arc::clone(&parts.store), pool.queue());
        let tracker = Tracker::new(parts.store, parts.storage, parts.source);

        Self {
            dispatcher,
            tracker,
            pool: Some(pool),
        }
    }

    /// Front-end handles only, with no worker pool.
    pub fn detached(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        source: Arc<dyn ReportDataSource>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::unqueued(Arc::clone(&store)),
            tracker: Tracker::new(store, storage, source),
            pool: None,
        }
    }

    /// Open the configured backends and start a worker pool on them.
    pub async fn from_config(config: &Config, source: Arc<dyn ReportDataSource>) -> Result<Self> {
        let (store, storage) = open_backends(config).await?;
        info!(pool_size = config.pool_size, "starting worker pool");

        Ok(Self::start(ServiceParts {
            store,
            storage,
            source,
            builders: BuilderRegistry::standard(),
            pool: config.pool_config(),
            job_timeout: config.job_timeout,
        }))
    }

    /// Open the configured backends without a worker pool.
    pub async fn connect(config: &Config, source: Arc<dyn ReportDataSource>) -> Result<Self> {
        let (store, storage) = open_backends(config).await?;
        Ok(Self::detached(store, storage, source))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Whether this service generates reports itself.
    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }

    pub fn active_workers(&self) -> usize {
        self.pool.as_ref().map_or(0, PoolHandle::active_workers)
    }

    pub async fn submit(&self, request: &ReportRequest, requested_by: &str) -> Result<Submission> {
        self.dispatcher.submit(request, requested_by).await
    }

    pub async fn get(&self, id: JobId) -> Result<ReportJob> {
        self.tracker.get(id).await
    }

    pub async fn summary(&self, id: JobId) -> Result<ReportSummary> {
        self.tracker.summary(id).await
    }

    pub async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<ReportSummary>> {
        self.tracker.list(status, limit).await
    }

    pub async fn download(&self, id: JobId) -> Result<Download> {
        self.tracker.download(id).await
    }

    /// Stop the pool, if any, letting in-flight jobs finish.
    pub async fn shutdown(self) {
        if let Some(pool) = self.pool {
            pool.shutdown().await;
        }
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store;
/// artifacts on local disk.
async fn open_backends(config: &Config) -> Result<(Arc<dyn JobStore>, Arc<dyn FileStorage>)> {
    let store: Arc<dyn JobStore> = match config.database_url {
        Some(ref url) => {
            let db = Db::connect(url.expose_secret()).await?;
            db.migrate().await?;
            db.health_check().await?;
            info!("using postgres job store");
            Arc::new(db)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory job store");
            Arc::new(InMemoryJobStore::new())
        }
    };
    let storage = LocalFileStorage::new(&config.storage_root).await?;
    info!(root = %storage.root().display(), "artifact storage ready");
    Ok((store, Arc::new(storage)))
}
