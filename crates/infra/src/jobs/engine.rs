//! Job queue and bounded-concurrency dispatcher.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::store::{JsonStore, UnitOfWork};

use super::registry::JobRegistry;
use super::types::{JobError, JobId, JobRecord, JobState};

/// Ambient handles injected into every job body.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub store: Arc<JsonStore>,
    /// Cancellation signal; derived from the engine's shutdown token.
    pub cancellation: CancellationToken,
}

impl JobContext {
    /// Fresh unit of work over the shared store.
    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork::new(self.store.clone())
    }
}

type JobFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, JobError>> + Send>>;
type JobBody = Box<dyn FnOnce(JobContext) -> JobFuture + Send>;

struct QueuedJob {
    id: JobId,
    name: String,
    body: JobBody,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct JobEngineConfig {
    /// Upper bound on simultaneously running jobs.
    pub max_concurrent_jobs: usize,
    /// Delay before the dispatch loop retries after a bookkeeping failure.
    pub dispatch_retry_delay: Duration,
}

impl Default for JobEngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            dispatch_retry_delay: Duration::from_secs(5),
        }
    }
}

impl JobEngineConfig {
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }
}

/// Bounded-concurrency background job engine.
///
/// Submissions enter a FIFO queue drained by a single long-lived dispatch
/// task; each job runs on its own task under a semaphore permit. Submitters
/// observe outcomes only through the registry — nothing here surfaces errors
/// back through `submit`.
pub struct JobEngine {
    registry: Arc<JobRegistry>,
    store: Arc<JsonStore>,
    queue: mpsc::UnboundedSender<QueuedJob>,
    shutdown: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl JobEngine {
    /// Start the dispatch loop and return the engine handle.
    pub fn start(config: JobEngineConfig, registry: Arc<JobRegistry>, store: Arc<JsonStore>) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let dispatcher = tokio::spawn(dispatch_loop(
            config,
            rx,
            registry.clone(),
            store.clone(),
            shutdown.clone(),
        ));

        Self {
            registry,
            store,
            queue,
            shutdown,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Submit a job body for background execution.
    ///
    /// Returns the assigned id immediately; never blocks and never fails back
    /// to the caller. An empty name gets a generated label.
    pub fn submit<F, Fut>(&self, name: impl Into<String>, body: F) -> JobId
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<serde_json::Value, JobError>> + Send + 'static,
    {
        let id = JobId::new();
        let mut name = name.into();
        if name.is_empty() {
            name = format!("job-{id}");
        }

        self.registry.insert_queued(JobRecord::queued(id, name.clone()));

        let queued = QueuedJob {
            id,
            name: name.clone(),
            body: Box::new(move |ctx| Box::pin(body(ctx))),
        };
        if self.queue.send(queued).is_err() {
            // Dispatcher is gone (shutdown); record the outcome rather than
            // surfacing an error to the submitter.
            self.registry.mark_failed(id, "job engine is shut down");
        }

        info!(job_id = %id, name = %name, "job enqueued");
        id
    }

    /// Current state of `id`; `NotFound` for ids never submitted here.
    pub fn status(&self, id: JobId) -> JobState {
        self.registry.state(id)
    }

    /// All queued or running jobs, in submission order.
    pub fn active(&self) -> Vec<JobRecord> {
        self.registry.active()
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    pub fn store(&self) -> Arc<JsonStore> {
        self.store.clone()
    }

    /// Stop the dispatch loop and signal cancellation to in-flight jobs.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let dispatcher = self.dispatcher.lock().unwrap().take();
        if let Some(handle) = dispatcher {
            let _ = handle.await;
        }
        info!("job engine stopped");
    }
}

/// Single long-lived dispatcher: pops jobs in FIFO order, waits for a free
/// concurrency slot, then hands each job to its own execution unit. Job
/// failures are contained in the execution unit; a bookkeeping failure here
/// is logged and retried after a delay instead of killing the loop.
async fn dispatch_loop(
    config: JobEngineConfig,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    registry: Arc<JobRegistry>,
    store: Arc<JsonStore>,
    shutdown: CancellationToken,
) {
    info!(
        max_concurrent_jobs = config.max_concurrent_jobs,
        "job engine started"
    );
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));

    loop {
        let queued = tokio::select! {
            _ = shutdown.cancelled() => break,
            queued = rx.recv() => match queued {
                Some(queued) => queued,
                None => break,
            },
        };

        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(err) => {
                    error!(job_id = %queued.id, error = %err, "dispatch bookkeeping failed");
                    registry.mark_failed(queued.id, "dispatcher error");
                    tokio::time::sleep(config.dispatch_retry_delay).await;
                    continue;
                }
            },
        };

        let registry = registry.clone();
        let store = store.clone();
        let cancellation = shutdown.child_token();
        tokio::spawn(async move {
            run_job(registry, store, queued, cancellation).await;
            drop(permit);
        });
    }

    info!("job dispatch loop stopped");
}

/// Execution unit for one job: terminal-state bookkeeping around the body.
/// The body runs on its own task so a panic is contained here and recorded
/// as a failure instead of reaching the dispatch loop.
async fn run_job(
    registry: Arc<JobRegistry>,
    store: Arc<JsonStore>,
    queued: QueuedJob,
    cancellation: CancellationToken,
) {
    let QueuedJob { id, name, body } = queued;

    registry.mark_running(id);
    info!(job_id = %id, name = %name, "job started");

    let ctx = JobContext {
        job_id: id,
        store,
        cancellation,
    };

    match tokio::spawn(body(ctx)).await {
        Ok(Ok(result)) => {
            registry.mark_completed(id, Some(result));
            info!(job_id = %id, name = %name, "job completed");
        }
        Ok(Err(JobError::Cancelled)) => {
            registry.mark_cancelled(id);
            warn!(job_id = %id, name = %name, "job cancelled");
        }
        Ok(Err(err)) => {
            registry.mark_failed(id, err.to_string());
            error!(job_id = %id, name = %name, error = %err, "job failed");
        }
        Err(join_err) => {
            let message = if join_err.is_panic() {
                format!("job panicked: {join_err}")
            } else {
                join_err.to_string()
            };
            registry.mark_failed(id, message.clone());
            error!(job_id = %id, name = %name, error = %message, "job failed");
        }
    }
}
