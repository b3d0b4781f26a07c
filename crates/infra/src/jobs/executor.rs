//! Background worker that drains the job queue.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use stayforge_core::PropertyId;

use super::store::JobStore;
use super::types::{Job, JobKind, JobResult, JobStatus};

/// Handler invoked for each claimed job.
pub type JobHandler = Box<dyn Fn(&Job) -> JobResult + Send + Sync>;

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// Idle sleep between empty polls.
    pub poll_interval: Duration,
    /// Thread and log name.
    pub name: String,
    /// Restrict the worker to one property's jobs.
    pub property_id: Option<PropertyId>,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "jobs".to_string(),
            property_id: None,
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_property(mut self, property_id: PropertyId) -> Self {
        self.property_id = Some(property_id);
        self
    }
}

/// Handle to a spawned worker.
///
/// Dropping the handle also stops the worker: the loop exits when the stop
/// channel disconnects.
#[derive(Debug)]
pub struct JobExecutorHandle {
    stop: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl JobExecutorHandle {
    /// Stop the worker and wait for its thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Counters the worker keeps while running.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub dead_lettered: u64,
}

impl ExecutorStats {
    fn record(&mut self, outcome: &Result<(), String>, status: &JobStatus) {
        self.processed += 1;
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(_) => {
                self.failed += 1;
                if matches!(status, JobStatus::DeadLettered { .. }) {
                    self.dead_lettered += 1;
                }
            }
        }
    }
}

/// Polls the store, routes each claimed job to a handler by topic, and applies
/// the retry policy to whatever the handler reports.
pub struct JobExecutor<S: JobStore> {
    store: S,
    handlers: HashMap<String, JobHandler>,
}

impl<S: JobStore + 'static> JobExecutor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Subscribe a handler to a topic pattern: exact
    /// (`notify.booking_confirmation`), family (`notify.*`) or `*`.
    pub fn register_handler<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&Job) -> JobResult + Send + Sync + 'static,
    {
        self.handlers.insert(pattern.into(), Box::new(handler));
    }

    fn handler_for(&self, kind: &JobKind) -> Option<&JobHandler> {
        let topic = kind.as_str();
        if let Some(exact) = self.handlers.get(topic) {
            return Some(exact);
        }

        let family = self
            .handlers
            .iter()
            .find(|(pattern, _)| {
                pattern
                    .strip_suffix(".*")
                    .is_some_and(|prefix| topic.starts_with(prefix))
            })
            .map(|(_, handler)| handler);

        family.or_else(|| self.handlers.get("*"))
    }

    /// Spawn the worker thread.
    pub fn spawn(self, config: JobExecutorConfig) -> JobExecutorHandle
    where
        S: Send,
    {
        let (stop_tx, stop_rx) = mpsc::channel();
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let worker_stats = stats.clone();

        let thread = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || run(self, config, stop_rx, worker_stats))
            .expect("failed to spawn job executor thread");

        JobExecutorHandle {
            stop: stop_tx,
            thread: Some(thread),
            stats,
        }
    }

    /// Run a single claimed job through its handler and persist the outcome.
    ///
    /// Jobs normally arrive here from `claim_next`, already marked running; a
    /// job handed in directly is claimed first.
    pub fn run_one(&self, job: &mut Job) -> Result<(), String> {
        if !matches!(job.status, JobStatus::Running) {
            job.begin_attempt();
        }

        let Some(handler) = self.handler_for(&job.kind) else {
            let reason = format!("no handler for topic {}", job.kind.as_str());
            warn!(job_id = %job.id, topic = %job.kind.as_str(), "unroutable job");
            job.fail(reason.clone());
            self.store.update(job).ok();
            return Err(reason);
        };

        match handler(job) {
            JobResult::Success => {
                job.succeed();
                self.store.update(job).map_err(|e| e.to_string())?;
                debug!(job_id = %job.id, "job done");
                Ok(())
            }
            JobResult::Failure(error) => {
                job.fail(error.clone());
                self.store.update(job).map_err(|e| e.to_string())?;

                if matches!(job.status, JobStatus::DeadLettered { .. }) {
                    warn!(job_id = %job.id, error = %error, "job dead-lettered");
                    self.store.dead_letter(job.clone(), error.clone()).ok();
                }

                Err(error)
            }
            JobResult::RetryAfter(delay) => {
                job.fail("retry after delay".to_string());
                job.defer(delay);
                self.store.update(job).map_err(|e| e.to_string())?;
                Err("retry after delay".to_string())
            }
        }
    }

    /// Claim and run jobs until the queue has nothing due.
    fn drain(&self, config: &JobExecutorConfig, stats: &Mutex<ExecutorStats>) {
        loop {
            let mut job = match self.store.claim_next(config.property_id) {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    error!(worker = %config.name, error = ?e, "claim failed");
                    return;
                }
            };

            debug!(
                worker = %config.name,
                job_id = %job.id,
                topic = %job.kind.as_str(),
                "claimed job"
            );

            let outcome = self.run_one(&mut job);
            stats.lock().unwrap().record(&outcome, &job.status);
        }
    }
}

fn run<S: JobStore + 'static>(
    executor: JobExecutor<S>,
    config: JobExecutorConfig,
    stop_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<ExecutorStats>>,
) {
    info!(worker = %config.name, "job worker started");

    loop {
        executor.drain(&config, &stats);

        // Sleeping on the stop channel lets shutdown interrupt the idle wait.
        match stop_rx.recv_timeout(config.poll_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let final_stats = stats.lock().unwrap().clone();
    info!(
        worker = %config.name,
        processed = final_stats.processed,
        succeeded = final_stats.succeeded,
        failed = final_stats.failed,
        dead_lettered = final_stats.dead_lettered,
        "job worker stopped"
    );
}
