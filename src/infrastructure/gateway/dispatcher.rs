//! Bounded background work for the request path
//!
//! Statistics, audit writes and `last_used_at` updates are queued on a
//! bounded channel and executed by a fixed pool of workers. Submitting never
//! waits: a full queue drops the job. Job failures are logged and swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::domain::credential::{ApiKey, CredentialDirectory};
use crate::domain::gateway::{AuditEntry, CheckRecord};
use crate::infrastructure::observability::record_dispatch_dropped;

use super::audit::AuditSink;
use super::stats::MetricsAggregator;

#[derive(Debug, Clone)]
pub enum BackgroundJob {
    Stats(CheckRecord),
    Audit(Box<AuditEntry>),
    TouchCredential { api_key: ApiKey, at: DateTime<Utc> },
}

impl BackgroundJob {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stats(_) => "stats",
            Self::Audit(_) => "audit",
            Self::TouchCredential { .. } => "touch_credential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("background queue is full")]
    QueueFull,
    #[error("background dispatcher is shut down")]
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 10_000,
        }
    }
}

/// Collaborators the workers execute jobs against
#[derive(Debug, Clone)]
pub struct JobContext {
    pub aggregator: Arc<MetricsAggregator>,
    pub audit: Arc<dyn AuditSink>,
    pub directory: Arc<dyn CredentialDirectory>,
}

impl JobContext {
    async fn execute(&self, job: BackgroundJob) {
        let kind = job.kind();

        let result = match job {
            BackgroundJob::Stats(record) => self.aggregator.record(&record).await,
            BackgroundJob::Audit(entry) => self.audit.write(&entry).await,
            BackgroundJob::TouchCredential { api_key, at } => {
                self.directory.touch_last_used(&api_key, at).await
            }
        };

        if let Err(e) = result {
            tracing::warn!(job = kind, error = %e, "Background job failed");
        }
    }
}

enum Message {
    Job(BackgroundJob),
    Shutdown,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Job(job) => write!(f, "Job({})", job.kind()),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Handle to the worker pool; clones share the same queue
#[derive(Debug, Clone)]
pub struct BackgroundDispatcher {
    sender: mpsc::Sender<Message>,
    closed: Arc<AtomicBool>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundDispatcher {
    /// Spawn the worker pool
    pub fn start(context: JobContext, config: DispatcherConfig) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(context);

        let handles = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, receiver.clone(), context.clone())))
            .collect();

        tracing::info!(
            workers,
            queue_capacity = config.queue_capacity,
            "Background dispatcher started"
        );

        Self {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
            workers: Arc::new(Mutex::new(handles)),
        }
    }

    /// Queue a job without waiting
    pub fn submit(&self, job: BackgroundJob) -> Result<(), DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Shutdown);
        }

        match self.sender.try_send(Message::Job(job)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(Message::Job(job))) => {
                tracing::warn!(job = job.kind(), "Background queue full, dropping job");
                record_dispatch_dropped(job.kind());
                Err(DispatchError::QueueFull)
            }
            Err(_) => Err(DispatchError::Shutdown),
        }
    }

    /// Stop accepting jobs, let the workers drain the queue and wait for them
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let handles = std::mem::take(&mut *self.workers.lock().await);

        // Queued behind every pending job, one per worker
        for _ in 0..handles.len() {
            if self.sender.send(Message::Shutdown).await.is_err() {
                break;
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background worker panicked");
            }
        }

        tracing::info!("Background dispatcher stopped");
    }
}

async fn run_worker(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Message>>>, context: Arc<JobContext>) {
    tracing::debug!(worker = id, "Background worker started");

    loop {
        let message = receiver.lock().await.recv().await;

        match message {
            Some(Message::Job(job)) => context.execute(job).await,
            Some(Message::Shutdown) | None => break,
        }
    }

    tracing::debug!(worker = id, "Background worker stopped");
}
