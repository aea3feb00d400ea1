//! Fan-out strategies for delivery jobs.
//!
//! Every event turns into a batch of independent [`DeliveryJob`]s (one per
//! recipient and sink). How the batch runs is pluggable:
//!
//! - [`InlineExecutor`] drives the jobs one after another before returning,
//!   which keeps tests deterministic.
//! - [`SpawningExecutor`] puts every job on its own tokio task and returns at
//!   once. A shared semaphore caps how many jobs are in flight; permits are
//!   taken inside the task so the publisher never waits for capacity.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use harmony_core::{DispatchConfig, DispatchMode, UserId};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sink {
    Store,
    Email,
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Store => f.write_str("store"),
            Sink::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    /// Nothing to do, e.g. the recipient has no email address.
    Skipped,
    Failed(String),
}

/// One sink write for one recipient. Owns everything it touches.
pub struct DeliveryJob {
    sink: Sink,
    recipient: UserId,
    work: BoxFuture<'static, JobOutcome>,
}

impl DeliveryJob {
    pub fn new<F>(sink: Sink, recipient: UserId, work: F) -> Self
    where
        F: Future<Output = JobOutcome> + Send + 'static,
    {
        Self {
            sink,
            recipient,
            work: work.boxed(),
        }
    }

    pub fn sink(&self) -> Sink {
        self.sink
    }

    pub fn recipient(&self) -> UserId {
        self.recipient
    }

    /// Runs the job; a panic inside it becomes a failure.
    async fn run(self) -> JobOutcome {
        let sink = self.sink;
        let recipient = self.recipient;
        match AssertUnwindSafe(self.work).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(%sink, %recipient, "delivery job panicked");
                JobOutcome::Failed("delivery job panicked".to_string())
            }
        }
    }
}

impl fmt::Debug for DeliveryJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryJob")
            .field("sink", &self.sink)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Per-sink counts for one dispatched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub persisted: usize,
    pub persist_failed: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub emails_skipped: usize,
}

impl DeliveryReport {
    fn record(&mut self, sink: Sink, outcome: &JobOutcome) {
        match (sink, outcome) {
            (Sink::Store, JobOutcome::Delivered) => self.persisted += 1,
            (Sink::Store, _) => self.persist_failed += 1,
            (Sink::Email, JobOutcome::Delivered) => self.emails_sent += 1,
            (Sink::Email, JobOutcome::Skipped) => self.emails_skipped += 1,
            (Sink::Email, JobOutcome::Failed(_)) => self.emails_failed += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.persist_failed + self.emails_failed
    }

    pub fn total(&self) -> usize {
        self.persisted
            + self.persist_failed
            + self.emails_sent
            + self.emails_failed
            + self.emails_skipped
    }
}

enum HandleState {
    Done(DeliveryReport),
    Running(Vec<(Sink, JoinHandle<JobOutcome>)>),
}

/// Completion handle for a dispatched batch.
///
/// Dropping it detaches the batch; jobs keep running in the background.
pub struct DispatchHandle {
    state: HandleState,
}

impl DispatchHandle {
    pub fn completed(report: DeliveryReport) -> Self {
        Self {
            state: HandleState::Done(report),
        }
    }

    fn running(tasks: Vec<(Sink, JoinHandle<JobOutcome>)>) -> Self {
        Self {
            state: HandleState::Running(tasks),
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Done(_) => true,
            HandleState::Running(tasks) => tasks.iter().all(|(_, t)| t.is_finished()),
        }
    }

    /// Waits for every job of the batch and tallies the outcomes.
    pub async fn wait(self) -> DeliveryReport {
        match self.state {
            HandleState::Done(report) => report,
            HandleState::Running(tasks) => {
                let mut report = DeliveryReport::default();
                for (sink, task) in tasks {
                    let outcome = match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => JobOutcome::Failed(e.to_string()),
                    };
                    report.record(sink, &outcome);
                }
                report
            }
        }
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            HandleState::Done(report) => f.debug_tuple("Done").field(report).finish(),
            HandleState::Running(tasks) => f.debug_tuple("Running").field(&tasks.len()).finish(),
        }
    }
}

#[async_trait]
pub trait DeliveryExecutor: Send + Sync {
    async fn execute(&self, jobs: Vec<DeliveryJob>) -> DispatchHandle;

    fn name(&self) -> &'static str;
}

/// Runs jobs sequentially on the caller's task.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

#[async_trait]
impl DeliveryExecutor for InlineExecutor {
    async fn execute(&self, jobs: Vec<DeliveryJob>) -> DispatchHandle {
        let mut report = DeliveryReport::default();
        for job in jobs {
            let sink = job.sink();
            let outcome = job.run().await;
            report.record(sink, &outcome);
        }
        DispatchHandle::completed(report)
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

/// One tokio task per job, at most `max_in_flight` running at once.
#[derive(Debug, Clone)]
pub struct SpawningExecutor {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl SpawningExecutor {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Jobs currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }
}

#[async_trait]
impl DeliveryExecutor for SpawningExecutor {
    async fn execute(&self, jobs: Vec<DeliveryJob>) -> DispatchHandle {
        debug!(jobs = jobs.len(), "spawning delivery jobs");
        let tasks = jobs
            .into_iter()
            .map(|job| {
                let sink = job.sink();
                let permits = Arc::clone(&self.permits);
                let task = tokio::spawn(async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return JobOutcome::Failed(e.to_string()),
                    };
                    job.run().await
                });
                (sink, task)
            })
            .collect();
        DispatchHandle::running(tasks)
    }

    fn name(&self) -> &'static str {
        "spawning"
    }
}

pub fn executor_from_config(config: &DispatchConfig) -> Arc<dyn DeliveryExecutor> {
    match config.mode {
        DispatchMode::Sequential => Arc::new(InlineExecutor),
        DispatchMode::Concurrent => Arc::new(SpawningExecutor::new(config.max_in_flight)),
    }
}
