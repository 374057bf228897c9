//! Bounded fan-out of independent fetch tasks.
//!
//! Tasks run concurrently up to `max_workers`. Each task returns its decoded
//! document; the caller's sink folds results one at a time in completion
//! order, so aggregation state is never shared between tasks. A failed task
//! is logged with its context and counted; it never cancels the others.

use domain_instances::ServiceKind;
use observability::CollectionMetrics;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::fetch::FetchError;

/// Default number of concurrent fetches
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// What a task fetches, for logs and manual reruns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskContext {
    pub service: ServiceKind,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<String>,
}

impl TaskContext {
    pub fn new(service: ServiceKind, source: &'static str) -> Self {
        Self {
            service,
            source,
            region: None,
            term: None,
            payment: None,
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn term(mut self, term: impl Into<String>, payment: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self.payment = Some(payment.into());
        self
    }
}

impl fmt::Display for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.source)?;
        for part in [&self.region, &self.term, &self.payment].into_iter().flatten() {
            write!(f, "/{part}")?;
        }
        Ok(())
    }
}

/// A failed task and why
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub context: TaskContext,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<TaskFailure>,
}

impl PoolSummary {
    pub fn merge(&mut self, other: PoolSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }

    /// A failure outside the pool (index fetch, token request)
    pub fn record_failure(&mut self, context: TaskContext, error: &FetchError) {
        error!(task = %context, error = %error, "Fetch failed");
        CollectionMetrics::record_task_failed(&context.service.to_string());
        self.failed += 1;
        self.failures.push(TaskFailure {
            context,
            error: error.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct FetchPool {
    max_workers: usize,
}

impl Default for FetchPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl FetchPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs every task and hands each successful result to `sink` as it
    /// completes.
    pub async fn run<T, Fut>(
        &self,
        tasks: Vec<(TaskContext, Fut)>,
        mut sink: impl FnMut(&TaskContext, T),
    ) -> PoolSummary
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();
        let mut contexts = HashMap::with_capacity(tasks.len());
        let mut summary = PoolSummary::default();

        debug!(tasks = tasks.len(), max_workers = self.max_workers, "Starting fetch tasks");

        for (context, task) in tasks {
            let semaphore = Arc::clone(&semaphore);
            CollectionMetrics::record_task_started(&context.service.to_string());

            let handle = join_set.spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => task.await,
                    Err(_) => Err(FetchError::Aborted("worker pool closed".to_string())),
                }
            });
            contexts.insert(handle.id(), context);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_error) => {
                    let reason = if join_error.is_panic() { "panicked" } else { "cancelled" };
                    (join_error.id(), Err(FetchError::Aborted(format!("task {reason}"))))
                }
            };
            let Some(context) = contexts.remove(&id) else {
                error!(task_id = %id, "Finished task has no context");
                summary.failed += 1;
                continue;
            };

            match result {
                Ok(value) => {
                    CollectionMetrics::record_task_succeeded(&context.service.to_string());
                    summary.succeeded += 1;
                    sink(&context, value);
                }
                Err(error) => summary.record_failure(context, &error),
            }
        }

        summary
    }
}
