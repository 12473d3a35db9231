//! # SQL validator
//!
//! Validates every field of a set of explores by running zero-row queries against the
//! BI service and bisecting failing queries until each error is pinned to a field.
//!
//! ## Pipeline
//!
//! ```text
//!   seed ──► work queue ──► dispatchers (N) ──► running set ──► collector
//!                ▲                                                  │
//!                └──────────── divided halves of failed queries ◄───┘
//! ```
//!
//! - Dispatchers take a gate permit, create the query and its task, and register the
//!   task id. They exit on a `WorkItem::Shutdown`.
//! - The collector polls task ids in batches and resolves finished tasks. It is the only
//!   code that touches the `Project`, so it runs inside the orchestrator's own future.
//! - The run is over when the work queue and the running set are both joined. A
//!   `LookerApiError` anywhere aborts the whole run.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::framework::lookml::Project;
use crate::infrastructure::looker::{LookerApi, LookerApiError};

pub mod collector;
pub mod compile;
pub mod dispatcher;
pub mod gate;
pub mod query;
pub mod registry;
pub mod report;
pub mod work_queue;

use collector::Collector;
use dispatcher::Dispatcher;
use gate::{ConcurrencyGate, GateClosed};
use query::{ConfigurationError, Query};
use registry::TaskRegistry;
use report::ValidationReport;
use work_queue::{WorkItem, WorkQueue};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ValidatorError {
    #[error("Failed to communicate with Looker: {0}")]
    Infrastructure(#[from] LookerApiError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Gate(#[from] GateClosed),

    #[error("A dispatcher stopped unexpectedly: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Queries allowed on the service at once
    pub concurrency: usize,
    /// Dispatcher tasks
    pub workers: usize,
    /// Seconds after which a passing query is reported as long-running
    pub long_running_threshold: f64,
    pub poll_interval: Duration,
    pub poll_batch_size: usize,
    /// Stop at the first error of each explore instead of bisecting
    pub fail_fast: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            workers: 4,
            long_running_threshold: 5.0,
            poll_interval: Duration::from_millis(500),
            poll_batch_size: 100,
            fail_fast: false,
        }
    }
}

/// Queues and shared state of one validation run
#[derive(Clone)]
pub struct Pipeline {
    pub work_queue: Arc<WorkQueue<WorkItem>>,
    /// Task ids waiting to be polled
    pub running: Arc<WorkQueue<String>>,
    pub gate: ConcurrencyGate,
    pub registry: Arc<TaskRegistry>,
}

impl Pipeline {
    pub fn new(concurrency: usize) -> Self {
        Self {
            work_queue: Arc::new(WorkQueue::new()),
            running: Arc::new(WorkQueue::new()),
            gate: ConcurrencyGate::new(concurrency),
            registry: Arc::new(TaskRegistry::new()),
        }
    }
}

pub struct SqlValidator {
    api: Arc<dyn LookerApi>,
    config: ValidatorConfig,
}

impl SqlValidator {
    pub fn new(api: Arc<dyn LookerApi>, config: ValidatorConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates every field of `project` and records the outcome on it.
    ///
    /// On error the project may be partially resolved and should be discarded.
    pub async fn validate(&self, project: &mut Project) -> Result<ValidationReport, ValidatorError> {
        let pipeline = Pipeline::new(self.config.concurrency);

        let roots = project
            .explores()
            .iter()
            .map(|explore| Query::for_explore(project, explore.id))
            .collect::<Result<Vec<_>, _>>()?;
        if roots.is_empty() {
            info!("No explores to validate");
            return Ok(ValidationReport::build(project, Vec::new()));
        }

        info!(
            "Validating {} fields across {} explores (concurrency {}, {} dispatchers)",
            project.field_count(),
            roots.len(),
            pipeline.gate.size(),
            self.config.workers.max(1)
        );
        for query in roots {
            pipeline.work_queue.put(WorkItem::Query(query));
        }

        let workers = self.config.workers.max(1);
        let mut dispatchers = JoinSet::new();
        for id in 0..workers {
            dispatchers.spawn(Dispatcher::new(id, self.api.clone(), pipeline.clone()).run());
        }

        let stop = CancellationToken::new();
        let mut collector = Collector::new(self.api.clone(), pipeline.clone(), project, &self.config);

        let outcome = {
            let collect = collector.run(stop.clone());
            let drained = async {
                pipeline.work_queue.join().await;
                pipeline.running.join().await;
            };
            tokio::pin!(collect, drained);
            let mut drained_done = false;

            loop {
                tokio::select! {
                    biased;
                    Some(joined) = dispatchers.join_next() => {
                        if let Err(e) = joined.map_err(ValidatorError::from).and_then(|r| r) {
                            break Err(e);
                        }
                    }
                    result = &mut collect => break result,
                    _ = &mut drained, if !drained_done => {
                        drained_done = true;
                        debug!("All queries resolved, stopping {} dispatchers", workers);
                        for _ in 0..workers {
                            pipeline.work_queue.put(WorkItem::Shutdown);
                        }
                        stop.cancel();
                    }
                }
            }
        };

        if let Err(e) = outcome {
            error!("Validation aborted: {}", e);
            dispatchers.abort_all();
            return Err(e);
        }
        while let Some(joined) = dispatchers.join_next().await {
            joined??;
        }

        let long_running = collector.into_long_running();
        let report = ValidationReport::build(project, long_running);
        info!(
            "Validation finished: {} of {} fields errored",
            report.errored_field_count(),
            report.field_count()
        );
        Ok(report)
    }
}
