//! Collects query task results and decides what each outcome means.
//!
//! The collector is the only place where field state changes. For every finished task:
//!
//! | Outcome                        | Action                                       |
//! |--------------------------------|----------------------------------------------|
//! | complete                       | fields pass, slow queries are recorded       |
//! | error, several fields          | query is divided, both halves re-queued      |
//! | error, one field               | field errored, error located in the SQL      |
//! | error, fail-fast               | every field errored with the query's message |
//!
//! After any of these the query's gate permit is released and its work item is done.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::query::{Query, QueryStatus};
use super::report::LongRunningQuery;
use super::work_queue::WorkItem;
use super::{Pipeline, ValidatorConfig, ValidatorError};
use crate::framework::lookml::{ErrorDetail, Project};
use crate::infrastructure::looker::{LookerApi, LookerApiError, QueryTaskResult, QueryTaskStatus};
use crate::utilities::sql_context::{extract_error_context, DEFAULT_WINDOW_SIZE};

const MISSING_ERROR_MESSAGE: &str = "The query failed without an error message";

pub struct Collector<'a> {
    api: Arc<dyn LookerApi>,
    pipeline: Pipeline,
    project: &'a mut Project,
    fail_fast: bool,
    long_running_threshold: f64,
    poll_interval: Duration,
    batch_size: usize,
    long_running: Vec<LongRunningQuery>,
}

impl<'a> Collector<'a> {
    pub fn new(
        api: Arc<dyn LookerApi>,
        pipeline: Pipeline,
        project: &'a mut Project,
        config: &ValidatorConfig,
    ) -> Self {
        Self {
            api,
            pipeline,
            project,
            fail_fast: config.fail_fast,
            long_running_threshold: config.long_running_threshold,
            poll_interval: config.poll_interval,
            batch_size: config.poll_batch_size,
            long_running: Vec::new(),
        }
    }

    /// Polls running tasks until `stop` is cancelled or a remote call fails.
    pub async fn run(&mut self, stop: CancellationToken) -> Result<(), ValidatorError> {
        loop {
            let batch = tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                batch = self.pipeline.running.get_batch(self.batch_size) => batch,
            };

            let still_running = self.poll(batch).await?;
            if still_running > 0 {
                tokio::select! {
                    _ = stop.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
    }

    /// Polls one batch of task ids and handles every finished task. Returns how many
    /// tasks are still running; those are put back on the running queue.
    pub async fn poll(&mut self, batch: Vec<String>) -> Result<usize, ValidatorError> {
        if batch.is_empty() {
            return Ok(0);
        }

        trace!("Polling {} query tasks", batch.len());
        let mut results = self.api.get_query_task_multi_results(&batch).await?;
        let mut still_running = 0;

        for task_id in batch {
            match results.remove(&task_id) {
                Some(result) => match result.status {
                    QueryTaskStatus::Complete | QueryTaskStatus::Error => {
                        self.resolve(&task_id, result)?;
                    }
                    QueryTaskStatus::Added | QueryTaskStatus::Running => {
                        still_running += 1;
                        self.pipeline.running.put(task_id);
                    }
                    QueryTaskStatus::Killed
                    | QueryTaskStatus::Expired
                    | QueryTaskStatus::Unknown => {
                        return Err(LookerApiError::UnexpectedTaskStatus {
                            task_id,
                            status: result.status.as_str().to_string(),
                        }
                        .into());
                    }
                },
                None => {
                    still_running += 1;
                    self.pipeline.running.put(task_id);
                }
            }
            self.pipeline.running.task_done();
        }

        Ok(still_running)
    }

    fn resolve(&mut self, task_id: &str, result: QueryTaskResult) -> Result<(), ValidatorError> {
        let mut query = self
            .pipeline
            .registry
            .remove(task_id)
            .ok_or_else(|| LookerApiError::UnknownTask(task_id.to_string()))?;

        if result.status == QueryTaskStatus::Complete {
            self.handle_passed(&mut query, &result);
        } else {
            self.handle_errored(&mut query, &result)?;
        }

        self.pipeline.gate.release();
        self.pipeline.work_queue.task_done();
        Ok(())
    }

    fn handle_passed(&mut self, query: &mut Query, result: &QueryTaskResult) {
        query.runtime = result.runtime();
        for field in query.fields() {
            self.project.mark_field_queried(field.id);
        }
        self.project.refresh_explore(query.explore.id);
        query.status = QueryStatus::CompletedPassed;

        if let Some(runtime) = query.runtime {
            if runtime > self.long_running_threshold {
                info!(
                    "Query on {} took {:.1}s ({} fields)",
                    query.explore.qualified_name(),
                    runtime,
                    query.fields().len()
                );
                self.long_running.push(LongRunningQuery::from_query(query, runtime));
            }
        }
    }

    fn handle_errored(
        &mut self,
        query: &mut Query,
        result: &QueryTaskResult,
    ) -> Result<(), ValidatorError> {
        if !self.fail_fast && query.is_divisible() {
            let (first, second) = query.divide()?;
            debug!(
                "Query on {} failed, dividing {} fields into {} and {}",
                query.explore.qualified_name(),
                query.fields().len(),
                first.fields().len(),
                second.fields().len()
            );
            query.status = QueryStatus::Divided;
            self.pipeline.work_queue.put(WorkItem::Query(first));
            self.pipeline.work_queue.put(WorkItem::Query(second));
            return Ok(());
        }

        let message = result
            .error_message()
            .unwrap_or_else(|| MISSING_ERROR_MESSAGE.to_string());
        let sql = result.sql().unwrap_or_default().to_string();

        let error = if self.fail_fast {
            ErrorDetail {
                message,
                sql,
                line_number: None,
                context: None,
                explore_url: query.explore_url.clone(),
            }
        } else {
            let context = extract_error_context(&sql, &message, DEFAULT_WINDOW_SIZE);
            ErrorDetail {
                message,
                sql,
                line_number: context.line_number,
                context: context.snippet,
                explore_url: query.explore_url.clone(),
            }
        };

        for field in query.fields() {
            debug!("Field {} errored: {}", field.name, error.message);
            self.project.mark_field_errored(field.id, error.clone());
        }
        self.project.refresh_explore(query.explore.id);
        query.error = Some(error);
        query.status = QueryStatus::CompletedErrored;
        Ok(())
    }

    pub fn into_long_running(self) -> Vec<LongRunningQuery> {
        self.long_running
    }
}
