use std::sync::Arc;
use tracing::{debug, trace};

use super::query::{Query, QueryStatus};
use super::work_queue::WorkItem;
use super::{Pipeline, ValidatorError};
use crate::infrastructure::looker::LookerApi;

/// Worker turning pending queries into remote query tasks.
///
/// Several dispatchers run in parallel. Each one hands the queries it dispatches over
/// to the collector: the work queue item stays unfinished and the gate permit stays
/// taken until the collector resolves the task.
pub struct Dispatcher {
    id: usize,
    api: Arc<dyn LookerApi>,
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(id: usize, api: Arc<dyn LookerApi>, pipeline: Pipeline) -> Self {
        Self { id, api, pipeline }
    }

    /// Runs until a shutdown item is received or a remote call fails.
    pub async fn run(self) -> Result<(), ValidatorError> {
        loop {
            let Some(item) = self.pipeline.work_queue.get().await else {
                return Ok(());
            };

            match item {
                WorkItem::Shutdown => {
                    trace!("Dispatcher {} shutting down", self.id);
                    self.pipeline.work_queue.task_done();
                    return Ok(());
                }
                WorkItem::Query(query) => self.dispatch(query).await?,
            }
        }
    }

    async fn dispatch(&self, mut query: Query) -> Result<(), ValidatorError> {
        self.pipeline.gate.acquire().await?;

        let created = self
            .api
            .create_query(
                &query.explore.model_name,
                &query.explore.name,
                &query.field_names(),
            )
            .await?;
        let task_id = self.api.create_query_task(&created.id).await?;

        debug!(
            "Dispatcher {} started task {} for {} ({} fields)",
            self.id,
            task_id,
            query.explore.qualified_name(),
            query.fields().len()
        );

        query.query_id = Some(created.id);
        query.explore_url = created.share_url;
        query.task_id = Some(task_id.clone());
        query.status = QueryStatus::Dispatched;

        self.pipeline.registry.insert(task_id.clone(), query);
        self.pipeline.running.put(task_id);
        Ok(())
    }
}
