//! Scripted in-memory `LookerApi` for tests.
//!
//! Queries behave like the real service at the level the validator cares about: a
//! query errors when it selects any field registered as bad, and the error message
//! points at the line of the first bad field in the generated SQL. Counters record how
//! the validator used the API so tests can assert on concurrency and call patterns.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{
    CreatedQuery, LookerApi, LookerApiError, LookmlExplore, LookmlExploreField,
    LookmlExploreFields, LookmlModel, LookmlModelExplore, QueryTaskData, QueryTaskError,
    QueryTaskResult, QueryTaskStatus,
};

pub const MOCK_PROJECT: &str = "mock_project";

#[derive(Debug, Clone)]
struct MockQuery {
    explore: String,
    fields: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockTask {
    query_id: String,
    polls: usize,
    reported: bool,
}

/// What the validator did against the mock
#[derive(Debug, Clone, Default)]
pub struct MockStats {
    pub create_query_calls: usize,
    pub create_task_calls: usize,
    pub poll_calls: usize,
    /// Tasks created but not yet reported as finished
    pub in_flight: usize,
    pub max_in_flight: usize,
    /// Field lists of every created query, in creation order
    pub queried_field_sets: Vec<Vec<String>>,
    /// Task ids of every poll call
    pub polled_batches: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: usize,
    queries: HashMap<String, MockQuery>,
    tasks: HashMap<String, MockTask>,
    stats: MockStats,
}

#[derive(Debug, Default)]
pub struct MockLooker {
    models: Vec<LookmlModel>,
    explores: HashMap<(String, String), LookmlExplore>,
    bad_fields: HashSet<String>,
    runtime: f64,
    running_polls: usize,
    fail_create_query_on_call: Option<usize>,
    fail_polls: bool,
    state: Mutex<MockState>,
}

impl MockLooker {
    pub fn new() -> Self {
        Self {
            runtime: 1.0,
            ..Self::default()
        }
    }

    /// Registers an explore (and its model, if new) with the given dimensions.
    pub fn with_explore(mut self, model: &str, explore: &str, fields: &[&str]) -> Self {
        let nav = LookmlModelExplore {
            name: explore.to_string(),
        };
        match self.models.iter_mut().find(|m| m.name == model) {
            Some(existing) => existing.explores.push(nav),
            None => self.models.push(LookmlModel {
                name: model.to_string(),
                project_name: Some(MOCK_PROJECT.to_string()),
                explores: vec![nav],
            }),
        }
        self.explores.insert(
            (model.to_string(), explore.to_string()),
            LookmlExplore {
                fields: LookmlExploreFields {
                    dimensions: fields
                        .iter()
                        .map(|name| LookmlExploreField {
                            name: name.to_string(),
                            lookml_link: Some(format!("/projects/{MOCK_PROJECT}/files/{name}")),
                        })
                        .collect(),
                },
            },
        );
        self
    }

    /// Any query selecting one of these fields fails with a SQL error.
    pub fn with_bad_fields(mut self, fields: &[&str]) -> Self {
        self.bad_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Runtime reported for every successful query
    pub fn with_runtime(mut self, runtime: f64) -> Self {
        self.runtime = runtime;
        self
    }

    /// Number of polls each task reports `running` before it finishes
    pub fn with_running_polls(mut self, polls: usize) -> Self {
        self.running_polls = polls;
        self
    }

    /// The n-th (1-indexed) `create_query` call returns a 404.
    pub fn failing_create_query_on_call(mut self, call: usize) -> Self {
        self.fail_create_query_on_call = Some(call);
        self
    }

    /// Every poll returns a 500.
    pub fn failing_polls(mut self) -> Self {
        self.fail_polls = true;
        self
    }

    pub fn stats(&self) -> MockStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// SQL with one selected field per line, starting on line 2.
    pub fn generated_sql(explore: &str, fields: &[String]) -> String {
        let mut lines = vec!["SELECT".to_string()];
        lines.extend(fields.iter().map(|field| format!("  {field},")));
        lines.push(format!("FROM {explore}"));
        lines.push("WHERE 1=2".to_string());
        lines.push("LIMIT 0".to_string());
        lines.join("\n")
    }

    fn result_for(&self, query: &MockQuery) -> QueryTaskResult {
        let sql = Self::generated_sql(&query.explore, &query.fields);
        let first_bad = query
            .fields
            .iter()
            .position(|field| self.bad_fields.contains(field));

        match first_bad {
            Some(index) => QueryTaskResult {
                status: QueryTaskStatus::Error,
                data: Some(QueryTaskData {
                    runtime: None,
                    sql: Some(sql),
                    errors: vec![QueryTaskError {
                        message: Some("An error occurred while running the query".to_string()),
                        message_details: Some(format!(
                            "Unrecognized name: {} at [{}:3]",
                            query.fields[index],
                            index + 2
                        )),
                    }],
                }),
            },
            None => QueryTaskResult {
                status: QueryTaskStatus::Complete,
                data: Some(QueryTaskData {
                    runtime: Some(self.runtime),
                    sql: Some(sql),
                    errors: Vec::new(),
                }),
            },
        }
    }
}

fn not_found(url: &str) -> LookerApiError {
    LookerApiError::UnexpectedStatus {
        method: "POST".to_string(),
        url: url.to_string(),
        status: 404,
        body: "Not found".to_string(),
    }
}

#[async_trait::async_trait]
impl LookerApi for MockLooker {
    async fn create_query(
        &self,
        _model: &str,
        explore: &str,
        fields: &[String],
    ) -> Result<CreatedQuery, LookerApiError> {
        tokio::task::yield_now().await;
        let mut state = self.lock();
        state.stats.create_query_calls += 1;
        if self.fail_create_query_on_call == Some(state.stats.create_query_calls) {
            return Err(not_found("mock://queries"));
        }

        state.next_id += 1;
        let id = state.next_id.to_string();
        state.queries.insert(
            id.clone(),
            MockQuery {
                explore: explore.to_string(),
                fields: fields.to_vec(),
            },
        );
        state.stats.queried_field_sets.push(fields.to_vec());

        Ok(CreatedQuery {
            share_url: Some(format!("https://mock.looker.com/x/{id}")),
            id,
        })
    }

    async fn create_query_task(&self, query_id: &str) -> Result<String, LookerApiError> {
        tokio::task::yield_now().await;
        let mut state = self.lock();
        if !state.queries.contains_key(query_id) {
            return Err(not_found("mock://query_tasks"));
        }
        state.stats.create_task_calls += 1;
        state.next_id += 1;
        let task_id = format!("task-{}", state.next_id);
        state.tasks.insert(
            task_id.clone(),
            MockTask {
                query_id: query_id.to_string(),
                polls: 0,
                reported: false,
            },
        );
        state.stats.in_flight += 1;
        state.stats.max_in_flight = state.stats.max_in_flight.max(state.stats.in_flight);
        Ok(task_id)
    }

    async fn get_query_task_multi_results(
        &self,
        task_ids: &[String],
    ) -> Result<HashMap<String, QueryTaskResult>, LookerApiError> {
        tokio::task::yield_now().await;
        let mut state = self.lock();
        state.stats.poll_calls += 1;
        state.stats.polled_batches.push(task_ids.to_vec());
        if self.fail_polls {
            return Err(LookerApiError::UnexpectedStatus {
                method: "GET".to_string(),
                url: "mock://query_tasks/multi_results".to_string(),
                status: 500,
                body: "Internal error".to_string(),
            });
        }

        let mut results = HashMap::new();
        for task_id in task_ids {
            let Some(task) = state.tasks.get_mut(task_id) else {
                continue;
            };
            if task.polls < self.running_polls {
                task.polls += 1;
                results.insert(
                    task_id.clone(),
                    QueryTaskResult {
                        status: QueryTaskStatus::Running,
                        data: None,
                    },
                );
                continue;
            }

            let newly_reported = !task.reported;
            task.reported = true;
            let query_id = task.query_id.clone();
            if newly_reported {
                state.stats.in_flight -= 1;
            }
            if let Some(query) = state.queries.get(&query_id) {
                results.insert(task_id.clone(), self.result_for(query));
            }
        }
        Ok(results)
    }

    async fn run_query_sql(&self, query_id: &str) -> Result<String, LookerApiError> {
        let state = self.lock();
        state
            .queries
            .get(query_id)
            .map(|query| Self::generated_sql(&query.explore, &query.fields))
            .ok_or_else(|| not_found("mock://queries/run/sql"))
    }

    async fn get_lookml_models(&self) -> Result<Vec<LookmlModel>, LookerApiError> {
        Ok(self.models.clone())
    }

    async fn get_lookml_explore(
        &self,
        model: &str,
        explore: &str,
    ) -> Result<LookmlExplore, LookerApiError> {
        self.explores
            .get(&(model.to_string(), explore.to_string()))
            .cloned()
            .ok_or_else(|| not_found("mock://lookml_models"))
    }
}
