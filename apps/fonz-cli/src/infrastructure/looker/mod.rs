//! # Looker API
//!
//! Operations the validator consumes from the remote BI service. The service compiles
//! the SQL for a model/explore/field selection and runs it asynchronously as a
//! "query task" whose status is polled in batches.
//!
//! ## Architecture
//!
//! - `LookerApi`: async trait over every remote operation. The validation engine only
//!   talks to this trait, so tests drive it with a scripted in-memory implementation.
//! - `LookerClient`: the HTTP implementation (reqwest + token authentication).
//! - `LookerConfig`: connection settings, deserialized from the `[looker]` config section.
//!
//! ## Errors
//!
//! Every failure of the remote call itself (transport error, non-success status,
//! undecodable body, unexpected task state) is a `LookerApiError`. These are
//! infrastructure failures and abort a validation run. SQL errors reported *by* the
//! service are not errors at this layer; they arrive as `QueryTaskStatus::Error` results.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

pub mod client;
pub mod config;
#[cfg(test)]
pub mod test_looker;

pub use client::LookerClient;
pub use config::LookerConfig;

#[derive(Debug, thiserror::Error)]
pub enum LookerApiError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned status {status}: {body}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Query task {task_id} ended with status '{status}'")]
    UnexpectedTaskStatus { task_id: String, status: String },

    #[error("Received a result for unknown query task {0}")]
    UnknownTask(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientSetup(String),
}

/// Response of `POST queries`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreatedQuery {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub share_url: Option<String>,
}

/// Response of `POST query_tasks`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreatedQueryTask {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryTaskStatus {
    Added,
    Running,
    Complete,
    Error,
    Killed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl QueryTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTaskStatus::Added => "added",
            QueryTaskStatus::Running => "running",
            QueryTaskStatus::Complete => "complete",
            QueryTaskStatus::Error => "error",
            QueryTaskStatus::Killed => "killed",
            QueryTaskStatus::Expired => "expired",
            QueryTaskStatus::Unknown => "unknown",
        }
    }
}

/// One entry of `GET query_tasks/multi_results`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QueryTaskResult {
    pub status: QueryTaskStatus,
    #[serde(default)]
    pub data: Option<QueryTaskData>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryTaskData {
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub errors: Vec<QueryTaskError>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryTaskError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_details: Option<String>,
}

impl QueryTaskResult {
    pub fn runtime(&self) -> Option<f64> {
        self.data.as_ref().and_then(|data| data.runtime)
    }

    pub fn sql(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.sql.as_deref())
    }

    /// The most specific message of the first reported error.
    ///
    /// The service puts the warehouse's own message in `message_details` and a generic
    /// summary in `message`; the detail is preferred when present.
    pub fn error_message(&self) -> Option<String> {
        let error = self.data.as_ref()?.errors.first()?;
        error
            .message_details
            .as_deref()
            .filter(|details| !details.trim().is_empty())
            .or(error.message.as_deref())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LookmlModel {
    pub name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub explores: Vec<LookmlModelExplore>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LookmlModelExplore {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LookmlExplore {
    #[serde(default)]
    pub fields: LookmlExploreFields,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LookmlExploreFields {
    #[serde(default)]
    pub dimensions: Vec<LookmlExploreField>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LookmlExploreField {
    pub name: String,
    #[serde(default)]
    pub lookml_link: Option<String>,
}

// Query ids are integers in API 3.x and strings in 4.0
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// Trait over the remote operations used by validation, compilation and model loading.
#[async_trait::async_trait]
pub trait LookerApi: Send + Sync {
    /// Creates a query selecting `fields` from `explore` in `model`.
    ///
    /// The query is created with a zero row limit and an always-false filter so that
    /// running it only compiles and plans the SQL on the warehouse.
    async fn create_query(
        &self,
        model: &str,
        explore: &str,
        fields: &[String],
    ) -> Result<CreatedQuery, LookerApiError>;

    /// Starts an asynchronous run of a query, bypassing the result cache.
    async fn create_query_task(&self, query_id: &str) -> Result<String, LookerApiError>;

    /// Fetches the status of several query tasks at once.
    ///
    /// Tasks the service has no news about may be missing from the returned map.
    async fn get_query_task_multi_results(
        &self,
        task_ids: &[String],
    ) -> Result<HashMap<String, QueryTaskResult>, LookerApiError>;

    /// Returns the SQL the service generates for a query, without running it.
    async fn run_query_sql(&self, query_id: &str) -> Result<String, LookerApiError>;

    async fn get_lookml_models(&self) -> Result<Vec<LookmlModel>, LookerApiError>;

    async fn get_lookml_explore(
        &self,
        model: &str,
        explore: &str,
    ) -> Result<LookmlExplore, LookerApiError>;
}
