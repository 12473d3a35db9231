//! HTTP client for the Looker API
//!
//! Authenticates once with API3 client credentials and sends the returned access token
//! on every subsequent request. All responses are checked for a success status before
//! being decoded; anything else becomes a `LookerApiError`.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::config::LookerConfig;
use super::{
    CreatedQuery, CreatedQueryTask, LookerApi, LookerApiError, LookmlExplore, LookmlModel,
    QueryTaskResult,
};
use crate::utilities::constants::{APP_NAME, CLI_VERSION};
use crate::utilities::url::compose_url;

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

pub struct LookerClient {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl LookerClient {
    /// Builds the HTTP client and logs in with the configured client credentials.
    pub async fn connect(config: &LookerConfig) -> Result<Self, LookerApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{APP_NAME}/{CLI_VERSION}"))
            .build()
            .map_err(|e| LookerApiError::ClientSetup(e.to_string()))?;

        let api_url = config.api_url();
        info!("Authenticating with {}", api_url);

        let (request, url) = login_request(&http, &api_url, config);
        let response = send(request, "POST", &url).await?;
        let token: AccessToken = decode(response, &url).await?;

        Ok(Self {
            http,
            api_url,
            access_token: token.access_token,
        })
    }

    fn request(&self, method: Method, path: &[&str]) -> (RequestBuilder, String) {
        let url = compose_url(&self.api_url, path);
        let builder = self
            .http
            .request(method, &url)
            .header("Authorization", format!("token {}", self.access_token));
        (builder, url)
    }

    fn create_query_request(
        &self,
        model: &str,
        explore: &str,
        fields: &[String],
    ) -> (RequestBuilder, String) {
        let (request, url) = self.request(Method::POST, &["queries"]);
        let body = json!({
            "model": model,
            "view": explore,
            "fields": fields,
            "limit": 0,
            "filter_expression": "1=2",
        });
        (
            request.query(&[("fields", "id,share_url")]).json(&body),
            url,
        )
    }

    fn create_query_task_request(&self, query_id: &str) -> (RequestBuilder, String) {
        let (request, url) = self.request(Method::POST, &["query_tasks"]);
        let body = json!({
            "query_id": query_id,
            "result_format": "json_detail",
        });
        (
            request
                .query(&[("fields", "id"), ("cache", "false")])
                .json(&body),
            url,
        )
    }

    fn multi_results_request(&self, task_ids: &[String]) -> (RequestBuilder, String) {
        let (request, url) = self.request(Method::GET, &["query_tasks", "multi_results"]);
        (
            request.query(&[("query_task_ids", task_ids.join(","))]),
            url,
        )
    }
}

fn login_request(
    http: &reqwest::Client,
    api_url: &str,
    config: &LookerConfig,
) -> (RequestBuilder, String) {
    let url = compose_url(api_url, &["login"]);
    let request = http.post(&url).form(&[
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ]);
    (request, url)
}

async fn send(request: RequestBuilder, method: &str, url: &str) -> Result<Response, LookerApiError> {
    let response = request.send().await.map_err(|source| LookerApiError::Request {
        url: url.to_string(),
        source,
    })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(LookerApiError::UnexpectedStatus {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body,
        });
    }

    Ok(response)
}

async fn read_text(response: Response, url: &str) -> Result<String, LookerApiError> {
    response.text().await.map_err(|source| LookerApiError::Request {
        url: url.to_string(),
        source,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, LookerApiError> {
    let text = read_text(response, url).await?;
    serde_json::from_str(&text).map_err(|e| LookerApiError::MalformedResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait::async_trait]
impl LookerApi for LookerClient {
    async fn create_query(
        &self,
        model: &str,
        explore: &str,
        fields: &[String],
    ) -> Result<CreatedQuery, LookerApiError> {
        let (request, url) = self.create_query_request(model, explore, fields);
        let created: CreatedQuery = decode(send(request, "POST", &url).await?, &url).await?;
        debug!(
            "Created query {} for {}/{} with {} fields",
            created.id,
            model,
            explore,
            fields.len()
        );
        Ok(created)
    }

    async fn create_query_task(&self, query_id: &str) -> Result<String, LookerApiError> {
        let (request, url) = self.create_query_task_request(query_id);
        let task: CreatedQueryTask = decode(send(request, "POST", &url).await?, &url).await?;
        debug!("Started query task {} for query {}", task.id, query_id);
        Ok(task.id)
    }

    async fn get_query_task_multi_results(
        &self,
        task_ids: &[String],
    ) -> Result<HashMap<String, QueryTaskResult>, LookerApiError> {
        let (request, url) = self.multi_results_request(task_ids);
        decode(send(request, "GET", &url).await?, &url).await
    }

    async fn run_query_sql(&self, query_id: &str) -> Result<String, LookerApiError> {
        let (request, url) = self.request(Method::GET, &["queries", query_id, "run", "sql"]);
        read_text(send(request, "GET", &url).await?, &url).await
    }

    async fn get_lookml_models(&self) -> Result<Vec<LookmlModel>, LookerApiError> {
        let (request, url) = self.request(Method::GET, &["lookml_models"]);
        let request = request.query(&[("fields", "name,project_name,explores")]);

        decode(send(request, "GET", &url).await?, &url).await
    }

    async fn get_lookml_explore(
        &self,
        model: &str,
        explore: &str,
    ) -> Result<LookmlExplore, LookerApiError> {
        let (request, url) =
            self.request(Method::GET, &["lookml_models", model, "explores", explore]);
        let request = request.query(&[("fields", "fields")]);

        decode(send(request, "GET", &url).await?, &url).await
    }
}
