//! # Looker Config
//! Connection settings for the remote BI service, read from the `[looker]` section of
//! the user config and overridable through `FONZ_LOOKER__*` environment variables.

use serde::{Deserialize, Serialize};

use crate::utilities::url::compose_url;

pub const DEFAULT_API_PORT: u16 = 19999;
pub const DEFAULT_API_VERSION: &str = "4.0";

fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LookerConfig {
    /// Instance URL without port, e.g. https://company.looker.com
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LookerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            port: default_port(),
            api_version: default_api_version(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LookerConfig {
    /// Root of all API calls: `<base_url>:<port>/api/<api_version>`
    pub fn api_url(&self) -> String {
        let host = format!("{}:{}", self.base_url.trim_end_matches('/'), self.port);
        compose_url(&host, &["api", &self.api_version])
    }

    /// Lists the settings that must be present before connecting.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push("base_url");
        }
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("client_secret");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_includes_port_and_version() {
        let config = LookerConfig {
            base_url: "https://test.looker.com/".to_string(),
            ..LookerConfig::default()
        };
        assert_eq!(config.api_url(), "https://test.looker.com:19999/api/4.0");
    }

    #[test]
    fn test_missing_fields_reports_credentials() {
        let config = LookerConfig {
            base_url: "https://test.looker.com".to_string(),
            client_id: "id".to_string(),
            ..LookerConfig::default()
        };
        assert_eq!(config.missing_fields(), vec!["client_secret"]);
    }
}
