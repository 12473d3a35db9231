//! # Routines
//!
//! A routine is what a CLI command runs: an async function returning a
//! `RoutineSuccess` or a `RoutineFailure`. Both carry a `Message` that `main` displays
//! before exiting; a failure may also carry the underlying error, which is printed after
//! the message.

use std::sync::Arc;

use crate::cli::display::{Message, MessageType};
use crate::infrastructure::looker::{LookerApi, LookerClient, LookerConfig};
use crate::utilities::constants::ENV_PREFIX;

pub mod compile;
pub mod sql;

#[derive(Debug, Clone)]
#[must_use = "The message should be displayed."]
pub struct RoutineSuccess {
    pub message: Message,
    pub message_type: MessageType,
    /// Process exit code; a routine can succeed while reporting failed validations.
    pub exit_code: u8,
}

impl From<RoutineFailure> for anyhow::Error {
    fn from(failure: RoutineFailure) -> Self {
        if let Some(err) = failure.error {
            err
        } else {
            anyhow::anyhow!("{}: {}", failure.message.action, failure.message.details)
        }
    }
}

impl RoutineSuccess {
    pub fn success(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Success,
            exit_code: 0,
        }
    }

    /// The routine ran to completion but found problems to report.
    pub fn failed_checks(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            exit_code: 1,
        }
    }

    /// Suppresses the closing message, e.g. when the output is machine readable.
    pub fn silent(exit_code: u8) -> Self {
        Self {
            message: Message::new(String::new(), String::new()),
            message_type: MessageType::Info,
            exit_code,
        }
    }
}

#[derive(Debug)]
pub struct RoutineFailure {
    pub message: Message,
    pub message_type: MessageType,
    pub error: Option<anyhow::Error>,
}

impl RoutineFailure {
    pub fn new<F: Into<anyhow::Error>>(message: Message, error: F) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: Some(error.into()),
        }
    }

    /// create a RoutineFailure error without an error
    pub fn error(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: None,
        }
    }
}

/// Checks the connection settings and logs in.
pub async fn connect(config: &LookerConfig) -> Result<Arc<dyn LookerApi>, RoutineFailure> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        let variables = missing
            .iter()
            .map(|field| format!("{ENV_PREFIX}_LOOKER__{}", field.to_uppercase()))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(RoutineFailure::error(Message::new(
            "Config".to_string(),
            format!(
                "Missing Looker settings: {}. Set them in the [looker] section of the config file or through {}",
                missing.join(", "),
                variables
            ),
        )));
    }

    let client = LookerClient::connect(config).await.map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Connect".to_string(),
                format!("Could not log in to {}", config.base_url),
            ),
            e,
        )
    })?;
    Ok(Arc::new(client))
}
