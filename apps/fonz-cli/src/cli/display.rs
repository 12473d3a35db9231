//! # Display
//!
//! User-facing output of the CLI. Every line is an action column, right-aligned and
//! colored by `MessageType`, followed by the details:
//!
//! ```text
//!       Validated 42 fields across 3 explores
//!          Failed ecommerce/users: 1 of 12 fields errored
//! ```
//!
//! Use the `show_message!` macro from routines; it also mirrors the message to the log.

use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use serde::Serialize;
use std::io::{stdout, IsTerminal, Result as IoResult, Write};

pub mod status;

/// Width of the action column in terminal output
pub const ACTION_WIDTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageType {
    fn color(&self) -> Color {
        match self {
            MessageType::Info => Color::Cyan,
            MessageType::Success => Color::Green,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub action: String,
    pub details: String,
}

impl Message {
    pub fn new(action: String, details: String) -> Self {
        Self { action, details }
    }
}

fn write_message_to<W: Write>(
    writer: &mut W,
    message_type: MessageType,
    message: &Message,
    no_ansi: bool,
) -> IoResult<()> {
    let action: String = message.action.chars().take(ACTION_WIDTH).collect();
    let padded_action = format!("{action:>ACTION_WIDTH$}");

    if !no_ansi {
        execute!(
            writer,
            SetForegroundColor(message_type.color()),
            SetAttribute(Attribute::Bold)
        )?;
    }
    execute!(writer, Print(&padded_action))?;
    if !no_ansi {
        execute!(writer, ResetColor, SetAttribute(Attribute::Reset))?;
    }

    // Continuation lines line up under the details column
    let indent = " ".repeat(ACTION_WIDTH + 1);
    let details = message.details.replace('\n', &format!("\n{indent}"));
    execute!(writer, Print(" "), Print(details), Print("\n"))?;
    Ok(())
}

pub fn show_message_wrapper(message_type: MessageType, message: Message) {
    let no_ansi = !stdout().is_terminal();
    let mut out = stdout();
    let _ = write_message_to(&mut out, message_type, &message, no_ansi);
}

#[macro_export]
macro_rules! show_message {
    ($message_type:expr, $message:expr) => {{
        let message: $crate::cli::display::Message = $message;
        tracing::info!("{}: {}", message.action, message.details);
        $crate::cli::display::show_message_wrapper($message_type, message);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(message_type: MessageType, action: &str, details: &str, no_ansi: bool) -> String {
        let mut buffer = Vec::new();
        let message = Message::new(action.to_string(), details.to_string());
        write_message_to(&mut buffer, message_type, &message, no_ansi).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_action_is_right_aligned() {
        let output = render(MessageType::Success, "Validated", "12 fields", true);
        assert_eq!(output, "      Validated 12 fields\n");
    }

    #[test]
    fn test_long_action_is_truncated() {
        let output = render(MessageType::Info, "AVeryLongActionName", "x", true);
        assert!(output.starts_with("AVeryLongAction x"));
    }

    #[test]
    fn test_multiline_details_are_indented() {
        let output = render(MessageType::Error, "Error", "first\nsecond", true);
        assert_eq!(output, "          Error first\n                second\n");
    }

    #[test]
    fn test_ansi_codes_only_when_enabled() {
        assert!(render(MessageType::Error, "Error", "boom", false).contains("\x1b["));
        assert!(!render(MessageType::Error, "Error", "boom", true).contains("\x1b["));
    }
}
