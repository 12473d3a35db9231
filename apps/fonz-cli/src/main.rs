#[macro_use]
mod cli;
pub mod framework;
pub mod infrastructure;
pub mod utilities;

use std::process::ExitCode;

use clap::Parser;
use cli::display::{Message, MessageType};

// Entry point for the CLI application
fn main() -> ExitCode {
    // Handle all CLI setup that doesn't require async functionality
    if let Err(e) = cli::settings::setup_user_directory() {
        show_message!(
            MessageType::Error,
            Message {
                action: "Init".to_string(),
                details: format!(
                    "Failed to initialize ~/.fonz, please check your permissions: {e:?}"
                ),
            }
        );
        return ExitCode::from(1);
    }

    if let Err(e) = cli::settings::init_config_file() {
        show_message!(
            MessageType::Error,
            Message::new("Init".to_string(), e.to_string())
        );
        return ExitCode::from(1);
    }

    let config = match cli::settings::read_settings() {
        Ok(config) => config,
        Err(e) => {
            show_message!(
                MessageType::Error,
                Message::new("Config".to_string(), e.to_string())
            );
            return ExitCode::from(1);
        }
    };

    // --help, --version and usage errors exit here
    let cli_result = cli::Cli::parse();

    if cli_result.backtrace {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }

    if let Err(e) = cli::logger::setup_logging(&config.logger) {
        eprintln!("{e}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            show_message!(
                MessageType::Error,
                Message::new(
                    "Init".to_string(),
                    format!("Failed to start the async runtime: {e}")
                )
            );
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(cli::top_command_handler(config, &cli_result.command));

    match result {
        Ok(s) => {
            // Skip displaying empty messages (used for --json output where JSON is already printed)
            if !s.message.action.is_empty() || !s.message.details.is_empty() {
                show_message!(s.message_type, s.message);
            }
            ExitCode::from(s.exit_code)
        }
        Err(e) => {
            show_message!(e.message_type, e.message);
            if let Some(err) = e.error {
                eprintln!("{err:?}");
            }
            ExitCode::from(1)
        }
    }
}
