#[macro_use]
pub(crate) mod display;

mod commands;
pub mod logger;
pub mod routines;
pub mod settings;

use clap::Parser;
use commands::Commands;
use tracing::info;

use routines::compile::compile_sql;
use routines::sql::{run_sql_validation, SqlArgs};
use routines::{RoutineFailure, RoutineSuccess};
use settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, arg_required_else_help(true), next_display_order = None)]
pub struct Cli {
    /// Print backtraces for all errors (same as RUST_LIB_BACKTRACE=1)
    #[arg(
        long,
        global = true,
        help = "Print backtraces for all errors (same as RUST_LIB_BACKTRACE=1)"
    )]
    pub backtrace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

pub async fn top_command_handler(
    settings: Settings,
    commands: &Commands,
) -> Result<RoutineSuccess, RoutineFailure> {
    match commands {
        Commands::Sql {
            explores,
            exclude,
            project,
            fail_fast,
            concurrency,
            runtime_threshold,
            json,
        } => {
            info!(
                "Running sql command with explores: {:?}, exclude: {:?}, fail_fast: {}",
                explores, exclude, fail_fast
            );
            let args = SqlArgs {
                explores: explores.clone(),
                exclude: exclude.clone(),
                project: project.clone(),
                fail_fast: *fail_fast,
                concurrency: *concurrency,
                runtime_threshold: *runtime_threshold,
                json: *json,
            };
            run_sql_validation(&settings, &args).await
        }
        Commands::Compile {
            model,
            explore,
            field,
        } => {
            info!(
                "Running compile command for {}/{} field: {:?}",
                model, explore, field
            );
            compile_sql(&settings, model, explore, field.as_deref()).await
        }
    }
}
