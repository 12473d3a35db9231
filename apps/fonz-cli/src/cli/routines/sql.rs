use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use itertools::Itertools;
use tracing::info;

use super::{connect, RoutineFailure, RoutineSuccess};
use crate::cli::display::status::{format_error, format_success, format_warning};
use crate::cli::display::{Message, MessageType};
use crate::cli::settings::Settings;
use crate::framework::lookml::loader::{load_project, LoadError};
use crate::framework::lookml::selector::ExploreSelection;
use crate::framework::validator::report::{
    ExploreReport, FieldReport, LongRunningQuery, ValidationReport,
};
use crate::framework::validator::{SqlValidator, ValidatorConfig};

/// Flags of `fonz sql`
#[derive(Debug, Clone, Default)]
pub struct SqlArgs {
    pub explores: Vec<String>,
    pub exclude: Vec<String>,
    pub project: Option<String>,
    pub fail_fast: bool,
    pub concurrency: Option<usize>,
    pub runtime_threshold: Option<f64>,
    pub json: bool,
}

/// Settings overridden by command line flags
pub fn validator_config(settings: &Settings, args: &SqlArgs) -> ValidatorConfig {
    let mut config = settings.validator.to_validator_config();
    config.fail_fast = args.fail_fast;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(threshold) = args.runtime_threshold {
        config.long_running_threshold = threshold;
    }
    config
}

pub async fn run_sql_validation(
    settings: &Settings,
    args: &SqlArgs,
) -> Result<RoutineSuccess, RoutineFailure> {
    let selection = ExploreSelection::parse(&args.explores, &args.exclude).map_err(|e| {
        RoutineFailure::new(
            Message::new("Selector".to_string(), e.to_string()),
            e,
        )
    })?;

    let api = connect(&settings.looker).await?;

    let mut project = load_project(api.as_ref(), args.project.as_deref(), &selection)
        .await
        .map_err(|e| match e {
            LoadError::NoExploresMatched(selector) => RoutineFailure::error(Message::new(
                "Load".to_string(),
                format!("No explores with dimensions matched {selector}"),
            )),
            e => RoutineFailure::new(
                Message::new("Load".to_string(), "Failed to load LookML explores".to_string()),
                e,
            ),
        })?;

    let config = validator_config(settings, args);
    if !args.json {
        show_message!(
            MessageType::Info,
            Message::new(
                "Validating".to_string(),
                format!(
                    "{} fields across {} explores (concurrency {}{})",
                    project.field_count(),
                    project.explores().len(),
                    config.concurrency,
                    if config.fail_fast { ", fail fast" } else { "" }
                ),
            )
        );
    }

    let validator = SqlValidator::new(api, config);
    let report = validator.validate(&mut project).await.map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Validation".to_string(),
                "Aborted after a Looker API failure".to_string(),
            ),
            e,
        )
    })?;

    let exit_code = if report.passed() { 0 } else { 1 };

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            RoutineFailure::new(
                Message::new("Report".to_string(), "Failed to serialize the report".to_string()),
                e,
            )
        })?;
        println!("{json}");
        return Ok(RoutineSuccess::silent(exit_code));
    }

    for explore in &report.explores {
        show_explore(explore);
    }
    if !report.long_running.is_empty() {
        show_message!(
            MessageType::Warning,
            Message::new(
                "Slow".to_string(),
                long_running_summary(
                    report.long_running.len(),
                    validator.config().long_running_threshold
                ),
            )
        );
        println!("{}", long_running_table(&report.long_running));
    }

    info!("sql validation exit code {}", exit_code);
    Ok(summary(&report))
}

fn show_explore(explore: &ExploreReport) {
    let name = format!("{}/{}", explore.model_name, explore.name);
    if !explore.errored {
        show_message!(
            MessageType::Success,
            Message::new(
                "Passed".to_string(),
                format_success(&name, &format!("{} fields", explore.fields.len())),
            )
        );
        return;
    }

    let errored = explore.errored_fields().count();
    show_message!(
        MessageType::Error,
        Message::new(
            "Failed".to_string(),
            format_error(
                &name,
                &format!("{} of {} fields errored", errored, explore.fields.len()),
            ),
        )
    );
    for field in explore.errored_fields() {
        show_message!(
            MessageType::Error,
            Message::new("Field".to_string(), field_error_details(field))
        );
    }
}

fn field_error_details(field: &FieldReport) -> String {
    let Some(error) = &field.error else {
        return format_error(&field.name, "errored");
    };

    let mut lines = vec![format_error(&field.name, &error.message)];
    if let Some(context) = &error.context {
        lines.push(context.clone());
    }
    if let Some(url) = &error.explore_url {
        lines.push(format!("Explore: {url}"));
    }
    if let Some(url) = &field.lookml_url {
        lines.push(format!("LookML: {url}"));
    }
    lines.join("\n")
}

fn long_running_summary(count: usize, threshold: f64) -> String {
    let queries = if count == 1 { "query" } else { "queries" };
    format_warning(
        &format!("{count} {queries}"),
        &format!("took longer than {threshold}s"),
    )
}

pub fn long_running_table(queries: &[LongRunningQuery]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Explore", "Fields", "Runtime (s)"]);

    for query in queries {
        table.add_row(vec![
            format!("{}/{}", query.model_name, query.explore_name),
            query.fields.iter().join(", "),
            format!("{:.1}", query.runtime),
        ]);
    }
    table
}

fn summary(report: &ValidationReport) -> RoutineSuccess {
    let explores = report.explores.len();
    if report.passed() {
        RoutineSuccess::success(Message::new(
            "Validated".to_string(),
            format!(
                "{} fields across {} explores, no errors",
                report.field_count(),
                explores
            ),
        ))
    } else {
        RoutineSuccess::failed_checks(Message::new(
            "Failed".to_string(),
            format!(
                "{} of {} fields errored in {} of {} explores",
                report.errored_field_count(),
                report.field_count(),
                report.errored_explores().count(),
                explores
            ),
        ))
    }
}
