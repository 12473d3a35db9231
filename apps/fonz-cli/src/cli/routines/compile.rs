use super::{connect, RoutineFailure, RoutineSuccess};
use crate::cli::display::{Message, MessageType};
use crate::cli::settings::Settings;
use crate::framework::validator::compile::SqlCompiler;

pub async fn compile_sql(
    settings: &Settings,
    model: &str,
    explore: &str,
    field: Option<&str>,
) -> Result<RoutineSuccess, RoutineFailure> {
    let api = connect(&settings.looker).await?;
    let compiler = SqlCompiler::new(api);

    let compiled = match field {
        Some(field) => compiler.compile_field(model, explore, field).await,
        None => compiler.compile_explore(model, explore).await,
    }
    .map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Compile".to_string(),
                format!("Failed to compile {model}/{explore}"),
            ),
            e,
        )
    })?;

    let target = match &compiled.field_name {
        Some(field) => format!("{}/{} ({})", compiled.model_name, compiled.explore_name, field),
        None => format!("{}/{}", compiled.model_name, compiled.explore_name),
    };
    show_message!(
        MessageType::Info,
        Message::new("Compiled".to_string(), target)
    );
    println!("{}", compiled.sql);

    Ok(RoutineSuccess::silent(0))
}
