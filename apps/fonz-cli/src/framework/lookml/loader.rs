//! Builds a `Project` from the model metadata exposed by the remote service.

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use super::selector::ExploreSelection;
use super::Project;
use crate::infrastructure::looker::{LookerApi, LookerApiError};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to fetch LookML metadata")]
    Api(#[from] LookerApiError),

    #[error("No explores matched {0}")]
    NoExploresMatched(String),
}

/// Loads every selected explore with its dimensions.
///
/// When `project_name` is set, only models belonging to that LookML project are
/// considered. Explores without any dimension are skipped since there is nothing in
/// them to validate.
pub async fn load_project(
    api: &dyn LookerApi,
    project_name: Option<&str>,
    selection: &ExploreSelection,
) -> Result<Project, LoadError> {
    let models = api.get_lookml_models().await?;

    let mut selected = Vec::new();
    for model in &models {
        if let Some(wanted) = project_name {
            if model.project_name.as_deref() != Some(wanted) {
                debug!("Skipping model {} from another project", model.name);
                continue;
            }
        }
        selected.extend(
            model
                .explores
                .iter()
                .filter(|nav| selection.is_selected(&model.name, &nav.name))
                .map(|nav| (model.name.as_str(), nav.name.as_str())),
        );
    }

    // Explore metadata requests are independent; results keep the selection order.
    let explores = try_join_all(
        selected
            .iter()
            .map(|(model, explore)| api.get_lookml_explore(model, explore)),
    )
    .await?;

    let mut project = Project::new();
    for ((model, name), explore) in selected.into_iter().zip(explores) {
        if explore.fields.dimensions.is_empty() {
            warn!("Explore {}/{} has no dimensions, skipping it", model, name);
            continue;
        }

        let explore_id = project.add_explore(model, name);
        for dimension in explore.fields.dimensions {
            project.add_field(explore_id, &dimension.name, dimension.lookml_link);
        }
    }

    if project.is_empty() {
        return Err(LoadError::NoExploresMatched(selection.to_string()));
    }

    info!(
        "Loaded {} explores with {} fields",
        project.explores().len(),
        project.field_count()
    );
    Ok(project)
}
