use serde::Serialize;

use super::query::Query;
use crate::framework::lookml::{ErrorDetail, Project};

/// A passing query whose runtime exceeded the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRunningQuery {
    pub model_name: String,
    pub explore_name: String,
    pub fields: Vec<String>,
    /// Seconds
    pub runtime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explore_url: Option<String>,
}

impl LongRunningQuery {
    pub fn from_query(query: &Query, runtime: f64) -> Self {
        Self {
            model_name: query.explore.model_name.clone(),
            explore_name: query.explore.name.clone(),
            fields: query.field_names(),
            runtime,
            explore_url: query.explore_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub name: String,
    pub queried: bool,
    pub errored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookml_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploreReport {
    pub model_name: String,
    pub name: String,
    pub queried: bool,
    pub errored: bool,
    pub fields: Vec<FieldReport>,
}

impl ExploreReport {
    pub fn errored_fields(&self) -> impl Iterator<Item = &FieldReport> {
        self.fields.iter().filter(|field| field.errored)
    }
}

/// Outcome of a validation run, built from the project once every field is resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub explores: Vec<ExploreReport>,
    /// Slowest first
    pub long_running: Vec<LongRunningQuery>,
}

impl ValidationReport {
    pub fn build(project: &Project, mut long_running: Vec<LongRunningQuery>) -> Self {
        let explores = project
            .explores()
            .iter()
            .map(|explore| ExploreReport {
                model_name: explore.model_name.clone(),
                name: explore.name.clone(),
                queried: explore.queried,
                errored: project.explore_errored(explore.id),
                fields: project
                    .fields_of(explore.id)
                    .map(|field| FieldReport {
                        name: field.name.clone(),
                        queried: field.queried,
                        errored: field.errored,
                        lookml_url: field.lookml_url.clone(),
                        error: field.error.clone(),
                    })
                    .collect(),
            })
            .collect();

        long_running.sort_by(|a, b| b.runtime.total_cmp(&a.runtime));
        Self {
            explores,
            long_running,
        }
    }

    pub fn passed(&self) -> bool {
        self.explores.iter().all(|explore| !explore.errored)
    }

    pub fn field_count(&self) -> usize {
        self.explores.iter().map(|explore| explore.fields.len()).sum()
    }

    pub fn errored_field_count(&self) -> usize {
        self.explores
            .iter()
            .map(|explore| explore.errored_fields().count())
            .sum()
    }

    pub fn errored_explores(&self) -> impl Iterator<Item = &ExploreReport> {
        self.explores.iter().filter(|explore| explore.errored)
    }
}
