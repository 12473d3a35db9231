use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::looker::{LookerApi, LookerApiError};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error(transparent)]
    Api(#[from] LookerApiError),

    #[error("Explore {explore} has no dimensions to compile")]
    EmptyExplore { explore: String },

    #[error("Explore {explore} has no dimension named {field}")]
    UnknownField { explore: String, field: String },
}

/// SQL generated by the service for an explore, or for a single field of it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSql {
    pub model_name: String,
    pub explore_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub sql: String,
}

/// Asks the service for the SQL of a query without running it.
pub struct SqlCompiler {
    api: Arc<dyn LookerApi>,
}

impl SqlCompiler {
    pub fn new(api: Arc<dyn LookerApi>) -> Self {
        Self { api }
    }

    /// Compiles a query selecting every dimension of the explore.
    pub async fn compile_explore(
        &self,
        model: &str,
        explore: &str,
    ) -> Result<CompiledSql, CompileError> {
        let fields = self.dimensions(model, explore).await?;
        if fields.is_empty() {
            return Err(CompileError::EmptyExplore {
                explore: format!("{model}/{explore}"),
            });
        }
        let sql = self.compile(model, explore, &fields).await?;
        Ok(CompiledSql {
            model_name: model.to_string(),
            explore_name: explore.to_string(),
            field_name: None,
            sql,
        })
    }

    pub async fn compile_field(
        &self,
        model: &str,
        explore: &str,
        field: &str,
    ) -> Result<CompiledSql, CompileError> {
        let fields = self.dimensions(model, explore).await?;
        if !fields.iter().any(|name| name == field) {
            return Err(CompileError::UnknownField {
                explore: format!("{model}/{explore}"),
                field: field.to_string(),
            });
        }
        let sql = self.compile(model, explore, &[field.to_string()]).await?;
        Ok(CompiledSql {
            model_name: model.to_string(),
            explore_name: explore.to_string(),
            field_name: Some(field.to_string()),
            sql,
        })
    }

    async fn dimensions(&self, model: &str, explore: &str) -> Result<Vec<String>, CompileError> {
        let explore = self.api.get_lookml_explore(model, explore).await?;
        Ok(explore
            .fields
            .dimensions
            .into_iter()
            .map(|dimension| dimension.name)
            .collect())
    }

    async fn compile(
        &self,
        model: &str,
        explore: &str,
        fields: &[String],
    ) -> Result<String, CompileError> {
        let query = self.api.create_query(model, explore, fields).await?;
        debug!("Compiling query {} on {model}/{explore}", query.id);
        Ok(self.api.run_query_sql(&query.id).await?)
    }
}
