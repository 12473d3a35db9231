//! Validation queries and bisection
//!
//! A `Query` selects a subset of one explore's fields. When the service reports a SQL
//! error for a query with several fields, the query is divided in two and both halves
//! are validated again, until the error is pinned to a single field.

use std::collections::HashSet;
use std::sync::Arc;

use crate::framework::lookml::{ErrorDetail, ExploreId, FieldId, Project};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Explore {explore} has no fields to query")]
    EmptyFieldSet { explore: String },

    #[error("Field {field} appears more than once in a query on explore {explore}")]
    DuplicateField { explore: String, field: String },

    #[error("A query on explore {explore} with a single field cannot be divided")]
    IndivisibleQuery { explore: String },
}

/// The explore a query runs against, shared by every query in its bisection tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreRef {
    pub id: ExploreId,
    pub model_name: String,
    pub name: String,
}

impl ExploreRef {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.model_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub id: FieldId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Dispatched,
    CompletedPassed,
    CompletedErrored,
    Divided,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryStatus::CompletedPassed | QueryStatus::CompletedErrored | QueryStatus::Divided
        )
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    pub explore: Arc<ExploreRef>,
    fields: Vec<FieldRef>,
    pub query_id: Option<String>,
    pub explore_url: Option<String>,
    pub task_id: Option<String>,
    pub status: QueryStatus,
    pub runtime: Option<f64>,
    pub error: Option<ErrorDetail>,
}

impl Query {
    /// Creates a pending query. The field list must be non-empty and free of duplicates.
    pub fn new(explore: Arc<ExploreRef>, fields: Vec<FieldRef>) -> Result<Self, ConfigurationError> {
        if fields.is_empty() {
            return Err(ConfigurationError::EmptyFieldSet {
                explore: explore.qualified_name(),
            });
        }

        let mut seen = HashSet::with_capacity(fields.len());
        if let Some(duplicate) = fields.iter().find(|field| !seen.insert(field.id)) {
            return Err(ConfigurationError::DuplicateField {
                explore: explore.qualified_name(),
                field: duplicate.name.clone(),
            });
        }

        Ok(Self {
            explore,
            fields,
            query_id: None,
            explore_url: None,
            task_id: None,
            status: QueryStatus::Pending,
            runtime: None,
            error: None,
        })
    }

    /// Root query over every field of an explore.
    pub fn for_explore(project: &Project, explore: ExploreId) -> Result<Self, ConfigurationError> {
        let entry = project.explore(explore);
        let explore_ref = Arc::new(ExploreRef {
            id: explore,
            model_name: entry.model_name.clone(),
            name: entry.name.clone(),
        });
        let fields = project
            .fields_of(explore)
            .map(|field| FieldRef {
                id: field.id,
                name: field.name.clone(),
            })
            .collect();
        Self::new(explore_ref, fields)
    }

    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn is_divisible(&self) -> bool {
        self.fields.len() > 1
    }

    /// Splits the fields in two, preserving order. The first half gets the extra field
    /// when the count is odd. Both children are pending and share the parent's explore.
    pub fn divide(&self) -> Result<(Query, Query), ConfigurationError> {
        if !self.is_divisible() {
            return Err(ConfigurationError::IndivisibleQuery {
                explore: self.explore.qualified_name(),
            });
        }

        let split = self.fields.len().div_ceil(2);
        let (first, second) = self.fields.split_at(split);
        Ok((
            Query::new(self.explore.clone(), first.to_vec())?,
            Query::new(self.explore.clone(), second.to_vec())?,
        ))
    }
}
