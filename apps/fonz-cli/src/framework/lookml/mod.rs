//! # LookML data model
//!
//! The explores and fields under validation, stored in an index-addressed table.
//!
//! A `Project` owns every `Explore` and `Field`. Everything else refers to them by
//! `ExploreId`/`FieldId`: a field points back at its explore by id, and validation
//! queries carry ids rather than references. Only the validator's collector mutates the
//! table, one field at a time, so no per-field locking is needed.

use serde::Serialize;

pub mod loader;
pub mod selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExploreId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(pub usize);

/// Where and why a field's SQL failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    /// The SQL the service ran when it reported the error
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explore_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Explore {
    pub id: ExploreId,
    pub model_name: String,
    pub name: String,
    pub fields: Vec<FieldId>,
    /// Every field has been resolved as passing
    pub queried: bool,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub explore: ExploreId,
    pub lookml_url: Option<String>,
    pub queried: bool,
    pub errored: bool,
    pub error: Option<ErrorDetail>,
}

impl Field {
    pub fn is_resolved(&self) -> bool {
        self.queried || self.errored
    }
}

/// Table of explores and their fields.
///
/// Ids are only meaningful for the project that issued them; looking up a foreign id
/// panics like an out-of-bounds index.
#[derive(Debug, Clone, Default)]
pub struct Project {
    explores: Vec<Explore>,
    fields: Vec<Field>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_explore(&mut self, model_name: &str, name: &str) -> ExploreId {
        let id = ExploreId(self.explores.len());
        self.explores.push(Explore {
            id,
            model_name: model_name.to_string(),
            name: name.to_string(),
            fields: Vec::new(),
            queried: false,
        });
        id
    }

    pub fn add_field(
        &mut self,
        explore: ExploreId,
        name: &str,
        lookml_url: Option<String>,
    ) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields.push(Field {
            id,
            name: name.to_string(),
            explore,
            lookml_url,
            queried: false,
            errored: false,
            error: None,
        });
        self.explores[explore.0].fields.push(id);
        id
    }

    pub fn explores(&self) -> &[Explore] {
        &self.explores
    }

    pub fn explore(&self, id: ExploreId) -> &Explore {
        &self.explores[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn fields_of(&self, explore: ExploreId) -> impl Iterator<Item = &Field> {
        self.explores[explore.0]
            .fields
            .iter()
            .map(move |id| &self.fields[id.0])
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explores.is_empty()
    }

    /// Marks a field as passing. An errored field stays errored; returns whether the
    /// field was marked.
    pub fn mark_field_queried(&mut self, id: FieldId) -> bool {
        let field = &mut self.fields[id.0];
        if field.errored {
            return false;
        }
        field.queried = true;
        true
    }

    /// Records the error for a field. The first error wins; returns whether this call
    /// recorded it.
    pub fn mark_field_errored(&mut self, id: FieldId, error: ErrorDetail) -> bool {
        let field = &mut self.fields[id.0];
        if field.errored {
            return false;
        }
        field.errored = true;
        field.queried = false;
        field.error = Some(error);
        true
    }

    /// Recomputes `queried` for an explore from the state of its fields.
    pub fn refresh_explore(&mut self, id: ExploreId) {
        let queried = self.explores[id.0]
            .fields
            .iter()
            .all(|field| self.fields[field.0].queried);
        self.explores[id.0].queried = queried;
    }

    pub fn explore_errored(&self, id: ExploreId) -> bool {
        self.fields_of(id).any(|field| field.errored)
    }

    pub fn errored_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.errored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(message: &str) -> ErrorDetail {
        ErrorDetail {
            message: message.to_string(),
            sql: "SELECT 1".to_string(),
            line_number: None,
            context: None,
            explore_url: None,
        }
    }

    #[test]
    fn test_fields_keep_insertion_order_and_back_reference() {
        let mut project = Project::new();
        let users = project.add_explore("ecommerce", "users");
        let orders = project.add_explore("ecommerce", "orders");
        let id = project.add_field(users, "users.id", None);
        project.add_field(orders, "orders.id", None);
        let email = project.add_field(users, "users.email", None);

        assert_eq!(project.explore(users).fields, vec![id, email]);
        assert_eq!(project.field(email).explore, users);
        let names: Vec<&str> = project.fields_of(users).map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["users.id", "users.email"]);
    }

    #[test]
    fn test_error_is_write_once() {
        let mut project = Project::new();
        let explore = project.add_explore("m", "e");
        let field = project.add_field(explore, "e.a", None);

        assert!(project.mark_field_errored(field, error("first")));
        assert!(!project.mark_field_errored(field, error("second")));
        assert_eq!(project.field(field).error.as_ref().unwrap().message, "first");
    }

    #[test]
    fn test_passing_never_overwrites_error() {
        let mut project = Project::new();
        let explore = project.add_explore("m", "e");
        let field = project.add_field(explore, "e.a", None);

        project.mark_field_errored(field, error("boom"));
        assert!(!project.mark_field_queried(field));
        assert!(project.field(field).errored);
        assert!(!project.field(field).queried);
    }

    #[test]
    fn test_explore_queried_only_when_all_fields_pass() {
        let mut project = Project::new();
        let explore = project.add_explore("m", "e");
        let a = project.add_field(explore, "e.a", None);
        let b = project.add_field(explore, "e.b", None);

        project.mark_field_queried(a);
        project.refresh_explore(explore);
        assert!(!project.explore(explore).queried);

        project.mark_field_queried(b);
        project.refresh_explore(explore);
        assert!(project.explore(explore).queried);
        assert!(!project.explore_errored(explore));
    }
}
