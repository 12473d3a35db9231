use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::query::Query;

/// Maps remote task ids to the query that started them.
///
/// Dispatchers are the only writers and the collector is the only remover: a task id
/// is inserted before it is published on the running queue, so the collector always
/// finds the entry for any id it takes from that queue.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, Query>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Query>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, task_id: String, query: Query) {
        self.lock().insert(task_id, query);
    }

    pub fn remove(&self, task_id: &str) -> Option<Query> {
        self.lock().remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
