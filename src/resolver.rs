//! Spoken task name → task identifier
//!
//! Names are matched case-insensitively and exactly against a freshly
//! fetched snapshot. The store does not enforce unique names; when several
//! tasks share a name the first one in store order wins.

use std::sync::Arc;

use crate::tasks::{Task, TaskFilter, TaskId, TaskStore};
use crate::{Error, Result};

/// Find the first task in `tasks` whose name matches `name`
#[must_use]
pub fn find_by_name<'a>(tasks: &'a [Task], name: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.name_matches(name))
}

/// Resolves spoken names against the task store
#[derive(Clone)]
pub struct TaskResolver {
    store: Arc<dyn TaskStore>,
}

impl TaskResolver {
    /// Create a resolver backed by `store`
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Resolve `name` to a task identifier
    ///
    /// Always re-fetches the snapshot; tasks may have changed since the
    /// last render.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if no task matches, or the store error
    /// if the snapshot cannot be fetched
    pub async fn resolve(&self, name: &str) -> Result<TaskId> {
        let tasks = self.store.list(TaskFilter::All).await?;

        let mut matches = tasks.iter().filter(|t| t.name_matches(name));
        let Some(task) = matches.next() else {
            tracing::info!(name, "no task matches spoken name");
            return Err(Error::TaskNotFound(name.to_string()));
        };

        let duplicates = matches.count();
        if duplicates > 0 {
            tracing::debug!(name, duplicates, id = %task.id, "duplicate task names, using first");
        }

        Ok(task.id.clone())
    }
}
