//! Command units
//!
//! One unit is interpret → resolve → mutate → report → refresh. Every
//! outcome, including failures, ends in the feedback channel; nothing here
//! returns an error to the caller.

use std::sync::Arc;

use crate::command::{Command, interpret};
use crate::feedback::{Feedback, Severity};
use crate::resolver::TaskResolver;
use crate::session::ManualAction;
use crate::tasks::{StoreReply, Task, TaskFilter, TaskId, TaskStore};
use crate::view::TaskView;
use crate::{Error, Result};

/// Spoken when `add` has no task name
pub const CLARIFY_ADD: &str = "What should I add?";

/// Spoken for unrecognized commands
pub const NOT_UNDERSTOOD: &str = "Sorry, I didn't understand that.";

/// Executes commands against the task store
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<dyn TaskStore>,
    resolver: TaskResolver,
    feedback: Feedback,
    view: Arc<dyn TaskView>,
}

impl CommandHandler {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, feedback: Feedback, view: Arc<dyn TaskView>) -> Self {
        Self {
            resolver: TaskResolver::new(Arc::clone(&store)),
            store,
            feedback,
            view,
        }
    }

    /// Interpret and execute a transcript
    ///
    /// Empty transcripts are dropped without feedback and yield `None`.
    pub async fn handle_transcript(&self, transcript: &str) -> Option<Command> {
        let Some(command) = interpret(transcript) else {
            tracing::debug!("empty transcript dropped");
            return None;
        };

        tracing::info!(kind = command.kind(), %command, "executing command");
        self.execute(&command).await;
        Some(command)
    }

    /// Execute an already classified command
    pub async fn execute(&self, command: &Command) {
        match command {
            Command::Add { name } => {
                let outcome = self.store.add(name).await;
                self.finish(outcome).await;
            }
            Command::ClarifyAdd => self.feedback.report(CLARIFY_ADD, Severity::Spoken).await,
            Command::MarkDone { name } => {
                if let Some(id) = self.resolve(name).await {
                    let outcome = self.store.mark(&id).await;
                    self.finish(outcome).await;
                }
            }
            Command::Delete { name } => {
                if let Some(id) = self.resolve(name).await {
                    let outcome = self.store.delete(&id).await;
                    self.finish(outcome).await;
                }
            }
            Command::ClearAll => {
                let outcome = self.store.clear().await;
                self.finish(outcome).await;
            }
            Command::ListAll | Command::ListPending | Command::ListCompleted => {
                let filter = command.list_filter().unwrap_or_default();
                self.summarize(filter).await;
            }
            Command::Unrecognized { raw } => {
                tracing::info!(raw = %raw, "command not understood");
                self.feedback.report(NOT_UNDERSTOOD, Severity::Spoken).await;
            }
        }
    }

    /// Execute a manual task operation
    pub async fn run_manual(&self, action: ManualAction) {
        tracing::info!(?action, "manual action");
        let outcome = match action {
            ManualAction::Add(name) => {
                let name = name.trim();
                if name.is_empty() {
                    self.feedback.report(CLARIFY_ADD, Severity::Spoken).await;
                    return;
                }
                self.store.add(name).await
            }
            ManualAction::Toggle(id) => self.store.toggle(&id).await,
            ManualAction::Delete(id) => self.store.delete(&id).await,
            ManualAction::Clear => self.store.clear().await,
        };
        self.finish(outcome).await;
    }

    /// Fetch the full list and hand it to the view
    ///
    /// Returns the snapshot on success.
    pub async fn refresh(&self) -> Option<Vec<Task>> {
        match self.store.list(TaskFilter::All).await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "task list refreshed");
                self.view.render(&tasks);
                Some(tasks)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to refresh tasks");
                self.feedback.show("Failed to load tasks.", Severity::Alert);
                None
            }
        }
    }

    async fn resolve(&self, name: &str) -> Option<TaskId> {
        match self.resolver.resolve(name).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.report_error(&e).await;
                None
            }
        }
    }

    /// Report a mutation's outcome, then refresh regardless of it
    async fn finish(&self, outcome: Result<StoreReply>) {
        match outcome {
            Ok(reply) => {
                if let Some(message) = reply.message.filter(|m| !m.is_empty()) {
                    self.feedback.report(&message, Severity::Success).await;
                }
            }
            Err(e) => self.report_error(&e).await,
        }
        self.refresh().await;
    }

    async fn summarize(&self, filter: TaskFilter) {
        match self.store.list(filter).await {
            Ok(tasks) => {
                // Stores that ignore the filter still get the right answer
                let names: Vec<&str> = tasks
                    .iter()
                    .filter(|t| filter.accepts(t))
                    .map(|t| t.name.as_str())
                    .collect();
                self.feedback
                    .report(&summary(filter, &names), Severity::Spoken)
                    .await;
            }
            Err(e) => self.report_error(&e).await,
        }
    }

    async fn report_error(&self, error: &Error) {
        match error {
            Error::TaskNotFound(name) => tracing::info!(name = %name, "task not found"),
            Error::StoreRejected { status, message } => {
                tracing::error!(status, message = %message, "task store rejected request");
            }
            other => tracing::error!(error = %other, "task store request failed"),
        }
        self.feedback
            .report(&error.spoken_message(), Severity::Error)
            .await;
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

/// Spoken summary of a list command
#[must_use]
pub fn summary(filter: TaskFilter, names: &[&str]) -> String {
    let qualifier = match filter {
        TaskFilter::All => "",
        TaskFilter::Pending => "pending ",
        TaskFilter::Completed => "completed ",
    };
    match names.len() {
        0 => format!("You have no {qualifier}tasks."),
        1 => format!("You have 1 {qualifier}task: {}.", names[0]),
        n => format!("You have {n} {qualifier}tasks: {}.", names.join(", ")),
    }
}
