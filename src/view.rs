//! Task list rendering

use std::cmp::Reverse;
use std::str::FromStr;

use crossterm::style::{Color, Stylize, style};

use crate::tasks::Task;
use crate::{Error, Result};

/// Display order for a task snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Store order (creation time)
    #[default]
    Created,
    /// High priority first
    Priority,
    /// Alphabetical by category
    Category,
    /// Earliest due first, undated last
    Due,
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "created" | "created_at" | "default" => Ok(Self::Created),
            "priority" => Ok(Self::Priority),
            "category" => Ok(Self::Category),
            "due" | "due_date" => Ok(Self::Due),
            other => Err(Error::Config(format!("unknown sort mode: {other}"))),
        }
    }
}

/// Sort a snapshot for display
///
/// Stable, so equal keys keep store order.
pub fn sort_tasks(tasks: &mut [Task], mode: SortMode) {
    match mode {
        SortMode::Created => tasks.sort_by_key(|t| (t.created_at.is_none(), t.created_at)),
        SortMode::Priority => tasks.sort_by_key(|t| Reverse(t.priority)),
        SortMode::Category => tasks.sort_by_key(|t| t.category.to_lowercase()),
        SortMode::Due => tasks.sort_by_key(|t| (t.due.is_none(), t.due)),
    }
}

/// Receives every refreshed snapshot
pub trait TaskView: Send + Sync {
    /// Render the snapshot (store order)
    fn render(&self, tasks: &[Task]);
}

const DONE_MARK: &str = "[x]";
const PENDING_MARK: &str = "[ ]";

/// Prints the list to stdout
#[derive(Debug, Default)]
pub struct TerminalView {
    sort: SortMode,
}

impl TerminalView {
    #[must_use]
    pub const fn new(sort: SortMode) -> Self {
        Self { sort }
    }

    /// Lines as rendered, without styling
    #[must_use]
    pub fn lines(&self, tasks: &[Task]) -> Vec<String> {
        let mut sorted = tasks.to_vec();
        sort_tasks(&mut sorted, self.sort);
        sorted.iter().map(format_task).collect()
    }
}

impl TaskView for TerminalView {
    fn render(&self, tasks: &[Task]) {
        if tasks.is_empty() {
            println!("{}", style("(no tasks)").with(Color::DarkGrey));
            return;
        }
        for line in self.lines(tasks) {
            if line.starts_with(DONE_MARK) {
                println!("{}", style(line).with(Color::DarkGrey).crossed_out());
            } else {
                println!("{line}");
            }
        }
    }
}

/// One line per task: checkbox, name, priority, category, due date, id
#[must_use]
pub fn format_task(task: &Task) -> String {
    let mut line = format!(
        "{} {} ({})",
        if task.done { DONE_MARK } else { PENDING_MARK },
        task.name,
        task.priority.label()
    );
    if task.has_custom_category() {
        line.push_str(&format!(" #{}", task.category));
    }
    if let Some(due) = task.due {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d %H:%M")));
    }
    line.push_str(&format!("  {}", task.id));
    line
}
