//! Spoken command grammar
//!
//! Turns a free-form transcript into a typed [`Command`]. Matchers are tried
//! in a fixed order and the first hit wins; several patterns overlap, so
//! the order is part of the grammar:
//!
//! 1. `add <name>`
//! 2. `mark <name> [as] done`
//! 3. `delete <name>` / `remove <name>`
//! 4. contains `clear all` / `remove all`
//! 5. contains `list all tasks` / `what are my tasks`
//! 6. contains `list pending` / `pending tasks`
//! 7. contains `list completed` / `completed tasks`
//! 8. anything else is unrecognized

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::tasks::TaskFilter;

static MARK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^mark\s+(.+?)\s+(?:as\s+)?done$").expect("valid regex")
});

static DELETE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:delete|remove)\s+(.+)$").expect("valid regex"));

/// A classified utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a task
    Add { name: String },
    /// `add` with nothing after it; answered with a clarification prompt
    ClarifyAdd,
    /// Mark the named task as done
    MarkDone { name: String },
    /// Remove the named task
    Delete { name: String },
    /// Remove every task
    ClearAll,
    /// Read out every task
    ListAll,
    /// Read out tasks that are not done
    ListPending,
    /// Read out tasks that are done
    ListCompleted,
    /// Nothing matched
    Unrecognized { raw: String },
}

impl Command {
    /// Short name used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::ClarifyAdd => "clarify_add",
            Self::MarkDone { .. } => "mark_done",
            Self::Delete { .. } => "delete",
            Self::ClearAll => "clear_all",
            Self::ListAll => "list_all",
            Self::ListPending => "list_pending",
            Self::ListCompleted => "list_completed",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }

    /// Snapshot filter for list commands
    #[must_use]
    pub const fn list_filter(&self) -> Option<TaskFilter> {
        match self {
            Self::ListAll => Some(TaskFilter::All),
            Self::ListPending => Some(TaskFilter::Pending),
            Self::ListCompleted => Some(TaskFilter::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { name } => write!(f, "add \"{name}\""),
            Self::MarkDone { name } => write!(f, "mark \"{name}\" done"),
            Self::Delete { name } => write!(f, "delete \"{name}\""),
            Self::Unrecognized { raw } => write!(f, "unrecognized \"{raw}\""),
            other => f.write_str(other.kind()),
        }
    }
}

/// Lower-case and trim a raw transcript
#[must_use]
pub fn normalize(transcript: &str) -> String {
    transcript.trim().to_lowercase()
}

/// Classify a transcript
///
/// Returns `None` for empty or whitespace-only input, which is dropped
/// without feedback. `Add` keeps the casing of the spoken name; every other
/// name is taken from the normalized transcript.
#[must_use]
pub fn interpret(transcript: &str) -> Option<Command> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = normalize(trimmed);

    let command = if lower == "add" || lower.starts_with("add ") {
        // "add" lower-cases from ASCII only, so byte 3 is a char boundary
        let name = trimmed.get(3..).unwrap_or_default().trim();
        if name.is_empty() {
            Command::ClarifyAdd
        } else {
            Command::Add {
                name: name.to_string(),
            }
        }
    } else if let Some(caps) = MARK_REGEX.captures(&lower) {
        Command::MarkDone {
            name: caps[1].trim().to_string(),
        }
    } else if let Some(caps) = DELETE_REGEX.captures(&lower) {
        Command::Delete {
            name: caps[1].trim().to_string(),
        }
    } else if contains_any(&lower, &["clear all", "remove all"]) {
        Command::ClearAll
    } else if contains_any(&lower, &["list all tasks", "what are my tasks"]) {
        Command::ListAll
    } else if contains_any(&lower, &["list pending", "pending tasks"]) {
        Command::ListPending
    } else if contains_any(&lower, &["list completed", "completed tasks"]) {
        Command::ListCompleted
    } else {
        Command::Unrecognized {
            raw: trimmed.to_string(),
        }
    };

    tracing::debug!(transcript = %trimmed, command = %command, "classified transcript");
    Some(command)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(name: &str) -> Command {
        Command::Add {
            name: name.to_string(),
        }
    }

    fn mark(name: &str) -> Command {
        Command::MarkDone {
            name: name.to_string(),
        }
    }

    fn delete(name: &str) -> Command {
        Command::Delete {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_transcripts_are_dropped() {
        assert_eq!(interpret(""), None);
        assert_eq!(interpret("   \t\n"), None);
    }

    #[test]
    fn test_add_strips_keyword_and_keeps_case() {
        assert_eq!(interpret("add buy milk"), Some(add("buy milk")));
        assert_eq!(interpret("  Add   Call Mom  "), Some(add("Call Mom")));
        assert_eq!(interpret("ADD groceries"), Some(add("groceries")));
    }

    #[test]
    fn test_add_without_name_asks_for_clarification() {
        assert_eq!(interpret("add"), Some(Command::ClarifyAdd));
        assert_eq!(interpret("  ADD  "), Some(Command::ClarifyAdd));
    }

    #[test]
    fn test_add_requires_word_boundary() {
        assert_eq!(
            interpret("address book"),
            Some(Command::Unrecognized {
                raw: "address book".to_string()
            })
        );
    }

    #[test]
    fn test_add_wins_over_later_patterns() {
        assert_eq!(interpret("add clear all"), Some(add("clear all")));
        assert_eq!(interpret("add mark report done"), Some(add("mark report done")));
    }

    #[test]
    fn test_mark_done_with_optional_as() {
        assert_eq!(interpret("mark grocery run as done"), Some(mark("grocery run")));
        assert_eq!(interpret("mark grocery run done"), Some(mark("grocery run")));
        assert_eq!(interpret("Mark Grocery Run As Done"), Some(mark("grocery run")));
    }

    #[test]
    fn test_mark_requires_done_suffix() {
        assert!(matches!(
            interpret("mark grocery run"),
            Some(Command::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_delete_and_remove_are_synonyms() {
        assert_eq!(interpret("delete buy milk"), Some(delete("buy milk")));
        assert_eq!(interpret("remove buy milk"), Some(delete("buy milk")));
    }

    #[test]
    fn test_leading_remove_all_is_a_delete() {
        // Rule 3 runs before rule 4
        assert_eq!(interpret("remove all"), Some(delete("all")));
        assert_eq!(interpret("please remove all"), Some(Command::ClearAll));
    }

    #[test]
    fn test_clear_all() {
        assert_eq!(interpret("clear all"), Some(Command::ClearAll));
        assert_eq!(interpret("please clear all my tasks"), Some(Command::ClearAll));
    }

    #[test]
    fn test_list_commands() {
        assert_eq!(interpret("list all tasks"), Some(Command::ListAll));
        assert_eq!(interpret("What are my tasks?"), Some(Command::ListAll));
        assert_eq!(interpret("list pending"), Some(Command::ListPending));
        assert_eq!(interpret("show pending tasks"), Some(Command::ListPending));
        assert_eq!(interpret("list completed"), Some(Command::ListCompleted));
        assert_eq!(interpret("any completed tasks"), Some(Command::ListCompleted));
    }

    #[test]
    fn test_list_filters() {
        assert_eq!(Command::ListAll.list_filter(), Some(TaskFilter::All));
        assert_eq!(Command::ListPending.list_filter(), Some(TaskFilter::Pending));
        assert_eq!(Command::ListCompleted.list_filter(), Some(TaskFilter::Completed));
        assert_eq!(Command::ClearAll.list_filter(), None);
    }

    #[test]
    fn test_unrecognized_keeps_raw_text() {
        assert_eq!(
            interpret("  Sing me a song "),
            Some(Command::Unrecognized {
                raw: "Sing me a song".to_string()
            })
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let inputs = [
            "add x",
            "mark x done",
            "remove x",
            "clear all",
            "pending tasks",
            "hello",
        ];
        for input in inputs {
            assert_eq!(interpret(input), interpret(input));
            assert_eq!(interpret(input), interpret(&format!("  {}  ", input.to_uppercase())).map(
                |c| match c {
                    Command::Add { name } => Command::Add {
                        name: name.to_lowercase(),
                    },
                    Command::Unrecognized { raw } => Command::Unrecognized {
                        raw: raw.to_lowercase(),
                    },
                    other => other,
                }
            ));
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hey To Do  "), "hey to do");
    }
}
