//! Task records and the remote task store boundary
//!
//! The store owns every task; this crate only reads snapshots and issues
//! create/toggle/mark/delete/clear requests.

mod client;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub use client::HttpTaskStore;

use crate::Result;

/// Category the store assigns when none is given
pub const DEFAULT_CATEGORY: &str = "general";

/// Opaque task identifier, stable for the task's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap a store-provided identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task priority; the store encodes it as 1, 2 or 3
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Wire value used by the store
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        match value {
            3 => Self::High,
            2 => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Missing, null and out-of-range values all mean "low"
        let raw = Option::<i64>::deserialize(deserializer)?;
        Ok(raw.map(Self::from).unwrap_or_default())
    }
}

/// A task as returned by `GET /tasks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category", deserialize_with = "category_or_default")]
    pub category: String,
    #[serde(
        default,
        rename = "due_date",
        alias = "due",
        deserialize_with = "timestamp::deserialize"
    )]
    pub due: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<NaiveDateTime>,
}

impl Task {
    /// Whether `name` refers to this task (case-insensitive, exact)
    ///
    /// Only the spoken side is trimmed; the stored name is taken as is.
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Whether the task carries a category worth displaying
    #[must_use]
    pub fn has_custom_category(&self) -> bool {
        !self.category.is_empty() && self.category != DEFAULT_CATEGORY
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn category_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|c| !c.is_empty()).unwrap_or_else(default_category))
}

/// Accepts ISO-8601 timestamps with or without a UTC offset
///
/// Timestamps only drive display order, so an unparseable value becomes
/// `None` instead of failing the whole snapshot.
mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        match parse(&raw) {
            Ok(dt) => Ok(Some(dt)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring task timestamp");
                Ok(None)
            }
        }
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.naive_utc());
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .ok_or_else(|| format!("invalid timestamp: {raw}"))
    }
}

/// Which tasks `GET /tasks` should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    /// Value for the `done` query parameter, if any
    #[must_use]
    pub const fn done_param(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Pending => Some("false"),
            Self::Completed => Some("true"),
        }
    }

    /// Whether a task belongs to this filter
    #[must_use]
    pub const fn accepts(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.done,
            Self::Completed => task.done,
        }
    }
}

/// Body of a successful mutating call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreReply {
    /// Human-readable outcome to speak
    #[serde(default)]
    pub message: Option<String>,
}

impl StoreReply {
    /// Reply carrying a message
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Remote task store
///
/// Mutations resolve to `Error::StoreRejected` when the store refuses the
/// request and to a transport error when it cannot be reached.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch tasks in store-defined order
    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    /// Create a task from spoken or typed text
    async fn add(&self, name: &str) -> Result<StoreReply>;

    /// Flip a task's completion flag
    async fn toggle(&self, id: &TaskId) -> Result<StoreReply>;

    /// Mark a task as done
    async fn mark(&self, id: &TaskId) -> Result<StoreReply>;

    /// Remove a task
    async fn delete(&self, id: &TaskId) -> Result<StoreReply>;

    /// Remove every task
    async fn clear(&self) -> Result<StoreReply>;
}
