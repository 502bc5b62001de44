//! Shared test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossterm::style::Color;

use hey_todo::feedback::StatusDisplay;
use hey_todo::tasks::{StoreReply, Task, TaskFilter, TaskId, TaskStore};
use hey_todo::view::TaskView;
use hey_todo::voice::Synthesizer;
use hey_todo::{Error, Priority, Result};

/// A call received by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(TaskFilter),
    Add(String),
    Toggle(TaskId),
    Mark(TaskId),
    Delete(TaskId),
    Clear,
}

impl StoreCall {
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::List(_))
    }
}

/// In-memory task store that records every call
#[derive(Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<StoreCall>>,
    next_id: AtomicU64,
    offline: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store pre-populated with `(id, name)` pairs, in that order
    pub fn with_tasks(tasks: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        store
            .tasks
            .lock()
            .unwrap()
            .extend(tasks.iter().map(|(id, name)| task(id, name)));
        Arc::new(store)
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(StoreCall::is_mutation)
            .collect()
    }

    fn record(&self, call: StoreCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if *self.offline.lock().unwrap() {
            // Any transport-class error maps to "Network error."
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store offline",
            )));
        }
        Ok(())
    }

    fn update(&self, id: &TaskId, f: impl FnOnce(&mut Task) -> String) -> Result<StoreReply> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(not_found)?;
        Ok(StoreReply::with_message(f(task)))
    }
}

fn not_found() -> Error {
    Error::StoreRejected {
        status: 404,
        message: "Task not found".to_string(),
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.record(StoreCall::List(filter))?;
        Ok(self
            .tasks()
            .into_iter()
            .filter(|t| filter.accepts(t))
            .collect())
    }

    async fn add(&self, name: &str) -> Result<StoreReply> {
        self.record(StoreCall::Add(name.to_string()))?;
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.iter().any(|t| t.name_matches(name)) {
            return Err(Error::StoreRejected {
                status: 409,
                message: "Task already exists".to_string(),
            });
        }
        let id = format!("t{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 100);
        tasks.push(task(&id, name));
        Ok(StoreReply::with_message(format!("Added {name}")))
    }

    async fn toggle(&self, id: &TaskId) -> Result<StoreReply> {
        self.record(StoreCall::Toggle(id.clone()))?;
        self.update(id, |t| {
            t.done = !t.done;
            if t.done {
                format!("Marked {} as done", t.name)
            } else {
                format!("Marked {} as undone", t.name)
            }
        })
    }

    async fn mark(&self, id: &TaskId) -> Result<StoreReply> {
        self.record(StoreCall::Mark(id.clone()))?;
        self.update(id, |t| {
            t.done = true;
            format!("Marked {} as done", t.name)
        })
    }

    async fn delete(&self, id: &TaskId) -> Result<StoreReply> {
        self.record(StoreCall::Delete(id.clone()))?;
        let mut tasks = self.tasks.lock().unwrap();
        let index = tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(not_found)?;
        let removed = tasks.remove(index);
        Ok(StoreReply::with_message(format!("Deleted {}", removed.name)))
    }

    async fn clear(&self) -> Result<StoreReply> {
        self.record(StoreCall::Clear)?;
        self.tasks.lock().unwrap().clear();
        Ok(StoreReply::with_message("All tasks cleared"))
    }
}

/// A pending task with store defaults
pub fn task(id: &str, name: &str) -> Task {
    Task {
        id: TaskId::new(id),
        name: name.to_string(),
        done: false,
        priority: Priority::Low,
        category: "general".to_string(),
        due: None,
        created_at: Some(chrono::Local::now().naive_local()),
    }
}

/// Synthesizer that records what it was asked to say
#[derive(Default)]
pub struct RecordingSynth {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSynth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn count(&self, text: &str) -> usize {
        self.spoken().iter().filter(|s| *s == text).count()
    }
}

#[async_trait]
impl Synthesizer for RecordingSynth {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Status display that records every line
#[derive(Default)]
pub struct RecordingDisplay {
    lines: Mutex<Vec<(String, Color)>>,
}

impl RecordingDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn color_of(&self, message: &str) -> Option<Color> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == message)
            .map(|(_, c)| *c)
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&self, message: &str, color: Color) {
        self.lines.lock().unwrap().push((message.to_string(), color));
    }
}

/// View that keeps every rendered snapshot
#[derive(Default)]
pub struct RecordingView {
    renders: Mutex<Vec<Vec<Task>>>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Vec<Task>> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl TaskView for RecordingView {
    fn render(&self, tasks: &[Task]) {
        self.renders.lock().unwrap().push(tasks.to_vec());
    }
}

/// Poll `condition` until it holds, failing after two seconds
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
