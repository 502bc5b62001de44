//! Hey To Do - voice-controlled to-do list client
//!
//! A wake phrase arms a short command window; the spoken command is
//! classified, resolved against a remote task store and executed, and the
//! outcome is spoken back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Speech backends                    │
//! │  console stdin  │  microphone + STT  │  cloud TTS    │
//! └───────────────────────────┬──────────────────────────┘
//!                             │ recognition events
//! ┌───────────────────────────▼──────────────────────────┐
//! │                     Controller                       │
//! │  Session (wake → prompt → command → dispatch)        │
//! └───────────────────────────┬──────────────────────────┘
//!                             │ transcript
//! ┌───────────────────────────▼──────────────────────────┐
//! │  interpreter → resolver → task store → feedback      │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod feedback;
pub mod handler;
pub mod resolver;
pub mod session;
pub mod tasks;
pub mod view;
pub mod voice;

pub use command::{Command, interpret};
pub use config::Config;
pub use controller::{Controller, ControllerHandle};
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use feedback::{Feedback, Severity, StatusDisplay};
pub use handler::CommandHandler;
pub use resolver::TaskResolver;
pub use session::{Action, Event, ManualAction, Mode, Session};
pub use tasks::{HttpTaskStore, Priority, Task, TaskFilter, TaskId, TaskStore};
pub use view::{SortMode, TaskView};
