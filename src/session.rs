//! Recognition state machine
//!
//! [`Session`] is pure: it consumes [`Event`]s and returns the [`Action`]s
//! the controller must perform, in order. All listening state lives here so
//! the single-active-recognizer rule is enforced in one place.
//!
//! ```text
//! Idle ──unmute──▶ WakeListening ──wake phrase──▶ Prompting
//!   ▲                  ▲    │                         │ acknowledgement done
//!   │ mute             │    └─end: delayed restart    ▼
//!   │                  ├──────── error ──────── CommandListening
//!   │                  │                              │ transcript
//!   │                  └──── delayed restart ──── Dispatching
//! ```

use crate::feedback::Severity;
use crate::tasks::TaskId;
use crate::voice::{RecognitionEvent, RecognizerKind, WakePhrases};

/// Listening phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Voice paused, nothing capturing
    Idle,
    /// Wake recognizer transcribing continuously (or about to restart)
    WakeListening,
    /// Acknowledgement being spoken
    Prompting,
    /// Command recognizer capturing one utterance
    CommandListening,
    /// A command transcript is being executed
    Dispatching,
}

/// Task operation requested outside the voice flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualAction {
    /// Create a task
    Add(String),
    /// Flip a task's completion flag
    Toggle(TaskId),
    /// Remove a task
    Delete(TaskId),
    /// Remove every task
    Clear,
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Enable or disable voice interaction
    SetListening(bool),
    /// Flip voice interaction
    ToggleListening,
    /// Recognizer lifecycle event
    Recognition {
        kind: RecognizerKind,
        event: RecognitionEvent,
    },
    /// The acknowledgement for prompt `prompt` has finished playing
    AcknowledgementFinished { prompt: u64 },
    /// Restart timer fired
    RestartWake { generation: u64 },
    /// The dispatched command unit has completed
    DispatchFinished,
    /// Manual task operation
    Manual(ManualAction),
    /// Stop everything and exit
    Shutdown,
}

/// Effect requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartWake,
    StopWake,
    StartCommand,
    StopCommand,
    /// Speak the acknowledgement, then report `AcknowledgementFinished`
    Acknowledge { prompt: u64 },
    /// Fire `RestartWake { generation }` after the restart delay
    ScheduleWakeRestart { generation: u64 },
    CancelWakeRestart,
    /// Run one command unit for this transcript, then report `DispatchFinished`
    Dispatch(String),
    Manual(ManualAction),
    /// Display-only status update
    Status { message: String, severity: Severity },
    Shutdown,
}

/// Voice session state
#[derive(Debug)]
pub struct Session {
    wake: WakePhrases,
    listening: bool,
    mode: Mode,
    wake_active: bool,
    command_active: bool,
    dispatching: bool,
    restart_generation: u64,
    prompt: u64,
}

impl Session {
    /// Create a muted, idle session
    #[must_use]
    pub const fn new(wake: WakePhrases) -> Self {
        Self {
            wake,
            listening: false,
            mode: Mode::Idle,
            wake_active: false,
            command_active: false,
            dispatching: false,
            restart_generation: 0,
            prompt: 0,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether voice interaction is enabled
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    /// Recognizer the session believes is capturing
    #[must_use]
    pub const fn active_recognizer(&self) -> Option<RecognizerKind> {
        if self.wake_active {
            Some(RecognizerKind::Wake)
        } else if self.command_active {
            Some(RecognizerKind::Command)
        } else {
            None
        }
    }

    /// Whether a command unit is in flight
    #[must_use]
    pub const fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    /// Wake phrases this session reacts to
    #[must_use]
    pub const fn wake_phrases(&self) -> &WakePhrases {
        &self.wake
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::SetListening(on) => self.set_listening(on),
            Event::ToggleListening => self.set_listening(!self.listening),
            Event::Recognition {
                kind: RecognizerKind::Wake,
                event,
            } => self.on_wake(event),
            Event::Recognition {
                kind: RecognizerKind::Command,
                event,
            } => self.on_command(event),
            Event::AcknowledgementFinished { prompt } => self.on_acknowledged(prompt),
            Event::RestartWake { generation } => self.on_restart(generation),
            Event::DispatchFinished => self.on_dispatch_finished(),
            Event::Manual(action) => vec![Action::Manual(action)],
            Event::Shutdown => {
                let mut actions = self.set_listening(false);
                actions.push(Action::Shutdown);
                actions
            }
        }
    }

    fn set_listening(&mut self, on: bool) -> Vec<Action> {
        if on == self.listening {
            return Vec::new();
        }
        self.listening = on;

        if on {
            tracing::info!("voice listening enabled");
            if self.dispatching {
                // The running unit restarts wake listening when it finishes
                self.mode = Mode::Dispatching;
                return Vec::new();
            }
            let mut actions = self.start_wake();
            actions.push(Self::status(
                format!("Say '{}' to start.", self.wake.display_name()),
                Severity::Info,
            ));
            return actions;
        }

        tracing::info!("voice listening paused");
        self.restart_generation += 1;
        let mut actions = vec![Action::CancelWakeRestart];
        if self.wake_active {
            self.wake_active = false;
            actions.push(Action::StopWake);
        }
        if self.command_active {
            self.command_active = false;
            actions.push(Action::StopCommand);
        }
        self.mode = Mode::Idle;
        actions.push(Self::status("Voice paused. Use manual input.", Severity::Muted));
        actions
    }

    fn on_wake(&mut self, event: RecognitionEvent) -> Vec<Action> {
        match event {
            RecognitionEvent::Result(transcript) => {
                if self.mode != Mode::WakeListening || !self.wake_active {
                    tracing::trace!(mode = ?self.mode, transcript = %transcript, "ignoring late wake transcript");
                    return Vec::new();
                }
                let Some(phrase) = self.wake.find(&transcript) else {
                    tracing::trace!(transcript = %transcript, "no wake phrase");
                    return Vec::new();
                };

                tracing::info!(phrase, "wake phrase detected");
                self.mode = Mode::Prompting;
                self.wake_active = false;
                self.restart_generation += 1;
                self.prompt += 1;
                vec![
                    Action::CancelWakeRestart,
                    Action::StopWake,
                    Self::status("Listening for command...", Severity::Listening),
                    Action::Acknowledge {
                        prompt: self.prompt,
                    },
                ]
            }
            RecognitionEvent::Error(error) => {
                if error.is_no_speech() {
                    tracing::debug!("wake recognizer heard no speech");
                } else {
                    tracing::warn!(%error, "wake recognizer error");
                }
                Vec::new()
            }
            RecognitionEvent::End => {
                if self.mode != Mode::WakeListening {
                    return Vec::new();
                }
                self.wake_active = false;
                if !self.listening {
                    return Vec::new();
                }
                tracing::debug!("wake recognizer ended, scheduling restart");
                vec![self.schedule_restart()]
            }
        }
    }

    fn on_command(&mut self, event: RecognitionEvent) -> Vec<Action> {
        match event {
            RecognitionEvent::Result(transcript) => {
                if self.mode != Mode::CommandListening {
                    tracing::trace!(mode = ?self.mode, transcript = %transcript, "ignoring late command transcript");
                    return Vec::new();
                }
                if transcript.trim().is_empty() {
                    return Vec::new();
                }

                tracing::info!(transcript = %transcript, "command heard");
                self.mode = Mode::Dispatching;
                self.command_active = false;
                self.dispatching = true;
                vec![
                    Action::StopCommand,
                    Self::status(format!("You said: \"{transcript}\""), Severity::Heard),
                    Action::Dispatch(transcript),
                ]
            }
            RecognitionEvent::Error(error) => {
                if self.mode != Mode::CommandListening {
                    tracing::debug!(%error, "ignoring stale command recognizer error");
                    return Vec::new();
                }
                if error.is_no_speech() {
                    tracing::info!("no command heard");
                } else {
                    tracing::warn!(%error, "command recognizer error");
                }

                // Abandon without waiting for the recognizer's end event
                self.command_active = false;
                let mut actions = vec![Action::StopCommand];
                actions.extend(self.start_wake());
                actions.push(self.return_status());
                actions
            }
            RecognitionEvent::End => {
                if self.mode != Mode::CommandListening {
                    return Vec::new();
                }
                tracing::debug!("command recognizer ended without a transcript");
                self.command_active = false;
                self.mode = Mode::WakeListening;
                vec![self.schedule_restart(), self.return_status()]
            }
        }
    }

    fn on_acknowledged(&mut self, prompt: u64) -> Vec<Action> {
        if self.mode != Mode::Prompting || prompt != self.prompt {
            tracing::trace!(prompt, "ignoring stale acknowledgement");
            return Vec::new();
        }
        self.mode = Mode::CommandListening;
        self.command_active = true;
        vec![
            Self::status("Speak now!", Severity::Ready),
            Action::StartCommand,
        ]
    }

    fn on_restart(&mut self, generation: u64) -> Vec<Action> {
        if generation != self.restart_generation
            || !self.listening
            || self.mode != Mode::WakeListening
            || self.wake_active
        {
            tracing::trace!(generation, "ignoring stale wake restart");
            return Vec::new();
        }
        self.start_wake()
    }

    fn on_dispatch_finished(&mut self) -> Vec<Action> {
        self.dispatching = false;
        if self.mode != Mode::Dispatching {
            return Vec::new();
        }
        self.mode = Mode::WakeListening;
        vec![self.schedule_restart(), self.return_status()]
    }

    fn start_wake(&mut self) -> Vec<Action> {
        self.mode = Mode::WakeListening;
        if self.wake_active {
            return Vec::new();
        }
        self.wake_active = true;
        vec![Action::StartWake]
    }

    fn schedule_restart(&mut self) -> Action {
        self.restart_generation += 1;
        Action::ScheduleWakeRestart {
            generation: self.restart_generation,
        }
    }

    fn return_status(&self) -> Action {
        Self::status(
            format!("Say '{}' to start again.", self.wake.display_name()),
            Severity::Info,
        )
    }

    fn status(message: impl Into<String>, severity: Severity) -> Action {
        Action::Status {
            message: message.into(),
            severity,
        }
    }
}
