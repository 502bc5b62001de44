//! Voice interaction controller
//!
//! Owns the [`Session`], both recognizers and the restart timer, and drains
//! a single event queue. Recognizers, the acknowledgement, command units and
//! timers all report back through that queue, so session transitions happen
//! one at a time in arrival order.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{DEFAULT_ACKNOWLEDGEMENT, DEFAULT_RESTART_DELAY};
use crate::feedback::Feedback;
use crate::handler::CommandHandler;
use crate::session::{Action, Event, ManualAction, Session};
use crate::voice::{RecognitionError, RecognitionEvent, RecognitionSink, Recognizer, RecognizerKind};
use crate::Error;

/// Create the controller's event queue and a handle for feeding it
#[must_use]
pub fn channel() -> (ControllerHandle, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControllerHandle { tx: tx.clone() }, EventQueue { tx, rx })
}

/// Receiving end of the controller's queue
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

/// Cloneable sender into the controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl ControllerHandle {
    /// Sink a recognizer of `kind` reports through
    #[must_use]
    pub fn sink(&self, kind: RecognizerKind) -> RecognitionSink {
        RecognitionSink::new(kind, self.tx.clone())
    }

    /// Enable or disable voice interaction
    pub fn set_listening(&self, on: bool) -> bool {
        self.send(Event::SetListening(on))
    }

    /// Flip voice interaction
    pub fn toggle_listening(&self) -> bool {
        self.send(Event::ToggleListening)
    }

    /// Run a manual task operation
    pub fn manual(&self, action: ManualAction) -> bool {
        self.send(Event::Manual(action))
    }

    /// Ask the controller to stop
    pub fn shutdown(&self) -> bool {
        self.send(Event::Shutdown)
    }

    /// Queue an event; `false` once the controller has exited
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Event loop driving the session
pub struct Controller {
    session: Session,
    wake: Box<dyn Recognizer>,
    command: Box<dyn Recognizer>,
    handler: CommandHandler,
    feedback: Feedback,
    acknowledgement: String,
    restart_delay: Duration,
    restart_timer: Option<JoinHandle<()>>,
    queue: EventQueue,
}

impl Controller {
    #[must_use]
    pub fn new(
        queue: EventQueue,
        session: Session,
        wake: Box<dyn Recognizer>,
        command: Box<dyn Recognizer>,
        handler: CommandHandler,
        feedback: Feedback,
    ) -> Self {
        Self {
            session,
            wake,
            command,
            handler,
            feedback,
            acknowledgement: DEFAULT_ACKNOWLEDGEMENT.to_string(),
            restart_delay: DEFAULT_RESTART_DELAY,
            restart_timer: None,
            queue,
        }
    }

    /// Utterance spoken after the wake phrase
    #[must_use]
    pub fn with_acknowledgement(mut self, acknowledgement: impl Into<String>) -> Self {
        self.acknowledgement = acknowledgement.into();
        self
    }

    /// Delay before the wake recognizer is restarted
    #[must_use]
    pub const fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Process events until shutdown
    pub async fn run(mut self) {
        tracing::info!("voice controller started");

        while let Some(event) = self.queue.rx.recv().await {
            tracing::trace!(?event, mode = ?self.session.mode(), "controller event");
            let actions = self.session.handle(event);
            if self.apply_all(actions).is_break() {
                break;
            }
        }

        self.cancel_restart();
        self.wake.stop();
        self.command.stop();
        tracing::info!("voice controller stopped");
    }

    fn apply_all(&mut self, actions: Vec<Action>) -> ControlFlow<()> {
        for action in actions {
            if self.apply(action).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn apply(&mut self, action: Action) -> ControlFlow<()> {
        tracing::trace!(?action, "applying action");
        match action {
            Action::StartWake => {
                if let Err(e) = self.wake.start() {
                    self.report_start_failure(RecognizerKind::Wake, &e);
                }
            }
            Action::StopWake => self.wake.stop(),
            Action::StartCommand => {
                if let Err(e) = self.command.start() {
                    self.report_start_failure(RecognizerKind::Command, &e);
                }
            }
            Action::StopCommand => self.command.stop(),
            Action::Acknowledge { prompt } => {
                let feedback = self.feedback.clone();
                let text = self.acknowledgement.clone();
                let tx = self.queue.tx.clone();
                tokio::spawn(async move {
                    feedback.say(&text).await;
                    let _ = tx.send(Event::AcknowledgementFinished { prompt });
                });
            }
            Action::ScheduleWakeRestart { generation } => {
                self.cancel_restart();
                let tx = self.queue.tx.clone();
                let delay = self.restart_delay;
                self.restart_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::RestartWake { generation });
                }));
            }
            Action::CancelWakeRestart => self.cancel_restart(),
            Action::Dispatch(transcript) => {
                let handler = self.handler.clone();
                let tx = self.queue.tx.clone();
                tokio::spawn(async move {
                    handler.handle_transcript(&transcript).await;
                    let _ = tx.send(Event::DispatchFinished);
                });
            }
            Action::Manual(action) => {
                let handler = self.handler.clone();
                tokio::spawn(async move {
                    handler.run_manual(action).await;
                });
            }
            Action::Status { message, severity } => self.feedback.show(&message, severity),
            Action::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Turn a failed start into the error/end pair a running recognizer
    /// would have produced, so the session recovers the usual way
    fn report_start_failure(&self, kind: RecognizerKind, e: &Error) {
        tracing::warn!(?kind, error = %e, "recognizer failed to start");
        for event in [
            RecognitionEvent::Error(RecognitionError::Other(e.to_string())),
            RecognitionEvent::End,
        ] {
            let _ = self.queue.tx.send(Event::Recognition { kind, event });
        }
    }

    fn cancel_restart(&mut self) {
        if let Some(timer) = self.restart_timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("session", &self.session)
            .field("restart_delay", &self.restart_delay)
            .finish_non_exhaustive()
    }
}
