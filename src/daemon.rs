//! Daemon wiring
//!
//! Builds the speech backends from configuration, starts the controller,
//! and turns stdin lines into transcripts (console input) or control
//! commands (`/mute`, `/add milk`, ...).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, InputBackend, TtsProvider};
use crate::controller::{self, Controller, ControllerHandle};
use crate::feedback::{Feedback, Severity, TerminalStatus};
use crate::handler::CommandHandler;
use crate::session::{ManualAction, Session};
use crate::tasks::{HttpTaskStore, TaskId, TaskStore};
use crate::view::TerminalView;
use crate::voice::{
    CloudSynthesizer, ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer, ListenMode,
    MicRecognizer, Recognizer, RecognizerKind, SpeechToText, Synthesizer, TextToSpeech,
    WakePhrases,
};
use crate::Result;

const HELP: &str = "\
commands:
  /add <name>     add a task
  /toggle <id>    flip a task's done flag
  /delete <id>    delete a task
  /clear          delete every task
  /mute /unmute   pause or resume voice
  /listen         flip voice listening
  /quit           exit
other lines are treated as speech when console input is listening";

/// A line typed while the daemon runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLine {
    /// Plain text, handed to the console recognizer
    Transcript(String),
    /// Task operation
    Manual(ManualAction),
    Mute,
    Unmute,
    ToggleListening,
    Help,
    Quit,
    /// Slash command that could not be parsed
    Unknown(String),
}

impl ControlLine {
    /// Parse one stdin line
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Transcript(line.to_string());
        };

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, arg)| (name, arg.trim()));

        match (name.to_lowercase().as_str(), arg) {
            ("add", name) => Self::Manual(ManualAction::Add(name.to_string())),
            ("toggle", id) if !id.is_empty() => Self::Manual(ManualAction::Toggle(TaskId::new(id))),
            ("delete", id) if !id.is_empty() => Self::Manual(ManualAction::Delete(TaskId::new(id))),
            ("clear", "") => Self::Manual(ManualAction::Clear),
            ("mute", "") => Self::Mute,
            ("unmute", "") => Self::Unmute,
            ("listen", "") => Self::ToggleListening,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// The voice to-do daemon
pub struct Daemon {
    config: Config,
    store: Arc<dyn TaskStore>,
}

impl Daemon {
    /// Create a daemon talking to the configured task store
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let store = HttpTaskStore::from_config(&config.store)?;
        tracing::debug!(url = store.base_url(), "task store client created");
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Create a daemon over an existing store
    #[must_use]
    pub fn with_store(config: Config, store: Arc<dyn TaskStore>) -> Self {
        Self { config, store }
    }

    /// Command handler writing to the terminal, for one-shot CLI use
    #[must_use]
    pub fn handler(&self) -> CommandHandler {
        let feedback = Feedback::new(build_synthesizer(&self.config), Arc::new(TerminalStatus));
        CommandHandler::new(
            Arc::clone(&self.store),
            feedback,
            Arc::new(TerminalView::new(self.config.sort)),
        )
    }

    /// Run until `/quit` or ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if the configured speech backends cannot be created
    pub async fn run(self) -> Result<()> {
        let voice = &self.config.voice;
        tracing::info!(
            input = ?voice.input,
            enabled = voice.enabled,
            store = %self.config.store.base_url,
            "daemon running"
        );

        let (handle, queue) = controller::channel();
        let feedback = Feedback::new(build_synthesizer(&self.config), Arc::new(TerminalStatus));
        let handler = CommandHandler::new(
            Arc::clone(&self.store),
            feedback.clone(),
            Arc::new(TerminalView::new(self.config.sort)),
        );

        let console = ConsoleInput::new();
        let (wake, command) = build_recognizers(&self.config, &handle, &console)?;
        let wake_phrases = WakePhrases::new(voice.wake_phrases.clone());
        let display_name = wake_phrases.display_name();

        let controller = Controller::new(
            queue,
            Session::new(wake_phrases),
            wake,
            command,
            handler.clone(),
            feedback.clone(),
        )
        .with_acknowledgement(voice.acknowledgement.clone())
        .with_restart_delay(voice.restart_delay);

        let ctrl_c_handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                ctrl_c_handle.shutdown();
            }
        });

        let quit_on_eof = voice.input == InputBackend::Console;
        tokio::spawn(read_stdin(handle.clone(), console, quit_on_eof));

        handler.refresh().await;
        feedback
            .report(
                &format!("Voice-based To-Do app ready. Say '{display_name}' to start."),
                Severity::Spoken,
            )
            .await;
        if voice.enabled {
            handle.set_listening(true);
        } else {
            feedback.show("Voice paused. Use manual input.", Severity::Muted);
        }

        controller.run().await;
        tracing::info!("daemon stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("store", &self.config.store)
            .finish_non_exhaustive()
    }
}

/// Pick the configured synthesizer, falling back to printing
#[must_use]
pub fn build_synthesizer(config: &Config) -> Arc<dyn Synthesizer> {
    if config.voice.tts_provider == TtsProvider::None {
        return Arc::new(ConsoleSynthesizer);
    }
    match TextToSpeech::from_config(config) {
        Ok(tts) => Arc::new(CloudSynthesizer::new(tts)),
        Err(e) => {
            tracing::warn!(error = %e, "TTS unavailable, printing utterances instead");
            Arc::new(ConsoleSynthesizer)
        }
    }
}

type RecognizerPair = (Box<dyn Recognizer>, Box<dyn Recognizer>);

fn build_recognizers(
    config: &Config,
    handle: &ControllerHandle,
    console: &ConsoleInput,
) -> Result<RecognizerPair> {
    let wake_sink = handle.sink(RecognizerKind::Wake);
    let command_sink = handle.sink(RecognizerKind::Command);

    match config.voice.input {
        InputBackend::Console => Ok((
            Box::new(ConsoleRecognizer::new(
                console.clone(),
                wake_sink,
                ListenMode::Continuous,
            )),
            Box::new(ConsoleRecognizer::new(
                console.clone(),
                command_sink,
                ListenMode::SingleShot,
            )),
        )),
        InputBackend::Microphone => {
            let stt = Arc::new(SpeechToText::from_config(config)?);
            tracing::info!(provider = ?config.voice.stt_provider, "microphone input enabled");
            Ok((
                Box::new(MicRecognizer::new(
                    wake_sink,
                    ListenMode::Continuous,
                    Arc::clone(&stt),
                    config.voice.command_timeout,
                )),
                Box::new(MicRecognizer::new(
                    command_sink,
                    ListenMode::SingleShot,
                    stt,
                    config.voice.command_timeout,
                )),
            ))
        }
    }
}

async fn read_stdin(handle: ControllerHandle, console: ConsoleInput, quit_on_eof: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };

        let delivered = match ControlLine::parse(&line) {
            ControlLine::Transcript(text) => {
                if !console.deliver(&text) && !text.is_empty() {
                    println!("(not listening; say the wake phrase first or use /help)");
                }
                true
            }
            ControlLine::Manual(action) => handle.manual(action),
            ControlLine::Mute => handle.set_listening(false),
            ControlLine::Unmute => handle.set_listening(true),
            ControlLine::ToggleListening => handle.toggle_listening(),
            ControlLine::Help => {
                println!("{HELP}");
                true
            }
            ControlLine::Quit => {
                handle.shutdown();
                return;
            }
            ControlLine::Unknown(raw) => {
                println!("unknown command: {raw} (try /help)");
                true
            }
        };

        if !delivered {
            tracing::debug!("controller gone, stopping stdin reader");
            return;
        }
    }

    if quit_on_eof {
        tracing::debug!("stdin closed");
        handle.shutdown();
    }
}
