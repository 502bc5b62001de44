//! Speech engine boundary
//!
//! Recognizers push lifecycle events (result, error, end) into the
//! controller's queue through a [`RecognitionSink`]; synthesizers resolve
//! when an utterance has finished playing.
//!
//! Backends:
//! - console: stdin lines stand in for transcripts, utterances are printed
//! - microphone: cpal capture, energy segmentation and cloud STT
//! - cloud TTS with speaker playback

mod capture;
mod console;
mod mic;
mod playback;
mod segment;
mod stt;
mod tts;
mod wake;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use capture::{
    AudioCapture, AudioSource, SAMPLE_RATE, SourceOpener, default_source, samples_to_wav,
};
pub use console::{ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer};
pub use mic::MicRecognizer;
pub use playback::{play_mp3, play_samples};
pub use segment::{SegmenterState, SpeechSegmenter};
pub use stt::SpeechToText;
pub use tts::{CloudSynthesizer, TextToSpeech};
pub use wake::WakePhrases;

use crate::Result;
use crate::session::Event;

/// Which of the two recognizers an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognizerKind {
    /// Continuous recognizer waiting for a wake phrase
    Wake,
    /// Single-shot recognizer capturing one command
    Command,
}

/// Whether a recognizer stops after its first result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Keep transcribing until stopped
    Continuous,
    /// End after one result (or error)
    SingleShot,
}

/// Recognizer failure reported through the event queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// Nothing was said before the recognizer gave up
    #[error("no speech detected")]
    NoSpeech,
    /// Recognition was cancelled
    #[error("recognition aborted")]
    Aborted,
    /// Audio input could not be captured
    #[error("audio capture failed: {0}")]
    AudioCapture(String),
    /// The transcription service could not be reached
    #[error("network error: {0}")]
    Network(String),
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl RecognitionError {
    /// Whether this is steady-state "nothing heard" noise
    #[must_use]
    pub const fn is_no_speech(&self) -> bool {
        matches!(self, Self::NoSpeech)
    }
}

/// Lifecycle event emitted by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A finished transcript
    Result(String),
    /// A recognition failure; an `End` normally follows
    Error(RecognitionError),
    /// The recognizer stopped capturing
    End,
}

/// Tagged sender recognizers use to report events
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    kind: RecognizerKind,
    tx: mpsc::UnboundedSender<Event>,
}

impl RecognitionSink {
    /// Create a sink that tags events with `kind`
    #[must_use]
    pub const fn new(kind: RecognizerKind, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { kind, tx }
    }

    /// Recognizer this sink reports for
    #[must_use]
    pub const fn kind(&self) -> RecognizerKind {
        self.kind
    }

    /// Report a transcript
    pub fn result(&self, transcript: impl Into<String>) {
        self.emit(RecognitionEvent::Result(transcript.into()));
    }

    /// Report a failure
    pub fn error(&self, error: RecognitionError) {
        self.emit(RecognitionEvent::Error(error));
    }

    /// Report that capture has stopped
    pub fn end(&self) {
        self.emit(RecognitionEvent::End);
    }

    fn emit(&self, event: RecognitionEvent) {
        let event = Event::Recognition {
            kind: self.kind,
            event,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(kind = ?self.kind, "controller gone, dropping recognition event");
        }
    }
}

/// Speech-to-text engine
///
/// `stop` must be a no-op on a recognizer that is not running; recognizers
/// end asynchronously and may already have stopped on their own.
pub trait Recognizer: Send {
    /// Begin capturing
    ///
    /// # Errors
    ///
    /// Returns error if capture cannot begin
    fn start(&mut self) -> Result<()>;

    /// Stop capturing; emits `End` if the recognizer was running
    ///
    /// Any audio device the recognizer holds is released before this
    /// returns, so the other recognizer can be started right after.
    fn stop(&mut self);

    /// Whether the recognizer is currently capturing
    fn is_running(&self) -> bool;
}

/// Text-to-speech engine
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text`, resolving once the utterance has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}
