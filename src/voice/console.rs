//! Console speech backend
//!
//! Typed lines stand in for transcripts and utterances are printed. Both
//! recognizers share one [`ConsoleInput`]; whichever is registered receives
//! the next line, so at most one of them ever "captures".

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ListenMode, RecognitionError, RecognitionSink, Recognizer, RecognizerKind, Synthesizer};
use crate::{Error, Result};

#[derive(Debug)]
struct ActiveListener {
    sink: RecognitionSink,
    mode: ListenMode,
}

/// Line source shared by the console recognizers
#[derive(Debug, Clone, Default)]
pub struct ConsoleInput {
    active: Arc<Mutex<Option<ActiveListener>>>,
}

impl ConsoleInput {
    /// Create an input with no listener registered
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a typed line to the registered recognizer
    ///
    /// Returns `false` when no recognizer is listening.
    pub fn deliver(&self, line: &str) -> bool {
        let Ok(mut active) = self.active.lock() else {
            return false;
        };
        let Some(listener) = active.as_ref() else {
            return false;
        };

        let line = line.trim();
        if line.is_empty() {
            listener.sink.error(RecognitionError::NoSpeech);
        } else {
            listener.sink.result(line);
        }

        if listener.mode == ListenMode::SingleShot {
            if let Some(listener) = active.take() {
                listener.sink.end();
            }
        }
        true
    }

    /// Recognizer currently receiving lines
    #[must_use]
    pub fn listener(&self) -> Option<RecognizerKind> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|l| l.sink.kind()))
    }
}

/// Recognizer fed by [`ConsoleInput`]
#[derive(Debug)]
pub struct ConsoleRecognizer {
    input: ConsoleInput,
    sink: RecognitionSink,
    mode: ListenMode,
}

impl ConsoleRecognizer {
    /// Create a recognizer reporting through `sink`
    #[must_use]
    pub const fn new(input: ConsoleInput, sink: RecognitionSink, mode: ListenMode) -> Self {
        Self { input, sink, mode }
    }
}

impl Recognizer for ConsoleRecognizer {
    fn start(&mut self) -> Result<()> {
        let mut active = self
            .input
            .active
            .lock()
            .map_err(|_| Error::Recognition("console input lock poisoned".to_string()))?;

        match active.as_ref().map(|l| l.sink.kind()) {
            Some(kind) if kind == self.sink.kind() => Ok(()),
            Some(kind) => Err(Error::Recognition(format!(
                "{kind:?} recognizer is already capturing"
            ))),
            None => {
                *active = Some(ActiveListener {
                    sink: self.sink.clone(),
                    mode: self.mode,
                });
                tracing::trace!(kind = ?self.sink.kind(), "console recognizer started");
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        let Ok(mut active) = self.input.active.lock() else {
            return;
        };
        if active.as_ref().is_some_and(|l| l.sink.kind() == self.sink.kind()) {
            *active = None;
            self.sink.end();
        }
    }

    fn is_running(&self) -> bool {
        self.input.listener() == Some(self.sink.kind())
    }
}

/// Prints utterances instead of speaking them
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer;

#[async_trait]
impl Synthesizer for ConsoleSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("🔊 {text}");
        Ok(())
    }
}
