//! Feedback channel
//!
//! Every user-visible outcome goes through [`Feedback::report`], which
//! updates the status line and, for spoken severities, says the message.

use std::sync::Arc;

use crossterm::style::{Color, Stylize, style};

use crate::voice::Synthesizer;

/// How a status message is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral prompt, display only
    Info,
    /// Waiting for a command
    Listening,
    /// Ready for speech
    Ready,
    /// Echo of a heard transcript
    Heard,
    /// Voice paused
    Muted,
    /// Problem shown but not spoken
    Alert,
    /// Informational message that is also spoken
    Spoken,
    /// Successful outcome, spoken
    Success,
    /// Failed outcome, spoken
    Error,
}

impl Severity {
    /// Whether messages of this severity are spoken aloud
    #[must_use]
    pub const fn is_spoken(self) -> bool {
        matches!(self, Self::Spoken | Self::Success | Self::Error)
    }

    /// Status line color
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Info | Self::Spoken => Color::Grey,
            Self::Listening => Color::Cyan,
            Self::Ready | Self::Success => Color::Green,
            Self::Heard => Color::Blue,
            Self::Muted => Color::DarkGrey,
            Self::Alert => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Single-line status display
pub trait StatusDisplay: Send + Sync {
    /// Replace the status line
    fn show(&self, message: &str, color: Color);
}

/// Status line on stderr
#[derive(Debug, Default)]
pub struct TerminalStatus;

impl StatusDisplay for TerminalStatus {
    fn show(&self, message: &str, color: Color) {
        eprintln!("{}", style(message).with(color));
    }
}

/// Status display plus speech
#[derive(Clone)]
pub struct Feedback {
    synth: Arc<dyn Synthesizer>,
    display: Arc<dyn StatusDisplay>,
}

impl Feedback {
    /// Create a feedback channel
    #[must_use]
    pub fn new(synth: Arc<dyn Synthesizer>, display: Arc<dyn StatusDisplay>) -> Self {
        Self { synth, display }
    }

    /// Show `message` and speak it when the severity calls for it
    pub async fn report(&self, message: &str, severity: Severity) {
        self.show(message, severity);
        if severity.is_spoken() {
            self.say(message).await;
        }
    }

    /// Update the status line only
    pub fn show(&self, message: &str, severity: Severity) {
        self.display.show(message, severity.color());
    }

    /// Speak without touching the status line
    ///
    /// Synthesis failures are logged; there is nowhere else to report them.
    pub async fn say(&self, text: &str) {
        if let Err(e) = self.synth.speak(text).await {
            tracing::warn!(error = %e, text, "speech synthesis failed");
        }
    }
}

impl std::fmt::Debug for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feedback").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        spoken: Mutex<Vec<String>>,
        shown: Mutex<Vec<(String, Color)>>,
    }

    #[async_trait]
    impl Synthesizer for Recorder {
        async fn speak(&self, text: &str) -> crate::Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl StatusDisplay for Recorder {
        fn show(&self, message: &str, color: Color) {
            self.shown.lock().unwrap().push((message.to_string(), color));
        }
    }

    #[tokio::test]
    async fn test_spoken_severities_are_said() {
        let recorder = Arc::new(Recorder::default());
        let feedback = Feedback::new(recorder.clone(), recorder.clone());

        feedback.report("Task added", Severity::Success).await;
        feedback.report("Speak now!", Severity::Ready).await;

        assert_eq!(*recorder.spoken.lock().unwrap(), vec!["Task added"]);
        let shown = recorder.shown.lock().unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0], ("Task added".to_string(), Color::Green));
    }

    #[test]
    fn test_severity_speech() {
        assert!(Severity::Error.is_spoken());
        assert!(!Severity::Alert.is_spoken());
        assert!(!Severity::Heard.is_spoken());
    }
}
