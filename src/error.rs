//! Error types for the voice to-do client

use thiserror::Error;

/// Result type alias for hey-todo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice to-do client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Recognizer could not be started or stopped
    #[error("recognition error: {0}")]
    Recognition(String),

    /// No task matched a spoken name
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The task store answered with a non-2xx status
    #[error("task store rejected request ({status}): {message}")]
    StoreRejected {
        /// HTTP status code
        status: u16,
        /// Server-provided error text
        message: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Message to speak when this error ends a command
    ///
    /// Store rejections are surfaced verbatim; transport failures collapse
    /// into a generic network message.
    #[must_use]
    pub fn spoken_message(&self) -> String {
        match self {
            Self::StoreRejected { message, .. } => message.clone(),
            Self::TaskNotFound(_) => "Task not found".to_string(),
            Self::Http(_) | Self::Serialization(_) | Self::Io(_) => "Network error.".to_string(),
            other => other.to_string(),
        }
    }
}
