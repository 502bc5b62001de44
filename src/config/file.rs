//! TOML configuration file loading
//!
//! Supports `~/.config/hey-todo/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Task store connection
    #[serde(default)]
    pub store: StoreFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Task list rendering
    #[serde(default)]
    pub view: ViewFileConfig,

    /// API keys for speech services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Task store configuration
#[derive(Debug, Default, Deserialize)]
pub struct StoreFileConfig {
    /// Base URL of the task store (e.g. "http://127.0.0.1:5000")
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice interaction at startup
    pub enabled: Option<bool>,

    /// Input backend ("console" or "microphone")
    pub input: Option<String>,

    /// Accepted wake phrases
    pub wake_phrases: Option<Vec<String>>,

    /// Utterance spoken when a wake phrase is heard
    pub acknowledgement: Option<String>,

    /// Recognition language (e.g. "en-US")
    pub language: Option<String>,

    /// Delay before the wake recognizer restarts, in milliseconds
    pub restart_delay_ms: Option<u64>,

    /// Longest wait for a spoken command, in seconds
    pub command_timeout_secs: Option<u64>,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai", "elevenlabs" or "none")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Rendering configuration
#[derive(Debug, Default, Deserialize)]
pub struct ViewFileConfig {
    /// Sort order ("created", "priority", "category" or "due")
    pub sort: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file
///
/// Uses `path` when given, otherwise the standard location. Returns
/// `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> ConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/hey-todo/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("hey-todo").join("config.toml"))
}
