//! Configuration management for the voice to-do client
//!
//! Values resolve with precedence env > TOML file > default.

pub mod file;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::view::SortMode;
use crate::{Error, Result};

use self::file::ConfigFile;

/// Default task store location
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:5000";

/// Wake phrases accepted when none are configured
pub const DEFAULT_WAKE_PHRASES: [&str; 2] = ["hey to do", "hello to do"];

/// Utterance spoken after a wake phrase
pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Yes? Listening for your command.";

/// Debounce before the wake recognizer restarts
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(500);

/// Client configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Task store connection
    pub store: StoreConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Sort order for the rendered task list
    pub sort: SortMode,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Task store connection settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL (no trailing slash required)
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Where transcripts come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputBackend {
    /// Typed lines on stdin stand in for speech
    #[default]
    Console,
    /// Default microphone with cloud transcription
    Microphone,
}

impl FromStr for InputBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" | "text" | "stdin" => Ok(Self::Console),
            "microphone" | "mic" | "audio" => Ok(Self::Microphone),
            other => Err(Error::Config(format!("unknown voice input: {other}"))),
        }
    }
}

/// Speech-to-text service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SttProvider {
    #[default]
    Whisper,
    Deepgram,
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Text-to-speech service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TtsProvider {
    #[default]
    OpenAi,
    ElevenLabs,
    /// Print utterances instead of speaking them
    None,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            "none" | "console" | "off" => Ok(Self::None),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Start with voice interaction enabled
    pub enabled: bool,

    /// Transcript source
    pub input: InputBackend,

    /// Accepted wake phrases, normalized to lowercase
    pub wake_phrases: Vec<String>,

    /// Utterance spoken when a wake phrase is heard
    pub acknowledgement: String,

    /// Recognition language tag
    pub language: String,

    /// Delay before restarting the wake recognizer
    pub restart_delay: Duration,

    /// Longest wait for a spoken command
    pub command_timeout: Duration,

    /// STT service
    pub stt_provider: SttProvider,

    /// STT model
    pub stt_model: String,

    /// TTS service
    pub tts_provider: TtsProvider,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input: InputBackend::default(),
            wake_phrases: DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect(),
            acknowledgement: DEFAULT_ACKNOWLEDGEMENT.to_string(),
            language: "en-US".to_string(),
            restart_delay: DEFAULT_RESTART_DELAY,
            command_timeout: Duration::from_secs(8),
            stt_provider: SttProvider::default(),
            stt_model: "whisper-1".to_string(),
            tts_provider: TtsProvider::default(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// API keys for speech services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl Config {
    /// Load configuration from the standard file location and environment
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with an explicit file path and voice override
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn load_with_options(path: Option<&Path>, disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file(path);
        let mut config = Self::resolve(fc, |key| std::env::var(key).ok())?;

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            config.voice.enabled = false;
        }

        Ok(config)
    }

    /// Merge a config file with an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn resolve(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = VoiceConfig::default();

        let store = StoreConfig {
            base_url: env("HEY_TODO_STORE_URL")
                .or(fc.store.base_url)
                .unwrap_or_else(|| DEFAULT_STORE_URL.to_string()),
            timeout: fc
                .store
                .timeout_secs
                .map_or(StoreConfig::default().timeout, Duration::from_secs),
        };

        let wake_phrases = env("HEY_TODO_WAKE_PHRASES")
            .map(|s| s.split(',').map(ToString::to_string).collect::<Vec<_>>())
            .or(fc.voice.wake_phrases)
            .map(|phrases| normalize_phrases(&phrases))
            .filter(|phrases| !phrases.is_empty())
            .unwrap_or(defaults.wake_phrases);

        let input = env("HEY_TODO_VOICE_INPUT")
            .or(fc.voice.input)
            .map(|s| s.parse::<InputBackend>())
            .transpose()?
            .unwrap_or_default();

        let stt_provider = fc
            .voice
            .stt_provider
            .map(|s| s.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();

        let tts_provider = fc
            .voice
            .tts_provider
            .map(|s| s.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or_default();

        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(true),
            input,
            wake_phrases,
            acknowledgement: fc.voice.acknowledgement.unwrap_or(defaults.acknowledgement),
            language: fc.voice.language.unwrap_or(defaults.language),
            restart_delay: fc
                .voice
                .restart_delay_ms
                .map_or(defaults.restart_delay, Duration::from_millis),
            command_timeout: fc
                .voice
                .command_timeout_secs
                .map_or(defaults.command_timeout, Duration::from_secs),
            stt_provider,
            stt_model: env("HEY_TODO_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            tts_provider,
            tts_model: env("HEY_TODO_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_voice: fc.voice.tts_voice.unwrap_or(defaults.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(defaults.tts_speed).clamp(0.25, 4.0),
        };

        let sort = fc
            .view
            .sort
            .map(|s| s.parse::<SortMode>())
            .transpose()?.unwrap_or_default();

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        Ok(Self {
            store,
            voice,
            sort,
            api_keys,
        })
    }
}

fn normalize_phrases(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = Config::resolve(ConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.store.base_url, DEFAULT_STORE_URL);
        assert_eq!(config.voice.wake_phrases, vec!["hey to do", "hello to do"]);
        assert_eq!(config.voice.restart_delay, Duration::from_millis(500));
        assert_eq!(config.voice.input, InputBackend::Console);
        assert_eq!(config.sort, SortMode::Created);
        assert!(config.voice.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [store]
            base_url = "http://from-file:5000"
            [api_keys]
            openai = "file-key"
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_from(&[
                ("HEY_TODO_STORE_URL", "http://from-env:5000"),
                ("OPENAI_API_KEY", "env-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.store.base_url, "http://from-env:5000");
        assert_eq!(config.api_keys.openai.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_wake_phrases_from_env_are_normalized() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[("HEY_TODO_WAKE_PHRASES", " Hey List , OK LIST ,")]),
        )
        .unwrap();

        assert_eq!(config.voice.wake_phrases, vec!["hey list", "ok list"]);
    }

    #[test]
    fn test_empty_wake_phrases_fall_back_to_defaults() {
        let fc: ConfigFile = toml::from_str("[voice]\nwake_phrases = [\"  \"]\n").unwrap();
        let config = Config::resolve(fc, env_from(&[])).unwrap();
        assert_eq!(config.voice.wake_phrases.len(), 2);
    }

    #[test]
    fn test_unknown_input_backend_is_an_error() {
        let result = Config::resolve(
            ConfigFile::default(),
            env_from(&[("HEY_TODO_VOICE_INPUT", "telepathy")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tts_speed_is_clamped() {
        let fc: ConfigFile = toml::from_str("[voice]\ntts_speed = 9.0\n").unwrap();
        let config = Config::resolve(fc, env_from(&[])).unwrap();
        assert!((config.voice.tts_speed - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Deepgram".parse::<SttProvider>().unwrap(), SttProvider::Deepgram);
        assert_eq!("none".parse::<TtsProvider>().unwrap(), TtsProvider::None);
        assert_eq!("mic".parse::<InputBackend>().unwrap(), InputBackend::Microphone);
    }
}
