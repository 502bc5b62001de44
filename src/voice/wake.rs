//! Wake phrase matching
//!
//! Matching is a lenient substring test on the normalized transcript so
//! that transcription noise around the phrase ("ok hey to do please") still
//! triggers.

use crate::command::normalize;

/// Accepted wake phrases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakePhrases {
    phrases: Vec<String>,
}

impl WakePhrases {
    /// Create a matcher for `phrases`
    ///
    /// Phrases are lower-cased and trimmed; empty entries are dropped.
    #[must_use]
    pub fn new(phrases: Vec<String>) -> Self {
        let normalized: Vec<String> = phrases
            .into_iter()
            .map(|p| normalize(&p))
            .filter(|p| !p.is_empty())
            .collect();

        tracing::debug!(wake_phrases = ?normalized, "wake phrase matcher initialized");

        Self { phrases: normalized }
    }

    /// Return the first phrase contained in `transcript`
    #[must_use]
    pub fn find(&self, transcript: &str) -> Option<&str> {
        let normalized = normalize(transcript);
        self.phrases
            .iter()
            .find(|phrase| normalized.contains(phrase.as_str()))
            .map(String::as_str)
    }

    /// Whether `transcript` contains any wake phrase
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        self.find(transcript).is_some()
    }

    /// The configured phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Primary phrase in title case, for prompts ("Hey To Do")
    #[must_use]
    pub fn display_name(&self) -> String {
        self.phrases
            .first()
            .map(|phrase| {
                phrase
                    .split_whitespace()
                    .map(|word| {
                        let mut chars = word.chars();
                        chars.next().map_or_else(String::new, |c| {
                            c.to_uppercase().chain(chars).collect()
                        })
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}
