//! Energy-based speech segmentation
//!
//! Splits a microphone stream into utterances: a segment opens when the
//! RMS energy crosses a threshold and closes after enough trailing silence.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to emit (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Longest segment before it is cut (in samples)
const MAX_SEGMENT_SAMPLES: usize = 16_000 * 15;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Collecting,
}

/// Accumulates speech between silences
#[derive(Debug)]
pub struct SpeechSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for SpeechSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSegmenter {
    /// Create an idle segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed samples; returns a finished segment when one closes
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Collecting;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, collecting");
                }
                None
            }
            SegmenterState::Collecting => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                let closed_by_silence = self.silence_counter > SILENCE_SAMPLES
                    && self.buffer.len() > MIN_SPEECH_SAMPLES + self.silence_counter;
                if closed_by_silence || self.buffer.len() >= MAX_SEGMENT_SAMPLES {
                    tracing::debug!(samples = self.buffer.len(), "speech segment complete");
                    let segment = std::mem::take(&mut self.buffer);
                    self.reset();
                    return Some(segment);
                }

                // Too much silence without enough speech: a click or cough
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    tracing::trace!("segment timeout - resetting");
                    self.reset();
                }

                None
            }
        }
    }

    /// Whether speech is currently being collected
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.state == SegmenterState::Collecting
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Samples collected so far
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial segment
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.silence_counter = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
pub(crate) fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);
    }

    #[test]
    fn test_short_noise_is_discarded() {
        let mut segmenter = SpeechSegmenter::new();

        assert!(segmenter.push(&vec![0.5f32; 800]).is_none());
        assert!(segmenter.is_collecting());

        // 0.05s of noise then 1.1s of silence: never long enough to emit
        assert!(segmenter.push(&vec![0.0f32; 17_600]).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }
}
