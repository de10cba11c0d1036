//! End-of-utterance detection
//!
//! Energy-based: a block whose RMS exceeds the threshold counts as speech.
//! A session waits for speech, accumulates it, and completes once enough
//! trailing silence follows. If nothing is said before the no-speech
//! timeout the session ends empty.

use std::time::Duration;

use super::capture::SAMPLE_RATE;

/// Minimum audio energy to count as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum amount of speech for a valid utterance (0.3 s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Detection thresholds, all lengths in samples at [`SAMPLE_RATE`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointConfig {
    pub energy_threshold: f32,
    pub min_speech_samples: usize,
    pub trailing_silence_samples: usize,
    pub no_speech_samples: usize,
    pub max_samples: usize,
}

impl EndpointConfig {
    /// Build from durations
    #[must_use]
    pub fn from_durations(
        trailing_silence: Duration,
        no_speech_timeout: Duration,
        max_utterance: Duration,
    ) -> Self {
        Self {
            energy_threshold: ENERGY_THRESHOLD,
            min_speech_samples: MIN_SPEECH_SAMPLES,
            trailing_silence_samples: samples_for(trailing_silence),
            no_speech_samples: samples_for(no_speech_timeout),
            max_samples: samples_for(max_utterance),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from_durations(
            Duration::from_millis(800),
            Duration::from_secs(8),
            Duration::from_secs(15),
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
fn samples_for(duration: Duration) -> usize {
    (duration.as_millis() * u128::from(SAMPLE_RATE) / 1000) as usize
}

/// Where the current utterance stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No speech yet
    Waiting,
    /// Speech in progress
    Speaking,
    /// Speech followed by silence, or the maximum length was reached
    Complete,
    /// Timed out without speech
    NoSpeech,
}

impl EndpointState {
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::NoSpeech)
    }
}

/// Tracks one utterance
#[derive(Debug)]
pub struct EndpointDetector {
    config: EndpointConfig,
    state: EndpointState,
    speech: Vec<f32>,
    silence: usize,
    waited: usize,
}

impl EndpointDetector {
    #[must_use]
    pub const fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            state: EndpointState::Waiting,
            speech: Vec::new(),
            silence: 0,
            waited: 0,
        }
    }

    /// Feed a block of samples and return the updated state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        if samples.is_empty() || self.state.is_finished() {
            return self.state;
        }

        let energy = calculate_energy(samples);
        let is_speech = energy > self.config.energy_threshold;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech.extend_from_slice(samples);
                    self.silence = 0;
                    tracing::trace!(energy, "speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.config.no_speech_samples {
                        tracing::debug!(waited = self.waited, "no speech before timeout");
                        self.state = EndpointState::NoSpeech;
                    }
                }
            }
            EndpointState::Speaking => {
                self.speech.extend_from_slice(samples);

                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech.len(),
                    silence = self.silence,
                    is_speech,
                    energy,
                    "speaking"
                );

                if self.speech.len() >= self.config.max_samples {
                    tracing::debug!(samples = self.speech.len(), "utterance reached max length");
                    self.state = EndpointState::Complete;
                } else if self.silence >= self.config.trailing_silence_samples {
                    if self.speech.len() - self.silence >= self.config.min_speech_samples {
                        tracing::debug!(samples = self.speech.len(), "utterance complete");
                        self.state = EndpointState::Complete;
                    } else {
                        // A click or cough; keep waiting for real speech
                        self.waited += self.speech.len();
                        self.speech.clear();
                        self.silence = 0;
                        self.state = if self.waited >= self.config.no_speech_samples {
                            EndpointState::NoSpeech
                        } else {
                            EndpointState::Waiting
                        };
                    }
                }
            }
            EndpointState::Complete | EndpointState::NoSpeech => {}
        }

        self.state
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Accumulated speech so far
    #[must_use]
    pub fn speech(&self) -> &[f32] {
        &self.speech
    }

    /// Take the utterance, clearing the buffer
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech)
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
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

        assert!(calculate_energy(&[]) < f32::EPSILON);
    }

    #[test]
    fn test_default_config_lengths() {
        let config = EndpointConfig::default();
        assert_eq!(config.trailing_silence_samples, 12_800);
        assert_eq!(config.no_speech_samples, 128_000);
        assert_eq!(config.max_samples, 240_000);
    }

    #[test]
    fn test_empty_block_does_not_advance() {
        let mut detector = EndpointDetector::new(EndpointConfig::default());
        assert_eq!(detector.process(&[]), EndpointState::Waiting);
    }
}
