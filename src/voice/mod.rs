//! Voice adapters
//!
//! Speech capture ([`SpeechRecognizer`]) and reply playback
//! ([`AudioPlayer`]) contracts, plus native implementations built on the
//! default microphone, a cloud STT provider and the default speaker.

mod capture;
mod endpoint;
mod microphone;
mod playback;
mod recognizer;
mod stt;

pub use capture::{AudioCapture, SAMPLE_RATE, input_available, samples_to_wav};
pub use endpoint::{EndpointConfig, EndpointDetector, EndpointState, calculate_energy};
pub use microphone::MicrophoneRecognizer;
pub use playback::{AudioPlayer, MutedPlayer, PlaybackSink, SpeakerPlayer, UnavailablePlayer, decode_mp3};
pub use recognizer::{CaptureErrorKind, CaptureSink, SpeechRecognizer, UnsupportedRecognizer};
pub use stt::{SpeechToText, Transcription};
