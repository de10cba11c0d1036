//! User-facing phrases in the active UI language

use std::str::FromStr;

use serde::Deserialize;

use crate::Error;
use crate::conversation::Status;
use crate::voice::CaptureErrorKind;

/// UI language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "ur", alias = "urdu")]
    Urdu,
    #[serde(rename = "en", alias = "english")]
    English,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ur" | "urdu" | "ur-pk" => Ok(Self::Urdu),
            "en" | "english" | "en-us" => Ok(Self::English),
            other => Err(Error::Config(format!("unsupported locale: {other}"))),
        }
    }
}

/// Catalog keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    Ready,
    Listening,
    Processing,
    Speaking,
    GenericError,
    NoSpeech,
    MicrophoneDenied,
    RecognitionUnsupported,
    BackendUnreachable,
    PlaybackFailed,
    BackendConnected,
    BackendDisconnected,
    Busy,
}

impl Locale {
    /// Look up a phrase
    #[must_use]
    pub const fn phrase(self, phrase: Phrase) -> &'static str {
        match self {
            Self::Urdu => match phrase {
                Phrase::Ready => "سننے کے لیے تیار",
                Phrase::Listening => "سن رہے ہیں...",
                Phrase::Processing => "پروسیس کر رہے ہیں...",
                Phrase::Speaking => "بول رہے ہیں...",
                Phrase::GenericError => "کچھ غلطی ہو گئی",
                Phrase::NoSpeech => "کچھ سنائی نہیں دیا",
                Phrase::MicrophoneDenied => "مائیکروفون کی اجازت نہیں ملی",
                Phrase::RecognitionUnsupported => "اس ڈیوائس پر وائس ریکگنیشن دستیاب نہیں",
                Phrase::BackendUnreachable => "بیک اینڈ سے رابطہ نہیں ہو سکا",
                Phrase::PlaybackFailed => "آڈیو نہیں چل سکا",
                Phrase::BackendConnected => "بیک اینڈ سے منسلک",
                Phrase::BackendDisconnected => "بیک اینڈ منسلک نہیں",
                Phrase::Busy => "براہ کرم جواب کا انتظار کریں",
            },
            Self::English => match phrase {
                Phrase::Ready => "Ready to listen",
                Phrase::Listening => "Listening...",
                Phrase::Processing => "Processing...",
                Phrase::Speaking => "Speaking...",
                Phrase::GenericError => "Something went wrong",
                Phrase::NoSpeech => "No speech was heard",
                Phrase::MicrophoneDenied => "Microphone permission was not granted",
                Phrase::RecognitionUnsupported => "Voice recognition is not available on this device",
                Phrase::BackendUnreachable => "Could not reach the backend",
                Phrase::PlaybackFailed => "Audio playback failed",
                Phrase::BackendConnected => "Backend connected",
                Phrase::BackendDisconnected => "Backend not connected",
                Phrase::Busy => "Please wait for the current reply",
            },
        }
    }

    /// Status line for the microphone control
    #[must_use]
    pub const fn status(self, status: Status) -> &'static str {
        self.phrase(match status {
            Status::Idle => Phrase::Ready,
            Status::Listening => Phrase::Listening,
            Status::Processing => Phrase::Processing,
            Status::Speaking => Phrase::Speaking,
        })
    }

    /// Message for a capture failure
    #[must_use]
    pub const fn capture_error(self, kind: CaptureErrorKind) -> &'static str {
        self.phrase(match kind {
            CaptureErrorKind::NoSpeech => Phrase::NoSpeech,
            CaptureErrorKind::NotAllowed => Phrase::MicrophoneDenied,
            CaptureErrorKind::NotSupported => Phrase::RecognitionUnsupported,
            CaptureErrorKind::Other => Phrase::GenericError,
        })
    }

    /// Message for any library error, falling back to the generic phrase
    #[must_use]
    pub fn error_message(self, err: &Error) -> String {
        match err {
            Error::Network(_) => self.phrase(Phrase::BackendUnreachable).to_string(),
            Error::Service { status } => {
                format!("{} ({status})", self.phrase(Phrase::GenericError))
            }
            Error::CapabilityUnavailable(_) => {
                self.phrase(Phrase::RecognitionUnsupported).to_string()
            }
            Error::PermissionDenied(_) => self.phrase(Phrase::MicrophoneDenied).to_string(),
            Error::NoSpeechDetected => self.phrase(Phrase::NoSpeech).to_string(),
            Error::Playback(_) => self.phrase(Phrase::PlaybackFailed).to_string(),
            _ => self.phrase(Phrase::GenericError).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parsing() {
        assert_eq!("ur".parse::<Locale>().unwrap(), Locale::Urdu);
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::English);
        assert_eq!(" ur-PK ".parse::<Locale>().unwrap(), Locale::Urdu);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_capture_errors_have_distinct_messages() {
        let kinds = [
            CaptureErrorKind::NoSpeech,
            CaptureErrorKind::NotAllowed,
            CaptureErrorKind::NotSupported,
            CaptureErrorKind::Other,
        ];

        for locale in [Locale::Urdu, Locale::English] {
            let mut seen: Vec<&str> = kinds.iter().map(|k| locale.capture_error(*k)).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), kinds.len());
        }
    }

    #[test]
    fn test_service_error_contains_fallback_text() {
        let message = Locale::Urdu.error_message(&Error::Service { status: 500 });
        assert!(message.contains(Locale::Urdu.phrase(Phrase::GenericError)));
        assert!(message.contains("500"));
    }

    #[test]
    fn test_unknown_errors_fall_back_to_generic() {
        let message = Locale::English.error_message(&Error::Stt("boom".to_string()));
        assert_eq!(message, "Something went wrong");
    }

    #[test]
    fn test_status_phrases() {
        assert_eq!(Locale::Urdu.status(Status::Idle), "سننے کے لیے تیار");
        assert_eq!(Locale::English.status(Status::Speaking), "Speaking...");
    }
}
