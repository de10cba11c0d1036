//! Speech capture contract
//!
//! A recognizer runs single-shot sessions. Each session reports through a
//! [`CaptureSink`]: at most one result or error, and always a final end
//! notification when the sink is dropped.

use tokio::sync::mpsc::UnboundedSender;

use crate::conversation::{CaptureSession, Event};

/// Why a capture session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// Nothing was said before the timeout
    NoSpeech,
    /// Microphone access refused or device could not be opened
    NotAllowed,
    /// Recognition capability absent
    NotSupported,
    /// Any other failure
    Other,
}

impl CaptureErrorKind {
    /// Stable short code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::NotAllowed => "not-allowed",
            Self::NotSupported => "not-supported",
            Self::Other => "error",
        }
    }
}

impl std::fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl From<&crate::Error> for CaptureErrorKind {
    fn from(err: &crate::Error) -> Self {
        match err {
            crate::Error::CapabilityUnavailable(_) => Self::NotSupported,
            crate::Error::PermissionDenied(_) => Self::NotAllowed,
            crate::Error::NoSpeechDetected => Self::NoSpeech,
            _ => Self::Other,
        }
    }
}

/// Reporting handle for one capture session
pub struct CaptureSink {
    session: CaptureSession,
    events: UnboundedSender<Event>,
    reported: bool,
    armed: bool,
}

impl CaptureSink {
    #[must_use]
    pub fn new(session: CaptureSession, events: UnboundedSender<Event>) -> Self {
        Self {
            session,
            events,
            reported: false,
            armed: true,
        }
    }

    #[must_use]
    pub const fn session(&self) -> CaptureSession {
        self.session
    }

    /// Whether a result or error has already been reported
    #[must_use]
    pub const fn has_reported(&self) -> bool {
        self.reported
    }

    /// Report the recognized transcript
    ///
    /// A blank transcript is reported as [`CaptureErrorKind::NoSpeech`], so
    /// an empty command never leaves the recognizer.
    pub fn result(&mut self, transcript: &str, confidence: f32) {
        let text = transcript.trim();
        if text.is_empty() {
            self.error(CaptureErrorKind::NoSpeech);
            return;
        }

        if self.claim() {
            self.send(Event::TranscriptReceived {
                session: self.session,
                text: text.to_string(),
                confidence,
            });
        }
    }

    /// Report a failure
    pub fn error(&mut self, kind: CaptureErrorKind) {
        if self.claim() {
            self.send(Event::CaptureFailed {
                session: self.session,
                kind,
            });
        }
    }

    /// Finish the session; equivalent to dropping the sink
    pub fn end(self) {
        drop(self);
    }

    /// Drop the sink without reporting the end of the session
    ///
    /// Used when a start request is refused and no session was opened.
    pub fn discard(mut self) {
        self.armed = false;
    }

    fn claim(&mut self) -> bool {
        if self.reported {
            tracing::debug!(session = self.session.get(), "duplicate capture report ignored");
            return false;
        }
        self.reported = true;
        true
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("conversation gone, capture event dropped");
        }
    }
}

impl Drop for CaptureSink {
    fn drop(&mut self) {
        if self.armed {
            self.send(Event::CaptureEnded {
                session: self.session,
            });
        }
    }
}

/// Speech capture adapter
pub trait SpeechRecognizer: Send {
    /// Whether recognition can run on this host
    fn is_supported(&self) -> bool;

    /// Whether a session is currently running
    fn is_listening(&self) -> bool;

    /// Begin a single-shot session; a no-op while already listening
    fn start(&mut self, sink: CaptureSink);

    /// End the running session without a result; a no-op when idle
    fn stop(&mut self);
}

/// Recognizer used when the capability probe found nothing
#[derive(Debug, Default)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn start(&mut self, mut sink: CaptureSink) {
        sink.error(CaptureErrorKind::NotSupported);
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_result_then_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = CaptureSink::new(CaptureSession::new(3), tx);

        sink.result(" hello ", 0.9);
        sink.end();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            Event::TranscriptReceived { text, .. } if text == "hello"
        ));
        assert!(matches!(events[1], Event::CaptureEnded { .. }));
    }

    #[test]
    fn test_only_first_report_counts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = CaptureSink::new(CaptureSession::new(0), tx);

        sink.error(CaptureErrorKind::NotAllowed);
        sink.result("late", 1.0);
        drop(sink);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::CaptureFailed {
                kind: CaptureErrorKind::NotAllowed,
                ..
            }
        ));
    }

    #[test]
    fn test_blank_result_becomes_no_speech() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = CaptureSink::new(CaptureSession::new(0), tx);
        sink.result("   ", 0.4);
        drop(sink);

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            Event::CaptureFailed {
                kind: CaptureErrorKind::NoSpeech,
                ..
            }
        ));
    }

    #[test]
    fn test_discard_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        CaptureSink::new(CaptureSession::new(0), tx).discard();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unsupported_recognizer_reports_and_ends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recognizer = UnsupportedRecognizer;
        assert!(!recognizer.is_supported());

        recognizer.start(CaptureSink::new(CaptureSession::new(1), tx));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::CaptureFailed {
                kind: CaptureErrorKind::NotSupported,
                ..
            }
        ));
        assert!(matches!(events[1], Event::CaptureEnded { .. }));
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(CaptureErrorKind::NoSpeech.to_string(), "no-speech");
        assert_eq!(CaptureErrorKind::NotAllowed.code(), "not-allowed");
        assert_eq!(
            CaptureErrorKind::from(&crate::Error::NoSpeechDetected),
            CaptureErrorKind::NoSpeech
        );
    }
}
