//! Conversation state machine
//!
//! Owns the status and the transcript. Every input (user intent, capture
//! callback, network completion, playback callback) arrives as an [`Event`]
//! through [`Conversation::dispatch`], which returns the [`Effect`]s the
//! caller must carry out. The machine itself performs no I/O.
//!
//! ```text
//!  idle ──start──▶ listening ──transcript──▶ processing ──reply+audio──▶ speaking
//!   ▲                 │ stop/error/end           │ failure/reply            │ end/error
//!   └─────────────────┴──────────────────────────┴──────────────────────────┘
//! ```

mod transcript;

pub use transcript::{Message, MessageId, Role, Transcript};

use crate::Error;
use crate::client::CommandResponse;
use crate::i18n::{Locale, Phrase};
use crate::voice::CaptureErrorKind;

/// Conversation status; exactly one at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    /// Ready for a new command
    #[default]
    Idle,
    /// Capturing speech
    Listening,
    /// Waiting for the command service
    Processing,
    /// Playing the audio reply
    Speaking,
}

impl Status {
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the microphone affordance should be enabled
    #[must_use]
    pub const fn accepts_microphone(self) -> bool {
        matches!(self, Self::Idle | Self::Listening)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Processing => write!(f, "processing"),
            Self::Speaking => write!(f, "speaking"),
        }
    }
}

/// Identifies one capture session so late callbacks from a cancelled
/// session can be told apart from the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureSession(u64);

impl CaptureSession {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Inputs to the state machine
#[derive(Debug)]
pub enum Event {
    /// User pressed the microphone
    StartCapture,
    /// User cancelled an in-progress capture
    StopCapture,
    /// Quick command or typed text, bypassing capture
    Submit(String),
    /// Capture produced a transcript
    TranscriptReceived {
        session: CaptureSession,
        text: String,
        confidence: f32,
    },
    /// Capture failed
    CaptureFailed {
        session: CaptureSession,
        kind: CaptureErrorKind,
    },
    /// Capture session finished (always last for a session)
    CaptureEnded { session: CaptureSession },
    /// Command service replied
    ResponseReceived(CommandResponse),
    /// Command service call failed
    RequestFailed(Error),
    /// Audio reply finished playing
    PlaybackEnded,
    /// Audio reply could not be played
    PlaybackFailed(String),
    /// User asked to re-check backend connectivity
    CheckConnection,
    /// Result of a health check
    HealthChecked(bool),
}

/// Work requested by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Begin a capture session
    StartCapture(CaptureSession),
    /// Abort the active capture session
    StopCapture,
    /// Send text to the command service
    SendCommand(String),
    /// Play the audio reply identified by this reference
    PlayAudio(String),
    /// Probe the command service
    CheckHealth,
    /// Status changed
    StatusChanged(Status),
    /// A message was appended to the transcript
    MessageAppended(Message),
    /// Show an error banner
    ErrorShown(String),
    /// Hide the error banner
    ErrorCleared,
    /// Backend connectivity indicator updated
    ConnectivityChanged(bool),
}

/// The conversation state machine
#[derive(Debug)]
pub struct Conversation {
    locale: Locale,
    status: Status,
    transcript: Transcript,
    capture_supported: bool,
    backend_connected: bool,
    error: Option<String>,
    capture: Option<CaptureSession>,
    next_session: u64,
}

impl Conversation {
    /// Create an idle conversation
    ///
    /// `capture_supported` is the result of the startup capability probe.
    #[must_use]
    pub fn new(locale: Locale, capture_supported: bool) -> Self {
        Self {
            locale,
            status: Status::Idle,
            transcript: Transcript::new(),
            capture_supported,
            backend_connected: false,
            error: None,
            capture: None,
            next_session: 0,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Current error banner, if any
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn capture_supported(&self) -> bool {
        self.capture_supported
    }

    #[must_use]
    pub const fn backend_connected(&self) -> bool {
        self.backend_connected
    }

    /// Feed one event and collect the resulting effects
    pub fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();

        match (self.status, event) {
            (Status::Idle, Event::StartCapture) => {
                if self.capture_supported {
                    self.clear_error(&mut effects);
                    let session = self.open_session();
                    self.set_status(Status::Listening, &mut effects);
                    effects.push(Effect::StartCapture(session));
                } else {
                    tracing::warn!("capture requested but speech recognition is unavailable");
                    let text = self.locale.phrase(Phrase::RecognitionUnsupported);
                    self.show_error(text.to_string(), &mut effects);
                }
            }

            (Status::Listening, Event::StopCapture) => {
                tracing::debug!("capture cancelled by user");
                self.capture = None;
                effects.push(Effect::StopCapture);
                self.set_status(Status::Idle, &mut effects);
            }

            (Status::Idle, Event::Submit(text)) => {
                self.clear_error(&mut effects);
                self.begin_command(text, &mut effects);
            }

            (
                Status::Listening,
                Event::TranscriptReceived {
                    session,
                    text,
                    confidence,
                },
            ) if self.is_current(session) => {
                tracing::info!(transcript = %text, confidence, "speech recognized");
                self.begin_command(text, &mut effects);
            }

            (Status::Listening, Event::CaptureFailed { session, kind })
                if self.is_current(session) =>
            {
                tracing::warn!(kind = %kind, "capture failed");
                self.set_status(Status::Idle, &mut effects);
                let text = self.locale.capture_error(kind);
                self.show_error(text.to_string(), &mut effects);
            }

            (status, Event::CaptureEnded { session }) if self.is_current(session) => {
                self.capture = None;
                if status == Status::Listening {
                    tracing::debug!("capture ended without a result");
                    self.set_status(Status::Idle, &mut effects);
                }
            }

            (Status::Processing, Event::ResponseReceived(response)) => {
                self.append(Role::Assistant, response.reply_text, &mut effects);
                match response.audio_ref {
                    Some(audio_ref) => {
                        self.set_status(Status::Speaking, &mut effects);
                        effects.push(Effect::PlayAudio(audio_ref));
                    }
                    None => self.set_status(Status::Idle, &mut effects),
                }
            }

            (Status::Processing, Event::RequestFailed(err)) => {
                tracing::error!(error = %err, "command processing failed");
                self.set_status(Status::Idle, &mut effects);
                let text = self.locale.error_message(&err);
                self.show_error(text.clone(), &mut effects);
                self.append(Role::Assistant, text, &mut effects);
            }

            (Status::Speaking, Event::PlaybackEnded) => {
                tracing::debug!("audio playback finished");
                self.set_status(Status::Idle, &mut effects);
            }

            (Status::Speaking, Event::PlaybackFailed(reason)) => {
                tracing::warn!(%reason, "audio playback failed");
                self.set_status(Status::Idle, &mut effects);
                let text = self.locale.phrase(Phrase::PlaybackFailed);
                self.show_error(text.to_string(), &mut effects);
            }

            (_, Event::CheckConnection) => effects.push(Effect::CheckHealth),

            (_, Event::HealthChecked(connected)) => {
                if connected {
                    tracing::info!("backend connected");
                } else {
                    tracing::warn!("backend not connected");
                }
                self.backend_connected = connected;
                effects.push(Effect::ConnectivityChanged(connected));
            }

            (status, event) => {
                tracing::debug!(%status, ?event, "event ignored in current state");
            }
        }

        effects
    }

    fn begin_command(&mut self, text: String, effects: &mut Vec<Effect>) {
        self.set_status(Status::Processing, effects);
        self.append(Role::User, text.clone(), effects);
        effects.push(Effect::SendCommand(text));
    }

    fn open_session(&mut self) -> CaptureSession {
        let session = CaptureSession(self.next_session);
        self.next_session += 1;
        self.capture = Some(session);
        session
    }

    fn is_current(&self, session: CaptureSession) -> bool {
        self.capture == Some(session)
    }

    fn set_status(&mut self, status: Status, effects: &mut Vec<Effect>) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "status changed");
            self.status = status;
            effects.push(Effect::StatusChanged(status));
        }
    }

    fn append(&mut self, role: Role, text: String, effects: &mut Vec<Effect>) {
        let message = self.transcript.append(role, text).clone();
        effects.push(Effect::MessageAppended(message));
    }

    fn show_error(&mut self, text: String, effects: &mut Vec<Effect>) {
        self.error = Some(text.clone());
        effects.push(Effect::ErrorShown(text));
    }

    fn clear_error(&mut self, effects: &mut Vec<Effect>) {
        if self.error.take().is_some() {
            effects.push(Effect::ErrorCleared);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str, audio: Option<&str>) -> CommandResponse {
        CommandResponse {
            reply_text: text.to_string(),
            audio_ref: audio.map(ToString::to_string),
        }
    }

    fn listening(conversation: &mut Conversation) -> CaptureSession {
        let effects = conversation.dispatch(Event::StartCapture);
        effects
            .iter()
            .find_map(|e| match e {
                Effect::StartCapture(s) => Some(*s),
                _ => None,
            })
            .expect("capture should start")
    }

    #[test]
    fn test_start_capture_from_idle() {
        let mut conversation = Conversation::new(Locale::Urdu, true);
        let effects = conversation.dispatch(Event::StartCapture);

        assert_eq!(conversation.status(), Status::Listening);
        assert_eq!(effects[0], Effect::StatusChanged(Status::Listening));
        assert!(matches!(effects[1], Effect::StartCapture(_)));
    }

    #[test]
    fn test_unsupported_capture_stays_idle() {
        let mut conversation = Conversation::new(Locale::Urdu, false);
        let effects = conversation.dispatch(Event::StartCapture);

        assert_eq!(conversation.status(), Status::Idle);
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::ErrorShown(_)));
        assert!(conversation.error().is_some());
        assert!(conversation.transcript().is_empty());
    }

    #[test]
    fn test_stale_session_events_are_ignored() {
        let mut conversation = Conversation::new(Locale::English, true);
        let old = listening(&mut conversation);
        conversation.dispatch(Event::StopCapture);
        let current = listening(&mut conversation);
        assert_ne!(old, current);

        let effects = conversation.dispatch(Event::TranscriptReceived {
            session: old,
            text: "late".to_string(),
            confidence: 0.8,
        });
        assert!(effects.is_empty());

        let effects = conversation.dispatch(Event::CaptureEnded { session: old });
        assert!(effects.is_empty());
        assert_eq!(conversation.status(), Status::Listening);
    }

    #[test]
    fn test_capture_end_after_result_keeps_processing() {
        let mut conversation = Conversation::new(Locale::Urdu, true);
        let session = listening(&mut conversation);

        conversation.dispatch(Event::TranscriptReceived {
            session,
            text: "hello".to_string(),
            confidence: 0.9,
        });
        let effects = conversation.dispatch(Event::CaptureEnded { session });

        assert!(effects.is_empty());
        assert_eq!(conversation.status(), Status::Processing);
    }

    #[test]
    fn test_reply_without_audio_returns_to_idle() {
        let mut conversation = Conversation::new(Locale::Urdu, true);
        conversation.dispatch(Event::Submit("what time is it".to_string()));

        let effects = conversation.dispatch(Event::ResponseReceived(reply("تین بجے", None)));

        assert_eq!(conversation.status(), Status::Idle);
        assert!(!effects.iter().any(|e| matches!(e, Effect::PlayAudio(_))));
        assert_eq!(conversation.transcript().len(), 2);
    }

    #[test]
    fn test_submit_clears_previous_error() {
        let mut conversation = Conversation::new(Locale::Urdu, false);
        conversation.dispatch(Event::StartCapture);
        assert!(conversation.error().is_some());

        let effects = conversation.dispatch(Event::Submit("hello".to_string()));
        assert_eq!(effects[0], Effect::ErrorCleared);
        assert!(conversation.error().is_none());
    }

    #[test]
    fn test_health_result_updates_indicator() {
        let mut conversation = Conversation::new(Locale::Urdu, true);
        assert!(!conversation.backend_connected());

        let effects = conversation.dispatch(Event::HealthChecked(true));
        assert_eq!(effects, vec![Effect::ConnectivityChanged(true)]);
        assert!(conversation.backend_connected());

        let effects = conversation.dispatch(Event::CheckConnection);
        assert_eq!(effects, vec![Effect::CheckHealth]);
    }

    #[test]
    fn test_status_mic_affordance() {
        assert!(Status::Idle.accepts_microphone());
        assert!(Status::Listening.accepts_microphone());
        assert!(!Status::Processing.accepts_microphone());
        assert!(!Status::Speaking.accepts_microphone());
    }
}
