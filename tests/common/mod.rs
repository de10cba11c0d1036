//! Shared test utilities: in-process fakes for every adapter

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use urdu_voice::client::{self, CommandResponse, CommandService};
use urdu_voice::conversation::{Message, Role, Status};
use urdu_voice::voice::{AudioPlayer, CaptureErrorKind, CaptureSink, PlaybackSink, SpeechRecognizer};
use urdu_voice::{Error, Result, View};

pub const BASE_URL: &str = "http://backend.test";

/// What the scripted recognizer does on the next start
#[derive(Debug, Clone)]
pub enum Capture {
    Transcript(&'static str, f32),
    Fail(CaptureErrorKind),
    /// Keep the session open until stopped
    Hold,
}

#[derive(Debug, Default)]
pub struct RecognizerLog {
    pub starts: usize,
    pub stops: usize,
}

/// Recognizer that replays a script synchronously
pub struct ScriptedRecognizer {
    script: VecDeque<Capture>,
    held: Option<CaptureSink>,
    pub log: Arc<Mutex<RecognizerLog>>,
}

impl ScriptedRecognizer {
    pub fn new(script: impl IntoIterator<Item = Capture>) -> Self {
        Self {
            script: script.into_iter().collect(),
            held: None,
            log: Arc::default(),
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_listening(&self) -> bool {
        self.held.is_some()
    }

    fn start(&mut self, mut sink: CaptureSink) {
        self.log.lock().unwrap().starts += 1;
        match self.script.pop_front() {
            Some(Capture::Transcript(text, confidence)) => sink.result(text, confidence),
            Some(Capture::Fail(kind)) => sink.error(kind),
            Some(Capture::Hold) => self.held = Some(sink),
            None => sink.error(CaptureErrorKind::NoSpeech),
        }
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
        self.held = None;
    }
}

/// Command service with canned replies
pub struct FakeClient {
    replies: Mutex<VecDeque<Result<CommandResponse>>>,
    healthy: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeClient {
    pub fn new(replies: impl IntoIterator<Item = Result<CommandResponse>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            healthy: true,
            calls: Arc::default(),
        }
    }

    #[must_use]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

#[async_trait]
impl CommandService for FakeClient {
    async fn process_command(&self, text: &str) -> Result<CommandResponse> {
        self.calls.lock().unwrap().push(text.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("no scripted reply".to_string())))
    }

    fn audio_url(&self, audio_ref: &str) -> String {
        client::audio_url(BASE_URL, audio_ref)
    }

    async fn health_check(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(Error::Network("connection refused".to_string()))
        }
    }
}

/// How the fake player ends each playback
#[derive(Debug, Clone, Copy)]
pub enum Playback {
    Finish,
    Fail,
    Hold,
}

/// Player that records URLs and reports a fixed outcome
pub struct FakePlayer {
    outcome: Playback,
    held: Option<PlaybackSink>,
    pub urls: Arc<Mutex<Vec<String>>>,
}

impl FakePlayer {
    pub fn new(outcome: Playback) -> Self {
        Self {
            outcome,
            held: None,
            urls: Arc::default(),
        }
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&mut self, url: &str, sink: PlaybackSink) {
        self.urls.lock().unwrap().push(url.to_string());
        match self.outcome {
            Playback::Finish => sink.finished(),
            Playback::Fail => sink.failed("decoder error"),
            Playback::Hold => self.held = Some(sink),
        }
    }

    fn stop(&mut self) {
        self.held = None;
    }
}

/// Everything a view was told, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Status(Status),
    Message(Role, String),
    Error(String),
    ErrorCleared,
    Connectivity(bool),
    Notice(String),
}

#[derive(Clone, Default)]
pub struct RecordingView {
    pub shown: Arc<Mutex<Vec<Shown>>>,
}

impl RecordingView {
    pub fn statuses(&self) -> Vec<Status> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Shown::Status(status) => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(Role, String)> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Shown::Message(role, text) => Some((*role, text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Shown::Error(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl View for RecordingView {
    fn status_changed(&mut self, status: Status) {
        self.shown.lock().unwrap().push(Shown::Status(status));
    }

    fn message_appended(&mut self, message: &Message) {
        self.shown
            .lock()
            .unwrap()
            .push(Shown::Message(message.role(), message.text().to_string()));
    }

    fn error_shown(&mut self, text: &str) {
        self.shown.lock().unwrap().push(Shown::Error(text.to_string()));
    }

    fn error_cleared(&mut self) {
        self.shown.lock().unwrap().push(Shown::ErrorCleared);
    }

    fn connectivity_changed(&mut self, connected: bool) {
        self.shown.lock().unwrap().push(Shown::Connectivity(connected));
    }

    fn notice(&mut self, text: &str) {
        self.shown.lock().unwrap().push(Shown::Notice(text.to_string()));
    }
}

/// Reply with optional audio
pub fn reply(text: &str, audio: Option<&str>) -> Result<CommandResponse> {
    Ok(CommandResponse {
        reply_text: text.to_string(),
        audio_ref: audio.map(ToString::to_string),
    })
}
