//! Event loop tying the conversation to its adapters
//!
//! All events flow through one channel and are handled to completion, one
//! at a time. Adapters and background tasks only ever post events; only
//! this loop touches the [`Conversation`].

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::Result;
use crate::client::CommandService;
use crate::conversation::{Conversation, Effect, Event, Message, Status};
use crate::i18n::{Locale, Phrase};
use crate::voice::{AudioPlayer, CaptureSink, PlaybackSink, SpeechRecognizer};

/// Presentation surface for conversation changes
pub trait View: Send {
    fn status_changed(&mut self, status: Status);

    fn message_appended(&mut self, message: &Message);

    fn error_shown(&mut self, text: &str);

    fn error_cleared(&mut self);

    fn connectivity_changed(&mut self, connected: bool);

    /// Transient hint that is not part of the conversation state
    fn notice(&mut self, text: &str);
}

/// User actions from the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Microphone pressed: start capture, or cancel it while listening
    Microphone,
    /// Quick command or typed text
    Command(String),
    /// Re-check backend connectivity
    RetryConnection,
    Quit,
}

/// Drives a [`Conversation`] and executes its effects
pub struct Assistant {
    conversation: Conversation,
    recognizer: Box<dyn SpeechRecognizer>,
    player: Box<dyn AudioPlayer>,
    client: Arc<dyn CommandService>,
    view: Box<dyn View>,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
}

impl Assistant {
    /// Create an assistant; recognizer support is probed once here
    pub fn new(
        locale: Locale,
        recognizer: Box<dyn SpeechRecognizer>,
        player: Box<dyn AudioPlayer>,
        client: Arc<dyn CommandService>,
        view: Box<dyn View>,
    ) -> Self {
        let capture_supported = recognizer.is_supported();
        tracing::info!(?locale, capture_supported, "assistant initialized");

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            conversation: Conversation::new(locale, capture_supported),
            recognizer,
            player,
            client,
            view,
            events_tx,
            events_rx,
        }
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Handle an event and run every effect it produces
    pub fn handle(&mut self, event: Event) {
        for effect in self.conversation.dispatch(event) {
            self.execute(effect);
        }
    }

    /// Translate a user action into an event
    ///
    /// Returns `false` when the user asked to quit.
    pub fn apply(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Microphone => {
                let status = self.conversation.status();
                if !status.accepts_microphone() {
                    tracing::debug!(%status, "microphone pressed while busy");
                    let text = self.conversation.locale().phrase(Phrase::Busy);
                    self.view.notice(text);
                } else if status == Status::Listening {
                    self.handle(Event::StopCapture);
                } else {
                    self.handle(Event::StartCapture);
                }
            }
            Intent::Command(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::debug!("blank command ignored");
                } else {
                    self.handle(Event::Submit(text.to_string()));
                }
            }
            Intent::RetryConnection => self.handle(Event::CheckConnection),
            Intent::Quit => return false,
        }
        true
    }

    /// Probe the backend and wait for the answer
    pub async fn check_connection(&mut self) -> bool {
        let connected = match self.client.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                false
            }
        };
        self.handle(Event::HealthChecked(connected));
        connected
    }

    /// Wait for the next adapter event and handle it
    pub async fn step(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    /// Handle adapter events until the conversation is idle again
    pub async fn run_until_idle(&mut self) {
        while !self.conversation.status().is_idle() {
            self.step().await;
        }
    }

    /// Run until the intent stream ends, the user quits, or Ctrl-C
    ///
    /// # Errors
    ///
    /// Currently infallible; reserved for adapter start-up failures
    pub async fn run(mut self, mut intents: UnboundedReceiver<Intent>) -> Result<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.handle(Event::CheckConnection);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Some(event) = self.events_rx.recv() => self.handle(event),
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        tracing::debug!("input closed");
                        break;
                    };
                    if !self.apply(intent) {
                        tracing::info!("quit requested");
                        break;
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Stop any capture or playback in flight
    pub fn shutdown(&mut self) {
        self.recognizer.stop();
        self.player.stop();
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartCapture(session) => {
                let sink = CaptureSink::new(session, self.events_tx.clone());
                self.recognizer.start(sink);
            }
            Effect::StopCapture => self.recognizer.stop(),
            Effect::SendCommand(text) => {
                let client = Arc::clone(&self.client);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match client.process_command(&text).await {
                        Ok(response) => Event::ResponseReceived(response),
                        Err(e) => Event::RequestFailed(e),
                    };
                    let _ = events.send(event);
                });
            }
            Effect::PlayAudio(audio_ref) => {
                let url = self.client.audio_url(&audio_ref);
                self.player.play(&url, PlaybackSink::new(self.events_tx.clone()));
            }
            Effect::CheckHealth => {
                let client = Arc::clone(&self.client);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let connected = client.health_check().await.is_ok();
                    let _ = events.send(Event::HealthChecked(connected));
                });
            }
            Effect::StatusChanged(status) => self.view.status_changed(status),
            Effect::MessageAppended(message) => self.view.message_appended(&message),
            Effect::ErrorShown(text) => self.view.error_shown(&text),
            Effect::ErrorCleared => self.view.error_cleared(),
            Effect::ConnectivityChanged(connected) => self.view.connectivity_changed(connected),
        }
    }
}
