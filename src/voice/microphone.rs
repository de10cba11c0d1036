//! Native speech recognizer: microphone + endpointing + cloud STT
//!
//! Recording runs on a dedicated thread because the capture stream must
//! stay on the thread that created it. The finished utterance is handed to
//! the async runtime for transcription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self as std_mpsc, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::Handle;

use super::capture::{self, AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::{EndpointConfig, EndpointDetector, EndpointState};
use super::recognizer::{CaptureErrorKind, CaptureSink, SpeechRecognizer};
use super::stt::SpeechToText;
use crate::config::Config;
use crate::{Error, Result};

/// How often the recording thread drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Control flags shared with a running session
struct ActiveSession {
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

/// Speech recognizer backed by the default microphone
pub struct MicrophoneRecognizer {
    stt: Arc<SpeechToText>,
    endpoint: EndpointConfig,
    active: Option<ActiveSession>,
    /// Thread of the most recent session, joined before the next one
    /// opens the input device
    last_thread: Option<JoinHandle<()>>,
}

impl MicrophoneRecognizer {
    /// Probe the host for recognition support
    ///
    /// Returns `None` when voice input is disabled, no input device exists,
    /// or no STT key is configured.
    #[must_use]
    pub fn probe(config: &Config) -> Option<Self> {
        if !config.voice.enabled {
            tracing::info!("voice input disabled");
            return None;
        }

        if !capture::input_available() {
            tracing::warn!("no input device, speech recognition unavailable");
            return None;
        }

        let Some(api_key) = config.api_keys.for_provider(config.voice.stt_provider) else {
            tracing::warn!(
                provider = %config.voice.stt_provider,
                "no STT API key configured, speech recognition unavailable"
            );
            return None;
        };

        match SpeechToText::new(
            config.voice.stt_provider,
            api_key.to_string(),
            config.voice.stt_model.clone(),
            &config.voice.language,
        ) {
            Ok(stt) => Some(Self::new(stt, config.voice.endpoint())),
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition unavailable");
                None
            }
        }
    }

    #[must_use]
    pub fn new(stt: SpeechToText, endpoint: EndpointConfig) -> Self {
        Self {
            stt: Arc::new(stt),
            endpoint,
            active: None,
            last_thread: None,
        }
    }
}

impl SpeechRecognizer for MicrophoneRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_listening(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst))
    }

    fn start(&mut self, mut sink: CaptureSink) {
        if self.is_listening() {
            tracing::debug!("already listening, start ignored");
            sink.discard();
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("speech recognition needs a tokio runtime");
            sink.error(CaptureErrorKind::Other);
            return;
        };

        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        self.active = Some(ActiveSession {
            stop: Arc::clone(&stop),
            running: Arc::clone(&running),
        });

        let stt = Arc::clone(&self.stt);
        let endpoint = self.endpoint;
        let session = sink.session().get();

        self.last_thread = launch(self.last_thread.take(), sink, move |mut sink| {
            let _guard = RunningGuard(Arc::clone(&running));
            tracing::debug!(session, "capture session started");

            match record_utterance(endpoint, &stop) {
                Ok(Some(samples)) => {
                    runtime.block_on(transcribe(&stt, &samples, &stop, &mut sink));
                }
                Ok(None) => tracing::debug!(session, "capture session stopped"),
                Err(e) => {
                    tracing::warn!(session, error = %e, "capture session failed");
                    sink.error(CaptureErrorKind::from(&e));
                }
            }
        });

        if self.last_thread.is_none() {
            self.active = None;
        }
    }

    fn stop(&mut self) {
        if let Some(session) = self.active.take() {
            session.stop.store(true, Ordering::SeqCst);
            tracing::debug!("capture stop requested");
        }
    }
}

/// Run `session` on a new `mic-capture` thread after `previous` exits
///
/// The sink is handed over only once the thread exists. If the spawn
/// fails the session reports [`CaptureErrorKind::Other`] and ends.
fn launch<F>(
    previous: Option<JoinHandle<()>>,
    sink: CaptureSink,
    session: F,
) -> Option<JoinHandle<()>>
where
    F: FnOnce(CaptureSink) + Send + 'static,
{
    let (sink_tx, sink_rx) = std_mpsc::sync_channel::<CaptureSink>(1);

    let spawned = std::thread::Builder::new()
        .name("mic-capture".to_string())
        .spawn(move || {
            if let Some(previous) = previous {
                if previous.join().is_err() {
                    tracing::warn!("previous capture thread panicked");
                }
            }
            if let Ok(sink) = sink_rx.recv() {
                session(sink);
            }
        });

    hand_off(spawned, &sink_tx, sink)
}

fn hand_off(
    spawned: std::io::Result<JoinHandle<()>>,
    sink_tx: &SyncSender<CaptureSink>,
    mut sink: CaptureSink,
) -> Option<JoinHandle<()>> {
    match spawned {
        Ok(handle) => {
            if let Err(std_mpsc::SendError(mut sink)) = sink_tx.send(sink) {
                tracing::error!("capture thread exited before the session started");
                sink.error(CaptureErrorKind::Other);
            }
            Some(handle)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to spawn capture thread");
            sink.error(CaptureErrorKind::Other);
            None
        }
    }
}

/// Clears the running flag when the session thread exits
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Record until the endpoint detector finishes or `stop` is set
///
/// Returns `Ok(None)` when stopped before the utterance completed.
fn record_utterance(endpoint: EndpointConfig, stop: &AtomicBool) -> Result<Option<Vec<f32>>> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let mut detector = EndpointDetector::new(endpoint);

    loop {
        std::thread::sleep(POLL_INTERVAL);

        if stop.load(Ordering::SeqCst) {
            capture.stop();
            return Ok(None);
        }

        match detector.process(&capture.take_buffer()) {
            EndpointState::Complete => {
                capture.stop();
                return Ok(Some(detector.take_utterance()));
            }
            EndpointState::NoSpeech => {
                capture.stop();
                return Err(Error::NoSpeechDetected);
            }
            EndpointState::Waiting | EndpointState::Speaking => {}
        }
    }
}

/// Transcribe a finished utterance and report it unless stopped meanwhile
async fn transcribe(stt: &SpeechToText, samples: &[f32], stop: &AtomicBool, sink: &mut CaptureSink) {
    let wav = match samples_to_wav(samples, SAMPLE_RATE) {
        Ok(wav) => wav,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode utterance");
            sink.error(CaptureErrorKind::Other);
            return;
        }
    };

    let result = stt.transcribe(&wav).await;

    if stop.load(Ordering::SeqCst) {
        tracing::debug!("capture stopped during transcription, result dropped");
        return;
    }

    match result {
        Ok(transcription) => sink.result(&transcription.text, transcription.confidence),
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed");
            sink.error(CaptureErrorKind::Other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{CaptureSession, Event};
    use tokio::sync::mpsc;

    #[test]
    fn test_failed_spawn_reports_error_then_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (sink_tx, _sink_rx) = std_mpsc::sync_channel(1);
        let sink = CaptureSink::new(CaptureSession::new(3), tx);

        let handle = hand_off(Err(std::io::Error::other("no threads")), &sink_tx, sink);

        assert!(handle.is_none());
        assert!(matches!(
            rx.try_recv(),
            Ok(Event::CaptureFailed {
                kind: CaptureErrorKind::Other,
                ..
            })
        ));
        assert!(matches!(rx.try_recv(), Ok(Event::CaptureEnded { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_next_session_waits_for_previous_thread() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));

        let first = {
            let released = Arc::clone(&released);
            launch(None, CaptureSink::new(CaptureSession::new(1), tx.clone()), move |_sink| {
                std::thread::sleep(Duration::from_millis(200));
                released.store(true, Ordering::SeqCst);
            })
        };

        let observed = Arc::new(AtomicBool::new(false));
        let second = {
            let released = Arc::clone(&released);
            let observed = Arc::clone(&observed);
            launch(first, CaptureSink::new(CaptureSession::new(2), tx), move |_sink| {
                observed.store(released.load(Ordering::SeqCst), Ordering::SeqCst);
            })
        };

        second.unwrap().join().unwrap();
        assert!(observed.load(Ordering::SeqCst));

        let ended: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                Event::CaptureEnded { session } => Some(session.get()),
                _ => None,
            })
            .collect();
        assert_eq!(ended, vec![1, 2]);
    }
}
