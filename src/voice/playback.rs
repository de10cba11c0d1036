//! Audio reply playback
//!
//! [`AudioPlayer`] is the playback adapter contract. [`SpeakerPlayer`]
//! downloads the reply, decodes MP3 and plays it on the default output
//! device. At most one playback is active; a new one stops the previous.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, SupportedStreamConfigRange};
use tokio::sync::mpsc::UnboundedSender;

use crate::conversation::Event;
use crate::{Error, Result};

/// Reporting handle for one playback
///
/// Consumed by exactly one of [`PlaybackSink::finished`] or
/// [`PlaybackSink::failed`]; dropping it reports nothing (stopped).
pub struct PlaybackSink {
    events: UnboundedSender<Event>,
}

impl PlaybackSink {
    #[must_use]
    pub const fn new(events: UnboundedSender<Event>) -> Self {
        Self { events }
    }

    /// Playback ran to completion
    pub fn finished(self) {
        self.send(Event::PlaybackEnded);
    }

    /// Playback could not start or decode
    pub fn failed(self, reason: impl Into<String>) {
        self.send(Event::PlaybackFailed(reason.into()));
    }

    fn send(self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("conversation gone, playback event dropped");
        }
    }
}

/// Playback adapter
pub trait AudioPlayer: Send {
    /// Play the audio at `url`, stopping any active playback first
    fn play(&mut self, url: &str, sink: PlaybackSink);

    /// Stop the active playback; a no-op when idle
    fn stop(&mut self);
}

/// Plays replies on the default output device
pub struct SpeakerPlayer {
    client: reqwest::Client,
    active: Option<Arc<AtomicBool>>,
}

impl SpeakerPlayer {
    /// Probe for an output device
    #[must_use]
    pub fn probe(timeout: Duration) -> Option<Self> {
        if cpal::default_host().default_output_device().is_none() {
            tracing::warn!("no output device, audio replies cannot be played");
            return None;
        }

        match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => Some(Self::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build audio HTTP client");
                None
            }
        }
    }

    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            active: None,
        }
    }
}

impl AudioPlayer for SpeakerPlayer {
    fn play(&mut self, url: &str, sink: PlaybackSink) {
        self.stop();

        let stop = Arc::new(AtomicBool::new(false));
        self.active = Some(Arc::clone(&stop));

        let client = self.client.clone();
        let url = url.to_string();

        tokio::spawn(async move {
            tracing::info!(%url, "playing audio reply");

            let bytes = match fetch_audio(&client, &url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    if !stop.load(Ordering::SeqCst) {
                        sink.failed(e.to_string());
                    }
                    return;
                }
            };

            if stop.load(Ordering::SeqCst) {
                return;
            }

            let stopped = Arc::clone(&stop);
            let outcome = tokio::task::spawn_blocking(move || {
                let (samples, sample_rate) = decode_mp3(&bytes)?;
                play_samples_blocking(samples, sample_rate, &stop)
            })
            .await;

            if stopped.load(Ordering::SeqCst) {
                tracing::debug!("playback stopped");
                return;
            }

            match outcome {
                Ok(Ok(true)) => sink.finished(),
                Ok(Ok(false)) => tracing::debug!("playback stopped"),
                Ok(Err(e)) => sink.failed(e.to_string()),
                Err(e) => sink.failed(format!("playback task failed: {e}")),
            }
        });
    }

    fn stop(&mut self) {
        if let Some(stop) = self.active.take() {
            stop.store(true, Ordering::SeqCst);
            tracing::debug!("playback stop requested");
        }
    }
}

/// Player used when no output device exists; every play fails
#[derive(Debug, Default)]
pub struct UnavailablePlayer;

impl AudioPlayer for UnavailablePlayer {
    fn play(&mut self, url: &str, sink: PlaybackSink) {
        tracing::debug!(%url, "no output device, playback skipped");
        sink.failed("no output device available");
    }

    fn stop(&mut self) {}
}

/// Player used when audio replies are switched off; every play completes
#[derive(Debug, Default)]
pub struct MutedPlayer;

impl AudioPlayer for MutedPlayer {
    fn play(&mut self, url: &str, sink: PlaybackSink) {
        tracing::debug!(%url, "audio muted, playback skipped");
        sink.finished();
    }

    fn stop(&mut self) {}
}

/// Download reply audio
async fn fetch_audio(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await.map_err(|e| {
        tracing::error!(error = %e, "audio download failed");
        Error::Playback(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(status = %status, %url, "audio download error");
        return Err(Error::Playback(format!("audio download failed: {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Playback(e.to_string()))?;
    tracing::debug!(bytes = bytes.len(), "audio downloaded");
    Ok(bytes.to_vec())
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns [`Error::Playback`] if the data holds no decodable frames
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();

                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => {}
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Playback("no audio frames in reply".to_string()));
    }

    Ok((samples, sample_rate))
}

fn supports_rate(range: &SupportedStreamConfigRange, channels: u16, rate: u32) -> bool {
    range.channels() == channels
        && range.min_sample_rate() <= SampleRate(rate)
        && range.max_sample_rate() >= SampleRate(rate)
}

/// Play samples until done or `stop` is set
///
/// Returns `Ok(true)` on natural completion and `Ok(false)` when stopped.
fn play_samples_blocking(samples: Vec<f32>, sample_rate: u32, stop: &AtomicBool) -> Result<bool> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| supports_rate(c, 1, sample_rate))
        .or_else(|| {
            // Fallback: stereo
            device
                .supported_output_configs()
                .ok()?
                .find(|c| supports_rate(c, 2, sample_rate))
        })
        .ok_or_else(|| Error::Playback(format!("no output config for {sample_rate} Hz")))?;

    let config = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = usize::from(config.channels);
    let sample_count = samples.len();

    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(Mutex::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);

        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if pos < samples.len() {
                            pos += 1;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                    if pos >= samples.len() {
                        if let Ok(mut done) = finished.lock() {
                            *done = true;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Playback(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate);
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);

    loop {
        if stop.load(Ordering::SeqCst) {
            drop(stream);
            return Ok(false);
        }
        if finished.lock().map(|done| *done).unwrap_or(true) || start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);

    tracing::debug!(samples = sample_count, "playback complete");
    Ok(!stop.load(Ordering::SeqCst))
}
