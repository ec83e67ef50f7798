//! Live capture-chunk-transcribe loop.
//!
//! A capture backend pushes raw PCM chunks over a channel; a ~100ms polling
//! loop drains them into an accumulation buffer and feeds the recognizer a
//! fixed-duration chunk whenever the byte threshold is reached.

use crate::capture::{AudioInputDevice, CaptureBackend, CaptureFormat};
use crate::config::Toggles;
use crate::defaults;
use crate::error::Result;
use crate::stt::SpeechEngine;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chooses a capture device when more than one is available.
///
/// Keeps UI concerns (console menu, GUI picker) out of the loop itself.
#[async_trait]
pub trait DeviceSelector: Send + Sync {
    /// `None` aborts the session without starting capture.
    async fn select(&self, devices: &[AudioInputDevice]) -> Option<AudioInputDevice>;
}

/// Selector that always takes the first device. Useful for headless runs
/// and tests.
pub struct FirstDeviceSelector;

#[async_trait]
impl DeviceSelector for FirstDeviceSelector {
    async fn select(&self, devices: &[AudioInputDevice]) -> Option<AudioInputDevice> {
        devices.first().cloned()
    }
}

/// Session settings for the live loop.
#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Where to persist the session transcript; `None` disables persistence.
    pub output_dir: Option<PathBuf>,
    /// Model identifier used in the transcript file name.
    pub model_name: String,
    /// Audio duration per recognition chunk.
    pub chunk_secs: f32,
    pub toggles: Toggles,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            model_name: "unknown".to_string(),
            chunk_secs: defaults::CHUNK_SECONDS,
            toggles: Toggles::default(),
        }
    }
}

/// Runs a live transcription session over a capture backend.
pub struct LiveTranscriber<E: SpeechEngine> {
    engine: E,
    options: LiveOptions,
}

impl<E: SpeechEngine> LiveTranscriber<E> {
    pub fn new(engine: E, options: LiveOptions) -> Self {
        Self { engine, options }
    }

    /// Run the session until `cancel` is set or capture ends.
    ///
    /// Returns the transcript file path if one was written. Zero available
    /// devices is a non-fatal early return of `Ok(None)`.
    pub async fn run(
        &self,
        backend: &mut dyn CaptureBackend,
        selector: &dyn DeviceSelector,
        on_segment: &(dyn Fn(&str) + Send + Sync),
        cancel: Arc<AtomicBool>,
    ) -> Result<Option<PathBuf>> {
        let devices = backend.list_devices().await;
        if devices.is_empty() {
            warn!("no capture devices available");
            return Ok(None);
        }

        let device = if devices.len() == 1 {
            devices[0].clone()
        } else {
            match selector.select(&devices).await {
                Some(device) => device,
                None => {
                    info!("no device selected, session aborted");
                    return Ok(None);
                }
            }
        };
        info!(device = %device.name, "starting live transcription");

        let (tx, rx) = crossbeam_channel::unbounded::<Vec<u8>>();
        if let Err(e) = backend
            .start_capture(&device.id, CaptureFormat::CANONICAL, tx)
            .await
        {
            backend.stop_capture().await;
            return Err(e);
        }

        let transcript = self.poll_loop(&rx, on_segment, &cancel).await;

        // Exactly one stop on every exit path.
        backend.stop_capture().await;

        if transcript.trim().is_empty() {
            return Ok(None);
        }
        let Some(output_dir) = &self.options.output_dir else {
            return Ok(None);
        };

        std::fs::create_dir_all(output_dir)?;
        let file_name = format!(
            "LiveTranscript_{}_{}.txt",
            chrono::Local::now().format("%Y%m%d%H%M%S"),
            self.options.model_name
        );
        let path = output_dir.join(file_name);
        std::fs::write(&path, transcript.trim())?;
        info!(path = %path.display(), "live transcript saved");
        Ok(Some(path))
    }

    async fn poll_loop(
        &self,
        rx: &crossbeam_channel::Receiver<Vec<u8>>,
        on_segment: &(dyn Fn(&str) + Send + Sync),
        cancel: &Arc<AtomicBool>,
    ) -> String {
        let threshold = defaults::chunk_threshold_bytes(self.options.chunk_secs);
        let tick = Duration::from_millis(defaults::POLL_INTERVAL_MS);
        let mut buffer: Vec<u8> = Vec::new();
        let mut transcript = String::new();

        while !cancel.load(Ordering::Relaxed) {
            while let Ok(chunk) = rx.try_recv() {
                if self.options.toggles.log_audio_data {
                    debug!(bytes = chunk.len(), "audio data received");
                }
                buffer.extend_from_slice(&chunk);
            }

            if buffer.len() > threshold * 8 {
                warn!(
                    buffered = buffer.len(),
                    threshold, "recognition is falling behind capture"
                );
            }

            if buffer.len() >= threshold {
                let bytes = std::mem::take(&mut buffer);
                if self.options.toggles.log_chunk_processing {
                    debug!(bytes = bytes.len(), "processing chunk");
                }
                let samples = crate::audio::wav::pcm_bytes_to_f32(&bytes);

                match self.engine.transcribe(&samples, cancel) {
                    Ok(pieces) => {
                        for piece in pieces {
                            if piece.text.trim().is_empty() {
                                continue;
                            }
                            transcript.push_str(&piece.text);
                            on_segment(&piece.text);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "chunk recognition failed, continuing");
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(tick) => {}
                _ = wait_for_cancel(cancel) => break,
            }
        }

        transcript
    }
}

// Lets cancellation interrupt the tick sleep instead of waiting it out.
async fn wait_for_cancel(cancel: &AtomicBool) {
    while !cancel.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
