//! Live audio capture from external recording tools.
//!
//! Capture runs an external process (`arecord` or `parec`) emitting raw PCM
//! on stdout and forwards byte chunks over a channel to a single consumer.

pub mod arecord;
pub mod pulse;

pub use arecord::ArecordBackend;
pub use pulse::PulseBackend;

use crate::error::Result;
use async_trait::async_trait;
use std::fs;
use tracing::info;

/// An audio input device as reported by the platform recording tool.
#[derive(Debug, Clone, Eq)]
pub struct AudioInputDevice {
    /// Tool-specific identifier, e.g. `hw:1,0` or a PulseAudio source name.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
}

impl PartialEq for AudioInputDevice {
    fn eq(&self, other: &Self) -> bool {
        // Identity is the capture id; display names vary by tool verbosity.
        self.id == other.id
    }
}

/// PCM format of a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl CaptureFormat {
    /// The only format the recognition pipeline accepts.
    pub const CANONICAL: CaptureFormat = CaptureFormat {
        sample_rate: crate::defaults::SAMPLE_RATE,
        bits_per_sample: 16,
        channels: 1,
    };

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * (self.bits_per_sample as usize / 8) * self.channels as usize
    }
}

/// A source of live PCM audio backed by an external recording process.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Enumerate available input devices. Tool failures yield an empty list.
    async fn list_devices(&self) -> Vec<AudioInputDevice>;

    /// Start capturing from `device_id`, pushing raw PCM byte chunks into
    /// `tx` until the stream ends or `stop_capture` is called.
    ///
    /// # Errors
    /// `ScribaError::AlreadyCapturing` if a capture is in progress,
    /// `ScribaError::UnsupportedFormat` for non-canonical formats,
    /// `ScribaError::Capture` if the recording process cannot be started.
    async fn start_capture(
        &mut self,
        device_id: &str,
        format: CaptureFormat,
        tx: crossbeam_channel::Sender<Vec<u8>>,
    ) -> Result<()>;

    /// Stop the capture process. Idempotent.
    async fn stop_capture(&mut self);

    /// Format of the active capture, if one is running.
    fn current_format(&self) -> Option<CaptureFormat>;
}

/// True when running inside Windows Subsystem for Linux, where ALSA has no
/// real devices and audio goes through PulseAudio.
pub fn is_wsl() -> bool {
    for var in ["WSL_DISTRO_NAME", "WSL_INTEROP", "WSLENV"] {
        if std::env::var_os(var).is_some() {
            return true;
        }
    }
    if let Ok(version) = fs::read_to_string("/proc/version") {
        let version = version.to_lowercase();
        return version.contains("microsoft") || version.contains("wsl");
    }
    false
}

/// Pick the capture backend appropriate for this host.
pub fn select_backend() -> Box<dyn CaptureBackend> {
    if is_wsl() {
        info!("WSL detected, capturing through PulseAudio");
        Box::new(PulseBackend::new())
    } else {
        Box::new(ArecordBackend::new())
    }
}
