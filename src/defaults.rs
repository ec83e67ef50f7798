//! Default configuration constants for scriba.
//!
//! Shared constants used across the batch and live pipelines to keep the
//! canonical recognition format in one place.

/// Canonical audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and is the only rate the
/// recognition engine accepts.
pub const SAMPLE_RATE: u32 = 16000;

/// Bytes per sample for 16-bit PCM.
pub const BYTES_PER_SAMPLE: u32 = 2;

/// Channel count for the canonical recognition format (mono).
pub const CHANNELS: u32 = 1;

/// Duration of live audio accumulated before a chunk is sent to the engine.
pub const CHUNK_SECONDS: f32 = 2.0;

/// Poll interval of the live capture loop in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Default noise floor for silence detection, as an ffmpeg amplitude/dB value.
pub const NOISE_FLOOR_DB: &str = "-30dB";

/// Default minimum silence duration in seconds before a gap counts as silence.
pub const MIN_SILENCE_SECS: f64 = 0.8;

/// Default minimum speech segment duration in seconds. Shorter candidate
/// segments are dropped.
pub const MIN_SPEECH_SECS: f64 = 0.3;

/// Default padding in seconds applied symmetrically to each speech segment.
pub const PADDING_SECS: f64 = 0.15;

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Number of bytes of canonical-format audio that trigger a live chunk.
///
/// `sample_rate * bytes_per_sample * channels * chunk_seconds`.
pub fn chunk_threshold_bytes(chunk_secs: f32) -> usize {
    (SAMPLE_RATE as f32 * BYTES_PER_SAMPLE as f32 * CHANNELS as f32 * chunk_secs) as usize
}

/// Report the GPU backend compiled into this build.
///
/// Only one GPU backend can be active at a time; if none is enabled, returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_threshold_matches_two_seconds_of_canonical_audio() {
        // 16000 samples/s * 2 bytes * 1 channel * 2.0s
        assert_eq!(chunk_threshold_bytes(2.0), 64000);
    }

    #[test]
    fn chunk_threshold_scales_with_duration() {
        assert_eq!(chunk_threshold_bytes(0.5), 16000);
        assert_eq!(chunk_threshold_bytes(1.0), 32000);
    }

    #[test]
    fn gpu_backend_matches_compiled_feature() {
        let expected = if cfg!(feature = "cuda") {
            "CUDA"
        } else if cfg!(feature = "vulkan") {
            "Vulkan"
        } else {
            "CPU"
        };
        assert_eq!(gpu_backend(), expected);
    }
}
