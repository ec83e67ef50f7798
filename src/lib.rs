//! scriba - Offline and live speech-to-text transcription
//!
//! Coordinates external audio tools (ffmpeg, ffprobe, arecord/parec) and a
//! Whisper recognition engine into a batch file pipeline and a live
//! capture loop.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod capture;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod stt;
pub mod tools;
pub mod transcribe;

// Core seams (external tools → audio pipeline → recognition)
pub use capture::{AudioInputDevice, CaptureBackend, CaptureFormat};
pub use stt::{SpeechEngine, TimedText};
pub use tools::{ProcessToolRunner, ToolOutput, ToolRunner};

// Orchestrators
pub use transcribe::{BatchOutcome, BatchTranscriber, LiveTranscriber, OverwritePolicy};

// Error handling
pub use error::{Result, ScribaError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(ver.contains('+'));
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
