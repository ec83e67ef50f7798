//! Speech segment data model shared by the detector, extractor and
//! orchestrator.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounded speech time range within a parent audio file, in seconds.
///
/// Segments are immutable once produced by the silence detector; the detector
/// guarantees non-decreasing start order and `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl AudioSegment {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        debug_assert!(end_secs >= start_secs, "segment end before start");
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

impl fmt::Display for AudioSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}s -> {:.3}s ({:.3}s)",
            self.start_secs,
            self.end_secs,
            self.duration_secs()
        )
    }
}

/// Thresholds controlling how silence intervals become speech segments.
#[derive(Debug, Clone, PartialEq)]
pub struct VadParameters {
    /// Noise floor handed to the silence filter, e.g. "-30dB".
    pub noise_floor_db: String,
    /// Minimum silence duration in seconds before a gap is treated as silence.
    pub min_silence_secs: f64,
    /// Minimum padded speech segment duration; shorter candidates are dropped.
    pub min_speech_secs: f64,
    /// Padding applied symmetrically to each speech span, clamped to file bounds.
    pub padding_secs: f64,
}

impl Default for VadParameters {
    fn default() -> Self {
        Self {
            noise_floor_db: defaults::NOISE_FLOOR_DB.to_string(),
            min_silence_secs: defaults::MIN_SILENCE_SECS,
            min_speech_secs: defaults::MIN_SPEECH_SECS,
            padding_secs: defaults::PADDING_SECS,
        }
    }
}

impl From<&crate::config::VadSettings> for VadParameters {
    fn from(settings: &crate::config::VadSettings) -> Self {
        Self {
            noise_floor_db: settings.noise_floor_db.clone(),
            min_silence_secs: settings.min_silence_secs,
            min_speech_secs: settings.min_speech_secs,
            padding_secs: settings.padding_secs,
        }
    }
}
