//! WAV reading and PCM sample conversion helpers.

use crate::error::{Result, ScribaError};
use std::path::Path;

/// Read a canonical-format WAV file into normalized f32 samples.
///
/// The recognition engine expects samples in `[-1.0, 1.0]`.
pub fn read_samples_f32(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| ScribaError::Recognition {
        message: format!("failed to open WAV {}: {}", path.display(), e),
    })?;

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ScribaError::Recognition {
            message: format!("failed to read WAV samples from {}: {}", path.display(), e),
        })?;

    Ok(i16_to_f32(&samples))
}

/// Convert i16 PCM samples to f32 normalized to `[-1.0, 1.0]`.
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

/// Convert raw 16-bit little-endian PCM bytes to normalized f32 samples.
///
/// A trailing odd byte (torn sample from a partial read) is dropped.
pub fn pcm_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            sample as f32 / 32768.0
        })
        .collect()
}
