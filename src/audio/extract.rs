//! Per-segment audio extraction.
//!
//! Each speech segment is re-encoded (never stream-copied) out of the parent
//! WAV into its own canonical-format file, so padded boundaries do not
//! produce artifacts. Extraction failures are soft: the orchestrator skips
//! just the affected segment.

use crate::audio::segment::AudioSegment;
use crate::error::Result;
use crate::tools::ToolRunner;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extracted segment audio whose backing file is deleted exactly once when
/// the value is dropped.
#[derive(Debug)]
pub struct SegmentAudio {
    path: Option<PathBuf>,
}

impl SegmentAudio {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Path of the backing WAV file. Valid until the value is dropped.
    pub fn path(&self) -> &Path {
        // The Option is only None after Drop has run.
        self.path.as_deref().unwrap_or(Path::new(""))
    }
}

impl Drop for SegmentAudio {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = fs::remove_file(&path)
        {
            warn!(path = %path.display(), error = %e, "could not delete segment temp file");
        }
    }
}

/// Extracts bounded audio segments from a parent WAV via external re-encode.
pub struct SegmentExtractor {
    segments_dir: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl SegmentExtractor {
    /// Creates the `_segments` working directory under `temp_dir` if needed.
    pub fn new(temp_dir: &Path, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        let segments_dir = temp_dir.join("_segments");
        if !segments_dir.exists() {
            fs::create_dir_all(&segments_dir)?;
        }
        Ok(Self {
            segments_dir,
            runner,
        })
    }

    /// Extract one segment from `[start, end]` of the parent file.
    ///
    /// Returns `None` (and logs) for non-positive-length segments, tool
    /// failures, and missing/empty outputs — the caller skips the segment
    /// and continues.
    pub async fn extract(
        &self,
        parent_wav: &Path,
        segment: &AudioSegment,
        index: usize,
        total: usize,
    ) -> Option<SegmentAudio> {
        if segment.duration_secs() <= 0.0 {
            warn!(
                index = index + 1,
                segment = %segment,
                "segment has zero or negative duration, skipping extraction"
            );
            return None;
        }

        let parent_stem = parent_wav
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let file_name = format!(
            "{}_segment_{:04}_of_{:04}.wav",
            parent_stem,
            index + 1,
            total
        );
        let output_path = self.segments_dir.join(file_name);

        // Segments are not user-facing artifacts; stale files are replaced.
        if output_path.exists()
            && let Err(e) = fs::remove_file(&output_path)
        {
            warn!(path = %output_path.display(), error = %e, "could not delete stale segment file");
        }

        debug!(
            index = index + 1,
            total,
            segment = %segment,
            output = %output_path.display(),
            "extracting segment"
        );

        let args = vec![
            "-i".to_string(),
            parent_wav.to_string_lossy().into_owned(),
            "-ss".to_string(),
            format!("{}", segment.start_secs),
            "-to".to_string(),
            format!("{}", segment.end_secs),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-sample_fmt".to_string(),
            "s16".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        let outcome = match self.runner.run("ffmpeg", &args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(index = index + 1, error = %e, "segment extraction process failed to run");
                return None;
            }
        };

        let produced_output = output_path
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        if !outcome.success() || !produced_output {
            warn!(
                index = index + 1,
                status = outcome.status,
                parent = %parent_wav.display(),
                segment = %segment,
                stderr = %outcome.stderr.trim(),
                "segment extraction failed or produced an empty file, skipping"
            );
            return None;
        }

        debug!(index = index + 1, "segment extracted");
        Some(SegmentAudio::new(output_path))
    }
}
