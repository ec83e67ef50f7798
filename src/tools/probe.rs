//! Media duration probe backed by ffprobe.

use crate::tools::ToolRunner;
use std::path::Path;
use tracing::warn;

/// Queries the total duration of a media file.
///
/// Failures are never fatal here: the probe logs the cause and reports the
/// duration as unavailable. Callers that cannot proceed without a duration
/// (the silence detector needs one to bound the final segment) turn `None`
/// into their own error.
pub struct DurationProbe<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> DurationProbe<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Total duration of the file in fractional seconds, or `None` if it
    /// could not be determined.
    pub async fn duration_secs(&self, path: &Path) -> Option<f64> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().into_owned(),
        ];

        let output = match self.runner.run("ffprobe", &args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "duration probe failed to run");
                return None;
            }
        };

        if !output.success() {
            warn!(
                path = %path.display(),
                status = output.status,
                stderr = %output.stderr.trim(),
                "ffprobe exited non-zero during duration check"
            );
            return None;
        }

        match output.stdout.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(secs),
            _ => {
                warn!(
                    path = %path.display(),
                    stdout = %output.stdout.trim(),
                    "could not parse duration from ffprobe output"
                );
                None
            }
        }
    }
}
