//! Conversion of arbitrary source audio to the canonical recognition format.

use crate::error::{Result, ScribaError};
use crate::tools::ToolRunner;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Converts a source audio file to canonical 16kHz/16-bit/mono PCM WAV.
#[async_trait]
pub trait AudioConverter: Send + Sync {
    async fn to_wav(&self, input: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg-based converter (assumes ffmpeg is on PATH).
pub struct FfmpegConverter {
    runner: Arc<dyn ToolRunner>,
}

impl FfmpegConverter {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        // -y overwrites the target, pcm_s16le/-ar 16000/-ac 1 is the canonical
        // format the recognition engine accepts.
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        debug!(input = %input.display(), output = %output.display(), "converting to canonical WAV");

        let result = self.runner.run("ffmpeg", &args).await.map_err(|e| {
            ScribaError::Conversion {
                path: input.to_string_lossy().into_owned(),
                message: e.to_string(),
            }
        })?;

        if !result.success() {
            return Err(ScribaError::Conversion {
                path: input.to_string_lossy().into_owned(),
                message: format!(
                    "ffmpeg exited with code {}: {}",
                    result.status,
                    result.stderr.trim()
                ),
            });
        }

        info!(input = %input.display(), "conversion to WAV complete");
        Ok(())
    }
}

/// Test converter that copies or fabricates the output file.
pub struct MockConverter {
    should_fail: bool,
    write_output: bool,
}

impl MockConverter {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            write_output: true,
        }
    }

    /// Fail every conversion.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Succeed but leave no output file behind (simulates a silently broken tool).
    pub fn without_output(mut self) -> Self {
        self.write_output = false;
        self
    }
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioConverter for MockConverter {
    async fn to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        if self.should_fail {
            return Err(ScribaError::Conversion {
                path: input.to_string_lossy().into_owned(),
                message: "mock conversion failure".to_string(),
            });
        }
        if self.write_output {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: crate::defaults::SAMPLE_RATE,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer =
                hound::WavWriter::create(output, spec).map_err(|e| ScribaError::Conversion {
                    path: output.to_string_lossy().into_owned(),
                    message: e.to_string(),
                })?;
            // One second of silence keeps downstream readers happy.
            for _ in 0..crate::defaults::SAMPLE_RATE {
                writer
                    .write_sample(0i16)
                    .map_err(|e| ScribaError::Conversion {
                        path: output.to_string_lossy().into_owned(),
                        message: e.to_string(),
                    })?;
            }
            writer.finalize().map_err(|e| ScribaError::Conversion {
                path: output.to_string_lossy().into_owned(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolRunner;
    use std::path::PathBuf;

    #[tokio::test]
    async fn ffmpeg_converter_builds_canonical_arguments() {
        let runner = Arc::new(MockToolRunner::new());
        runner.push_output(0, "", "");

        let converter = FfmpegConverter::new(runner.clone());
        converter
            .to_wav(&PathBuf::from("in.mp3"), &PathBuf::from("out.wav"))
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].0, "ffmpeg");
        let args = &calls[0].1;
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert!(args.contains(&"16000".to_string()));
        assert!(args.contains(&"out.wav".to_string()));
    }

    #[tokio::test]
    async fn nonzero_exit_becomes_conversion_error() {
        let runner = Arc::new(MockToolRunner::new());
        runner.push_output(1, "", "unsupported codec");

        let converter = FfmpegConverter::new(runner);
        let err = converter
            .to_wav(&PathBuf::from("in.mp3"), &PathBuf::from("out.wav"))
            .await
            .unwrap_err();
        match err {
            ScribaError::Conversion { path, message } => {
                assert_eq!(path, "in.mp3");
                assert!(message.contains("unsupported codec"));
            }
            other => panic!("expected Conversion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn launch_failure_becomes_conversion_error() {
        let runner = Arc::new(MockToolRunner::new());
        runner.push_launch_failure("ffmpeg");

        let converter = FfmpegConverter::new(runner);
        let err = converter
            .to_wav(&PathBuf::from("in.mp3"), &PathBuf::from("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribaError::Conversion { .. }));
    }

    #[tokio::test]
    async fn mock_converter_writes_readable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("converted.wav");

        MockConverter::new()
            .to_wav(&PathBuf::from("in.mp3"), &out)
            .await
            .unwrap();

        let samples = crate::audio::wav::read_samples_f32(&out).unwrap();
        assert_eq!(samples.len(), 16000);
    }
}
