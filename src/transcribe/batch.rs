//! Batch transcription of recorded audio files.
//!
//! Per file: convert to canonical PCM, detect speech segments, extract and
//! recognize each segment in order, write per-segment and full transcripts.
//! One bad segment never aborts a file; one bad file never aborts the batch.

use crate::audio::convert::AudioConverter;
use crate::audio::extract::SegmentExtractor;
use crate::audio::segment::VadParameters;
use crate::audio::vad::SilenceDetector;
use crate::audio::wav;
use crate::config::Config;
use crate::error::{Result, ScribaError};
use crate::stt::SpeechEngine;
use crate::tools::ToolRunner;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to do when the output transcript already exists.
pub enum OverwritePolicy {
    /// Replace the existing transcript without asking.
    Overwrite,
    /// Skip the file.
    Skip,
    /// Ask the caller; `true` means overwrite.
    Prompt(Box<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl OverwritePolicy {
    fn allows(&self, existing: &Path) -> bool {
        match self {
            OverwritePolicy::Overwrite => true,
            OverwritePolicy::Skip => false,
            OverwritePolicy::Prompt(ask) => ask(existing),
        }
    }
}

/// Terminal state of one file's transcription.
#[derive(Debug, PartialEq)]
pub enum BatchOutcome {
    /// Transcript written.
    Completed { transcript_path: PathBuf },
    /// Output already existed and overwrite was declined. Not an error.
    SkippedExisting,
    /// No speech detected; an empty transcript was written.
    NoSpeech { transcript_path: PathBuf },
}

/// Orchestrates the per-file batch pipeline.
pub struct BatchTranscriber {
    runner: Arc<dyn ToolRunner>,
    converter: Arc<dyn AudioConverter>,
    engine: Arc<dyn SpeechEngine>,
    config: Config,
    overwrite: OverwritePolicy,
}

impl BatchTranscriber {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        converter: Arc<dyn AudioConverter>,
        engine: Arc<dyn SpeechEngine>,
        config: Config,
        overwrite: OverwritePolicy,
    ) -> Self {
        Self {
            runner,
            converter,
            engine,
            config,
            overwrite,
        }
    }

    /// Transcribe every file in order. A failed file is logged and the batch
    /// continues; returns the number of files that completed.
    pub async fn transcribe_all(&self, files: &[PathBuf]) -> usize {
        let mut completed = 0;
        for file in files {
            match self.transcribe_file(file).await {
                Ok(BatchOutcome::SkippedExisting) => {
                    info!(file = %file.display(), "skipped, transcript already exists");
                }
                Ok(_) => completed += 1,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "transcription failed, continuing with next file");
                }
            }
        }
        completed
    }

    /// Run the full pipeline for one source file.
    pub async fn transcribe_file(&self, file: &Path) -> Result<BatchOutcome> {
        let output_dir = &self.config.directories.output;
        let temp_dir = &self.config.directories.temp;
        fs::create_dir_all(output_dir)?;
        fs::create_dir_all(temp_dir)?;

        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let model = self.engine.model_name();
        let base = format!("{}_{}", stem, model);
        let transcript_path = output_dir.join(format!("{}.txt", base));

        if transcript_path.exists() && !self.overwrite.allows(&transcript_path) {
            return Ok(BatchOutcome::SkippedExisting);
        }

        info!(file = %file.display(), model, "transcribing");
        let started = Instant::now();

        let temp_wav = temp_dir.join(format!("{}.wav", stem));
        let result = self.run_pipeline(file, &temp_wav, &transcript_path, &base, started).await;

        // The whole-file PCM artifact is intermediate; segment temp files
        // are self-deleting and the segment plan is intentionally retained.
        if temp_wav.exists()
            && let Err(e) = fs::remove_file(&temp_wav)
        {
            warn!(path = %temp_wav.display(), error = %e, "could not delete temp WAV");
        }

        result
    }

    async fn run_pipeline(
        &self,
        file: &Path,
        temp_wav: &Path,
        transcript_path: &Path,
        base: &str,
        started: Instant,
    ) -> Result<BatchOutcome> {
        self.converter.to_wav(file, temp_wav).await?;
        if !temp_wav.exists() {
            return Err(ScribaError::Conversion {
                path: file.to_string_lossy().into_owned(),
                message: "converter reported success but produced no output".to_string(),
            });
        }

        let params = VadParameters::from(&self.config.vad);
        let detector = SilenceDetector::new(&*self.runner);
        let segments = detector.detect_speech_segments(temp_wav, &params).await?;

        // Side artifact for inspection; persisting it is best-effort.
        let plan_path = self
            .config
            .directories
            .output
            .join(format!("{}.segments.json", base));
        match serde_json::to_string_pretty(&segments) {
            Ok(json) => {
                if let Err(e) = fs::write(&plan_path, json) {
                    warn!(path = %plan_path.display(), error = %e, "could not persist segment plan");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize segment plan"),
        }

        if segments.is_empty() {
            fs::write(transcript_path, "")?;
            info!(file = %file.display(), "no speech detected, wrote empty transcript");
            return Ok(BatchOutcome::NoSpeech {
                transcript_path: transcript_path.to_path_buf(),
            });
        }

        let extractor =
            SegmentExtractor::new(&self.config.directories.temp, Arc::clone(&self.runner))?;
        // Batch runs have no mid-file cancellation; the flag stays unset.
        let cancel = Arc::new(AtomicBool::new(false));
        let total = segments.len();
        let mut full_transcript = String::new();
        let mut speech_secs = 0.0_f64;

        for (index, segment) in segments.iter().enumerate() {
            if self.config.toggles.diagnostic {
                debug!(index = index + 1, total, segment = %segment, "processing segment");
            }

            let Some(audio) = extractor.extract(temp_wav, segment, index, total).await else {
                warn!(index = index + 1, "segment unavailable, skipping");
                continue;
            };

            let samples = match wav::read_samples_f32(audio.path()) {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(index = index + 1, error = %e, "could not read segment audio, skipping");
                    continue;
                }
            };

            let pieces = match self.engine.transcribe(&samples, &cancel) {
                Ok(pieces) => pieces,
                Err(e) => {
                    warn!(index = index + 1, error = %e, "segment recognition failed, skipping");
                    continue;
                }
            };
            speech_secs += segment.duration_secs();

            let segment_file = self
                .config
                .directories
                .output
                .join(format!("{}_segment-{:04}.txt", base, index + 1));
            let mut first_piece = true;
            for piece in &pieces {
                if piece.text.trim().is_empty() {
                    continue;
                }
                full_transcript.push_str(&piece.text);
                if let Err(e) =
                    append_piece(&segment_file, piece.text.trim(), first_piece)
                {
                    warn!(path = %segment_file.display(), error = %e, "could not write per-segment transcript");
                }
                first_piece = false;
            }
        }

        let trimmed = full_transcript.trim();
        fs::write(transcript_path, trimmed)?;

        let elapsed = started.elapsed().as_secs_f64();
        if speech_secs > 0.0 {
            info!(
                elapsed_secs = format!("{:.1}", elapsed),
                speech_secs = format!("{:.1}", speech_secs),
                speed_ratio = format!("{:.2}x", speech_secs / elapsed),
                "file complete"
            );
        } else {
            info!(elapsed_secs = format!("{:.1}", elapsed), "file complete");
        }

        Ok(BatchOutcome::Completed {
            transcript_path: transcript_path.to_path_buf(),
        })
    }
}

fn append_piece(path: &Path, text: &str, truncate: bool) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(truncate)
        .append(!truncate)
        .open(path)?;
    writeln!(file, "{}", text)
}

/// Find batch input recordings (`*.mp3`) in a directory, sorted by name.
pub fn find_recordings(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_mp3 = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        if path.is_file() && is_mp3 {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recordings_scan_picks_mp3_only_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        fs::write(dir.path().join("a.MP3"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let files = find_recordings(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.MP3", "b.mp3"]);
    }

    #[test]
    fn recordings_scan_missing_dir_is_io_error() {
        assert!(matches!(
            find_recordings(Path::new("/nonexistent/recordings")),
            Err(ScribaError::Io(_))
        ));
    }

    #[test]
    fn overwrite_policy_prompt_consults_callback() {
        let accept = OverwritePolicy::Prompt(Box::new(|_| true));
        let decline = OverwritePolicy::Prompt(Box::new(|_| false));
        assert!(accept.allows(Path::new("t.txt")));
        assert!(!decline.allows(Path::new("t.txt")));

        assert!(OverwritePolicy::Overwrite.allows(Path::new("t.txt")));
        assert!(!OverwritePolicy::Skip.allows(Path::new("t.txt")));
    }

    #[test]
    fn piece_writes_truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.txt");
        fs::write(&path, "stale\n").unwrap();

        append_piece(&path, "first", true).unwrap();
        append_piece(&path, "second", false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
