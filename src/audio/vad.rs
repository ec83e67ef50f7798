//! Silence detection: turns an external silencedetect pass into speech
//! segments.
//!
//! The filter emits `silence_start:` / `silence_end:` timestamps on its
//! diagnostic stream; the span between one silence's end and the next
//! silence's start is a speech candidate. Candidates are padded
//! symmetrically, clamped to file bounds, and dropped when shorter than the
//! minimum speech duration.

use crate::audio::segment::{AudioSegment, VadParameters};
use crate::error::{Result, ScribaError};
use crate::tools::probe::DurationProbe;
use crate::tools::ToolRunner;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

fn silence_point_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"silence_(start|end):\s*(\d+\.?\d*)").unwrap_or_else(|e| {
            // A malformed literal pattern is a programming error.
            panic!("invalid silence point regex: {}", e)
        })
    })
}

/// Derives speech segments from an external silence-detection filter run.
pub struct SilenceDetector<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> SilenceDetector<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Detect speech segments in a canonical-format PCM WAV file.
    ///
    /// Returns segments in non-decreasing start order. An empty result means
    /// no speech was found and is not an error.
    ///
    /// # Errors
    /// - [`ScribaError::ToolExecution`] if the silence filter exits non-zero.
    /// - [`ScribaError::DurationUnavailable`] if the file duration cannot be
    ///   probed; without it the final segment cannot be bounded.
    pub async fn detect_speech_segments(
        &self,
        wav_path: &Path,
        params: &VadParameters,
    ) -> Result<Vec<AudioSegment>> {
        info!(
            file = %wav_path.display(),
            noise = %params.noise_floor_db,
            min_silence = params.min_silence_secs,
            min_speech = params.min_speech_secs,
            padding = params.padding_secs,
            "detecting speech segments"
        );

        let args = vec![
            "-i".to_string(),
            wav_path.to_string_lossy().into_owned(),
            "-af".to_string(),
            format!(
                "silencedetect=noise={}:duration={}",
                params.noise_floor_db, params.min_silence_secs
            ),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ];

        let output = self.runner.run("ffmpeg", &args).await?;
        if !output.success() {
            return Err(ScribaError::ToolExecution {
                tool: "ffmpeg".to_string(),
                message: format!(
                    "silencedetect exited with code {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            });
        }

        // Boundary timestamps arrive on the diagnostic stream, line by line.
        let mut silence_points = parse_silence_points(&output.stderr);
        debug!(count = silence_points.len(), "raw silence points collected");

        // Defensive: the tool is expected to emit them in order already.
        silence_points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let probe = DurationProbe::new(self.runner);
        let file_duration =
            probe
                .duration_secs(wav_path)
                .await
                .ok_or_else(|| ScribaError::DurationUnavailable {
                    path: wav_path.to_string_lossy().into_owned(),
                })?;
        debug!(duration = file_duration, "total file duration");

        let segments = derive_segments(&silence_points, file_duration, params);

        if segments.is_empty() {
            info!(file = %wav_path.display(), "no speech segments derived");
        } else {
            info!(file = %wav_path.display(), count = segments.len(), "speech segments detected");
        }
        Ok(segments)
    }
}

/// Extract silence boundary timestamps from the filter's diagnostic output.
fn parse_silence_points(stderr: &str) -> Vec<f64> {
    let re = silence_point_regex();
    let mut points = Vec::new();
    for line in stderr.lines() {
        if let Some(caps) = re.captures(line)
            && let Some(value) = caps.get(2)
            && let Ok(secs) = value.as_str().parse::<f64>()
        {
            points.push(secs);
        }
    }
    points
}

/// Walk sorted silence boundaries and derive padded, clamped speech segments.
fn derive_segments(
    silence_points: &[f64],
    file_duration: f64,
    params: &VadParameters,
) -> Vec<AudioSegment> {
    let mut segments = Vec::new();

    // No silence at all: the whole file is one speech span, kept only when it
    // is strictly longer than the minimum.
    if silence_points.is_empty() {
        if file_duration > params.min_speech_secs {
            let start = (0.0 - params.padding_secs).max(0.0);
            let end = (file_duration + params.padding_secs).min(file_duration);
            segments.push(AudioSegment::new(start, end));
        } else {
            warn!(
                duration = file_duration,
                min_speech = params.min_speech_secs,
                "no silence detected but file is shorter than the minimum speech duration"
            );
        }
        return segments;
    }

    let mut cursor = 0.0;
    let mut i = 0;
    while i < silence_points.len() {
        let silence_start = silence_points[i];
        // An unmatched trailing silence_start runs to end-of-file.
        let silence_end = if i + 1 < silence_points.len() {
            silence_points[i + 1]
        } else {
            file_duration
        };

        if silence_start > cursor {
            push_candidate(&mut segments, cursor, silence_start, file_duration, params);
        }
        cursor = silence_end;
        i += 2;
    }

    // Remaining audio after the last silence block.
    if cursor < file_duration {
        push_candidate(&mut segments, cursor, file_duration, file_duration, params);
    }

    segments
}

/// Pad, clamp and length-filter one speech candidate. Candidates exactly at
/// the minimum length are kept.
fn push_candidate(
    segments: &mut Vec<AudioSegment>,
    start: f64,
    end: f64,
    file_duration: f64,
    params: &VadParameters,
) {
    let padded_start = (start - params.padding_secs).max(0.0);
    let padded_end = (end + params.padding_secs).min(file_duration);

    if padded_end - padded_start >= params.min_speech_secs {
        debug!(start = padded_start, end = padded_end, "speech segment kept");
        segments.push(AudioSegment::new(padded_start, padded_end));
    } else {
        debug!(
            start = padded_start,
            end = padded_end,
            "speech segment below minimum duration, dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolRunner;
    use std::path::PathBuf;

    fn params() -> VadParameters {
        VadParameters {
            noise_floor_db: "-30dB".to_string(),
            min_silence_secs: 0.8,
            min_speech_secs: 0.3,
            padding_secs: 0.15,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn parses_silence_points_from_filter_output() {
        let stderr = "\
[silencedetect @ 0x55d] silence_start: 3.01633\n\
size=N/A time=00:00:05.00 bitrate=N/A speed= 500x\n\
[silencedetect @ 0x55d] silence_end: 4.0 | silence_duration: 0.98367\n";
        let points = parse_silence_points(stderr);
        assert_eq!(points, vec![3.01633, 4.0]);
    }

    #[test]
    fn parse_ignores_unrelated_lines() {
        let stderr = "Stream #0:0: Audio: pcm_s16le\nframe=  100\n";
        assert!(parse_silence_points(stderr).is_empty());
    }

    #[test]
    fn scenario_one_silence_block_yields_two_padded_segments() {
        // 10s file, silent from 3.0 to 4.0: segments [0, 3.15] and [3.85, 10.0]
        // (trailing padding clamped to file end).
        let segments = derive_segments(&[3.0, 4.0], 10.0, &params());
        assert_eq!(segments.len(), 2);
        assert_close(segments[0].start_secs, 0.0);
        assert_close(segments[0].end_secs, 3.15);
        assert_close(segments[1].start_secs, 3.85);
        assert_close(segments[1].end_secs, 10.0);
    }

    #[test]
    fn no_silence_and_long_file_is_one_whole_file_segment() {
        let segments = derive_segments(&[], 10.0, &params());
        assert_eq!(segments.len(), 1);
        assert_close(segments[0].start_secs, 0.0);
        assert_close(segments[0].end_secs, 10.0);
    }

    #[test]
    fn no_silence_and_short_file_yields_nothing() {
        let segments = derive_segments(&[], 0.2, &params());
        assert!(segments.is_empty());
    }

    #[test]
    fn no_silence_at_exact_minimum_is_dropped() {
        // Whole-file case uses a strict > test.
        let segments = derive_segments(&[], 0.3, &params());
        assert!(segments.is_empty());
    }

    #[test]
    fn candidate_exactly_at_minimum_is_kept() {
        // Candidate [0, 0.0] padded to [0, 0.15]... too short. Build one that
        // pads to exactly min_speech: silence at [0.3, 5.0] with zero padding
        // gives a 0.3s candidate, kept by the inclusive test.
        let mut p = params();
        p.padding_secs = 0.0;
        let segments = derive_segments(&[0.3, 5.0], 10.0, &p);
        assert_eq!(segments.len(), 2);
        assert_close(segments[0].start_secs, 0.0);
        assert_close(segments[0].end_secs, 0.3);
    }

    #[test]
    fn short_candidates_are_dropped() {
        let mut p = params();
        p.padding_secs = 0.0;
        // Speech span [0, 0.1] is under the 0.3s minimum.
        let segments = derive_segments(&[0.1, 5.0], 10.0, &p);
        assert_eq!(segments.len(), 1);
        assert_close(segments[0].start_secs, 5.0);
    }

    #[test]
    fn odd_boundary_list_treats_trailing_start_as_running_to_eof() {
        // Silence starts at 8.0 and never ends: the cursor moves to EOF and
        // no trailing segment is emitted after it.
        let segments = derive_segments(&[3.0, 4.0, 8.0], 10.0, &params());
        assert_eq!(segments.len(), 2);
        assert_close(segments[1].start_secs, 3.85);
        assert_close(segments[1].end_secs, 8.15);
    }

    #[test]
    fn segment_count_bounded_by_pairs_plus_one() {
        let points = vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0];
        let segments = derive_segments(&points, 10.0, &params());
        assert!(segments.len() <= points.len() / 2 + 1);
        assert_eq!(segments.len(), 4);
    }

    #[test]
    fn all_segments_stay_within_file_bounds() {
        let points = vec![0.5, 1.5, 9.9, 9.95];
        let segments = derive_segments(&points, 10.0, &params());
        for s in &segments {
            assert!(s.start_secs >= 0.0, "segment starts before 0: {}", s);
            assert!(s.end_secs <= 10.0, "segment ends past file: {}", s);
            assert!(s.end_secs >= s.start_secs);
        }
    }

    #[test]
    fn segments_are_in_non_decreasing_start_order() {
        let points = vec![2.0, 3.0, 5.0, 6.0];
        let segments = derive_segments(&points, 10.0, &params());
        for pair in segments.windows(2) {
            assert!(pair[0].start_secs <= pair[1].start_secs);
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let points = vec![1.0, 2.0, 4.0, 5.5];
        let a = derive_segments(&points, 8.0, &params());
        let b = derive_segments(&points, 8.0, &params());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn detector_runs_filter_then_probe() {
        let runner = MockToolRunner::new();
        runner.push_output(
            0,
            "",
            "[silencedetect] silence_start: 3.0\n[silencedetect] silence_end: 4.0 | silence_duration: 1.0\n",
        );
        runner.push_output(0, "10.0", ""); // ffprobe duration

        let detector = SilenceDetector::new(&runner);
        let segments = detector
            .detect_speech_segments(&PathBuf::from("audio.wav"), &params())
            .await
            .unwrap();

        assert_eq!(segments.len(), 2);
        let calls = runner.calls();
        assert_eq!(calls[0].0, "ffmpeg");
        assert!(calls[0].1.iter().any(|a| a.contains("silencedetect")));
        assert_eq!(calls[1].0, "ffprobe");
    }

    #[tokio::test]
    async fn detector_sorts_unordered_boundaries() {
        let runner = MockToolRunner::new();
        runner.push_output(
            0,
            "",
            "silence_end: 4.0\nsilence_start: 3.0\n",
        );
        runner.push_output(0, "10.0", "");

        let detector = SilenceDetector::new(&runner);
        let segments = detector
            .detect_speech_segments(&PathBuf::from("audio.wav"), &params())
            .await
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert_close(segments[0].end_secs, 3.15);
    }

    #[tokio::test]
    async fn nonzero_filter_exit_is_tool_execution_error() {
        let runner = MockToolRunner::new();
        runner.push_output(1, "", "Invalid data found");

        let detector = SilenceDetector::new(&runner);
        let err = detector
            .detect_speech_segments(&PathBuf::from("bad.wav"), &params())
            .await
            .unwrap_err();
        assert!(matches!(err, ScribaError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn unavailable_duration_is_fatal_to_detection() {
        let runner = MockToolRunner::new();
        runner.push_output(0, "", "silence_start: 1.0\nsilence_end: 2.0\n");
        runner.push_output(0, "N/A", ""); // probe cannot parse

        let detector = SilenceDetector::new(&runner);
        let err = detector
            .detect_speech_segments(&PathBuf::from("audio.wav"), &params())
            .await
            .unwrap_err();
        assert!(matches!(err, ScribaError::DurationUnavailable { .. }));
    }
}
