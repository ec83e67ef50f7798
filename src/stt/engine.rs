//! Recognition engine abstraction and test double.

use crate::error::{Result, ScribaError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A recognized stretch of speech with its timing within the input audio.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedText {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

impl TimedText {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }
}

/// Converts normalized f32 audio samples into timed text.
///
/// Implementations must be safe to call from blocking contexts, and must
/// observe `cancel` during a long recognition pass — a flag set mid-run
/// aborts the pass promptly rather than waiting for it to finish. The flag
/// is shared (`Arc`) so implementations can hand it to abort hooks that
/// outlive the borrow.
pub trait SpeechEngine: Send + Sync {
    fn transcribe(&self, samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<Vec<TimedText>>;

    /// Short model identifier used in output file names.
    fn model_name(&self) -> &str;
}

impl<T: SpeechEngine + ?Sized> SpeechEngine for Arc<T> {
    fn transcribe(&self, samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<Vec<TimedText>> {
        (**self).transcribe(samples, cancel)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

enum MockOutcome {
    Segments(Vec<TimedText>),
    Failure(String),
}

/// Scripted engine for tests: queue outcomes per call, inspect what was fed.
pub struct MockEngine {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    received: Mutex<Vec<usize>>,
    model_name: String,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
            model_name: "mock".to_string(),
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Queue a single-segment response spanning the whole input.
    pub fn push_text(&self, text: &str) {
        self.push_segments(vec![TimedText::new(0.0, 0.0, text)]);
    }

    pub fn push_segments(&self, segments: Vec<TimedText>) {
        self.outcomes
            .lock()
            .expect("mock lock poisoned")
            .push_back(MockOutcome::Segments(segments));
    }

    pub fn push_failure(&self, message: &str) {
        self.outcomes
            .lock()
            .expect("mock lock poisoned")
            .push_back(MockOutcome::Failure(message.to_string()));
    }

    /// Sample counts of every `transcribe` call, in order.
    pub fn received_sample_counts(&self) -> Vec<usize> {
        self.received.lock().expect("mock lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().expect("mock lock poisoned").len()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for MockEngine {
    fn transcribe(&self, samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<Vec<TimedText>> {
        self.received.lock().expect("mock lock poisoned").push(samples.len());

        if cancel.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }

        match self.outcomes.lock().expect("mock lock poisoned").pop_front() {
            Some(MockOutcome::Segments(segments)) => Ok(segments),
            Some(MockOutcome::Failure(message)) => Err(ScribaError::Recognition { message }),
            // Queue exhausted: behave like an engine that heard nothing.
            None => Ok(Vec::new()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_outcomes_come_back_in_order() {
        let engine = MockEngine::new();
        engine.push_text("first");
        engine.push_failure("broken");
        engine.push_text("third");

        let cancel = Arc::new(AtomicBool::new(false));
        let first = engine.transcribe(&[0.0; 10], &cancel).unwrap();
        assert_eq!(first[0].text, "first");

        let err = engine.transcribe(&[0.0; 20], &cancel).unwrap_err();
        assert!(matches!(err, ScribaError::Recognition { .. }));

        let third = engine.transcribe(&[0.0; 30], &cancel).unwrap();
        assert_eq!(third[0].text, "third");

        assert_eq!(engine.received_sample_counts(), vec![10, 20, 30]);
    }

    #[test]
    fn exhausted_queue_returns_empty_segments() {
        let engine = MockEngine::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let result = engine.transcribe(&[0.0; 5], &cancel).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn cancellation_short_circuits() {
        let engine = MockEngine::new();
        engine.push_text("never seen");
        let cancel = Arc::new(AtomicBool::new(true));
        let result = engine.transcribe(&[0.0; 100], &cancel).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn model_name_is_configurable() {
        let engine = MockEngine::new().with_model_name("tiny-en");
        assert_eq!(engine.model_name(), "tiny-en");
    }

    #[test]
    fn engine_works_behind_arc() {
        let engine = Arc::new(MockEngine::new());
        engine.push_text("shared");
        let cancel = Arc::new(AtomicBool::new(false));
        let result = SpeechEngine::transcribe(&engine, &[0.0; 1], &cancel).unwrap();
        assert_eq!(result[0].text, "shared");
    }
}
