//! Whisper-based recognition engine.
//!
//! # Feature Gate
//!
//! The real engine requires the `whisper` feature (and cmake for the
//! whisper.cpp build):
//!
//! ```bash
//! cargo build --features whisper
//! ```
//!
//! Without the feature a stub is compiled that fails at transcription time,
//! so the rest of the pipeline still builds and tests.

use crate::defaults;
use crate::error::{Result, ScribaError};
use crate::stt::engine::{SpeechEngine, TimedText};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

#[cfg(feature = "whisper")]
use std::sync::atomic::Ordering;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperEngineConfig {
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Language code (e.g. "en", "es")
    pub language: String,
    /// Number of inference threads (None = library default)
    pub threads: Option<usize>,
}

impl Default for WhisperEngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper recognition engine.
///
/// The WhisperContext is wrapped in a Mutex so the engine can be shared
/// across threads; each transcription runs in its own state.
#[cfg(feature = "whisper")]
pub struct WhisperEngine {
    context: Mutex<WhisperContext>,
    config: WhisperEngineConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper engine placeholder built without the `whisper` feature.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperEngine {
    config: WhisperEngineConfig,
    model_name: String,
}

fn model_name_from(config: &WhisperEngineConfig) -> String {
    config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperEngine {
    /// Load the model at `config.model_path`.
    ///
    /// # Errors
    /// Returns `ScribaError::ModelNotFound` if the model file doesn't exist,
    /// `ScribaError::Recognition` if loading fails.
    pub fn new(config: WhisperEngineConfig) -> Result<Self> {
        // Route whisper.cpp's own logging through tracing once per process.
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(ScribaError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config);

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| ScribaError::Recognition {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| ScribaError::Recognition {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperEngineConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperEngine {
    /// Stub constructor: validates the model path but never loads it.
    pub fn new(config: WhisperEngineConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ScribaError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperEngineConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<Vec<TimedText>> {
        if cancel.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }

        let context = self
            .context
            .lock()
            .map_err(|e| ScribaError::Recognition {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| ScribaError::Recognition {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // A flag set mid-inference aborts the run at the next decoder step
        // instead of waiting for the full pass to finish.
        let abort_flag = Arc::clone(cancel);
        params.set_abort_callback_safe(move || abort_flag.load(Ordering::Relaxed));

        if let Err(e) = state.full(params, samples) {
            // An aborted run surfaces as a failure code from the library.
            if cancel.load(Ordering::Relaxed) {
                return Ok(Vec::new());
            }
            return Err(ScribaError::Recognition {
                message: format!("Whisper inference failed: {}", e),
            });
        }
        if cancel.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for segment in state.as_iter() {
            // Whisper timestamps are in 10ms ticks.
            results.push(TimedText {
                start_secs: segment.start_timestamp() as f64 * 0.01,
                end_secs: segment.end_timestamp() as f64 * 0.01,
                text: segment.to_string(),
            });
        }

        Ok(results)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, _samples: &[f32], _cancel: &Arc<AtomicBool>) -> Result<Vec<TimedText>> {
        Err(ScribaError::Recognition {
            message: concat!(
                "Whisper feature not enabled; this binary was built without speech recognition.\n",
                "Rebuild with: cargo build --release --features whisper\n",
                "If the build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
