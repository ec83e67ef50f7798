//! Speech recognition engines.

pub mod engine;
pub mod whisper;

pub use engine::{MockEngine, SpeechEngine, TimedText};
pub use whisper::{WhisperEngine, WhisperEngineConfig};
