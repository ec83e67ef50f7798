//! Error types for scriba.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribaError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // External tool errors
    #[error("External tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Could not determine audio duration for {path}")]
    DurationUnavailable { path: String },

    #[error("Audio conversion failed for {path}: {message}")]
    Conversion { path: String, message: String },

    // Capture errors
    #[error("Unsupported capture format: {requested} (only 16kHz/16-bit/mono is supported)")]
    UnsupportedFormat { requested: String },

    #[error("Capture is already in progress")]
    AlreadyCapturing,

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Recognition errors
    #[error("Recognition model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribaError>;
