//! Transcription orchestrators: the batch file pipeline and the live
//! capture loop.

pub mod batch;
pub mod live;

pub use batch::{BatchOutcome, BatchTranscriber, OverwritePolicy};
pub use live::{DeviceSelector, FirstDeviceSelector, LiveOptions, LiveTranscriber};
