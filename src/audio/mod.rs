//! Audio-side building blocks: segment model, silence detection, segment
//! extraction, format conversion and PCM helpers.

pub mod convert;
pub mod extract;
pub mod segment;
pub mod vad;
pub mod wav;
