//! Video encoding sinks.
//!
//! The compiler pushes rendered RGB frames into a [`sink::FrameSink`] in timeline order.

/// `ffmpeg`-based MP4 output via the system binary.
pub mod ffmpeg;
/// Frame sink trait and the in-memory sink.
pub mod sink;
