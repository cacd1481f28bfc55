//! Audio: PCM buffers and codecs, music bed selection, and the narration/music mix.

pub mod mix;
pub mod music;
pub mod pcm;
