//! PCM input boundary
//!
//! Decoding lives outside this crate. Decoded audio enters as borrowed
//! multichannel blocks, delivered strictly in order.

pub mod pcm_block;
pub mod sample_buffer;

pub use pcm_block::PcmBlock;
pub use sample_buffer::SampleBuffer;
