//! Short-time spectral framing
//!
//! - Power-of-two circular buffers with masked indexing
//! - Multichannel complex spectra
//! - Streaming STFT with overlap-add resynthesis
//! - Spectral low-pass processor

pub mod circular_buffer;
pub mod framer;
pub mod low_pass;
pub mod spectrum;
pub mod window;

pub use circular_buffer::CircularBuffer;
pub use framer::{FrameStatus, FramerConfig, PassThrough, SpectralFramer, SpectralProcessor};
pub use low_pass::LowPassFilter;
pub use spectrum::SpectralBufferList;

pub use rustfft::num_complex::Complex;
