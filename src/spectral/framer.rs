//! Short-time spectral framing with overlap-add resynthesis
//!
//! Turns arbitrarily sized PCM deliveries into fixed `fft_size` frames spaced
//! `hop_size` apart, independent of how the caller's block size relates to the
//! hop.
//!
//! # Algorithm
//!
//! 1. Append each block to a per-channel circular input buffer
//! 2. Whenever `fft_size` unconsumed samples are available, copy out a frame,
//!    apply the analysis window and run a forward FFT
//! 3. Hand the multichannel spectrum to a [`SpectralProcessor`]
//! 4. When resynthesising, inverse-FFT the (possibly modified) spectrum,
//!    apply the synthesis window and overlap-add it into a circular output
//!    buffer
//! 5. Emit the oldest finished output samples, one for each input sample
//!
//! The stream is pre-rolled with `fft_size - hop_size` zeros, so the first
//! frame fires once `hop_size` samples have arrived and N input samples fire
//! N / hop_size frames. Resynthesised output lags the input by
//! [`SpectralFramer::latency`] samples.
//!
//! # Example
//!
//! ```
//! use tempo_tree::spectral::{FrameStatus, FramerConfig, SpectralBufferList, SpectralFramer};
//!
//! let mut framer = SpectralFramer::new(FramerConfig {
//!     fft_size: 1024,
//!     hop_size: 256,
//!     num_channels: 1,
//!     max_frames: 512,
//! })?;
//!
//! let samples = vec![0.0f32; 2048];
//! let mut frames = 0;
//! let hops = framer.process(&[samples.as_slice()], samples.len(), &mut |_: &mut SpectralBufferList, _: usize| {
//!     frames += 1;
//!     FrameStatus::Continue
//! });
//! assert_eq!(hops, 8);
//! assert_eq!(frames, 8);
//! # Ok::<(), tempo_tree::AnalysisError>(())
//! ```

use super::circular_buffer::CircularBuffer;
use super::spectrum::SpectralBufferList;
use super::window::overlap_add_window;
use crate::error::{try_zeroed, AnalysisError};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// What the framer does with a frame after the processor has seen it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Resynthesise the (possibly modified) spectrum
    Continue,
    /// Drop this frame from the resynthesised output
    Discard,
}

/// Per-frame spectral hook
///
/// Called exactly once per fired hop with the spectra of all channels and the
/// FFT size. Closures of the form `FnMut(&mut SpectralBufferList, usize) -> FrameStatus`
/// implement this trait.
pub trait SpectralProcessor {
    /// Inspect or modify one frame's spectra
    fn process_spectra(&mut self, spectra: &mut SpectralBufferList, fft_size: usize)
        -> FrameStatus;
}

impl<F> SpectralProcessor for F
where
    F: FnMut(&mut SpectralBufferList, usize) -> FrameStatus,
{
    fn process_spectra(
        &mut self,
        spectra: &mut SpectralBufferList,
        fft_size: usize,
    ) -> FrameStatus {
        self(spectra, fft_size)
    }
}

/// Processor that leaves every spectrum untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl SpectralProcessor for PassThrough {
    fn process_spectra(&mut self, _spectra: &mut SpectralBufferList, _fft_size: usize) -> FrameStatus {
        FrameStatus::Continue
    }
}

/// Spectral framer construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// FFT size, must be a power of two
    pub fft_size: usize,
    /// Samples between successive frames, 1..=fft_size
    pub hop_size: usize,
    /// Channels per block
    pub num_channels: usize,
    /// Largest block accepted in one internal step
    pub max_frames: usize,
}

/// Scratch state owned by one channel
#[derive(Debug)]
struct SpectralChannel {
    /// Circular input (capacity >= fft_size + max_frames)
    input: CircularBuffer,
    /// Circular overlap-add output (same capacity)
    output: CircularBuffer,
    /// Real frame samples (fft_size)
    frame: Vec<f32>,
    /// Complex resynthesis scratch (fft_size)
    synthesis: Vec<Complex<f32>>,
}

impl SpectralChannel {
    fn new(io_size: usize, fft_size: usize) -> Result<Self, AnalysisError> {
        Ok(Self {
            input: CircularBuffer::with_min_capacity(io_size)?,
            output: CircularBuffer::with_min_capacity(io_size)?,
            frame: try_zeroed(fft_size)?,
            synthesis: try_zeroed(fft_size)?,
        })
    }
}

/// Streaming STFT analysis and overlap-add resynthesis
pub struct SpectralFramer {
    log2_fft_size: u32,
    hop_size: usize,
    max_frames: usize,

    /// Absolute position of the next input sample
    input_pos: usize,
    /// Absolute start of the next analysis frame
    in_fft_pos: usize,
    /// Absolute position of the next output sample
    output_pos: usize,
    hops_fired: u64,

    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    channels: Vec<SpectralChannel>,
    spectra: SpectralBufferList,
}

impl std::fmt::Debug for SpectralFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralFramer")
            .field("fft_size", &self.fft_size())
            .field("hop_size", &self.hop_size)
            .field("num_channels", &self.channels.len())
            .field("max_frames", &self.max_frames)
            .field("input_pos", &self.input_pos)
            .field("in_fft_pos", &self.in_fft_pos)
            .field("output_pos", &self.output_pos)
            .field("hops_fired", &self.hops_fired)
            .finish()
    }
}

impl SpectralFramer {
    /// Create a framer
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` if `fft_size` is not a power of two (or < 2),
    ///   `hop_size` is 0 or larger than `fft_size`, or `num_channels` /
    ///   `max_frames` is 0. No partial instance is returned.
    /// - `AllocationFailure` if a scratch buffer cannot be allocated.
    pub fn new(config: FramerConfig) -> Result<Self, AnalysisError> {
        let FramerConfig {
            fft_size,
            hop_size,
            num_channels,
            max_frames,
        } = config;

        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::ConfigurationError(format!(
                "FFT size must be a power of two >= 2, got {}",
                fft_size
            )));
        }
        if hop_size == 0 || hop_size > fft_size {
            return Err(AnalysisError::ConfigurationError(format!(
                "Hop size must be in 1..={}, got {}",
                fft_size, hop_size
            )));
        }
        if num_channels == 0 {
            return Err(AnalysisError::ConfigurationError(
                "Channel count must be > 0".to_string(),
            ));
        }
        if max_frames == 0 {
            return Err(AnalysisError::ConfigurationError(
                "Max frames must be > 0".to_string(),
            ));
        }

        let io_size = fft_size.checked_add(max_frames).ok_or_else(|| {
            AnalysisError::ConfigurationError("FFT size + max frames overflows".to_string())
        })?;

        let mut channels = Vec::new();
        channels.try_reserve_exact(num_channels)?;
        for _ in 0..num_channels {
            channels.push(SpectralChannel::new(io_size, fft_size)?);
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        log::debug!(
            "Spectral framer: fft={}, hop={}, channels={}, max_frames={}, io_capacity={}",
            fft_size,
            hop_size,
            num_channels,
            max_frames,
            channels[0].input.capacity()
        );

        Ok(Self {
            log2_fft_size: fft_size.trailing_zeros(),
            hop_size,
            max_frames,
            input_pos: fft_size,
            in_fft_pos: hop_size,
            output_pos: 0,
            hops_fired: 0,
            window: overlap_add_window(fft_size, hop_size)?,
            forward,
            inverse,
            fft_scratch: try_zeroed(scratch_len)?,
            channels,
            spectra: SpectralBufferList::new(num_channels, fft_size)?,
        })
    }

    /// FFT size (derived from the stored log2)
    pub fn fft_size(&self) -> usize {
        1 << self.log2_fft_size
    }

    /// log2 of the FFT size
    pub fn log2_fft_size(&self) -> u32 {
        self.log2_fft_size
    }

    /// Mask for indexing within one frame
    pub fn fft_mask(&self) -> usize {
        self.fft_size() - 1
    }

    /// Hop size
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Largest internal step in frames
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Capacity of each circular input/output buffer
    pub fn io_capacity(&self) -> usize {
        self.channels[0].input.capacity()
    }

    /// Mask applied to circular buffer positions
    pub fn io_mask(&self) -> usize {
        self.channels[0].input.mask()
    }

    /// Output delay of resynthesis in samples
    pub fn latency(&self) -> usize {
        self.fft_size()
    }

    /// Frames fired since construction or the last reset
    pub fn hops_fired(&self) -> u64 {
        self.hops_fired
    }

    /// Analysis window applied before each forward FFT
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Analyse `frame_count` samples per channel
    ///
    /// Calls `processor` once per fired hop and returns the number of hops
    /// fired by this call (zero, one or many). Channels missing from `input`
    /// are treated as silence.
    ///
    /// # Panics
    ///
    /// Panics if a provided channel slice holds fewer than `frame_count` samples.
    pub fn process<P>(&mut self, input: &[&[f32]], frame_count: usize, processor: &mut P) -> usize
    where
        P: SpectralProcessor + ?Sized,
    {
        self.run(input, None, frame_count, processor)
    }

    /// Analyse and resynthesise `frame_count` samples per channel
    ///
    /// Writes `frame_count` output samples per channel, delayed by
    /// [`latency`](Self::latency) samples relative to the input.
    ///
    /// # Panics
    ///
    /// Panics if an input or output channel slice holds fewer than `frame_count` samples.
    pub fn process_resynthesize<P>(
        &mut self,
        input: &[&[f32]],
        output: &mut [&mut [f32]],
        frame_count: usize,
        processor: &mut P,
    ) -> usize
    where
        P: SpectralProcessor + ?Sized,
    {
        self.run(input, Some(output), frame_count, processor)
    }

    /// Zero all positions and buffer contents without releasing memory
    pub fn reset(&mut self) {
        let fft_size = self.fft_size();
        self.input_pos = fft_size;
        self.in_fft_pos = self.hop_size;
        self.output_pos = 0;
        self.hops_fired = 0;
        for channel in self.channels.iter_mut() {
            channel.input.clear();
            channel.output.clear();
            channel.frame.fill(0.0);
            channel.synthesis.fill(Complex::new(0.0, 0.0));
        }
        self.spectra.clear();
    }

    fn run<P>(
        &mut self,
        input: &[&[f32]],
        mut output: Option<&mut [&mut [f32]]>,
        frame_count: usize,
        processor: &mut P,
    ) -> usize
    where
        P: SpectralProcessor + ?Sized,
    {
        let fft_size = self.fft_size();
        let resynthesize = output.is_some();
        let mut hops = 0;
        let mut offset = 0;

        while offset < frame_count {
            let n = (frame_count - offset).min(self.max_frames);

            for (idx, channel) in self.channels.iter_mut().enumerate() {
                match input.get(idx) {
                    Some(samples) => channel
                        .input
                        .write(self.input_pos, &samples[offset..offset + n]),
                    None => channel.input.zero_range(self.input_pos, n),
                }
            }
            self.input_pos += n;

            while self.input_pos - self.in_fft_pos >= fft_size {
                self.fire_hop(processor, resynthesize);
                hops += 1;
            }

            for (idx, channel) in self.channels.iter_mut().enumerate() {
                match output.as_deref_mut().and_then(|out| out.get_mut(idx)) {
                    Some(out) => channel
                        .output
                        .take(self.output_pos, &mut out[offset..offset + n]),
                    None => channel.output.zero_range(self.output_pos, n),
                }
            }
            self.output_pos += n;

            offset += n;
        }

        hops
    }

    fn fire_hop<P>(&mut self, processor: &mut P, resynthesize: bool)
    where
        P: SpectralProcessor + ?Sized,
    {
        let fft_size = self.fft_size();

        for (idx, channel) in self.channels.iter_mut().enumerate() {
            channel.input.read(self.in_fft_pos, &mut channel.frame);

            let spectrum = self.spectra.spectrum_mut(idx);
            for ((bin, &s), &w) in spectrum.iter_mut().zip(&channel.frame).zip(&self.window) {
                *bin = Complex::new(s * w, 0.0);
            }
            self.forward
                .process_with_scratch(spectrum, &mut self.fft_scratch);
        }

        let status = processor.process_spectra(&mut self.spectra, fft_size);

        if resynthesize && status == FrameStatus::Continue {
            let scale = 1.0 / fft_size as f32;
            for (idx, channel) in self.channels.iter_mut().enumerate() {
                channel
                    .synthesis
                    .copy_from_slice(self.spectra.spectrum(idx));
                self.inverse
                    .process_with_scratch(&mut channel.synthesis, &mut self.fft_scratch);

                for ((out, bin), &w) in channel
                    .frame
                    .iter_mut()
                    .zip(&channel.synthesis)
                    .zip(&self.window)
                {
                    *out = bin.re * scale * w;
                }
                channel.output.accumulate(self.in_fft_pos, &channel.frame);
            }
        }

        self.in_fft_pos += self.hop_size;
        self.hops_fired += 1;
    }
}
