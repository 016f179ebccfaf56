//! Owned planar buffer delivered as successive fixed-size blocks

use super::PcmBlock;
use crate::error::AnalysisError;

/// Planar sample storage that hands out in-order, gap-free blocks
#[derive(Debug)]
pub struct SampleBuffer {
    /// One vector per channel
    data: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from planar channels
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the channels differ in length.
    pub fn from_planar(data: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if let Some(first) = data.first() {
            if data.iter().any(|ch| ch.len() != first.len()) {
                return Err(AnalysisError::InvalidInput(
                    "Planar channels differ in length".to_string(),
                ));
            }
        }
        Ok(Self { data, sample_rate })
    }

    /// Create a buffer by de-interleaving `num_channels`-wide frames
    ///
    /// A trailing incomplete frame is dropped.
    pub fn from_interleaved(
        samples: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if num_channels == 0 {
            return Err(AnalysisError::InvalidInput(
                "Channel count must be > 0".to_string(),
            ));
        }

        let frames = samples.len() / num_channels;
        let mut data = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &s) in data.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Ok(Self { data, sample_rate })
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// True when no frames are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.data.len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Call `f` once per block of at most `block_frames` frames, in order
    ///
    /// Stops at the first error returned by `f`.
    pub fn for_each_block<F>(&self, block_frames: usize, mut f: F) -> Result<(), AnalysisError>
    where
        F: FnMut(&PcmBlock<'_>) -> Result<(), AnalysisError>,
    {
        if block_frames == 0 {
            return Err(AnalysisError::InvalidInput(
                "Block size must be > 0".to_string(),
            ));
        }

        let total = self.len();
        let mut position = 0;
        while position < total {
            let end = (position + block_frames).min(total);
            let slices: Vec<&[f32]> = self.data.iter().map(|ch| &ch[position..end]).collect();
            let block = PcmBlock::new(&slices, end - position, self.sample_rate)?;
            f(&block)?;
            position = end;
        }
        Ok(())
    }
}
