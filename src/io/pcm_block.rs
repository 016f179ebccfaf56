//! Borrowed multichannel sample block

use crate::error::AnalysisError;

/// One decoded block of planar PCM
///
/// The block borrows the decoder's buffers; the core reads it once per call
/// and keeps nothing.
#[derive(Debug, Clone, Copy)]
pub struct PcmBlock<'a> {
    channels: &'a [&'a [f32]],
    frame_count: usize,
    sample_rate: u32,
}

impl<'a> PcmBlock<'a> {
    /// Create a block over planar channel slices
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if there are no channels, the
    /// sample rate is zero, or any channel holds fewer than `frame_count` samples.
    pub fn new(
        channels: &'a [&'a [f32]],
        frame_count: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if channels.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Block has no channels".to_string(),
            ));
        }

        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        if let Some((idx, short)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() < frame_count)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Channel {} holds {} samples, block declares {} frames",
                idx,
                short.len(),
                frame_count
            )));
        }

        Ok(Self {
            channels,
            frame_count,
            sample_rate,
        })
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel in this block
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples of one channel, trimmed to `frame_count`
    pub fn channel(&self, index: usize) -> &'a [f32] {
        let channel: &'a [f32] = self.channels[index];
        &channel[..self.frame_count]
    }

    /// All channels, each trimmed to `frame_count`
    pub fn channels(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        let frames = self.frame_count;
        self.channels.iter().map(move |&ch| &ch[..frames])
    }

    /// Duration of the block in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_accessors() {
        let left = vec![0.1f32; 480];
        let right = vec![0.2f32; 512];
        let channels = [left.as_slice(), right.as_slice()];
        let block = PcmBlock::new(&channels, 480, 48000).unwrap();

        assert_eq!(block.num_channels(), 2);
        assert_eq!(block.channel(1).len(), 480);
        assert!((block.duration_seconds() - 0.01).abs() < 1e-9);
        assert_eq!(block.channels().count(), 2);
    }

    #[test]
    fn test_block_rejects_short_channel() {
        let left = vec![0.0f32; 100];
        let right = vec![0.0f32; 50];
        let channels = [left.as_slice(), right.as_slice()];
        assert!(matches!(
            PcmBlock::new(&channels, 100, 44100),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_block_rejects_zero_rate_and_no_channels() {
        let mono = vec![0.0f32; 10];
        let channels = [mono.as_slice()];
        assert!(PcmBlock::new(&channels, 10, 0).is_err());
        assert!(PcmBlock::new(&[], 0, 44100).is_err());
    }
}
