//! Streaming RMS onset extractor
//!
//! Accumulates windowed RMS across decoded blocks. Windows are contiguous
//! over the whole stream, so one window may straddle two blocks.
//!
//! # Example
//!
//! ```
//! use tempo_tree::features::onset::OnsetExtractor;
//! use tempo_tree::io::PcmBlock;
//!
//! let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1)?;
//! let samples = vec![0.0f32; 44100];
//! let channels = [samples.as_slice()];
//! extractor.push_block(&PcmBlock::new(&channels, samples.len(), 44100)?)?;
//! assert!(extractor.onsets().is_empty());
//! # Ok::<(), tempo_tree::AnalysisError>(())
//! ```

use super::peaks::detect_peaks;
use super::Onset;
use crate::error::AnalysisError;
use crate::io::PcmBlock;
use crate::preprocessing::channel_mixer::mix_to_mono;

/// Incremental onset detector over in-order PCM blocks
#[derive(Debug, Clone)]
pub struct OnsetExtractor {
    sample_rate: u32,
    window_size: usize,
    floor: f32,
    bias: f32,

    /// Completed window RMS values
    rms: Vec<f32>,
    /// Sum of squares of the window in progress
    partial_sum_sq: f64,
    /// Samples in the window in progress
    partial_len: usize,

    samples_seen: usize,
    max_magnitude: f32,
    max_index: usize,
}

impl OnsetExtractor {
    /// Create an extractor
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate of every block that will be pushed
    /// * `window_size` - RMS window in samples
    /// * `floor` - Absolute RMS a peak must exceed
    /// * `bias` - Peak threshold relative to the loudest window (0.0-1.0)
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for a zero sample rate or window size.
    pub fn new(sample_rate: u32, window_size: usize, floor: f32, bias: f32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::ConfigurationError(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if window_size == 0 {
            return Err(AnalysisError::ConfigurationError(
                "RMS window size must be > 0".to_string(),
            ));
        }

        Ok(Self {
            sample_rate,
            window_size,
            floor,
            bias,
            rms: Vec::new(),
            partial_sum_sq: 0.0,
            partial_len: 0,
            samples_seen: 0,
            max_magnitude: 0.0,
            max_index: 0,
        })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// RMS window in samples
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Mono samples consumed so far
    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Add one decoded block, mixed down to mono
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the block's sample rate differs from the extractor's.
    pub fn push_block(&mut self, block: &PcmBlock<'_>) -> Result<(), AnalysisError> {
        if block.sample_rate() != self.sample_rate {
            return Err(AnalysisError::InvalidInput(format!(
                "Block sample rate {} Hz does not match extractor rate {} Hz",
                block.sample_rate(),
                self.sample_rate
            )));
        }

        if block.num_channels() == 1 {
            self.push_samples(block.channel(0));
        } else {
            let mono = mix_to_mono(block.channels(), block.frame_count());
            self.push_samples(&mono);
        }
        Ok(())
    }

    /// Add mono samples
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &s in samples {
            let magnitude = s.abs();
            if magnitude > self.max_magnitude {
                self.max_magnitude = magnitude;
                self.max_index = self.samples_seen;
            }

            self.partial_sum_sq += (s as f64) * (s as f64);
            self.partial_len += 1;
            self.samples_seen += 1;

            if self.partial_len == self.window_size {
                self.rms.push((self.partial_sum_sq / self.window_size as f64).sqrt() as f32);
                self.partial_sum_sq = 0.0;
                self.partial_len = 0;
            }
        }
    }

    /// RMS curve so far, including the trailing partial window
    pub fn rms_values(&self) -> Vec<f32> {
        let mut rms = self.rms.clone();
        if self.partial_len > 0 {
            rms.push((self.partial_sum_sq / self.partial_len as f64).sqrt() as f32);
        }
        rms
    }

    /// Onsets found in everything pushed so far
    ///
    /// Silent or empty input yields no onsets. Input shorter than two windows
    /// yields its single loudest sample as the only (non-peak) candidate.
    pub fn onsets(&self) -> Vec<Onset> {
        if self.samples_seen == 0 || self.max_magnitude <= 0.0 {
            log::debug!("No signal energy, no onsets detected");
            return Vec::new();
        }

        if self.samples_seen < 2 * self.window_size {
            log::warn!(
                "Input ({} samples) shorter than two RMS windows ({}), using loudest sample",
                self.samples_seen,
                self.window_size
            );
            return vec![Onset {
                time_seconds: self.max_index as f64 / self.sample_rate as f64,
                peak_rms: self.max_magnitude,
                is_peak: false,
            }];
        }

        let onsets = detect_peaks(
            &self.rms_values(),
            self.window_size,
            self.sample_rate,
            self.floor,
            self.bias,
        );
        log::debug!(
            "Onset extraction: {} samples, {} windows, {} onsets",
            self.samples_seen,
            self.rms.len() + usize::from(self.partial_len > 0),
            onsets.len()
        );
        onsets
    }

    /// Discard all accumulated state
    pub fn reset(&mut self) {
        self.rms.clear();
        self.partial_sum_sq = 0.0;
        self.partial_len = 0;
        self.samples_seen = 0;
        self.max_magnitude = 0.0;
        self.max_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::onset::rms::rms_vector;

    /// Generate a synthetic kick pattern at the given BPM
    fn generate_kick_pattern(duration_seconds: f32, bpm: f32, sample_rate: f32, kick_duration_ms: f32) -> Vec<f32> {
        let num_samples = (duration_seconds * sample_rate) as usize;
        let mut samples = vec![0.0f32; num_samples];

        let beat_interval = (60.0 / bpm * sample_rate) as usize;
        let kick_samples = (kick_duration_ms / 1000.0 * sample_rate) as usize;

        let mut pos = 0;
        while pos < num_samples {
            let end = (pos + kick_samples).min(num_samples);
            for i in 0..end - pos {
                let t = i as f32 / kick_samples as f32;
                let phase = 2.0 * std::f32::consts::PI * 60.0 * i as f32 / sample_rate;
                samples[pos + i] = 0.8 * (-t * 5.0).exp() * phase.sin();
            }
            pos += beat_interval;
        }

        samples
    }

    fn push_in_blocks(extractor: &mut OnsetExtractor, samples: &[f32], block: usize) {
        for chunk in samples.chunks(block) {
            let channels = [chunk];
            let pcm = PcmBlock::new(&channels, chunk.len(), extractor.sample_rate()).unwrap();
            extractor.push_block(&pcm).unwrap();
        }
    }

    #[test]
    fn test_kick_pattern_120_bpm() {
        let samples = generate_kick_pattern(4.0, 120.0, 44100.0, 150.0);
        let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1).unwrap();
        push_in_blocks(&mut extractor, &samples, 4096);

        let onsets = extractor.onsets();
        // The kick at t = 0 sits in the first window, which has no left neighbour
        assert_eq!(onsets.len(), 7, "onsets: {:?}", onsets);

        let window_seconds = 1024.0 / 44100.0;
        for pair in onsets.windows(2) {
            let gap = pair[1].time_seconds - pair[0].time_seconds;
            assert!(
                (gap - 0.5).abs() <= 2.0 * window_seconds,
                "gap {:.4}s should be ~0.5s",
                gap
            );
        }
    }

    #[test]
    fn test_streaming_matches_whole_buffer_rms() {
        let samples = generate_kick_pattern(2.0, 100.0, 44100.0, 80.0);
        let mut extractor = OnsetExtractor::new(44100, 1000, 0.0, 0.0).unwrap();
        push_in_blocks(&mut extractor, &samples, 777);

        let streamed = extractor.rms_values();
        let whole = rms_vector(&samples, 1000);
        assert_eq!(streamed.len(), whole.len());
        for (a, b) in streamed.iter().zip(&whole) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_stereo_blocks_are_mixed() {
        let left = generate_kick_pattern(2.0, 120.0, 44100.0, 100.0);
        let right = vec![0.0f32; left.len()];
        let channels = [left.as_slice(), right.as_slice()];
        let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1).unwrap();
        extractor
            .push_block(&PcmBlock::new(&channels, left.len(), 44100).unwrap())
            .unwrap();
        assert_eq!(extractor.onsets().len(), 3);
    }

    #[test]
    fn test_silent_and_empty_input() {
        let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1).unwrap();
        assert!(extractor.onsets().is_empty());

        extractor.push_samples(&vec![0.0; 44100]);
        assert!(extractor.onsets().is_empty());
    }

    #[test]
    fn test_short_input_yields_loudest_sample() {
        let mut samples = vec![0.01f32; 1500];
        samples[441] = -0.7;
        let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1).unwrap();
        extractor.push_samples(&samples);

        let onsets = extractor.onsets();
        assert_eq!(onsets.len(), 1);
        assert!((onsets[0].time_seconds - 0.01).abs() < 1e-9);
        assert!((onsets[0].peak_rms - 0.7).abs() < 1e-6);
        assert!(!onsets[0].is_peak);
    }

    #[test]
    fn test_rejects_mismatched_rate_and_bad_config() {
        assert!(OnsetExtractor::new(0, 1024, 0.0, 0.0).is_err());
        assert!(OnsetExtractor::new(44100, 0, 0.0, 0.0).is_err());

        let mut extractor = OnsetExtractor::new(44100, 1024, 0.0, 0.0).unwrap();
        let samples = vec![0.0f32; 100];
        let channels = [samples.as_slice()];
        let block = PcmBlock::new(&channels, 100, 48000).unwrap();
        assert!(matches!(
            extractor.push_block(&block),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut extractor = OnsetExtractor::new(44100, 1024, 1e-4, 0.1).unwrap();
        extractor.push_samples(&generate_kick_pattern(2.0, 120.0, 44100.0, 100.0));
        assert!(!extractor.onsets().is_empty());

        extractor.reset();
        assert_eq!(extractor.samples_seen(), 0);
        assert!(extractor.rms_values().is_empty());
        assert!(extractor.onsets().is_empty());
    }
}
