//! Configuration parameters for tempo analysis

use crate::error::AnalysisError;

/// Analysis configuration parameters
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // Spectral framing
    /// FFT size for the spectral framer, must be a power of two (default: 2048)
    pub fft_size: usize,

    /// Hop size between spectral frames, must not exceed `fft_size` (default: 512)
    pub hop_size: usize,

    /// Largest block the pipeline forwards to the framer in one call (default: 4096)
    pub max_block_frames: usize,

    /// Optional spectral low-pass applied before onset extraction (default: None)
    ///
    /// Keeping only the low end emphasises kick and bass attacks.
    pub low_pass_hz: Option<f32>,

    // Onset extraction
    /// Non-overlapping RMS window in samples (default: 1024)
    pub rms_window_size: usize,

    /// Absolute RMS floor a peak must exceed (default: 1e-4)
    pub peak_floor: f32,

    /// Peak threshold relative to the loudest window, 0.0-1.0 (default: 0.1)
    pub peak_bias: f32,

    // Interval candidates
    /// Onsets closer than this (seconds) are folded together (default: 0.05)
    pub min_onset_separation: f64,

    /// Shortest inter-onset interval considered a tempo period (default: 0.25 s)
    pub min_interval: f32,

    /// Longest inter-onset interval considered a tempo period (default: 2.0 s)
    pub max_interval: f32,

    /// Relative tolerance for an interval to explain an onset gap (default: 0.04)
    pub explain_tolerance: f32,

    // Interval reduction
    /// Similarity needed to merge two raw intervals, 0.0-1.0 (default: 0.97)
    pub merge_similarity: f32,

    /// Minimum explained-fraction gain for committing a combination (default: 0.05)
    pub combine_margin: f32,

    /// Maximum ratio error accepted for a combination (default: 0.05)
    pub combine_tolerance: f32,

    // Tempo tree
    /// Fractional band around each rational ratio in the tree (default: 0.05)
    pub tree_tolerance: f32,

    // Reporting
    /// Lower edge of the BPM reporting range (default: 60.0)
    pub min_bpm: f32,

    /// Upper edge of the BPM reporting range (default: 180.0)
    pub max_bpm: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            max_block_frames: 4096,
            low_pass_hz: None,
            rms_window_size: 1024,
            peak_floor: 1e-4,
            peak_bias: 0.1,
            min_onset_separation: 0.05,
            min_interval: 0.25,
            max_interval: 2.0,
            explain_tolerance: 0.04,
            merge_similarity: 0.97,
            combine_margin: 0.05,
            combine_tolerance: 0.05,
            tree_tolerance: 0.05,
            min_bpm: 60.0,
            max_bpm: 180.0,
        }
    }
}

impl AnalysisConfig {
    /// Check the configuration for inconsistent values
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 2 {
            return Err(AnalysisError::ConfigurationError(format!(
                "FFT size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }

        if self.hop_size == 0 || self.hop_size > self.fft_size {
            return Err(AnalysisError::ConfigurationError(format!(
                "Hop size must be in 1..={}, got {}",
                self.fft_size, self.hop_size
            )));
        }

        if self.max_block_frames == 0 {
            return Err(AnalysisError::ConfigurationError(
                "Max block frames must be > 0".to_string(),
            ));
        }

        if let Some(cutoff) = self.low_pass_hz {
            if !(cutoff > 0.0) {
                return Err(AnalysisError::ConfigurationError(format!(
                    "Low-pass cutoff must be > 0 Hz, got {}",
                    cutoff
                )));
            }
        }

        if self.rms_window_size == 0 {
            return Err(AnalysisError::ConfigurationError(
                "RMS window size must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.peak_bias) {
            return Err(AnalysisError::ConfigurationError(format!(
                "Peak bias must be in [0, 1], got {}",
                self.peak_bias
            )));
        }

        if self.min_interval <= 0.0 || self.max_interval <= self.min_interval {
            return Err(AnalysisError::ConfigurationError(format!(
                "Invalid interval range: [{}, {}]",
                self.min_interval, self.max_interval
            )));
        }

        if !(0.0..=1.0).contains(&self.merge_similarity) {
            return Err(AnalysisError::ConfigurationError(format!(
                "Merge similarity must be in [0, 1], got {}",
                self.merge_similarity
            )));
        }

        for (name, value) in [
            ("explain tolerance", self.explain_tolerance),
            ("combine tolerance", self.combine_tolerance),
            ("tree tolerance", self.tree_tolerance),
        ] {
            // Wider bands would let the 1.5x and 2x ratios overlap.
            if !(0.0..0.15).contains(&value) {
                return Err(AnalysisError::ConfigurationError(format!(
                    "{} must be in [0, 0.15), got {}",
                    name, value
                )));
            }
        }

        if self.min_bpm <= 0.0 || self.max_bpm < self.min_bpm * 2.0 {
            return Err(AnalysisError::ConfigurationError(format!(
                "BPM range [{:.1}, {:.1}] must span at least one octave",
                self.min_bpm, self.max_bpm
            )));
        }

        Ok(())
    }
}
