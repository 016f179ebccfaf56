//! # Tempo Tree
//!
//! Offline tempo (BPM) detection from decoded PCM, built on explicit
//! evidence: every tempo hypothesis records which onset pairs it explains.
//!
//! ## Features
//!
//! - **Spectral framing**: streaming STFT over arbitrary block sizes with
//!   overlap-add resynthesis and pluggable spectral processors
//! - **Onset extraction**: windowed RMS energy with local-peak picking
//! - **Beat intervals**: inter-onset candidates merged and combined by
//!   similarity and small rational ratios
//! - **Tempo trees**: hypotheses related by 2, 1.5, 3 and 6 gathered into
//!   families; the best supported family gives the beat period
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempo_tree::{detect_tempo, AnalysisConfig};
//!
//! // Load audio samples (mono, f32)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let estimate = detect_tempo(&samples, sample_rate, AnalysisConfig::default())?;
//! println!("BPM: {:.2} (confidence: {:.2})", estimate.bpm, estimate.confidence);
//! # Ok::<(), tempo_tree::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PCM blocks → [low-pass resynthesis] → onsets → beat intervals → tempo trees → BPM
//! ```
//!
//! Decoding is left to the caller; blocks enter through [`io::PcmBlock`] and
//! are streamed into an [`AnalysisPipeline`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod spectral;

// Re-export main types
pub use analysis::{fold_bpm, AnalysisFlag, AnalysisMetadata, AnalysisPipeline, TempoAnalysis, TempoEstimate};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::interval::BeatInterval;
pub use features::onset::Onset;
pub use features::tempo_tree::{TempoDetectionNode, TempoDetectionTree};

use io::PcmBlock;

/// Detect the tempo of a mono buffer
///
/// Streams `samples` through an [`AnalysisPipeline`] in blocks of
/// `config.max_block_frames`.
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `TempoEstimate` with the folded BPM, beat period and confidence
///
/// # Errors
///
/// - `InvalidInput` for a zero sample rate
/// - `ConfigurationError` if `config` fails validation
/// - `ProcessingError` for empty, silent or onset-free input
///
/// # Example
///
/// ```no_run
/// use tempo_tree::{detect_tempo, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// assert!(detect_tempo(&samples, 44100, AnalysisConfig::default()).is_err());
/// ```
pub fn detect_tempo(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<TempoEstimate, AnalysisError> {
    log::debug!("Starting tempo detection: {} samples at {} Hz", samples.len(), sample_rate);

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }

    let block_frames = config.max_block_frames;
    let mut pipeline = AnalysisPipeline::new(config)?;
    for chunk in samples.chunks(block_frames) {
        let channels = [chunk];
        pipeline.push_block(&PcmBlock::new(&channels, chunk.len(), sample_rate)?)?;
    }
    pipeline.finish()
}
