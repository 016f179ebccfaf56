//! Block-by-block tempo analysis
//!
//! Decoded blocks are pushed strictly in order. Each block is optionally
//! low-pass resynthesised through a [`SpectralFramer`], then fed to an
//! [`OnsetExtractor`]. [`AnalysisPipeline::finish`] runs the interval and
//! tree stages over the complete onset list:
//!
//! ```text
//! onsets → debounce → candidates → merge → combine → nodes → trees → BPM
//! ```
//!
//! # Example
//!
//! ```
//! use tempo_tree::analysis::AnalysisPipeline;
//! use tempo_tree::io::PcmBlock;
//! use tempo_tree::AnalysisConfig;
//!
//! // Clicks every 0.5 s, aligned to the RMS window
//! let config = AnalysisConfig { rms_window_size: 441, ..Default::default() };
//! let mut samples = vec![0.0f32; 44100 * 6];
//! for beat in 0..12 {
//!     for s in &mut samples[beat * 22050..beat * 22050 + 200] {
//!         *s = 0.8;
//!     }
//! }
//!
//! let mut pipeline = AnalysisPipeline::new(config)?;
//! for chunk in samples.chunks(4096) {
//!     let channels = [chunk];
//!     pipeline.push_block(&PcmBlock::new(&channels, chunk.len(), 44100)?)?;
//! }
//! let estimate = pipeline.finish()?;
//! assert!((estimate.bpm - 120.0).abs() < 1.0);
//! # Ok::<(), tempo_tree::AnalysisError>(())
//! ```

use super::result::{AnalysisFlag, AnalysisMetadata, TempoAnalysis, TempoEstimate};
use crate::config::AnalysisConfig;
use crate::error::{try_zeroed, AnalysisError};
use crate::features::interval::{combine_beat_intervals, merge_beat_intervals, BeatInterval};
use crate::features::onset::{debounce_onsets, OnsetExtractor};
use crate::features::tempo_tree::{build_trees, TempoDetectionNode};
use crate::io::PcmBlock;
use crate::preprocessing::channel_mixer::mix_to_mono;
use crate::spectral::{FramerConfig, LowPassFilter, SpectralFramer};
use std::time::{Duration, Instant};

/// Fold a BPM by octaves into `[min_bpm, max_bpm]`
///
/// Non-finite or non-positive values are returned unchanged. With a range
/// narrower than one octave the result may still fall outside it.
pub fn fold_bpm(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    if !bpm.is_finite() || bpm <= 0.0 || min_bpm <= 0.0 {
        return bpm;
    }
    let mut folded = bpm;
    while folded < min_bpm {
        folded *= 2.0;
    }
    while folded > max_bpm {
        folded /= 2.0;
    }
    folded
}

/// Low-pass resynthesis ahead of onset extraction
#[derive(Debug)]
struct FilterStage {
    framer: SpectralFramer,
    filter: LowPassFilter,
    /// Resynthesised mono scratch, `max_block_frames` long
    output: Vec<f32>,
    /// Leading output samples still owed to the framer latency
    to_skip: usize,
}

impl FilterStage {
    fn new(config: &AnalysisConfig, cutoff_hz: f32, sample_rate: u32) -> Result<Self, AnalysisError> {
        let framer = SpectralFramer::new(FramerConfig {
            fft_size: config.fft_size,
            hop_size: config.hop_size,
            num_channels: 1,
            max_frames: config.max_block_frames,
        })?;
        let to_skip = framer.latency();
        Ok(Self {
            framer,
            filter: LowPassFilter::new(cutoff_hz, sample_rate),
            output: try_zeroed(config.max_block_frames)?,
            to_skip,
        })
    }

    /// Filter `mono` and hand the latency-compensated output to `extractor`
    fn run(&mut self, mono: &[f32], extractor: &mut OnsetExtractor) {
        let block = self.output.len();
        for chunk in mono.chunks(block) {
            let n = chunk.len();
            {
                let mut outputs = [&mut self.output[..n]];
                self.framer
                    .process_resynthesize(&[chunk], &mut outputs, n, &mut self.filter);
            }
            let skip = self.to_skip.min(n);
            self.to_skip -= skip;
            extractor.push_samples(&self.output[skip..n]);
        }
    }

    /// Push the latency tail out of the framer
    fn flush(&mut self, extractor: &mut OnsetExtractor) {
        let tail = vec![0.0f32; self.framer.latency()];
        self.run(&tail, extractor);
    }
}

/// Streaming tempo analysis over in-order PCM blocks
///
/// The first block fixes the sample rate and channel count; later blocks
/// must match. Once finished, the pipeline takes no more blocks until
/// [`reset`](Self::reset). Not safe for concurrent use, but independent
/// pipelines share nothing and may run in parallel.
#[derive(Debug)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    extractor: Option<OnsetExtractor>,
    filter: Option<FilterStage>,
    num_channels: usize,
    frames_pushed: usize,
    /// Set once `finish` has flushed the stream
    finished: bool,
    elapsed: Duration,
}

impl AnalysisPipeline {
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `config` fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            extractor: None,
            filter: None,
            num_channels: 0,
            frames_pushed: 0,
            finished: false,
            elapsed: Duration::ZERO,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Frames pushed so far
    pub fn frames_pushed(&self) -> usize {
        self.frames_pushed
    }

    /// Sample rate fixed by the first block
    pub fn sample_rate(&self) -> Option<u32> {
        self.extractor.as_ref().map(|e| e.sample_rate())
    }

    /// Feed the next decoded block
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the block's sample rate or channel count differs
    ///   from the first block, or if the stream was already finished
    /// - `AllocationFailure` if the filter stage cannot be allocated
    pub fn push_block(&mut self, block: &PcmBlock<'_>) -> Result<(), AnalysisError> {
        let started = Instant::now();

        if self.finished {
            return Err(AnalysisError::InvalidInput(
                "Stream already finished; call reset() to analyse another".to_string(),
            ));
        }
        if self.extractor.is_none() {
            self.start(block)?;
        }
        if block.num_channels() != self.num_channels {
            return Err(AnalysisError::InvalidInput(format!(
                "Block has {} channels, stream started with {}",
                block.num_channels(),
                self.num_channels
            )));
        }

        let extractor = self.extractor.as_mut().ok_or_else(|| {
            AnalysisError::ProcessingError("Onset extractor not initialised".to_string())
        })?;

        match self.filter.as_mut() {
            Some(stage) => {
                if block.sample_rate() != extractor.sample_rate() {
                    return Err(AnalysisError::InvalidInput(format!(
                        "Block sample rate {} Hz does not match stream rate {} Hz",
                        block.sample_rate(),
                        extractor.sample_rate()
                    )));
                }
                let mono = mix_to_mono(block.channels(), block.frame_count());
                stage.run(&mono, extractor);
            }
            None => extractor.push_block(block)?,
        }

        self.frames_pushed += block.frame_count();
        self.elapsed += started.elapsed();
        Ok(())
    }

    fn start(&mut self, block: &PcmBlock<'_>) -> Result<(), AnalysisError> {
        let sample_rate = block.sample_rate();
        self.num_channels = block.num_channels();
        self.extractor = Some(OnsetExtractor::new(
            sample_rate,
            self.config.rms_window_size,
            self.config.peak_floor,
            self.config.peak_bias,
        )?);
        if let Some(cutoff) = self.config.low_pass_hz {
            self.filter = Some(FilterStage::new(&self.config, cutoff, sample_rate)?);
        }

        log::debug!(
            "Tempo analysis started: {} Hz, {} channels, low-pass {:?}",
            sample_rate,
            self.num_channels,
            self.config.low_pass_hz
        );
        Ok(())
    }

    /// Finish the stream and estimate its tempo
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError` if nothing was pushed or the signal holds too
    /// few onsets or intervals for a tempo.
    pub fn finish(&mut self) -> Result<TempoEstimate, AnalysisError> {
        self.finish_with_details().map(|analysis| analysis.estimate)
    }

    /// Like [`finish`](Self::finish), also returning onsets, intervals and trees
    ///
    /// # Errors
    ///
    /// Same as [`finish`](Self::finish).
    pub fn finish_with_details(&mut self) -> Result<TempoAnalysis, AnalysisError> {
        let started = Instant::now();
        let config = &self.config;

        let extractor = self.extractor.as_mut().ok_or_else(|| {
            AnalysisError::ProcessingError("No audio was pushed".to_string())
        })?;
        // The filter stage is flushed once; a second finish reuses the onsets
        let filtered = self.config.low_pass_hz.is_some();
        if let Some(mut stage) = self.filter.take() {
            stage.flush(extractor);
        }
        self.finished = true;
        let sample_rate = extractor.sample_rate();

        let onsets = debounce_onsets(&extractor.onsets(), config.min_onset_separation);
        if onsets.len() < 2 {
            return Err(AnalysisError::ProcessingError(format!(
                "Too few onsets for tempo detection: {}",
                onsets.len()
            )));
        }

        let candidates = BeatInterval::candidates_from_onsets(
            &onsets,
            config.min_interval,
            config.max_interval,
            config.explain_tolerance,
        );
        if candidates.is_empty() {
            return Err(AnalysisError::ProcessingError(format!(
                "No inter-onset intervals in [{:.3}, {:.3}]s",
                config.min_interval, config.max_interval
            )));
        }

        let merged = merge_beat_intervals(&candidates, config.merge_similarity);
        let intervals = combine_beat_intervals(merged, config.combine_margin, config.combine_tolerance);

        let nodes: Vec<TempoDetectionNode> = intervals
            .iter()
            .map(|interval| TempoDetectionNode::from_beat_interval(interval, config.tree_tolerance))
            .collect();

        let mut trees = build_trees(&nodes);
        trees.sort_by(|a, b| {
            b.total_count()
                .cmp(&a.total_count())
                .then_with(|| a.root().interval().total_cmp(&b.root().interval()))
        });
        let best = trees.first().ok_or_else(|| {
            AnalysisError::ProcessingError("No tempo tree could be built".to_string())
        })?;

        let period_seconds = best.root().interval();
        let raw_bpm = 60.0 / period_seconds;
        let bpm = fold_bpm(raw_bpm, config.min_bpm, config.max_bpm);

        let all_total: u64 = trees.iter().map(|t| t.total_count()).sum();
        let confidence = if all_total > 0 {
            best.total_count() as f32 / all_total as f32
        } else {
            0.0
        };

        let mut flags = Vec::new();
        if trees.len() > 1 {
            flags.push(AnalysisFlag::MultipleTempoFamilies);
        }
        if bpm != raw_bpm {
            flags.push(AnalysisFlag::OctaveFolded);
        }
        if onsets.len() < 4 {
            flags.push(AnalysisFlag::FewOnsets);
        }
        if filtered {
            flags.push(AnalysisFlag::LowPassApplied);
        }

        self.elapsed += started.elapsed();

        log::debug!(
            "Tempo: {:.2} BPM (raw {:.2}, period {:.4}s, confidence {:.2}) from {} onsets, {} intervals, {} trees",
            bpm,
            raw_bpm,
            period_seconds,
            confidence,
            onsets.len(),
            intervals.len(),
            trees.len()
        );

        let estimate = TempoEstimate {
            bpm,
            period_seconds,
            raw_bpm,
            confidence,
            onset_count: onsets.len(),
            interval_count: intervals.len(),
            tree_count: trees.len(),
            metadata: AnalysisMetadata {
                duration_seconds: self.frames_pushed as f32 / sample_rate as f32,
                sample_rate,
                num_channels: self.num_channels,
                processing_time_ms: self.elapsed.as_secs_f32() * 1000.0,
                algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
                flags,
            },
        };

        Ok(TempoAnalysis {
            estimate,
            onsets,
            intervals,
            trees,
        })
    }

    /// Drop all stream state so the pipeline can analyse another stream
    pub fn reset(&mut self) {
        self.extractor = None;
        self.filter = None;
        self.num_channels = 0;
        self.frames_pushed = 0;
        self.finished = false;
        self.elapsed = Duration::ZERO;
    }
}
