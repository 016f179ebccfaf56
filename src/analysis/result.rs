//! Analysis result types

use crate::features::interval::BeatInterval;
use crate::features::onset::Onset;
use crate::features::tempo_tree::TempoDetectionTree;
use serde::{Deserialize, Serialize};

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// More than one unrelated tempo family was found
    MultipleTempoFamilies,
    /// The detected period was octave-folded into the BPM range
    OctaveFolded,
    /// Fewer than four onsets survived debouncing
    FewOnsets,
    /// Signal was low-pass filtered before onset extraction
    LowPassApplied,
}

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channels per block
    pub num_channels: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,
}

/// Tempo detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// BPM folded into the configured range
    pub bpm: f32,

    /// Winning beat period in seconds (root of the strongest tempo tree)
    pub period_seconds: f32,

    /// `60 / period_seconds` before folding
    pub raw_bpm: f32,

    /// Winning tree's total count over the sum of all trees' totals (0.0-1.0)
    pub confidence: f32,

    /// Onsets after debouncing
    pub onset_count: usize,

    /// Interval groups after merging and combination
    pub interval_count: usize,

    /// Number of tempo families built
    pub tree_count: usize,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Tempo estimate with the intermediate products it was derived from
#[derive(Debug, Clone)]
pub struct TempoAnalysis {
    /// Final estimate
    pub estimate: TempoEstimate,

    /// Debounced onsets in time order
    pub onsets: Vec<Onset>,

    /// Reduced interval set
    pub intervals: Vec<BeatInterval>,

    /// Every tempo family, strongest first
    pub trees: Vec<TempoDetectionTree>,
}

impl TempoAnalysis {
    /// Strongest tempo family
    pub fn best_tree(&self) -> Option<&TempoDetectionTree> {
        self.trees.first()
    }
}
