//! Tempo analysis orchestration and result types
//!
//! - Streaming pipeline from PCM blocks to a tempo estimate
//! - BPM octave folding
//! - Result and metadata types

pub mod pipeline;
pub mod result;

pub use pipeline::{fold_bpm, AnalysisPipeline};
pub use result::{AnalysisFlag, AnalysisMetadata, TempoAnalysis, TempoEstimate};
