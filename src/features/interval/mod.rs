//! Beat interval hypotheses
//!
//! Inter-onset distances become [`BeatInterval`] candidates carrying the
//! onset pairs they explain. Candidates are then reduced:
//! - Merging of near-identical lengths
//! - Greedy combination of rationally related lengths

pub mod beat_interval;
pub mod combine;
pub mod pair_set;

pub use beat_interval::{BeatInterval, COMBINE_RELATIONS};
pub use combine::{combine_beat_intervals, merge_beat_intervals};
pub use pair_set::{OnsetPair, PairSet};
