//! Onset extraction
//!
//! Beat-like attacks are located as local maxima of windowed RMS energy:
//! - Windowed RMS helpers
//! - Peak picking with an absolute floor and a relative bias
//! - Streaming extractor over decoded blocks

pub mod extractor;
pub mod peaks;
pub mod rms;

pub use extractor::OnsetExtractor;

use serde::{Deserialize, Serialize};

/// Detected onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Onset {
    /// Onset time in seconds
    pub time_seconds: f64,

    /// RMS of the window the onset was found in
    pub peak_rms: f32,

    /// True for a local RMS maximum, false for a fallback candidate
    pub is_peak: bool,
}

/// Fold onsets that follow the previously kept onset too closely
///
/// The kept onset retains its (earlier) time and takes the larger RMS of the
/// two. Input is expected in time order.
///
/// # Arguments
///
/// * `onsets` - Onsets sorted by time
/// * `min_separation` - Minimum distance in seconds between kept onsets
pub fn debounce_onsets(onsets: &[Onset], min_separation: f64) -> Vec<Onset> {
    let mut kept: Vec<Onset> = Vec::with_capacity(onsets.len());

    for onset in onsets {
        match kept.last_mut() {
            Some(last) if onset.time_seconds - last.time_seconds < min_separation => {
                last.peak_rms = last.peak_rms.max(onset.peak_rms);
                last.is_peak |= onset.is_peak;
            }
            _ => kept.push(*onset),
        }
    }

    if kept.len() != onsets.len() {
        log::debug!(
            "Debounced onsets: {} -> {} (min separation {:.3}s)",
            onsets.len(),
            kept.len(),
            min_separation
        );
    }

    kept
}
