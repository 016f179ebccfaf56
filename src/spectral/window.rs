//! Analysis/synthesis window for overlap-add framing

use crate::error::{try_zeroed, AnalysisError};
use std::f64::consts::PI;

/// Square-root periodic Hann window, normalised for a given hop
///
/// Applied once before the forward FFT and once after the inverse FFT, the
/// squared window overlap-adds to exactly one for any hop that divides
/// `fft_size / 2`. Other hops are normalised by the mean overlap.
pub fn overlap_add_window(fft_size: usize, hop_size: usize) -> Result<Vec<f32>, AnalysisError> {
    let mut window: Vec<f32> = try_zeroed(fft_size)?;

    let hann: Vec<f64> = (0..fft_size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / fft_size as f64).cos()))
        .collect();
    let overlap = hann.iter().sum::<f64>() / hop_size as f64;

    for (w, h) in window.iter_mut().zip(&hann) {
        *w = (h / overlap).sqrt() as f32;
    }

    Ok(window)
}
