//! Windowed RMS energy
//!
//! Divides a buffer into non-overlapping windows (stride = window size) and
//! computes `sqrt(mean(x²))` per window. A trailing partial window is
//! included and averaged over the samples it actually holds.
//!
//! # Example
//!
//! ```
//! use tempo_tree::features::onset::rms::{peak_rms_time, rms_vector};
//!
//! let samples = vec![0.5f32; 2500];
//! let rms = rms_vector(&samples, 1024);
//! assert_eq!(rms.len(), 3);
//!
//! let (time, peak) = peak_rms_time(&samples, 44100, 1024).unwrap();
//! assert_eq!(time, 0.0);
//! assert!((peak - 0.5).abs() < 1e-6);
//! ```

/// RMS of one window
fn window_rms(window: &[f32]) -> f32 {
    let sum_sq: f32 = window.iter().map(|&x| x * x).sum();
    (sum_sq / window.len() as f32).sqrt()
}

/// Compute one RMS value per non-overlapping window
///
/// # Arguments
///
/// * `samples` - Channel samples
/// * `window_size` - Window length and stride in samples
///
/// # Returns
///
/// `ceil(samples.len() / window_size)` values; empty for empty input or a
/// zero window size.
pub fn rms_vector(samples: &[f32], window_size: usize) -> Vec<f32> {
    if samples.is_empty() || window_size == 0 {
        return Vec::new();
    }
    samples.chunks(window_size).map(window_rms).collect()
}

/// Loudest window RMS, 0.0 for empty input
pub fn peak_rms(samples: &[f32], window_size: usize) -> f32 {
    rms_vector(samples, window_size)
        .into_iter()
        .fold(0.0f32, f32::max)
}

/// Start time and RMS of the loudest window
///
/// # Returns
///
/// `Some((time_seconds, rms))` for the first window reaching the maximum, or
/// `None` for empty input, zero sample rate or zero window size.
pub fn peak_rms_time(samples: &[f32], sample_rate: u32, window_size: usize) -> Option<(f64, f32)> {
    if sample_rate == 0 {
        return None;
    }
    let rms = rms_vector(samples, window_size);
    let (index, &peak) = rms
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &f32)>, (i, v)| match best {
            Some((_, b)) if *b >= *v => best,
            _ => Some((i, v)),
        })?;
    Some((index as f64 * window_size as f64 / sample_rate as f64, peak))
}

/// Largest absolute sample value, 0.0 for empty input
pub fn max_magnitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        let samples = vec![-0.25f32; 4096];
        let rms = rms_vector(&samples, 1024);
        assert_eq!(rms.len(), 4);
        for v in rms {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_trailing_partial_window_included() {
        let mut samples = vec![0.0f32; 1024];
        samples.extend(vec![1.0f32; 10]);
        let rms = rms_vector(&samples, 1024);
        assert_eq!(rms.len(), 2);
        assert_eq!(rms[0], 0.0);
        // Partial window averages over its own 10 samples
        assert!((rms[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sine_rms() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 441.0 * i as f32 / 44100.0).sin())
            .collect();
        // 441 Hz at 44.1 kHz: 100 samples per period, 1000 = 10 full periods
        let rms = rms_vector(&samples, 1000);
        for v in rms {
            assert!((v - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        }
    }

    #[test]
    fn test_empty_and_degenerate_inputs() {
        assert!(rms_vector(&[], 1024).is_empty());
        assert!(rms_vector(&[1.0], 0).is_empty());
        assert_eq!(peak_rms(&[], 1024), 0.0);
        assert_eq!(peak_rms_time(&[], 44100, 1024), None);
        assert_eq!(peak_rms_time(&[1.0], 0, 1024), None);
        assert_eq!(max_magnitude(&[]), 0.0);
    }

    #[test]
    fn test_peak_rms_time_finds_loudest_window() {
        let mut samples = vec![0.1f32; 4410 * 4];
        for s in samples[4410 * 2..4410 * 3].iter_mut() {
            *s = 0.9;
        }
        let (time, peak) = peak_rms_time(&samples, 44100, 4410).unwrap();
        assert!((time - 0.2).abs() < 1e-9);
        assert!((peak - 0.9).abs() < 1e-6);
        assert!((peak_rms(&samples, 4410) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_max_magnitude_uses_absolute_value() {
        assert_eq!(max_magnitude(&[0.1, -0.8, 0.5]), 0.8);
    }
}
