//! Local-maximum onset picking on an RMS curve

use super::Onset;

/// Find onsets as local maxima of an RMS curve
///
/// A window is a peak when its RMS exceeds both neighbours and the threshold
/// `max(floor, bias * max_rms)`. The first and last windows have only one
/// neighbour and are never peaks.
///
/// # Arguments
///
/// * `rms` - One RMS value per window
/// * `window_size` - Window length in samples
/// * `sample_rate` - Sample rate in Hz
/// * `floor` - Absolute RMS floor
/// * `bias` - Threshold relative to the loudest window (0.0-1.0)
///
/// # Returns
///
/// Peaks in time order, `time_seconds = index * window_size / sample_rate`
pub fn detect_peaks(
    rms: &[f32],
    window_size: usize,
    sample_rate: u32,
    floor: f32,
    bias: f32,
) -> Vec<Onset> {
    if rms.len() < 3 || sample_rate == 0 {
        return Vec::new();
    }

    let max_rms = rms.iter().copied().fold(0.0f32, f32::max);
    let threshold = floor.max(bias * max_rms);

    log::debug!(
        "Picking RMS peaks: {} windows, max={:.6}, threshold={:.6}",
        rms.len(),
        max_rms,
        threshold
    );

    let seconds_per_window = window_size as f64 / sample_rate as f64;
    rms.windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .map(|(i, w)| Onset {
            time_seconds: (i + 1) as f64 * seconds_per_window,
            peak_rms: w[1],
            is_peak: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_interior_peaks() {
        let rms = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        let peaks = detect_peaks(&rms, 441, 44100, 0.0, 0.0);
        let times: Vec<f64> = peaks.iter().map(|p| p.time_seconds).collect();
        assert_eq!(peaks.len(), 2);
        assert!((times[0] - 0.02).abs() < 1e-9);
        assert!((times[1] - 0.05).abs() < 1e-9);
        assert!(peaks.iter().all(|p| p.is_peak));
    }

    #[test]
    fn test_loud_edges_are_not_peaks() {
        // Starts and ends loud; only the interior bump counts
        let rms = vec![1.0, 0.5, 0.3, 0.6, 0.4, 0.5, 0.8];
        let peaks = detect_peaks(&rms, 100, 1000, 0.0, 0.0);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].time_seconds - 0.3).abs() < 1e-9);

        assert!(detect_peaks(&[0.2, 0.9], 100, 1000, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_bias_and_floor_suppress_small_peaks() {
        let rms = vec![0.0, 1.0, 0.0, 0.05, 0.0, 0.5, 0.0];
        assert_eq!(detect_peaks(&rms, 1, 1, 0.0, 0.0).len(), 3);
        assert_eq!(detect_peaks(&rms, 1, 1, 0.0, 0.1).len(), 2);
        assert_eq!(detect_peaks(&rms, 1, 1, 0.6, 0.0).len(), 1);
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let rms = vec![0.0, 0.5, 0.5, 0.0];
        assert!(detect_peaks(&rms, 1, 1, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_silence_and_short_input() {
        assert!(detect_peaks(&[0.0; 16], 1024, 44100, 0.0, 0.0).is_empty());
        assert!(detect_peaks(&[0.5], 1024, 44100, 0.0, 0.0).is_empty());
        assert!(detect_peaks(&[0.1, 0.5], 1024, 44100, 0.0, 0.0).is_empty());
        assert!(detect_peaks(&[], 1024, 44100, 0.0, 0.0).is_empty());
    }
}
