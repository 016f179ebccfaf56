//! Brick-wall spectral low-pass
//!
//! Zeroes every bin above a cutoff frequency, together with its mirrored
//! negative-frequency bin, so the resynthesised signal stays real.

use super::framer::{FrameStatus, SpectralProcessor};
use super::spectrum::SpectralBufferList;
use rustfft::num_complex::Complex;

/// Spectral processor keeping only bins at or below a cutoff
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter {
    cutoff_hz: f32,
    sample_rate: f32,
}

impl LowPassFilter {
    /// Create a low-pass for a given sample rate
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        Self {
            cutoff_hz,
            sample_rate: sample_rate as f32,
        }
    }

    /// Cutoff frequency in Hz
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Highest bin kept for an FFT size
    pub fn cutoff_bin(&self, fft_size: usize) -> usize {
        let bin_hz = self.sample_rate / fft_size as f32;
        ((self.cutoff_hz / bin_hz).floor() as usize).min(fft_size / 2)
    }
}

impl SpectralProcessor for LowPassFilter {
    fn process_spectra(&mut self, spectra: &mut SpectralBufferList, fft_size: usize) -> FrameStatus {
        let cutoff = self.cutoff_bin(fft_size);
        for spectrum in spectra.iter_mut() {
            for (k, bin) in spectrum.iter_mut().enumerate() {
                // Bin k and bin fft_size - k carry the same frequency
                if k.min(fft_size - k) > cutoff {
                    *bin = Complex::new(0.0, 0.0);
                }
            }
        }
        FrameStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::framer::{FramerConfig, SpectralFramer};
    use std::f32::consts::PI;

    #[test]
    fn test_cutoff_bin() {
        let filter = LowPassFilter::new(500.0, 44100);
        // 44100 / 2048 = 21.53 Hz per bin
        assert_eq!(filter.cutoff_bin(2048), 23);
        assert_eq!(LowPassFilter::new(1e6, 44100).cutoff_bin(2048), 1024);
    }

    #[test]
    fn test_removes_high_tone_keeps_low_tone() {
        let sample_rate = 44100.0;
        let len = 44100;
        let low: Vec<f32> = (0..len)
            .map(|i| 0.4 * (2.0 * PI * 100.0 * i as f32 / sample_rate).sin())
            .collect();
        let mixed: Vec<f32> = low
            .iter()
            .enumerate()
            .map(|(i, &l)| l + 0.4 * (2.0 * PI * 5000.0 * i as f32 / sample_rate).sin())
            .collect();

        let mut framer = SpectralFramer::new(FramerConfig {
            fft_size: 2048,
            hop_size: 512,
            num_channels: 1,
            max_frames: 4096,
        })
        .unwrap();
        let latency = framer.latency();
        let mut filter = LowPassFilter::new(500.0, 44100);

        let mut output = vec![0.0f32; len];
        framer.process_resynthesize(&[mixed.as_slice()], &mut [output.as_mut_slice()], len, &mut filter);

        let mut max_error = 0.0f32;
        for t in 2048..len - latency {
            max_error = max_error.max((output[t + latency] - low[t]).abs());
        }
        assert!(max_error < 0.05, "residual {}", max_error);
    }
}
