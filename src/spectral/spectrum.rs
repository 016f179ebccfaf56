//! Multichannel complex spectra handed to spectral processors

use crate::error::{try_zeroed, AnalysisError};
use rustfft::num_complex::Complex;

/// One full-length complex spectrum per channel
///
/// Each spectrum holds `fft_size` bins (DC first, negative frequencies in the
/// upper half), as produced by a complex FFT of a real frame.
#[derive(Debug, Clone)]
pub struct SpectralBufferList {
    spectra: Vec<Vec<Complex<f32>>>,
    fft_size: usize,
}

impl SpectralBufferList {
    /// Allocate zeroed spectra for `num_channels` channels
    pub fn new(num_channels: usize, fft_size: usize) -> Result<Self, AnalysisError> {
        let mut spectra = Vec::new();
        spectra.try_reserve_exact(num_channels)?;
        for _ in 0..num_channels {
            spectra.push(try_zeroed(fft_size)?);
        }
        Ok(Self { spectra, fft_size })
    }

    /// Number of spectra (one per channel)
    pub fn num_spectra(&self) -> usize {
        self.spectra.len()
    }

    /// Bins per spectrum
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Spectrum of one channel
    pub fn spectrum(&self, channel: usize) -> &[Complex<f32>] {
        &self.spectra[channel]
    }

    /// Mutable spectrum of one channel
    pub fn spectrum_mut(&mut self, channel: usize) -> &mut [Complex<f32>] {
        &mut self.spectra[channel]
    }

    /// Iterate over all spectra
    pub fn iter(&self) -> impl Iterator<Item = &[Complex<f32>]> {
        self.spectra.iter().map(Vec::as_slice)
    }

    /// Iterate mutably over all spectra
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [Complex<f32>]> {
        self.spectra.iter_mut().map(Vec::as_mut_slice)
    }

    /// Magnitudes of the non-negative frequency bins (DC to Nyquist) of one channel
    pub fn magnitudes(&self, channel: usize) -> Vec<f32> {
        self.spectra[channel][..=self.fft_size / 2]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    /// True when every bin of every channel is exactly zero
    pub fn is_silent(&self) -> bool {
        self.spectra
            .iter()
            .flatten()
            .all(|c| c.re == 0.0 && c.im == 0.0)
    }

    pub(crate) fn clear(&mut self) {
        for spectrum in self.spectra.iter_mut() {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
    }
}
