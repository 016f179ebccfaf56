//! Fixed-capacity circular sample buffer
//!
//! Positions are absolute stream indices; the buffer maps them onto storage
//! with `position & mask`. Capacity is always a power of two, so a position
//! wraps every `capacity` samples and two positions exactly one capacity apart
//! share a slot. Callers keep the distance between their oldest live
//! position and their newest written position within one capacity.

use crate::error::{try_zeroed, AnalysisError};

/// Power-of-two ring of `f32` samples addressed by absolute position
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    data: Vec<f32>,
    mask: usize,
}

impl CircularBuffer {
    /// Allocate a zeroed buffer holding at least `min_len` samples
    ///
    /// The capacity is rounded up to the next power of two.
    pub fn with_min_capacity(min_len: usize) -> Result<Self, AnalysisError> {
        let capacity = min_len.max(1).checked_next_power_of_two().ok_or_else(|| {
            AnalysisError::AllocationFailure(format!(
                "Circular buffer of {} samples overflows",
                min_len
            ))
        })?;
        Ok(Self {
            data: try_zeroed(capacity)?,
            mask: capacity - 1,
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Index mask (`capacity - 1`)
    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Sample stored for an absolute position
    pub fn get(&self, position: usize) -> f32 {
        self.data[position & self.mask]
    }

    /// Split `len` slots starting at `position` into at most two contiguous ranges
    fn segments(&self, position: usize, len: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        debug_assert!(len <= self.capacity(), "span {} exceeds capacity", len);
        let start = position & self.mask;
        let first = len.min(self.capacity() - start);
        (start..start + first, 0..len - first)
    }

    /// Overwrite slots starting at `position` with `src`
    pub fn write(&mut self, position: usize, src: &[f32]) {
        let (a, b) = self.segments(position, src.len());
        let split = a.len();
        self.data[a].copy_from_slice(&src[..split]);
        self.data[b].copy_from_slice(&src[split..]);
    }

    /// Copy slots starting at `position` into `dst`
    pub fn read(&self, position: usize, dst: &mut [f32]) {
        let (a, b) = self.segments(position, dst.len());
        let split = a.len();
        dst[..split].copy_from_slice(&self.data[a]);
        dst[split..].copy_from_slice(&self.data[b]);
    }

    /// Add `src` onto slots starting at `position` (overlap-add)
    pub fn accumulate(&mut self, position: usize, src: &[f32]) {
        let (a, b) = self.segments(position, src.len());
        let split = a.len();
        for (slot, &s) in self.data[a].iter_mut().zip(&src[..split]) {
            *slot += s;
        }
        for (slot, &s) in self.data[b].iter_mut().zip(&src[split..]) {
            *slot += s;
        }
    }

    /// Read slots into `dst`, then zero them so they can be accumulated again
    pub fn take(&mut self, position: usize, dst: &mut [f32]) {
        self.read(position, dst);
        self.zero_range(position, dst.len());
    }

    /// Zero `len` slots starting at `position`
    pub fn zero_range(&mut self, position: usize, len: usize) {
        let (a, b) = self.segments(position, len);
        self.data[a].fill(0.0);
        self.data[b].fill(0.0);
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}
