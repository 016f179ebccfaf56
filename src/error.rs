//! Error types for the tempo detection engine

use std::collections::TryReserveError;
use std::fmt;

/// Errors that can occur while configuring or running tempo analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid construction parameters (FFT size, hop size, channel count, ...)
    ConfigurationError(String),

    /// Scratch buffer allocation failed
    AllocationFailure(String),

    /// Malformed input at the pipeline boundary
    InvalidInput(String),

    /// Analysis ran to completion but could not produce a result
    ProcessingError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AnalysisError::AllocationFailure(msg) => write!(f, "Allocation failure: {}", msg),
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<TryReserveError> for AnalysisError {
    fn from(err: TryReserveError) -> Self {
        AnalysisError::AllocationFailure(err.to_string())
    }
}

/// Allocate a zero-filled buffer, reporting allocation failure instead of aborting
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>, AnalysisError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, T::default());
    Ok(buffer)
}
