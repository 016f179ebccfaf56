//! Feature extraction modules
//!
//! - Onset extraction from windowed RMS energy
//! - Beat interval candidates and their reduction
//! - Tempo detection trees

pub mod interval;
pub mod onset;
pub mod tempo_tree;
