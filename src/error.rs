//! Error types for the lesion refinement pipeline
//!
//! Fatal conditions only: geometry violations and invalid configuration are
//! rejected before any voxel is touched. Non-fatal conditions (empty mask
//! region, zero surviving components, no priors supplied) are reported as
//! warnings or report notes, never as errors.

use thiserror::Error;

/// Errors surfaced by the refinement pipeline and its stages
#[derive(Debug, Error)]
pub enum LesionError {
    /// Two co-registered inputs do not share dimensions, spacing or affine
    #[error("geometry mismatch between '{left}' and '{right}': inputs must be co-registered to the same grid")]
    GeometryMismatch { left: String, right: String },

    /// Buffer length does not match the declared dimensions
    #[error("buffer length {actual} does not match dimensions (expected {expected} voxels)")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration rejected before any grid is touched
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Volume file could not be read or decoded
    #[error("I/O error: {0}")]
    Io(String),
}
