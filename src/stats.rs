//! Masked intensity distribution estimation
//!
//! Computes the mean and standard deviation of an intensity volume over a
//! masked region, e.g. the T2-FLAIR gray matter distribution that drives the
//! statistical lesion threshold.

use log::warn;
use serde::Serialize;

use crate::error::LesionError;
use crate::volume::{IntensityGrid, MaskGrid};

/// Parameters of a masked intensity distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionStats {
    /// Sample mean
    pub mean: f64,
    /// Sample standard deviation (Bessel-corrected)
    pub std_dev: f64,
    /// Number of voxels that entered the estimate
    pub count: usize,
}

impl DistributionStats {
    /// True if the mask selected no voxels and the stats are all-zero
    pub fn is_degenerate(&self) -> bool {
        self.count == 0
    }
}

/// Estimate mean and standard deviation of `intensity` over the nonzero
/// voxels of `mask`
///
/// Eligibility is decided by the mask alone: a zero-valued intensity voxel
/// under a positive mask counts toward N and contributes zero to the sum.
/// The standard deviation uses Bessel's correction (N - 1); with a single
/// sample it is zero.
///
/// An all-zero mask yields `{mean: 0, std_dev: 0, count: 0}` and logs a
/// warning; callers that need a usable threshold must treat this as an
/// upstream input problem.
///
/// # Errors
/// Returns [`LesionError::GeometryMismatch`] if the grids are not
/// co-registered.
pub fn estimate_distribution(
    intensity: &IntensityGrid,
    mask: &MaskGrid,
) -> Result<DistributionStats, LesionError> {
    intensity.check_geometry("intensity", mask, "mask")?;

    // First pass: sum and count over eligible voxels
    let mut sum = 0.0;
    let mut count = 0usize;
    for (&v, &m) in intensity.data.iter().zip(mask.data.iter()) {
        if m != 0 {
            sum += v;
            count += 1;
        }
    }

    if count == 0 {
        warn!("distribution estimate over an empty mask region: returning degenerate stats");
        return Ok(DistributionStats { mean: 0.0, std_dev: 0.0, count: 0 });
    }

    let mean = sum / count as f64;

    // Second pass: centered second moment
    let mut sq_sum = 0.0;
    for (&v, &m) in intensity.data.iter().zip(mask.data.iter()) {
        if m != 0 {
            let d = v - mean;
            sq_sum += d * d;
        }
    }

    let std_dev = if count > 1 {
        (sq_sum / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    Ok(DistributionStats { mean, std_dev, count })
}
