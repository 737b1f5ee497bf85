//! Threshold-based candidate segmentation
//!
//! Binarizes an intensity or probability volume against a lower (and
//! optionally upper) threshold. The lower threshold is either supplied
//! directly (e.g. a probability cutoff) or derived from a masked intensity
//! distribution as `mu + gamma * sigma`.

use crate::stats::DistributionStats;
use crate::volume::{IntensityGrid, MaskGrid};

/// Statistical lesion threshold `mu + gamma * sigma`
///
/// `gamma` is the sensitivity multiplier: how many standard deviations above
/// the reference tissue mean a voxel must lie to become a lesion candidate.
#[inline]
pub fn statistical_threshold(stats: &DistributionStats, gamma: f64) -> f64 {
    stats.mean + gamma * stats.std_dev
}

/// Binarize a volume: label 1 where `lower <= v` (and `v <= upper` when an
/// upper bound is given), 0 elsewhere
///
/// Boundary values are inclusive on both ends. Single pass, input untouched.
pub fn segment(grid: &IntensityGrid, lower: f64, upper: Option<f64>) -> MaskGrid {
    let mut out = MaskGrid::zeros_like(grid);
    match upper {
        Some(hi) => {
            for (o, &v) in out.data.iter_mut().zip(grid.data.iter()) {
                if v >= lower && v <= hi {
                    *o = 1;
                }
            }
        }
        None => {
            for (o, &v) in out.data.iter_mut().zip(grid.data.iter()) {
                if v >= lower {
                    *o = 1;
                }
            }
        }
    }
    out
}
