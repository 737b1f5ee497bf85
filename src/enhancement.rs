//! Contrast-weighted intensity enhancement
//!
//! Boosts an input volume where a lesion contrast map is bright relative to
//! the background contrast of a reference region. The contrast map is split
//! at a lesion threshold, the sub-threshold part under the region mask gives
//! a baseline, and the baseline-subtracted, unit-rescaled map drives a
//! multiplicative boost of the input.

use log::info;

use crate::error::LesionError;
use crate::volume::{IntensityGrid, MaskGrid};

/// Result of a weighted enhancement run
pub struct EnhancementOutput {
    /// Input volume with the contrast boost applied
    pub enhanced: IntensityGrid,
    /// Baseline (mean background contrast under the region mask)
    pub baseline: f64,
    /// Mean relative enhancement over nonzero output voxels, as a fraction
    /// (0.25 = 25% brighter than the input)
    pub mean_boost: f64,
}

/// Apply a contrast-weighted boost to `input`
///
/// `contrast` is split at `lesion_threshold`: values below it form the
/// background whose mean over the nonzero voxels of `region_mask` is the
/// baseline. The baseline-subtracted contrast is clamped at zero, rescaled
/// to [0, 1] and turned into the per-voxel factor
/// `1 + scaled * (1 + weight_pct / 100)`.
///
/// # Errors
/// Returns [`LesionError::GeometryMismatch`] if the grids are not
/// co-registered, or [`LesionError::InvalidConfig`] for a negative weight.
pub fn weighted_enhancement(
    input: &IntensityGrid,
    contrast: &IntensityGrid,
    region_mask: &MaskGrid,
    lesion_threshold: f64,
    weight_pct: f64,
) -> Result<EnhancementOutput, LesionError> {
    if !weight_pct.is_finite() || weight_pct < 0.0 {
        return Err(LesionError::InvalidConfig(format!(
            "enhancement weight must be a non-negative percentage, got {weight_pct}"
        )));
    }
    input.check_geometry("input", contrast, "contrast map")?;
    input.check_geometry("input", region_mask, "region mask")?;

    // Baseline: mean of nonzero sub-threshold contrast under the region mask
    let mut sum = 0.0;
    let mut count = 0usize;
    for (&c, &m) in contrast.data.iter().zip(region_mask.data.iter()) {
        if m != 0 && c < lesion_threshold && c != 0.0 {
            sum += c;
            count += 1;
        }
    }
    let baseline = if count > 0 { sum / count as f64 } else { 0.0 };
    info!("region mean contrast: {baseline:.4}");

    // Baseline-subtracted contrast, clamped at zero, rescaled to [0, 1]
    let mut shifted = IntensityGrid::zeros_like(contrast);
    for (o, &c) in shifted.data.iter_mut().zip(contrast.data.iter()) {
        let v = c - baseline;
        *o = if v > 0.0 { v } else { 0.0 };
    }
    let scaled = shifted.rescale_to_unit();

    // Multiplicative boost of the input
    let gain = weight_pct / 100.0 + 1.0;
    let mut enhanced = IntensityGrid::zeros_like(input);
    for ((e, &v), &s) in enhanced.data.iter_mut().zip(input.data.iter()).zip(scaled.data.iter()) {
        *e = v * (s * gain + 1.0);
    }

    // Mean relative enhancement over nonzero output voxels
    let mut boost_sum = 0.0;
    let mut boosted = 0usize;
    for (&e, &v) in enhanced.data.iter().zip(input.data.iter()) {
        if e != 0.0 {
            boost_sum += e / v - 1.0;
            boosted += 1;
        }
    }
    let mean_boost = if boosted > 0 { boost_sum / boosted as f64 } else { 0.0 };
    info!("mean image contrast enhancement: {:.2}%", mean_boost * 100.0);

    Ok(EnhancementOutput { enhanced, baseline, mean_boost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::IDENTITY_AFFINE;

    const DIMS: (usize, usize, usize) = (4, 4, 1);

    fn grid(values: Vec<f64>) -> IntensityGrid {
        IntensityGrid::from_vec(values, DIMS, (1.0, 1.0, 1.0), IDENTITY_AFFINE).unwrap()
    }

    fn full_mask() -> MaskGrid {
        let mut m = MaskGrid::zeros(DIMS, (1.0, 1.0, 1.0), IDENTITY_AFFINE);
        for v in m.data.iter_mut() {
            *v = 1;
        }
        m
    }

    #[test]
    fn test_baseline_from_background_only() {
        // Background contrast 0.2 everywhere, one lesion voxel at 0.9 which
        // lies above the threshold and must not pull the baseline up
        let mut contrast_vals = vec![0.2; 16];
        contrast_vals[5] = 0.9;
        let contrast = grid(contrast_vals);
        let input = grid(vec![100.0; 16]);

        let out = weighted_enhancement(&input, &contrast, &full_mask(), 0.5, 40.0).unwrap();
        assert!((out.baseline - 0.2).abs() < 1e-12, "baseline was {}", out.baseline);
    }

    #[test]
    fn test_lesion_voxel_gets_max_boost() {
        let mut contrast_vals = vec![0.2; 16];
        contrast_vals[5] = 0.9;
        let contrast = grid(contrast_vals);
        let input = grid(vec![100.0; 16]);

        let out = weighted_enhancement(&input, &contrast, &full_mask(), 0.5, 40.0).unwrap();
        // Lesion voxel carries the rescaled maximum (1.0): factor 1 + 1.4
        assert!((out.enhanced.data[5] - 240.0).abs() < 1e-9, "got {}", out.enhanced.data[5]);
        // Background voxels rescale to 0: unchanged
        assert!((out.enhanced.data[0] - 100.0).abs() < 1e-9);
        assert!(out.mean_boost > 0.0);
    }

    #[test]
    fn test_zero_weight_still_boosts_by_contrast() {
        // weight 0 leaves the gain at 1, so the lesion voxel doubles at most
        let mut contrast_vals = vec![0.1; 16];
        contrast_vals[3] = 0.8;
        let contrast = grid(contrast_vals);
        let input = grid(vec![10.0; 16]);
        let out = weighted_enhancement(&input, &contrast, &full_mask(), 0.5, 0.0).unwrap();
        assert!((out.enhanced.data[3] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let contrast = grid(vec![0.1; 16]);
        let input = grid(vec![1.0; 16]);
        assert!(weighted_enhancement(&input, &contrast, &full_mask(), 0.5, -1.0).is_err());
    }

    #[test]
    fn test_empty_region_gives_zero_baseline() {
        let contrast = grid(vec![0.3; 16]);
        let input = grid(vec![1.0; 16]);
        let empty = MaskGrid::zeros(DIMS, (1.0, 1.0, 1.0), IDENTITY_AFFINE);
        let out = weighted_enhancement(&input, &contrast, &empty, 0.5, 10.0).unwrap();
        assert_eq!(out.baseline, 0.0);
    }
}
