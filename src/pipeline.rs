//! Lesion refinement pipeline
//!
//! Orchestrates the refinement stages in a fixed linear order:
//! distribution estimate (statistical mode only) -> threshold segmentation
//! -> neighborhood consistency filter -> connected-component labeling with
//! size pruning -> optional anatomical region assignment. Produces a label
//! grid plus a structured report.

use log::{debug, info};
use serde::Serialize;

use crate::components::{label_components, relabel_by_size, ConnectedComponent};
use crate::error::LesionError;
use crate::regions::{assign_regions, RegionAssignment};
use crate::spatial::consistency_filter;
use crate::stats::{estimate_distribution, DistributionStats};
use crate::threshold::{segment, statistical_threshold};
use crate::volume::{IntensityGrid, LabelGrid, MaskGrid};

/// How the candidate threshold is obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ThresholdMode {
    /// `mu + gamma * sigma` over the reference-mask intensity distribution
    Statistical {
        /// Sensitivity multiplier, typically 1.0 to 3.5
        gamma: f64,
    },
    /// Fixed cutoff on a probability or contrast map, in [0, 1]
    Direct {
        cutoff: f64,
    },
}

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefinementConfig {
    /// Threshold source for candidate segmentation
    pub threshold: ThresholdMode,
    /// Minimum 27-neighborhood match ratio against the tissue mask, in [0, 1]
    pub min_ratio: f64,
    /// Minimum component size in voxels; smaller components are discarded
    pub min_voxels: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        RefinementConfig {
            threshold: ThresholdMode::Statistical { gamma: 2.0 },
            min_ratio: 0.5,
            min_voxels: 3,
        }
    }
}

impl RefinementConfig {
    /// Reject out-of-range parameters before any grid is touched
    pub fn validate(&self) -> Result<(), LesionError> {
        match self.threshold {
            ThresholdMode::Statistical { gamma } => {
                if !gamma.is_finite() || gamma <= 0.0 {
                    return Err(LesionError::InvalidConfig(format!(
                        "sensitivity multiplier gamma must be a positive finite number, got {gamma}"
                    )));
                }
            }
            ThresholdMode::Direct { cutoff } => {
                if !(0.0..=1.0).contains(&cutoff) || cutoff.is_nan() {
                    return Err(LesionError::InvalidConfig(format!(
                        "direct threshold cutoff must be in [0, 1], got {cutoff}"
                    )));
                }
            }
        }
        if !(0.0..=1.0).contains(&self.min_ratio) || self.min_ratio.is_nan() {
            return Err(LesionError::InvalidConfig(format!(
                "neighborhood match ratio must be in [0, 1], got {}",
                self.min_ratio
            )));
        }
        Ok(())
    }
}

/// Input grids for one pipeline invocation
///
/// All grids must be co-registered. `reference_mask` feeds the distribution
/// estimate and is required in statistical mode only. `priors` is the
/// ordered anatomical-region list; leave it empty to get a binary mask.
pub struct RefinementInputs<'a> {
    /// Intensity volume (statistical mode) or probability map (direct mode)
    pub intensity: &'a IntensityGrid,
    /// Reference tissue mask for the distribution estimate (e.g. gray matter)
    pub reference_mask: Option<&'a MaskGrid>,
    /// Target tissue mask for the consistency filter (e.g. white matter)
    pub tissue_mask: &'a MaskGrid,
    /// Ordered anatomical priors for region coding
    pub priors: &'a [MaskGrid],
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RefinementReport {
    /// Distribution parameters (statistical mode only)
    pub stats: Option<DistributionStats>,
    /// Threshold that produced the candidate mask
    pub threshold: f64,
    /// Components found before size pruning
    pub raw_components: usize,
    /// Components surviving the size cutoff
    pub surviving_components: usize,
    /// Surviving components, rank order (largest first)
    pub components: Vec<ConnectedComponent>,
    /// Component-to-region assignments (empty when no priors were supplied)
    pub assignments: Vec<RegionAssignment>,
    /// Total lesion load in mm^3
    pub total_volume_mm3: f64,
    /// Total lesion load in mL (mm^3 / 1000)
    pub total_volume_ml: f64,
    /// Non-fatal conditions observed during the run
    pub notes: Vec<String>,
}

/// Result of one pipeline run: the output label grid and its report
pub struct RefinementOutput {
    /// Binary lesion mask (no priors) or region-coded label map
    pub label_map: LabelGrid,
    pub report: RefinementReport,
}

/// The lesion candidate refinement pipeline
///
/// Stateless between invocations; a single configuration can process any
/// number of subjects.
#[derive(Debug, Clone, Default)]
pub struct LesionRefinementPipeline {
    config: RefinementConfig,
}

impl LesionRefinementPipeline {
    /// Create a pipeline with a validated configuration
    ///
    /// # Errors
    /// Returns [`LesionError::InvalidConfig`] for out-of-range parameters.
    pub fn new(config: RefinementConfig) -> Result<Self, LesionError> {
        config.validate()?;
        Ok(LesionRefinementPipeline { config })
    }

    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    /// Run the full refinement chain on one subject
    ///
    /// # Errors
    /// Fatal conditions only: invalid configuration, missing reference mask
    /// in statistical mode, or geometry mismatch between any pair of inputs.
    /// Empty results (no candidates, no surviving components, no overlapping
    /// priors) produce a valid all-zero output with explanatory notes.
    pub fn run(&self, inputs: &RefinementInputs<'_>) -> Result<RefinementOutput, LesionError> {
        let intensity = inputs.intensity;
        intensity.check_geometry("intensity", inputs.tissue_mask, "tissue mask")?;
        if let Some(reference) = inputs.reference_mask {
            intensity.check_geometry("intensity", reference, "reference mask")?;
        }
        for (r, prior) in inputs.priors.iter().enumerate() {
            intensity.check_geometry("intensity", prior, &format!("prior[{r}]"))?;
        }

        let mut notes = Vec::new();

        // Stage 1: threshold derivation
        let (stats, threshold) = match self.config.threshold {
            ThresholdMode::Statistical { gamma } => {
                let reference = inputs.reference_mask.ok_or_else(|| {
                    LesionError::InvalidConfig(
                        "statistical threshold mode requires a reference tissue mask".to_string(),
                    )
                })?;
                let stats = estimate_distribution(intensity, reference)?;
                if stats.is_degenerate() {
                    notes.push("reference mask selected no voxels; threshold degenerates to 0".to_string());
                }
                let thr = statistical_threshold(&stats, gamma);
                info!(
                    "reference intensity distribution: G(mu={:.4}, sigma={:.4}), N={}",
                    stats.mean, stats.std_dev, stats.count
                );
                (Some(stats), thr)
            }
            ThresholdMode::Direct { cutoff } => (None, cutoff),
        };
        info!("hyperintense candidates set to values >= {threshold:.4}");

        // Stage 2: candidate segmentation
        let candidates = segment(intensity, threshold, None);
        debug!("candidate voxels: {}", candidates.count_foreground());

        // Stage 3: spatial consistency against the target tissue
        let filtered = consistency_filter(&candidates, inputs.tissue_mask, self.config.min_ratio)?;
        debug!("candidates after consistency filter: {}", filtered.count_foreground());

        // Stage 4: connected components + size pruning
        let labels = label_components(&filtered);
        let raw_components = labels.data.iter().copied().max().unwrap_or(0) as usize;
        let (ranked, components) = relabel_by_size(&labels, self.config.min_voxels);
        debug!("components: {} raw, {} surviving", raw_components, components.len());
        if raw_components > 0 && components.is_empty() {
            notes.push(format!(
                "all {} component(s) fell below the {}-voxel size cutoff",
                raw_components, self.config.min_voxels
            ));
        }

        // Stage 5: optional region assignment
        let (label_map, assignments) = if inputs.priors.is_empty() {
            // No priors: deliberate early exit with a binary mask
            let binary = ranked.to_binary_mask();
            let mut out = LabelGrid::zeros_like(&ranked);
            for (o, &v) in out.data.iter_mut().zip(binary.data.iter()) {
                *o = v as u32;
            }
            (out, Vec::new())
        } else {
            let (coded, assignments) = assign_regions(&ranked, inputs.priors)?;
            if assignments.len() < components.len() {
                notes.push(format!(
                    "{} component(s) overlap no anatomical prior and were dropped",
                    components.len() - assignments.len()
                ));
            }
            (coded, assignments)
        };

        let total_volume_mm3: f64 = components.iter().map(|c| c.volume_mm3).sum();
        let surviving_components = components.len();
        info!(
            "lesion load: {} component(s), {:.2} mm^3 ({:.4} mL)",
            surviving_components,
            total_volume_mm3,
            total_volume_mm3 / 1000.0
        );

        Ok(RefinementOutput {
            label_map,
            report: RefinementReport {
                stats,
                threshold,
                raw_components,
                surviving_components,
                components,
                assignments,
                total_volume_mm3,
                total_volume_ml: total_volume_mm3 / 1000.0,
                notes,
            },
        })
    }
}
