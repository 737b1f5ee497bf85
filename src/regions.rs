//! Anatomical region assignment
//!
//! Partitions labeled lesion components across an ordered list of anatomical
//! prior masks (e.g. periventricular, juxtacortical, infratentorial). A
//! component is assigned to the first prior it overlaps, and its voxels are
//! written to the output as `component_label + prior_index` (0-indexed).

use log::{debug, warn};

use crate::error::LesionError;
use crate::volume::{LabelGrid, MaskGrid};

/// Assignment of one component to one prior region
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RegionAssignment {
    /// Component label in the input grid
    pub component: u32,
    /// 0-based index of the matched prior in the input order
    pub region: usize,
}

/// Assign labeled components to ordered anatomical priors, first match wins
///
/// For each prior in order, every still-unassigned component with at least
/// one voxel overlapping the prior's foreground is copied whole into the
/// output with value `label + prior_index`. Components overlapping no prior
/// stay background. Components are indexed by voxel coordinates in a single
/// pass first, so each overlap test touches only that component's voxels.
///
/// # Errors
/// Returns [`LesionError::GeometryMismatch`] if any prior is not
/// co-registered with the component grid.
pub fn assign_regions(
    components: &LabelGrid,
    priors: &[MaskGrid],
) -> Result<(LabelGrid, Vec<RegionAssignment>), LesionError> {
    for (r, prior) in priors.iter().enumerate() {
        components.check_geometry("components", prior, &format!("prior[{r}]"))?;
    }

    // One pass: voxel-index list per component label
    let max_label = components.data.iter().copied().max().unwrap_or(0) as usize;
    let mut voxels_of: Vec<Vec<usize>> = vec![Vec::new(); max_label + 1];
    for (idx, &l) in components.data.iter().enumerate() {
        if l != 0 {
            voxels_of[l as usize].push(idx);
        }
    }

    let mut out = LabelGrid::zeros_like(components);
    let mut assignments = Vec::new();
    let mut assigned = vec![false; max_label + 1];

    for (r, prior) in priors.iter().enumerate() {
        for label in 1..=max_label {
            if assigned[label] || voxels_of[label].is_empty() {
                continue;
            }
            let overlaps = voxels_of[label].iter().any(|&idx| prior.data[idx] != 0);
            if !overlaps {
                continue;
            }
            assigned[label] = true;
            let coded = label as u32 + r as u32;
            for &idx in &voxels_of[label] {
                out.data[idx] = coded;
            }
            assignments.push(RegionAssignment { component: label as u32, region: r });
            debug!("component {label} assigned to prior region {r}");
        }
    }

    let unassigned = (1..=max_label)
        .filter(|&l| !voxels_of[l].is_empty() && !assigned[l])
        .count();
    if unassigned > 0 {
        warn!("{unassigned} component(s) overlap no prior region and were dropped");
    }

    Ok((out, assignments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::IDENTITY_AFFINE;

    fn label_grid(dims: (usize, usize, usize)) -> LabelGrid {
        LabelGrid::zeros(dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
    }

    fn mask(dims: (usize, usize, usize)) -> MaskGrid {
        MaskGrid::zeros(dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
    }

    #[test]
    fn test_first_match_wins() {
        // One component overlapping both priors: assigned to the earlier one,
        // output value = label + 0
        let mut comp = label_grid((6, 1, 1));
        for i in 1..5 {
            comp.data[i] = 1;
        }
        let mut a = mask((6, 1, 1));
        a.data[2] = 1;
        let mut b = mask((6, 1, 1));
        b.data[3] = 1;

        let (out, assignments) = assign_regions(&comp, &[a, b]).unwrap();
        assert_eq!(assignments, vec![RegionAssignment { component: 1, region: 0 }]);
        for i in 1..5 {
            assert_eq!(out.data[i], 1, "entire component coded as label + 0");
        }
    }

    #[test]
    fn test_region_index_offsets_label() {
        // Component 2 only overlaps the second prior: coded as 2 + 1 = 3
        let mut comp = label_grid((8, 1, 1));
        comp.data[1] = 1;
        comp.data[6] = 2;
        let mut a = mask((8, 1, 1));
        a.data[1] = 1;
        let mut b = mask((8, 1, 1));
        b.data[6] = 1;

        let (out, assignments) = assign_regions(&comp, &[a, b]).unwrap();
        assert_eq!(out.data[1], 1);
        assert_eq!(out.data[6], 3);
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[1], RegionAssignment { component: 2, region: 1 });
    }

    #[test]
    fn test_unmatched_component_dropped() {
        let mut comp = label_grid((4, 1, 1));
        comp.data[0] = 1;
        let prior = mask((4, 1, 1)); // empty: no overlap possible
        let (out, assignments) = assign_regions(&comp, &[prior]).unwrap();
        assert!(assignments.is_empty());
        assert!(out.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_exclusivity() {
        // A component assigned to prior 0 never reappears under prior 1, even
        // though it also overlaps prior 1
        let mut comp = label_grid((5, 1, 1));
        for i in 0..5 {
            comp.data[i] = 1;
        }
        let mut a = mask((5, 1, 1));
        a.data[0] = 1;
        let mut b = mask((5, 1, 1));
        for i in 0..5 {
            b.data[i] = 1;
        }
        let (_, assignments) = assign_regions(&comp, &[a, b]).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].region, 0);
    }

    #[test]
    fn test_no_components_is_not_an_error() {
        let comp = label_grid((3, 3, 3));
        let prior = mask((3, 3, 3));
        let (out, assignments) = assign_regions(&comp, &[prior]).unwrap();
        assert!(assignments.is_empty());
        assert!(out.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let comp = label_grid((3, 3, 3));
        let prior = mask((3, 3, 2));
        assert!(assign_regions(&comp, &[prior]).is_err());
    }
}
