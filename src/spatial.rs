//! Neighborhood spatial-consistency filtering
//!
//! Rejects lesion candidates that are not anatomically adjacent to a target
//! tissue: a candidate voxel survives only if enough of its 3x3x3
//! neighborhood is simultaneously foreground in both the candidate mask and
//! a reference tissue mask (typically white matter).

use crate::error::LesionError;
use crate::volume::MaskGrid;

/// Number of cells in the fixed 3x3x3 stencil, center included
const STENCIL_SIZE: f64 = 27.0;

/// Keep candidate voxels whose neighborhood match ratio against `reference`
/// reaches `min_ratio`
///
/// For every foreground voxel of `candidates` the 27-cell neighborhood is
/// examined in both masks; cells where both are nonzero count as a match.
/// The voxel survives iff `matches / 27 >= min_ratio`. Background voxels
/// pass through as background at no cost.
///
/// Border policy: zero-padding. Stencil cells outside the grid contribute no
/// match, so a border voxel needs a proportionally denser in-bounds overlap
/// to reach the ratio.
///
/// The decision for each voxel depends only on the input masks; results are
/// written to a fresh grid, never back into a buffer being read.
///
/// # Errors
/// Returns [`LesionError::GeometryMismatch`] if the masks are not
/// co-registered, or [`LesionError::InvalidConfig`] if `min_ratio` is
/// outside [0, 1].
pub fn consistency_filter(
    candidates: &MaskGrid,
    reference: &MaskGrid,
    min_ratio: f64,
) -> Result<MaskGrid, LesionError> {
    if !(0.0..=1.0).contains(&min_ratio) {
        return Err(LesionError::InvalidConfig(format!(
            "neighborhood match ratio must be in [0, 1], got {min_ratio}"
        )));
    }
    candidates.check_geometry("candidates", reference, "reference")?;

    let (nx, ny, nz) = candidates.dims;
    let mut out = MaskGrid::zeros_like(candidates);

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let idx = candidates.index(i, j, k);
                if candidates.data[idx] == 0 {
                    continue;
                }

                let mut matches = 0u32;
                for dk in -1i64..=1 {
                    let kk = k as i64 + dk;
                    if kk < 0 || kk >= nz as i64 {
                        continue;
                    }
                    for dj in -1i64..=1 {
                        let jj = j as i64 + dj;
                        if jj < 0 || jj >= ny as i64 {
                            continue;
                        }
                        for di in -1i64..=1 {
                            let ii = i as i64 + di;
                            if ii < 0 || ii >= nx as i64 {
                                continue;
                            }
                            let nidx = candidates.index(ii as usize, jj as usize, kk as usize);
                            if candidates.data[nidx] != 0 && reference.data[nidx] != 0 {
                                matches += 1;
                            }
                        }
                    }
                }

                if matches as f64 / STENCIL_SIZE >= min_ratio {
                    out.data[idx] = 1;
                }
            }
        }
    }

    Ok(out)
}
