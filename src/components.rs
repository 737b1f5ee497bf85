//! Connected-component labeling and size-based relabeling
//!
//! Labels 26-connected foreground components of a binary mask, then prunes
//! components below a minimum voxel count and reassigns labels by descending
//! size rank (rank 1 = largest). Physical volumes come from the grid's voxel
//! spacing.

use serde::Serialize;

use crate::volume::{LabelGrid, MaskGrid};

/// One surviving lesion component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedComponent {
    /// Label id in the relabeled grid (size rank, 1 = largest)
    pub label: u32,
    /// Number of voxels
    pub voxel_count: usize,
    /// Physical volume in mm^3 (voxel count x spacing products)
    pub volume_mm3: f64,
}

/// 26-connectivity stencil: all neighbors whose coordinates differ by at
/// most 1 in each axis, center excluded
fn neighbor_offsets() -> [(i64, i64, i64); 26] {
    let mut offsets = [(0i64, 0i64, 0i64); 26];
    let mut n = 0;
    for dk in -1i64..=1 {
        for dj in -1i64..=1 {
            for di in -1i64..=1 {
                if di == 0 && dj == 0 && dk == 0 {
                    continue;
                }
                offsets[n] = (di, dj, dk);
                n += 1;
            }
        }
    }
    offsets
}

/// Label each maximal 26-connected group of foreground voxels with a unique
/// positive id
///
/// Ids are assigned in scan order of each component's first voxel; 0 stays
/// background. Uses an explicit stack flood fill, so recursion depth is not
/// a concern for large components.
pub fn label_components(mask: &MaskGrid) -> LabelGrid {
    let (nx, ny, nz) = mask.dims;
    let mut labels = LabelGrid::zeros_like(mask);
    let offsets = neighbor_offsets();

    let mut next_label = 0u32;
    let mut stack: Vec<usize> = Vec::new();

    for seed in 0..mask.len() {
        if mask.data[seed] == 0 || labels.data[seed] != 0 {
            continue;
        }

        next_label += 1;
        labels.data[seed] = next_label;
        stack.push(seed);

        while let Some(idx) = stack.pop() {
            let (i, j, k) = mask.coords(idx);
            for &(di, dj, dk) in offsets.iter() {
                let ii = i as i64 + di;
                let jj = j as i64 + dj;
                let kk = k as i64 + dk;
                if ii < 0 || ii >= nx as i64 || jj < 0 || jj >= ny as i64 || kk < 0 || kk >= nz as i64 {
                    continue;
                }
                let nidx = mask.index(ii as usize, jj as usize, kk as usize);
                if mask.data[nidx] != 0 && labels.data[nidx] == 0 {
                    labels.data[nidx] = next_label;
                    stack.push(nidx);
                }
            }
        }
    }

    labels
}

/// Prune components below `min_voxels` and relabel the survivors by
/// descending voxel count
///
/// Rank 1 is the largest component; ties break by original label id,
/// ascending, so the result is deterministic. Returns the relabeled grid
/// and the ordered component list. An empty input yields an all-zero grid
/// and an empty list.
pub fn relabel_by_size(labels: &LabelGrid, min_voxels: usize) -> (LabelGrid, Vec<ConnectedComponent>) {
    // Count voxels per original label in one pass
    let max_label = labels.data.iter().copied().max().unwrap_or(0) as usize;
    let mut counts = vec![0usize; max_label + 1];
    for &l in &labels.data {
        counts[l as usize] += 1;
    }

    // Survivors ordered by (count desc, original id asc)
    let mut survivors: Vec<(u32, usize)> = (1..=max_label)
        .filter(|&l| counts[l] >= min_voxels && counts[l] > 0)
        .map(|l| (l as u32, counts[l]))
        .collect();
    survivors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    // Original label -> rank
    let mut rank_of = vec![0u32; max_label + 1];
    let voxel_volume = labels.voxel_volume_mm3();
    let mut components = Vec::with_capacity(survivors.len());
    for (rank0, &(orig, count)) in survivors.iter().enumerate() {
        let rank = rank0 as u32 + 1;
        rank_of[orig as usize] = rank;
        components.push(ConnectedComponent {
            label: rank,
            voxel_count: count,
            volume_mm3: count as f64 * voxel_volume,
        });
    }

    let mut out = LabelGrid::zeros_like(labels);
    for (o, &l) in out.data.iter_mut().zip(labels.data.iter()) {
        if l != 0 {
            *o = rank_of[l as usize];
        }
    }

    (out, components)
}
