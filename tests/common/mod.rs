//! Common test utilities for lesion-core integration tests

use lesion_core::volume::{IntensityGrid, MaskGrid, IDENTITY_AFFINE};

/// Build an empty intensity grid with unit spacing
pub fn intensity(dims: (usize, usize, usize)) -> IntensityGrid {
    IntensityGrid::zeros(dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
}

/// Build an empty mask with unit spacing
pub fn mask(dims: (usize, usize, usize)) -> MaskGrid {
    MaskGrid::zeros(dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
}

/// Set every voxel of an axis-aligned box [lo, hi] (inclusive) in a mask
pub fn fill_mask_box(m: &mut MaskGrid, lo: (usize, usize, usize), hi: (usize, usize, usize)) {
    for k in lo.2..=hi.2 {
        for j in lo.1..=hi.1 {
            for i in lo.0..=hi.0 {
                let idx = m.index(i, j, k);
                m.data[idx] = 1;
            }
        }
    }
}

/// Set every voxel of an axis-aligned box [lo, hi] (inclusive) to a value
pub fn fill_intensity_box(
    g: &mut IntensityGrid,
    lo: (usize, usize, usize),
    hi: (usize, usize, usize),
    value: f64,
) {
    for k in lo.2..=hi.2 {
        for j in lo.1..=hi.1 {
            for i in lo.0..=hi.0 {
                let idx = g.index(i, j, k);
                g.data[idx] = value;
            }
        }
    }
}

/// Dice overlap between the foregrounds of two masks (1.0 = identical)
#[allow(dead_code)]
pub fn dice(a: &[u8], b: &[u8]) -> f64 {
    let mut inter = 0usize;
    let mut total = 0usize;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x != 0 && y != 0 {
            inter += 1;
        }
        if x != 0 {
            total += 1;
        }
        if y != 0 {
            total += 1;
        }
    }
    if total == 0 {
        return 1.0;
    }
    2.0 * inter as f64 / total as f64
}
