//! Dense 3D volume data model
//!
//! Volumes are stored as flat buffers in Fortran (column-major) order to
//! match the NIfTI convention: `index = x + y*nx + z*nx*ny`. A grid carries
//! its geometry (dimensions, voxel spacing in mm, and a 4x4 row-major affine
//! holding origin and direction cosines) so that derived grids inherit it
//! unchanged.

use crate::error::LesionError;

/// Identity 4x4 affine (row-major)
pub const IDENTITY_AFFINE: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Tolerance for comparing spacing and affine entries of co-registered grids
const GEOM_EPS: f64 = 1e-4;

/// A dense 3D grid of scalar samples with physical geometry
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid<T> {
    /// Flat sample buffer in Fortran order (x varies fastest)
    pub data: Vec<T>,
    /// Dimensions (nx, ny, nz)
    pub dims: (usize, usize, usize),
    /// Voxel spacing in mm (sx, sy, sz)
    pub voxel_size: (f64, f64, f64),
    /// 4x4 row-major affine (origin + direction cosines)
    pub affine: [f64; 16],
}

/// Floating-point intensity or probability samples
pub type IntensityGrid = VoxelGrid<f64>;

/// Binary or small-integer tissue masks (0 = background)
pub type MaskGrid = VoxelGrid<u8>;

/// Connected-component and region-coded label maps (0 = background)
pub type LabelGrid = VoxelGrid<u32>;

impl<T: Copy + Default> VoxelGrid<T> {
    /// Create a grid filled with the default sample value (zero for all
    /// sample types used here)
    pub fn zeros(dims: (usize, usize, usize), voxel_size: (f64, f64, f64), affine: [f64; 16]) -> Self {
        let n = dims.0 * dims.1 * dims.2;
        VoxelGrid {
            data: vec![T::default(); n],
            dims,
            voxel_size,
            affine,
        }
    }

    /// Create a zero-filled grid inheriting another grid's geometry
    pub fn zeros_like<U>(other: &VoxelGrid<U>) -> Self {
        Self::zeros(other.dims, other.voxel_size, other.affine)
    }
}

impl<T> VoxelGrid<T> {
    /// Create a grid from an existing buffer
    ///
    /// # Errors
    /// Returns [`LesionError::DimensionMismatch`] if the buffer length does
    /// not equal `nx * ny * nz`.
    pub fn from_vec(
        data: Vec<T>,
        dims: (usize, usize, usize),
        voxel_size: (f64, f64, f64),
        affine: [f64; 16],
    ) -> Result<Self, LesionError> {
        let expected = dims.0 * dims.1 * dims.2;
        if data.len() != expected {
            return Err(LesionError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(VoxelGrid { data, dims, voxel_size, affine })
    }

    /// Total number of voxels
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the grid holds no voxels
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of voxel (i, j, k) in Fortran order
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let (nx, ny, _) = self.dims;
        i + j * nx + k * nx * ny
    }

    /// Voxel coordinates (i, j, k) of a flat index
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let (nx, ny, _) = self.dims;
        let i = idx % nx;
        let j = (idx / nx) % ny;
        let k = idx / (nx * ny);
        (i, j, k)
    }

    /// Physical volume of one voxel in mm^3
    #[inline]
    pub fn voxel_volume_mm3(&self) -> f64 {
        let (sx, sy, sz) = self.voxel_size;
        sx * sy * sz
    }

    /// True if `other` shares this grid's dimensions, spacing and affine
    /// within a small tolerance
    pub fn same_geometry<U>(&self, other: &VoxelGrid<U>) -> bool {
        if self.dims != other.dims {
            return false;
        }
        let spacing_ok = (self.voxel_size.0 - other.voxel_size.0).abs() < GEOM_EPS
            && (self.voxel_size.1 - other.voxel_size.1).abs() < GEOM_EPS
            && (self.voxel_size.2 - other.voxel_size.2).abs() < GEOM_EPS;
        if !spacing_ok {
            return false;
        }
        self.affine
            .iter()
            .zip(other.affine.iter())
            .all(|(a, b)| (a - b).abs() < GEOM_EPS)
    }

    /// Check the co-registration precondition between two named inputs
    ///
    /// # Errors
    /// Returns [`LesionError::GeometryMismatch`] naming both grids if they
    /// do not share geometry.
    pub fn check_geometry<U>(&self, name: &str, other: &VoxelGrid<U>, other_name: &str) -> Result<(), LesionError> {
        if self.same_geometry(other) {
            Ok(())
        } else {
            Err(LesionError::GeometryMismatch {
                left: name.to_string(),
                right: other_name.to_string(),
            })
        }
    }
}

impl IntensityGrid {
    /// Minimum and maximum sample values, ignoring NaN
    ///
    /// Returns (0, 0) for an empty grid.
    pub fn min_max(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.data {
            if v.is_nan() {
                continue;
            }
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        if lo > hi {
            (0.0, 0.0)
        } else {
            (lo, hi)
        }
    }

    /// Rescale samples linearly to [0, 1]
    ///
    /// A constant grid maps to all zeros.
    pub fn rescale_to_unit(&self) -> IntensityGrid {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        let mut out = IntensityGrid::zeros_like(self);
        if range > 0.0 {
            for (o, &v) in out.data.iter_mut().zip(self.data.iter()) {
                *o = (v - lo) / range;
            }
        }
        out
    }
}

impl MaskGrid {
    /// Extract a binary mask selecting one label value from a multi-label grid
    ///
    /// Voxels equal to `label` become 1, everything else 0. This is the
    /// "masked region" view used to pick e.g. gray or white matter out of a
    /// brain segmentation.
    pub fn select_label(labels: &MaskGrid, label: u8) -> MaskGrid {
        let mut out = MaskGrid::zeros_like(labels);
        for (o, &v) in out.data.iter_mut().zip(labels.data.iter()) {
            if v == label {
                *o = 1;
            }
        }
        out
    }

    /// Number of foreground (nonzero) voxels
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

impl LabelGrid {
    /// Collapse all positive labels to a binary mask
    pub fn to_binary_mask(&self) -> MaskGrid {
        let mut out = MaskGrid::zeros_like(self);
        for (o, &v) in out.data.iter_mut().zip(self.data.iter()) {
            if v != 0 {
                *o = 1;
            }
        }
        out
    }
}
