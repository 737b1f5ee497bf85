//! NIfTI file I/O
//!
//! Loads and saves 3D volumes as NIfTI-1 files (.nii / .nii.gz, gzip
//! auto-detected). Intensity volumes load as [`IntensityGrid`] (samples
//! promoted to f64, the single numeric type the pipeline is instantiated
//! with); label volumes load as [`MaskGrid`]. Intensity output is written as
//! FLOAT32, label output as UINT8.

use std::io::Cursor;
use std::path::Path;

use flate2::read::GzDecoder;
use log::warn;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::error::LesionError;
use crate::volume::{IntensityGrid, LabelGrid, MaskGrid, VoxelGrid};

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Affine from the header: sform when present, spacing-scaled identity
/// otherwise
fn affine_from_header(header: &NiftiHeader) -> [f64; 16] {
    if header.sform_code > 0 {
        let x = &header.srow_x;
        let y = &header.srow_y;
        let z = &header.srow_z;
        [
            x[0] as f64, x[1] as f64, x[2] as f64, x[3] as f64,
            y[0] as f64, y[1] as f64, y[2] as f64, y[3] as f64,
            z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        let (sx, sy, sz) = (
            header.pixdim[1] as f64,
            header.pixdim[2] as f64,
            header.pixdim[3] as f64,
        );
        [
            sx, 0.0, 0.0, 0.0,
            0.0, sy, 0.0, 0.0,
            0.0, 0.0, sz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Decode a NIfTI byte stream into an [`IntensityGrid`]
///
/// Samples of any scalar type are promoted to f64. 4D inputs keep only the
/// first timepoint. Data is stored in Fortran order to match the on-disk
/// convention.
pub fn load_intensity(bytes: &[u8]) -> Result<IntensityGrid, LesionError> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))
            .map_err(|e| LesionError::Io(format!("failed to read gzipped NIfTI: {e}")))?
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| LesionError::Io(format!("failed to read NIfTI: {e}")))?
    };

    let header = obj.header();
    if (header.dim[0] as usize) < 3 {
        return Err(LesionError::Io(format!(
            "expected a 3D volume, got {}D",
            header.dim[0]
        )));
    }

    let voxel_size = (
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    );
    let affine = affine_from_header(header);

    let array: Array<f64, _> = obj
        .into_volume()
        .into_ndarray()
        .map_err(|e| LesionError::Io(format!("failed to decode NIfTI volume: {e}")))?;

    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(LesionError::Io(format!(
            "expected at least a 3D array, got {}D",
            shape.len()
        )));
    }
    let dims = (shape[0], shape[1], shape[2]);

    // Flatten in Fortran order (x varies fastest); 4D inputs keep t = 0
    let mut data = Vec::with_capacity(dims.0 * dims.1 * dims.2);
    for k in 0..dims.2 {
        for j in 0..dims.1 {
            for i in 0..dims.0 {
                let v = if shape.len() == 3 {
                    array[[i, j, k]]
                } else {
                    array[[i, j, k, 0]]
                };
                data.push(v);
            }
        }
    }

    VoxelGrid::from_vec(data, dims, voxel_size, affine)
}

/// Decode a NIfTI byte stream into a [`MaskGrid`] of small integer labels
///
/// Samples are rounded to the nearest integer; values outside [0, 255] are
/// clamped with a warning (label volumes are expected to carry small
/// unsigned integers).
pub fn load_mask(bytes: &[u8]) -> Result<MaskGrid, LesionError> {
    let grid = load_intensity(bytes)?;
    let mut clamped = 0usize;
    let data: Vec<u8> = grid
        .data
        .iter()
        .map(|&v| {
            let r = v.round();
            if !(0.0..=255.0).contains(&r) {
                clamped += 1;
            }
            r.clamp(0.0, 255.0) as u8
        })
        .collect();
    if clamped > 0 {
        warn!("{clamped} label sample(s) outside [0, 255] were clamped");
    }
    VoxelGrid::from_vec(data, grid.dims, grid.voxel_size, grid.affine)
}

/// Read an intensity volume from a file path
pub fn read_intensity_file(path: &Path) -> Result<IntensityGrid, LesionError> {
    let bytes = std::fs::read(path)
        .map_err(|e| LesionError::Io(format!("failed to read '{}': {e}", path.display())))?;
    load_intensity(&bytes)
}

/// Read a label/mask volume from a file path
pub fn read_mask_file(path: &Path) -> Result<MaskGrid, LesionError> {
    let bytes = std::fs::read(path)
        .map_err(|e| LesionError::Io(format!("failed to read '{}': {e}", path.display())))?;
    load_mask(&bytes)
}

/// NIfTI-1 scalar types this writer emits
#[derive(Clone, Copy)]
enum OutputType {
    /// datatype 16, bitpix 32
    Float32,
    /// datatype 2, bitpix 8
    Uint8,
}

/// Build a NIfTI-1 header (348 bytes) for a 3D volume
fn build_header(
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
    out_type: OutputType,
) -> [u8; 348] {
    let mut header = [0u8; 348];

    // sizeof_hdr
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    // dim[0..7]
    let dim: [i16; 8] = [3, dims.0 as i16, dims.1 as i16, dims.2 as i16, 1, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    let (datatype, bitpix): (i16, i16) = match out_type {
        OutputType::Float32 => (16, 32),
        OutputType::Uint8 => (2, 8),
    };
    header[70..72].copy_from_slice(&datatype.to_le_bytes());
    header[72..74].copy_from_slice(&bitpix.to_le_bytes());

    // pixdim[0..7]
    let pixdim: [f32; 8] = [
        1.0,
        voxel_size.0 as f32,
        voxel_size.1 as f32,
        voxel_size.2 as f32,
        1.0, 1.0, 1.0, 1.0,
    ];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4-byte extension flag)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());

    // scl_slope = 1, scl_inter = 0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform from the affine
    header[254..256].copy_from_slice(&1i16.to_le_bytes());
    for row in 0..3 {
        for col in 0..4 {
            let offset = 280 + row * 16 + col * 4;
            let v = affine[row * 4 + col] as f32;
            header[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
        }
    }

    // magic = "n+1\0" (single-file NIfTI-1)
    header[344..348].copy_from_slice(b"n+1\0");

    header
}

/// Encode an intensity grid as uncompressed NIfTI-1 bytes (FLOAT32)
pub fn save_intensity(grid: &IntensityGrid) -> Vec<u8> {
    let header = build_header(grid.dims, grid.voxel_size, &grid.affine, OutputType::Float32);
    let mut buffer = Vec::with_capacity(352 + grid.len() * 4);
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&[0u8; 4]); // no extensions
    for &v in &grid.data {
        buffer.extend_from_slice(&(v as f32).to_le_bytes());
    }
    buffer
}

/// Encode a label grid as uncompressed NIfTI-1 bytes (UINT8)
///
/// # Errors
/// Returns [`LesionError::Io`] if any label exceeds 255; the binary and
/// region-coded maps this crate produces stay far below that.
pub fn save_labels(grid: &LabelGrid) -> Result<Vec<u8>, LesionError> {
    if let Some(&big) = grid.data.iter().find(|&&v| v > u8::MAX as u32) {
        return Err(LesionError::Io(format!(
            "label value {big} does not fit the UINT8 output encoding"
        )));
    }
    let header = build_header(grid.dims, grid.voxel_size, &grid.affine, OutputType::Uint8);
    let mut buffer = Vec::with_capacity(352 + grid.len());
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&[0u8; 4]);
    buffer.extend(grid.data.iter().map(|&v| v as u8));
    Ok(buffer)
}

/// Gzip a NIfTI byte buffer
fn gzip(bytes: &[u8]) -> Result<Vec<u8>, LesionError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| LesionError::Io(format!("gzip compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| LesionError::Io(format!("gzip finish failed: {e}")))
}

fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), LesionError> {
    let compressed = if path.to_string_lossy().ends_with(".nii.gz") {
        gzip(&bytes)?
    } else {
        bytes
    };
    std::fs::write(path, compressed)
        .map_err(|e| LesionError::Io(format!("failed to write '{}': {e}", path.display())))
}

/// Write an intensity grid to a .nii or .nii.gz file
pub fn write_intensity_file(path: &Path, grid: &IntensityGrid) -> Result<(), LesionError> {
    write_bytes(path, save_intensity(grid))
}

/// Write a label grid to a .nii or .nii.gz file
pub fn write_label_file(path: &Path, grid: &LabelGrid) -> Result<(), LesionError> {
    write_bytes(path, save_labels(grid)?)
}
