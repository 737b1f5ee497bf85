//! Lesion-Core: hyperintense lesion refinement for 3D brain MRI
//!
//! Identifies and refines hyperintense lesion regions in co-registered brain
//! MRI volumes: a reference tissue intensity distribution drives a
//! statistical threshold, candidates are filtered by spatial consistency
//! against a target tissue mask, pruned by connected-component size, and
//! optionally partitioned across anatomical prior regions.
//!
//! # Modules
//! - `volume`: dense 3D voxel grids with physical geometry
//! - `stats`: masked intensity distribution estimation
//! - `threshold`: threshold-based candidate segmentation
//! - `spatial`: neighborhood spatial-consistency filtering
//! - `components`: connected-component labeling and size pruning
//! - `regions`: anatomical region assignment
//! - `pipeline`: the refinement pipeline and its report
//! - `enhancement`: contrast-weighted intensity enhancement
//! - `nifti_io`: NIfTI file I/O
//! - `error`: error types

// Data model
pub mod error;
pub mod volume;

// Refinement stages
pub mod components;
pub mod regions;
pub mod spatial;
pub mod stats;
pub mod threshold;

// Orchestration
pub mod pipeline;

// Pre-processing
pub mod enhancement;

// I/O
pub mod nifti_io;

pub use error::LesionError;
pub use pipeline::{
    LesionRefinementPipeline, RefinementConfig, RefinementInputs, RefinementOutput,
    RefinementReport, ThresholdMode,
};
pub use volume::{IntensityGrid, LabelGrid, MaskGrid, VoxelGrid};
