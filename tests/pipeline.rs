//! End-to-end refinement pipeline tests on synthetic subjects

mod common;

use common::{fill_intensity_box, fill_mask_box, intensity, mask};
use lesion_core::nifti_io::{read_intensity_file, read_mask_file, write_intensity_file, write_label_file};
use lesion_core::volume::{IntensityGrid, MaskGrid};
use lesion_core::{
    LesionRefinementPipeline, RefinementConfig, RefinementInputs, ThresholdMode,
};

const DIMS: (usize, usize, usize) = (16, 16, 16);

/// Synthetic subject: gray matter slab at j < 5 (FLAIR around 101), white
/// matter elsewhere (FLAIR 90), one 4x4x4 lesion and one 2-voxel speck, both
/// hyperintense and inside white matter
fn synthetic_subject() -> (IntensityGrid, MaskGrid, MaskGrid) {
    let mut flair = intensity(DIMS);
    let mut gm = mask(DIMS);
    let mut wm = mask(DIMS);

    for k in 0..DIMS.2 {
        for j in 0..DIMS.1 {
            for i in 0..DIMS.0 {
                let idx = flair.index(i, j, k);
                if j < 5 {
                    gm.data[idx] = 1;
                    flair.data[idx] = 100.0 + ((i + k) % 3) as f64;
                } else {
                    wm.data[idx] = 1;
                    flair.data[idx] = 90.0;
                }
            }
        }
    }

    fill_intensity_box(&mut flair, (5, 8, 5), (8, 11, 8), 160.0); // 64 voxels
    fill_intensity_box(&mut flair, (12, 8, 2), (13, 8, 2), 160.0); // 2 voxels

    (flair, gm, wm)
}

fn pipeline(min_ratio: f64, min_voxels: usize) -> LesionRefinementPipeline {
    LesionRefinementPipeline::new(RefinementConfig {
        threshold: ThresholdMode::Statistical { gamma: 3.0 },
        min_ratio,
        min_voxels,
    })
    .expect("valid config")
}

#[test]
fn test_size_filter_prunes_small_blob() {
    let (flair, gm, wm) = synthetic_subject();
    // Permissive spatial filter (any self-match passes), strict size cutoff
    let out = pipeline(0.03, 10)
        .run(&RefinementInputs {
            intensity: &flair,
            reference_mask: Some(&gm),
            tissue_mask: &wm,
            priors: &[],
        })
        .expect("pipeline run");

    let report = &out.report;
    assert_eq!(report.raw_components, 2, "both blobs exceed the threshold");
    assert_eq!(report.surviving_components, 1, "the 2-voxel speck is pruned");
    assert_eq!(report.components[0].voxel_count, 64);
    assert!((report.total_volume_mm3 - 64.0).abs() < 1e-9);
    assert!((report.total_volume_ml - 0.064).abs() < 1e-12);

    // The speck is absent from the output grid
    let speck_idx = out.label_map.index(12, 8, 2);
    assert_eq!(out.label_map.data[speck_idx], 0);
    let lesion_idx = out.label_map.index(6, 9, 6);
    assert_eq!(out.label_map.data[lesion_idx], 1);
}

#[test]
fn test_strict_spatial_filter_erodes_lesion_boundary() {
    let (flair, gm, wm) = synthetic_subject();
    // At ratio 0.5 a candidate needs 14 of 27 co-foreground cells: the 4x4x4
    // blob keeps its interior and face voxels (32) and loses edges/corners
    let out = pipeline(0.5, 1)
        .run(&RefinementInputs {
            intensity: &flair,
            reference_mask: Some(&gm),
            tissue_mask: &wm,
            priors: &[],
        })
        .expect("pipeline run");

    assert_eq!(out.report.surviving_components, 1);
    assert_eq!(out.report.components[0].voxel_count, 32);

    // Blob corner is gone, center survives
    assert_eq!(out.label_map.data[out.label_map.index(5, 8, 5)], 0);
    assert_eq!(out.label_map.data[out.label_map.index(6, 9, 6)], 1);
}

#[test]
fn test_region_assignment_first_match_wins() {
    let (flair, gm, wm) = synthetic_subject();
    // Prior A covers only the large lesion; prior B covers the whole volume
    let mut prior_a = mask(DIMS);
    fill_mask_box(&mut prior_a, (5, 8, 5), (8, 11, 8));
    let mut prior_b = mask(DIMS);
    fill_mask_box(&mut prior_b, (0, 0, 0), (15, 15, 15));

    let out = pipeline(0.03, 10)
        .run(&RefinementInputs {
            intensity: &flair,
            reference_mask: Some(&gm),
            tissue_mask: &wm,
            priors: &[prior_a, prior_b],
        })
        .expect("pipeline run");

    assert_eq!(out.report.assignments.len(), 1);
    assert_eq!(out.report.assignments[0].region, 0, "earlier prior wins");
    // Region coding: rank 1 + region 0 = 1
    let lesion_idx = out.label_map.index(6, 9, 6);
    assert_eq!(out.label_map.data[lesion_idx], 1);
}

#[test]
fn test_determinism_across_runs() {
    let (flair, gm, wm) = synthetic_subject();
    let p = pipeline(0.03, 1);
    let inputs = RefinementInputs {
        intensity: &flair,
        reference_mask: Some(&gm),
        tissue_mask: &wm,
        priors: &[],
    };
    let a = p.run(&inputs).expect("first run");
    let b = p.run(&inputs).expect("second run");
    assert_eq!(a.label_map.data, b.label_map.data);
    assert_eq!(a.report.components, b.report.components);
    assert_eq!(a.report.threshold, b.report.threshold);
}

#[test]
fn test_pipeline_through_nifti_files() {
    // Full loop: write synthetic volumes to disk, load them back, refine,
    // save the lesion map and reload it
    let (flair, gm, wm) = synthetic_subject();
    let tmp = std::env::temp_dir();
    let flair_path = tmp.join("lesion_core_e2e_flair.nii.gz");
    let wm_path = tmp.join("lesion_core_e2e_wm.nii");
    let out_path = tmp.join("lesion_core_e2e_map.nii.gz");

    write_intensity_file(&flair_path, &flair).expect("write flair");
    // Masks round-trip through the intensity writer as small floats
    let wm_float = IntensityGrid::from_vec(
        wm.data.iter().map(|&v| v as f64).collect(),
        wm.dims,
        wm.voxel_size,
        wm.affine,
    )
    .unwrap();
    write_intensity_file(&wm_path, &wm_float).expect("write wm");

    let flair_loaded = read_intensity_file(&flair_path).expect("read flair");
    let wm_loaded = read_mask_file(&wm_path).expect("read wm");

    let out = pipeline(0.03, 10)
        .run(&RefinementInputs {
            intensity: &flair_loaded,
            reference_mask: Some(&gm),
            tissue_mask: &wm_loaded,
            priors: &[],
        })
        .expect("pipeline run");
    assert_eq!(out.report.surviving_components, 1);

    write_label_file(&out_path, &out.label_map).expect("write lesion map");
    let reloaded = read_mask_file(&out_path).expect("reload lesion map");
    assert_eq!(reloaded.count_foreground(), 64);

    std::fs::remove_file(&flair_path).ok();
    std::fs::remove_file(&wm_path).ok();
    std::fs::remove_file(&out_path).ok();
}
