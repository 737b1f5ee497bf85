//! lesionseg CLI — refine hyperintense lesion candidates in brain MRI.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use lesion_core::nifti_io::{read_intensity_file, read_mask_file, write_label_file};
use lesion_core::volume::MaskGrid;
use lesion_core::{
    LesionRefinementPipeline, RefinementConfig, RefinementInputs, ThresholdMode,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lesionseg")]
#[command(about = "Refine hyperintense lesion candidates in co-registered 3D brain MRI volumes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment lesions with a statistical threshold from a tissue distribution.
    Threshold(ThresholdArgs),

    /// Refine a precomputed lesion probability map with a direct cutoff.
    Refine(RefineArgs),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// White matter mask (or multi-label brain segmentation with --wm-label).
    #[arg(long)]
    tissue: PathBuf,

    /// Label value selecting white matter in --tissue (omit for a binary mask).
    #[arg(long)]
    wm_label: Option<u8>,

    /// Minimum 27-neighborhood match ratio against the tissue mask.
    #[arg(long, default_value = "0.5")]
    min_ratio: f64,

    /// Minimum lesion size in voxels.
    #[arg(long, default_value = "3")]
    min_size: usize,

    /// Anatomical prior masks, ordered; repeat the flag per region.
    #[arg(long = "prior")]
    priors: Vec<PathBuf>,

    /// Path to write the lesion map (.nii or .nii.gz).
    #[arg(long)]
    out: PathBuf,

    /// Path to write the refinement report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ThresholdArgs {
    /// Input intensity volume (e.g. T2-FLAIR).
    #[arg(long)]
    input: PathBuf,

    /// Reference tissue mask for the intensity distribution (or multi-label
    /// segmentation with --gm-label).
    #[arg(long)]
    reference: PathBuf,

    /// Label value selecting gray matter in --reference (omit for a binary mask).
    #[arg(long)]
    gm_label: Option<u8>,

    /// Sensitivity multiplier: threshold = mean + gamma * sigma.
    #[arg(long, default_value = "2.0")]
    gamma: f64,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct RefineArgs {
    /// Input lesion probability map with values in [0, 1].
    #[arg(long)]
    input: PathBuf,

    /// Probability cutoff in [0, 1].
    #[arg(long, default_value = "0.5")]
    cutoff: f64,

    #[command(flatten)]
    common: CommonArgs,
}

/// Load a tissue mask, selecting one label value when requested
fn load_tissue(path: &PathBuf, label: Option<u8>) -> CliResult<MaskGrid> {
    let mask = read_mask_file(path)?;
    Ok(match label {
        Some(l) => MaskGrid::select_label(&mask, l),
        None => mask,
    })
}

fn run_pipeline(
    input: &PathBuf,
    reference: Option<(&PathBuf, Option<u8>)>,
    threshold: ThresholdMode,
    common: &CommonArgs,
) -> CliResult<()> {
    let intensity = read_intensity_file(input)?;
    let tissue = load_tissue(&common.tissue, common.wm_label)?;
    let reference_mask = match reference {
        Some((path, label)) => Some(load_tissue(path, label)?),
        None => None,
    };

    let mut priors = Vec::with_capacity(common.priors.len());
    for path in &common.priors {
        priors.push(read_mask_file(path)?);
    }

    let pipeline = LesionRefinementPipeline::new(RefinementConfig {
        threshold,
        min_ratio: common.min_ratio,
        min_voxels: common.min_size,
    })?;

    let output = pipeline.run(&RefinementInputs {
        intensity: &intensity,
        reference_mask: reference_mask.as_ref(),
        tissue_mask: &tissue,
        priors: &priors,
    })?;

    write_label_file(&common.out, &output.label_map)?;

    let report = &output.report;
    if let Some(stats) = &report.stats {
        println!(
            "reference distribution: G(mu={:.4}, sigma={:.4}), N={}",
            stats.mean, stats.std_dev, stats.count
        );
    }
    println!("threshold: {:.4}", report.threshold);
    println!(
        "components: {} raw, {} surviving",
        report.raw_components, report.surviving_components
    );
    for c in &report.components {
        println!(
            "  lesion {}: {} voxels, {:.2} mm^3",
            c.label, c.voxel_count, c.volume_mm3
        );
    }
    println!(
        "total lesion load: {:.2} mm^3 ({:.4} mL)",
        report.total_volume_mm3, report.total_volume_ml
    );
    for note in &report.notes {
        println!("note: {note}");
    }

    if let Some(report_path) = &common.report {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(report_path, json)?;
        println!("report written to {}", report_path.display());
    }
    println!("lesion map written to {}", common.out.display());

    Ok(())
}

fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Threshold(args) => run_pipeline(
            &args.input,
            Some((&args.reference, args.gm_label)),
            ThresholdMode::Statistical { gamma: args.gamma },
            &args.common,
        ),
        Commands::Refine(args) => run_pipeline(
            &args.input,
            None,
            ThresholdMode::Direct { cutoff: args.cutoff },
            &args.common,
        ),
    }
}
