//! `patternfold flatten`: run the full pipeline and export results.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use pattern_flatten::{
    flatten_mesh_with_hooks, FlattenConfig, PipelineHooks, PipelineStage,
};
use pattern_mesh::load_obj;

use crate::{svg, OutputFormat};

#[derive(Args)]
pub struct FlattenArgs {
    /// Input OBJ file with vertex colors.
    pub input: PathBuf,

    /// SVG output path for the packed pattern preview.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Weld tolerance in world units.
    #[arg(long, default_value_t = 1e-5)]
    pub weld_tolerance: f64,

    /// Minimum faces per pattern piece.
    #[arg(long, default_value_t = 500)]
    pub min_patch_faces: usize,

    /// Minimum faces per connected component.
    #[arg(long, default_value_t = 100)]
    pub min_component_faces: usize,

    /// Relaxation iterations per piece.
    #[arg(long, default_value_t = 200)]
    pub iterations: usize,

    /// Freeze boundary vertices at their initial positions.
    #[arg(long)]
    pub pin_boundary: bool,

    /// Keep faces touching red vertices instead of removing them as kerf.
    #[arg(long)]
    pub no_kerf: bool,

    /// Packing row width in UV units.
    #[arg(long, default_value_t = 4.0)]
    pub row_width: f64,
}

#[derive(Serialize)]
struct PatternSummary {
    index: usize,
    vertices: usize,
    triangles: usize,
    width: f64,
    height: f64,
    strategy: String,
    topology_error: bool,
}

#[derive(Serialize)]
struct FlattenSummary {
    patterns: Vec<PatternSummary>,
    total_area: f64,
    seam_paths: usize,
    warnings: Vec<String>,
}

pub fn run(args: &FlattenArgs, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let mesh = load_obj(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let config = FlattenConfig {
        weld_tolerance: args.weld_tolerance,
        min_patch_faces: args.min_patch_faces,
        min_component_faces: args.min_component_faces,
        relaxation_iterations: args.iterations,
        pin_boundary: args.pin_boundary,
        kerf_margin: !args.no_kerf,
        packer_row_width: args.row_width,
        ..FlattenConfig::default()
    };

    let mut on_stage = |stage: PipelineStage| {
        if quiet || format == OutputFormat::Json {
            return;
        }
        match stage {
            PipelineStage::Welding => eprintln!("  welding..."),
            PipelineStage::Segmenting => eprintln!("  segmenting..."),
            PipelineStage::Flattening { index, total } => {
                eprintln!("  flattening piece {}/{}...", index + 1, total)
            }
            _ => {}
        }
    };
    let hooks = PipelineHooks {
        progress: Some(&mut on_stage),
        cancel: None,
    };

    let result = flatten_mesh_with_hooks(&mesh, &config, hooks);

    let summary = FlattenSummary {
        patterns: result
            .patterns
            .iter()
            .enumerate()
            .map(|(index, p)| PatternSummary {
                index,
                vertices: p.uv.len(),
                triangles: p.local_faces.len(),
                width: p.bounds.width(),
                height: p.bounds.height(),
                strategy: p.strategy.to_string(),
                topology_error: p.topology_error,
            })
            .collect(),
        total_area: result.total_area,
        seam_paths: result.seams.len(),
        warnings: result.warnings.clone(),
    };

    match format {
        OutputFormat::Text if !quiet => {
            println!(
                "{} pattern pieces from {} seam paths",
                summary.patterns.len().to_string().bold(),
                summary.seam_paths
            );
            for p in &summary.patterns {
                let flag = if p.topology_error {
                    " (topology error)".yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  piece {}: {} tris, {:.2}×{:.2} [{}]{}",
                    p.index, p.triangles, p.width, p.height, p.strategy, flag
                );
            }
            // JSON consumers get these in `warnings`; text readers see them
            // on stderr.
            for warning in &summary.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }
        }
        OutputFormat::Json if !quiet => {
            println!("{}", serde_json::to_string_pretty(&summary)?)
        }
        _ => {}
    }

    if let Some(path) = &args.output {
        svg::write_svg(&result, path)?;
        if !quiet && format == OutputFormat::Text {
            println!(
                "{} {} pieces to {}",
                "wrote".green().bold(),
                result.patterns.len(),
                path.display()
            );
        }
    }

    Ok(())
}
