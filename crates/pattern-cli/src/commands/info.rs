//! `patternfold info`: mesh conditioning and seam statistics.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use pattern_flatten::{extract_seams, FlattenConfig};
use pattern_mesh::{face_components, load_obj, weld_vertices, MeshAdjacency};

use crate::OutputFormat;

#[derive(Args)]
pub struct InfoArgs {
    /// Input OBJ file with vertex colors.
    pub input: PathBuf,

    /// Weld tolerance in world units.
    #[arg(long, default_value_t = 1e-5)]
    pub weld_tolerance: f64,
}

#[derive(Serialize)]
struct InfoReport {
    vertices: usize,
    faces: usize,
    welded_vertices: usize,
    components: usize,
    largest_component_faces: usize,
    boundary_edges: usize,
    red_vertices: usize,
    seam_clusters: usize,
    barrier_edges: usize,
}

pub fn run(args: &InfoArgs, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let mesh = load_obj(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let (welded, _) = weld_vertices(&mesh, args.weld_tolerance);
    let components = face_components(&welded);
    let adjacency = MeshAdjacency::build(&welded.faces);

    let config = FlattenConfig {
        weld_tolerance: args.weld_tolerance,
        ..FlattenConfig::default()
    };
    let seams = extract_seams(&welded, &config);

    let report = InfoReport {
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        welded_vertices: welded.vertex_count(),
        components: components.len(),
        largest_component_faces: components.first().map_or(0, Vec::len),
        boundary_edges: adjacency.boundary_edge_count(),
        red_vertices: seams.red_vertices.len(),
        seam_clusters: seams.clusters.len(),
        barrier_edges: seams.barrier_edges.len(),
    };

    if quiet {
        return Ok(());
    }

    match format {
        OutputFormat::Text => {
            println!("{}", args.input.display().to_string().bold());
            println!("  Vertices: {} ({} after weld)", report.vertices, report.welded_vertices);
            println!("  Faces: {}", report.faces);
            println!(
                "  Components: {} (largest: {} faces)",
                report.components, report.largest_component_faces
            );
            println!("  Boundary edges: {}", report.boundary_edges);
            println!(
                "  Seams: {} red vertices, {} clusters, {} barrier edges",
                report.red_vertices, report.seam_clusters, report.barrier_edges
            );
            if report.red_vertices == 0 {
                eprintln!(
                    "{} no seam markers found; the mesh will flatten as one piece",
                    "warning:".yellow().bold()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
