//! Mass-spring relaxation: steel boundary, rubber interior.
//!
//! Every unique patch edge becomes a Hookean spring with its 3D length as
//! rest length. Boundary springs are two orders of magnitude stiffer than
//! interior ones: the sewing line must keep its true length while the
//! interior relaxes cone-like bunching into a flat fan. Nothing is pinned by
//! default; a per-step centroid restore keeps the patch in place while its
//! outline arches naturally.

use nalgebra::{Point2, Vector2};
use pattern_mesh::{Mesh, MeshAdjacency};
use tracing::{debug, warn};

use crate::config::FlattenConfig;

const TIME_STEP: f64 = 1.0 / 60.0;
const ANNEAL_FACTOR: f64 = 0.995;
/// Fraction of trailing iterations with annealed damping.
const ANNEAL_PORTION: f64 = 0.4;

/// One Hookean spring between two local vertices.
#[derive(Debug, Clone, Copy)]
struct Spring {
    a: u32,
    b: u32,
    rest_length: f64,
    stiffness: f64,
}

/// Relax an initial embedding toward 3D edge lengths.
///
/// Returns the relaxed coordinates, or a copy of the initial embedding when
/// integration produced non-finite values.
pub fn relax(mesh: &Mesh, initial: &[Point2<f64>], config: &FlattenConfig) -> Vec<Point2<f64>> {
    let n = mesh.vertex_count();
    if n == 0 || initial.len() != n || config.relaxation_iterations == 0 {
        return initial.to_vec();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let springs = build_springs(mesh, &adjacency, config);
    if springs.is_empty() {
        return initial.to_vec();
    }

    let pinned: Vec<bool> = if config.pin_boundary {
        let boundary = adjacency.boundary_vertices();
        (0..n as u32).map(|v| boundary.contains(&v)).collect()
    } else {
        vec![false; n]
    };

    let mut positions: Vec<Point2<f64>> = initial.to_vec();
    let mut velocities: Vec<Vector2<f64>> = vec![Vector2::zeros(); n];
    let mut forces: Vec<Vector2<f64>> = vec![Vector2::zeros(); n];

    let iterations = config.relaxation_iterations;
    let anneal_start = iterations - (iterations as f64 * ANNEAL_PORTION) as usize;
    let mut damping = config.damping;

    for iteration in 0..iterations {
        for f in &mut forces {
            *f = Vector2::zeros();
        }

        for spring in &springs {
            let delta = positions[spring.b as usize] - positions[spring.a as usize];
            let length = delta.norm();
            if length < 1e-12 {
                continue;
            }
            let force = delta / length * (spring.stiffness * (length - spring.rest_length));
            forces[spring.a as usize] += force;
            forces[spring.b as usize] -= force;
        }

        let centroid_before = centroid(&positions);

        for v in 0..n {
            if pinned[v] {
                continue;
            }
            velocities[v] = (velocities[v] + forces[v] * TIME_STEP) * damping;
            positions[v] += velocities[v] * TIME_STEP;
        }

        // The spring field has no external anchor; restoring the centroid
        // every step stops the patch from wandering off.
        if !config.pin_boundary {
            let drift = centroid_before - centroid(&positions);
            for p in &mut positions {
                *p += drift;
            }
        }

        if iteration >= anneal_start {
            damping *= ANNEAL_FACTOR;
        }
    }

    if positions
        .iter()
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        warn!("Relaxation diverged to non-finite coordinates; keeping initial embedding");
        return initial.to_vec();
    }

    debug!(
        "Relaxed {} vertices over {} springs for {} iterations",
        n,
        springs.len(),
        iterations
    );

    positions
}

/// One spring per unique edge, stiff on the patch boundary and soft inside.
fn build_springs(mesh: &Mesh, adjacency: &MeshAdjacency, config: &FlattenConfig) -> Vec<Spring> {
    let mut edges: Vec<(u32, u32)> = adjacency.edge_to_faces.keys().copied().collect();
    edges.sort_unstable();

    edges
        .into_iter()
        .map(|(a, b)| Spring {
            a,
            b,
            rest_length: mesh.edge_length(a, b),
            stiffness: if adjacency.is_interior(a, b) {
                config.interior_stiffness
            } else {
                config.boundary_stiffness
            },
        })
        .collect()
}

fn centroid(positions: &[Point2<f64>]) -> Vector2<f64> {
    let mut sum = Vector2::zeros();
    for p in positions {
        sum += p.coords;
    }
    sum / positions.len() as f64
}

/// Mean relative edge-length error of an embedding against the 3D mesh,
/// split into (boundary, interior). Diagnostic used by tests and reporting.
pub fn edge_length_error(mesh: &Mesh, uv: &[Point2<f64>]) -> (f64, f64) {
    let adjacency = MeshAdjacency::build(&mesh.faces);

    let mut boundary_sum = 0.0;
    let mut boundary_count = 0usize;
    let mut interior_sum = 0.0;
    let mut interior_count = 0usize;

    for &(a, b) in adjacency.edge_to_faces.keys() {
        let len_3d = mesh.edge_length(a, b);
        if len_3d < 1e-12 {
            continue;
        }
        let len_2d = (uv[a as usize] - uv[b as usize]).norm();
        let error = (len_2d - len_3d).abs() / len_3d;

        if adjacency.is_interior(a, b) {
            interior_sum += error;
            interior_count += 1;
        } else {
            boundary_sum += error;
            boundary_count += 1;
        }
    }

    (
        if boundary_count > 0 {
            boundary_sum / boundary_count as f64
        } else {
            0.0
        },
        if interior_count > 0 {
            interior_sum / interior_count as f64
        } else {
            0.0
        },
    )
}
