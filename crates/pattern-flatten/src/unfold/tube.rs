//! Tube unrolling for cylinders and elongated patches.

use nalgebra::{Point2, Vector3};
use pattern_mesh::{Mesh, MeshAdjacency};
use tracing::debug;

use crate::error::FlattenError;

/// Unroll a tube-like patch around its long axis.
///
/// Each vertex gets a cylindrical coordinate (height, angle) around the
/// bounding box's longest axis; the angle maps to an arc length at the mean
/// radius. Fails when the patch has no angular extent to unroll.
pub fn tube_embed(mesh: &Mesh) -> Result<Vec<Point2<f64>>, FlattenError> {
    let (min, max) = mesh.bounds().ok_or(FlattenError::DegenerateEmbedding {
        strategy: "tube",
        details: "empty mesh".to_string(),
    })?;

    let dims = [max.x - min.x, max.y - min.y, max.z - min.z];
    let axis = longest_axis(&dims);
    let (e1, e2) = cross_section_basis(&axis);

    let centroid = mesh.centroid().expect("non-empty mesh");

    let mut heights = Vec::with_capacity(mesh.vertex_count());
    let mut angles = Vec::with_capacity(mesh.vertex_count());
    let mut radius_sum = 0.0;

    for vertex in &mesh.vertices {
        let d = vertex.position - centroid;
        let h = d.dot(&axis);
        let x = d.dot(&e1);
        let y = d.dot(&e2);
        heights.push(h);
        angles.push(y.atan2(x));
        radius_sum += (x * x + y * y).sqrt();
    }

    let (theta_min, theta_max) = min_max(&angles);

    // atan2 jumps at ±π; when the tube spans most of the circle, lift the
    // negative branch so the seam of the parameterization stays continuous.
    if theta_max - theta_min > 1.5 * std::f64::consts::PI {
        for theta in &mut angles {
            if *theta < 0.0 {
                *theta += std::f64::consts::TAU;
            }
        }
    }

    // Seam duplicates from a cylinder cut share a 3D position, so both
    // copies land on the same angle and the seam faces would stretch across
    // the whole strip. A copy whose neighbors all sit a turn away is lifted
    // to their side.
    seam_continuity_pass(mesh, &mut angles);

    let (theta_min, theta_max) = min_max(&angles);
    let theta_range = theta_max - theta_min;

    if theta_range < 1e-9 {
        return Err(FlattenError::DegenerateEmbedding {
            strategy: "tube",
            details: "no angular extent around the axis".to_string(),
        });
    }

    let radius = radius_sum / mesh.vertex_count() as f64;
    let arc_length = radius * theta_range;
    let h_min = heights
        .iter()
        .fold(f64::INFINITY, |lo, &h| lo.min(h));

    debug!(
        "Tube unroll: radius {:.4}, arc {:.4}, theta range {:.3} rad",
        radius, arc_length, theta_range
    );

    Ok(angles
        .iter()
        .zip(&heights)
        .map(|(&theta, &h)| {
            Point2::new((theta - theta_min) / theta_range * arc_length, h - h_min)
        })
        .collect())
}

/// Propagate angular continuity outward from the middle of the range:
/// each vertex reached over a mesh edge is shifted by whole turns until it
/// lies within a half turn of its BFS parent.
///
/// On a closed tube the two fronts meet and the inherent wrap edge is left
/// alone; on a cut tube the seam duplicates are only reachable from their
/// own side and get lifted a full turn to it.
fn seam_continuity_pass(mesh: &Mesh, angles: &mut [f64]) {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let neighbors = adjacency.vertex_neighbors();

    let (lo, hi) = min_max(angles);
    let mid = 0.5 * (lo + hi);
    let mut visited = vec![false; angles.len()];
    let mut queue = std::collections::VecDeque::new();

    // Seed each connected piece from its vertex nearest the range middle.
    loop {
        let mut start = None;
        let mut best = f64::INFINITY;
        for (v, &theta) in angles.iter().enumerate() {
            if !visited[v] && (theta - mid).abs() < best {
                best = (theta - mid).abs();
                start = Some(v);
            }
        }
        let Some(start) = start else {
            break;
        };

        visited[start] = true;
        queue.push_back(start as u32);
        while let Some(v) = queue.pop_front() {
            let Some(list) = neighbors.get(&v) else {
                continue;
            };
            for &n in list {
                if visited[n as usize] {
                    continue;
                }
                visited[n as usize] = true;
                while angles[n as usize] - angles[v as usize] > std::f64::consts::PI {
                    angles[n as usize] -= std::f64::consts::TAU;
                }
                while angles[v as usize] - angles[n as usize] > std::f64::consts::PI {
                    angles[n as usize] += std::f64::consts::TAU;
                }
                queue.push_back(n);
            }
        }
    }
}

fn longest_axis(dims: &[f64; 3]) -> Vector3<f64> {
    if dims[0] >= dims[1] && dims[0] >= dims[2] {
        Vector3::x()
    } else if dims[1] >= dims[2] {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

/// Orthonormal pair spanning the cross-section plane of the axis.
fn cross_section_basis(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let seed = if axis.x.abs() <= axis.y.abs() && axis.x.abs() <= axis.z.abs() {
        Vector3::x()
    } else if axis.y.abs() <= axis.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let e1 = (seed - axis * seed.dot(axis)).normalize();
    let e2 = axis.cross(&e1);
    (e1, e2)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}
