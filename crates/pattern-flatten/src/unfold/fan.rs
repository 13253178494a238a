//! BFS geodesic fan: the last-resort embedding.
//!
//! Lays triangles into the plane one at a time from a central seed face,
//! using only edge lengths (law of cosines and two-circle intersection).
//! Works on any triangle mesh regardless of curvature, with no linear
//! solves; overlapping output is possible on non-developable surfaces and is
//! accepted.

use std::collections::VecDeque;

use nalgebra::{Point2, Vector2};
use pattern_mesh::{Mesh, MeshAdjacency};
use tracing::debug;

use super::planar_projection;

/// Unfold a patch with a breadth-first triangle fan.
///
/// Every vertex receives a finite UV; vertices the fan never reaches are
/// placed from already-placed neighbors, then from a planar projection.
pub fn fan_embed(mesh: &Mesh) -> Vec<Point2<f64>> {
    let n = mesh.vertex_count();
    if n == 0 {
        return Vec::new();
    }
    if mesh.faces.is_empty() {
        return planar_projection(mesh);
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);

    let seed_face = central_face(mesh);
    let [s0, s1, s2] = mesh.faces[seed_face as usize];

    let mut uv: Vec<Option<Point2<f64>>> = vec![None; n];

    // Seed triangle: one vertex at the origin, one on +u, the third in the
    // upper half-plane via the law of cosines.
    let e01 = mesh.edge_length(s0, s1);
    let e02 = mesh.edge_length(s0, s2);
    let e12 = mesh.edge_length(s1, s2);

    uv[s0 as usize] = Some(Point2::new(0.0, 0.0));
    uv[s1 as usize] = Some(Point2::new(e01, 0.0));
    let cos_a = if e01 > 1e-12 && e02 > 1e-12 {
        ((e01 * e01 + e02 * e02 - e12 * e12) / (2.0 * e01 * e02)).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let sin_a = (1.0 - cos_a * cos_a).sqrt();
    uv[s2 as usize] = Some(Point2::new(e02 * cos_a, e02 * sin_a));

    // Seed winding; every placed triangle must keep this sign.
    let seed_sign = signed_area(
        uv[s0 as usize].unwrap(),
        uv[s1 as usize].unwrap(),
        uv[s2 as usize].unwrap(),
    )
    .signum();
    let seed_sign = if seed_sign == 0.0 { 1.0 } else { seed_sign };

    let mut visited = vec![false; mesh.face_count()];
    visited[seed_face as usize] = true;
    let mut queue = VecDeque::new();
    queue.push_back(seed_face);

    while let Some(face_idx) = queue.pop_front() {
        let face = mesh.faces[face_idx as usize];
        for neighbor in adjacency.face_neighbors(face, face_idx, None) {
            if visited[neighbor as usize] {
                continue;
            }

            let nf = mesh.faces[neighbor as usize];
            let placed: Vec<bool> = nf.iter().map(|&v| uv[v as usize].is_some()).collect();
            match placed.iter().filter(|&&p| p).count() {
                3 => {
                    visited[neighbor as usize] = true;
                    queue.push_back(neighbor);
                }
                2 => {
                    if place_third_vertex(mesh, &nf, &mut uv, seed_sign) {
                        visited[neighbor as usize] = true;
                        queue.push_back(neighbor);
                    }
                }
                // Reached through a vertex only; another edge will bring it
                // back once two of its corners are down.
                _ => {}
            }
        }
    }

    finish_stranded(mesh, &adjacency, &mut uv);

    let placed = uv.iter().filter(|p| p.is_some()).count();
    debug!("Fan embedding placed {}/{} vertices via BFS", placed, n);

    uv.into_iter()
        .map(|p| p.unwrap_or_else(|| Point2::new(0.0, 0.0)))
        .collect()
}

/// The face whose centroid is nearest the patch centroid (ties toward the
/// lowest index), so the fan grows outward evenly.
fn central_face(mesh: &Mesh) -> u32 {
    let centroid = mesh.centroid().expect("non-empty mesh");
    let mut best = 0u32;
    let mut best_dist = f64::INFINITY;
    for (idx, tri) in mesh.triangles().enumerate() {
        let d = (tri.centroid() - centroid).norm_squared();
        if d < best_dist {
            best_dist = d;
            best = idx as u32;
        }
    }
    best
}

/// Place a face's one unplaced vertex by intersecting the two circles around
/// its placed anchors. Returns false when the anchors are degenerate.
fn place_third_vertex(
    mesh: &Mesh,
    face: &[u32; 3],
    uv: &mut [Option<Point2<f64>>],
    seed_sign: f64,
) -> bool {
    let unknown_slot = face
        .iter()
        .position(|&v| uv[v as usize].is_none())
        .expect("exactly one unplaced vertex");
    let new_v = face[unknown_slot];
    let a1 = face[(unknown_slot + 1) % 3];
    let a2 = face[(unknown_slot + 2) % 3];

    let p1 = uv[a1 as usize].expect("anchor placed");
    let p2 = uv[a2 as usize].expect("anchor placed");

    let d = (p2 - p1).norm();
    if d < 1e-10 {
        return false;
    }

    let r1 = mesh.edge_length(a1, new_v);
    let r2 = mesh.edge_length(a2, new_v);

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();

    let dir = (p2 - p1) / d;
    let perp = Vector2::new(-dir.y, dir.x);
    let foot = p1 + dir * a;

    // Pick the half-plane that preserves the seed winding. The face's
    // stored vertex order fixes which side is correct.
    let candidate = foot + perp * h;
    let (q0, q1, q2) = ordered_with(face, unknown_slot, candidate, uv);
    let pos = if signed_area(q0, q1, q2) * seed_sign >= 0.0 {
        candidate
    } else {
        foot - perp * h
    };

    uv[new_v as usize] = Some(pos);
    true
}

fn ordered_with(
    face: &[u32; 3],
    unknown_slot: usize,
    candidate: Point2<f64>,
    uv: &[Option<Point2<f64>>],
) -> (Point2<f64>, Point2<f64>, Point2<f64>) {
    let fetch = |slot: usize| {
        if slot == unknown_slot {
            candidate
        } else {
            uv[face[slot] as usize].expect("anchor placed")
        }
    };
    (fetch(0), fetch(1), fetch(2))
}

#[inline]
fn signed_area(p0: Point2<f64>, p1: Point2<f64>, p2: Point2<f64>) -> f64 {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    e1.x * e2.y - e1.y * e2.x
}

/// Vertices the BFS never placed get the mean of their placed neighbors;
/// any still left fall back to a planar projection of their 3D position.
fn finish_stranded(mesh: &Mesh, adjacency: &MeshAdjacency, uv: &mut [Option<Point2<f64>>]) {
    if uv.iter().all(|p| p.is_some()) {
        return;
    }

    let neighbors = adjacency.vertex_neighbors();

    // Neighbor means can cascade, so sweep until nothing changes.
    loop {
        let mut progressed = false;
        for v in 0..uv.len() {
            if uv[v].is_some() {
                continue;
            }
            let Some(list) = neighbors.get(&(v as u32)) else {
                continue;
            };
            let placed: Vec<Point2<f64>> =
                list.iter().filter_map(|&nb| uv[nb as usize]).collect();
            if placed.is_empty() {
                continue;
            }
            let mut sum = Vector2::zeros();
            for p in &placed {
                sum += p.coords;
            }
            uv[v] = Some(Point2::from(sum / placed.len() as f64));
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    if uv.iter().any(|p| p.is_none()) {
        let projected = planar_projection(mesh);
        for (v, slot) in uv.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(projected[v]);
            }
        }
    }
}
