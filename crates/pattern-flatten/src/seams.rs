//! Seam extraction: red-vertex detection, clustering, and barrier edges.
//!
//! The face-flood segmenter can only honor barriers that are actual mesh
//! edges, so the product of this stage is the set of edges whose endpoints
//! are both seam-marked. Clustering exists for diagnostics and display; the
//! segmenter consumes the barrier set alone.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use pattern_mesh::{edge_key, Mesh};
use tracing::{debug, info};

use crate::config::FlattenConfig;

/// A chain of seam vertices, for display only.
#[derive(Debug, Clone)]
pub struct SeamPath {
    /// Vertex indices into the conditioned mesh, in walk order.
    pub vertices: Vec<u32>,
}

/// Output of seam extraction.
#[derive(Debug, Clone, Default)]
pub struct SeamSet {
    /// All vertices passing the red predicate.
    pub red_vertices: HashSet<u32>,

    /// Mesh edges with both endpoints red; the segmenter's barriers.
    pub barrier_edges: HashSet<(u32, u32)>,

    /// Density clusters of red vertices, largest first (diagnostic).
    pub clusters: Vec<Vec<u32>>,

    /// Seam polylines walked through the barrier edges (display).
    pub paths: Vec<SeamPath>,
}

/// Extract seam information from a colored mesh.
///
/// Deterministic: running twice on the same mesh yields identical output.
pub fn extract_seams(mesh: &Mesh, config: &FlattenConfig) -> SeamSet {
    let mut red_vertices: HashSet<u32> = HashSet::new();
    let mut red_ordered: Vec<u32> = Vec::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        if config.red_threshold.is_red(vertex) {
            red_vertices.insert(idx as u32);
            red_ordered.push(idx as u32);
        }
    }

    if red_ordered.is_empty() {
        debug!("No red vertices found; mesh flattens as a single patch");
        return SeamSet::default();
    }

    // Sparse tagging leaves gaps within one stroke; the cluster radius grows
    // with the mesh so those gaps close while distinct seams stay apart.
    let eps = config
        .cluster_eps
        .max(config.cluster_eps_fraction * mesh.diameter());
    let clusters = cluster_red_vertices(mesh, &red_ordered, eps);

    let mut barrier_edges: HashSet<(u32, u32)> = HashSet::new();
    for &[v0, v1, v2] in &mesh.faces {
        for &(a, b) in &[(v0, v1), (v1, v2), (v2, v0)] {
            if red_vertices.contains(&a) && red_vertices.contains(&b) {
                barrier_edges.insert(edge_key(a, b));
            }
        }
    }

    let paths = walk_seam_paths(&barrier_edges);

    info!(
        "Seams: {} red vertices, {} clusters (eps = {:.4}), {} barrier edges, {} paths",
        red_ordered.len(),
        clusters.len(),
        eps,
        barrier_edges.len(),
        paths.len()
    );

    SeamSet {
        red_vertices,
        barrier_edges,
        clusters,
        paths,
    }
}

/// Density clustering of red vertices by transitive ε-absorption.
///
/// Clusters of size 1 are discarded; the rest are ordered by descending size
/// (ties toward the smaller first vertex).
fn cluster_red_vertices(mesh: &Mesh, red: &[u32], eps: f64) -> Vec<Vec<u32>> {
    if eps <= 0.0 {
        return Vec::new();
    }

    // Spatial hash over the red subset only.
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for &v in red {
        grid.entry(cell_of(&mesh.vertices[v as usize].position, eps))
            .or_default()
            .push(v);
    }

    let eps_sq = eps * eps;
    let mut visited: HashSet<u32> = HashSet::new();
    let mut clusters: Vec<Vec<u32>> = Vec::new();

    for &seed in red {
        if visited.contains(&seed) {
            continue;
        }

        let mut cluster = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(seed);
        visited.insert(seed);

        while let Some(v) = queue.pop_front() {
            cluster.push(v);
            let pos = mesh.vertices[v as usize].position;
            let cell = cell_of(&pos, eps);

            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                        else {
                            continue;
                        };
                        for &other in candidates {
                            if visited.contains(&other) {
                                continue;
                            }
                            let d = mesh.vertices[other as usize].position - pos;
                            if d.norm_squared() <= eps_sq {
                                visited.insert(other);
                                queue.push_back(other);
                            }
                        }
                    }
                }
            }
        }

        if cluster.len() >= 2 {
            cluster.sort_unstable();
            clusters.push(cluster);
        }
    }

    clusters.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    clusters
}

#[inline]
fn cell_of(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Walk the barrier-edge subgraph into polyline chains.
///
/// Open chains are walked from their endpoints (degree ≠ 2) first, then any
/// remaining cycles. Edges are consumed once, so the chains partition the
/// barrier set.
fn walk_seam_paths(barriers: &HashSet<(u32, u32)>) -> Vec<SeamPath> {
    let mut neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in barriers {
        neighbors.entry(a).or_default().push(b);
        neighbors.entry(b).or_default().push(a);
    }
    for list in neighbors.values_mut() {
        list.sort_unstable();
    }

    let mut vertices: Vec<u32> = neighbors.keys().copied().collect();
    vertices.sort_unstable();

    let mut used: HashSet<(u32, u32)> = HashSet::new();
    let mut paths = Vec::new();

    // Two sweeps: chain endpoints first, then leftover cycles.
    for cycle_sweep in [false, true] {
        for &start in &vertices {
            let degree = neighbors[&start].len();
            if !cycle_sweep && degree == 2 {
                continue;
            }

            loop {
                let Some(&next) = neighbors[&start]
                    .iter()
                    .find(|&&n| !used.contains(&edge_key(start, n)))
                else {
                    break;
                };

                let mut path = vec![start];
                used.insert(edge_key(start, next));
                let mut prev = start;
                let mut current = next;

                loop {
                    path.push(current);
                    let step = neighbors[&current]
                        .iter()
                        .find(|&&n| n != prev && !used.contains(&edge_key(current, n)))
                        .copied();
                    match step {
                        Some(n) => {
                            used.insert(edge_key(current, n));
                            prev = current;
                            current = n;
                        }
                        None => break,
                    }
                }

                paths.push(SeamPath { vertices: path });
            }
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pattern_mesh::Vertex;

    /// A strip of 4 triangles with a red edge across the middle.
    fn striped_strip() -> Mesh {
        let mut mesh = Mesh::new();
        // Two columns of a quad strip; middle column (2, 3) is red.
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0)); // 0
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0)); // 1
        mesh.vertices
            .push(Vertex::from_coords(1.0, 0.0, 0.0).with_color(0.9, 0.1, 0.1)); // 2
        mesh.vertices
            .push(Vertex::from_coords(1.0, 1.0, 0.0).with_color(0.9, 0.1, 0.1)); // 3
        mesh.vertices.push(Vertex::from_coords(2.0, 0.0, 0.0)); // 4
        mesh.vertices.push(Vertex::from_coords(2.0, 1.0, 0.0)); // 5
        mesh.faces.push([0, 2, 1]);
        mesh.faces.push([1, 2, 3]);
        mesh.faces.push([2, 4, 3]);
        mesh.faces.push([3, 4, 5]);
        mesh
    }

    #[test]
    fn test_red_detection_and_barriers() {
        let mesh = striped_strip();
        let seams = extract_seams(&mesh, &FlattenConfig::default());

        assert_eq!(seams.red_vertices.len(), 2);
        assert!(seams.red_vertices.contains(&2));
        assert!(seams.red_vertices.contains(&3));
        assert_eq!(seams.barrier_edges.len(), 1);
        assert!(seams.barrier_edges.contains(&(2, 3)));
    }

    #[test]
    fn test_cluster_groups_nearby_reds() {
        let mesh = striped_strip();
        // The fixture is tiny, so the user floor stands in for the adaptive
        // radius a real garment would get.
        let config = FlattenConfig {
            cluster_eps: 1.5,
            ..FlattenConfig::default()
        };
        let seams = extract_seams(&mesh, &config);

        assert_eq!(seams.clusters.len(), 1);
        assert_eq!(seams.clusters[0], vec![2, 3]);
    }

    #[test]
    fn test_sparse_reds_stay_singletons() {
        let mesh = striped_strip();
        // Adaptive eps (5% of a ~2.2 diameter) is far below the 1.0 spacing
        // between the two reds, so neither reaches cluster size 2.
        let seams = extract_seams(&mesh, &FlattenConfig::default());
        assert!(seams.clusters.is_empty());
        // Barriers do not depend on clustering.
        assert_eq!(seams.barrier_edges.len(), 1);
    }

    #[test]
    fn test_no_color_no_seams() {
        let mut mesh = striped_strip();
        for v in &mut mesh.vertices {
            v.color = None;
        }
        let seams = extract_seams(&mesh, &FlattenConfig::default());

        assert!(seams.red_vertices.is_empty());
        assert!(seams.barrier_edges.is_empty());
        assert!(seams.paths.is_empty());
    }

    #[test]
    fn test_extraction_deterministic() {
        let mesh = striped_strip();
        let config = FlattenConfig::default();
        let a = extract_seams(&mesh, &config);
        let b = extract_seams(&mesh, &config);

        assert_eq!(a.red_vertices, b.red_vertices);
        assert_eq!(a.barrier_edges, b.barrier_edges);
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(
            a.paths.iter().map(|p| &p.vertices).collect::<Vec<_>>(),
            b.paths.iter().map(|p| &p.vertices).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_seam_path_walk() {
        // Chain 0-1-2-3 in the barrier graph.
        let mut barriers = HashSet::new();
        barriers.insert((0u32, 1u32));
        barriers.insert((1u32, 2u32));
        barriers.insert((2u32, 3u32));

        let paths = walk_seam_paths(&barriers);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_seam_cycle_walk() {
        let mut barriers = HashSet::new();
        barriers.insert((0u32, 1u32));
        barriers.insert((1u32, 2u32));
        barriers.insert((0u32, 2u32));

        let paths = walk_seam_paths(&barriers);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].vertices.len(), 4); // closed: start repeated at end
        assert_eq!(paths[0].vertices[0], 0);
        assert_eq!(*paths[0].vertices.last().unwrap(), 0);
    }
}
