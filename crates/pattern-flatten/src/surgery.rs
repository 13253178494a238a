//! Topological surgery: vertex splitting along seam edges and the
//! shortest-path cylinder cut.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use pattern_mesh::{edge_key, MeshAdjacency};
use tracing::{debug, info};

use crate::error::FlattenError;
use crate::patch::Patch;
use crate::topology::TopologyReport;

/// Boundary loops are sub-sampled to this many vertices before the
/// closest-pair search.
const LOOP_SAMPLE_LIMIT: usize = 20;

/// Open the patch along the given edges by duplicating vertices.
///
/// For every vertex incident to a cut edge, its incident faces are grouped
/// into fans: faces stay in one fan when they share an interior, non-cut
/// edge at that vertex. The fan containing the lowest face index keeps the
/// original vertex; every other fan gets a fresh duplicate sharing the 3D
/// position and global index. Afterwards no face pair is linked across a cut
/// edge, while the cut path's endpoints stay single where their fan is still
/// connected around the tip.
///
/// Returns the number of duplicates created.
pub fn cut_along_edges(patch: &mut Patch, cut_edges: &HashSet<(u32, u32)>) -> usize {
    if cut_edges.is_empty() || patch.mesh.faces.is_empty() {
        return 0;
    }

    // Fans are computed against the pre-cut topology; rewrites are applied
    // after so one vertex's renames cannot leak into another's grouping.
    let original_faces = patch.mesh.faces.clone();
    let adjacency = MeshAdjacency::build(&original_faces);

    let mut cut_vertices: Vec<u32> = cut_edges.iter().flat_map(|&(a, b)| [a, b]).collect();
    cut_vertices.sort_unstable();
    cut_vertices.dedup();

    let mut duplicates = 0;

    for &v in &cut_vertices {
        let Some(incident) = adjacency.faces_for_vertex(v) else {
            continue;
        };
        let mut incident: Vec<u32> = incident.to_vec();
        incident.sort_unstable();

        // Wing vertex w → positions (into `incident`) of faces with edge (v, w).
        let mut wings: HashMap<u32, Vec<usize>> = HashMap::new();
        for (pos, &f) in incident.iter().enumerate() {
            for &w in &original_faces[f as usize] {
                if w != v {
                    wings.entry(w).or_default().push(pos);
                }
            }
        }

        // Union the fans across interior non-cut edges. An edge shared by one
        // face is boundary, by three or more non-manifold; neither connects.
        let mut parent: Vec<usize> = (0..incident.len()).collect();
        for (&w, positions) in &wings {
            if positions.len() != 2 || cut_edges.contains(&edge_key(v, w)) {
                continue;
            }
            let (a, b) = (find(&mut parent, positions[0]), find(&mut parent, positions[1]));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        // Collect fans ordered by their smallest face index.
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for pos in 0..incident.len() {
            let root = find(&mut parent, pos);
            groups.entry(root).or_default().push(pos);
        }
        if groups.len() <= 1 {
            continue;
        }
        let mut group_list: Vec<Vec<usize>> = groups.into_values().collect();
        group_list.sort_by_key(|g| incident[g[0]]);

        // First fan keeps the original index; the rest get duplicates.
        for group in &group_list[1..] {
            let new_idx = patch.mesh.vertices.len() as u32;
            let vertex = patch.mesh.vertices[v as usize].clone();
            patch.mesh.vertices.push(vertex);
            patch.vertex_map.push(patch.vertex_map[v as usize]);
            if patch.red_vertices.contains(&v) {
                patch.red_vertices.insert(new_idx);
            }

            for &pos in group {
                for slot in patch.mesh.faces[incident[pos] as usize].iter_mut() {
                    if *slot == v {
                        *slot = new_idx;
                    }
                }
            }
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        debug!(
            "Cut along {} edges: {} vertices duplicated",
            cut_edges.len(),
            duplicates
        );
    }

    duplicates
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Edges of the patch whose endpoints are both seam-marked.
pub fn internal_seam_edges(patch: &Patch) -> HashSet<(u32, u32)> {
    let mut seams = HashSet::new();
    for &[v0, v1, v2] in &patch.mesh.faces {
        for &(a, b) in &[(v0, v1), (v1, v2), (v2, v0)] {
            if patch.red_vertices.contains(&a) && patch.red_vertices.contains(&b) {
                seams.insert(edge_key(a, b));
            }
        }
    }
    seams
}

/// Open any internal seams (red paths that failed to separate the patch).
///
/// Triggers only when the patch holds at least two red vertices joined by at
/// least one seam edge. Returns the number of duplicated vertices.
pub fn split_internal_seams(patch: &mut Patch) -> usize {
    if patch.red_vertices.len() < 2 {
        return 0;
    }
    let seams = internal_seam_edges(patch);
    if seams.is_empty() {
        return 0;
    }

    info!(
        "Splitting patch along {} internal seam edges ({} red vertices)",
        seams.len(),
        patch.red_vertices.len()
    );
    cut_along_edges(patch, &seams)
}

/// Cut a cylinder patch into a disk along the shortest edge path between its
/// two largest boundary loops.
pub fn cut_cylinder(patch: &mut Patch, report: &TopologyReport) -> Result<usize, FlattenError> {
    if report.boundary_loops.len() < 2 {
        return Err(FlattenError::NotACylinder {
            loops: report.boundary_loops.len(),
        });
    }

    let loop_a = &report.boundary_loops[0];
    let loop_b = &report.boundary_loops[1];

    // The closest sample pair anchors the cut; sub-sampling bounds the
    // quadratic pair search on dense loops.
    let samples_a = subsample(loop_a);
    let samples_b = subsample(loop_b);

    let mut best: Option<(u32, u32)> = None;
    let mut best_dist = f64::INFINITY;
    for &a in &samples_a {
        for &b in &samples_b {
            let d = patch.mesh.edge_length(a, b);
            if d < best_dist {
                best_dist = d;
                best = Some((a, b));
            }
        }
    }
    let (start, goal) = best.ok_or(FlattenError::NoCutPath)?;

    let adjacency = MeshAdjacency::build(&patch.mesh.faces);
    let neighbors = adjacency.vertex_neighbors();
    let mut path =
        bfs_path(&neighbors, start, goal, patch.vertex_count()).ok_or(FlattenError::NoCutPath)?;

    // Snap the path onto the loops if a guard ever hands us a stray end.
    snap_endpoint(&patch.mesh, &mut path, loop_a, true);
    snap_endpoint(&patch.mesh, &mut path, loop_b, false);

    let mut cut_edges = HashSet::new();
    for pair in path.windows(2) {
        if pair[0] != pair[1] {
            cut_edges.insert(edge_key(pair[0], pair[1]));
        }
    }
    if cut_edges.is_empty() {
        return Err(FlattenError::NoCutPath);
    }

    info!(
        "Cylinder cut: path of {} vertices between boundary loops ({} and {} vertices)",
        path.len(),
        loop_a.len(),
        loop_b.len()
    );

    Ok(cut_along_edges(patch, &cut_edges))
}

fn subsample(loop_vertices: &[u32]) -> Vec<u32> {
    let stride = loop_vertices.len().div_ceil(LOOP_SAMPLE_LIMIT).max(1);
    loop_vertices.iter().copied().step_by(stride).collect()
}

/// Hop-shortest path between two vertices, or None when disconnected.
///
/// Neighbor lists are sorted, so the path is deterministic.
fn bfs_path(
    neighbors: &HashMap<u32, Vec<u32>>,
    start: u32,
    goal: u32,
    vertex_count: usize,
) -> Option<Vec<u32>> {
    if start == goal {
        return Some(vec![start]);
    }

    let mut parent: Vec<u32> = vec![u32::MAX; vertex_count];
    let mut queue = VecDeque::new();
    parent[start as usize] = start;
    queue.push_back(start);

    while let Some(v) = queue.pop_front() {
        let Some(next) = neighbors.get(&v) else {
            continue;
        };
        for &n in next {
            if parent[n as usize] != u32::MAX {
                continue;
            }
            parent[n as usize] = v;
            if n == goal {
                let mut path = vec![goal];
                let mut cursor = goal;
                while cursor != start {
                    cursor = parent[cursor as usize];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(n);
        }
    }

    None
}

fn snap_endpoint(mesh: &pattern_mesh::Mesh, path: &mut Vec<u32>, loop_vertices: &[u32], front: bool) {
    let end = if front {
        *path.first().expect("path is non-empty")
    } else {
        *path.last().expect("path is non-empty")
    };
    if loop_vertices.binary_search(&end).is_ok() {
        return;
    }

    let nearest = loop_vertices
        .iter()
        .copied()
        .min_by(|&a, &b| {
            mesh.edge_length(a, end)
                .partial_cmp(&mesh.edge_length(b, end))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("boundary loop is non-empty");

    if front {
        path.insert(0, nearest);
    } else {
        path.push(nearest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::distinct_global_vertices;
    use crate::topology::{inspect, PatchClass};
    use pattern_mesh::{Mesh, Vertex};

    /// 3×3 vertex grid (2×2 cells, 8 triangles). Vertex (x, y) = y*3 + x.
    fn grid_patch(red: &[u32]) -> Patch {
        let mut mesh = Mesh::new();
        for y in 0..3 {
            for x in 0..3 {
                let mut v = Vertex::from_coords(x as f64, y as f64, 0.0);
                if red.contains(&(y * 3 + x)) {
                    v = v.with_color(1.0, 0.0, 0.0);
                }
                mesh.vertices.push(v);
            }
        }
        for y in 0..2u32 {
            for x in 0..2u32 {
                let i = y * 3 + x;
                mesh.faces.push([i, i + 1, i + 4]);
                mesh.faces.push([i, i + 4, i + 3]);
            }
        }

        let faces: Vec<u32> = (0..mesh.faces.len() as u32).collect();
        let red_set: HashSet<u32> = red.iter().copied().collect();
        Patch::from_faces(&mesh, &faces, &red_set)
    }

    fn open_tube_patch() -> Patch {
        let mut mesh = Mesh::new();
        for z in [0.0, 1.0] {
            mesh.vertices.push(Vertex::from_coords(0.0, 0.0, z));
            mesh.vertices.push(Vertex::from_coords(1.0, 0.0, z));
            mesh.vertices.push(Vertex::from_coords(0.5, 1.0, z));
        }
        for i in 0..3u32 {
            let j = (i + 1) % 3;
            mesh.faces.push([i, j, j + 3]);
            mesh.faces.push([i, j + 3, i + 3]);
        }
        let faces: Vec<u32> = (0..mesh.faces.len() as u32).collect();
        Patch::from_faces(&mesh, &faces, &HashSet::new())
    }

    #[test]
    fn test_full_seam_separates_grid() {
        // Red middle column 1-4-7 crosses the whole patch.
        let mut patch = grid_patch(&[1, 4, 7]);
        let duplicates = split_internal_seams(&mut patch);

        // Interior vertex 4 and boundary vertices 1, 7 each gain one copy.
        assert_eq!(duplicates, 3);
        assert_eq!(patch.vertex_count(), 12);
        assert_eq!(distinct_global_vertices(&patch), 9);
        assert_eq!(
            pattern_mesh::face_components(&patch.mesh).len(),
            2,
            "cut should separate the grid"
        );
        // Duplicates share the original's global vertex.
        for local in 9..12u32 {
            assert!(patch.vertex_map[local as usize] < 9);
        }
    }

    #[test]
    fn test_dead_end_seam_keeps_tip() {
        // One seam edge from boundary vertex 1 into interior vertex 4.
        let mut patch = grid_patch(&[1, 4]);
        let duplicates = split_internal_seams(&mut patch);

        // Vertex 1 splits; the fan around tip vertex 4 stays connected.
        assert_eq!(duplicates, 1);
        assert_eq!(pattern_mesh::face_components(&patch.mesh).len(), 1);
    }

    #[test]
    fn test_no_trigger_on_single_red() {
        let mut patch = grid_patch(&[4]);
        assert_eq!(split_internal_seams(&mut patch), 0);
        assert_eq!(patch.vertex_count(), 9);
    }

    #[test]
    fn test_no_trigger_without_seam_edge() {
        // Two reds on opposite corners: no edge joins them.
        let mut patch = grid_patch(&[0, 8]);
        assert_eq!(split_internal_seams(&mut patch), 0);
    }

    #[test]
    fn test_cylinder_cut_yields_disk() {
        let mut patch = open_tube_patch();
        let report = inspect(&patch.mesh);
        assert_eq!(report.class, PatchClass::Cylinder);

        let duplicates = cut_cylinder(&mut patch, &report).expect("cut succeeds");
        assert_eq!(duplicates, 2);

        let after = inspect(&patch.mesh);
        assert_eq!(after.euler, 1, "cut lifts χ from 0 to 1");
        assert_eq!(after.class, PatchClass::Disk);
        assert_eq!(after.boundary_loops.len(), 1);
    }

    #[test]
    fn test_cylinder_cut_rejects_disk() {
        let mut patch = grid_patch(&[]);
        let report = inspect(&patch.mesh);
        assert!(matches!(
            cut_cylinder(&mut patch, &report),
            Err(FlattenError::NotACylinder { loops: 1 })
        ));
    }

    #[test]
    fn test_cut_is_deterministic() {
        let mut a = grid_patch(&[1, 4, 7]);
        let mut b = grid_patch(&[1, 4, 7]);
        split_internal_seams(&mut a);
        split_internal_seams(&mut b);
        assert_eq!(a.mesh.faces, b.mesh.faces);
        assert_eq!(a.vertex_map, b.vertex_map);
    }
}
