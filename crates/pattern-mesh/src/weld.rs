//! Spatial-hash vertex welding and degenerate-face removal.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::types::{Mesh, Vertex};

/// Weld vertices closer than `epsilon`, returning the welded mesh and the
/// old→new vertex index map.
///
/// Uses spatial hashing with a cell side of 10·epsilon. Each input vertex is
/// probed against the 27-cell neighborhood of already-emitted vertices and
/// merged into the first one within epsilon, so no two output vertices are
/// closer than epsilon. Faces whose remapped corners are not pairwise
/// distinct are dropped in a second pass.
///
/// When two colored vertices merge, the representative keeps whichever color
/// has the larger red channel, so seam markers survive welding.
///
/// Welding an already-welded mesh at the same tolerance is the identity.
pub fn weld_vertices(mesh: &Mesh, epsilon: f64) -> (Mesh, Vec<u32>) {
    if mesh.vertices.is_empty() || epsilon <= 0.0 {
        let map = (0..mesh.vertices.len() as u32).collect();
        return (mesh.clone(), map);
    }

    let cell_size = epsilon * 10.0;
    let eps_sq = epsilon * epsilon;

    // Cell → indices into the *output* vertex list.
    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();

    let mut welded = Mesh::with_capacity(mesh.vertices.len(), mesh.faces.len());
    let mut vertex_remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());

    for vertex in &mesh.vertices {
        let cell = pos_to_cell(&vertex.position, cell_size);

        let mut target: Option<u32> = None;
        'probe: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor_cell = (cell.0 + dx, cell.1 + dy, cell.2 + dz);
                    if let Some(candidates) = spatial_hash.get(&neighbor_cell) {
                        for &out_idx in candidates {
                            let out_pos = &welded.vertices[out_idx as usize].position;
                            if (vertex.position - out_pos).norm_squared() <= eps_sq {
                                target = Some(out_idx);
                                break 'probe;
                            }
                        }
                    }
                }
            }
        }

        match target {
            Some(out_idx) => {
                // Max-red representative keeps seam markers through the merge.
                let kept = &mut welded.vertices[out_idx as usize];
                if vertex.red() > kept.red() {
                    kept.color = vertex.color;
                }
                vertex_remap.push(out_idx);
            }
            None => {
                let out_idx = welded.vertices.len() as u32;
                welded.vertices.push(vertex.clone());
                spatial_hash.entry(cell).or_default().push(out_idx);
                vertex_remap.push(out_idx);
            }
        }
    }

    // Remap faces and drop those collapsed by the merge.
    for &[i0, i1, i2] in &mesh.faces {
        let f = [
            vertex_remap[i0 as usize],
            vertex_remap[i1 as usize],
            vertex_remap[i2 as usize],
        ];
        if f[0] != f[1] && f[1] != f[2] && f[0] != f[2] {
            welded.faces.push(f);
        }
    }

    let merged = mesh.vertices.len() - welded.vertices.len();
    let dropped = mesh.faces.len() - welded.faces.len();
    if merged > 0 || dropped > 0 {
        info!(
            "Welded {} vertices (epsilon = {:.2e}), dropped {} degenerate faces: {} → {} verts",
            merged,
            epsilon,
            dropped,
            mesh.vertices.len(),
            welded.vertices.len()
        );
    } else {
        debug!("Weld pass left mesh unchanged ({} vertices)", mesh.vertices.len());
    }

    (welded, vertex_remap)
}

/// Convert position to spatial hash cell.
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Remove vertices referenced by no face and compact the vertex array.
///
/// Returns the compacted mesh and the old→new map (`u32::MAX` marks removed
/// vertices).
pub fn remove_unreferenced_vertices(mesh: &Mesh) -> (Mesh, Vec<u32>) {
    let mut referenced = vec![false; mesh.vertices.len()];
    for face in &mesh.faces {
        for &v in face {
            referenced[v as usize] = true;
        }
    }

    let mut out = Mesh::with_capacity(mesh.vertices.len(), mesh.faces.len());
    let mut remap = vec![u32::MAX; mesh.vertices.len()];

    for (old_idx, vertex) in mesh.vertices.iter().enumerate() {
        if referenced[old_idx] {
            remap[old_idx] = out.vertices.len() as u32;
            out.vertices.push(vertex.clone());
        }
    }

    for &[i0, i1, i2] in &mesh.faces {
        out.faces.push([
            remap[i0 as usize],
            remap[i1 as usize],
            remap[i2 as usize],
        ]);
    }

    let removed = mesh.vertices.len() - out.vertices.len();
    if removed > 0 {
        debug!("Removed {} unreferenced vertices", removed);
    }

    (out, remap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vertex;
    use approx::assert_relative_eq;

    fn strip_with_duplicate() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0)); // 0
        mesh.vertices.push(Vertex::from_coords(10.0, 0.0, 0.0)); // 1
        mesh.vertices.push(Vertex::from_coords(0.0, 10.0, 0.0)); // 2
        mesh.vertices.push(Vertex::from_coords(10.001, 0.0, 0.0)); // 3, near-dup of 1
        mesh.vertices.push(Vertex::from_coords(10.0, 10.0, 0.0)); // 4
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([3, 2, 4]);
        mesh
    }

    #[test]
    fn test_weld_merges_near_duplicates() {
        let mesh = strip_with_duplicate();
        let (welded, map) = weld_vertices(&mesh, 0.01);

        assert_eq!(welded.vertex_count(), 4);
        assert_eq!(welded.face_count(), 2);
        // Vertex 3 merged into vertex 1's slot.
        assert_eq!(map[3], map[1]);
        assert_eq!(welded.faces[1][0], map[1]);
    }

    #[test]
    fn test_weld_idempotent() {
        let mesh = strip_with_duplicate();
        let (welded, _) = weld_vertices(&mesh, 0.01);
        let (again, map) = weld_vertices(&welded, 0.01);

        assert_eq!(again.vertex_count(), welded.vertex_count());
        assert_eq!(again.faces, welded.faces);
        assert!(map.iter().enumerate().all(|(i, &m)| i as u32 == m));
    }

    #[test]
    fn test_weld_drops_collapsed_faces() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1e-7, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);

        let (welded, _) = weld_vertices(&mesh, 1e-5);
        assert_eq!(welded.vertex_count(), 2);
        assert_eq!(welded.face_count(), 0);
    }

    #[test]
    fn test_weld_keeps_max_red_color() {
        let mut mesh = Mesh::new();
        mesh.vertices
            .push(Vertex::from_coords(0.0, 0.0, 0.0).with_color(0.2, 0.2, 0.2));
        mesh.vertices
            .push(Vertex::from_coords(1e-7, 0.0, 0.0).with_color(0.95, 0.1, 0.1));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.faces.push([0, 2, 3]);
        mesh.faces.push([1, 2, 3]);

        let (welded, map) = weld_vertices(&mesh, 1e-5);
        assert_eq!(map[0], map[1]);
        assert_relative_eq!(welded.vertices[map[0] as usize].red(), 0.95);
    }

    #[test]
    fn test_weld_empty_mesh() {
        let (welded, map) = weld_vertices(&Mesh::new(), 1e-5);
        assert!(welded.is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_unreferenced() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(9.0, 9.0, 9.0)); // orphan
        mesh.faces.push([0, 1, 2]);

        let (out, remap) = remove_unreferenced_vertices(&mesh);
        assert_eq!(out.vertex_count(), 3);
        assert_eq!(remap[3], u32::MAX);
        assert_eq!(out.faces[0], [0, 1, 2]);
    }
}
