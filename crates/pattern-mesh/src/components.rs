//! Connected-component discovery and fragment filtering.
//!
//! Exported scan meshes routinely carry isolated specks and duplicated
//! slivers alongside the garment surface. Those fragments poison seam
//! segmentation, so they are filtered out before any seam-sensitive analysis.

use std::collections::VecDeque;

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::types::Mesh;

/// Connected components of the face graph induced by shared edges.
///
/// Components are sorted by descending face count; ties break toward the
/// component containing the smallest face index. Face indices within a
/// component are ascending.
pub fn face_components(mesh: &Mesh) -> Vec<Vec<u32>> {
    if mesh.faces.is_empty() {
        return Vec::new();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut visited = vec![false; mesh.faces.len()];
    let mut components: Vec<Vec<u32>> = Vec::new();

    for start in 0..mesh.faces.len() as u32 {
        if visited[start as usize] {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[start as usize] = true;

        while let Some(face_idx) = queue.pop_front() {
            component.push(face_idx);
            let face = mesh.faces[face_idx as usize];
            for neighbor in adjacency.face_neighbors(face, face_idx, None) {
                if !visited[neighbor as usize] {
                    visited[neighbor as usize] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        component.sort_unstable();
        components.push(component);
    }

    components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    debug!(
        "Found {} connected components (largest: {} faces)",
        components.len(),
        components.first().map_or(0, Vec::len)
    );

    components
}

/// Extract the sub-mesh spanned by the given faces.
///
/// Vertices are emitted in first-seen order while walking `faces`; the
/// returned map takes local vertex indices back to indices in `mesh`.
pub fn extract_faces(mesh: &Mesh, faces: &[u32]) -> (Mesh, Vec<u32>) {
    let mut sub = Mesh::with_capacity(faces.len() * 3 / 2, faces.len());
    let mut vertex_map: Vec<u32> = Vec::new();
    let mut global_to_local: HashMap<u32, u32> = HashMap::new();

    for &face_idx in faces {
        let face = mesh.faces[face_idx as usize];
        let mut local = [0u32; 3];
        for (slot, &v) in local.iter_mut().zip(face.iter()) {
            *slot = *global_to_local.entry(v).or_insert_with(|| {
                let idx = sub.vertices.len() as u32;
                sub.vertices.push(mesh.vertices[v as usize].clone());
                vertex_map.push(v);
                idx
            });
        }
        sub.faces.push(local);
    }

    (sub, vertex_map)
}

/// Drop connected components with fewer than `min_faces` faces.
///
/// Returns the filtered mesh and the surviving faces' original indices. A
/// mesh with a single component is returned unchanged regardless of size.
pub fn filter_small_components(mesh: &Mesh, min_faces: usize) -> (Mesh, Vec<u32>) {
    let components = face_components(mesh);

    if components.len() <= 1 {
        let kept = (0..mesh.faces.len() as u32).collect();
        return (mesh.clone(), kept);
    }

    let mut kept_faces: Vec<u32> = Vec::new();
    let mut dropped = 0usize;
    for component in &components {
        if component.len() >= min_faces {
            kept_faces.extend_from_slice(component);
        } else {
            dropped += component.len();
        }
    }
    kept_faces.sort_unstable();

    if dropped > 0 {
        info!(
            "Filtered {} fragment faces across {} components (min {} faces)",
            dropped,
            components.len(),
            min_faces
        );
    }

    let (filtered, _) = extract_faces(mesh, &kept_faces);
    (filtered, kept_faces)
}

/// Keep only the largest connected component.
pub fn largest_component(mesh: &Mesh) -> (Mesh, Vec<u32>) {
    let components = face_components(mesh);
    match components.first() {
        Some(largest) => {
            let (sub, _) = extract_faces(mesh, largest);
            (sub, largest.clone())
        }
        None => (Mesh::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vertex;

    /// Two triangles sharing an edge, plus a far-away isolated triangle.
    fn two_islands() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(50.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(51.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(50.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([1, 3, 2]);
        mesh.faces.push([4, 5, 6]);
        mesh
    }

    #[test]
    fn test_components_sorted_by_size() {
        let mesh = two_islands();
        let components = face_components(&mesh);

        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec![0, 1]);
        assert_eq!(components[1], vec![2]);
    }

    #[test]
    fn test_filter_small_components() {
        let mesh = two_islands();
        let (filtered, kept) = filter_small_components(&mesh, 2);

        assert_eq!(filtered.face_count(), 2);
        assert_eq!(filtered.vertex_count(), 4);
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_single_component_untouched() {
        let mut mesh = two_islands();
        mesh.faces.truncate(2);
        let (filtered, kept) = filter_small_components(&mesh, 100);

        // One component: size threshold does not apply.
        assert_eq!(filtered.face_count(), 2);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_largest_component() {
        let mesh = two_islands();
        let (largest, faces) = largest_component(&mesh);

        assert_eq!(largest.face_count(), 2);
        assert_eq!(faces, vec![0, 1]);
    }

    #[test]
    fn test_extract_faces_first_seen_order() {
        let mesh = two_islands();
        let (sub, vertex_map) = extract_faces(&mesh, &[2]);

        assert_eq!(sub.face_count(), 1);
        assert_eq!(sub.faces[0], [0, 1, 2]);
        assert_eq!(vertex_map, vec![4, 5, 6]);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert!(face_components(&mesh).is_empty());
        let (largest, faces) = largest_component(&mesh);
        assert!(largest.is_empty());
        assert!(faces.is_empty());
    }
}
