//! Mesh topology queries via adjacency structures.

use hashbrown::{HashMap, HashSet};

use crate::types::edge_key;

/// Lightweight topology structure for mesh queries.
///
/// Provides efficient lookups for vertex-to-face, edge-to-face, and
/// face-to-face relationships without the overhead of a full half-edge data
/// structure. Built per stage from a face list and discarded with it.
///
/// Non-manifold edges (more than 2 incident faces) are never fatal: every
/// query that distinguishes interior from boundary treats them as boundary
/// on all sides.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps vertex index → list of face indices that use this vertex.
    pub vertex_to_faces: HashMap<u32, Vec<u32>>,

    /// Maps edge (min_idx, max_idx) → list of face indices that share this edge.
    pub edge_to_faces: HashMap<(u32, u32), Vec<u32>>,
}

impl MeshAdjacency {
    /// Build adjacency structures from a face list.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut vertex_to_faces: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut edge_to_faces: HashMap<(u32, u32), Vec<u32>> = HashMap::new();

        for (face_idx, &[v0, v1, v2]) in faces.iter().enumerate() {
            let face_idx = face_idx as u32;

            vertex_to_faces.entry(v0).or_default().push(face_idx);
            vertex_to_faces.entry(v1).or_default().push(face_idx);
            vertex_to_faces.entry(v2).or_default().push(face_idx);

            for &(a, b) in &[(v0, v1), (v1, v2), (v2, v0)] {
                edge_to_faces.entry(edge_key(a, b)).or_default().push(face_idx);
            }
        }

        Self {
            vertex_to_faces,
            edge_to_faces,
        }
    }

    /// Whether an edge is interior: shared by exactly 2 faces.
    ///
    /// Boundary edges (1 face) and non-manifold edges (3+) both answer false.
    #[inline]
    pub fn is_interior(&self, a: u32, b: u32) -> bool {
        self.edge_to_faces
            .get(&edge_key(a, b))
            .map_or(false, |f| f.len() == 2)
    }

    /// The two faces across an interior edge, or None for boundary and
    /// non-manifold edges.
    pub fn interior_pair(&self, a: u32, b: u32) -> Option<(u32, u32)> {
        match self.edge_to_faces.get(&edge_key(a, b)).map(|f| f.as_slice()) {
            Some(&[f0, f1]) => Some((f0, f1)),
            _ => None,
        }
    }

    /// Find boundary edges: edges not shared by exactly 2 faces.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() != 2)
            .map(|(&edge, _)| edge)
    }

    /// Count boundary edges.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() != 2)
            .count()
    }

    /// The set of vertices lying on at least one boundary edge.
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        let mut out = HashSet::new();
        for (a, b) in self.boundary_edges() {
            out.insert(a);
            out.insert(b);
        }
        out
    }

    /// Get faces adjacent to a vertex.
    pub fn faces_for_vertex(&self, vertex_idx: u32) -> Option<&[u32]> {
        self.vertex_to_faces.get(&vertex_idx).map(|v| v.as_slice())
    }

    /// Get faces adjacent to an edge.
    /// The edge is automatically canonicalized (min, max).
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[u32]> {
        self.edge_to_faces.get(&edge_key(v0, v1)).map(|v| v.as_slice())
    }

    /// Faces sharing an interior edge with `face`, in ascending order.
    ///
    /// Neighbors across a barrier edge are skipped when `barriers` is given.
    pub fn face_neighbors(
        &self,
        face: [u32; 3],
        face_idx: u32,
        barriers: Option<&HashSet<(u32, u32)>>,
    ) -> Vec<u32> {
        let mut out = Vec::with_capacity(3);
        for &(a, b) in &[(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
            let key = edge_key(a, b);
            if barriers.is_some_and(|set| set.contains(&key)) {
                continue;
            }
            if let Some((f0, f1)) = self.interior_pair(a, b) {
                let other = if f0 == face_idx { f1 } else { f0 };
                if other != face_idx {
                    out.push(other);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Undirected vertex→vertex neighbor lists, each sorted ascending.
    ///
    /// Sorted lists keep graph traversals deterministic.
    pub fn vertex_neighbors(&self) -> HashMap<u32, Vec<u32>> {
        let mut neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(a, b) in self.edge_to_faces.keys() {
            neighbors.entry(a).or_default().push(b);
            neighbors.entry(b).or_default().push(a);
        }
        for list in neighbors.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        neighbors
    }
}
