//! Pattern patches: self-contained sub-meshes cut out by the segmenter.

use hashbrown::HashSet;
use nalgebra::Point2;
use pattern_mesh::Mesh;

/// A candidate pattern piece.
///
/// Carries its own local vertex and face lists plus the maps back to the
/// conditioned input mesh. After surgery, several local vertices may map to
/// the same global vertex; the local index is always the identity that
/// matters, never a shared pointer.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Local geometry (positions and colors of this patch only).
    pub mesh: Mesh,

    /// Local vertex index → vertex index in the segmented mesh.
    pub vertex_map: Vec<u32>,

    /// Local face index → face index in the segmented mesh.
    pub global_faces: Vec<u32>,

    /// Local indices of seam-marked vertices still present in the patch.
    pub red_vertices: HashSet<u32>,

    /// Set when the patch could not be reduced to a disk; such patches are
    /// still flattened and emitted.
    pub topology_error: bool,
}

impl Patch {
    /// Build a patch from a face subset of `mesh`.
    ///
    /// `red_global` is the mesh-wide red vertex set; the patch records the
    /// local indices of those that survive into its vertex list.
    pub fn from_faces(mesh: &Mesh, faces: &[u32], red_global: &HashSet<u32>) -> Self {
        let (sub, vertex_map) = pattern_mesh::extract_faces(mesh, faces);

        let red_vertices = vertex_map
            .iter()
            .enumerate()
            .filter(|(_, &global)| red_global.contains(&global))
            .map(|(local, _)| local as u32)
            .collect();

        Self {
            mesh: sub,
            vertex_map,
            global_faces: faces.to_vec(),
            red_vertices,
            topology_error: false,
        }
    }

    /// Number of local vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }
}

/// Axis-aligned bounds of a 2D embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBounds {
    pub u_min: f64,
    pub u_max: f64,
    pub v_min: f64,
    pub v_max: f64,
}

impl UvBounds {
    /// Bounds of a point set, or None when it is empty.
    pub fn of(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            u_min: first.x,
            u_max: first.x,
            v_min: first.y,
            v_max: first.y,
        };
        for p in &points[1..] {
            bounds.u_min = bounds.u_min.min(p.x);
            bounds.u_max = bounds.u_max.max(p.x);
            bounds.v_min = bounds.v_min.min(p.y);
            bounds.v_max = bounds.v_max.max(p.y);
        }
        Some(bounds)
    }

    /// An empty bounds at the origin.
    pub fn zero() -> Self {
        Self {
            u_min: 0.0,
            u_max: 0.0,
            v_min: 0.0,
            v_max: 0.0,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.u_max - self.u_min
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.v_max - self.v_min
    }

    /// Bounding-box area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether two bounds share any interior point.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.u_min < other.u_max
            && other.u_min < self.u_max
            && self.v_min < other.v_max
            && other.v_min < self.v_max
    }

    /// Grow to cover `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            u_min: self.u_min.min(other.u_min),
            u_max: self.u_max.max(other.u_max),
            v_min: self.v_min.min(other.v_min),
            v_max: self.v_max.max(other.v_max),
        }
    }
}

/// Count how many distinct global vertices a patch references.
///
/// After surgery this is smaller than the local vertex count because cut
/// duplicates share a global index.
pub fn distinct_global_vertices(patch: &Patch) -> usize {
    patch.vertex_map.iter().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pattern_mesh::Vertex;

    fn quad_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices
            .push(Vertex::from_coords(1.0, 0.0, 0.0).with_color(0.9, 0.1, 0.1));
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([0, 2, 3]);
        mesh
    }

    #[test]
    fn test_patch_from_faces() {
        let mesh = quad_mesh();
        let mut red = HashSet::new();
        red.insert(1u32);

        let patch = Patch::from_faces(&mesh, &[0, 1], &red);
        assert_eq!(patch.face_count(), 2);
        assert_eq!(patch.vertex_count(), 4);
        assert_eq!(patch.global_faces, vec![0, 1]);
        // Global vertex 1 is local vertex 1 (first-seen order).
        assert!(patch.red_vertices.contains(&1));
        assert!(!patch.topology_error);
    }

    #[test]
    fn test_patch_subset() {
        let mesh = quad_mesh();
        let patch = Patch::from_faces(&mesh, &[1], &HashSet::new());
        assert_eq!(patch.vertex_count(), 3);
        assert_eq!(patch.vertex_map, vec![0, 2, 3]);
        assert!(patch.red_vertices.is_empty());
    }

    #[test]
    fn test_uv_bounds() {
        let points = vec![
            Point2::new(1.0, 2.0),
            Point2::new(-1.0, 0.5),
            Point2::new(3.0, 1.0),
        ];
        let bounds = UvBounds::of(&points).expect("non-empty");
        assert_eq!(bounds.u_min, -1.0);
        assert_eq!(bounds.u_max, 3.0);
        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.height(), 1.5);
        assert!(UvBounds::of(&[]).is_none());
    }

    #[test]
    fn test_uv_bounds_overlap() {
        let a = UvBounds {
            u_min: 0.0,
            u_max: 1.0,
            v_min: 0.0,
            v_max: 1.0,
        };
        let b = UvBounds {
            u_min: 0.5,
            u_max: 1.5,
            v_min: 0.5,
            v_max: 1.5,
        };
        let c = UvBounds {
            u_min: 1.1,
            u_max: 2.0,
            v_min: 0.0,
            v_max: 1.0,
        };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
