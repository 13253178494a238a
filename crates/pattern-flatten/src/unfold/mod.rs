//! Initial planar embeddings.
//!
//! Three strategies produce the first guess the relaxer then refines:
//! conformal smoothing (the default), tube unrolling for cylinders and
//! elongated patches, and a BFS fan that works on any disk. A planar
//! projection backstops them all. The router tries them in priority order
//! and accepts the first embedding of the right size with finite values.

mod fan;
mod lscm;
mod tube;

use nalgebra::{Point2, Vector3};
use pattern_mesh::Mesh;
use tracing::{debug, warn};

use crate::config::FlattenConfig;
use crate::patch::Patch;

pub use fan::fan_embed;
pub use lscm::lscm_embed;
pub use tube::tube_embed;

/// Which initial-embedding strategy produced a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialStrategy {
    /// Pinned Laplacian conformal smoothing.
    Lscm,
    /// Cylindrical unrolling around the long axis.
    Tube,
    /// BFS geodesic fan.
    Fan,
    /// Planar projection onto the best-fit plane.
    Projection,
}

impl std::fmt::Display for InitialStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InitialStrategy::Lscm => "lscm",
            InitialStrategy::Tube => "tube",
            InitialStrategy::Fan => "fan",
            InitialStrategy::Projection => "projection",
        };
        f.write_str(name)
    }
}

/// An accepted initial embedding.
#[derive(Debug, Clone)]
pub struct InitialEmbedding {
    pub strategy: InitialStrategy,
    pub uv: Vec<Point2<f64>>,
}

/// A patch is elongated when its longest bounding-box side is at least
/// 1.8× the second longest; those unroll better than they smooth.
pub fn is_elongated(mesh: &Mesh) -> bool {
    let Some((min, max)) = mesh.bounds() else {
        return false;
    };
    let mut dims = [max.x - min.x, max.y - min.y, max.z - min.z];
    dims.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    dims[0] >= 1.8 * dims[1]
}

/// Pick the initial embedding for a patch.
///
/// Priority: tube (when the patch was cylinder-cut or is elongated), then
/// conformal smoothing, then the BFS fan, then planar projection.
/// `force_fan` skips the first two for patches already known not to be
/// disks.
pub fn choose_initial(
    patch: &Patch,
    config: &FlattenConfig,
    prefer_tube: bool,
    force_fan: bool,
) -> InitialEmbedding {
    let n = patch.vertex_count();

    if !force_fan {
        if prefer_tube {
            match tube_embed(&patch.mesh) {
                Ok(uv) if accept(&uv, n) => {
                    return InitialEmbedding {
                        strategy: InitialStrategy::Tube,
                        uv,
                    }
                }
                Ok(_) => warn!("Tube unroll returned a malformed embedding; falling back"),
                Err(e) => debug!("Tube unroll unavailable: {}", e),
            }
        }

        let uv = lscm_embed(&patch.mesh, config.lscm_iterations, config.lscm_alpha);
        if accept(&uv, n) {
            return InitialEmbedding {
                strategy: InitialStrategy::Lscm,
                uv,
            };
        }
        warn!("Conformal embedding rejected; falling back to BFS fan");
    }

    let uv = fan_embed(&patch.mesh);
    if accept(&uv, n) {
        return InitialEmbedding {
            strategy: InitialStrategy::Fan,
            uv,
        };
    }

    warn!("BFS fan rejected; using planar projection");
    InitialEmbedding {
        strategy: InitialStrategy::Projection,
        uv: planar_projection(&patch.mesh),
    }
}

/// An embedding is accepted when it covers every vertex with finite values.
fn accept(uv: &[Point2<f64>], vertex_count: usize) -> bool {
    uv.len() == vertex_count && uv.iter().all(|p| p.x.is_finite() && p.y.is_finite())
}

/// Project all vertices onto the mesh's area-weighted best-fit plane.
///
/// Never fails and never produces non-finite values; the quality is whatever
/// the surface curvature allows.
pub fn planar_projection(mesh: &Mesh) -> Vec<Point2<f64>> {
    let centroid = match mesh.centroid() {
        Some(c) => c,
        None => return Vec::new(),
    };

    let mut normal = Vector3::zeros();
    for tri in mesh.triangles() {
        normal += tri.normal_unnormalized();
    }
    if normal.norm_squared() < 1e-20 {
        normal = Vector3::z();
    } else {
        normal.normalize_mut();
    }

    let (u_axis, v_axis) = plane_basis(&normal);

    mesh.vertices
        .iter()
        .map(|vertex| {
            let d = vertex.position - centroid;
            Point2::new(d.dot(&u_axis), d.dot(&v_axis))
        })
        .collect()
}

/// Orthonormal in-plane basis for a unit normal.
pub(crate) fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // Start from the world axis least parallel to the normal.
    let seed = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = normal.cross(&seed).normalize();
    let v_axis = normal.cross(&u_axis).normalize();
    (u_axis, v_axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;
    use pattern_mesh::Vertex;

    fn flat_quad_patch() -> Patch {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([0, 2, 3]);
        Patch::from_faces(&mesh, &[0, 1], &HashSet::new())
    }

    #[test]
    fn test_is_elongated() {
        let mut long = Mesh::new();
        long.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        long.vertices.push(Vertex::from_coords(10.0, 1.0, 0.5));
        assert!(is_elongated(&long));

        let mut square = Mesh::new();
        square.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        square.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        assert!(!is_elongated(&square));
    }

    #[test]
    fn test_projection_preserves_flat_geometry() {
        let patch = flat_quad_patch();
        let uv = planar_projection(&patch.mesh);

        assert_eq!(uv.len(), 4);
        // A flat mesh projects isometrically: edge lengths survive.
        let d01 = (uv[1] - uv[0]).norm();
        assert!((d01 - 1.0).abs() < 1e-9);
        let d02 = (uv[2] - uv[0]).norm();
        assert!((d02 - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_router_accepts_lscm_for_disk() {
        let patch = flat_quad_patch();
        let embedding = choose_initial(&patch, &FlattenConfig::default(), false, false);
        assert_eq!(embedding.strategy, InitialStrategy::Lscm);
        assert_eq!(embedding.uv.len(), patch.vertex_count());
    }

    #[test]
    fn test_router_force_fan() {
        let patch = flat_quad_patch();
        let embedding = choose_initial(&patch, &FlattenConfig::default(), false, true);
        assert_eq!(embedding.strategy, InitialStrategy::Fan);
        assert_eq!(embedding.uv.len(), patch.vertex_count());
    }

    #[test]
    fn test_plane_basis_orthonormal() {
        for normal in [Vector3::z(), Vector3::x(), Vector3::new(1.0, 1.0, 1.0).normalize()] {
            let (u, v) = plane_basis(&normal);
            assert!((u.norm() - 1.0).abs() < 1e-12);
            assert!((v.norm() - 1.0).abs() < 1e-12);
            assert!(u.dot(&v).abs() < 1e-12);
            assert!(u.dot(&normal).abs() < 1e-12);
        }
    }
}
