//! Pipeline configuration.

use pattern_mesh::Vertex;

/// Color predicate selecting seam-marked vertices.
///
/// A vertex is "red" when its red channel is high and the other two channels
/// are low, so dark outlines and skin tones do not trigger it.
#[derive(Debug, Clone, Copy)]
pub struct RedThreshold {
    /// Minimum red channel value.
    pub red_min: f64,
    /// Maximum green channel value.
    pub green_max: f64,
    /// Maximum blue channel value.
    pub blue_max: f64,
}

impl Default for RedThreshold {
    fn default() -> Self {
        Self {
            red_min: 0.7,
            green_max: 0.4,
            blue_max: 0.4,
        }
    }
}

impl RedThreshold {
    /// Whether a vertex passes the seam-marker predicate.
    #[inline]
    pub fn is_red(&self, vertex: &Vertex) -> bool {
        match vertex.color {
            Some(c) => c.x >= self.red_min && c.y <= self.green_max && c.z <= self.blue_max,
            None => false,
        }
    }
}

/// Parameters for the full flattening pipeline.
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Distance below which vertices are welded, in world units.
    pub weld_tolerance: f64,

    /// Patches with fewer faces than this are dropped by the segmenter.
    pub min_patch_faces: usize,

    /// Connected components with fewer faces than this are filtered out.
    pub min_component_faces: usize,

    /// Seam-marker color predicate.
    pub red_threshold: RedThreshold,

    /// User floor for the seam clustering radius, in world units.
    pub cluster_eps: f64,

    /// Adaptive clustering radius as a fraction of the mesh diameter.
    /// The effective radius is the larger of this and `cluster_eps`.
    pub cluster_eps_fraction: f64,

    /// Remove every face touching a red vertex, modeling the cutter's kerf.
    /// Off selects the legacy flow that keeps seam faces and opens internal
    /// seams by vertex splitting instead.
    pub kerf_margin: bool,

    /// Mass-spring iterations per patch.
    pub relaxation_iterations: usize,

    /// Spring stiffness for patch boundary edges ("steel").
    pub boundary_stiffness: f64,

    /// Spring stiffness for interior edges ("rubber").
    pub interior_stiffness: f64,

    /// Freeze boundary vertices at their initial embedding positions.
    pub pin_boundary: bool,

    /// Velocity damping factor per integration step.
    pub damping: f64,

    /// Row width of the packing shelf, in UV units.
    pub packer_row_width: f64,

    /// Gap between packed patches, in UV units.
    pub packer_padding: f64,

    /// Laplacian smoothing passes of the conformal initializer.
    pub lscm_iterations: usize,

    /// Blend factor of each Laplacian pass.
    pub lscm_alpha: f64,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-5,
            min_patch_faces: 500,
            min_component_faces: 100,
            red_threshold: RedThreshold::default(),
            cluster_eps: 0.0,
            cluster_eps_fraction: 0.05,
            kerf_margin: true,
            relaxation_iterations: 200,
            boundary_stiffness: 50.0,
            interior_stiffness: 0.2,
            pin_boundary: false,
            damping: 0.995,
            packer_row_width: 4.0,
            packer_padding: 0.02,
            lscm_iterations: 30,
            lscm_alpha: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_threshold() {
        let threshold = RedThreshold::default();

        let red = Vertex::from_coords(0.0, 0.0, 0.0).with_color(0.9, 0.1, 0.1);
        let white = Vertex::from_coords(0.0, 0.0, 0.0).with_color(1.0, 1.0, 1.0);
        let uncolored = Vertex::from_coords(0.0, 0.0, 0.0);

        assert!(threshold.is_red(&red));
        assert!(!threshold.is_red(&white));
        assert!(!threshold.is_red(&uncolored));
    }

    #[test]
    fn test_default_config() {
        let config = FlattenConfig::default();
        assert_eq!(config.min_patch_faces, 500);
        assert_eq!(config.relaxation_iterations, 200);
        assert!((config.boundary_stiffness - 50.0).abs() < 1e-12);
        assert!(!config.pin_boundary);
        assert!(config.kerf_margin);
    }
}
