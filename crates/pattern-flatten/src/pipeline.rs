//! Pipeline orchestrator: conditioning → seams → segmentation → per-patch
//! flattening → packing.

use nalgebra::Point2;
use pattern_mesh::{filter_small_components, remove_unreferenced_vertices, weld_vertices, Mesh};
use tracing::{debug, info, warn};

use crate::config::FlattenConfig;
use crate::pack::pack_patterns;
use crate::patch::{Patch, UvBounds};
use crate::relax::relax;
use crate::seams::{extract_seams, SeamPath};
use crate::segment::segment_mesh;
use crate::surgery::{cut_cylinder, split_internal_seams};
use crate::topology::{inspect, PatchClass};
use crate::unfold::{choose_initial, is_elongated, InitialStrategy};

/// One flattened pattern piece.
#[derive(Debug, Clone)]
pub struct FlatPattern {
    /// Planar coordinates, one per local vertex, in the packed UV domain.
    pub uv: Vec<Point2<f64>>,

    /// Triangles indexing into `uv`.
    pub local_faces: Vec<[u32; 3]>,

    /// Face indices into the conditioned input mesh.
    pub global_faces: Vec<u32>,

    /// Local → conditioned-mesh vertex index map. Cut duplicates share a
    /// global index.
    pub vertex_map: Vec<u32>,

    /// Bounding box in the packed domain.
    pub bounds: UvBounds,

    /// The patch could not be reduced to a disk; its flattening is
    /// best-effort.
    pub topology_error: bool,

    /// Which initial-embedding strategy was used.
    pub strategy: InitialStrategy,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct FlattenResult {
    /// Pattern pieces, largest first.
    pub patterns: Vec<FlatPattern>,

    /// Overall bounds of the packed domain.
    pub bounds: Option<UvBounds>,

    /// Sum of per-pattern bounding-box areas.
    pub total_area: f64,

    /// Extracted seam paths, echoed for display.
    pub seams: Vec<SeamPath>,

    /// Human-readable anomalies (non-disk patches, cancelled stages).
    pub warnings: Vec<String>,
}

/// Pipeline stages reported through [`PipelineHooks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Welding,
    Filtering,
    Seams,
    Segmenting,
    /// Flattening patch `index` of `total`.
    Flattening { index: usize, total: usize },
    Packing,
}

/// Host hooks: stage progress and cooperative cancellation.
///
/// The cancel predicate is checked between stages and between patches; on
/// cancellation the patches flattened so far are packed and returned, and
/// partially processed patches are dropped.
#[derive(Default)]
pub struct PipelineHooks<'a> {
    pub progress: Option<&'a mut dyn FnMut(PipelineStage)>,
    pub cancel: Option<&'a dyn Fn() -> bool>,
}

impl<'a> PipelineHooks<'a> {
    fn report(&mut self, stage: PipelineStage) {
        if let Some(progress) = self.progress.as_mut() {
            progress(stage);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c())
    }
}

/// Run the full flattening pipeline with default hooks.
pub fn flatten_mesh(mesh: &Mesh, config: &FlattenConfig) -> FlattenResult {
    flatten_mesh_with_hooks(mesh, config, PipelineHooks::default())
}

/// Run the full flattening pipeline.
///
/// Never fails: an empty input yields an empty result, and per-patch
/// problems surface as `topology_error` flags and warnings rather than
/// errors.
pub fn flatten_mesh_with_hooks(
    mesh: &Mesh,
    config: &FlattenConfig,
    mut hooks: PipelineHooks<'_>,
) -> FlattenResult {
    if mesh.is_empty() {
        info!("Empty input mesh; returning empty result");
        return FlattenResult::default();
    }

    info!(
        "Flattening mesh: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );

    hooks.report(PipelineStage::Welding);
    let (welded, _vertex_map) = weld_vertices(mesh, config.weld_tolerance);

    hooks.report(PipelineStage::Filtering);
    let (filtered, _kept_faces) = filter_small_components(&welded, config.min_component_faces);
    // Welding and filtering can strand vertices; the seam stages expect a
    // compact mesh.
    let (conditioned, _) = remove_unreferenced_vertices(&filtered);
    if conditioned.is_empty() {
        warn!("All components fell below {} faces", config.min_component_faces);
        return FlattenResult::default();
    }

    hooks.report(PipelineStage::Seams);
    let seams = extract_seams(&conditioned, config);

    hooks.report(PipelineStage::Segmenting);
    let patches = segment_mesh(
        &conditioned,
        &seams,
        config.min_patch_faces,
        config.kerf_margin,
    );

    let mut result = FlattenResult {
        seams: seams.paths.clone(),
        ..FlattenResult::default()
    };

    let total = patches.len();
    let mut embeddings: Vec<Vec<Point2<f64>>> = Vec::with_capacity(total);
    let mut flattened: Vec<(Patch, InitialStrategy)> = Vec::with_capacity(total);

    for (index, patch) in patches.into_iter().enumerate() {
        if hooks.cancelled() {
            result
                .warnings
                .push(format!("cancelled after {} of {} patches", index, total));
            warn!("Cancelled after {} of {} patches", index, total);
            break;
        }
        hooks.report(PipelineStage::Flattening { index, total });

        let (patch, strategy, uv) = flatten_patch(patch, config, index, &mut result.warnings);
        embeddings.push(uv);
        flattened.push((patch, strategy));
    }

    hooks.report(PipelineStage::Packing);
    let (bounds, total_area) =
        pack_patterns(&mut embeddings, config.packer_row_width, config.packer_padding);

    for ((patch, strategy), uv) in flattened.into_iter().zip(embeddings) {
        let bounds = UvBounds::of(&uv).unwrap_or_else(UvBounds::zero);
        result.patterns.push(FlatPattern {
            uv,
            local_faces: patch.mesh.faces,
            global_faces: patch.global_faces,
            vertex_map: patch.vertex_map,
            bounds,
            topology_error: patch.topology_error,
            strategy,
        });
    }
    result.bounds = (!result.patterns.is_empty()).then_some(bounds);
    result.total_area = total_area;

    info!(
        "Pipeline complete: {} patterns, total area {:.3}",
        result.patterns.len(),
        result.total_area
    );

    result
}

/// Surgery, topology classification, initial embedding, and relaxation for
/// one patch.
fn flatten_patch(
    mut patch: Patch,
    config: &FlattenConfig,
    index: usize,
    warnings: &mut Vec<String>,
) -> (Patch, InitialStrategy, Vec<Point2<f64>>) {
    // Internal seams first: a red path that failed to separate the patch
    // becomes an open slit.
    let duplicates = split_internal_seams(&mut patch);
    if duplicates > 0 {
        debug!("Patch {}: opened internal seams ({} duplicates)", index, duplicates);
    }

    let mut report = inspect(&patch.mesh);
    let mut was_cylinder = false;

    match report.class {
        PatchClass::Disk => {}
        PatchClass::Cylinder => match cut_cylinder(&mut patch, &report) {
            Ok(_) => {
                was_cylinder = true;
                report = inspect(&patch.mesh);
                debug!("Patch {}: cylinder cut to {:?}", index, report.class);
            }
            Err(e) => {
                warn!("Patch {}: cylinder cut failed: {}", index, e);
                patch.topology_error = true;
                warnings.push(format!("patch {}: cylinder cut failed ({})", index, e));
            }
        },
        PatchClass::Sphere => {
            warn!("Patch {}: closed surface needs a red seam line", index);
            patch.topology_error = true;
            warnings.push(format!(
                "patch {}: closed surface (χ=2) cannot be cut open; mark a seam",
                index
            ));
        }
        PatchClass::Complex => {
            warn!("Patch {}: unclassifiable topology ({})", index, report);
            patch.topology_error = true;
            warnings.push(format!("patch {}: non-disk topology ({})", index, report));
        }
    }

    let prefer_tube = was_cylinder || is_elongated(&patch.mesh);
    let initial = choose_initial(&patch, config, prefer_tube, patch.topology_error);
    debug!(
        "Patch {}: {} initial embedding ({} vertices, {} faces)",
        index,
        initial.strategy,
        patch.vertex_count(),
        patch.face_count()
    );

    let uv = relax(&patch.mesh, &initial.uv, config);

    (patch, initial.strategy, uv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pattern_mesh::Vertex;

    fn small_config() -> FlattenConfig {
        FlattenConfig {
            min_patch_faces: 1,
            min_component_faces: 1,
            ..FlattenConfig::default()
        }
    }

    fn red_striped_grid(n: u32) -> Mesh {
        // n×n vertex grid; the middle column is painted red.
        let mut mesh = Mesh::new();
        let mid = n / 2;
        for y in 0..n {
            for x in 0..n {
                let mut v = Vertex::from_coords(x as f64, y as f64, 0.0);
                if x == mid {
                    v = v.with_color(1.0, 0.05, 0.05);
                }
                mesh.vertices.push(v);
            }
        }
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let i = y * n + x;
                mesh.faces.push([i, i + 1, i + n + 1]);
                mesh.faces.push([i, i + n + 1, i + n]);
            }
        }
        mesh
    }

    #[test]
    fn test_empty_input() {
        let result = flatten_mesh(&Mesh::new(), &FlattenConfig::default());
        assert!(result.patterns.is_empty());
        assert!(result.bounds.is_none());
        assert_eq!(result.total_area, 0.0);
    }

    #[test]
    fn test_red_stripe_gives_two_patterns() {
        let mesh = red_striped_grid(7);
        let result = flatten_mesh(&mesh, &small_config());

        assert_eq!(result.patterns.len(), 2);
        for pattern in &result.patterns {
            assert!(!pattern.topology_error);
            assert_eq!(pattern.uv.len(), pattern.vertex_map.len());
            assert!(pattern
                .uv
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite()));
        }
    }

    #[test]
    fn test_patterns_do_not_overlap() {
        let mesh = red_striped_grid(7);
        let result = flatten_mesh(&mesh, &small_config());

        for i in 0..result.patterns.len() {
            for j in i + 1..result.patterns.len() {
                assert!(!result.patterns[i]
                    .bounds
                    .overlaps(&result.patterns[j].bounds));
            }
        }
    }

    #[test]
    fn test_cancellation_returns_partial() {
        let mesh = red_striped_grid(7);
        let cancel = || true;
        let hooks = PipelineHooks {
            progress: None,
            cancel: Some(&cancel),
        };
        let result = flatten_mesh_with_hooks(&mesh, &small_config(), hooks);

        assert!(result.patterns.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("cancelled")));
    }

    #[test]
    fn test_progress_stages_reported() {
        let mesh = red_striped_grid(5);
        let mut stages = Vec::new();
        let mut record = |stage: PipelineStage| stages.push(stage);
        let hooks = PipelineHooks {
            progress: Some(&mut record),
            cancel: None,
        };
        flatten_mesh_with_hooks(&mesh, &small_config(), hooks);

        assert_eq!(stages[0], PipelineStage::Welding);
        assert!(stages.contains(&PipelineStage::Segmenting));
        assert_eq!(*stages.last().unwrap(), PipelineStage::Packing);
    }
}
