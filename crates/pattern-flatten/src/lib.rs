//! Seam-driven flattening of garment meshes into 2D pattern pieces.
//!
//! The pipeline takes a triangle mesh whose sewing seams are painted as red
//! vertex colors and produces packed, non-overlapping planar pattern pieces
//! ready for cutting:
//!
//! 1. **Conditioning** — vertex welding and fragment filtering
//!    (via `pattern-mesh`)
//! 2. **Seam extraction** — red-vertex detection, clustering, barrier edges
//! 3. **Segmentation** — face flood-fill with seam barriers and kerf removal
//! 4. **Surgery** — vertex splitting along internal seams, cylinder cutting
//! 5. **Unfolding** — conformal smoothing, tube unrolling, or a BFS fan
//! 6. **Relaxation** — stiff-boundary/soft-interior mass-spring solve
//! 7. **Packing** — shelf layout into a shared UV domain
//!
//! # Example
//!
//! ```no_run
//! use pattern_flatten::{flatten_mesh, FlattenConfig};
//!
//! let mesh = pattern_mesh::load_obj(std::path::Path::new("shirt.obj")).unwrap();
//! let result = flatten_mesh(&mesh, &FlattenConfig::default());
//! for (i, piece) in result.patterns.iter().enumerate() {
//!     println!("piece {}: {} triangles", i, piece.local_faces.len());
//! }
//! ```

mod config;
mod error;
mod patch;

pub mod pack;
pub mod pipeline;
pub mod relax;
pub mod seams;
pub mod segment;
pub mod surgery;
pub mod topology;
pub mod unfold;

pub use config::{FlattenConfig, RedThreshold};
pub use error::FlattenError;
pub use patch::{Patch, UvBounds};
pub use pipeline::{
    flatten_mesh, flatten_mesh_with_hooks, FlatPattern, FlattenResult, PipelineHooks,
    PipelineStage,
};
pub use seams::{extract_seams, SeamPath, SeamSet};
pub use segment::segment_mesh;
pub use topology::{inspect, PatchClass, TopologyReport};
pub use unfold::InitialStrategy;
