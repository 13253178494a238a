//! Colored triangle mesh types and conditioning.
//!
//! This crate provides the mesh data model and the conditioning stages that
//! prepare a raw garment scan for seam segmentation:
//!
//! - **Types**: indexed triangle mesh with optional per-vertex colors
//! - **Adjacency**: vertex/edge/face topology queries
//! - **Welding**: spatial-hash merging of coincident vertices
//! - **Components**: fragment discovery and filtering
//! - **I/O**: OBJ loading and saving with vertex colors
//!
//! # Example
//!
//! ```no_run
//! use pattern_mesh::{load_obj, weld_vertices, filter_small_components};
//!
//! let mesh = load_obj(std::path::Path::new("garment.obj")).unwrap();
//! let (welded, _vertex_map) = weld_vertices(&mesh, 1e-5);
//! let (clean, _kept_faces) = filter_small_components(&welded, 100);
//! ```

mod error;
mod types;

pub mod adjacency;
pub mod components;
pub mod io;
pub mod weld;

// Re-export core types at crate root
pub use error::{MeshError, MeshResult};
pub use types::{edge_key, Mesh, Triangle, Vertex};

// Re-export adjacency at crate root for convenience
pub use adjacency::MeshAdjacency;

// Re-export commonly used functions
pub use components::{extract_faces, face_components, filter_small_components, largest_component};
pub use io::{load_obj, save_obj};
pub use weld::{remove_unreferenced_vertices, weld_vertices};
