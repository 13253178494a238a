//! Error types for flattening operations.
//!
//! Failures never cross patch boundaries: the orchestrator catches these,
//! flags the affected patch, and moves on.

use thiserror::Error;

/// Errors that can occur while flattening a single patch.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// A patch expected to be a cylinder did not have two boundary loops.
    #[error("cylinder cut needs 2 boundary loops, found {loops}")]
    NotACylinder { loops: usize },

    /// No edge path could be found between the two boundary loops.
    #[error("no cutting path between boundary loops")]
    NoCutPath,

    /// An initial embedding strategy produced a degenerate result.
    #[error("{strategy} embedding degenerated: {details}")]
    DegenerateEmbedding {
        strategy: &'static str,
        details: String,
    },
}
