//! Error types for editing operations.

use thiserror::Error;

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;

/// Errors that can occur while editing a document.
///
/// Out-of-bounds coordinates are never reported here: shapes, moves and
/// stamps silently drop cells that land off the grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Invalid grid size {size} (must be 1..={max})")]
    InvalidGridSize { size: usize, max: usize },

    #[error("Frame {index} out of range ({count} frames)")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("Layer {index} out of range ({count} layers)")]
    LayerOutOfRange { index: usize, count: usize },

    #[error("Cannot delete the last layer of a frame")]
    LastLayer,

    #[error("Cannot delete the last frame of a document")]
    LastFrame,

    #[error("Pixel buffer has {actual} cells, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The caller handed over an artwork array that does not match its
    /// declared dimensions. Nothing was written.
    #[error("Malformed stamp: expected {expected} colors, got {actual}")]
    MalformedStamp { expected: usize, actual: usize },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("A move is already in progress")]
    MoveInProgress,

    #[error("No move in progress")]
    NoActiveMove,

    #[error("Move was started on layer {expected}, not layer {actual}")]
    MoveTargetMismatch { expected: u64, actual: u64 },

    /// Two layers in the document carry the same id.
    #[error("Duplicate layer id {0}")]
    DuplicateLayerId(u64),

    #[error("Invalid color '{0}'")]
    InvalidColor(String),
}
