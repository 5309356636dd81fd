// ============================================================================
// TRANSFORM OPERATIONS - lift-and-move, flips
// ============================================================================

use crate::canvas::{Color, Layer, index_in_grid};
use crate::error::{EditError, EditResult};

/// One cell lifted off a layer during a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiftedPixel {
    pub x: i32,
    pub y: i32,
    pub color: Color,
    pub original_index: usize,
}

/// Held state of the move engine.
///
/// `Lifting`, `Committed` and `Cancelled` only exist for the duration of a
/// call; between calls the engine is either idle or dragging lifted pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MovePhase {
    #[default]
    Idle,
    Dragging,
}

/// Result of a committed move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveSummary {
    /// Pixels written at their destination.
    pub placed: usize,
    /// Pixels whose destination was off the grid; they are gone.
    pub dropped: usize,
}

/// Lift every painted cell of a layer, drag it, then drop or restore it.
///
/// The caller checkpoints history before [`MoveEngine::start_move`] so both
/// cancel and undo get back to the pre-move layer.
#[derive(Clone, Debug, Default)]
pub struct MoveEngine {
    phase: MovePhase,
    lifted: Vec<LiftedPixel>,
    layer_id: Option<u64>,
    grid_size: usize,
}

impl MoveEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == MovePhase::Dragging
    }

    pub fn lifted(&self) -> &[LiftedPixel] {
        &self.lifted
    }

    /// Id of the layer the current move was lifted from.
    pub fn layer_id(&self) -> Option<u64> {
        self.layer_id
    }

    /// Lift all non-transparent cells and clear them on the layer.
    /// Returns how many were lifted; with none the engine stays idle and the
    /// layer is untouched.
    pub fn start_move(&mut self, layer: &mut Layer) -> EditResult<usize> {
        if self.is_dragging() {
            return Err(EditError::MoveInProgress);
        }
        let size = layer.pixels.size();
        let lifted: Vec<LiftedPixel> = layer
            .pixels
            .iter_opaque()
            .map(|(index, color)| LiftedPixel {
                x: (index % size) as i32,
                y: (index / size) as i32,
                color,
                original_index: index,
            })
            .collect();

        if lifted.is_empty() {
            tracing::debug!("start_move: layer {} is empty, nothing to lift", layer.id);
            return Ok(0);
        }

        for p in &lifted {
            layer.pixels.set(p.original_index, Color::Transparent);
        }
        let count = lifted.len();
        self.lifted = lifted;
        self.layer_id = Some(layer.id);
        self.grid_size = size;
        self.phase = MovePhase::Dragging;
        tracing::debug!("start_move: lifted {} pixels from layer {}", count, layer.id);
        Ok(count)
    }

    /// Where the lifted cells would land at `(dx, dy)`. Off-grid landings are
    /// omitted. Nothing is written; empty unless dragging.
    pub fn preview_move(&self, dx: i32, dy: i32) -> Vec<(usize, Color)> {
        if !self.is_dragging() {
            return Vec::new();
        }
        self.lifted
            .iter()
            .filter_map(|p| index_in_grid(p.x + dx, p.y + dy, self.grid_size).map(|i| (i, p.color)))
            .collect()
    }

    /// Drop the lifted cells at `(dx, dy)` and return to idle.
    pub fn commit_move(&mut self, layer: &mut Layer, dx: i32, dy: i32) -> EditResult<MoveSummary> {
        self.check_target(layer)?;
        let size = layer.pixels.size();
        let mut summary = MoveSummary::default();
        for p in self.lifted.drain(..) {
            match index_in_grid(p.x + dx, p.y + dy, size) {
                Some(i) => {
                    layer.pixels.set(i, p.color);
                    summary.placed += 1;
                }
                None => summary.dropped += 1,
            }
        }
        self.reset();
        tracing::debug!(
            "commit_move: ({}, {}) placed {} dropped {}",
            dx,
            dy,
            summary.placed,
            summary.dropped
        );
        Ok(summary)
    }

    /// Put every lifted cell back where it came from and return to idle.
    pub fn cancel_move(&mut self, layer: &mut Layer) -> EditResult<usize> {
        self.check_target(layer)?;
        let mut restored = 0;
        for p in self.lifted.drain(..) {
            if layer.pixels.set(p.original_index, p.color) {
                restored += 1;
            }
        }
        self.reset();
        tracing::debug!("cancel_move: restored {} pixels", restored);
        Ok(restored)
    }

    /// Forget an in-flight move without touching any layer. Used when the
    /// document is replaced underneath the engine (undo, load).
    pub fn abandon(&mut self) {
        if self.is_dragging() {
            tracing::debug!("Abandoning move of {} pixels", self.lifted.len());
        }
        self.lifted.clear();
        self.reset();
    }

    fn check_target(&self, layer: &Layer) -> EditResult<()> {
        match (self.phase, self.layer_id) {
            (MovePhase::Dragging, Some(id)) if id == layer.id => Ok(()),
            (MovePhase::Dragging, Some(id)) => Err(EditError::MoveTargetMismatch {
                expected: id,
                actual: layer.id,
            }),
            _ => Err(EditError::NoActiveMove),
        }
    }

    fn reset(&mut self) {
        self.phase = MovePhase::Idle;
        self.layer_id = None;
    }
}

// ---------------------------------------------------------------------------
//  Whole-layer flips
// ---------------------------------------------------------------------------

/// Mirror a layer left to right.
pub fn flip_layer_horizontal(layer: &mut Layer) {
    let size = layer.pixels.size();
    for row in layer.pixels.cells_mut().chunks_mut(size) {
        row.reverse();
    }
}

/// Mirror a layer top to bottom.
pub fn flip_layer_vertical(layer: &mut Layer) {
    let size = layer.pixels.size();
    let cells = layer.pixels.cells_mut();
    for y in 0..size / 2 {
        let (top, bottom) = cells.split_at_mut((size - 1 - y) * size);
        top[y * size..(y + 1) * size].swap_with_slice(&mut bottom[..size]);
    }
}
