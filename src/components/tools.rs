use crate::canvas::{Color, Document};
use crate::components::history::HistoryManager;
use crate::compositor::composite_pixel;
use crate::ops::fill::flood_fill;
use crate::ops::shapes::{GridPoint, ShapeFillMode, ShapeKind, rasterize, rasterize_line};
use crate::ops::transform::{MoveEngine, MoveSummary};

// ============================================================================
// TOOL KINDS
// ============================================================================

/// One variant per algorithm family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
    Shape { kind: ShapeKind, mode: ShapeFillMode },
    Move,
    Eyedropper,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
            Tool::Shape { kind, .. } => kind.label(),
            Tool::Move => "Move",
            Tool::Eyedropper => "Eyedropper",
        }
    }

    /// Whether using this tool changes pixels (and therefore needs history).
    pub fn mutates(&self) -> bool {
        !matches!(self, Tool::Eyedropper)
    }
}

/// Pointer input, already mapped to grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolEvent {
    Press(GridPoint),
    Drag(GridPoint),
    Release(GridPoint),
}

/// What the renderer should do after an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolFeedback {
    Nothing,
    /// Cells were written to the active layer.
    Painted(usize),
    /// Cells to draw on top of the composite; the layer is unchanged.
    Preview(Vec<(usize, Color)>),
    Picked(Color),
    Lifted(usize),
    Moved(MoveSummary),
    Cancelled(usize),
}

// ============================================================================
// TOOL SESSION - routes gestures into the editing algorithms
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct Gesture {
    start: GridPoint,
    last: GridPoint,
    frame: usize,
    layer: usize,
}

/// Active tool, paint color, and whatever gesture is in flight.
///
/// Each gesture takes at most one history checkpoint: at press for tools that
/// paint immediately, at release for shapes.
#[derive(Debug, Default)]
pub struct ToolSession {
    pub tool: Tool,
    pub color: Color,
    gesture: Option<Gesture>,
    mover: MoveEngine,
}

impl ToolSession {
    pub fn new(tool: Tool, color: Color) -> Self {
        Self {
            tool,
            color,
            gesture: None,
            mover: MoveEngine::new(),
        }
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn move_engine(&self) -> &MoveEngine {
        &self.mover
    }

    pub fn move_engine_mut(&mut self) -> &mut MoveEngine {
        &mut self.mover
    }

    /// Change tools. Any gesture in progress is cancelled first.
    pub fn set_tool(&mut self, tool: Tool, doc: &mut Document) {
        self.cancel(doc);
        self.tool = tool;
    }

    pub fn handle_event(
        &mut self,
        event: ToolEvent,
        doc: &mut Document,
        history: &mut HistoryManager,
    ) -> ToolFeedback {
        match event {
            ToolEvent::Press(p) => self.press(p, doc, history),
            ToolEvent::Drag(p) => self.drag(p, doc),
            ToolEvent::Release(p) => self.release(p, doc, history),
        }
    }

    fn press(&mut self, p: GridPoint, doc: &mut Document, history: &mut HistoryManager) -> ToolFeedback {
        if self.gesture.is_some() {
            // A press without a release: finish nothing, start over.
            self.cancel(doc);
        }
        let size = doc.grid_size();
        let gesture = Gesture {
            start: p,
            last: p,
            frame: doc.current_frame_index(),
            layer: doc.current_layer_index(),
        };

        match self.tool {
            Tool::Pencil | Tool::Eraser => {
                history.checkpoint(doc, self.tool.label());
                self.gesture = Some(gesture);
                let color = self.stroke_color();
                let written = doc.active_layer_mut().pixels.set_xy(p.x, p.y, color);
                ToolFeedback::Painted(written as usize)
            }
            Tool::Fill => {
                let Some(index) = p.to_index(size) else {
                    return ToolFeedback::Nothing;
                };
                if doc.active_layer().pixels.get(index) == Some(self.color) {
                    return ToolFeedback::Nothing;
                }
                history.checkpoint(doc, self.tool.label());
                ToolFeedback::Painted(flood_fill(doc.active_layer_mut(), index, self.color))
            }
            Tool::Shape { .. } => {
                self.gesture = Some(gesture);
                ToolFeedback::Preview(self.shape_preview(p, p, size))
            }
            Tool::Move => {
                if doc.active_layer().pixels.is_blank() {
                    return ToolFeedback::Nothing;
                }
                history.checkpoint(doc, self.tool.label());
                match self.mover.start_move(doc.active_layer_mut()) {
                    Ok(n) => {
                        self.gesture = Some(gesture);
                        ToolFeedback::Lifted(n)
                    }
                    Err(e) => {
                        tracing::warn!("Move tool: {}", e);
                        ToolFeedback::Nothing
                    }
                }
            }
            Tool::Eyedropper => {
                let Some(index) = p.to_index(size) else {
                    return ToolFeedback::Nothing;
                };
                let picked = composite_pixel(doc.active_frame(), index);
                if !picked.is_transparent() {
                    self.color = picked;
                }
                ToolFeedback::Picked(picked)
            }
        }
    }

    fn drag(&mut self, p: GridPoint, doc: &mut Document) -> ToolFeedback {
        let Some(mut gesture) = self.gesture else {
            return ToolFeedback::Nothing;
        };
        let size = doc.grid_size();
        let feedback = match self.tool {
            Tool::Pencil | Tool::Eraser => {
                let color = self.stroke_color();
                ToolFeedback::Painted(paint_segment(doc, gesture, gesture.last, p, color))
            }
            Tool::Shape { .. } => ToolFeedback::Preview(self.shape_preview(gesture.start, p, size)),
            Tool::Move => {
                ToolFeedback::Preview(self.mover.preview_move(p.x - gesture.start.x, p.y - gesture.start.y))
            }
            Tool::Fill | Tool::Eyedropper => ToolFeedback::Nothing,
        };
        gesture.last = p;
        self.gesture = Some(gesture);
        feedback
    }

    fn release(&mut self, p: GridPoint, doc: &mut Document, history: &mut HistoryManager) -> ToolFeedback {
        let Some(gesture) = self.gesture.take() else {
            return ToolFeedback::Nothing;
        };
        let size = doc.grid_size();
        match self.tool {
            Tool::Pencil | Tool::Eraser => {
                let color = self.stroke_color();
                ToolFeedback::Painted(paint_segment(doc, gesture, gesture.last, p, color))
            }
            Tool::Shape { kind, mode } => {
                let cells = rasterize(kind, gesture.start, p, size, mode);
                if cells.is_empty() {
                    return ToolFeedback::Nothing;
                }
                history.checkpoint(doc, kind.label());
                let Ok(layer) = doc.layer_mut(gesture.frame, gesture.layer) else {
                    return ToolFeedback::Nothing;
                };
                for &i in &cells {
                    layer.pixels.set(i, self.color);
                }
                tracing::debug!("{} committed: {} cells", kind.label(), cells.len());
                ToolFeedback::Painted(cells.len())
            }
            Tool::Move => {
                let Ok(layer) = doc.layer_mut(gesture.frame, gesture.layer) else {
                    self.mover.abandon();
                    return ToolFeedback::Nothing;
                };
                match self.mover.commit_move(layer, p.x - gesture.start.x, p.y - gesture.start.y) {
                    Ok(summary) => ToolFeedback::Moved(summary),
                    Err(e) => {
                        tracing::warn!("Move tool: {}", e);
                        ToolFeedback::Nothing
                    }
                }
            }
            Tool::Fill | Tool::Eyedropper => ToolFeedback::Nothing,
        }
    }

    /// Abort the gesture in flight. A lifted move is put back.
    pub fn cancel(&mut self, doc: &mut Document) -> ToolFeedback {
        let Some(gesture) = self.gesture.take() else {
            return ToolFeedback::Nothing;
        };
        if self.mover.is_dragging() {
            if let Ok(layer) = doc.layer_mut(gesture.frame, gesture.layer) {
                if let Ok(n) = self.mover.cancel_move(layer) {
                    return ToolFeedback::Cancelled(n);
                }
            }
            self.mover.abandon();
        }
        ToolFeedback::Cancelled(0)
    }

    /// Drop all gesture state without touching the document. Used when the
    /// document is swapped out (undo, redo, load).
    pub fn abandon(&mut self) {
        self.gesture = None;
        self.mover.abandon();
    }

    fn stroke_color(&self) -> Color {
        match self.tool {
            Tool::Eraser => Color::Transparent,
            _ => self.color,
        }
    }

    fn shape_preview(&self, start: GridPoint, end: GridPoint, size: usize) -> Vec<(usize, Color)> {
        match self.tool {
            Tool::Shape { kind, mode } => rasterize(kind, start, end, size, mode)
                .into_iter()
                .map(|i| (i, self.color))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Freehand: connect successive samples so fast strokes leave no gaps.
fn paint_segment(doc: &mut Document, gesture: Gesture, from: GridPoint, to: GridPoint, color: Color) -> usize {
    let size = doc.grid_size();
    let Ok(layer) = doc.layer_mut(gesture.frame, gesture.layer) else {
        return 0;
    };
    let cells = rasterize_line(from, to, size);
    for &i in &cells {
        layer.pixels.set(i, color);
    }
    cells.len()
}
