use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::{Color, Document};
use crate::components::history::HistoryManager;
use crate::components::tools::{Tool, ToolEvent, ToolFeedback, ToolSession};
use crate::error::EditResult;
use crate::io::{self, ProjectFileError};
use crate::ops::fill::flood_fill;
use crate::ops::shapes::{GridPoint, ShapeFillMode, ShapeKind, rasterize};
use crate::ops::stamp::stamp_external_artwork;
use crate::settings::EngineSettings;

/// Single open document together with its history and tool state.
///
/// This is the one engine instance a front end talks to; every operation
/// runs to completion before the next is accepted.
pub struct Project {
    pub id: Uuid,
    pub document: Document,
    pub history: HistoryManager,
    pub tools: ToolSession,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(
        untitled_counter: usize,
        grid_size: usize,
        fill: Color,
        settings: &EngineSettings,
    ) -> EditResult<Self> {
        let document = Document::new(grid_size, fill)?;
        Ok(Self {
            id: Uuid::new_v4(),
            document,
            history: HistoryManager::new(settings.max_undo_steps),
            tools: ToolSession::default(),
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        })
    }

    pub fn from_file(path: PathBuf, document: Document, settings: &EngineSettings) -> Self {
        let mut project = Self {
            id: Uuid::new_v4(),
            document,
            history: HistoryManager::new(settings.max_undo_steps),
            tools: ToolSession::default(),
            path: Some(path),
            is_dirty: false,
            name: String::new(),
        };
        project.update_name_from_path();
        project
    }

    /// Load a project file from disk.
    pub fn open(path: &Path, settings: &EngineSettings) -> Result<Self, ProjectFileError> {
        let document = io::load_project(path)?;
        Ok(Self::from_file(path.to_path_buf(), document, settings))
    }

    /// Write to `path` and adopt it as this project's location.
    pub fn save_as(&mut self, path: &Path) -> Result<(), ProjectFileError> {
        io::save_project(&self.document, path)?;
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    // ---- history ------------------------------------------------------------

    /// Save the current state before a mutation the caller is about to make.
    pub fn checkpoint(&mut self, description: &str) {
        self.history.checkpoint(&self.document, description);
    }

    /// Any gesture in flight is cancelled before the document is swapped.
    pub fn undo(&mut self) -> EditResult<String> {
        self.tools.cancel(&mut self.document);
        let description = self.history.undo(&mut self.document)?;
        self.mark_dirty();
        Ok(description)
    }

    pub fn redo(&mut self) -> EditResult<String> {
        self.tools.cancel(&mut self.document);
        let description = self.history.redo(&mut self.document)?;
        self.mark_dirty();
        Ok(description)
    }

    // ---- tools --------------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool, &mut self.document);
    }

    pub fn handle_tool_event(&mut self, event: ToolEvent) -> ToolFeedback {
        let feedback = self
            .tools
            .handle_event(event, &mut self.document, &mut self.history);
        if self.tools.tool.mutates()
            && matches!(
                feedback,
                ToolFeedback::Painted(_) | ToolFeedback::Lifted(_) | ToolFeedback::Moved(_)
            )
        {
            self.mark_dirty();
        }
        feedback
    }

    pub fn cancel_gesture(&mut self) -> ToolFeedback {
        self.tools.cancel(&mut self.document)
    }

    // ---- one-shot edits (each is its own gesture) ---------------------------

    /// Rasterize a shape onto the active layer. Returns cells written.
    pub fn draw_shape(
        &mut self,
        kind: ShapeKind,
        start: GridPoint,
        end: GridPoint,
        mode: ShapeFillMode,
        color: Color,
    ) -> usize {
        let cells = rasterize(kind, start, end, self.document.grid_size(), mode);
        if cells.is_empty() {
            return 0;
        }
        self.checkpoint(kind.label());
        let layer = self.document.active_layer_mut();
        for &i in &cells {
            layer.pixels.set(i, color);
        }
        self.mark_dirty();
        cells.len()
    }

    /// Flood fill from `(x, y)` on the active layer.
    pub fn fill_at(&mut self, x: i32, y: i32, color: Color) -> usize {
        let Some(index) = self.document.active_layer().pixels.index_of(x, y) else {
            return 0;
        };
        if self.document.active_layer().pixels.get(index) == Some(color) {
            return 0;
        }
        self.checkpoint("Fill");
        self.mark_dirty();
        flood_fill(self.document.active_layer_mut(), index, color)
    }

    /// Stamp finished artwork on the active layer, centred on `(x, y)`.
    pub fn stamp(&mut self, x: i32, y: i32, width: usize, height: usize, colors: &[Color]) -> EditResult<usize> {
        crate::ops::stamp::validate_stamp(width, height, colors)?;
        self.checkpoint("Stamp");
        let (frame, layer) = (
            self.document.current_frame_index(),
            self.document.current_layer_index(),
        );
        let written = stamp_external_artwork(&mut self.document, frame, layer, x, y, width, height, colors)?;
        self.mark_dirty();
        Ok(written)
    }

    /// Flattened colors of the active frame.
    pub fn composite(&self) -> Vec<Color> {
        crate::compositor::composite_frame(self.document.active_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);

    fn project() -> Project {
        Project::new_untitled(1, 8, Color::Transparent, &EngineSettings::default()).unwrap()
    }

    #[test]
    fn untitled_naming_and_dirty_flag() {
        let mut p = project();
        assert_eq!(p.display_title(), "Untitled-1");
        p.draw_shape(
            ShapeKind::Line,
            GridPoint::new(0, 0),
            GridPoint::new(7, 7),
            ShapeFillMode::Outline,
            RED,
        );
        assert_eq!(p.display_title(), "Untitled-1*");
    }

    #[test]
    fn undo_mid_move_restores_pre_move_state() {
        let mut p = project();
        p.document.set_pixel(0, 0, 1, 1, RED);
        let before = p.document.clone();
        p.set_tool(Tool::Move);
        p.handle_tool_event(ToolEvent::Press(GridPoint::new(1, 1)));
        p.handle_tool_event(ToolEvent::Drag(GridPoint::new(5, 5)));
        assert!(p.tools.move_engine().is_dragging());
        p.undo().unwrap();
        assert_eq!(p.document, before);
        assert!(!p.tools.move_engine().is_dragging());
    }

    #[test]
    fn fill_without_change_records_nothing() {
        let mut p = project();
        assert_eq!(p.fill_at(0, 0, Color::Transparent), 0);
        assert!(!p.history.can_undo());
        assert_eq!(p.fill_at(0, 0, RED), 64);
        assert!(p.history.can_undo());
    }

    #[test]
    fn malformed_stamp_records_no_history() {
        let mut p = project();
        assert!(p.stamp(2, 2, 2, 2, &[RED; 5]).is_err());
        assert!(!p.history.can_undo());
        assert_eq!(p.stamp(2, 2, 2, 2, &[RED; 4]).unwrap(), 4);
        assert_eq!(p.history.undo_count(), 1);
    }
}
