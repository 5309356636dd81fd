//! GridPaint - layered raster editing engine for a pixel-art editor.
//!
//! A [`project::Project`] owns one [`canvas::Document`] (frames of layers of
//! square pixel grids), its undo history and the active tool session.
//! Scripts, the CLI and any front end drive it through the same operations.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{Color, Document, Frame, Layer, MAX_GRID_SIZE, PixelBuffer};
pub use components::history::HistoryManager;
pub use components::tools::{Tool, ToolEvent, ToolFeedback};
pub use error::{EditError, EditResult};
pub use project::Project;
pub use settings::EngineSettings;
