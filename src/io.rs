use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::{Color, Document, Frame, Layer, MAX_GRID_SIZE, PixelBuffer};
use crate::error::EditError;

// ============================================================================
// GPX PROJECT FILE FORMAT
// ============================================================================

/// Magic header of the current project format.
const GPX_MAGIC_V1: &str = "GPX1";

/// Maximum number of frames in a project file.
const MAX_FRAMES: usize = 1024;
/// Maximum number of layers per frame in a project file.
const MAX_LAYERS: usize = 256;

/// Serializable mirror of a [`Document`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub magic: String,
    pub grid_size: usize,
    pub current_frame: usize,
    pub current_layer: usize,
    pub next_layer_id: u64,
    pub frames: Vec<FrameData>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameData {
    pub layers: Vec<LayerData>,
}

/// One layer, with its full `grid_size²` pixel array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerData {
    pub id: u64,
    pub name: String,
    pub visible: bool,
    pub opacity: u8,
    pub pixels: Vec<Color>,
}

/// Error type for project file operations
#[derive(Debug, Error)]
pub enum ProjectFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid document: {0}")]
    Document(#[from] EditError),
}

impl From<Box<bincode::ErrorKind>> for ProjectFileError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectFileError::Serialize(e.to_string())
    }
}

impl ProjectFile {
    /// Copy every frame, layer and cursor out of `doc`.
    pub fn from_document(doc: &Document) -> Self {
        let frames = doc
            .frames()
            .iter()
            .map(|frame| FrameData {
                layers: frame
                    .layers()
                    .iter()
                    .map(|layer| LayerData {
                        id: layer.id,
                        name: layer.name.clone(),
                        visible: layer.visible,
                        opacity: layer.opacity(),
                        pixels: layer.pixels.cells().to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            magic: GPX_MAGIC_V1.to_string(),
            grid_size: doc.grid_size(),
            current_frame: doc.current_frame_index(),
            current_layer: doc.current_layer_index(),
            next_layer_id: doc.next_layer_id(),
            frames,
        }
    }

    /// Rebuild the document, rejecting anything that breaks its invariants.
    pub fn into_document(self) -> Result<Document, ProjectFileError> {
        if self.magic != GPX_MAGIC_V1 {
            return Err(ProjectFileError::InvalidFormat(format!(
                "Unknown magic '{}'",
                self.magic
            )));
        }
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(ProjectFileError::InvalidFormat(format!(
                "Grid size {} exceeds limits",
                self.grid_size
            )));
        }
        if self.frames.is_empty() || self.frames.len() > MAX_FRAMES {
            return Err(ProjectFileError::InvalidFormat(format!(
                "Frame count {} out of range",
                self.frames.len()
            )));
        }

        let size = self.grid_size;
        let mut frames = Vec::with_capacity(self.frames.len());
        for (fi, frame) in self.frames.into_iter().enumerate() {
            if frame.layers.len() > MAX_LAYERS {
                return Err(ProjectFileError::InvalidFormat(format!(
                    "Frame {} has {} layers (max {})",
                    fi,
                    frame.layers.len(),
                    MAX_LAYERS
                )));
            }
            let mut layers = Vec::with_capacity(frame.layers.len());
            for data in frame.layers {
                let mut layer = Layer::new(data.id, data.name, size, Color::Transparent);
                layer.pixels = PixelBuffer::from_cells(size, data.pixels)?;
                layer.visible = data.visible;
                layer.set_opacity(data.opacity);
                layers.push(layer);
            }
            let frame = Frame::from_layers(layers)
                .ok_or_else(|| ProjectFileError::InvalidFormat(format!("Frame {} has no layers", fi)))?;
            frames.push(frame);
        }

        Ok(Document::from_parts(
            frames,
            self.current_frame,
            self.current_layer,
            size,
            self.next_layer_id,
        )?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProjectFileError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, ProjectFileError> {
        // bincode encodes a String as: 8-byte length prefix + UTF-8 data.
        // The magic string is 4 chars, so bytes 8..12 hold it.
        if raw.len() < 12 {
            return Err(ProjectFileError::InvalidFormat("File too small".into()));
        }
        let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
        if magic != GPX_MAGIC_V1 {
            return Err(ProjectFileError::InvalidFormat(format!(
                "Unknown magic '{}'",
                magic
            )));
        }
        Ok(bincode::deserialize(raw)?)
    }
}

/// Save a document as a .gpx project file.
pub fn save_project(doc: &Document, path: &Path) -> Result<(), ProjectFileError> {
    let project = ProjectFile::from_document(doc);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &project)?;
    tracing::info!(
        "Saved {} ({} frames, {}x{})",
        path.display(),
        doc.frame_count(),
        doc.grid_size(),
        doc.grid_size()
    );
    Ok(())
}

/// Load a .gpx project file.
pub fn load_project(path: &Path) -> Result<Document, ProjectFileError> {
    let raw = std::fs::read(path)?;
    let doc = ProjectFile::from_bytes(&raw)?.into_document()?;
    tracing::info!(
        "Loaded {} ({} frames, {}x{})",
        path.display(),
        doc.frame_count(),
        doc.grid_size(),
        doc.grid_size()
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::canvas_ops;

    fn sample() -> Document {
        let mut doc = Document::new(6, Color::Transparent).unwrap();
        doc.set_pixel(0, 0, 1, 1, Color::rgb(10, 20, 30));
        canvas_ops::add_layer(&mut doc);
        canvas_ops::set_layer_opacity(&mut doc, 1, 40).unwrap();
        doc.set_pixel(0, 1, 5, 5, Color::WHITE);
        canvas_ops::add_frame(&mut doc);
        doc.set_pixel(1, 0, 0, 3, Color::BLACK);
        canvas_ops::set_layer_visibility(&mut doc, 0, false).unwrap();
        doc
    }

    #[test]
    fn round_trip_is_lossless() {
        let doc = sample();
        let bytes = ProjectFile::from_document(&doc).to_bytes().unwrap();
        let back = ProjectFile::from_bytes(&bytes).unwrap().into_document().unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn wrong_buffer_length_is_rejected() {
        let mut file = ProjectFile::from_document(&sample());
        file.frames[0].layers[0].pixels.pop();
        assert!(matches!(
            file.into_document(),
            Err(ProjectFileError::Document(EditError::BufferSizeMismatch { .. }))
        ));
    }

    #[test]
    fn bad_cursor_and_empty_frame_are_rejected() {
        let mut file = ProjectFile::from_document(&sample());
        file.current_frame = 9;
        assert!(file.into_document().is_err());

        let mut file = ProjectFile::from_document(&sample());
        file.frames[1].layers.clear();
        assert!(matches!(file.into_document(), Err(ProjectFileError::InvalidFormat(_))));
    }

    #[test]
    fn shared_layer_id_is_rejected() {
        let mut file = ProjectFile::from_document(&sample());
        let first = file.frames[0].layers[0].id;
        file.frames[0].layers[1].id = first;
        assert!(matches!(
            file.into_document(),
            Err(ProjectFileError::Document(EditError::DuplicateLayerId(id))) if id == first
        ));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(ProjectFile::from_bytes(b"short").is_err());
        assert!(ProjectFile::from_bytes(&[0u8; 32]).is_err());
    }
}
