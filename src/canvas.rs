use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};

/// Largest grid edge a document may have.
pub const MAX_GRID_SIZE: usize = 512;

/// Name given to the first layer of every new frame.
pub const BACKGROUND_LAYER_NAME: &str = "Background";

// ============================================================================
// COLOR
// ============================================================================

/// A cell color: either nothing (transparent) or an opaque RGB triple.
/// The only translucency in the engine is whole-layer opacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[default]
    Transparent,
    Rgb([u8; 3]),
}

impl Color {
    pub const BLACK: Color = Color::Rgb([0, 0, 0]);
    pub const WHITE: Color = Color::Rgb([255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb([r, g, b])
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        matches!(self, Color::Transparent)
    }

    /// Parse `#rrggbb`, `rrggbb` or `#rgb`. Empty, `none` and `transparent`
    /// yield [`Color::Transparent`].
    pub fn from_hex(s: &str) -> EditResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("transparent")
        {
            return Ok(Color::Transparent);
        }
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || EditError::InvalidColor(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Color::rgb(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }

    /// Lowercase `#rrggbb`, or `None` for transparent.
    pub fn to_hex(&self) -> Option<String> {
        match self {
            Color::Transparent => None,
            Color::Rgb([r, g, b]) => Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_hex() {
            Some(hex) => f.write_str(&hex),
            None => f.write_str("transparent"),
        }
    }
}

impl FromStr for Color {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

// ============================================================================
// PIXEL BUFFER – one layer's raster, row-major
// ============================================================================

/// Square grid of colors. `cells.len() == size * size` at all times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    size: usize,
    cells: Vec<Color>,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(size: usize) -> Self {
        Self::new_filled(size, Color::Transparent)
    }

    pub fn new_filled(size: usize, color: Color) -> Self {
        Self {
            size,
            cells: vec![color; size * size],
        }
    }

    /// Wrap an existing cell array; rejects arrays that are not `size²` long.
    pub fn from_cells(size: usize, cells: Vec<Color>) -> EditResult<Self> {
        let expected = size * size;
        if cells.len() != expected {
            return Err(EditError::BufferSizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { size, cells })
    }

    /// Edge length of the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of `(x, y)`, or `None` when either axis leaves the grid.
    #[inline]
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        index_in_grid(x, y, self.size)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.cells.get(index).copied()
    }

    /// Write one cell. Returns `false` (and writes nothing) when out of range.
    #[inline]
    pub fn set(&mut self, index: usize, color: Color) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = color;
                true
            }
            None => false,
        }
    }

    pub fn get_xy(&self, x: i32, y: i32) -> Option<Color> {
        self.index_of(x, y).and_then(|i| self.get(i))
    }

    pub fn set_xy(&mut self, x: i32, y: i32, color: Color) -> bool {
        match self.index_of(x, y) {
            Some(i) => self.set(i, color),
            None => false,
        }
    }

    pub fn cells(&self) -> &[Color] {
        &self.cells
    }

    /// Mutable view of the cells. The slice cannot change length, so the
    /// size invariant holds.
    pub fn cells_mut(&mut self) -> &mut [Color] {
        &mut self.cells
    }

    pub fn fill(&mut self, color: Color) {
        self.cells.fill(color);
    }

    /// True when every cell is transparent.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Color::is_transparent)
    }

    pub fn opaque_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_transparent()).count()
    }

    /// `(index, color)` for every non-transparent cell, in index order.
    pub fn iter_opaque(&self) -> impl Iterator<Item = (usize, Color)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_transparent())
            .map(|(i, c)| (i, *c))
    }

    /// Copy into a new `new_size` buffer, anchored top-left. Cells past the
    /// new edge are cropped, new cells are transparent.
    pub fn resized(&self, new_size: usize) -> PixelBuffer {
        let mut out = PixelBuffer::new(new_size);
        let keep = self.size.min(new_size);
        for y in 0..keep {
            let src = y * self.size;
            let dst = y * new_size;
            out.cells[dst..dst + keep].copy_from_slice(&self.cells[src..src + keep]);
        }
        out
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_size(&self) -> usize {
        self.cells.len() * std::mem::size_of::<Color>()
    }
}

/// Flat index of `(x, y)` in a closed `size × size` grid.
#[inline]
pub fn index_in_grid(x: i32, y: i32, size: usize) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= size || y >= size {
        return None;
    }
    Some(y * size + x)
}

// ============================================================================
// LAYER
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    /// Unique within its document, assigned in increasing order.
    pub id: u64,
    pub name: String,
    pub pixels: PixelBuffer,
    pub visible: bool,
    /// 0–100.
    opacity: u8,
}

impl Layer {
    pub fn new(id: u64, name: impl Into<String>, size: usize, fill: Color) -> Self {
        Self {
            id,
            name: name.into(),
            pixels: PixelBuffer::new_filled(size, fill),
            visible: true,
            opacity: 100,
        }
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Set the opacity percentage; values above 100 are clamped.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity.min(100);
    }

    /// Swap in a new raster. The buffer must match this layer's grid size.
    pub fn replace_pixels(&mut self, pixels: PixelBuffer) -> EditResult<()> {
        if pixels.size() != self.pixels.size() {
            return Err(EditError::BufferSizeMismatch {
                expected: self.pixels.len(),
                actual: pixels.len(),
            });
        }
        self.pixels = pixels;
        Ok(())
    }
}

// ============================================================================
// FRAME – one animation cel, layers bottom to top
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Never empty. Index 0 is the bottom of the stack.
    pub(crate) layers: Vec<Layer>,
}

impl Frame {
    pub fn new(background: Layer) -> Self {
        Self {
            layers: vec![background],
        }
    }

    /// Build a frame from an existing stack. `None` for an empty stack.
    pub fn from_layers(layers: Vec<Layer>) -> Option<Self> {
        if layers.is_empty() {
            None
        } else {
            Some(Self { layers })
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Frames plus the editing cursor. All buffers share `grid_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub(crate) frames: Vec<Frame>,
    pub(crate) current_frame: usize,
    pub(crate) current_layer: usize,
    pub(crate) grid_size: usize,
    pub(crate) next_layer_id: u64,
}

impl Document {
    /// One frame holding a single "Background" layer filled with `fill`.
    pub fn new(grid_size: usize, fill: Color) -> EditResult<Self> {
        validate_grid_size(grid_size)?;
        let background = Layer::new(1, BACKGROUND_LAYER_NAME, grid_size, fill);
        Ok(Self {
            frames: vec![Frame::new(background)],
            current_frame: 0,
            current_layer: 0,
            grid_size,
            next_layer_id: 2,
        })
    }

    /// Reassemble a document from stored parts, checking every invariant.
    pub fn from_parts(
        frames: Vec<Frame>,
        current_frame: usize,
        current_layer: usize,
        grid_size: usize,
        next_layer_id: u64,
    ) -> EditResult<Self> {
        validate_grid_size(grid_size)?;
        if current_frame >= frames.len() {
            return Err(EditError::FrameOutOfRange {
                index: current_frame,
                count: frames.len(),
            });
        }
        let mut max_id = 0;
        let mut ids = HashSet::new();
        for frame in &frames {
            for layer in &frame.layers {
                if layer.pixels.size() != grid_size {
                    return Err(EditError::BufferSizeMismatch {
                        expected: grid_size * grid_size,
                        actual: layer.pixels.len(),
                    });
                }
                if !ids.insert(layer.id) {
                    return Err(EditError::DuplicateLayerId(layer.id));
                }
                max_id = max_id.max(layer.id);
            }
        }
        let layer_count = frames[current_frame].layers.len();
        if current_layer >= layer_count {
            return Err(EditError::LayerOutOfRange {
                index: current_layer,
                count: layer_count,
            });
        }
        Ok(Self {
            frames,
            current_frame,
            current_layer,
            grid_size,
            next_layer_id: next_layer_id.max(max_id + 1),
        })
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> EditResult<&Frame> {
        let count = self.frames.len();
        self.frames
            .get(index)
            .ok_or(EditError::FrameOutOfRange { index, count })
    }

    pub fn frame_mut(&mut self, index: usize) -> EditResult<&mut Frame> {
        let count = self.frames.len();
        self.frames
            .get_mut(index)
            .ok_or(EditError::FrameOutOfRange { index, count })
    }

    pub fn layer(&self, frame: usize, layer: usize) -> EditResult<&Layer> {
        let f = self.frame(frame)?;
        let count = f.layers.len();
        f.layers
            .get(layer)
            .ok_or(EditError::LayerOutOfRange { index: layer, count })
    }

    pub fn layer_mut(&mut self, frame: usize, layer: usize) -> EditResult<&mut Layer> {
        let f = self.frame_mut(frame)?;
        let count = f.layers.len();
        f.layers
            .get_mut(layer)
            .ok_or(EditError::LayerOutOfRange { index: layer, count })
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    pub fn current_layer_index(&self) -> usize {
        self.current_layer
    }

    pub fn active_frame(&self) -> &Frame {
        &self.frames[self.current_frame]
    }

    pub fn active_frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.current_frame]
    }

    pub fn active_layer(&self) -> &Layer {
        &self.frames[self.current_frame].layers[self.current_layer]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.frames[self.current_frame].layers[self.current_layer]
    }

    /// Switch frames. The layer cursor is clamped to the new frame's stack.
    pub fn select_frame(&mut self, index: usize) -> EditResult<()> {
        let frame = self.frame(index)?;
        let last_layer = frame.layers.len() - 1;
        self.current_frame = index;
        self.current_layer = self.current_layer.min(last_layer);
        Ok(())
    }

    pub fn select_layer(&mut self, index: usize) -> EditResult<()> {
        let count = self.active_frame().layers.len();
        if index >= count {
            return Err(EditError::LayerOutOfRange { index, count });
        }
        self.current_layer = index;
        Ok(())
    }

    /// Bounds-checked read. `None` for a bad frame/layer or off-grid cell.
    pub fn get_pixel(&self, frame: usize, layer: usize, x: i32, y: i32) -> Option<Color> {
        self.layer(frame, layer).ok()?.pixels.get_xy(x, y)
    }

    /// Bounds-checked write. Off-grid cells are ignored; returns whether a
    /// cell was written.
    pub fn set_pixel(&mut self, frame: usize, layer: usize, x: i32, y: i32, color: Color) -> bool {
        match self.layer_mut(frame, layer) {
            Ok(l) => l.pixels.set_xy(x, y, color),
            Err(_) => false,
        }
    }

    /// Visible colors of `frame`, one per cell.
    pub fn composite(&self, frame: usize) -> EditResult<Vec<Color>> {
        Ok(crate::compositor::composite_frame(self.frame(frame)?))
    }

    /// Rebuild every buffer of every frame at `new_size`, keeping the
    /// top-left overlap.
    pub fn resize(&mut self, new_size: usize) -> EditResult<()> {
        validate_grid_size(new_size)?;
        if new_size == self.grid_size {
            return Ok(());
        }
        for frame in &mut self.frames {
            for layer in &mut frame.layers {
                layer.pixels = layer.pixels.resized(new_size);
            }
        }
        tracing::debug!("Resized document {} -> {}", self.grid_size, new_size);
        self.grid_size = new_size;
        Ok(())
    }

    /// Hand out the next layer id.
    pub(crate) fn alloc_layer_id(&mut self) -> u64 {
        let id = self.next_layer_id;
        self.next_layer_id += 1;
        id
    }

    pub(crate) fn next_layer_id(&self) -> u64 {
        self.next_layer_id
    }

    /// Fresh transparent layer sized for this document.
    pub(crate) fn create_layer(&mut self, name: impl Into<String>) -> Layer {
        let id = self.alloc_layer_id();
        Layer::new(id, name, self.grid_size, Color::Transparent)
    }

    /// Approximate heap footprint of all buffers in bytes.
    pub fn memory_size(&self) -> usize {
        self.frames
            .iter()
            .flat_map(|f| f.layers.iter())
            .map(|l| l.pixels.memory_size() + l.name.len())
            .sum()
    }
}

fn validate_grid_size(size: usize) -> EditResult<()> {
    if size == 0 || size > MAX_GRID_SIZE {
        return Err(EditError::InvalidGridSize {
            size,
            max: MAX_GRID_SIZE,
        });
    }
    Ok(())
}
