// ============================================================================
// CANVAS-LEVEL OPERATIONS - layers and frames
// ============================================================================
//
// None of these push undo history; callers checkpoint first. Every function
// leaves the document cursor pointing at a valid frame/layer.

use crate::canvas::{BACKGROUND_LAYER_NAME, Color, Document, Frame};
use crate::compositor::layer_replaces;
use crate::error::{EditError, EditResult};

// ---------------------------------------------------------------------------
//  Layers (always within the active frame)
// ---------------------------------------------------------------------------

/// Add a new transparent layer above the active layer and select it.
/// Returns the new layer's id.
pub fn add_layer(doc: &mut Document) -> u64 {
    let frame_len = doc.active_frame().layers.len();
    let idx = (doc.current_layer + 1).min(frame_len);
    let layer = doc.create_layer(format!("Layer {}", frame_len + 1));
    let id = layer.id;
    doc.active_frame_mut().layers.insert(idx, layer);
    doc.current_layer = idx;
    tracing::debug!("Added layer {} at index {}", id, idx);
    id
}

/// Delete the active layer. The last layer of a frame cannot be deleted.
pub fn delete_layer(doc: &mut Document) -> EditResult<()> {
    let idx = doc.current_layer;
    let frame = doc.active_frame_mut();
    if frame.layers.len() <= 1 {
        tracing::warn!("Refusing to delete the only layer");
        return Err(EditError::LastLayer);
    }
    let removed = frame.layers.remove(idx);
    let remaining = frame.layers.len();
    if doc.current_layer >= remaining {
        doc.current_layer = remaining - 1;
    }
    tracing::debug!("Deleted layer {} ('{}')", removed.id, removed.name);
    Ok(())
}

/// Duplicate the active layer directly above it and select the copy.
pub fn duplicate_layer(doc: &mut Document) -> u64 {
    let idx = doc.current_layer;
    let mut dup = doc.active_layer().clone();
    dup.id = doc.alloc_layer_id();
    dup.name = format!("{} Copy", dup.name);
    let id = dup.id;
    doc.active_frame_mut().layers.insert(idx + 1, dup);
    doc.current_layer = idx + 1;
    id
}

/// Swap the active layer with the one above it. Returns whether it moved.
pub fn move_layer_up(doc: &mut Document) -> bool {
    let idx = doc.current_layer;
    let frame = doc.active_frame_mut();
    if idx + 1 >= frame.layers.len() {
        return false;
    }
    frame.layers.swap(idx, idx + 1);
    doc.current_layer = idx + 1;
    true
}

/// Swap the active layer with the one below it. Returns whether it moved.
pub fn move_layer_down(doc: &mut Document) -> bool {
    let idx = doc.current_layer;
    if idx == 0 {
        return false;
    }
    doc.active_frame_mut().layers.swap(idx, idx - 1);
    doc.current_layer = idx - 1;
    true
}

/// Flatten the active layer onto the layer below it, using the same
/// replace/keep rule as the compositor. The lower layer survives.
pub fn merge_down(doc: &mut Document) -> EditResult<()> {
    let idx = doc.current_layer;
    if idx == 0 {
        tracing::warn!("Nothing below the bottom layer to merge into");
        let count = doc.active_frame().layers.len();
        return Err(EditError::LayerOutOfRange { index: 0, count });
    }
    let frame = doc.active_frame_mut();
    let upper = frame.layers.remove(idx);
    let lower = &mut frame.layers[idx - 1];
    if upper.visible && layer_replaces(&upper) {
        for (dst, src) in lower.pixels.cells_mut().iter_mut().zip(upper.pixels.cells()) {
            if !src.is_transparent() {
                *dst = *src;
            }
        }
    }
    doc.current_layer = idx - 1;
    tracing::debug!("Merged layer {} down", upper.id);
    Ok(())
}

pub fn set_layer_visibility(doc: &mut Document, layer: usize, visible: bool) -> EditResult<()> {
    let frame = doc.current_frame;
    doc.layer_mut(frame, layer)?.visible = visible;
    Ok(())
}

/// Set a layer's opacity (clamped to 100).
pub fn set_layer_opacity(doc: &mut Document, layer: usize, opacity: u8) -> EditResult<()> {
    let frame = doc.current_frame;
    doc.layer_mut(frame, layer)?.set_opacity(opacity);
    Ok(())
}

pub fn rename_layer(doc: &mut Document, layer: usize, name: impl Into<String>) -> EditResult<()> {
    let frame = doc.current_frame;
    doc.layer_mut(frame, layer)?.name = name.into();
    Ok(())
}

// ---------------------------------------------------------------------------
//  Frames
// ---------------------------------------------------------------------------

/// Append a frame holding a fresh transparent "Background" layer and select
/// it. Returns the new frame index.
pub fn add_frame(doc: &mut Document) -> usize {
    let background = doc.create_layer(BACKGROUND_LAYER_NAME);
    doc.frames.push(Frame::new(background));
    let idx = doc.frames.len() - 1;
    doc.current_frame = idx;
    doc.current_layer = 0;
    tracing::debug!("Added frame {}", idx);
    idx
}

/// Copy the active frame (new layer ids) directly after it and select it.
pub fn duplicate_frame(doc: &mut Document) -> usize {
    let mut copy = doc.active_frame().clone();
    for layer in &mut copy.layers {
        layer.id = doc.alloc_layer_id();
    }
    let idx = doc.current_frame + 1;
    doc.frames.insert(idx, copy);
    doc.current_frame = idx;
    idx
}

/// Delete the active frame. The last frame cannot be deleted.
pub fn delete_frame(doc: &mut Document) -> EditResult<()> {
    if doc.frames.len() <= 1 {
        tracing::warn!("Refusing to delete the only frame");
        return Err(EditError::LastFrame);
    }
    doc.frames.remove(doc.current_frame);
    if doc.current_frame >= doc.frames.len() {
        doc.current_frame = doc.frames.len() - 1;
    }
    let last_layer = doc.active_frame().layers.len() - 1;
    doc.current_layer = doc.current_layer.min(last_layer);
    Ok(())
}

/// Clear the active layer to `color`.
pub fn clear_layer(doc: &mut Document, color: Color) {
    doc.active_layer_mut().pixels.fill(color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn doc() -> Document {
        Document::new(4, Color::Transparent).unwrap()
    }

    #[test]
    fn add_layer_inserts_above_active() {
        let mut d = doc();
        let id = add_layer(&mut d);
        assert_eq!(d.current_layer_index(), 1);
        assert_eq!(d.active_layer().id, id);
        assert_eq!(d.active_layer().name, "Layer 2");
        d.select_layer(0).unwrap();
        add_layer(&mut d);
        assert_eq!(d.current_layer_index(), 1);
        assert_eq!(d.active_frame().layer_count(), 3);
    }

    #[test]
    fn layer_ids_are_unique_and_increasing() {
        let mut d = doc();
        let a = add_layer(&mut d);
        let b = duplicate_layer(&mut d);
        add_frame(&mut d);
        let c = d.active_layer().id;
        assert!(1 < a && a < b && b < c);
    }

    #[test]
    fn last_layer_and_frame_cannot_be_deleted() {
        let mut d = doc();
        assert_eq!(delete_layer(&mut d), Err(EditError::LastLayer));
        assert_eq!(delete_frame(&mut d), Err(EditError::LastFrame));
        add_layer(&mut d);
        delete_layer(&mut d).unwrap();
        assert_eq!(d.current_layer_index(), 0);
    }

    #[test]
    fn merge_down_follows_opacity_rule() {
        let mut d = doc();
        d.active_layer_mut().pixels.set(0, RED);
        d.active_layer_mut().pixels.set(1, RED);
        add_layer(&mut d);
        d.active_layer_mut().pixels.set(1, BLUE);
        merge_down(&mut d).unwrap();
        assert_eq!(d.active_frame().layer_count(), 1);
        assert_eq!(d.active_layer().pixels.get(0), Some(RED));
        assert_eq!(d.active_layer().pixels.get(1), Some(BLUE));

        add_layer(&mut d);
        d.active_layer_mut().pixels.set(0, BLUE);
        set_layer_opacity(&mut d, 1, 40).unwrap();
        merge_down(&mut d).unwrap();
        assert_eq!(d.active_layer().pixels.get(0), Some(RED));
    }

    #[test]
    fn reorder_layers() {
        let mut d = doc();
        let top = add_layer(&mut d);
        assert!(!move_layer_up(&mut d));
        assert!(move_layer_down(&mut d));
        assert_eq!(d.current_layer_index(), 0);
        assert_eq!(d.active_layer().id, top);
        assert!(!move_layer_down(&mut d));
    }

    #[test]
    fn frames_keep_cursor_valid() {
        let mut d = doc();
        add_layer(&mut d);
        add_layer(&mut d);
        assert_eq!(d.current_layer_index(), 2);
        let f = add_frame(&mut d);
        assert_eq!(f, 1);
        assert_eq!(d.current_layer_index(), 0);
        d.select_frame(0).unwrap();
        d.select_layer(2).unwrap();
        d.select_frame(1).unwrap();
        assert_eq!(d.current_layer_index(), 0);
        delete_frame(&mut d).unwrap();
        assert_eq!(d.current_frame_index(), 0);
        assert_eq!(d.frame_count(), 1);
    }

    #[test]
    fn duplicate_frame_is_independent() {
        let mut d = doc();
        d.active_layer_mut().pixels.set(3, RED);
        duplicate_frame(&mut d);
        assert_eq!(d.frame_count(), 2);
        d.active_layer_mut().pixels.set(3, BLUE);
        assert_eq!(d.get_pixel(0, 0, 3, 0), Some(RED));
        assert_eq!(d.get_pixel(1, 0, 3, 0), Some(BLUE));
        assert_ne!(d.frames()[0].layers()[0].id, d.frames()[1].layers()[0].id);
    }
}
