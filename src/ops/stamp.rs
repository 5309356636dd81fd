// ============================================================================
// STAMP - write externally produced artwork onto a layer
// ============================================================================
//
// Generated or pasted artwork arrives as a finished `width × height` color
// array. It is centred on an origin cell; transparent source cells leave the
// destination alone.

use crate::canvas::{Color, Document, Layer, index_in_grid};
use crate::error::{EditError, EditResult};

/// Stamp `colors` onto `document.frames[frame].layers[layer]`, centred on
/// `(origin_x, origin_y)`. Returns the number of cells written.
///
/// A color array whose length is not `width * height` is rejected before
/// anything is written.
#[allow(clippy::too_many_arguments)]
pub fn stamp_external_artwork(
    document: &mut Document,
    frame: usize,
    layer: usize,
    origin_x: i32,
    origin_y: i32,
    width: usize,
    height: usize,
    colors: &[Color],
) -> EditResult<usize> {
    validate_stamp(width, height, colors)?;
    let target = document.layer_mut(frame, layer)?;
    Ok(stamp_onto_layer(target, origin_x, origin_y, width, height, colors))
}

/// Layer-level stamp. The caller has already validated the dimensions.
pub(crate) fn stamp_onto_layer(
    layer: &mut Layer,
    origin_x: i32,
    origin_y: i32,
    width: usize,
    height: usize,
    colors: &[Color],
) -> usize {
    let size = layer.pixels.size();
    let left = origin_x - (width / 2) as i32;
    let top = origin_y - (height / 2) as i32;
    let mut written = 0;

    for (row, chunk) in colors.chunks(width.max(1)).take(height).enumerate() {
        for (col, &color) in chunk.iter().enumerate() {
            if color.is_transparent() {
                continue;
            }
            if let Some(i) = index_in_grid(left + col as i32, top + row as i32, size) {
                layer.pixels.set(i, color);
                written += 1;
            }
        }
    }
    tracing::debug!(
        "stamp: {}x{} at ({}, {}) wrote {} cells on layer {}",
        width,
        height,
        origin_x,
        origin_y,
        written,
        layer.id
    );
    written
}

pub(crate) fn validate_stamp(width: usize, height: usize, colors: &[Color]) -> EditResult<()> {
    let expected = width * height;
    if colors.len() != expected {
        tracing::warn!(
            "Rejected stamp: {} colors for a {}x{} artwork",
            colors.len(),
            width,
            height
        );
        return Err(EditError::MalformedStamp {
            expected,
            actual: colors.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const T: Color = Color::Transparent;

    #[test]
    fn malformed_stamp_leaves_layer_untouched() {
        let mut doc = Document::new(4, Color::WHITE).unwrap();
        let before = doc.clone();
        let err = stamp_external_artwork(&mut doc, 0, 0, 1, 1, 2, 2, &[RED; 3]).unwrap_err();
        assert_eq!(err, EditError::MalformedStamp { expected: 4, actual: 3 });
        assert_eq!(doc, before);
    }

    #[test]
    fn stamp_is_centred_on_origin() {
        let mut doc = Document::new(5, T).unwrap();
        let art = [RED; 9];
        let written = stamp_external_artwork(&mut doc, 0, 0, 2, 2, 3, 3, &art).unwrap();
        assert_eq!(written, 9);
        for y in 1..=3 {
            for x in 1..=3 {
                assert_eq!(doc.get_pixel(0, 0, x, y), Some(RED));
            }
        }
        assert_eq!(doc.get_pixel(0, 0, 0, 0), Some(T));
    }

    #[test]
    fn transparent_sources_do_not_erase() {
        let mut doc = Document::new(3, Color::WHITE).unwrap();
        let art = [T, RED, T, T];
        stamp_external_artwork(&mut doc, 0, 0, 1, 1, 2, 2, &art).unwrap();
        // Top-left lands at (0, 0); only (1, 0) is painted.
        assert_eq!(doc.get_pixel(0, 0, 0, 0), Some(Color::WHITE));
        assert_eq!(doc.get_pixel(0, 0, 1, 0), Some(RED));
        assert_eq!(doc.get_pixel(0, 0, 1, 1), Some(Color::WHITE));
    }

    #[test]
    fn off_grid_cells_are_dropped() {
        let mut doc = Document::new(3, T).unwrap();
        let written = stamp_external_artwork(&mut doc, 0, 0, 0, 0, 3, 3, &[RED; 9]).unwrap();
        // Left = -1, top = -1: only the lower-right 2x2 lands.
        assert_eq!(written, 4);
        assert_eq!(doc.active_layer().pixels.opaque_count(), 4);
    }

    #[test]
    fn bad_target_is_reported() {
        let mut doc = Document::new(3, T).unwrap();
        assert!(matches!(
            stamp_external_artwork(&mut doc, 0, 5, 0, 0, 1, 1, &[RED]),
            Err(EditError::LayerOutOfRange { .. })
        ));
    }
}
