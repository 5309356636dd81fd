// ============================================================================
// COMPOSITOR - flatten a frame's layer stack into visible colors
// ============================================================================
//
// Layers are scanned bottom to top. Opacity is not blended: a layer either
// replaces the running color or leaves it alone, decided by a fixed
// threshold. Rendered output depends on this exact rule.

use rayon::prelude::*;

use crate::canvas::{Color, Frame, Layer};

/// Layers at or below this opacity never show through.
pub const OPACITY_THRESHOLD: u8 = 50;

/// Edge length of one checkerboard square, in cells.
pub const CHECKER_SIZE: usize = 4;

/// Whether a layer's pixel replaces the color beneath it.
#[inline]
pub fn layer_replaces(layer: &Layer) -> bool {
    let opacity = layer.opacity();
    if opacity >= 100 {
        true
    } else {
        opacity > OPACITY_THRESHOLD
    }
}

/// Visible color of one cell of `frame`.
pub fn composite_pixel(frame: &Frame, index: usize) -> Color {
    let mut result = Color::Transparent;
    for layer in frame.layers() {
        if !layer.visible {
            continue;
        }
        let color = match layer.pixels.get(index) {
            Some(c) if !c.is_transparent() => c,
            _ => continue,
        };
        if layer_replaces(layer) {
            result = color;
        }
    }
    result
}

/// Visible colors of every cell, row-major. Rows are computed in parallel.
pub fn composite_frame(frame: &Frame) -> Vec<Color> {
    let size = frame.layers()[0].pixels.size();
    let mut out = vec![Color::Transparent; size * size];
    if size == 0 {
        return out;
    }
    out.par_chunks_mut(size).enumerate().for_each(|(y, row)| {
        let base = y * size;
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = composite_pixel(frame, base + x);
        }
    });
    out
}

/// Checkerboard shade shown behind transparent cells: `false` for the light
/// square, `true` for the dark one. Presentation only.
#[inline]
pub fn checker_shade(x: usize, y: usize) -> bool {
    checker_shade_sized(x, y, CHECKER_SIZE)
}

#[inline]
pub fn checker_shade_sized(x: usize, y: usize, cell: usize) -> bool {
    let cell = cell.max(1);
    (y / cell + x / cell) % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Document, Layer};

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn two_layer_frame(top_opacity: u8) -> Frame {
        let mut bottom = Layer::new(1, "bottom", 2, Color::Transparent);
        bottom.pixels.set(0, RED);
        bottom.pixels.set(1, RED);
        let mut top = Layer::new(2, "top", 2, Color::Transparent);
        top.pixels.set(0, BLUE);
        top.set_opacity(top_opacity);
        Frame::from_layers(vec![bottom, top]).unwrap()
    }

    #[test]
    fn top_layer_wins_when_opaque() {
        let frame = two_layer_frame(100);
        assert_eq!(composite_pixel(&frame, 0), BLUE);
        assert_eq!(composite_pixel(&frame, 1), RED);
        assert_eq!(composite_pixel(&frame, 2), Color::Transparent);
    }

    #[test]
    fn opacity_threshold_is_binary() {
        assert_eq!(composite_pixel(&two_layer_frame(51), 0), BLUE);
        assert_eq!(composite_pixel(&two_layer_frame(50), 0), RED);
        assert_eq!(composite_pixel(&two_layer_frame(0), 0), RED);
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut frame = two_layer_frame(100);
        frame.layers_mut()[1].visible = false;
        assert_eq!(composite_pixel(&frame, 0), RED);
    }

    #[test]
    fn full_composite_matches_per_pixel() {
        let frame = two_layer_frame(100);
        assert_eq!(
            composite_frame(&frame),
            vec![BLUE, RED, Color::Transparent, Color::Transparent]
        );
    }

    #[test]
    fn composite_never_writes_checkerboard() {
        let doc = Document::new(8, Color::Transparent).unwrap();
        let flat = doc.composite(0).unwrap();
        assert!(flat.iter().all(Color::is_transparent));
        assert!(doc.active_layer().pixels.is_blank());
    }

    #[test]
    fn checkerboard_pattern() {
        assert!(!checker_shade(0, 0));
        assert!(!checker_shade(3, 3));
        assert!(checker_shade(4, 0));
        assert!(checker_shade(0, 4));
        assert!(!checker_shade(4, 4));
    }
}
