// ============================================================================
// FLOOD FILL - 4-connected region recolor on a single layer
// ============================================================================

use crate::canvas::{Color, Layer};

/// Recolor the 4-connected region of same-colored cells containing
/// `start_index`. Returns the number of cells changed.
///
/// Filling with the color already under the cursor, or starting off the
/// buffer, changes nothing and returns 0.
pub fn flood_fill(layer: &mut Layer, start_index: usize, new_color: Color) -> usize {
    let size = layer.pixels.size();
    let target = match layer.pixels.get(start_index) {
        Some(c) => c,
        None => return 0,
    };
    if target == new_color {
        return 0;
    }

    let cells = layer.pixels.cells_mut();
    let mut visited = vec![false; cells.len()];
    // DFS on an explicit stack so large grids cannot overflow the call stack.
    let mut stack: Vec<usize> = Vec::with_capacity(size * 4);
    stack.push(start_index);
    let mut filled = 0;

    while let Some(idx) = stack.pop() {
        if visited[idx] || cells[idx] != target {
            continue;
        }
        visited[idx] = true;
        cells[idx] = new_color;
        filled += 1;

        let x = idx % size;
        let y = idx / size;
        if x > 0 {
            stack.push(idx - 1);
        }
        if x + 1 < size {
            stack.push(idx + 1);
        }
        if y > 0 {
            stack.push(idx - size);
        }
        if y + 1 < size {
            stack.push(idx + size);
        }
    }

    tracing::debug!("flood_fill: {} cells on layer {}", filled, layer.id);
    filled
}
