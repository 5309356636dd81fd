// ============================================================================
// SHAPE RASTERIZATION - line / rectangle / circle to cell indices
// ============================================================================
//
// Every function here is pure: it returns the indices a shape covers and the
// caller decides what to paint. The grid is closed on both axes, so any
// sample outside [0, size) is dropped rather than clamped or wrapped.

use crate::canvas::index_in_grid;

/// Available shape primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Circle,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Line => "Line",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
        }
    }
}

/// How a shape is painted. Lines ignore it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeFillMode {
    #[default]
    Outline,
    Filled,
}

impl ShapeFillMode {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeFillMode::Outline => "Outline",
            ShapeFillMode::Filled => "Filled",
        }
    }
}

/// A cell coordinate. May lie off the grid; rasterizers clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_index(index: usize, size: usize) -> Self {
        Self {
            x: (index % size) as i32,
            y: (index / size) as i32,
        }
    }

    pub fn to_index(self, size: usize) -> Option<usize> {
        index_in_grid(self.x, self.y, size)
    }
}

/// Dispatch on `kind`.
pub fn rasterize(
    kind: ShapeKind,
    start: GridPoint,
    end: GridPoint,
    size: usize,
    mode: ShapeFillMode,
) -> Vec<usize> {
    match kind {
        ShapeKind::Line => rasterize_line(start, end, size),
        ShapeKind::Rectangle => rasterize_rectangle(start, end, size, mode),
        ShapeKind::Circle => rasterize_circle(start, end, size, mode),
    }
}

/// Index of `(x, y)` for coordinates that may lie far outside `i32` grids.
fn cell(x: i64, y: i64, size: usize) -> Option<usize> {
    index_in_grid(i32::try_from(x).ok()?, i32::try_from(y).ok()?, size)
}

/// `lo..=hi` cut down to the grid's `0..size` on one axis.
fn clip(lo: i64, hi: i64, size: usize) -> std::ops::RangeInclusive<i64> {
    lo.max(0)..=hi.min(size as i64 - 1)
}

// ---------------------------------------------------------------------------
//  Line
// ---------------------------------------------------------------------------

/// Integer Bresenham from `start` to `end`, both endpoints included.
///
/// The minor coordinate at major step `k` has the closed form
/// `floor((2·minor·k + major) / (2·major))`, which is what the error-term
/// loop produces. Only the steps whose major coordinate lies on the grid
/// are visited, so the cost is bounded by the grid, not the segment.
pub fn rasterize_line(start: GridPoint, end: GridPoint, size: usize) -> Vec<usize> {
    let (x0, y0) = (start.x as i64, start.y as i64);
    let (x1, y1) = (end.x as i64, end.y as i64);
    let (a, b) = ((x1 - x0).abs(), (y1 - y0).abs());
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let x_major = a >= b;
    let (major, minor) = if x_major { (a, b) } else { (b, a) };
    let (origin, step) = if x_major { (x0, sx) } else { (y0, sy) };

    // Steps k in 0..=major with origin + step·k inside 0..size
    let (lo, hi) = if step > 0 {
        (-origin, size as i64 - 1 - origin)
    } else {
        (origin - (size as i64 - 1), origin)
    };
    let (lo, hi) = (lo.max(0), hi.min(major));

    let mut out = Vec::with_capacity(((hi - lo + 1).max(0) as usize).min(size * 2));
    for k in lo..=hi {
        let offset = if major == 0 {
            0
        } else {
            ((2 * minor as i128 * k as i128 + major as i128) / (2 * major as i128)) as i64
        };
        let (x, y) = if x_major {
            (x0 + sx * k, y0 + sy * offset)
        } else {
            (x0 + sx * offset, y0 + sy * k)
        };
        if let Some(i) = cell(x, y, size) {
            out.push(i);
        }
    }
    out
}

// ---------------------------------------------------------------------------
//  Rectangle
// ---------------------------------------------------------------------------

/// Rectangle spanning the bounding box of the two corners.
pub fn rasterize_rectangle(
    start: GridPoint,
    end: GridPoint,
    size: usize,
    mode: ShapeFillMode,
) -> Vec<usize> {
    let (min_x, max_x) = (start.x.min(end.x) as i64, start.x.max(end.x) as i64);
    let (min_y, max_y) = (start.y.min(end.y) as i64, start.y.max(end.y) as i64);
    let mut out = Vec::new();
    let mut push = |x: i64, y: i64| {
        if let Some(i) = cell(x, y, size) {
            out.push(i);
        }
    };

    match mode {
        ShapeFillMode::Filled => {
            for y in clip(min_y, max_y, size) {
                for x in clip(min_x, max_x, size) {
                    push(x, y);
                }
            }
        }
        ShapeFillMode::Outline => {
            for x in clip(min_x, max_x, size) {
                push(x, min_y);
            }
            // Side columns exclude the corner rows already emitted.
            for y in clip(min_y + 1, max_y - 1, size) {
                push(min_x, y);
                if max_x != min_x {
                    push(max_x, y);
                }
            }
            if max_y != min_y {
                for x in clip(min_x, max_x, size) {
                    push(x, max_y);
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
//  Circle
// ---------------------------------------------------------------------------

/// Radius implied by dragging from `center` to `edge`.
pub fn circle_radius(center: GridPoint, edge: GridPoint) -> i64 {
    let dx = (edge.x as i64 - center.x as i64) as f64;
    let dy = (edge.y as i64 - center.y as i64) as f64;
    (dx * dx + dy * dy).sqrt().round() as i64
}

/// `sqrt(n)` rounded to the nearest integer.
fn round_sqrt(n: u128) -> i64 {
    let s = n.isqrt();
    // (s + 0.5)² = s² + s + 0.25
    if n - s * s > s { (s + 1) as i64 } else { s as i64 }
}

/// Circle centred on `start` passing (approximately) through `end`.
pub fn rasterize_circle(
    start: GridPoint,
    end: GridPoint,
    size: usize,
    mode: ShapeFillMode,
) -> Vec<usize> {
    let r = circle_radius(start, end);
    let (cx, cy) = (start.x as i64, start.y as i64);
    let r2 = (r as i128) * (r as i128);
    let mut out = Vec::new();

    match mode {
        ShapeFillMode::Filled => {
            for y in clip(cy - r, cy + r, size) {
                let dy = (y - cy) as i128;
                for x in clip(cx - r, cx + r, size) {
                    let dx = (x - cx) as i128;
                    if dx * dx + dy * dy <= r2 {
                        if let Some(i) = cell(x, y, size) {
                            out.push(i);
                        }
                    }
                }
            }
        }
        ShapeFillMode::Outline => {
            // Midpoint circle in closed form: in the first octant
            // x = round(sqrt(r² - y²)) while x >= y, mirrored eight ways.
            // A y only matters when one of its mirrored rows or columns
            // lands on the grid.
            let n = size as i64;
            let mut candidates: Vec<i64> = [
                (-cy, n - 1 - cy),
                (cy - (n - 1), cy),
                (-cx, n - 1 - cx),
                (cx - (n - 1), cx),
            ]
            .into_iter()
            .flat_map(|(lo, hi)| lo.max(0)..=hi.min(r))
            .collect();
            candidates.sort_unstable();
            candidates.dedup();

            // Octant points coincide on the axes and diagonals; keep first hit.
            let mut seen = vec![false; size * size];
            let mut push = |x: i64, y: i64| {
                if let Some(i) = cell(x, y, size) {
                    if !seen[i] {
                        seen[i] = true;
                        out.push(i);
                    }
                }
            };
            for y in candidates {
                let yy = y as i128;
                let x = round_sqrt((r2 - yy * yy).max(0) as u128);
                if x < y {
                    break;
                }
                push(cx + x, cy + y);
                push(cx + y, cy + x);
                push(cx - y, cy + x);
                push(cx - x, cy + y);
                push(cx - x, cy - y);
                push(cx - y, cy - x);
                push(cx + y, cy - x);
                push(cx + x, cy - y);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn p(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn horizontal_line_covers_every_cell_once() {
        assert_eq!(rasterize_line(p(0, 0), p(3, 0), 4), vec![0, 1, 2, 3]);
        assert_eq!(rasterize_line(p(3, 0), p(0, 0), 4), vec![3, 2, 1, 0]);
    }

    #[test]
    fn diagonal_and_single_point_lines() {
        assert_eq!(rasterize_line(p(0, 0), p(3, 3), 4), vec![0, 5, 10, 15]);
        assert_eq!(rasterize_line(p(2, 1), p(2, 1), 4), vec![6]);
    }

    #[test]
    fn line_drops_off_grid_samples() {
        // Only x in 0..4 survive; nothing is clamped onto the edge.
        assert_eq!(rasterize_line(p(-2, 0), p(5, 0), 4), vec![0, 1, 2, 3]);
        assert!(rasterize_line(p(-5, -5), p(-1, -1), 4).is_empty());
    }

    #[test]
    fn steep_line_has_no_duplicates() {
        let cells = rasterize_line(p(1, 0), p(3, 9), 10);
        let unique: HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
        assert_eq!(cells.len(), 10);
    }

    #[test]
    fn outline_rectangle_is_boundary_only() {
        let cells = rasterize_rectangle(p(1, 1), p(3, 3), 5, ShapeFillMode::Outline);
        let set: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(cells.len(), 8);
        assert_eq!(set, HashSet::from([6, 7, 8, 11, 13, 16, 17, 18]));
        assert!(!set.contains(&12));
    }

    #[test]
    fn corners_may_be_given_in_any_order() {
        let a = rasterize_rectangle(p(3, 3), p(1, 1), 5, ShapeFillMode::Outline);
        let b = rasterize_rectangle(p(1, 1), p(3, 3), 5, ShapeFillMode::Outline);
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_rectangles_do_not_double_emit() {
        let row = rasterize_rectangle(p(0, 2), p(4, 2), 5, ShapeFillMode::Outline);
        assert_eq!(row, vec![10, 11, 12, 13, 14]);
        let col = rasterize_rectangle(p(1, 0), p(1, 3), 5, ShapeFillMode::Outline);
        assert_eq!(col, vec![1, 6, 11, 16]);
        let dot = rasterize_rectangle(p(2, 2), p(2, 2), 5, ShapeFillMode::Outline);
        assert_eq!(dot, vec![12]);
    }

    #[test]
    fn filled_rectangle_is_clipped() {
        let cells = rasterize_rectangle(p(-1, -1), p(1, 1), 4, ShapeFillMode::Filled);
        assert_eq!(cells, vec![0, 1, 4, 5]);
        let all = rasterize_rectangle(p(0, 0), p(3, 3), 4, ShapeFillMode::Filled);
        assert_eq!(all.len(), 16);
    }

    #[test]
    fn filled_circle_uses_rounded_radius() {
        // Distance sqrt(2) rounds to 1: a plus shape.
        let cells = rasterize_circle(p(2, 2), p(3, 3), 5, ShapeFillMode::Filled);
        let set: HashSet<_> = cells.into_iter().collect();
        assert_eq!(set, HashSet::from([7, 11, 12, 13, 17]));
    }

    #[test]
    fn zero_radius_circle_is_its_center() {
        assert_eq!(rasterize_circle(p(1, 1), p(1, 1), 4, ShapeFillMode::Filled), vec![5]);
        assert_eq!(rasterize_circle(p(1, 1), p(1, 1), 4, ShapeFillMode::Outline), vec![5]);
    }

    #[test]
    fn outline_circle_is_symmetric_and_unique() {
        let size = 21;
        let cells = rasterize_circle(p(10, 10), p(15, 10), size, ShapeFillMode::Outline);
        let set: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(set.len(), cells.len());
        for &i in &cells {
            let q = GridPoint::from_index(i, size);
            let (dx, dy) = (q.x - 10, q.y - 10);
            let mirror = p(10 - dx, 10 + dy).to_index(size).unwrap();
            assert!(set.contains(&mirror));
            let d2 = dx * dx + dy * dy;
            assert!((16..=36).contains(&d2), "cell {dx},{dy} too far from the ring");
        }
        // Axis extremes are on the ring.
        assert!(set.contains(&p(15, 10).to_index(size).unwrap()));
        assert!(set.contains(&p(10, 5).to_index(size).unwrap()));
    }

    #[test]
    fn circle_is_clipped_at_grid_edge() {
        let cells = rasterize_circle(p(0, 0), p(2, 0), 4, ShapeFillMode::Outline);
        for &i in &cells {
            assert!(i < 16);
        }
        assert!(cells.contains(&2));
        assert!(cells.contains(&8));
    }

    #[test]
    fn line_across_the_whole_i32_range_is_clipped() {
        let cells = rasterize_line(p(i32::MIN, 0), p(i32::MAX, 0), 8);
        assert_eq!(cells, (0..8).collect::<Vec<_>>());
        let back = rasterize_line(p(i32::MAX, 7), p(i32::MIN, 7), 8);
        assert_eq!(back, (56..64).rev().collect::<Vec<_>>());
    }

    #[test]
    fn long_diagonal_through_the_grid_matches_short_one() {
        let long = rasterize_line(p(-1_000_000, -1_000_000), p(1_000_000, 1_000_000), 8);
        let short = rasterize_line(p(0, 0), p(7, 7), 8);
        assert_eq!(long, short);
    }

    #[test]
    fn huge_filled_rectangle_covers_grid_once() {
        let cells =
            rasterize_rectangle(p(-20_000, -20_000), p(20_000, 20_000), 8, ShapeFillMode::Filled);
        assert_eq!(cells, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn huge_outline_rectangle_around_grid_is_empty() {
        let cells = rasterize_rectangle(
            p(i32::MIN, i32::MIN),
            p(i32::MAX, i32::MAX),
            8,
            ShapeFillMode::Outline,
        );
        assert!(cells.is_empty());
        // Only the left edge crosses the grid.
        let edge = rasterize_rectangle(p(3, -50_000), p(90_000, 50_000), 8, ShapeFillMode::Outline);
        assert_eq!(edge, vec![3, 11, 19, 27, 35, 43, 51, 59]);
    }

    #[test]
    fn huge_filled_circle_covers_grid() {
        let cells = rasterize_circle(p(2, 2), p(50_000, 2), 8, ShapeFillMode::Filled);
        assert_eq!(cells, (0..64).collect::<Vec<_>>());
        let extreme = rasterize_circle(
            p(i32::MIN, i32::MIN),
            p(i32::MAX, i32::MAX),
            8,
            ShapeFillMode::Filled,
        );
        assert_eq!(extreme.len(), 64);
    }

    #[test]
    fn far_outline_circles_miss_the_grid() {
        // Ring wholly outside.
        let outside =
            rasterize_circle(p(-10_000, -10_000), p(-10_003, -10_000), 8, ShapeFillMode::Outline);
        assert!(outside.is_empty());
        // Grid wholly inside the ring.
        let inside = rasterize_circle(p(4, 4), p(50_000, 4), 8, ShapeFillMode::Outline);
        assert!(inside.is_empty());
    }

    #[test]
    fn huge_outline_circle_crossing_the_grid_is_a_thin_arc() {
        // Centre far left, ring passes through column 3.
        let cells = rasterize_circle(p(-99_997, 4), p(3, 4), 8, ShapeFillMode::Outline);
        assert!(cells.contains(&p(3, 4).to_index(8).unwrap()));
        let set: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(set.len(), cells.len());
        for &i in &cells {
            let q = GridPoint::from_index(i, 8);
            assert!((2..=4).contains(&q.x), "arc strayed to column {}", q.x);
        }
    }
}
