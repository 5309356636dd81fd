// ============================================================================
// GridPaint Scripting System - Rhai-based sandboxed scripting engine
// ============================================================================
//
// Scripts drive the same operations a front end would: pixels, shapes, fill,
// stamping, moves, layers, frames and history. Colors cross the boundary as
// hex strings, with "" meaning transparent. A script works on a copy of the
// project's document with a history of its own; the copy is adopted only
// when the script finishes without error.

use rhai::{Array, Engine, EvalAltResult, ImmutableString, Position, Scope};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::canvas::{Color, Document};
use crate::components::history::HistoryManager;
use crate::compositor::composite_pixel;
use crate::error::EditError;
use crate::ops::canvas_ops;
use crate::ops::fill::flood_fill;
use crate::ops::shapes::{GridPoint, ShapeFillMode, ShapeKind, rasterize};
use crate::ops::stamp::{stamp_onto_layer, validate_stamp};
use crate::ops::transform::{MoveEngine, flip_layer_horizontal, flip_layer_vertical};
use crate::project::Project;

/// Default operation budget for one script run.
pub const DEFAULT_MAX_OPERATIONS: u64 = 50_000_000;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|&l| l > 0),
            column: pos.position().filter(|&c| c > 0),
        }
    }
}

impl From<Box<EvalAltResult>> for ScriptError {
    fn from(e: Box<EvalAltResult>) -> Self {
        let pos = e.position();
        ScriptError::at(e.to_string(), pos)
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

/// What a finished run produced. Console output is kept even when the
/// script fails.
#[derive(Debug)]
pub struct ScriptOutcome {
    pub console_output: Vec<String>,
    pub elapsed_ms: u64,
    pub result: Result<(), ScriptError>,
}

// ============================================================================
// Script context - shared mutable state between engine and host functions
// ============================================================================

#[derive(Clone)]
struct ScriptContext {
    document: Document,
    history: HistoryManager,
    console_output: Vec<String>,
}

type SharedContext = Arc<Mutex<ScriptContext>>;
type HostResult<T> = Result<T, Box<EvalAltResult>>;

fn lock(ctx: &SharedContext) -> MutexGuard<'_, ScriptContext> {
    ctx.lock().unwrap_or_else(|e| e.into_inner())
}

fn host_err(e: EditError) -> Box<EvalAltResult> {
    e.to_string().into()
}

fn parse_color(s: &str) -> HostResult<Color> {
    Color::from_hex(s).map_err(host_err)
}

fn color_str(c: Color) -> String {
    c.to_hex().unwrap_or_default()
}

fn coord(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn index(v: i64) -> HostResult<usize> {
    usize::try_from(v).map_err(|_| format!("Index {} is negative", v).into())
}

// ============================================================================
// Engine construction with full sandbox + API registration
// ============================================================================

/// Create a new sandboxed Rhai engine with all host functions registered.
fn create_engine(ctx: SharedContext, max_operations: u64) -> Engine {
    let mut engine = Engine::new();

    // ── Sandbox limits ──
    engine.set_max_operations(max_operations);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(MAX_STAMP_CELLS);
    engine.set_max_map_size(1_000);

    register_document_api(&mut engine, ctx.clone());
    register_pixel_api(&mut engine, ctx.clone());
    register_shape_api(&mut engine, ctx.clone());
    register_transform_api(&mut engine, ctx.clone());
    register_layer_api(&mut engine, ctx.clone());
    register_frame_api(&mut engine, ctx.clone());
    register_history_api(&mut engine, ctx.clone());
    register_utility_api(&mut engine, ctx);

    engine
}

/// Largest array a script may build, enough for a full-grid stamp.
const MAX_STAMP_CELLS: usize = crate::canvas::MAX_GRID_SIZE * crate::canvas::MAX_GRID_SIZE;

// ============================================================================
// Document info API
// ============================================================================

fn register_document_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("grid_size", move || -> i64 { lock(&c).document.grid_size() as i64 });

    let c = ctx.clone();
    engine.register_fn("frame_count", move || -> i64 { lock(&c).document.frame_count() as i64 });

    let c = ctx.clone();
    engine.register_fn("layer_count", move || -> i64 {
        lock(&c).document.active_frame().layer_count() as i64
    });

    let c = ctx.clone();
    engine.register_fn("active_frame", move || -> i64 {
        lock(&c).document.current_frame_index() as i64
    });

    let c = ctx.clone();
    engine.register_fn("active_layer", move || -> i64 {
        lock(&c).document.current_layer_index() as i64
    });

    // resize(n) - every layer of every frame, anchored top-left
    let c = ctx;
    engine.register_fn("resize", move |size: i64| -> HostResult<()> {
        lock(&c).document.resize(index(size)?).map_err(host_err)
    });
}

// ============================================================================
// Pixel access API (active layer of the active frame)
// ============================================================================

fn register_pixel_api(engine: &mut Engine, ctx: SharedContext) {
    // get_pixel(x, y) -> "#rrggbb" or "" (transparent or off-grid)
    let c = ctx.clone();
    engine.register_fn("get_pixel", move |x: i64, y: i64| -> String {
        let lock = lock(&c);
        lock.document
            .active_layer()
            .pixels
            .get_xy(coord(x), coord(y))
            .map(color_str)
            .unwrap_or_default()
    });

    // set_pixel(x, y, color) -> whether the cell was on the grid
    let c = ctx.clone();
    engine.register_fn(
        "set_pixel",
        move |x: i64, y: i64, color: ImmutableString| -> HostResult<bool> {
            let color = parse_color(&color)?;
            let mut lock = lock(&c);
            Ok(lock
                .document
                .active_layer_mut()
                .pixels
                .set_xy(coord(x), coord(y), color))
        },
    );

    // composite_pixel(x, y) - what the viewer would show at (x, y)
    let c = ctx.clone();
    engine.register_fn("composite_pixel", move |x: i64, y: i64| -> String {
        let lock = lock(&c);
        let frame = lock.document.active_frame();
        match lock.document.active_layer().pixels.index_of(coord(x), coord(y)) {
            Some(i) => color_str(composite_pixel(frame, i)),
            None => String::new(),
        }
    });

    // fill(x, y, color) -> cells recolored
    let c = ctx.clone();
    engine.register_fn(
        "fill",
        move |x: i64, y: i64, color: ImmutableString| -> HostResult<i64> {
            let color = parse_color(&color)?;
            let mut lock = lock(&c);
            let layer = lock.document.active_layer_mut();
            let Some(start) = layer.pixels.index_of(coord(x), coord(y)) else {
                return Ok(0);
            };
            Ok(flood_fill(layer, start, color) as i64)
        },
    );

    // clear(color) - whole active layer
    let c = ctx.clone();
    engine.register_fn("clear", move |color: ImmutableString| -> HostResult<()> {
        let color = parse_color(&color)?;
        canvas_ops::clear_layer(&mut lock(&c).document, color);
        Ok(())
    });

    // stamp(x, y, w, h, colors) - centred on (x, y)
    let c = ctx;
    engine.register_fn(
        "stamp",
        move |x: i64, y: i64, w: i64, h: i64, colors: Array| -> HostResult<i64> {
            let colors = colors
                .into_iter()
                .map(|d| {
                    let s = d.into_string().map_err(|t| format!("Stamp color must be a string, got {}", t))?;
                    parse_color(&s)
                })
                .collect::<HostResult<Vec<Color>>>()?;
            let (w, h) = (index(w)?, index(h)?);
            validate_stamp(w, h, &colors).map_err(host_err)?;
            let mut lock = lock(&c);
            let written =
                stamp_onto_layer(lock.document.active_layer_mut(), coord(x), coord(y), w, h, &colors);
            Ok(written as i64)
        },
    );
}

// ============================================================================
// Shape API
// ============================================================================

fn draw_shape(
    ctx: &SharedContext,
    kind: ShapeKind,
    (x0, y0, x1, y1): (i64, i64, i64, i64),
    color: &str,
    filled: bool,
) -> HostResult<i64> {
    let color = parse_color(color)?;
    let mode = if filled { ShapeFillMode::Filled } else { ShapeFillMode::Outline };
    let mut lock = lock(ctx);
    let size = lock.document.grid_size();
    let cells = rasterize(
        kind,
        GridPoint::new(coord(x0), coord(y0)),
        GridPoint::new(coord(x1), coord(y1)),
        size,
        mode,
    );
    let layer = lock.document.active_layer_mut();
    for &i in &cells {
        layer.pixels.set(i, color);
    }
    Ok(cells.len() as i64)
}

fn register_shape_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn(
        "line",
        move |x0: i64, y0: i64, x1: i64, y1: i64, color: ImmutableString| -> HostResult<i64> {
            draw_shape(&c, ShapeKind::Line, (x0, y0, x1, y1), &color, false)
        },
    );

    for (name, kind) in [("rect", ShapeKind::Rectangle), ("circle", ShapeKind::Circle)] {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |x0: i64, y0: i64, x1: i64, y1: i64, color: ImmutableString| -> HostResult<i64> {
                draw_shape(&c, kind, (x0, y0, x1, y1), &color, false)
            },
        );
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |x0: i64,
                  y0: i64,
                  x1: i64,
                  y1: i64,
                  color: ImmutableString,
                  filled: bool|
                  -> HostResult<i64> { draw_shape(&c, kind, (x0, y0, x1, y1), &color, filled) },
        );
    }
}

// ============================================================================
// Transform API
// ============================================================================

fn register_transform_api(engine: &mut Engine, ctx: SharedContext) {
    // move_pixels(dx, dy) - lift the whole layer and drop it offset; returns
    // how many pixels are still on the grid
    let c = ctx.clone();
    engine.register_fn("move_pixels", move |dx: i64, dy: i64| -> HostResult<i64> {
        let mut lock = lock(&c);
        let layer = lock.document.active_layer_mut();
        let mut mover = MoveEngine::new();
        if mover.start_move(layer).map_err(host_err)? == 0 {
            return Ok(0);
        }
        let summary = mover
            .commit_move(layer, coord(dx), coord(dy))
            .map_err(host_err)?;
        Ok(summary.placed as i64)
    });

    let c = ctx.clone();
    engine.register_fn("flip_horizontal", move || {
        flip_layer_horizontal(lock(&c).document.active_layer_mut());
    });

    let c = ctx;
    engine.register_fn("flip_vertical", move || {
        flip_layer_vertical(lock(&c).document.active_layer_mut());
    });
}

// ============================================================================
// Layer API (active frame)
// ============================================================================

fn register_layer_api(engine: &mut Engine, ctx: SharedContext) {
    // add_layer() -> index of the new, now active, layer
    let c = ctx.clone();
    engine.register_fn("add_layer", move || -> i64 {
        let mut lock = lock(&c);
        canvas_ops::add_layer(&mut lock.document);
        lock.document.current_layer_index() as i64
    });

    let c = ctx.clone();
    engine.register_fn("delete_layer", move || -> HostResult<()> {
        canvas_ops::delete_layer(&mut lock(&c).document).map_err(host_err)
    });

    let c = ctx.clone();
    engine.register_fn("duplicate_layer", move || -> i64 {
        let mut lock = lock(&c);
        canvas_ops::duplicate_layer(&mut lock.document);
        lock.document.current_layer_index() as i64
    });

    let c = ctx.clone();
    engine.register_fn("select_layer", move |i: i64| -> HostResult<()> {
        lock(&c).document.select_layer(index(i)?).map_err(host_err)
    });

    let c = ctx.clone();
    engine.register_fn("set_opacity", move |i: i64, opacity: i64| -> HostResult<()> {
        let opacity = opacity.clamp(0, 100) as u8;
        canvas_ops::set_layer_opacity(&mut lock(&c).document, index(i)?, opacity).map_err(host_err)
    });

    let c = ctx.clone();
    engine.register_fn("set_visible", move |i: i64, visible: bool| -> HostResult<()> {
        canvas_ops::set_layer_visibility(&mut lock(&c).document, index(i)?, visible).map_err(host_err)
    });

    let c = ctx.clone();
    engine.register_fn(
        "rename_layer",
        move |i: i64, name: ImmutableString| -> HostResult<()> {
            canvas_ops::rename_layer(&mut lock(&c).document, index(i)?, name.to_string())
                .map_err(host_err)
        },
    );

    let c = ctx;
    engine.register_fn("merge_down", move || -> HostResult<()> {
        canvas_ops::merge_down(&mut lock(&c).document).map_err(host_err)
    });
}

// ============================================================================
// Frame API
// ============================================================================

fn register_frame_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("add_frame", move || -> i64 {
        canvas_ops::add_frame(&mut lock(&c).document) as i64
    });

    let c = ctx.clone();
    engine.register_fn("duplicate_frame", move || -> i64 {
        canvas_ops::duplicate_frame(&mut lock(&c).document) as i64
    });

    let c = ctx.clone();
    engine.register_fn("delete_frame", move || -> HostResult<()> {
        canvas_ops::delete_frame(&mut lock(&c).document).map_err(host_err)
    });

    let c = ctx;
    engine.register_fn("select_frame", move |i: i64| -> HostResult<()> {
        lock(&c).document.select_frame(index(i)?).map_err(host_err)
    });
}

// ============================================================================
// History API
// ============================================================================

fn register_history_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("checkpoint", move |description: ImmutableString| {
        let mut lock = lock(&c);
        let ScriptContext { document, history, .. } = &mut *lock;
        history.checkpoint(document, description.to_string());
    });

    // undo()/redo() -> false when there was nothing to step over
    let c = ctx.clone();
    engine.register_fn("undo", move || -> bool {
        let mut lock = lock(&c);
        let ScriptContext { document, history, .. } = &mut *lock;
        history.undo(document).is_ok()
    });

    let c = ctx;
    engine.register_fn("redo", move || -> bool {
        let mut lock = lock(&c);
        let ScriptContext { document, history, .. } = &mut *lock;
        history.redo(document).is_ok()
    });
}

// ============================================================================
// Utility API
// ============================================================================

fn register_utility_api(engine: &mut Engine, ctx: SharedContext) {
    // print_line(msg) - output to script console
    let c = ctx.clone();
    engine.register_fn("print_line", move |msg: ImmutableString| {
        lock(&c).console_output.push(msg.to_string());
    });
    // Also override built-in print
    let c = ctx;
    engine.on_print(move |msg| {
        lock(&c).console_output.push(msg.to_string());
    });

    engine.register_fn("clamp", |v: i64, lo: i64, hi: i64| -> i64 { v.max(lo).min(hi) });
}

// ============================================================================
// Public execution API
// ============================================================================

/// Run a script against `project` on the calling thread.
///
/// Any gesture in flight is cancelled first. The whole run counts as one
/// undoable step labelled "Script"; on failure the project is left exactly
/// as it was.
pub fn execute_script(source: &str, project: &mut Project, max_operations: u64) -> ScriptOutcome {
    let started = Instant::now();
    project.cancel_gesture();

    // Script-level undo only reaches states the script itself created.
    let ctx = Arc::new(Mutex::new(ScriptContext {
        document: project.document.clone(),
        history: HistoryManager::new(project.history.max_history_size()),
        console_output: Vec::new(),
    }));

    let engine = create_engine(ctx.clone(), max_operations);
    let result = engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))
        .and_then(|ast| {
            let mut scope = Scope::new();
            engine.run_ast_with_scope(&mut scope, &ast).map_err(ScriptError::from)
        });
    drop(engine);

    let finished = match Arc::try_unwrap(ctx) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|e| e.into_inner()),
        Err(shared) => lock(&shared).clone(),
    };

    match &result {
        Ok(()) if finished.document != project.document => {
            project.checkpoint("Script");
            project.document = finished.document;
            project.mark_dirty();
        }
        Ok(()) => tracing::debug!("Script left the document unchanged"),
        Err(e) => tracing::warn!("Script failed: {}", e),
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!("Script finished in {} ms", elapsed_ms);
    ScriptOutcome {
        console_output: finished.console_output,
        elapsed_ms,
        result,
    }
}
