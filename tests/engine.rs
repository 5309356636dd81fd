use gridpaint::components::history::HistoryManager;
use gridpaint::ops::fill::flood_fill;
use gridpaint::ops::shapes::{GridPoint, ShapeFillMode, rasterize_line, rasterize_rectangle};
use gridpaint::ops::stamp::stamp_external_artwork;
use gridpaint::ops::transform::MoveEngine;
use gridpaint::ops::canvas_ops;
use gridpaint::{Color, Document, EditError, Project, Tool, ToolEvent, ToolFeedback};
use gridpaint::settings::EngineSettings;

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);

#[test]
fn set_get_round_trip_and_out_of_bounds_is_ignored() {
    let mut doc = Document::new(16, Color::Transparent).unwrap();
    assert!(doc.set_pixel(0, 0, 15, 15, RED));
    assert_eq!(doc.get_pixel(0, 0, 15, 15), Some(RED));

    let before = doc.clone();
    assert!(!doc.set_pixel(0, 0, 16, 0, RED));
    assert!(!doc.set_pixel(0, 0, -1, 3, RED));
    assert!(!doc.set_pixel(4, 0, 0, 0, RED));
    assert_eq!(doc, before);
}

#[test]
fn grid_size_limits() {
    assert!(matches!(
        Document::new(0, Color::Transparent),
        Err(EditError::InvalidGridSize { .. })
    ));
    assert!(Document::new(513, Color::Transparent).is_err());
    assert!(Document::new(512, Color::Transparent).is_ok());
}

#[test]
fn checkpoint_undo_redo_restore_exact_documents() {
    let mut doc = Document::new(8, Color::Transparent).unwrap();
    let mut history = HistoryManager::default();
    let original = doc.clone();

    history.checkpoint(&doc, "Pencil");
    doc.set_pixel(0, 0, 3, 3, RED);
    let painted = doc.clone();

    history.undo(&mut doc).unwrap();
    assert_eq!(doc, original);
    history.redo(&mut doc).unwrap();
    assert_eq!(doc, painted);
    assert_eq!(history.redo(&mut doc), Err(EditError::NothingToRedo));
}

#[test]
fn history_cap_evicts_oldest() {
    let doc = Document::new(2, Color::Transparent).unwrap();
    let mut history = HistoryManager::new(50);
    for i in 0..51 {
        history.checkpoint(&doc, format!("edit {i}"));
    }
    assert_eq!(history.undo_count(), 50);
    assert!(!history.undo_history().contains(&"edit 0".to_string()));
}

#[test]
fn flood_fill_counts() {
    let mut doc = Document::new(8, Color::Transparent).unwrap();
    assert_eq!(flood_fill(doc.active_layer_mut(), 0, RED), 64);

    let mut doc = Document::new(8, Color::Transparent).unwrap();
    doc.set_pixel(0, 0, 0, 0, BLUE);
    assert_eq!(flood_fill(doc.active_layer_mut(), 1, RED), 63);
    assert_eq!(doc.get_pixel(0, 0, 0, 0), Some(BLUE));
}

#[test]
fn rasterizer_reference_shapes() {
    assert_eq!(
        rasterize_line(GridPoint::new(0, 0), GridPoint::new(3, 0), 4),
        vec![0, 1, 2, 3]
    );
    let mut rect = rasterize_rectangle(
        GridPoint::new(1, 1),
        GridPoint::new(3, 3),
        5,
        ShapeFillMode::Outline,
    );
    rect.sort_unstable();
    assert_eq!(rect, vec![6, 7, 8, 11, 13, 16, 17, 18]);
}

#[test]
fn move_engine_edge_cases() {
    let mut doc = Document::new(4, Color::Transparent).unwrap();
    let mut mover = MoveEngine::new();
    let before = doc.clone();
    assert_eq!(mover.start_move(doc.active_layer_mut()).unwrap(), 0);
    assert!(!mover.is_dragging());
    assert_eq!(doc, before);

    doc.set_pixel(0, 0, 1, 1, RED);
    mover.start_move(doc.active_layer_mut()).unwrap();
    let summary = mover.commit_move(doc.active_layer_mut(), 10, 10).unwrap();
    assert_eq!(summary.dropped, 1);
    assert!(doc.active_layer().pixels.is_blank());
}

#[test]
fn malformed_stamp_leaves_layer_unchanged() {
    let mut doc = Document::new(4, Color::Transparent).unwrap();
    doc.set_pixel(0, 0, 0, 0, RED);
    let before = doc.clone();
    assert_eq!(
        stamp_external_artwork(&mut doc, 0, 0, 1, 1, 2, 2, &[BLUE; 3]),
        Err(EditError::MalformedStamp { expected: 4, actual: 3 })
    );
    assert_eq!(doc, before);
}

#[test]
fn resize_keeps_overlap_on_every_layer_and_frame() {
    let mut doc = Document::new(8, Color::Transparent).unwrap();
    doc.set_pixel(0, 0, 2, 2, RED);
    doc.set_pixel(0, 0, 7, 7, RED);
    canvas_ops::add_layer(&mut doc);
    doc.set_pixel(0, 1, 3, 1, BLUE);
    canvas_ops::add_frame(&mut doc);
    doc.set_pixel(1, 0, 0, 3, BLUE);

    doc.resize(4).unwrap();
    assert_eq!(doc.grid_size(), 4);
    assert_eq!(doc.get_pixel(0, 0, 2, 2), Some(RED));
    assert_eq!(doc.get_pixel(0, 1, 3, 1), Some(BLUE));
    assert_eq!(doc.get_pixel(1, 0, 0, 3), Some(BLUE));
    assert_eq!(doc.get_pixel(0, 0, 7, 7), None);

    doc.resize(6).unwrap();
    assert_eq!(doc.get_pixel(0, 0, 2, 2), Some(RED));
    assert_eq!(doc.get_pixel(0, 0, 5, 5), Some(Color::Transparent));
}

#[test]
fn translucent_layers_do_not_cover_lower_ones() {
    let mut doc = Document::new(2, RED).unwrap();
    canvas_ops::add_layer(&mut doc);
    doc.set_pixel(0, 1, 0, 0, BLUE);

    canvas_ops::set_layer_opacity(&mut doc, 1, 40).unwrap();
    assert_eq!(doc.composite(0).unwrap()[0], RED);
    canvas_ops::set_layer_opacity(&mut doc, 1, 60).unwrap();
    assert_eq!(doc.composite(0).unwrap()[0], BLUE);
    canvas_ops::set_layer_visibility(&mut doc, 1, false).unwrap();
    assert_eq!(doc.composite(0).unwrap()[0], RED);
}

#[test]
fn one_pencil_gesture_is_one_undo_step() {
    let mut project = Project::new_untitled(1, 8, Color::Transparent, &EngineSettings::default()).unwrap();
    project.tools.color = RED;
    project.set_tool(Tool::Pencil);
    project.handle_tool_event(ToolEvent::Press(GridPoint::new(0, 0)));
    project.handle_tool_event(ToolEvent::Drag(GridPoint::new(3, 0)));
    let fb = project.handle_tool_event(ToolEvent::Release(GridPoint::new(3, 3)));
    assert!(matches!(fb, ToolFeedback::Painted(_)));
    assert_eq!(project.history.undo_count(), 1);
    assert_eq!(project.document.get_pixel(0, 0, 3, 3), Some(RED));

    project.undo().unwrap();
    assert!(project.document.active_layer().pixels.is_blank());
}
