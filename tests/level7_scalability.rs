//! Level 7: Scalability Tests
//!
//! These tests verify that the editor handles large scenes (1K-10K nodes)
//! without performance regressions. Tests use generous timing thresholds
//! (2-5x expected) to avoid CI flakiness while still catching O(n²)
//! regressions.
//!
//! **IMPORTANT:** Run with `cargo test level7 --release` for realistic performance.
//! Debug mode is 10-50x slower and timing assertions will be skipped.

use blueprint_canvas::{
    Config, EditorContext, InputSnapshot, LinkId, MouseButton, NodeId, PinId, PinKind, Rect, Vec2,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

// ============================================================================
// Debug Mode Detection
// ============================================================================

/// Returns true if running in debug mode (without optimizations)
const fn is_debug_mode() -> bool {
    cfg!(debug_assertions)
}

/// Assert that elapsed time is within threshold, but skip in debug mode.
/// In debug mode, prints a warning instead of failing.
macro_rules! assert_timing {
    ($elapsed:expr, $threshold:expr, $($msg:tt)+) => {
        if is_debug_mode() {
            if $elapsed > $threshold {
                eprintln!(
                    "SKIPPED (debug mode): {} - took {:?}, threshold {:?}. Run with --release for accurate timing.",
                    format!($($msg)+),
                    $elapsed,
                    $threshold
                );
            }
        } else {
            assert!(
                $elapsed <= $threshold,
                "{} took {:?}, expected <= {:?}",
                format!($($msg)+),
                $elapsed,
                $threshold
            );
        }
    };
}

// ============================================================================
// Constants
// ============================================================================

/// Small scale: 1,000 nodes
const SCALE_SMALL: u64 = 1_000;

/// Large scale: 10,000 nodes
const SCALE_LARGE: u64 = 10_000;

/// Nodes per grid row
const COLUMNS: u64 = 100;

const SPACING: Vec2 = Vec2::new(200.0, 150.0);
const NODE_SIZE: Vec2 = Vec2::new(150.0, 100.0);
const PIN_SIZE: f32 = 16.0;
const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

// ============================================================================
// Timing Thresholds (generous to avoid CI flakiness)
// ============================================================================

mod thresholds {
    use super::*;

    /// One full frame declaring 1K nodes with pins and links
    pub const FRAME_1K: Duration = Duration::from_millis(50);

    /// One full frame declaring 10K nodes with pins and links
    pub const FRAME_10K: Duration = Duration::from_millis(400);

    /// Pruning half of a 10K scene
    pub const PRUNE_HALF_10K: Duration = Duration::from_millis(400);

    /// 100 pin hit tests against 10K nodes
    pub const PIN_HIT_100_QUERIES: Duration = Duration::from_millis(100);

    /// 100 link hit tests against ~1K links
    pub const LINK_HIT_100_QUERIES: Duration = Duration::from_millis(500);

    /// Box query over 10K nodes
    pub const BOX_SELECT_10K: Duration = Duration::from_millis(50);

    /// Selecting 1K nodes one by one
    pub const SELECTION_ADD_1K: Duration = Duration::from_millis(50);

    /// Dragging 1K selected nodes through a press, move, release sequence
    pub const ALL_SELECTED_DRAG_1K: Duration = Duration::from_millis(200);
}

// ============================================================================
// Scene Generation
// ============================================================================

fn n(id: u64) -> NodeId<u64> {
    NodeId::new(id)
}

fn input_pin(node: u64) -> PinId<u64> {
    PinId::new(node * 2)
}

fn output_pin(node: u64) -> PinId<u64> {
    PinId::new(node * 2 + 1)
}

/// Canvas position of node `id` (1-based) in the grid.
fn grid_position(id: u64) -> Vec2 {
    let index = id - 1;
    Vec2::new((index % COLUMNS) as f32 * SPACING.x, (index / COLUMNS) as f32 * SPACING.y)
}

fn output_pin_center(id: u64) -> Vec2 {
    grid_position(id) + Vec2::new(NODE_SIZE.x - PIN_SIZE / 2.0, NODE_SIZE.y / 2.0)
}

/// Ids of nodes linked to their right-hand neighbour. Links never wrap to
/// the next row.
fn linked_ids(count: u64) -> impl Iterator<Item = u64> {
    (1..count).filter(|id| id % COLUMNS != 0)
}

fn new_editor() -> EditorContext<u64> {
    let mut config = Config::default();
    config.style.node_padding = [0.0; 4];
    let mut editor = EditorContext::new(config);
    // Place every node before it is first declared
    for id in 1..=SCALE_LARGE {
        editor.set_node_position(&n(id), grid_position(id));
    }
    editor
}

/// Declare nodes `1..=count`, each with one input and one output pin, and
/// chain them row by row.
fn declare(editor: &mut EditorContext<u64>, count: u64) {
    let pin = Vec2::splat(PIN_SIZE);
    let pin_y = NODE_SIZE.y / 2.0 - PIN_SIZE / 2.0;
    for id in 1..=count {
        editor.begin_node(n(id));
        editor.begin_pin(input_pin(id), PinKind::Input);
        editor.end_pin(Rect::from_min_size(Vec2::new(0.0, pin_y), pin));
        editor.begin_pin(output_pin(id), PinKind::Output);
        editor.end_pin(Rect::from_min_size(Vec2::new(NODE_SIZE.x - PIN_SIZE, pin_y), pin));
        editor.end_node(NODE_SIZE);
    }
    for id in linked_ids(count) {
        editor.link(LinkId::new(id), output_pin(id), input_pin(id + 1));
    }
}

fn frame(editor: &mut EditorContext<u64>, count: u64, input: InputSnapshot) {
    editor.begin_frame(input, VIEWPORT);
    declare(editor, count);
    editor.end_frame();
}

fn scene(count: u64) -> EditorContext<u64> {
    let mut editor = new_editor();
    frame(&mut editor, count, InputSnapshot::default());
    editor
}

// ============================================================================
// Frame Tests
// ============================================================================

#[test]
fn test_frame_declaring_1k_nodes() {
    let mut editor = new_editor();

    let start = Instant::now();
    frame(&mut editor, SCALE_SMALL, InputSnapshot::default());
    let elapsed = start.elapsed();

    let registry = editor.registry();
    assert_eq!(registry.node_count(), SCALE_SMALL as usize);
    assert_eq!(registry.pin_count(), SCALE_SMALL as usize * 2);
    assert_eq!(registry.link_count(), linked_ids(SCALE_SMALL).count());
    assert!(editor.take_diagnostics().is_empty());
    assert_timing!(elapsed, thresholds::FRAME_1K, "First frame (1K)");
}

#[test]
fn test_steady_state_frame_10k_nodes() {
    let mut editor = scene(SCALE_LARGE);

    let start = Instant::now();
    frame(&mut editor, SCALE_LARGE, InputSnapshot::default());
    let elapsed = start.elapsed();

    assert_eq!(editor.node_count(), SCALE_LARGE as usize);
    assert_eq!(editor.node_position(&n(SCALE_LARGE)), Some(grid_position(SCALE_LARGE)));
    assert_timing!(elapsed, thresholds::FRAME_10K, "Steady frame (10K)");
}

#[test]
fn test_prune_half_of_10k_nodes() {
    let mut editor = scene(SCALE_LARGE);
    let half = SCALE_LARGE / 2;

    let start = Instant::now();
    frame(&mut editor, half, InputSnapshot::default());
    let elapsed = start.elapsed();

    let registry = editor.registry();
    assert_eq!(registry.node_count(), half as usize);
    assert_eq!(registry.pin_count(), half as usize * 2);
    assert_eq!(registry.link_count(), linked_ids(half).count());
    assert!(!editor.has_node(&n(half + 1)));
    assert_timing!(elapsed, thresholds::PRUNE_HALF_10K, "Prune half (10K)");
}

#[test]
fn test_z_order_stays_consistent_at_scale() {
    let editor = scene(SCALE_SMALL);

    let ordered = editor.ordered_node_ids();

    assert_eq!(ordered.len(), SCALE_SMALL as usize);
    assert_eq!(ordered.first(), Some(&n(1)));
    assert_eq!(ordered.last(), Some(&n(SCALE_SMALL)));
}

// ============================================================================
// Hit Testing Tests
// ============================================================================

#[test]
fn test_pin_hit_tests_10k_nodes() {
    let editor = scene(SCALE_LARGE);
    let registry = editor.registry();

    let target = SCALE_LARGE - 100;
    assert_eq!(
        registry.find_pin_at(output_pin_center(target), 2.0).map(|(id, _)| id),
        Some(output_pin(target))
    );
    assert_eq!(registry.find_pin_at(Vec2::new(-1000.0, -1000.0), 2.0), None);

    let start = Instant::now();
    for i in 0..100u64 {
        let id = 1 + (i * 97) % SCALE_LARGE;
        let hit = registry.find_pin_at(output_pin_center(id), 2.0);
        assert_eq!(hit.map(|(pin, _)| pin), Some(output_pin(id)));
    }
    let elapsed = start.elapsed();

    assert_timing!(elapsed, thresholds::PIN_HIT_100_QUERIES, "100 pin queries (10K)");
}

#[test]
fn test_node_hit_test_10k_nodes() {
    let editor = scene(SCALE_LARGE);
    let registry = editor.registry();

    let inside = grid_position(5_050) + Vec2::new(75.0, 20.0);
    let gap = grid_position(5_050) + Vec2::new(175.0, 20.0);

    assert_eq!(registry.find_node_at(inside).map(|(id, _)| id), Some(n(5_050)));
    assert_eq!(registry.find_node_at(gap), None);
}

#[test]
fn test_link_hit_tests_1k_nodes() {
    let editor = scene(SCALE_SMALL);
    let registry = editor.registry();
    let strength = editor.style().link_strength;

    // Links run straight along each row between neighbouring pins
    let midpoint = |id: u64| grid_position(id) + Vec2::new(NODE_SIZE.x + (SPACING.x - NODE_SIZE.x) / 2.0, NODE_SIZE.y / 2.0);

    let start = Instant::now();
    for id in linked_ids(SCALE_SMALL).take(100) {
        assert_eq!(registry.find_link_at(midpoint(id), 6.0, strength), Some(LinkId::new(id)));
    }
    let elapsed = start.elapsed();

    assert_timing!(elapsed, thresholds::LINK_HIT_100_QUERIES, "100 link queries (1K)");
}

#[test]
fn test_box_query_10k_nodes() {
    let editor = scene(SCALE_LARGE);

    // The first ten nodes of the first row
    let rect = Rect::from_corners(Vec2::new(-10.0, -10.0), Vec2::new(1_990.0, 110.0));

    let start = Instant::now();
    let nodes = editor.registry().nodes_in_rect(&rect);
    let elapsed = start.elapsed();

    assert_eq!(nodes.len(), 10);
    assert!(nodes.contains(&n(1)));
    assert!(nodes.contains(&n(10)));
    assert_timing!(elapsed, thresholds::BOX_SELECT_10K, "Box query (10K)");
}

// ============================================================================
// Selection & Drag Tests
// ============================================================================

#[test]
fn test_select_1k_nodes() {
    let mut editor = scene(SCALE_SMALL);

    let start = Instant::now();
    for id in 1..=SCALE_SMALL {
        editor.select_node(&n(id), true);
    }
    let elapsed = start.elapsed();

    assert_eq!(editor.selected_object_count(), SCALE_SMALL as usize);
    assert!(editor.is_node_selected(&n(SCALE_SMALL / 2)));
    assert_timing!(elapsed, thresholds::SELECTION_ADD_1K, "Select 1K nodes");
}

#[test]
fn test_drag_all_selected_1k_nodes() {
    let mut editor = scene(SCALE_SMALL);
    for id in 1..=SCALE_SMALL {
        editor.select_node(&n(id), true);
    }
    let grab = grid_position(1) + Vec2::new(75.0, 20.0);
    let drop = grab + Vec2::new(50.0, 30.0);

    let start = Instant::now();
    frame(&mut editor, SCALE_SMALL, InputSnapshot::new(grab).with_press(MouseButton::Primary));
    frame(&mut editor, SCALE_SMALL, InputSnapshot::new(drop).with_button_down(MouseButton::Primary));
    frame(&mut editor, SCALE_SMALL, InputSnapshot::new(drop).with_release(MouseButton::Primary));
    let elapsed = start.elapsed();

    let offset = Vec2::new(50.0, 30.0);
    assert_eq!(editor.node_position(&n(1)), Some(grid_position(1) + offset));
    assert_eq!(editor.node_position(&n(SCALE_SMALL)), Some(grid_position(SCALE_SMALL) + offset));
    assert_eq!(editor.selected_object_count(), SCALE_SMALL as usize);
    assert_timing!(elapsed, thresholds::ALL_SELECTED_DRAG_1K, "Drag 1K selected nodes");
}
