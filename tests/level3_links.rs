//! Level 3: Link Creation Tests
//!
//! Tests dragging links between pins, the accept/reject protocol, candidate
//! validation and link rendering.

mod common;

use blueprint_canvas::{
    ChangeKind, DrawChannel, DrawCommand, GestureKind, InputSnapshot, Misuse, MouseButton, NoDuplicatesValidator,
    PendingChange, StyleColor, ValidationError, Vec2,
};
use common::harness::{base_config, input_pin, l, n, output_pin, p, EditorHarness, NODE_A, NODE_B};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn held(at: Vec2) -> InputSnapshot {
    InputSnapshot::new(at).with_button_down(MouseButton::Primary)
}

fn released(at: Vec2) -> InputSnapshot {
    InputSnapshot::new(at).with_release(MouseButton::Primary)
}

/// Press on `from` and drag to `to` without releasing. Returns the change
/// offered in the last frame, accepting it when `accept` is set.
fn drag_link(harness: &mut EditorHarness, from: Vec2, to: Vec2, accept: bool) -> Option<PendingChange<u64>> {
    harness.press(from);
    harness.frame_with(held(to), |editor| {
        let change = editor.query_new_link()?;
        if accept {
            assert!(!editor.accept_new_item(&change), "nothing is committed before release");
        } else {
            editor.reject_new_item(&change);
        }
        Some(change)
    })
}

fn hint_colors(harness: &EditorHarness) -> Vec<slint::Color> {
    harness
        .editor
        .draw_output()
        .channel(DrawChannel::Hint)
        .iter()
        .filter_map(|command| match command {
            DrawCommand::Bezier { color, .. } => Some(*color),
            _ => None,
        })
        .collect()
}

#[test]
fn test_link_created_on_release() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_B);

    let offered = drag_link(&mut harness, from, to, true).expect("candidate while hovering the input");
    assert_eq!(offered.kind(), &ChangeKind::NewLink { start: p(3), end: p(4) });
    assert_eq!(harness.editor.gesture(), GestureKind::CreatingLink);

    let committed = harness.frame_with(released(to), |editor| {
        let change = editor.query_new_link().expect("candidate on release");
        editor.accept_new_item(&change)
    });
    assert!(committed);
    assert_eq!(harness.editor.gesture(), GestureKind::Idle);

    // The application adds the link to its model and declares it from now on
    harness.links.push((7, output_pin(NODE_A), input_pin(NODE_B)));
    harness.frame(InputSnapshot::new(to));

    assert_eq!(harness.editor.link_pins(&l(7)), Some((p(3), p(4))));
    let curve = harness.editor.link_screen_curve(&l(7)).expect("link declared");
    assert!(curve.p0.abs_diff_eq(Vec2::new(250.0, 150.0), 1e-3));
    assert!(curve.p3.abs_diff_eq(Vec2::new(400.0, 250.0), 1e-3));

    let drawn = harness.editor.draw_output().channel(DrawChannel::Links);
    assert!(drawn
        .iter()
        .any(|command| matches!(command, DrawCommand::Bezier { curve: c, .. } if *c == curve)));
}

#[test]
fn test_accepted_candidate_is_drawn_as_accepted() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_B);

    drag_link(&mut harness, from, to, true);

    let accepted = harness.editor.style().color(StyleColor::LinkAccepted);
    assert_eq!(hint_colors(&harness), vec![accepted]);
}

#[test]
fn test_link_dragged_from_input_is_normalized() {
    let mut harness = EditorHarness::without_links();
    let from = harness.input_pin_center(NODE_B);
    let to = harness.output_pin_center(NODE_A);

    let offered = drag_link(&mut harness, from, to, true).expect("candidate");

    assert_eq!(offered.kind(), &ChangeKind::NewLink { start: p(3), end: p(4) });
}

#[test]
fn test_same_direction_pins_are_refused() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.output_pin_center(NODE_B);

    assert_eq!(drag_link(&mut harness, from, to, true), None);

    let (error, new_node) = harness.frame_with(held(to), |editor| {
        (editor.candidate_error(), editor.query_new_node())
    });
    assert_eq!(error, Some(ValidationError::IncompatibleDirection));
    assert_eq!(new_node.map(|c| c.kind().clone()), Some(ChangeKind::NewNode { pin: p(3) }));

    let rejected = harness.editor.style().color(StyleColor::LinkRejected);
    assert!(hint_colors(&harness).contains(&rejected));
}

#[test]
fn test_rejected_link_is_not_created() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_B);

    assert!(drag_link(&mut harness, from, to, false).is_some());
    let rejected = harness.editor.style().color(StyleColor::LinkRejected);
    assert_eq!(hint_colors(&harness), vec![rejected]);

    harness.frame_with(released(to), |editor| {
        let change = editor.query_new_link().expect("candidate on release");
        editor.reject_new_item(&change);
    });

    assert_eq!(harness.editor.gesture(), GestureKind::Idle);
    assert_eq!(harness.editor.registry().link_count(), 0);
    assert!(harness.editor.take_diagnostics().is_empty());
}

#[test]
fn test_link_dropped_on_empty_canvas_offers_new_node() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let empty = Vec2::new(600.0, 500.0);

    assert_eq!(drag_link(&mut harness, from, empty, true), None);

    let committed = harness.frame_with(released(empty), |editor| {
        assert!(editor.query_new_link().is_none());
        let change = editor.query_new_node().expect("new node offered");
        assert_eq!(change.kind(), &ChangeKind::NewNode { pin: p(3) });
        editor.accept_new_item(&change)
    });

    assert!(committed);
    assert_eq!(harness.editor.gesture(), GestureKind::Idle);
}

#[test]
fn test_same_node_link_is_refused_by_default() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_A);

    assert_eq!(drag_link(&mut harness, from, to, true), None);
    let error = harness.frame_with(held(to), |editor| editor.candidate_error());
    assert_eq!(error, Some(ValidationError::SameNode));
}

#[test]
fn test_same_node_link_when_allowed() {
    let mut harness = EditorHarness::with_config(base_config().with_same_node_links(true));
    harness.links.clear();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_A);

    let offered = drag_link(&mut harness, from, to, true).expect("candidate");
    assert_eq!(offered.kind(), &ChangeKind::NewLink { start: p(3), end: p(2) });
}

#[test]
fn test_duplicate_link_is_refused_by_custom_validator() {
    let mut harness = EditorHarness::new();
    harness.editor.add_link_validator(NoDuplicatesValidator);
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_B);

    assert_eq!(drag_link(&mut harness, from, to, true), None);
    let error = harness.frame_with(held(to), |editor| editor.candidate_error());
    assert_eq!(error, Some(ValidationError::DuplicateLink));
}

#[test]
fn test_change_from_an_earlier_frame_is_stale() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);
    let to = harness.input_pin_center(NODE_B);

    let old = drag_link(&mut harness, from, to, true).expect("candidate");
    let accepted = harness.frame_with(held(to), |editor| editor.accept_new_item(&old));

    assert!(!accepted);
    assert_eq!(
        harness.editor.take_diagnostics(),
        vec![Misuse::StaleChange { issued: old.frame(), current: old.frame() + 1 }]
    );
}

#[test]
fn test_dragging_from_pin_does_not_move_node() {
    let mut harness = EditorHarness::without_links();
    let from = harness.output_pin_center(NODE_A);

    harness.drag(from, Vec2::new(600.0, 500.0));

    assert_eq!(harness.editor.node_position(&n(NODE_A)), Some(Vec2::new(100.0, 100.0)));
    assert!(harness.saves.saves.borrow().is_empty());
}

proptest! {
    #[test]
    fn prop_normalize_link_orders_output_first(a in 2u64..6, b in 2u64..6) {
        prop_assume!(a != b);
        let harness = EditorHarness::new();

        let normalized = harness.editor.normalize_link(&p(a), &p(b));
        // Even pin ids are inputs, odd ones outputs
        if a % 2 == b % 2 {
            prop_assert_eq!(normalized, None);
        } else {
            let (output, input) = if a % 2 == 1 { (a, b) } else { (b, a) };
            prop_assert_eq!(normalized, Some((p(output), p(input))));
        }
    }
}
