//! Frame-driver harness.
//!
//! Owns an editor plus the "application model" the host would keep (nodes
//! and links) and re-declares that model every frame, the way an
//! immediate-mode host does. Pointer helpers run one frame per input event.
//!
//! The default scene, at zoom 1 with no pan (canvas == screen):
//!
//! - Node A (id 1) at (100, 100), 150x100, input pin 2, output pin 3
//! - Node B (id 2) at (400, 200), 150x100, input pin 4, output pin 5
//! - Link 1 from pin 3 to pin 4
//!
//! Pins are 16x16 squares centered vertically on the node's left (input) and
//! right (output) edges.

#![allow(dead_code)]

use super::SaveTracker;
use blueprint_canvas::{
    Config, EditorContext, InputSnapshot, LinkId, Modifiers, MouseButton, NodeId, PinId, PinKind, Rect, Vec2,
};

pub const NODE_A: u64 = 1;
pub const NODE_B: u64 = 2;
pub const LINK_AB: u64 = 1;
pub const PIN_SIZE: f32 = 16.0;

pub fn node_size() -> Vec2 {
    Vec2::new(150.0, 100.0)
}

/// Input pins are `node_id * 2`.
pub fn input_pin(node: u64) -> u64 {
    node * 2
}

/// Output pins are `node_id * 2 + 1`.
pub fn output_pin(node: u64) -> u64 {
    node * 2 + 1
}

pub fn n(id: u64) -> NodeId<u64> {
    NodeId::new(id)
}

pub fn p(id: u64) -> PinId<u64> {
    PinId::new(id)
}

pub fn l(id: u64) -> LinkId<u64> {
    LinkId::new(id)
}

/// One node of the application model.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: u64,
    /// `Some` declares a group of that size without pins.
    pub group: Option<Vec2>,
}

impl NodeSpec {
    pub fn node(id: u64) -> Self {
        Self { id, group: None }
    }

    pub fn group(id: u64, size: Vec2) -> Self {
        Self { id, group: Some(size) }
    }
}

pub struct EditorHarness {
    pub editor: EditorContext,
    pub nodes: Vec<NodeSpec>,
    /// (link id, start pin, end pin)
    pub links: Vec<(u64, u64, u64)>,
    pub saves: SaveTracker,
    pub viewport: Vec2,
}

/// Config used by every harness: no node padding, so node size equals the
/// declared content size.
pub fn base_config() -> Config {
    let mut config = Config::default();
    config.style.node_padding = [0.0; 4];
    config
}

impl EditorHarness {
    /// The default two-node scene with one link.
    pub fn new() -> Self {
        Self::with_scene(
            base_config(),
            vec![NodeSpec::node(NODE_A), NodeSpec::node(NODE_B)],
            vec![(LINK_AB, output_pin(NODE_A), input_pin(NODE_B))],
            &[(NODE_A, Vec2::new(100.0, 100.0)), (NODE_B, Vec2::new(400.0, 200.0))],
        )
    }

    /// The default scene without the link.
    pub fn without_links() -> Self {
        let mut harness = Self::new();
        harness.links.clear();
        harness.frame(InputSnapshot::default());
        harness.saves.clear();
        harness
    }

    /// The default scene with a custom config.
    pub fn with_config(config: Config) -> Self {
        Self::with_scene(
            config,
            vec![NodeSpec::node(NODE_A), NodeSpec::node(NODE_B)],
            vec![(LINK_AB, output_pin(NODE_A), input_pin(NODE_B))],
            &[(NODE_A, Vec2::new(100.0, 100.0)), (NODE_B, Vec2::new(400.0, 200.0))],
        )
    }

    /// Build an editor for `nodes` and `links`, place nodes at `positions`
    /// and run one frame. Recorded saves are cleared afterwards.
    pub fn with_scene(
        config: Config,
        nodes: Vec<NodeSpec>,
        links: Vec<(u64, u64, u64)>,
        positions: &[(u64, Vec2)],
    ) -> Self {
        let saves = SaveTracker::new();
        let editor = EditorContext::new(saves.install(config));
        let mut harness = Self {
            editor,
            nodes,
            links,
            saves,
            viewport: Vec2::new(800.0, 600.0),
        };
        for (id, position) in positions {
            harness.editor.set_node_position(&n(*id), *position);
        }
        harness.frame(InputSnapshot::default());
        harness.saves.clear();
        harness
    }

    fn declare(&mut self) {
        let size = node_size();
        for node in &self.nodes {
            self.editor.begin_node(n(node.id));
            if let Some(group) = node.group {
                self.editor.group(group);
                self.editor.end_node(Vec2::ZERO);
                continue;
            }
            let pin_y = (size.y - PIN_SIZE) / 2.0;
            self.editor.begin_pin(p(input_pin(node.id)), PinKind::Input);
            self.editor
                .end_pin(Rect::from_min_size(Vec2::new(0.0, pin_y), Vec2::splat(PIN_SIZE)));
            self.editor.begin_pin(p(output_pin(node.id)), PinKind::Output);
            self.editor
                .end_pin(Rect::from_min_size(Vec2::new(size.x - PIN_SIZE, pin_y), Vec2::splat(PIN_SIZE)));
            self.editor.end_node(size);
        }
        for (id, start, end) in &self.links {
            self.editor.link(l(*id), p(*start), p(*end));
        }
    }

    /// Run one frame with `input`.
    pub fn frame(&mut self, input: InputSnapshot) {
        self.frame_with(input, |_| ());
    }

    /// Run one frame with `input`; `f` runs after the scene is declared and
    /// before the frame ends.
    pub fn frame_with<R>(&mut self, input: InputSnapshot, f: impl FnOnce(&mut EditorContext) -> R) -> R {
        self.editor.begin_frame(input, self.viewport);
        self.declare();
        let result = f(&mut self.editor);
        self.editor.end_frame();
        result
    }

    /// Remove a node from the application model (and its links).
    pub fn remove_node(&mut self, id: u64) {
        self.nodes.retain(|node| node.id != id);
        let pins = [input_pin(id), output_pin(id)];
        self.links
            .retain(|(_, start, end)| !pins.contains(start) && !pins.contains(end));
    }

    pub fn remove_link(&mut self, id: u64) {
        self.links.retain(|(link, _, _)| *link != id);
    }

    // === Pointer helpers, one frame each ===

    pub fn press(&mut self, at: Vec2) {
        self.frame(InputSnapshot::new(at).with_press(MouseButton::Primary));
    }

    pub fn move_to(&mut self, at: Vec2) {
        self.frame(InputSnapshot::new(at).with_button_down(MouseButton::Primary));
    }

    pub fn release(&mut self, at: Vec2) {
        self.frame(InputSnapshot::new(at).with_release(MouseButton::Primary));
    }

    pub fn click(&mut self, at: Vec2) {
        self.press(at);
        self.release(at);
    }

    pub fn click_with(&mut self, at: Vec2, modifiers: Modifiers) {
        self.frame(InputSnapshot::new(at).with_press(MouseButton::Primary).with_modifiers(modifiers));
        self.frame(InputSnapshot::new(at).with_release(MouseButton::Primary).with_modifiers(modifiers));
    }

    pub fn drag(&mut self, from: Vec2, to: Vec2) {
        self.press(from);
        self.move_to(to);
        self.release(to);
    }

    pub fn drag_with(&mut self, from: Vec2, to: Vec2, modifiers: Modifiers) {
        self.frame(InputSnapshot::new(from).with_press(MouseButton::Primary).with_modifiers(modifiers));
        self.frame(InputSnapshot::new(to).with_button_down(MouseButton::Primary).with_modifiers(modifiers));
        self.frame(InputSnapshot::new(to).with_release(MouseButton::Primary).with_modifiers(modifiers));
    }

    pub fn secondary_click(&mut self, at: Vec2) {
        self.frame(InputSnapshot::new(at).with_press(MouseButton::Secondary));
        self.frame(InputSnapshot::new(at).with_release(MouseButton::Secondary));
    }

    // === Scene geometry (screen space at the default view) ===

    /// Center of a node's input pin.
    pub fn input_pin_center(&self, node: u64) -> Vec2 {
        self.editor
            .pin_screen_rect(&p(input_pin(node)))
            .expect("input pin declared")
            .center()
    }

    pub fn output_pin_center(&self, node: u64) -> Vec2 {
        self.editor
            .pin_screen_rect(&p(output_pin(node)))
            .expect("output pin declared")
            .center()
    }

    /// A point on the node body away from its pins.
    pub fn node_body(&self, node: u64) -> Vec2 {
        let rect = self.editor.node_screen_rect(&n(node)).expect("node declared");
        rect.min + Vec2::new(rect.width() / 2.0, 20.0)
    }
}
