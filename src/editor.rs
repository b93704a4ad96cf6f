//! The per-editor context object and its public API.
//!
//! An [`EditorContext`] is driven once per frame:
//!
//! ```
//! use blueprint_canvas::{Config, EditorContext, InputSnapshot, LinkId, NodeId, PinId, PinKind, Rect, Vec2};
//!
//! let mut editor: EditorContext = EditorContext::new(Config::default());
//!
//! editor.begin_frame(InputSnapshot::new(Vec2::ZERO), Vec2::new(800.0, 600.0));
//! editor.begin_node(NodeId::new(1));
//! editor.begin_pin(PinId::new(10), PinKind::Output);
//! editor.end_pin(Rect::from_min_size(Vec2::new(92.0, 20.0), Vec2::new(8.0, 8.0)));
//! editor.end_node(Vec2::new(100.0, 50.0));
//! editor.begin_node(NodeId::new(2));
//! editor.begin_pin(PinId::new(20), PinKind::Input);
//! editor.end_pin(Rect::from_min_size(Vec2::new(0.0, 20.0), Vec2::new(8.0, 8.0)));
//! editor.end_node(Vec2::new(100.0, 50.0));
//! editor.link(LinkId::new(1), PinId::new(10), PinId::new(20));
//!
//! if let Some(change) = editor.query_new_link() {
//!     // add the link to the application model, then
//!     editor.accept_new_item(&change);
//! }
//! editor.end_frame();
//!
//! assert!(editor.take_diagnostics().is_empty());
//! ```
//!
//! Declarations (`begin_node` .. `end_node`, `begin_pin` .. `end_pin`,
//! `link`) keep objects alive; anything not declared in a frame is dropped at
//! [`end_frame`](EditorContext::end_frame). Pointer input is resolved the
//! first time an interaction query runs in a frame (or at `end_frame`), so
//! declare everything before asking what the user did.

use std::collections::BTreeMap;

use slint::{Color, VecModel};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::draw::{DrawChannel, DrawList};
use crate::error::Misuse;
use crate::geometry::{Rect, Vec2, ViewTransform};
use crate::grid::grid_lines;
use crate::id::{LinkId, NodeId, ObjectKey, PinId, PinKind};
use crate::input::InputSnapshot;
use crate::interaction::{ContextMenu, GestureKind, HitTarget, Interaction, InteractionEnv, PendingChange};
use crate::path::CubicBezier;
use crate::registry::{ObjectRegistry, PinPivot};
use crate::selection::{Selectable, SelectionManager};
use crate::settings::{EditorSettings, NodeSettings, SaveReasonFlags, SettingsBridge, ViewSettings};
use crate::style::{Style, StyleColor, StyleStack, StyleVar};
use crate::validation::{normalize_link, BasicLinkValidator, CompositeValidator, LinkValidator, ValidationError};
use crate::view::ViewController;

/// Extra screen pixels a link border extends past the link itself.
const LINK_BORDER_WIDTH: f32 = 3.0;

fn selectable_to_string<K: ObjectKey>(item: &Selectable<K>) -> String {
    match item {
        Selectable::Node(id) => format!("node:{}", id.as_string()),
        Selectable::Link(id) => format!("link:{}", id.as_string()),
    }
}

fn selectable_from_string<K: ObjectKey>(text: &str) -> Option<Selectable<K>> {
    match text.split_once(':')? {
        ("node", id) => NodeId::from_string(id).map(Selectable::Node),
        ("link", id) => LinkId::from_string(id).map(Selectable::Link),
        _ => None,
    }
}

/// One node editor: object registry, view, selection, gestures, style and
/// persistence for a single canvas. Use one instance per canvas.
pub struct EditorContext<K = u64> {
    config: Config,
    registry: ObjectRegistry<K>,
    selection: SelectionManager<K>,
    view: ViewController,
    styles: StyleStack,
    bridge: SettingsBridge,
    validators: CompositeValidator<K>,
    interaction: Interaction<K>,

    /// Last known settings of every node, including nodes not declared yet.
    persisted: BTreeMap<String, NodeSettings>,
    dirty: SaveReasonFlags,
    dirty_nodes: BTreeMap<String, SaveReasonFlags>,
    saved_selection: u64,

    input: InputSnapshot,
    in_frame: bool,
    input_processed: bool,
    current_node: Option<NodeId<K>>,
    current_pin: Option<PinId<K>>,

    host_draw: DrawList,
    output: DrawList,
    diagnostics: Vec<Misuse>,
}

impl<K: ObjectKey> EditorContext<K> {
    /// Create an editor. Persisted settings are requested from the load hook
    /// once, here.
    pub fn new(mut config: Config) -> Self {
        let bridge = SettingsBridge::from_config(&mut config);
        let view = ViewController::new(config.zoom_limits, config.zoom_levels.clone());
        let styles = StyleStack::new(config.style.clone());
        let validators = CompositeValidator::new().add(BasicLinkValidator::new(config.allow_same_node_links));

        let mut editor = Self {
            config,
            registry: ObjectRegistry::new(),
            selection: SelectionManager::new(),
            view,
            styles,
            bridge,
            validators,
            interaction: Interaction::new(),
            persisted: BTreeMap::new(),
            dirty: SaveReasonFlags::empty(),
            dirty_nodes: BTreeMap::new(),
            saved_selection: 0,
            input: InputSnapshot::default(),
            in_frame: false,
            input_processed: false,
            current_node: None,
            current_pin: None,
            host_draw: DrawList::new(),
            output: DrawList::new(),
            diagnostics: Vec::new(),
        };
        editor.restore_settings();
        editor
    }

    fn restore_settings(&mut self) {
        let Some(settings) = self.bridge.load() else {
            return;
        };
        let [x, y] = settings.view.pan;
        self.view.set_view(Vec2::new(x, y), settings.view.zoom);
        self.view.take_changed();

        let selection: Vec<Selectable<K>> = settings
            .selection
            .iter()
            .filter_map(|s| selectable_from_string(s))
            .collect();
        self.selection.replace_selection(selection);
        self.selection.has_selection_changed();
        self.saved_selection = self.selection.revision();

        self.persisted = settings.nodes;
    }

    fn restore_node(&mut self, id: &NodeId<K>) {
        let key = id.as_string();
        let stored = match self.persisted.get(&key) {
            Some(settings) => Some(settings.clone()),
            None => self.bridge.load_node(&key),
        };
        let (Some(settings), Some(node)) = (stored, self.registry.node_mut(id)) else {
            return;
        };
        node.position = settings.location();
        if let Some([w, h]) = settings.size {
            node.size = Vec2::new(w, h);
        }
        if let Some([w, h]) = settings.group_size {
            node.group_size = Some(Vec2::new(w, h));
        }
        trace!(node = %key, "node restored from settings");
    }

    fn misuse(&mut self, misuse: Misuse) {
        warn!(%misuse, "editor misuse");
        self.diagnostics.push(misuse);
    }

    fn require_frame(&mut self, call: &'static str) -> bool {
        if !self.in_frame {
            self.misuse(Misuse::OutsideFrame { call });
        }
        self.in_frame
    }

    fn mark_node_dirty(&mut self, id: &NodeId<K>, reason: SaveReasonFlags) {
        *self.dirty_nodes.entry(id.as_string()).or_default() |= reason;
        self.dirty |= reason;
    }

    /// Conditions reported since the last call. Every entry was also logged
    /// at `warn` level when it happened.
    pub fn take_diagnostics(&mut self) -> Vec<Misuse> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the object registry.
    pub fn registry(&self) -> &ObjectRegistry<K> {
        &self.registry
    }

    // === Frame ===

    /// Open a frame. `viewport` is the canvas widget size in screen pixels.
    pub fn begin_frame(&mut self, input: InputSnapshot, viewport: Vec2) {
        if self.in_frame {
            self.misuse(Misuse::NestedBegin);
            return;
        }
        self.in_frame = true;
        self.input_processed = false;

        let frame = self.registry.begin_frame();
        self.interaction.new_frame(frame);
        self.host_draw.clear();

        self.view.set_viewport(viewport);
        self.view.set_default_duration(self.styles.style().scroll_duration);
        self.view.advance(input.delta_time);
        self.input = input;
        trace!(frame, "frame started");
    }

    /// Resolve this frame's pointer input against the declared geometry.
    fn process_input(&mut self) {
        if !self.in_frame || self.input_processed {
            return;
        }
        self.input_processed = true;
        let mut env = InteractionEnv {
            registry: &mut self.registry,
            selection: &mut self.selection,
            view: &mut self.view,
            config: &self.config,
            style: self.styles.style(),
            validator: &self.validators,
        };
        self.interaction.process(&self.input, &mut env);
    }

    /// Close the frame: finish gestures, drop undeclared objects, check style
    /// balance, save changed settings and compose the draw output.
    pub fn end_frame(&mut self) {
        if !self.in_frame {
            self.misuse(Misuse::OutsideFrame { call: "end_frame" });
            return;
        }
        if let Some(pin) = self.current_pin.take() {
            self.misuse(Misuse::UnclosedPin(pin.as_string()));
        }
        if let Some(node) = self.current_node.take() {
            self.misuse(Misuse::UnclosedNode(node.as_string()));
        }

        self.process_input();
        self.compose();

        for (id, reason) in self.interaction.take_dirty() {
            self.mark_node_dirty(&id, reason);
        }
        self.interaction.end_frame();

        let report = self.registry.prune();
        if !report.is_empty() {
            debug!(
                nodes = report.nodes.len(),
                pins = report.pins.len(),
                links = report.links.len(),
                "pruned undeclared objects"
            );
        }
        let registry = &self.registry;
        self.selection.retain(|item| match item {
            Selectable::Node(id) => registry.contains_node(id),
            Selectable::Link(id) => registry.link(id).is_some(),
        });

        if let Some(misuse) = self.styles.unwind() {
            self.misuse(misuse);
        }

        self.flush_settings();
        self.in_frame = false;
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    // === Declarations ===

    /// Open the node bracket for `id`. Pins are declared inside it.
    ///
    /// The node keeps the padding, rounding, border widths and colors in
    /// effect at this call; pushes made after it do not restyle the node.
    pub fn begin_node(&mut self, id: NodeId<K>) {
        if !self.require_frame("begin_node") {
            return;
        }
        if !id.is_valid() {
            self.misuse(Misuse::InvalidId { kind: "node" });
            return;
        }
        if let Some(open) = &self.current_node {
            let misuse = Misuse::NestedNode { id: id.as_string(), open: open.as_string() };
            self.misuse(misuse);
            return;
        }

        let is_new = !self.registry.contains_node(&id);
        self.registry.touch_node(&id).style = self.styles.style().node_style();
        if is_new {
            self.restore_node(&id);
        }
        self.current_node = Some(id);
    }

    /// Screen position where the open node's content starts (inside the
    /// node padding).
    pub fn node_content_origin(&self) -> Option<Vec2> {
        let node = self.registry.node(self.current_node.as_ref()?)?;
        let [left, top, _, _] = node.style.padding;
        Some(self.view.transform().canvas_to_screen(node.position + Vec2::new(left, top)))
    }

    /// Mark the open node as a group of `size` canvas units. The size is only
    /// taken the first time; afterwards the user resizes the group.
    pub fn group(&mut self, size: Vec2) {
        let Some(id) = self.current_node.clone() else {
            self.misuse(Misuse::OutsideNode { call: "group" });
            return;
        };
        if let Some(node) = self.registry.node_mut(&id) {
            node.group_size.get_or_insert(size);
        }
    }

    /// Close the open node. `content_size` is the size of what the host laid
    /// out inside it, in canvas units; node padding is added around it.
    pub fn end_node(&mut self, content_size: Vec2) {
        let Some(id) = self.current_node.take() else {
            self.misuse(Misuse::OutsideNode { call: "end_node" });
            return;
        };
        if let Some(pin) = self.current_pin.take() {
            self.misuse(Misuse::UnclosedPin(pin.as_string()));
        }

        if let Some(node) = self.registry.node_mut(&id) {
            let [left, top, right, bottom] = node.style.padding;
            let padded = content_size + Vec2::new(left + right, top + bottom);
            node.size = match node.group_size {
                Some(group) => padded.max(group),
                None => padded,
            };
        }
    }

    /// Open a pin of the open node. The pivot, link direction and pin look
    /// are taken from the current style.
    pub fn begin_pin(&mut self, id: PinId<K>, kind: PinKind) {
        if !self.require_frame("begin_pin") {
            return;
        }
        if !id.is_valid() {
            self.misuse(Misuse::InvalidId { kind: "pin" });
            return;
        }
        let Some(node) = self.current_node.clone() else {
            self.misuse(Misuse::OutsideNode { call: "begin_pin" });
            return;
        };
        if let Some(open) = &self.current_pin {
            let misuse = Misuse::NestedPin { id: id.as_string(), open: open.as_string() };
            self.misuse(misuse);
            return;
        }

        let style = self.styles.style();
        let pivot = PinPivot {
            alignment: style.pivot_alignment,
            size: style.pivot_size,
            scale: style.pivot_scale,
            direction: match kind {
                PinKind::Output => style.source_direction,
                PinKind::Input => style.target_direction,
            },
        };
        let pin_style = style.pin_style();
        let pin = self.registry.touch_pin(&id, &node, kind);
        pin.pivot = pivot;
        pin.style = pin_style;
        self.current_pin = Some(id);
    }

    /// Close the open pin. `rect` is relative to the node's top-left corner,
    /// in canvas units.
    pub fn end_pin(&mut self, rect: Rect) {
        let Some(id) = self.current_pin.take() else {
            self.misuse(Misuse::OutsidePin);
            return;
        };
        if let Some(pin) = self.registry.pin_mut(&id) {
            pin.rect = rect;
        }
    }

    /// Declare a link between two pins. Returns false when the declaration
    /// was refused.
    pub fn link(&mut self, id: LinkId<K>, start: PinId<K>, end: PinId<K>) -> bool {
        self.declare_link(id, start, end, None, 0.0)
    }

    /// Like [`link`](Self::link) with an explicit color and thickness.
    pub fn link_with_style(
        &mut self,
        id: LinkId<K>,
        start: PinId<K>,
        end: PinId<K>,
        color: Color,
        thickness: f32,
    ) -> bool {
        self.declare_link(id, start, end, Some(color), thickness)
    }

    fn declare_link(
        &mut self,
        id: LinkId<K>,
        start: PinId<K>,
        end: PinId<K>,
        color: Option<Color>,
        thickness: f32,
    ) -> bool {
        if !self.require_frame("link") {
            return false;
        }
        if !id.is_valid() {
            self.misuse(Misuse::InvalidId { kind: "link" });
            return false;
        }
        if !start.is_valid() || !end.is_valid() {
            self.misuse(Misuse::InvalidId { kind: "pin" });
            return false;
        }
        if start == end {
            self.misuse(Misuse::SelfLink { link: id.as_string(), pin: start.as_string() });
            return false;
        }
        if !self.config.allow_same_node_links {
            if let (Some(a), Some(b)) = (self.registry.pin(&start), self.registry.pin(&end)) {
                if a.node == b.node {
                    let node = a.node.as_string();
                    self.misuse(Misuse::SameNodeLink { link: id.as_string(), node });
                    return false;
                }
            }
        }

        let style = self.styles.style();
        let color = color.unwrap_or_else(|| style.color(StyleColor::Link));
        let thickness = if thickness > 0.0 { thickness } else { style.link_thickness };
        let link = self.registry.touch_link(&id, &start, &end);
        link.color = Some(color);
        link.thickness = thickness;
        true
    }

    // === Nodes, pins and links ===

    /// Move a node. Nodes not declared yet take the position when they first
    /// appear.
    pub fn set_node_position(&mut self, id: &NodeId<K>, position: Vec2) {
        match self.registry.node_mut(id) {
            Some(node) => node.position = position,
            None => {
                self.persisted
                    .entry(id.as_string())
                    .and_modify(|s| s.location = [position.x, position.y])
                    .or_insert(NodeSettings { location: [position.x, position.y], size: None, group_size: None });
            }
        }
        self.mark_node_dirty(id, SaveReasonFlags::POSITION);
    }

    pub fn node_position(&self, id: &NodeId<K>) -> Option<Vec2> {
        self.registry.node(id).map(|n| n.position)
    }

    pub fn node_size(&self, id: &NodeId<K>) -> Option<Vec2> {
        self.registry.node(id).map(|n| n.size)
    }

    pub fn node_screen_rect(&self, id: &NodeId<K>) -> Option<Rect> {
        let node = self.registry.node(id)?;
        Some(self.view.transform().canvas_rect_to_screen(&node.bounds()))
    }

    pub fn has_node(&self, id: &NodeId<K>) -> bool {
        self.registry.contains_node(id)
    }

    pub fn node_count(&self) -> usize {
        self.registry.node_count()
    }

    pub fn set_group_size(&mut self, id: &NodeId<K>, size: Vec2) {
        let Some(node) = self.registry.node_mut(id) else {
            self.misuse(Misuse::UnknownObject { kind: "node", id: id.as_string() });
            return;
        };
        node.group_size = Some(size);
        node.size = node.size.max(size);
        self.mark_node_dirty(id, SaveReasonFlags::SIZE);
    }

    pub fn group_size(&self, id: &NodeId<K>) -> Option<Vec2> {
        self.registry.node(id)?.group_size
    }

    pub fn set_node_z_position(&mut self, id: &NodeId<K>, z: i32) {
        self.registry.set_z(id, z);
    }

    pub fn node_z_position(&self, id: &NodeId<K>) -> Option<i32> {
        self.registry.node(id).map(|n| n.z)
    }

    /// Node ids back to front.
    pub fn ordered_node_ids(&self) -> Vec<NodeId<K>> {
        self.registry.ordered_node_ids()
    }

    pub fn pin_screen_rect(&self, id: &PinId<K>) -> Option<Rect> {
        let pin = self.registry.pin(id)?;
        let node = self.registry.node(&pin.node)?;
        Some(self.view.transform().canvas_rect_to_screen(&pin.canvas_rect(node.position)))
    }

    /// Screen-space curve of a declared link.
    pub fn link_screen_curve(&self, id: &LinkId<K>) -> Option<CubicBezier> {
        let view = self.view.transform();
        let curve = self.registry.link_curve(id, self.styles.style().link_strength)?;
        Some(curve.map(|p| view.canvas_to_screen(p)))
    }

    pub fn link_pins(&self, id: &LinkId<K>) -> Option<(PinId<K>, PinId<K>)> {
        let link = self.registry.link(id)?;
        Some((link.start.clone(), link.end.clone()))
    }

    pub fn node_has_any_links(&self, id: &NodeId<K>) -> bool {
        !self.registry.links_of_node(id).is_empty()
    }

    pub fn pin_has_any_links(&self, id: &PinId<K>) -> bool {
        !self.registry.links_of_pin(id).is_empty()
    }

    /// Queue every link of a node for deletion. The links are offered through
    /// [`query_deleted_link`](Self::query_deleted_link) in the next frame.
    pub fn break_node_links(&mut self, id: &NodeId<K>) -> usize {
        let links = self.registry.links_of_node(id);
        for link in &links {
            self.interaction.request_delete_link(link.clone());
        }
        links.len()
    }

    pub fn break_pin_links(&mut self, id: &PinId<K>) -> usize {
        let links = self.registry.links_of_pin(id);
        for link in &links {
            self.interaction.request_delete_link(link.clone());
        }
        links.len()
    }

    /// Queue a node (and its links) for deletion in the next frame.
    pub fn delete_node(&mut self, id: &NodeId<K>) -> bool {
        if !self.registry.contains_node(id) {
            self.misuse(Misuse::UnknownObject { kind: "node", id: id.as_string() });
            return false;
        }
        self.interaction.request_delete_node(id.clone());
        true
    }

    pub fn delete_link(&mut self, id: &LinkId<K>) -> bool {
        if self.registry.link(id).is_none() {
            self.misuse(Misuse::UnknownObject { kind: "link", id: id.as_string() });
            return false;
        }
        self.interaction.request_delete_link(id.clone());
        true
    }

    /// Order two pins as (output, input).
    pub fn normalize_link(&self, a: &PinId<K>, b: &PinId<K>) -> Option<(PinId<K>, PinId<K>)> {
        normalize_link(a, b, &self.registry)
    }

    /// Register an extra rule for link candidates, run after the built-in
    /// direction and same-node rules.
    pub fn add_link_validator<V: LinkValidator<K> + 'static>(&mut self, validator: V) {
        self.validators.push(Box::new(validator));
    }

    // === Selection ===

    pub fn select_node(&mut self, id: &NodeId<K>, append: bool) {
        self.selection.select(Selectable::Node(id.clone()), append);
    }

    pub fn select_link(&mut self, id: &LinkId<K>, append: bool) {
        self.selection.select(Selectable::Link(id.clone()), append);
    }

    pub fn deselect_node(&mut self, id: &NodeId<K>) {
        self.selection.deselect(&Selectable::Node(id.clone()));
    }

    pub fn deselect_link(&mut self, id: &LinkId<K>) {
        self.selection.deselect(&Selectable::Link(id.clone()));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_node_selected(&mut self, id: &NodeId<K>) -> bool {
        self.process_input();
        self.selection.contains_node(id)
    }

    pub fn is_link_selected(&mut self, id: &LinkId<K>) -> bool {
        self.process_input();
        self.selection.contains_link(id)
    }

    pub fn selected_nodes(&mut self) -> Vec<NodeId<K>> {
        self.process_input();
        self.selection.selected_nodes()
    }

    pub fn selected_links(&mut self) -> Vec<LinkId<K>> {
        self.process_input();
        self.selection.selected_links()
    }

    pub fn selected_object_count(&mut self) -> usize {
        self.process_input();
        self.selection.len()
    }

    /// True once after the selection changed.
    pub fn has_selection_changed(&mut self) -> bool {
        self.process_input();
        self.selection.has_selection_changed()
    }

    /// Mirror the selected node ids into a Slint model.
    pub fn sync_selection_to_model(&self, model: &VecModel<NodeId<K>>) {
        self.selection.sync_nodes_to_model(model);
    }

    // === View ===

    pub fn set_view(&mut self, pan: Vec2, zoom: f32) {
        self.view.set_view(pan, zoom);
    }

    pub fn transform(&self) -> ViewTransform {
        self.view.transform()
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom()
    }

    pub fn pan(&self) -> Vec2 {
        self.view.pan()
    }

    pub fn canvas_to_screen(&self, point: Vec2) -> Vec2 {
        self.view.transform().canvas_to_screen(point)
    }

    pub fn screen_to_canvas(&self, point: Vec2) -> Vec2 {
        self.view.transform().screen_to_canvas(point)
    }

    pub fn visible_canvas_rect(&self) -> Rect {
        self.view.visible_canvas_rect()
    }

    /// Fit all nodes into the viewport. `duration < 0` uses the style's
    /// scroll duration, `0` jumps.
    pub fn navigate_to_content(&mut self, duration: f32) {
        if let Some(bounds) = self.registry.content_bounds(|_| true) {
            self.view.navigate_to_rect(bounds, duration, true, self.config.navigate_margin);
        }
    }

    /// Fit the selected nodes, or all content when nothing is selected.
    /// Without `zoom_in` the view only ever zooms out.
    pub fn navigate_to_selection(&mut self, zoom_in: bool, duration: f32) {
        let mut env = InteractionEnv {
            registry: &mut self.registry,
            selection: &mut self.selection,
            view: &mut self.view,
            config: &self.config,
            style: self.styles.style(),
            validator: &self.validators,
        };
        crate::interaction::navigate_to_selection(&mut env, zoom_in, duration);
    }

    /// Center the view on a node without changing zoom.
    pub fn center_node_on_screen(&mut self, id: &NodeId<K>) {
        match self.registry.node(id).map(|n| n.bounds().center()) {
            Some(center) => self.view.center_on(center, 0.0),
            None => self.misuse(Misuse::UnknownObject { kind: "node", id: id.as_string() }),
        }
    }

    pub fn is_animating(&self) -> bool {
        self.view.is_animating()
    }

    /// Freeze interaction (nestable).
    ///
    /// Every call cancels the active gesture, nested or not: a drag in
    /// progress snaps back and a link draft is dropped. Hosts that open an
    /// overlay every frame should suspend only while the overlay is shown,
    /// not wrap each frame in `suspend`/`resume`, or no drag survives.
    pub fn suspend(&mut self) {
        self.view.suspend();
        self.interaction.cancel(&mut self.registry);
    }

    pub fn resume(&mut self) {
        if !self.view.resume() {
            self.misuse(Misuse::ResumeWithoutSuspend);
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.view.is_suspended()
    }

    // === Interaction queries ===

    pub fn gesture(&mut self) -> GestureKind {
        self.process_input();
        self.interaction.kind()
    }

    /// True while any gesture other than hovering is in progress.
    pub fn is_active(&mut self) -> bool {
        self.gesture() != GestureKind::Idle
    }

    pub fn hovered_node(&mut self) -> Option<NodeId<K>> {
        self.process_input();
        match self.interaction.hovered() {
            HitTarget::Node(id) | HitTarget::GroupResize(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn hovered_pin(&mut self) -> Option<PinId<K>> {
        self.process_input();
        match self.interaction.hovered() {
            HitTarget::Pin(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn hovered_link(&mut self) -> Option<LinkId<K>> {
        self.process_input();
        match self.interaction.hovered() {
            HitTarget::Link(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn double_clicked_node(&mut self) -> Option<NodeId<K>> {
        self.process_input();
        match self.interaction.double_clicked() {
            Some(HitTarget::Node(id) | HitTarget::GroupResize(id)) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn double_clicked_pin(&mut self) -> Option<PinId<K>> {
        self.process_input();
        match self.interaction.double_clicked() {
            Some(HitTarget::Pin(id)) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn double_clicked_link(&mut self) -> Option<LinkId<K>> {
        self.process_input();
        match self.interaction.double_clicked() {
            Some(HitTarget::Link(id)) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn background_clicked(&mut self) -> bool {
        self.process_input();
        matches!(self.interaction.clicked(), Some(HitTarget::Background))
    }

    pub fn background_double_clicked(&mut self) -> bool {
        self.process_input();
        matches!(self.interaction.double_clicked(), Some(HitTarget::Background))
    }

    /// Object a context menu was requested for this frame.
    pub fn context_menu(&mut self) -> Option<ContextMenu<K>> {
        self.process_input();
        self.interaction.context_menu().cloned()
    }

    /// Why the pin under the dragged link cannot be connected.
    pub fn candidate_error(&mut self) -> Option<ValidationError> {
        self.process_input();
        self.interaction.candidate_error().cloned()
    }

    // === Link creation ===

    /// The link the user is about to create, `start` being the output pin.
    /// Answer with [`accept_new_item`](Self::accept_new_item) or
    /// [`reject_new_item`](Self::reject_new_item) every frame.
    pub fn query_new_link(&mut self) -> Option<PendingChange<K>> {
        self.process_input();
        self.interaction.query_new_link()
    }

    /// A link dragged from a pin onto empty canvas.
    pub fn query_new_node(&mut self) -> Option<PendingChange<K>> {
        self.process_input();
        self.interaction.query_new_node()
    }

    /// Returns true in the frame the user releases over the candidate; that
    /// is when the caller creates the link or node.
    pub fn accept_new_item(&mut self, change: &PendingChange<K>) -> bool {
        if !self.require_frame("accept_new_item") {
            return false;
        }
        match self.interaction.accept_new_item(change) {
            Ok(commit) => commit,
            Err(misuse) => {
                self.misuse(misuse);
                false
            }
        }
    }

    pub fn reject_new_item(&mut self, change: &PendingChange<K>) {
        if !self.require_frame("reject_new_item") {
            return;
        }
        if let Err(misuse) = self.interaction.reject_new_item(change) {
            self.misuse(misuse);
        }
    }

    // === Deletion ===

    /// Next link pending deletion. Links come before the nodes they belong to.
    pub fn query_deleted_link(&mut self) -> Option<PendingChange<K>> {
        self.process_input();
        self.interaction.query_deleted_link()
    }

    pub fn query_deleted_node(&mut self) -> Option<PendingChange<K>> {
        self.process_input();
        self.interaction.query_deleted_node()
    }

    /// Remove the item from the editor and the selection. Items neither
    /// accepted nor rejected are kept.
    pub fn accept_deleted_item(&mut self, change: &PendingChange<K>, delete_dependencies: bool) -> bool {
        if !self.require_frame("accept_deleted_item") {
            return false;
        }
        let result = self.interaction.accept_deleted_item(
            change,
            delete_dependencies,
            &mut self.registry,
            &mut self.selection,
        );
        match result {
            Ok(accepted) => accepted,
            Err(misuse) => {
                self.misuse(misuse);
                false
            }
        }
    }

    pub fn reject_deleted_item(&mut self, change: &PendingChange<K>) {
        if !self.require_frame("reject_deleted_item") {
            return;
        }
        if let Err(misuse) = self.interaction.reject_deleted_item(change) {
            self.misuse(misuse);
        }
    }

    // === Style ===

    pub fn style(&self) -> &Style {
        self.styles.style()
    }

    /// Base style edits; pushes made later in a frame are applied on top.
    pub fn style_mut(&mut self) -> &mut Style {
        self.styles.style_mut()
    }

    pub fn push_style_var(&mut self, var: StyleVar) {
        self.styles.push_var(var);
    }

    pub fn pop_style_var(&mut self, count: usize) {
        if let Err(misuse) = self.styles.pop_var(count) {
            self.misuse(misuse);
        }
    }

    pub fn push_style_color(&mut self, which: StyleColor, color: Color) {
        self.styles.push_color(which, color);
    }

    pub fn pop_style_color(&mut self, count: usize) {
        if let Err(misuse) = self.styles.pop_color(count) {
            self.misuse(misuse);
        }
    }

    // === Settings ===

    /// Request a save with the `USER` reason at the end of this frame.
    pub fn mark_settings_dirty(&mut self) {
        self.dirty |= SaveReasonFlags::USER;
    }

    /// Current persisted state of the editor.
    pub fn settings(&self) -> EditorSettings {
        let mut nodes = self.persisted.clone();
        for node in self.registry.live_nodes() {
            nodes.insert(node.id.as_string(), node_settings(node.position, node.size, node.group_size));
        }
        let pan = self.view.pan();
        EditorSettings {
            nodes,
            view: ViewSettings { pan: [pan.x, pan.y], zoom: self.view.zoom() },
            selection: self.selection.iter().map(selectable_to_string).collect(),
        }
    }

    fn flush_settings(&mut self) {
        if self.view.take_changed() {
            self.dirty |= SaveReasonFlags::NAVIGATION;
        }
        if self.selection.revision() != self.saved_selection {
            self.saved_selection = self.selection.revision();
            self.dirty |= SaveReasonFlags::SELECTION;
        }
        if self.dirty.is_empty() {
            return;
        }

        let reasons = std::mem::take(&mut self.dirty);
        let dirty_nodes: Vec<(String, SaveReasonFlags)> = std::mem::take(&mut self.dirty_nodes).into_iter().collect();
        let settings = self.settings();
        self.persisted = settings.nodes.clone();
        if !self.bridge.can_save() {
            return;
        }
        debug!(?reasons, nodes = dirty_nodes.len(), "saving settings");
        self.bridge.save(&settings, reasons, &dirty_nodes);
    }

    // === Drawing ===

    /// Host draw list for this frame. Commands pushed here are drawn after
    /// the editor's own commands of the same channel.
    pub fn draw_list_mut(&mut self) -> &mut DrawList {
        &mut self.host_draw
    }

    /// Everything to draw for the last finished frame, back to front.
    pub fn draw_output(&self) -> &DrawList {
        &self.output
    }

    fn compose(&mut self) {
        self.output.clear();
        let style = self.styles.style();
        let view = self.view.transform();
        let zoom = view.zoom;
        let registry = &self.registry;
        let selection = &self.selection;
        let hovered = self.interaction.hovered();
        let out = &mut self.output;

        let viewport = Rect::from_min_size(Vec2::ZERO, self.view.viewport());
        out.fill_rect(DrawChannel::Background, viewport, style.color(StyleColor::Background), 0.0);
        for (from, to) in grid_lines(viewport.size(), &view, style.grid_spacing) {
            out.line(DrawChannel::Grid, from, to, style.color(StyleColor::Grid), 1.0);
        }

        for node in registry.live_nodes() {
            let rect = view.canvas_rect_to_screen(&node.bounds());
            let is_hovered = matches!(hovered, HitTarget::Node(id) | HitTarget::GroupResize(id) if *id == node.id);
            let look = &node.style;
            let (border, width) = if selection.contains_node(&node.id) {
                (look.selected_border, look.selected_border_width)
            } else if is_hovered {
                (look.hovered_border, look.hovered_border_width)
            } else if node.is_group() {
                (look.group_border, look.group_border_width)
            } else {
                (look.border, look.border_width)
            };

            if node.is_group() {
                let rounding = look.group_rounding * zoom;
                out.fill_rect(DrawChannel::Groups, rect, look.group_background, rounding);
                out.stroke_rect(DrawChannel::Groups, rect, border, rounding, width);
            } else {
                let channel = DrawChannel::Node(node.z);
                let rounding = look.rounding * zoom;
                out.fill_rect(channel, rect, look.background, rounding);
                out.stroke_rect(channel, rect, border, rounding, width);
            }
        }

        for (pin, node) in registry.live_pins() {
            let channel = if node.is_group() { DrawChannel::Groups } else { DrawChannel::Node(node.z) };
            let rect = view.canvas_rect_to_screen(&pin.canvas_rect(node.position));
            let rounding = pin.style.rounding * zoom;
            if matches!(hovered, HitTarget::Pin(id) if *id == pin.id) {
                out.fill_rect(channel, rect, pin.style.fill, rounding);
            }
            out.stroke_rect(channel, rect, pin.style.border, rounding, pin.style.border_width);
        }

        let touches_selected_node = |pin: &PinId<K>| {
            registry
                .pin(pin)
                .map_or(false, |p| selection.contains_node(&p.node))
        };
        for link in registry.live_links() {
            let Some(curve) = registry.link_curve(&link.id, style.link_strength) else {
                continue;
            };
            let curve = curve.map(|p| view.canvas_to_screen(p));
            let base = if link.thickness > 0.0 { link.thickness } else { style.link_thickness };
            let thickness = base * zoom;

            let border = if selection.contains_link(&link.id) {
                Some(StyleColor::SelectedLinkBorder)
            } else if matches!(hovered, HitTarget::Link(id) if *id == link.id) {
                Some(StyleColor::HoveredLinkBorder)
            } else if style.highlight_connected_links
                && (touches_selected_node(&link.start) || touches_selected_node(&link.end))
            {
                Some(StyleColor::HighlightLinkBorder)
            } else {
                None
            };
            if let Some(border) = border {
                out.bezier(DrawChannel::Links, curve, style.color(border), thickness + LINK_BORDER_WIDTH * zoom);
            }
            let color = link.color.unwrap_or_else(|| style.color(StyleColor::Link));
            out.bezier(DrawChannel::Links, curve, color, thickness);
        }

        if let Some(rect) = self.interaction.selection_rect() {
            let rect = view.canvas_rect_to_screen(&rect);
            out.fill_rect(DrawChannel::Foreground, rect, style.color(StyleColor::NodeSelectionRect), 0.0);
            out.stroke_rect(DrawChannel::Foreground, rect, style.color(StyleColor::NodeSelectionRectBorder), 0.0, 1.0);
        }

        if let Some((source, pointer, candidate, verdict)) = self.interaction.link_draft() {
            let candidate_rect = candidate.and_then(|id| {
                let pin = registry.pin(id)?;
                let node = registry.node(&pin.node)?;
                Some((pin.anchor(node.position), pin.canvas_rect(node.position)))
            });
            let end = candidate_rect.map_or(pointer, |(anchor, _)| anchor);
            if let Some(curve) = registry.pin_to_point_curve(source, end, style.link_strength) {
                let color = match verdict {
                    Some(true) => style.color(StyleColor::LinkAccepted),
                    Some(false) => style.color(StyleColor::LinkRejected),
                    None => style.color(StyleColor::Link),
                };
                let curve = curve.map(|p| view.canvas_to_screen(p));
                out.bezier(DrawChannel::Hint, curve, color, style.link_thickness * zoom);
            }
            if let (Some(false), Some((_, rect))) = (verdict, candidate_rect) {
                let rect = view.canvas_rect_to_screen(&rect);
                let rejected = style.color(StyleColor::LinkRejected);
                out.stroke_rect(DrawChannel::Hint, rect, rejected, style.pin_rounding * zoom, 2.0);
            }
        }

        out.append(&mut self.host_draw);
    }
}

fn node_settings(position: Vec2, size: Vec2, group_size: Option<Vec2>) -> NodeSettings {
    NodeSettings {
        location: [position.x, position.y],
        size: (size != Vec2::ZERO).then_some([size.x, size.y]),
        group_size: group_size.map(|g| [g.x, g.y]),
    }
}
