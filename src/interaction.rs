//! Gesture recognition.
//!
//! One [`Interaction`] per editor turns the per-frame [`InputSnapshot`] into
//! gestures: node dragging, group resizing, click and rubber-band selection,
//! link creation, item deletion and panning. Exactly one gesture is active
//! at a time.
//!
//! Link creation and deletion never mutate the caller's model. They surface
//! [`PendingChange`] intents which the caller accepts or rejects in the same
//! frame.

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Misuse;
use crate::geometry::{Rect, Vec2, ViewTransform};
use crate::id::{LinkId, NodeId, ObjectKey, PinId};
use crate::input::{InputSnapshot, MouseButton};
use crate::registry::ObjectRegistry;
use crate::selection::{Selectable, SelectionManager};
use crate::settings::SaveReasonFlags;
use crate::style::Style;
use crate::validation::{normalize_link, LinkValidator, ValidationError, ValidationResult};
use crate::view::ViewController;

/// Smallest group size a resize can produce, in canvas units.
const MIN_GROUP_SIZE: f32 = 16.0;

/// What lies under a screen point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget<K> {
    Background,
    Node(NodeId<K>),
    /// The resize handle in the bottom-right corner of a group.
    GroupResize(NodeId<K>),
    Pin(PinId<K>),
    Link(LinkId<K>),
}

/// Object a context menu was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMenu<K> {
    Background,
    Node(NodeId<K>),
    Pin(PinId<K>),
    Link(LinkId<K>),
}

/// Public view of the active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    /// A button is down but has not moved past the drag threshold yet.
    Pressed,
    DraggingNodes,
    ResizingGroup,
    Selecting,
    CreatingLink,
    DeletingItems,
    Panning,
}

/// Intent the caller has to accept or reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind<K> {
    /// `start` is always the output pin, `end` the input.
    NewLink { start: PinId<K>, end: PinId<K> },
    /// A link was dropped away from any valid pin.
    NewNode { pin: PinId<K> },
    DeleteLink(LinkId<K>),
    DeleteNode(NodeId<K>),
}

/// A [`ChangeKind`] bound to the frame it was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange<K> {
    kind: ChangeKind<K>,
    frame: u64,
}

impl<K> PendingChange<K> {
    pub fn kind(&self) -> &ChangeKind<K> {
        &self.kind
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone)]
struct LinkDraft<K> {
    source: PinId<K>,
    /// Normalized (output, input) pair when a valid pin is under the pointer.
    candidate: Option<(PinId<K>, PinId<K>)>,
    candidate_pin: Option<PinId<K>>,
    error: Option<ValidationError>,
    /// Canvas position of the dangling end.
    pointer: Vec2,
    /// Caller's answer for the current frame.
    decision: Option<Decision>,
    released: bool,
}

#[derive(Debug, Clone)]
struct DeletionQueue<K> {
    links: Vec<LinkId<K>>,
    nodes: Vec<NodeId<K>>,
    link_cursor: usize,
    node_cursor: usize,
}

impl<K> Default for DeletionQueue<K> {
    fn default() -> Self {
        Self {
            links: Vec::new(),
            nodes: Vec::new(),
            link_cursor: 0,
            node_cursor: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Gesture<K> {
    Idle,
    Pressed {
        button: MouseButton,
        target: HitTarget<K>,
        origin: Vec2,
        additive: bool,
    },
    DraggingNodes {
        nodes: Vec<(NodeId<K>, Vec2)>,
        last: Vec2,
        delta: Vec2,
    },
    ResizingGroup {
        node: NodeId<K>,
        original: Vec2,
        last: Vec2,
        delta: Vec2,
    },
    Selecting {
        button: MouseButton,
        origin: Vec2,
        current: Vec2,
        additive: bool,
    },
    CreatingLink(LinkDraft<K>),
    DeletingItems(DeletionQueue<K>),
    Panning {
        button: MouseButton,
        last: Vec2,
    },
}

/// Per-frame results, reset at the start of every frame.
#[derive(Debug, Clone)]
struct FrameEvents<K> {
    hovered: HitTarget<K>,
    clicked: Option<HitTarget<K>>,
    double_clicked: Option<HitTarget<K>>,
    context_menu: Option<ContextMenu<K>>,
}

impl<K> Default for FrameEvents<K> {
    fn default() -> Self {
        Self {
            hovered: HitTarget::Background,
            clicked: None,
            double_clicked: None,
            context_menu: None,
        }
    }
}

/// Everything the gesture machine reads or mutates besides its own state.
pub struct InteractionEnv<'a, K> {
    pub registry: &'a mut ObjectRegistry<K>,
    pub selection: &'a mut SelectionManager<K>,
    pub view: &'a mut ViewController,
    pub config: &'a Config,
    pub style: &'a Style,
    pub validator: &'a dyn LinkValidator<K>,
}

/// Find what lies under `screen`.
///
/// Priority: pins and regular nodes by stacking order (a pin wins over the
/// body of its own node), then links, then groups.
pub fn hit_test<K: ObjectKey>(
    registry: &ObjectRegistry<K>,
    view: &ViewTransform,
    screen: Vec2,
    config: &Config,
    style: &Style,
) -> HitTarget<K> {
    let zoom = view.zoom;
    let canvas = view.screen_to_canvas(screen);

    let pin = registry.find_pin_at(canvas, config.pin_hit_slop / zoom);
    let node = registry.find_node_at(canvas);
    match (pin, node) {
        (Some((pin, pin_z)), Some((_, node_z))) if pin_z >= node_z => return HitTarget::Pin(pin),
        (Some((pin, _)), None) => return HitTarget::Pin(pin),
        (_, Some((node, _))) => return HitTarget::Node(node),
        (None, None) => {}
    }

    if let Some(link) = registry.find_link_at(canvas, config.link_hit_tolerance / zoom, style.link_strength) {
        return HitTarget::Link(link);
    }

    if let Some(group) = registry.find_group_at(canvas) {
        let handle = config.group_resize_handle / zoom;
        if let Some(record) = registry.node(&group) {
            let corner = record.bounds().max;
            if canvas.x >= corner.x - handle && canvas.y >= corner.y - handle {
                return HitTarget::GroupResize(group);
            }
        }
        return HitTarget::Node(group);
    }

    HitTarget::Background
}

pub struct Interaction<K> {
    gesture: Gesture<K>,
    frame: u64,
    events: FrameEvents<K>,
    deferred_links: Vec<LinkId<K>>,
    deferred_nodes: Vec<NodeId<K>>,
    dirty: Vec<(NodeId<K>, SaveReasonFlags)>,
}

impl<K> Default for Interaction<K> {
    fn default() -> Self {
        Self {
            gesture: Gesture::Idle,
            frame: 0,
            events: FrameEvents::default(),
            deferred_links: Vec::new(),
            deferred_nodes: Vec::new(),
            dirty: Vec::new(),
        }
    }
}

impl<K: ObjectKey> Interaction<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame results.
    pub fn new_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.events = FrameEvents::default();
        if let Gesture::CreatingLink(draft) = &mut self.gesture {
            draft.decision = None;
        }
    }

    pub fn kind(&self) -> GestureKind {
        match &self.gesture {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Pressed { .. } => GestureKind::Pressed,
            Gesture::DraggingNodes { .. } => GestureKind::DraggingNodes,
            Gesture::ResizingGroup { .. } => GestureKind::ResizingGroup,
            Gesture::Selecting { .. } => GestureKind::Selecting,
            Gesture::CreatingLink(_) => GestureKind::CreatingLink,
            Gesture::DeletingItems(_) => GestureKind::DeletingItems,
            Gesture::Panning { .. } => GestureKind::Panning,
        }
    }

    // === Frame processing ===

    /// Run the gesture machine against this frame's input and geometry.
    pub fn process(&mut self, input: &InputSnapshot, env: &mut InteractionEnv<'_, K>) {
        if env.view.is_suspended() {
            return;
        }
        if input.capture_lost {
            self.cancel(env.registry);
        }

        let mouse = input.mouse_pos;
        let viewport = Rect::from_min_size(Vec2::ZERO, env.view.viewport());
        let inside = viewport.contains(mouse);

        if input.wheel != 0.0 && inside && !matches!(self.gesture, Gesture::Panning { .. }) {
            env.view.wheel_zoom(mouse, input.wheel);
        }
        if input.navigate_pressed {
            navigate_to_selection(env, false, -1.0);
        }

        let hit = hit_test(env.registry, &env.view.transform(), mouse, env.config, env.style);
        self.events.hovered = hit.clone();

        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        self.gesture = match gesture {
            Gesture::Idle => self.idle(input, hit, inside, env),
            Gesture::Pressed { button, target, origin, additive } => {
                self.pressed(input, button, target, origin, additive, env)
            }
            Gesture::DraggingNodes { nodes, last, delta } => self.drag_nodes(input, nodes, last, delta, env),
            Gesture::ResizingGroup { node, original, last, delta } => {
                self.resize_group(input, node, original, last, delta, env)
            }
            Gesture::Selecting { button, origin, additive, .. } => {
                self.select_rect(input, button, origin, additive, env)
            }
            Gesture::CreatingLink(draft) => self.create_link(input, draft, env),
            Gesture::Panning { button, last } => {
                env.view.pan_by(mouse - last);
                if input.button(button).down {
                    Gesture::Panning { button, last: mouse }
                } else {
                    Gesture::Idle
                }
            }
            deleting @ Gesture::DeletingItems(_) => deleting,
        };
    }

    fn idle(
        &mut self,
        input: &InputSnapshot,
        hit: HitTarget<K>,
        inside: bool,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let delete_key = input.delete_pressed && !env.selection.is_empty();
        if delete_key || !self.deferred_links.is_empty() || !self.deferred_nodes.is_empty() {
            let queue = self.build_deletion(delete_key, env);
            if !queue.links.is_empty() || !queue.nodes.is_empty() {
                debug!(links = queue.links.len(), nodes = queue.nodes.len(), "deleting items");
                return Gesture::DeletingItems(queue);
            }
        }

        if !inside {
            return Gesture::Idle;
        }

        let buttons = [
            env.config.drag_button,
            env.config.select_button,
            env.config.navigate_button,
            MouseButton::Middle,
        ];
        let Some(button) = buttons.into_iter().find(|b| input.button(*b).pressed) else {
            return Gesture::Idle;
        };

        if input.button(button).double_clicked {
            self.events.double_clicked = Some(hit.clone());
        }
        if button == env.config.drag_button {
            if let HitTarget::Node(id) = &hit {
                if env.registry.node(id).map_or(false, |n| !n.is_group()) {
                    env.registry.bring_to_front(id);
                }
            }
        }
        trace!(?button, ?hit, "pressed");
        Gesture::Pressed {
            button,
            target: hit,
            origin: input.mouse_pos,
            additive: input.modifiers.is_additive(),
        }
    }

    fn pressed(
        &mut self,
        input: &InputSnapshot,
        button: MouseButton,
        target: HitTarget<K>,
        origin: Vec2,
        additive: bool,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let mouse = input.mouse_pos;
        if !input.button(button).down {
            self.click(button, target, additive, env);
            return Gesture::Idle;
        }

        if (mouse - origin).length() <= env.config.drag_threshold {
            return Gesture::Pressed { button, target, origin, additive };
        }

        let transform = env.view.transform();
        if button != env.config.drag_button {
            if button == env.config.select_button {
                trace!(?button, "rubber band started");
                return self.select_rect(input, button, transform.screen_to_canvas(origin), additive, env);
            }
            debug!("panning started");
            env.view.pan_by(mouse - origin);
            return Gesture::Panning { button, last: mouse };
        }

        match target {
            HitTarget::Pin(source) => {
                debug!(pin = ?source, "link creation started");
                let draft = LinkDraft {
                    source,
                    candidate: None,
                    candidate_pin: None,
                    error: None,
                    pointer: transform.screen_to_canvas(mouse),
                    decision: None,
                    released: false,
                };
                self.create_link(input, draft, env)
            }
            HitTarget::Node(id) => {
                let nodes = drag_set(&id, env);
                debug!(count = nodes.len(), "node drag started");
                self.drag_nodes(input, nodes, origin, Vec2::ZERO, env)
            }
            HitTarget::GroupResize(id) => {
                let original = env
                    .registry
                    .node(&id)
                    .and_then(|n| n.group_size)
                    .unwrap_or(Vec2::ZERO);
                debug!(group = ?id, "group resize started");
                self.resize_group(input, id, original, origin, Vec2::ZERO, env)
            }
            HitTarget::Link(_) | HitTarget::Background => {
                trace!(?button, "rubber band started");
                self.select_rect(input, button, transform.screen_to_canvas(origin), additive, env)
            }
        }
    }

    fn click(&mut self, button: MouseButton, target: HitTarget<K>, additive: bool, env: &mut InteractionEnv<'_, K>) {
        if button == env.config.drag_button || button == env.config.select_button {
            match &target {
                HitTarget::Node(id) | HitTarget::GroupResize(id) => {
                    env.selection.handle_interaction(Selectable::Node(id.clone()), additive);
                }
                HitTarget::Link(id) => {
                    env.selection.handle_interaction(Selectable::Link(id.clone()), additive);
                }
                HitTarget::Background => {
                    if !additive {
                        env.selection.clear();
                    }
                }
                HitTarget::Pin(_) => {}
            }
            self.events.clicked = Some(target);
        } else if button == env.config.context_menu_button {
            self.events.context_menu = Some(match target {
                HitTarget::Background => ContextMenu::Background,
                HitTarget::Node(id) | HitTarget::GroupResize(id) => ContextMenu::Node(id),
                HitTarget::Pin(id) => ContextMenu::Pin(id),
                HitTarget::Link(id) => ContextMenu::Link(id),
            });
        }
    }

    fn drag_nodes(
        &mut self,
        input: &InputSnapshot,
        nodes: Vec<(NodeId<K>, Vec2)>,
        last: Vec2,
        mut delta: Vec2,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let mouse = input.mouse_pos;
        delta += (mouse - last) / env.view.zoom();
        for (id, original) in &nodes {
            if let Some(node) = env.registry.node_mut(id) {
                node.position = *original + delta;
            }
        }

        if input.button(env.config.drag_button).down {
            return Gesture::DraggingNodes { nodes, last: mouse, delta };
        }

        if delta != Vec2::ZERO {
            for (id, _) in nodes {
                self.dirty.push((id, SaveReasonFlags::POSITION));
            }
        }
        debug!(?delta, "node drag finished");
        Gesture::Idle
    }

    fn resize_group(
        &mut self,
        input: &InputSnapshot,
        node: NodeId<K>,
        original: Vec2,
        last: Vec2,
        mut delta: Vec2,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let mouse = input.mouse_pos;
        delta += (mouse - last) / env.view.zoom();
        let size = (original + delta).max(Vec2::splat(MIN_GROUP_SIZE));
        if let Some(record) = env.registry.node_mut(&node) {
            record.group_size = Some(size);
            record.size = record.size.max(size);
        }

        if input.button(env.config.drag_button).down {
            return Gesture::ResizingGroup { node, original, last: mouse, delta };
        }

        self.dirty.push((node, SaveReasonFlags::SIZE));
        Gesture::Idle
    }

    /// Track a rubber band held with `button`; select what it covers once
    /// that button is released.
    fn select_rect(
        &mut self,
        input: &InputSnapshot,
        button: MouseButton,
        origin: Vec2,
        additive: bool,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let current = env.view.transform().screen_to_canvas(input.mouse_pos);
        if input.button(button).down {
            return Gesture::Selecting { button, origin, current, additive };
        }

        let rect = Rect::from_corners(origin, current);
        if rect.is_empty() {
            return Gesture::Idle;
        }
        let nodes = env.registry.nodes_in_rect(&rect);
        let links = env.registry.links_in_rect(&rect, env.style.link_strength);
        let items = nodes
            .into_iter()
            .map(Selectable::Node)
            .chain(links.into_iter().map(Selectable::Link));
        if additive {
            env.selection.extend(items);
        } else {
            env.selection.replace_selection(items);
        }
        debug!(selected = env.selection.len(), "rubber band finished");
        Gesture::Idle
    }

    fn create_link(
        &mut self,
        input: &InputSnapshot,
        mut draft: LinkDraft<K>,
        env: &mut InteractionEnv<'_, K>,
    ) -> Gesture<K> {
        let canvas = env.view.transform().screen_to_canvas(input.mouse_pos);
        draft.pointer = canvas;
        draft.candidate = None;
        draft.candidate_pin = None;
        draft.error = None;

        let slop = env.config.pin_hit_slop / env.view.zoom();
        let under = env
            .registry
            .find_pin_at(canvas, slop)
            .map(|(id, _)| id)
            .filter(|id| *id != draft.source);
        if let Some(pin) = under {
            match env.validator.validate(&draft.source, &pin, env.registry) {
                ValidationResult::Valid => {
                    draft.candidate = normalize_link(&draft.source, &pin, env.registry);
                    if draft.candidate.is_none() {
                        draft.error = Some(ValidationError::IncompatibleDirection);
                    }
                }
                ValidationResult::Invalid(err) => {
                    trace!(%err, "candidate rejected");
                    draft.error = Some(err);
                }
            }
            draft.candidate_pin = Some(pin);
        }

        if !input.button(env.config.drag_button).down {
            draft.released = true;
        }
        Gesture::CreatingLink(draft)
    }

    fn build_deletion(&mut self, from_selection: bool, env: &InteractionEnv<'_, K>) -> DeletionQueue<K> {
        let mut links = std::mem::take(&mut self.deferred_links);
        let mut nodes = std::mem::take(&mut self.deferred_nodes);
        if from_selection {
            links.extend(env.selection.selected_links());
            nodes.extend(env.selection.selected_nodes());
        }

        let mut queue = DeletionQueue::default();
        for id in nodes {
            if env.registry.is_node_live(&id) && !queue.nodes.contains(&id) {
                for link in env.registry.links_of_node(&id) {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
                queue.nodes.push(id);
            }
        }
        let live: Vec<LinkId<K>> = env.registry.live_links().map(|l| l.id.clone()).collect();
        for id in links {
            if live.contains(&id) && !queue.links.contains(&id) {
                queue.links.push(id);
            }
        }
        queue
    }

    /// Close the frame: a released link drag or a deletion round ends here.
    pub fn end_frame(&mut self) {
        let finished = match &self.gesture {
            Gesture::CreatingLink(draft) => draft.released,
            Gesture::DeletingItems(_) => true,
            _ => false,
        };
        if finished {
            debug!(gesture = ?self.kind(), "gesture finished");
            self.gesture = Gesture::Idle;
        }
    }

    /// Abandon the active pointer gesture without committing anything.
    pub fn cancel(&mut self, registry: &mut ObjectRegistry<K>) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::DraggingNodes { nodes, .. } => {
                for (id, original) in nodes {
                    if let Some(node) = registry.node_mut(&id) {
                        node.position = original;
                    }
                }
            }
            Gesture::ResizingGroup { node, original, .. } => {
                if let Some(record) = registry.node_mut(&node) {
                    record.group_size = Some(original);
                }
            }
            // Deletion is not a pointer gesture
            deleting @ Gesture::DeletingItems(_) => self.gesture = deleting,
            Gesture::Idle => {}
            other => trace!(gesture = ?kind_of(&other), "gesture cancelled"),
        }
    }

    pub fn take_dirty(&mut self) -> Vec<(NodeId<K>, SaveReasonFlags)> {
        std::mem::take(&mut self.dirty)
    }

    // === Deferred deletion ===

    /// Queue a link for deletion; it is offered through the delete protocol
    /// in the next frame the editor is idle.
    pub fn request_delete_link(&mut self, id: LinkId<K>) {
        if !self.deferred_links.contains(&id) {
            self.deferred_links.push(id);
        }
    }

    pub fn request_delete_node(&mut self, id: NodeId<K>) {
        if !self.deferred_nodes.contains(&id) {
            self.deferred_nodes.push(id);
        }
    }

    // === Queries ===

    pub fn hovered(&self) -> &HitTarget<K> {
        &self.events.hovered
    }

    pub fn clicked(&self) -> Option<&HitTarget<K>> {
        self.events.clicked.as_ref()
    }

    pub fn double_clicked(&self) -> Option<&HitTarget<K>> {
        self.events.double_clicked.as_ref()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu<K>> {
        self.events.context_menu.as_ref()
    }

    /// Rubber band in canvas space while selecting.
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::Selecting { origin, current, .. } => Some(Rect::from_corners(*origin, *current)),
            _ => None,
        }
    }

    /// In-flight link: source pin, canvas pointer, candidate pin, and whether
    /// the candidate was accepted (`Some(true)`) or rejected (`Some(false)`).
    pub fn link_draft(&self) -> Option<(&PinId<K>, Vec2, Option<&PinId<K>>, Option<bool>)> {
        match &self.gesture {
            Gesture::CreatingLink(draft) => {
                let verdict = match (draft.decision, &draft.error) {
                    (Some(Decision::Accepted), _) => Some(true),
                    (Some(Decision::Rejected), _) | (None, Some(_)) => Some(false),
                    (None, None) => None,
                };
                Some((&draft.source, draft.pointer, draft.candidate_pin.as_ref(), verdict))
            }
            _ => None,
        }
    }

    /// Why the pin under the dragged link is not a valid target.
    pub fn candidate_error(&self) -> Option<&ValidationError> {
        match &self.gesture {
            Gesture::CreatingLink(draft) => draft.error.as_ref(),
            _ => None,
        }
    }

    fn check_frame(&self, change: &PendingChange<K>) -> Result<(), Misuse> {
        if change.frame != self.frame {
            return Err(Misuse::StaleChange { issued: change.frame, current: self.frame });
        }
        Ok(())
    }

    // === Link creation protocol ===

    /// Candidate link under the pointer, if any.
    pub fn query_new_link(&self) -> Option<PendingChange<K>> {
        match &self.gesture {
            Gesture::CreatingLink(LinkDraft { candidate: Some((start, end)), .. }) => Some(PendingChange {
                kind: ChangeKind::NewLink { start: start.clone(), end: end.clone() },
                frame: self.frame,
            }),
            _ => None,
        }
    }

    /// The dragged link points at no valid pin.
    pub fn query_new_node(&self) -> Option<PendingChange<K>> {
        match &self.gesture {
            Gesture::CreatingLink(draft) if draft.candidate.is_none() => Some(PendingChange {
                kind: ChangeKind::NewNode { pin: draft.source.clone() },
                frame: self.frame,
            }),
            _ => None,
        }
    }

    fn draft_matching(&mut self, change: &PendingChange<K>) -> Option<&mut LinkDraft<K>> {
        let Gesture::CreatingLink(draft) = &mut self.gesture else {
            return None;
        };
        let matches = match &change.kind {
            ChangeKind::NewLink { start, end } => {
                draft.candidate.as_ref().map_or(false, |(s, e)| s == start && e == end)
            }
            ChangeKind::NewNode { pin } => draft.candidate.is_none() && *pin == draft.source,
            _ => false,
        };
        matches.then_some(draft)
    }

    /// Accept the candidate. Returns true in the frame the pointer is released,
    /// which is when the caller should create the link (or node).
    pub fn accept_new_item(&mut self, change: &PendingChange<K>) -> Result<bool, Misuse> {
        self.check_frame(change)?;
        Ok(match self.draft_matching(change) {
            Some(draft) => {
                draft.decision = Some(Decision::Accepted);
                if draft.released {
                    debug!(change = ?change.kind, "new item accepted");
                }
                draft.released
            }
            None => false,
        })
    }

    pub fn reject_new_item(&mut self, change: &PendingChange<K>) -> Result<(), Misuse> {
        self.check_frame(change)?;
        if let Some(draft) = self.draft_matching(change) {
            draft.decision = Some(Decision::Rejected);
        }
        Ok(())
    }

    // === Deletion protocol ===

    /// Next link pending deletion. Every call advances; links not accepted
    /// before the frame ends stay.
    pub fn query_deleted_link(&mut self) -> Option<PendingChange<K>> {
        let Gesture::DeletingItems(queue) = &mut self.gesture else {
            return None;
        };
        let id = queue.links.get(queue.link_cursor)?.clone();
        queue.link_cursor += 1;
        Some(PendingChange { kind: ChangeKind::DeleteLink(id), frame: self.frame })
    }

    pub fn query_deleted_node(&mut self) -> Option<PendingChange<K>> {
        let Gesture::DeletingItems(queue) = &mut self.gesture else {
            return None;
        };
        let id = queue.nodes.get(queue.node_cursor)?.clone();
        queue.node_cursor += 1;
        Some(PendingChange { kind: ChangeKind::DeleteNode(id), frame: self.frame })
    }

    /// Remove the item from the editor. With `delete_dependencies` a node's
    /// links go with it. Returns false if the change is not part of the
    /// current deletion.
    pub fn accept_deleted_item(
        &mut self,
        change: &PendingChange<K>,
        delete_dependencies: bool,
        registry: &mut ObjectRegistry<K>,
        selection: &mut SelectionManager<K>,
    ) -> Result<bool, Misuse> {
        self.check_frame(change)?;
        let Gesture::DeletingItems(queue) = &self.gesture else {
            return Ok(false);
        };
        match &change.kind {
            ChangeKind::DeleteLink(id) if queue.links.contains(id) => {
                registry.mark_link_deleted(id);
                selection.deselect(&Selectable::Link(id.clone()));
                Ok(true)
            }
            ChangeKind::DeleteNode(id) if queue.nodes.contains(id) => {
                if delete_dependencies {
                    for link in registry.links_of_node(id) {
                        registry.mark_link_deleted(&link);
                        selection.deselect(&Selectable::Link(link));
                    }
                }
                registry.mark_node_deleted(id);
                selection.deselect(&Selectable::Node(id.clone()));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn reject_deleted_item(&mut self, change: &PendingChange<K>) -> Result<(), Misuse> {
        self.check_frame(change)
    }
}

fn kind_of<K>(gesture: &Gesture<K>) -> &'static str {
    match gesture {
        Gesture::Idle => "idle",
        Gesture::Pressed { .. } => "pressed",
        Gesture::DraggingNodes { .. } => "dragging",
        Gesture::ResizingGroup { .. } => "resizing",
        Gesture::Selecting { .. } => "selecting",
        Gesture::CreatingLink(_) => "creating link",
        Gesture::DeletingItems(_) => "deleting",
        Gesture::Panning { .. } => "panning",
    }
}

/// Nodes moved by dragging `id`: the selection if `id` is selected, `id`
/// alone otherwise, plus every node inside a dragged group. Pairs each with
/// its current position.
fn drag_set<K: ObjectKey>(id: &NodeId<K>, env: &InteractionEnv<'_, K>) -> Vec<(NodeId<K>, Vec2)> {
    let roots = if env.selection.contains_node(id) {
        env.selection.selected_nodes()
    } else {
        vec![id.clone()]
    };

    let mut ids: Vec<NodeId<K>> = Vec::with_capacity(roots.len());
    for root in roots {
        let is_group = env.registry.node(&root).map_or(false, |n| n.is_group());
        if !ids.contains(&root) {
            ids.push(root.clone());
        }
        if is_group {
            for inner in env.registry.nodes_in_group(&root) {
                if !ids.contains(&inner) {
                    ids.push(inner);
                }
            }
        }
    }

    ids.into_iter()
        .filter_map(|id| {
            let position = env.registry.node(&id)?.position;
            Some((id, position))
        })
        .collect()
}

/// Frame the selected nodes, or all content when nothing is selected.
pub fn navigate_to_selection<K: ObjectKey>(env: &mut InteractionEnv<'_, K>, zoom_in: bool, duration: f32) {
    let selection = &*env.selection;
    let bounds = if selection.selected_nodes().is_empty() {
        env.registry.content_bounds(|_| true)
    } else {
        env.registry
            .content_bounds(|id| selection.contains_node(id))
            .or_else(|| env.registry.content_bounds(|_| true))
    };
    if let Some(bounds) = bounds {
        env.view.navigate_to_rect(bounds, duration, zoom_in, env.config.navigate_margin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PinKind;
    use crate::validation::{BasicLinkValidator, CompositeValidator};

    fn n(id: u64) -> NodeId<u64> {
        NodeId::new(id)
    }

    fn p(id: u64) -> PinId<u64> {
        PinId::new(id)
    }

    struct Fixture {
        registry: ObjectRegistry<u64>,
        selection: SelectionManager<u64>,
        view: ViewController,
        config: Config,
        style: Style,
        validator: CompositeValidator<u64>,
        interaction: Interaction<u64>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut view = ViewController::default();
            view.set_viewport(Vec2::new(800.0, 600.0));
            let mut fixture = Fixture {
                registry: ObjectRegistry::new(),
                selection: SelectionManager::new(),
                view,
                config: Config::default(),
                style: Style::default(),
                validator: CompositeValidator::new().add(BasicLinkValidator::default()),
                interaction: Interaction::new(),
            };
            fixture.declare();
            fixture
        }

        /// Node 1 at (0,0) with output 11 at its right edge; node 2 at
        /// (200,0) with input 21 at its left edge.
        fn declare(&mut self) {
            let frame = self.registry.begin_frame();
            self.interaction.new_frame(frame);
            self.registry.touch_node(&n(1)).size = Vec2::new(100.0, 50.0);
            let b = self.registry.touch_node(&n(2));
            if b.position == Vec2::ZERO {
                b.position = Vec2::new(200.0, 0.0);
            }
            b.size = Vec2::new(100.0, 50.0);
            self.registry.touch_pin(&p(11), &n(1), PinKind::Output).rect =
                Rect::from_min_size(Vec2::new(92.0, 20.0), Vec2::new(8.0, 8.0));
            self.registry.touch_pin(&p(21), &n(2), PinKind::Input).rect =
                Rect::from_min_size(Vec2::new(0.0, 20.0), Vec2::new(8.0, 8.0));
        }

        fn frame(&mut self, input: InputSnapshot) {
            self.declare();
            let mut env = InteractionEnv {
                registry: &mut self.registry,
                selection: &mut self.selection,
                view: &mut self.view,
                config: &self.config,
                style: &self.style,
                validator: &self.validator,
            };
            self.interaction.process(&input, &mut env);
        }

        fn finish(&mut self) {
            self.interaction.end_frame();
            self.registry.prune();
        }
    }

    fn at(x: f32, y: f32) -> InputSnapshot {
        InputSnapshot::new(Vec2::new(x, y))
    }

    // ========================================================================
    // hit_test()
    // ========================================================================

    #[test]
    fn test_hit_priority() {
        let f = Fixture::new();
        let view = f.view.transform();
        let hit = |x, y| hit_test(&f.registry, &view, Vec2::new(x, y), &f.config, &f.style);
        assert_eq!(hit(96.0, 24.0), HitTarget::Pin(p(11)));
        assert_eq!(hit(50.0, 10.0), HitTarget::Node(n(1)));
        assert_eq!(hit(500.0, 500.0), HitTarget::Background);
    }

    // ========================================================================
    // Click selection
    // ========================================================================

    #[test]
    fn test_click_selects_exclusively() {
        let mut f = Fixture::new();
        f.frame(at(50.0, 10.0).with_press(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::Pressed);
        f.frame(at(50.0, 10.0).with_release(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
        assert_eq!(f.selection.selected_nodes(), vec![n(1)]);
        assert_eq!(f.interaction.clicked(), Some(&HitTarget::Node(n(1))));
    }

    #[test]
    fn test_background_click_clears_selection() {
        let mut f = Fixture::new();
        f.selection.select(Selectable::Node(n(1)), false);
        f.frame(at(500.0, 500.0).with_press(MouseButton::Primary));
        f.frame(at(500.0, 500.0).with_release(MouseButton::Primary));
        assert!(f.selection.is_empty());
    }

    #[test]
    fn test_secondary_click_opens_context_menu() {
        let mut f = Fixture::new();
        f.frame(at(250.0, 10.0).with_press(MouseButton::Secondary));
        f.frame(at(250.0, 10.0).with_release(MouseButton::Secondary));
        assert_eq!(f.interaction.context_menu(), Some(&ContextMenu::Node(n(2))));
        assert!(f.selection.is_empty());
    }

    // ========================================================================
    // Node dragging
    // ========================================================================

    #[test]
    fn test_drag_below_threshold_is_click() {
        let mut f = Fixture::new();
        f.frame(at(50.0, 10.0).with_press(MouseButton::Primary));
        f.frame(at(54.0, 10.0).with_button_down(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::Pressed);
        assert_eq!(f.registry.node(&n(1)).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_drag_moves_node_in_canvas_units() {
        let mut f = Fixture::new();
        f.view.set_view(Vec2::ZERO, 2.0);
        // Node 1 covers (0,0)-(200,100) on screen at zoom 2
        f.frame(at(100.0, 20.0).with_press(MouseButton::Primary));
        f.frame(at(140.0, 20.0).with_button_down(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::DraggingNodes);
        assert_eq!(f.registry.node(&n(1)).unwrap().position, Vec2::new(20.0, 0.0));

        f.frame(at(160.0, 40.0).with_release(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
        assert_eq!(f.registry.node(&n(1)).unwrap().position, Vec2::new(30.0, 10.0));
        assert_eq!(f.interaction.take_dirty(), vec![(n(1), SaveReasonFlags::POSITION)]);
    }

    #[test]
    fn test_drag_selected_moves_whole_selection() {
        let mut f = Fixture::new();
        f.selection.replace_selection(vec![Selectable::Node(n(1)), Selectable::Node(n(2))]);
        f.frame(at(50.0, 10.0).with_press(MouseButton::Primary));
        f.frame(at(50.0, 40.0).with_button_down(MouseButton::Primary));
        assert_eq!(f.registry.node(&n(1)).unwrap().position, Vec2::new(0.0, 30.0));
        assert_eq!(f.registry.node(&n(2)).unwrap().position, Vec2::new(200.0, 30.0));
    }

    #[test]
    fn test_cancel_restores_positions() {
        let mut f = Fixture::new();
        f.frame(at(50.0, 10.0).with_press(MouseButton::Primary));
        f.frame(at(90.0, 10.0).with_button_down(MouseButton::Primary));
        f.interaction.cancel(&mut f.registry);
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
        assert_eq!(f.registry.node(&n(1)).unwrap().position, Vec2::ZERO);
        assert!(f.interaction.take_dirty().is_empty());
    }

    // ========================================================================
    // Rubber band
    // ========================================================================

    #[test]
    fn test_rubber_band_selects_intersecting_nodes() {
        let mut f = Fixture::new();
        f.frame(at(150.0, 200.0).with_press(MouseButton::Primary));
        f.frame(at(250.0, 30.0).with_button_down(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::Selecting);
        assert!(f.interaction.selection_rect().is_some());
        f.frame(at(250.0, 30.0).with_release(MouseButton::Primary));
        assert_eq!(f.selection.selected_nodes(), vec![n(2)]);
    }

    // ========================================================================
    // Link creation
    // ========================================================================

    #[test]
    fn test_link_creation_accept_on_release() {
        let mut f = Fixture::new();
        f.frame(at(96.0, 24.0).with_press(MouseButton::Primary));
        f.frame(at(150.0, 24.0).with_button_down(MouseButton::Primary));
        assert_eq!(f.interaction.kind(), GestureKind::CreatingLink);
        assert!(f.interaction.query_new_link().is_none());
        assert!(f.interaction.query_new_node().is_some());
        f.finish();

        f.frame(at(204.0, 24.0).with_button_down(MouseButton::Primary));
        let change = f.interaction.query_new_link().expect("candidate over input pin");
        assert_eq!(change.kind(), &ChangeKind::NewLink { start: p(11), end: p(21) });
        assert_eq!(f.interaction.accept_new_item(&change), Ok(false));
        f.finish();

        f.frame(at(204.0, 24.0).with_release(MouseButton::Primary));
        let change = f.interaction.query_new_link().unwrap();
        assert_eq!(f.interaction.accept_new_item(&change), Ok(true));
        f.finish();
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
    }

    #[test]
    fn test_link_dragged_from_input_is_normalized() {
        let mut f = Fixture::new();
        f.frame(at(204.0, 24.0).with_press(MouseButton::Primary));
        f.frame(at(96.0, 24.0).with_button_down(MouseButton::Primary));
        let change = f.interaction.query_new_link().unwrap();
        assert_eq!(change.kind(), &ChangeKind::NewLink { start: p(11), end: p(21) });
    }

    #[test]
    fn test_stale_change_is_refused() {
        let mut f = Fixture::new();
        f.frame(at(96.0, 24.0).with_press(MouseButton::Primary));
        f.frame(at(204.0, 24.0).with_button_down(MouseButton::Primary));
        let change = f.interaction.query_new_link().unwrap();
        f.finish();
        f.frame(at(204.0, 24.0).with_button_down(MouseButton::Primary));
        assert!(matches!(f.interaction.accept_new_item(&change), Err(Misuse::StaleChange { .. })));
    }

    #[test]
    fn test_release_on_empty_canvas_offers_new_node() {
        let mut f = Fixture::new();
        f.frame(at(96.0, 24.0).with_press(MouseButton::Primary));
        f.frame(at(400.0, 300.0).with_button_down(MouseButton::Primary));
        f.finish();
        f.frame(at(400.0, 300.0).with_release(MouseButton::Primary));
        let change = f.interaction.query_new_node().unwrap();
        assert_eq!(change.kind(), &ChangeKind::NewNode { pin: p(11) });
        assert_eq!(f.interaction.accept_new_item(&change), Ok(true));
        f.finish();
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    #[test]
    fn test_delete_key_expands_node_to_links() {
        let mut f = Fixture::new();
        f.registry.touch_link(&LinkId::new(5), &p(11), &p(21));
        f.selection.select(Selectable::Node(n(1)), false);

        f.declare();
        f.registry.touch_link(&LinkId::new(5), &p(11), &p(21));
        let mut env = InteractionEnv {
            registry: &mut f.registry,
            selection: &mut f.selection,
            view: &mut f.view,
            config: &f.config,
            style: &f.style,
            validator: &f.validator,
        };
        f.interaction.process(&at(500.0, 500.0).with_delete(), &mut env);
        assert_eq!(f.interaction.kind(), GestureKind::DeletingItems);

        let link = f.interaction.query_deleted_link().unwrap();
        assert_eq!(link.kind(), &ChangeKind::DeleteLink(LinkId::new(5)));
        assert!(f.interaction.query_deleted_link().is_none());

        let node = f.interaction.query_deleted_node().unwrap();
        assert_eq!(
            f.interaction.accept_deleted_item(&node, true, &mut f.registry, &mut f.selection),
            Ok(true)
        );
        assert!(f.selection.is_empty());
        f.finish();
        assert!(f.registry.node(&n(1)).is_none());
        assert!(f.registry.link(&LinkId::new(5)).is_none());
        assert_eq!(f.interaction.kind(), GestureKind::Idle);
    }
}
