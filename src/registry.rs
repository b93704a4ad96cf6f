use std::collections::HashMap;

use slint::Color;

use crate::geometry::{Rect, Vec2};
use crate::hit_test::{
    find_link_at, find_node_at, find_pin_at, links_in_rect, nodes_in_rect, SimpleLinkGeometry,
    SimpleNodeGeometry, SimplePinGeometry,
};
use crate::id::{LinkId, NodeId, ObjectKey, PinId, PinKind};
use crate::path::CubicBezier;
use crate::style::{NodeStyle, PinStyle};

/// Samples used when flattening link curves for hit tests.
pub const LINK_HIT_SAMPLES: usize = 24;

/// Persistent state of a node.
#[derive(Debug, Clone)]
pub struct NodeRecord<K> {
    pub id: NodeId<K>,
    /// Top-left corner in canvas space.
    pub position: Vec2,
    /// Content bounds reported by the last `end_node`.
    pub size: Vec2,
    pub z: i32,
    /// `Some` marks the node as a group of the given minimum size.
    pub group_size: Option<Vec2>,
    /// Style in effect when the node was last declared.
    pub style: NodeStyle,
    frame: u64,
    deleted: bool,
}

impl<K: ObjectKey> NodeRecord<K> {
    fn new(id: NodeId<K>, z: i32) -> Self {
        Self {
            id,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            z,
            group_size: None,
            style: NodeStyle::default(),
            frame: 0,
            deleted: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    pub fn is_group(&self) -> bool {
        self.group_size.is_some()
    }
}

/// Where a link attaches to a pin and how it leaves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinPivot {
    /// Anchor inside the pin rectangle, `(0.5, 0.5)` is the center.
    pub alignment: Vec2,
    /// Fixed pivot size; zero means "derive from the pin rectangle".
    pub size: Vec2,
    /// Scale applied to the pin rectangle when `size` is zero.
    pub scale: Vec2,
    /// Tangent the link curve uses at this pin.
    pub direction: Vec2,
}

impl Default for PinPivot {
    fn default() -> Self {
        Self {
            alignment: Vec2::new(0.5, 0.5),
            size: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            direction: Vec2::new(1.0, 0.0),
        }
    }
}

/// Persistent state of a pin. Pins have no position of their own; their
/// rectangle is stored relative to the owning node.
#[derive(Debug, Clone)]
pub struct PinRecord<K> {
    pub id: PinId<K>,
    pub node: NodeId<K>,
    pub kind: PinKind,
    /// Pin rectangle relative to the node's top-left corner.
    pub rect: Rect,
    pub pivot: PinPivot,
    pub style: PinStyle,
    frame: u64,
}

impl<K: ObjectKey> PinRecord<K> {
    /// Canvas-space rectangle for a node placed at `node_position`.
    pub fn canvas_rect(&self, node_position: Vec2) -> Rect {
        self.rect.translated(node_position)
    }

    /// Canvas-space pivot rectangle.
    pub fn pivot_rect(&self, node_position: Vec2) -> Rect {
        let rect = self.canvas_rect(node_position);
        let anchor = rect.point_at(self.pivot.alignment);
        let size = if self.pivot.size != Vec2::ZERO {
            self.pivot.size
        } else {
            rect.size().scale(self.pivot.scale)
        };
        Rect::from_min_size(anchor - size.scale(self.pivot.alignment), size)
    }

    /// Point where links attach: the pivot's edge in the link direction.
    pub fn anchor(&self, node_position: Vec2) -> Vec2 {
        let pivot = self.pivot_rect(node_position);
        let half = pivot.size() * 0.5;
        pivot.center() + half.scale(self.pivot.direction)
    }
}

/// Persistent state of a link.
#[derive(Debug, Clone)]
pub struct LinkRecord<K> {
    pub id: LinkId<K>,
    pub start: PinId<K>,
    pub end: PinId<K>,
    /// Set at declaration from the explicit color or the style in effect.
    pub color: Option<Color>,
    /// Zero draws with the live style's link thickness.
    pub thickness: f32,
    frame: u64,
    deleted: bool,
}

/// What a prune pass removed.
#[derive(Debug)]
pub struct PruneReport<K> {
    pub nodes: Vec<NodeId<K>>,
    pub pins: Vec<PinId<K>>,
    pub links: Vec<LinkId<K>>,
}

impl<K> PruneReport<K> {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.pins.is_empty() && self.links.is_empty()
    }
}

/// Registry of nodes, pins and links keyed by identifier.
///
/// Objects are created on first touch and stamped with the current frame on
/// every touch. [`prune`](Self::prune) drops everything that was not stamped
/// in the current frame.
pub struct ObjectRegistry<K> {
    nodes: HashMap<NodeId<K>, NodeRecord<K>>,
    pins: HashMap<PinId<K>, PinRecord<K>>,
    links: HashMap<LinkId<K>, LinkRecord<K>>,
    frame: u64,
    top_z: i32,
}

impl<K> Default for ObjectRegistry<K> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            pins: HashMap::new(),
            links: HashMap::new(),
            frame: 0,
            top_z: 0,
        }
    }
}

impl<K: ObjectKey> ObjectRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame: every record becomes stale until touched again.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    // === Touch ===

    /// Create or refresh a node. Idempotent within a frame.
    pub fn touch_node(&mut self, id: &NodeId<K>) -> &mut NodeRecord<K> {
        let frame = self.frame;
        let top_z = &mut self.top_z;
        let record = self.nodes.entry(id.clone()).or_insert_with(|| {
            *top_z += 1;
            NodeRecord::new(id.clone(), *top_z)
        });
        record.frame = frame;
        record.deleted = false;
        record
    }

    /// Create or refresh a pin owned by `node`.
    pub fn touch_pin(&mut self, id: &PinId<K>, node: &NodeId<K>, kind: PinKind) -> &mut PinRecord<K> {
        let frame = self.frame;
        let record = self.pins.entry(id.clone()).or_insert_with(|| PinRecord {
            id: id.clone(),
            node: node.clone(),
            kind,
            rect: Rect::default(),
            pivot: PinPivot::default(),
            style: PinStyle::default(),
            frame,
        });
        record.node = node.clone();
        record.kind = kind;
        record.frame = frame;
        record
    }

    /// Create or refresh a link between two pins.
    pub fn touch_link(&mut self, id: &LinkId<K>, start: &PinId<K>, end: &PinId<K>) -> &mut LinkRecord<K> {
        let frame = self.frame;
        let record = self.links.entry(id.clone()).or_insert_with(|| LinkRecord {
            id: id.clone(),
            start: start.clone(),
            end: end.clone(),
            color: None,
            thickness: 0.0,
            frame,
            deleted: false,
        });
        record.start = start.clone();
        record.end = end.clone();
        record.frame = frame;
        record.deleted = false;
        record
    }

    // === Lookup ===

    pub fn node(&self, id: &NodeId<K>) -> Option<&NodeRecord<K>> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId<K>) -> Option<&mut NodeRecord<K>> {
        self.nodes.get_mut(id)
    }

    pub fn pin(&self, id: &PinId<K>) -> Option<&PinRecord<K>> {
        self.pins.get(id)
    }

    pub fn pin_mut(&mut self, id: &PinId<K>) -> Option<&mut PinRecord<K>> {
        self.pins.get_mut(id)
    }

    pub fn link(&self, id: &LinkId<K>) -> Option<&LinkRecord<K>> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: &LinkId<K>) -> Option<&mut LinkRecord<K>> {
        self.links.get_mut(id)
    }

    pub fn contains_node(&self, id: &NodeId<K>) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_node_live(&self, id: &NodeId<K>) -> bool {
        self.nodes.get(id).map_or(false, |n| n.frame == self.frame && !n.deleted)
    }

    /// Nodes touched this frame and not marked deleted.
    pub fn live_nodes(&self) -> impl Iterator<Item = &NodeRecord<K>> + '_ {
        let frame = self.frame;
        self.nodes.values().filter(move |n| n.frame == frame && !n.deleted)
    }

    /// Pins touched this frame whose node is live.
    pub fn live_pins(&self) -> impl Iterator<Item = (&PinRecord<K>, &NodeRecord<K>)> + '_ {
        let frame = self.frame;
        self.pins.values().filter_map(move |pin| {
            if pin.frame != frame {
                return None;
            }
            let node = self.nodes.get(&pin.node)?;
            (node.frame == frame && !node.deleted).then_some((pin, node))
        })
    }

    /// Links touched this frame whose both endpoints are live.
    pub fn live_links(&self) -> impl Iterator<Item = &LinkRecord<K>> + '_ {
        let frame = self.frame;
        self.links
            .values()
            .filter(move |link| link.frame == frame && !link.deleted && self.link_endpoints(link).is_some())
    }

    /// Node ids sorted back to front (groups first, then by z).
    pub fn ordered_node_ids(&self) -> Vec<NodeId<K>> {
        let mut nodes: Vec<&NodeRecord<K>> = self.nodes.values().collect();
        nodes.sort_by(|a, b| (!a.is_group(), a.z).cmp(&(!b.is_group(), b.z)).then_with(|| a.id.cmp(&b.id)));
        nodes.into_iter().map(|n| n.id.clone()).collect()
    }

    // === Z-order ===

    /// Move a node above every other node.
    pub fn bring_to_front(&mut self, id: &NodeId<K>) {
        if let Some(node) = self.nodes.get_mut(id) {
            if node.z < self.top_z {
                self.top_z += 1;
                node.z = self.top_z;
            }
        }
    }

    pub fn set_z(&mut self, id: &NodeId<K>, z: i32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.z = z;
            self.top_z = self.top_z.max(z);
        }
    }

    // === Links and topology ===

    fn link_endpoints(&self, link: &LinkRecord<K>) -> Option<((&PinRecord<K>, &NodeRecord<K>), (&PinRecord<K>, &NodeRecord<K>))> {
        let start = self.pins.get(&link.start)?;
        let end = self.pins.get(&link.end)?;
        let start_node = self.nodes.get(&start.node)?;
        let end_node = self.nodes.get(&end.node)?;
        let live = |pin: &PinRecord<K>, node: &NodeRecord<K>| {
            pin.frame == self.frame && node.frame == self.frame && !node.deleted
        };
        (live(start, start_node) && live(end, end_node)).then_some(((start, start_node), (end, end_node)))
    }

    /// Canvas-space curve of a link, `None` while an endpoint is missing.
    pub fn link_curve(&self, id: &LinkId<K>, strength: f32) -> Option<CubicBezier> {
        let link = self.links.get(id)?;
        let ((start, start_node), (end, end_node)) = self.link_endpoints(link)?;
        Some(CubicBezier::for_link(
            start.anchor(start_node.position),
            start.pivot.direction,
            end.anchor(end_node.position),
            end.pivot.direction,
            1.0,
            strength,
        ))
    }

    /// Curve for an in-flight link from `pin` to a free canvas point.
    pub fn pin_to_point_curve(&self, pin: &PinId<K>, point: Vec2, strength: f32) -> Option<CubicBezier> {
        let record = self.pins.get(pin)?;
        let node = self.nodes.get(&record.node)?;
        let start = record.anchor(node.position);
        let curve = match record.kind {
            PinKind::Output => CubicBezier::for_link(start, record.pivot.direction, point, -record.pivot.direction, 1.0, strength),
            PinKind::Input => CubicBezier::for_link(point, -record.pivot.direction, start, record.pivot.direction, 1.0, strength),
        };
        Some(curve)
    }

    /// Live links attached to `pin`.
    pub fn links_of_pin(&self, pin: &PinId<K>) -> Vec<LinkId<K>> {
        self.live_links()
            .filter(|l| &l.start == pin || &l.end == pin)
            .map(|l| l.id.clone())
            .collect()
    }

    /// Live links attached to any pin of `node`.
    pub fn links_of_node(&self, node: &NodeId<K>) -> Vec<LinkId<K>> {
        self.live_links()
            .filter(|l| {
                let owner = |pin: &PinId<K>| self.pins.get(pin).map(|p| &p.node);
                owner(&l.start) == Some(node) || owner(&l.end) == Some(node)
            })
            .map(|l| l.id.clone())
            .collect()
    }

    pub fn has_duplicate_link(&self, start: &PinId<K>, end: &PinId<K>) -> bool {
        self.live_links()
            .any(|l| (&l.start == start && &l.end == end) || (&l.start == end && &l.end == start))
    }

    // === Hit testing (canvas space) ===

    /// Topmost pin under `point`, with the z of its node. Group pins rank below
    /// regular nodes.
    pub fn find_pin_at(&self, point: Vec2, slop: f32) -> Option<(PinId<K>, i32)> {
        let pins = self.live_pins().map(|(pin, node)| SimplePinGeometry {
            id: pin.id.clone(),
            rect: pin.canvas_rect(node.position),
            z: stacking(node),
        });
        find_pin_at(point, pins, slop)
    }

    /// Topmost regular (non-group) node under `point`.
    pub fn find_node_at(&self, point: Vec2) -> Option<(NodeId<K>, i32)> {
        let nodes = self.live_nodes().filter(|n| !n.is_group()).map(node_geometry);
        find_node_at(point, nodes)
    }

    /// Topmost group under `point`.
    pub fn find_group_at(&self, point: Vec2) -> Option<NodeId<K>> {
        let nodes = self.live_nodes().filter(|n| n.is_group()).map(node_geometry);
        find_node_at(point, nodes).map(|(id, _)| id)
    }

    /// Closest link within `tolerance` canvas units of `point`.
    pub fn find_link_at(&self, point: Vec2, tolerance: f32, strength: f32) -> Option<LinkId<K>> {
        let links = self.live_links().filter_map(|l| {
            Some(SimpleLinkGeometry {
                id: l.id.clone(),
                curve: self.link_curve(&l.id, strength)?,
            })
        });
        find_link_at(point, links, tolerance, LINK_HIT_SAMPLES)
    }

    pub fn nodes_in_rect(&self, rect: &Rect) -> Vec<NodeId<K>> {
        nodes_in_rect(rect, self.live_nodes().map(node_geometry))
    }

    pub fn links_in_rect(&self, rect: &Rect, strength: f32) -> Vec<LinkId<K>> {
        let links = self.live_links().filter_map(|l| {
            Some(SimpleLinkGeometry {
                id: l.id.clone(),
                curve: self.link_curve(&l.id, strength)?,
            })
        });
        links_in_rect(rect, links, LINK_HIT_SAMPLES)
    }

    /// Regular nodes lying entirely inside the group `group`.
    pub fn nodes_in_group(&self, group: &NodeId<K>) -> Vec<NodeId<K>> {
        let Some(bounds) = self.nodes.get(group).map(|g| g.bounds()) else {
            return Vec::new();
        };
        self.live_nodes()
            .filter(|n| &n.id != group && !n.is_group() && bounds.contains_rect(&n.bounds()))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Bounds of the live nodes accepted by `filter`.
    pub fn content_bounds(&self, mut filter: impl FnMut(&NodeId<K>) -> bool) -> Option<Rect> {
        Rect::bounding(self.live_nodes().filter(|n| filter(&n.id)).map(|n| n.bounds()))
    }

    // === Deletion ===

    /// Hide a node until it is touched again; removed for good at the next prune.
    pub fn mark_node_deleted(&mut self, id: &NodeId<K>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.deleted = true;
        }
    }

    pub fn mark_link_deleted(&mut self, id: &LinkId<K>) {
        if let Some(link) = self.links.get_mut(id) {
            link.deleted = true;
        }
    }

    /// Remove every record not touched this frame (or marked deleted).
    ///
    /// Cascades: pins of removed nodes go too, and so do links whose pins are
    /// gone. Runs in a single pass over each table.
    pub fn prune(&mut self) -> PruneReport<K> {
        let frame = self.frame;
        let mut report = PruneReport {
            nodes: Vec::new(),
            pins: Vec::new(),
            links: Vec::new(),
        };

        self.nodes.retain(|id, node| {
            let keep = node.frame == frame && !node.deleted;
            if !keep {
                report.nodes.push(id.clone());
            }
            keep
        });

        let nodes = &self.nodes;
        self.pins.retain(|id, pin| {
            let keep = pin.frame == frame && nodes.contains_key(&pin.node);
            if !keep {
                report.pins.push(id.clone());
            }
            keep
        });

        let pins = &self.pins;
        self.links.retain(|id, link| {
            let keep = link.frame == frame
                && !link.deleted
                && pins.contains_key(&link.start)
                && pins.contains_key(&link.end);
            if !keep {
                report.links.push(id.clone());
            }
            keep
        });

        report
    }
}

/// Stacking key: groups are always below regular nodes.
fn stacking<K>(node: &NodeRecord<K>) -> i32 {
    if node.group_size.is_some() {
        node.z.saturating_sub(i32::MAX / 2)
    } else {
        node.z
    }
}

fn node_geometry<K: ObjectKey>(node: &NodeRecord<K>) -> SimpleNodeGeometry<NodeId<K>> {
    SimpleNodeGeometry {
        id: node.id.clone(),
        rect: node.bounds(),
        z: stacking(node),
    }
}
