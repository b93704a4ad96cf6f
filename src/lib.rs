//! # Blueprint Canvas
//!
//! Interaction engine for node-graph ("blueprint") editors embedded in an
//! immediate-mode frame loop. Every frame the host declares nodes, pins and
//! links; the engine keeps their persistent state (position, size, z-order,
//! selection, pan and zoom), recognizes gestures from the pointer input and
//! reports intents such as "connect these two pins" or "delete this node"
//! back to the host for approval.
//!
//! ## Features
//!
//! - **Generic identifiers** - integer or application-defined composite keys via [`ObjectKey`]
//! - **Frame reconciliation** - objects live while declared and are pruned when they stop being declared
//! - **Caller-approved edits** - link creation and deletion surface as [`PendingChange`]s
//! - **Navigation** - wheel zoom, panning, animated navigate-to-content and navigate-to-selection
//! - **Persistence hooks** - node positions, view and selection saved through closures in [`Config`]
//! - **Renderer neutral** - output is a [`DrawList`] of screen-space primitives
//!
//! ## Core Types
//!
//! - [`EditorContext`] - one editor instance and its per-frame API
//! - [`ObjectRegistry`] - node, pin and link records with hit testing
//! - [`ViewController`] - pan/zoom state and view animations
//! - [`SelectionManager`] - selected nodes and links with change detection
//! - [`StyleStack`] - style table with push/pop scopes
//! - [`SettingsBridge`] - calls the configured save/load hooks
//!
//! ## Helpers
//!
//! - [`grid_svg_path`] - SVG path for the background grid
//! - [`CubicBezier::to_svg_path`] - SVG path for link curves
//! - [`find_pin_at`] / [`find_link_at`] - standalone hit testing

pub mod config;
pub mod draw;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod id;
pub mod input;
pub mod interaction;
pub mod path;
pub mod registry;
pub mod selection;
pub mod settings;
pub mod style;
pub mod validation;
pub mod view;

pub use config::Config;
pub use draw::{DrawChannel, DrawCommand, DrawList};
pub use editor::EditorContext;
pub use error::{Misuse, SettingsError};
pub use geometry::{Rect, Vec2, ViewTransform};
pub use grid::{grid_lines, grid_svg_path};
pub use hit_test::{
    find_link_at, find_node_at, find_pin_at, links_in_rect, nodes_in_rect, LinkGeometry, NodeGeometry,
    PinGeometry, SimpleLinkGeometry, SimpleNodeGeometry, SimplePinGeometry,
};
pub use id::{LinkId, NodeId, ObjectKey, PinId, PinKind};
pub use input::{ButtonState, InputSnapshot, Modifiers, MouseButton};
pub use interaction::{ChangeKind, ContextMenu, GestureKind, HitTarget, PendingChange};
pub use path::CubicBezier;
pub use registry::{LinkRecord, NodeRecord, ObjectRegistry, PinPivot, PinRecord, PruneReport};
pub use selection::{Selectable, SelectionManager};
pub use settings::{EditorSettings, NodeSettings, SaveReasonFlags, SettingsBridge, ViewSettings};
pub use style::{NodeStyle, PinStyle, Style, StyleColor, StyleStack, StyleVar};
pub use validation::{
    normalize_link, BasicLinkValidator, CompositeValidator, LinkValidator, NoDuplicatesValidator, ValidationError,
    ValidationResult,
};
pub use view::ViewController;
