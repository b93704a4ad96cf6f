//! Editor configuration: persistence hooks and interaction tuning.
//!
//! Hooks are boxed closures; anything a hook needs (a file handle, an app
//! model) is captured by the closure. A hook left `None` disables that
//! persistence channel without affecting interaction.

use std::fmt;
use std::path::PathBuf;

use crate::input::MouseButton;
use crate::settings::SaveReasonFlags;
use crate::style::Style;

pub type BeginSaveSessionHook = Box<dyn FnMut()>;
pub type EndSaveSessionHook = Box<dyn FnMut()>;
/// Receives the whole settings blob; returns false when it could not be stored.
pub type SaveSettingsHook = Box<dyn FnMut(&[u8], SaveReasonFlags) -> bool>;
/// Returns the whole settings blob, `None` (or empty) when there is none.
pub type LoadSettingsHook = Box<dyn FnMut() -> Option<Vec<u8>>>;
/// Receives one node's settings, keyed by the node id's canonical string.
pub type SaveNodeSettingsHook = Box<dyn FnMut(&str, &[u8], SaveReasonFlags) -> bool>;
pub type LoadNodeSettingsHook = Box<dyn FnMut(&str) -> Option<Vec<u8>>>;

pub struct Config {
    /// Settings file used by the default hooks when `save_settings` or
    /// `load_settings` are unset.
    pub settings_file: Option<PathBuf>,
    pub begin_save_session: Option<BeginSaveSessionHook>,
    pub end_save_session: Option<EndSaveSessionHook>,
    pub save_settings: Option<SaveSettingsHook>,
    pub load_settings: Option<LoadSettingsHook>,
    pub save_node_settings: Option<SaveNodeSettingsHook>,
    pub load_node_settings: Option<LoadNodeSettingsHook>,

    /// Pointer travel (screen pixels) before a press turns into a drag.
    pub drag_threshold: f32,
    /// Link hit distance in screen pixels; constant on screen at any zoom.
    pub link_hit_tolerance: f32,
    /// Extra screen pixels around pins that still count as a hit.
    pub pin_hit_slop: f32,
    /// Permit links between two pins of the same node.
    pub allow_same_node_links: bool,
    pub zoom_limits: (f32, f32),
    /// Discrete zoom steps walked by the mouse wheel. Empty means smooth zoom.
    pub zoom_levels: Vec<f32>,
    /// Screen pixels kept free around content when navigating to it.
    pub navigate_margin: f32,
    /// Size of the group resize handle in screen pixels.
    pub group_resize_handle: f32,

    pub drag_button: MouseButton,
    /// Starts a rubber band from any target when it differs from
    /// `drag_button`; clicks with it select.
    pub select_button: MouseButton,
    pub navigate_button: MouseButton,
    pub context_menu_button: MouseButton,

    pub style: Style,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_file: None,
            begin_save_session: None,
            end_save_session: None,
            save_settings: None,
            load_settings: None,
            save_node_settings: None,
            load_node_settings: None,
            drag_threshold: 6.0,
            link_hit_tolerance: 6.0,
            pin_hit_slop: 2.0,
            allow_same_node_links: false,
            zoom_limits: (0.01, 15.0),
            zoom_levels: vec![
                0.1, 0.15, 0.2, 0.25, 0.33, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0,
                7.0, 8.0, 9.0, 10.0, 12.0, 15.0,
            ],
            navigate_margin: 50.0,
            group_resize_handle: 12.0,
            drag_button: MouseButton::Primary,
            select_button: MouseButton::Primary,
            navigate_button: MouseButton::Secondary,
            context_menu_button: MouseButton::Secondary,
            style: Style::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("settings_file", &self.settings_file)
            .field("save_settings", &self.save_settings.is_some())
            .field("load_settings", &self.load_settings.is_some())
            .field("save_node_settings", &self.save_node_settings.is_some())
            .field("load_node_settings", &self.load_node_settings.is_some())
            .field("drag_threshold", &self.drag_threshold)
            .field("link_hit_tolerance", &self.link_hit_tolerance)
            .field("allow_same_node_links", &self.allow_same_node_links)
            .field("zoom_limits", &self.zoom_limits)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    pub fn with_save_session(mut self, begin: impl FnMut() + 'static, end: impl FnMut() + 'static) -> Self {
        self.begin_save_session = Some(Box::new(begin));
        self.end_save_session = Some(Box::new(end));
        self
    }

    pub fn with_save_settings(mut self, hook: impl FnMut(&[u8], SaveReasonFlags) -> bool + 'static) -> Self {
        self.save_settings = Some(Box::new(hook));
        self
    }

    pub fn with_load_settings(mut self, hook: impl FnMut() -> Option<Vec<u8>> + 'static) -> Self {
        self.load_settings = Some(Box::new(hook));
        self
    }

    pub fn with_save_node_settings(
        mut self,
        hook: impl FnMut(&str, &[u8], SaveReasonFlags) -> bool + 'static,
    ) -> Self {
        self.save_node_settings = Some(Box::new(hook));
        self
    }

    pub fn with_load_node_settings(mut self, hook: impl FnMut(&str) -> Option<Vec<u8>> + 'static) -> Self {
        self.load_node_settings = Some(Box::new(hook));
        self
    }

    pub fn with_drag_threshold(mut self, pixels: f32) -> Self {
        self.drag_threshold = pixels.max(0.0);
        self
    }

    pub fn with_link_hit_tolerance(mut self, pixels: f32) -> Self {
        self.link_hit_tolerance = pixels.max(0.0);
        self
    }

    pub fn with_same_node_links(mut self, allow: bool) -> Self {
        self.allow_same_node_links = allow;
        self
    }

    pub fn with_zoom_limits(mut self, min: f32, max: f32) -> Self {
        self.zoom_limits = (min.min(max), max.max(min));
        self
    }

    pub fn with_zoom_levels(mut self, levels: Vec<f32>) -> Self {
        self.zoom_levels = levels;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}
