//! Style table with push/pop scopes.
//!
//! Every push must be matched by a pop within the same frame. Pops that
//! underflow are refused; stacks left non-empty at the end of a frame are
//! reported and unwound so the next frame starts from the base style.

use slint::Color;

use crate::error::Misuse;
use crate::geometry::Vec2;

/// Indices into the style color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleColor {
    Background,
    Grid,
    NodeBackground,
    NodeBorder,
    HoveredNodeBorder,
    SelectedNodeBorder,
    NodeSelectionRect,
    NodeSelectionRectBorder,
    Link,
    HoveredLinkBorder,
    SelectedLinkBorder,
    HighlightLinkBorder,
    /// In-flight link over a candidate the caller accepted.
    LinkAccepted,
    /// In-flight link over a candidate the caller or a validator rejected.
    LinkRejected,
    PinRect,
    PinRectBorder,
    GroupBackground,
    GroupBorder,
}

impl StyleColor {
    pub const COUNT: usize = 18;

    pub const ALL: [StyleColor; Self::COUNT] = [
        StyleColor::Background,
        StyleColor::Grid,
        StyleColor::NodeBackground,
        StyleColor::NodeBorder,
        StyleColor::HoveredNodeBorder,
        StyleColor::SelectedNodeBorder,
        StyleColor::NodeSelectionRect,
        StyleColor::NodeSelectionRectBorder,
        StyleColor::Link,
        StyleColor::HoveredLinkBorder,
        StyleColor::SelectedLinkBorder,
        StyleColor::HighlightLinkBorder,
        StyleColor::LinkAccepted,
        StyleColor::LinkRejected,
        StyleColor::PinRect,
        StyleColor::PinRectBorder,
        StyleColor::GroupBackground,
        StyleColor::GroupBorder,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn default_color(self) -> Color {
        let rgba = |r, g, b, a| Color::from_argb_u8(a, r, g, b);
        match self {
            StyleColor::Background => rgba(60, 60, 70, 200),
            StyleColor::Grid => rgba(120, 120, 120, 40),
            StyleColor::NodeBackground => rgba(32, 32, 32, 200),
            StyleColor::NodeBorder => rgba(255, 255, 255, 96),
            StyleColor::HoveredNodeBorder => rgba(50, 176, 255, 255),
            StyleColor::SelectedNodeBorder => rgba(255, 176, 50, 255),
            StyleColor::NodeSelectionRect => rgba(5, 130, 255, 64),
            StyleColor::NodeSelectionRectBorder => rgba(5, 130, 255, 128),
            StyleColor::Link => rgba(255, 255, 255, 255),
            StyleColor::HoveredLinkBorder => rgba(50, 176, 255, 255),
            StyleColor::SelectedLinkBorder => rgba(255, 176, 50, 255),
            StyleColor::HighlightLinkBorder => rgba(204, 105, 0, 255),
            StyleColor::LinkAccepted => rgba(80, 220, 80, 255),
            StyleColor::LinkRejected => rgba(220, 60, 60, 255),
            StyleColor::PinRect => rgba(60, 180, 255, 100),
            StyleColor::PinRectBorder => rgba(60, 180, 255, 128),
            StyleColor::GroupBackground => rgba(0, 0, 0, 160),
            StyleColor::GroupBorder => rgba(255, 255, 255, 32),
        }
    }
}

/// A style variable together with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleVar {
    /// Left, top, right, bottom.
    NodePadding([f32; 4]),
    NodeRounding(f32),
    NodeBorderWidth(f32),
    HoveredNodeBorderWidth(f32),
    SelectedNodeBorderWidth(f32),
    PinRounding(f32),
    PinBorderWidth(f32),
    LinkStrength(f32),
    LinkThickness(f32),
    /// Tangent of links leaving output pins.
    SourceDirection(Vec2),
    /// Tangent of links entering input pins.
    TargetDirection(Vec2),
    /// Default navigation animation duration, in seconds.
    ScrollDuration(f32),
    PivotAlignment(Vec2),
    PivotSize(Vec2),
    PivotScale(Vec2),
    GroupRounding(f32),
    GroupBorderWidth(f32),
    GridSpacing(f32),
    HighlightConnectedLinks(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub node_padding: [f32; 4],
    pub node_rounding: f32,
    pub node_border_width: f32,
    pub hovered_node_border_width: f32,
    pub selected_node_border_width: f32,
    pub pin_rounding: f32,
    pub pin_border_width: f32,
    pub link_strength: f32,
    pub link_thickness: f32,
    pub source_direction: Vec2,
    pub target_direction: Vec2,
    pub scroll_duration: f32,
    pub pivot_alignment: Vec2,
    pub pivot_size: Vec2,
    pub pivot_scale: Vec2,
    pub group_rounding: f32,
    pub group_border_width: f32,
    pub grid_spacing: f32,
    pub highlight_connected_links: bool,
    colors: [Color; StyleColor::COUNT],
}

impl Default for Style {
    fn default() -> Self {
        Self {
            node_padding: [8.0, 8.0, 8.0, 8.0],
            node_rounding: 12.0,
            node_border_width: 1.5,
            hovered_node_border_width: 3.5,
            selected_node_border_width: 3.5,
            pin_rounding: 4.0,
            pin_border_width: 0.0,
            link_strength: 100.0,
            link_thickness: 2.0,
            source_direction: Vec2::new(1.0, 0.0),
            target_direction: Vec2::new(-1.0, 0.0),
            scroll_duration: 0.35,
            pivot_alignment: Vec2::new(0.5, 0.5),
            pivot_size: Vec2::ZERO,
            pivot_scale: Vec2::new(1.0, 1.0),
            group_rounding: 6.0,
            group_border_width: 1.0,
            grid_spacing: 32.0,
            highlight_connected_links: false,
            colors: StyleColor::ALL.map(StyleColor::default_color),
        }
    }
}

impl Style {
    pub fn color(&self, which: StyleColor) -> Color {
        self.colors[which.index()]
    }

    pub fn set_color(&mut self, which: StyleColor, color: Color) {
        self.colors[which.index()] = color;
    }

    /// Current value of the variable named by `var` (its payload is ignored).
    pub fn get(&self, var: StyleVar) -> StyleVar {
        match var {
            StyleVar::NodePadding(_) => StyleVar::NodePadding(self.node_padding),
            StyleVar::NodeRounding(_) => StyleVar::NodeRounding(self.node_rounding),
            StyleVar::NodeBorderWidth(_) => StyleVar::NodeBorderWidth(self.node_border_width),
            StyleVar::HoveredNodeBorderWidth(_) => StyleVar::HoveredNodeBorderWidth(self.hovered_node_border_width),
            StyleVar::SelectedNodeBorderWidth(_) => StyleVar::SelectedNodeBorderWidth(self.selected_node_border_width),
            StyleVar::PinRounding(_) => StyleVar::PinRounding(self.pin_rounding),
            StyleVar::PinBorderWidth(_) => StyleVar::PinBorderWidth(self.pin_border_width),
            StyleVar::LinkStrength(_) => StyleVar::LinkStrength(self.link_strength),
            StyleVar::LinkThickness(_) => StyleVar::LinkThickness(self.link_thickness),
            StyleVar::SourceDirection(_) => StyleVar::SourceDirection(self.source_direction),
            StyleVar::TargetDirection(_) => StyleVar::TargetDirection(self.target_direction),
            StyleVar::ScrollDuration(_) => StyleVar::ScrollDuration(self.scroll_duration),
            StyleVar::PivotAlignment(_) => StyleVar::PivotAlignment(self.pivot_alignment),
            StyleVar::PivotSize(_) => StyleVar::PivotSize(self.pivot_size),
            StyleVar::PivotScale(_) => StyleVar::PivotScale(self.pivot_scale),
            StyleVar::GroupRounding(_) => StyleVar::GroupRounding(self.group_rounding),
            StyleVar::GroupBorderWidth(_) => StyleVar::GroupBorderWidth(self.group_border_width),
            StyleVar::GridSpacing(_) => StyleVar::GridSpacing(self.grid_spacing),
            StyleVar::HighlightConnectedLinks(_) => StyleVar::HighlightConnectedLinks(self.highlight_connected_links),
        }
    }

    /// Write `var` and return the value it replaced.
    pub fn set(&mut self, var: StyleVar) -> StyleVar {
        let previous = self.get(var);
        match var {
            StyleVar::NodePadding(v) => self.node_padding = v,
            StyleVar::NodeRounding(v) => self.node_rounding = v,
            StyleVar::NodeBorderWidth(v) => self.node_border_width = v,
            StyleVar::HoveredNodeBorderWidth(v) => self.hovered_node_border_width = v,
            StyleVar::SelectedNodeBorderWidth(v) => self.selected_node_border_width = v,
            StyleVar::PinRounding(v) => self.pin_rounding = v,
            StyleVar::PinBorderWidth(v) => self.pin_border_width = v,
            StyleVar::LinkStrength(v) => self.link_strength = v,
            StyleVar::LinkThickness(v) => self.link_thickness = v,
            StyleVar::SourceDirection(v) => self.source_direction = v,
            StyleVar::TargetDirection(v) => self.target_direction = v,
            StyleVar::ScrollDuration(v) => self.scroll_duration = v,
            StyleVar::PivotAlignment(v) => self.pivot_alignment = v,
            StyleVar::PivotSize(v) => self.pivot_size = v,
            StyleVar::PivotScale(v) => self.pivot_scale = v,
            StyleVar::GroupRounding(v) => self.group_rounding = v,
            StyleVar::GroupBorderWidth(v) => self.group_border_width = v,
            StyleVar::GridSpacing(v) => self.grid_spacing = v,
            StyleVar::HighlightConnectedLinks(v) => self.highlight_connected_links = v,
        }
        previous
    }
}

/// Style values a node was declared under, captured at `begin_node` so that
/// pushes scoped around one node only affect that node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub padding: [f32; 4],
    pub rounding: f32,
    pub border_width: f32,
    pub hovered_border_width: f32,
    pub selected_border_width: f32,
    pub background: Color,
    pub border: Color,
    pub hovered_border: Color,
    pub selected_border: Color,
    pub group_rounding: f32,
    pub group_border_width: f32,
    pub group_background: Color,
    pub group_border: Color,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Style::default().node_style()
    }
}

/// Style values a pin was declared under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinStyle {
    pub rounding: f32,
    pub border_width: f32,
    pub fill: Color,
    pub border: Color,
}

impl Default for PinStyle {
    fn default() -> Self {
        Style::default().pin_style()
    }
}

impl Style {
    pub fn node_style(&self) -> NodeStyle {
        NodeStyle {
            padding: self.node_padding,
            rounding: self.node_rounding,
            border_width: self.node_border_width,
            hovered_border_width: self.hovered_node_border_width,
            selected_border_width: self.selected_node_border_width,
            background: self.color(StyleColor::NodeBackground),
            border: self.color(StyleColor::NodeBorder),
            hovered_border: self.color(StyleColor::HoveredNodeBorder),
            selected_border: self.color(StyleColor::SelectedNodeBorder),
            group_rounding: self.group_rounding,
            group_border_width: self.group_border_width,
            group_background: self.color(StyleColor::GroupBackground),
            group_border: self.color(StyleColor::GroupBorder),
        }
    }

    pub fn pin_style(&self) -> PinStyle {
        PinStyle {
            rounding: self.pin_rounding,
            border_width: self.pin_border_width,
            fill: self.color(StyleColor::PinRect),
            border: self.color(StyleColor::PinRectBorder),
        }
    }
}

/// The live style plus the saved values of every open push.
#[derive(Debug, Default)]
pub struct StyleStack {
    style: Style,
    vars: Vec<StyleVar>,
    colors: Vec<(StyleColor, Color)>,
}

impl StyleStack {
    pub fn new(style: Style) -> Self {
        Self {
            style,
            vars: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Mutable access to the base style. Changes made while pushes are open
    /// are overwritten when those pushes are popped.
    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    pub fn push_var(&mut self, var: StyleVar) {
        let previous = self.style.set(var);
        self.vars.push(previous);
    }

    pub fn pop_var(&mut self, count: usize) -> Result<(), Misuse> {
        if count > self.vars.len() {
            return Err(Misuse::StylePopUnderflow {
                what: "style vars",
                count,
                depth: self.vars.len(),
            });
        }
        for _ in 0..count {
            if let Some(previous) = self.vars.pop() {
                self.style.set(previous);
            }
        }
        Ok(())
    }

    pub fn push_color(&mut self, which: StyleColor, color: Color) {
        let previous = self.style.color(which);
        self.style.set_color(which, color);
        self.colors.push((which, previous));
    }

    pub fn pop_color(&mut self, count: usize) -> Result<(), Misuse> {
        if count > self.colors.len() {
            return Err(Misuse::StylePopUnderflow {
                what: "style colors",
                count,
                depth: self.colors.len(),
            });
        }
        for _ in 0..count {
            if let Some((which, previous)) = self.colors.pop() {
                self.style.set_color(which, previous);
            }
        }
        Ok(())
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.vars.len(), self.colors.len())
    }

    /// Pop everything still pushed. Returns the imbalance, if any.
    pub fn unwind(&mut self) -> Option<Misuse> {
        let (vars, colors) = self.depth();
        if vars == 0 && colors == 0 {
            return None;
        }
        // Counts come from depth(), so neither pop can underflow
        let _ = self.pop_var(vars);
        let _ = self.pop_color(colors);
        Some(Misuse::UnbalancedStyle { vars, colors })
    }
}
