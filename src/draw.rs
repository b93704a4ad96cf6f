//! Renderer-neutral draw commands grouped into ordered channels.
//!
//! The editor fills the channels with what it draws itself (grid, groups,
//! links, node frames, pins, rubber band, in-flight link) at the end of every
//! frame; hosts add their own content to the same channels while declaring.
//! Within a channel the editor's commands come first.

use std::collections::BTreeMap;

use slint::Color;

use crate::geometry::{Rect, Vec2};
use crate::path::CubicBezier;

/// Draw layers, back to front. Node channels are ordered by z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawChannel {
    Background,
    Grid,
    Groups,
    Links,
    Node(i32),
    Foreground,
    /// Overlays shown while a link is being dragged (candidate hints).
    Hint,
}

/// Screen-space primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color, rounding: f32 },
    StrokeRect { rect: Rect, color: Color, rounding: f32, thickness: f32 },
    Line { from: Vec2, to: Vec2, color: Color, thickness: f32 },
    Bezier { curve: CubicBezier, color: Color, thickness: f32 },
    /// SVG path data, for renderers that draw from path text.
    Path { data: String, color: Color, thickness: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    channels: BTreeMap<DrawChannel, Vec<DrawCommand>>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn push(&mut self, channel: DrawChannel, command: DrawCommand) {
        self.channels.entry(channel).or_default().push(command);
    }

    pub fn fill_rect(&mut self, channel: DrawChannel, rect: Rect, color: Color, rounding: f32) {
        self.push(channel, DrawCommand::FillRect { rect, color, rounding });
    }

    pub fn stroke_rect(&mut self, channel: DrawChannel, rect: Rect, color: Color, rounding: f32, thickness: f32) {
        if thickness > 0.0 {
            self.push(channel, DrawCommand::StrokeRect { rect, color, rounding, thickness });
        }
    }

    pub fn line(&mut self, channel: DrawChannel, from: Vec2, to: Vec2, color: Color, thickness: f32) {
        self.push(channel, DrawCommand::Line { from, to, color, thickness });
    }

    pub fn bezier(&mut self, channel: DrawChannel, curve: CubicBezier, color: Color, thickness: f32) {
        self.push(channel, DrawCommand::Bezier { curve, color, thickness });
    }

    pub fn channel(&self, channel: DrawChannel) -> &[DrawCommand] {
        self.channels.get(&channel).map_or(&[], Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = DrawChannel> + '_ {
        self.channels.keys().copied()
    }

    /// All commands back to front.
    pub fn iter(&self) -> impl Iterator<Item = (DrawChannel, &DrawCommand)> + '_ {
        self.channels
            .iter()
            .flat_map(|(channel, commands)| commands.iter().map(move |c| (*channel, c)))
    }

    /// Move every command of `other` to the end of the matching channel.
    pub fn append(&mut self, other: &mut DrawList) {
        for (channel, mut commands) in std::mem::take(&mut other.channels) {
            self.channels.entry(channel).or_default().append(&mut commands);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
