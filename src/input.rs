//! Per-frame input snapshot supplied by the host toolkit.

use bitflags::bitflags;

use crate::geometry::Vec2;

/// Pointer buttons the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [MouseButton::Primary, MouseButton::Secondary, MouseButton::Middle];

    fn index(self) -> usize {
        match self {
            MouseButton::Primary => 0,
            MouseButton::Secondary => 1,
            MouseButton::Middle => 2,
        }
    }
}

/// Edge and level state of one button for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub down: bool,
    /// Went down this frame.
    pub pressed: bool,
    /// Went up this frame.
    pub released: bool,
    pub double_clicked: bool,
}

bitflags! {
    /// Modifier keys held during the frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl Modifiers {
    /// Modifiers that turn a click or rubber band into an additive one.
    pub fn is_additive(self) -> bool {
        self.intersects(Modifiers::CTRL | Modifiers::SHIFT | Modifiers::SUPER)
    }
}

/// Everything the editor reads from the host for one frame.
///
/// Positions are in screen space, relative to the editor's viewport origin.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub mouse_pos: Vec2,
    pub buttons: [ButtonState; 3],
    /// Wheel steps, positive away from the user.
    pub wheel: f32,
    pub modifiers: Modifiers,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// The delete key went down this frame.
    pub delete_pressed: bool,
    /// The "frame content" key went down this frame.
    pub navigate_pressed: bool,
    /// The host lost pointer capture; any gesture in progress is cancelled.
    pub capture_lost: bool,
}

impl InputSnapshot {
    pub fn new(mouse_pos: Vec2) -> Self {
        Self {
            mouse_pos,
            ..Self::default()
        }
    }

    pub fn button(&self, button: MouseButton) -> ButtonState {
        self.buttons[button.index()]
    }

    pub fn button_mut(&mut self, button: MouseButton) -> &mut ButtonState {
        &mut self.buttons[button.index()]
    }

    // === Builders ===

    pub fn at(mut self, mouse_pos: Vec2) -> Self {
        self.mouse_pos = mouse_pos;
        self
    }

    pub fn with_button_down(mut self, button: MouseButton) -> Self {
        self.button_mut(button).down = true;
        self
    }

    /// The button goes down this frame.
    pub fn with_press(mut self, button: MouseButton) -> Self {
        let state = self.button_mut(button);
        state.down = true;
        state.pressed = true;
        self
    }

    /// The button goes up this frame.
    pub fn with_release(mut self, button: MouseButton) -> Self {
        let state = self.button_mut(button);
        state.down = false;
        state.released = true;
        self
    }

    pub fn with_double_click(mut self, button: MouseButton) -> Self {
        let state = self.button_mut(button);
        state.down = true;
        state.pressed = true;
        state.double_clicked = true;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_wheel(mut self, wheel: f32) -> Self {
        self.wheel = wheel;
        self
    }

    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    pub fn with_delete(mut self) -> Self {
        self.delete_pressed = true;
        self
    }

    pub fn with_navigate(mut self) -> Self {
        self.navigate_pressed = true;
        self
    }

    pub fn with_capture_lost(mut self) -> Self {
        self.capture_lost = true;
        self
    }
}
