//! Per-frame keyboard and mouse state.

use std::collections::HashSet;

pub use winit::keyboard::KeyCode;

use crate::events::{EventSink, KeyAction, KeyEvent, MouseAction, MouseButton, MouseEvent};

/// Stock [`EventSink`] that accumulates input between frames.
///
/// "Just" sets and deltas cover the events seen since the last
/// [`begin_frame`](Self::begin_frame).
#[derive(Debug, Default)]
pub struct InputState {
    held_keys: HashSet<KeyCode>,
    keys_down: HashSet<KeyCode>,
    keys_up: HashSet<KeyCode>,

    held_buttons: HashSet<MouseButton>,
    buttons_down: HashSet<MouseButton>,
    buttons_up: HashSet<MouseButton>,

    cursor: (f32, f32),
    cursor_delta: (f32, f32),
    scroll: (f32, f32),
    framebuffer_size: Option<(u32, u32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame state. Held keys and buttons survive.
    pub fn begin_frame(&mut self) {
        self.keys_down.clear();
        self.keys_up.clear();
        self.buttons_down.clear();
        self.buttons_up.clear();
        self.cursor_delta = (0.0, 0.0);
        self.scroll = (0.0, 0.0);
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.held_keys.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keys_up.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn is_button_just_released(&self, button: MouseButton) -> bool {
        self.buttons_up.contains(&button)
    }

    pub fn cursor(&self) -> (f32, f32) {
        self.cursor
    }

    /// Cursor travel accumulated over the frame.
    pub fn cursor_delta(&self) -> (f32, f32) {
        self.cursor_delta
    }

    pub fn scroll(&self) -> (f32, f32) {
        self.scroll
    }

    /// Latest framebuffer size reported by the window, if any.
    pub fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.framebuffer_size
    }
}

impl EventSink for InputState {
    fn on_framebuffer_resize(&mut self, width: u32, height: u32) {
        self.framebuffer_size = Some((width, height));
    }

    fn on_key(&mut self, event: &KeyEvent) {
        match event.action {
            KeyAction::Down => {
                // Repeats arrive as further presses; only the first counts.
                if self.held_keys.insert(event.key) {
                    self.keys_down.insert(event.key);
                }
            }
            KeyAction::Up => {
                if self.held_keys.remove(&event.key) {
                    self.keys_up.insert(event.key);
                }
            }
        }
    }

    fn on_mouse(&mut self, event: &MouseEvent) {
        match event.action {
            MouseAction::Move => {
                let (x, y) = event.position;
                self.cursor_delta.0 += x - self.cursor.0;
                self.cursor_delta.1 += y - self.cursor.1;
                self.cursor = event.position;
            }
            MouseAction::Down(button) => {
                if self.held_buttons.insert(button) {
                    self.buttons_down.insert(button);
                }
            }
            MouseAction::Up(button) => {
                if self.held_buttons.remove(&button) {
                    self.buttons_up.insert(button);
                }
            }
        }
    }

    fn on_scroll(&mut self, dx: f32, dy: f32) {
        self.scroll.0 += dx;
        self.scroll.1 += dy;
    }
}
