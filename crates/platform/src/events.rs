//! Event sink and the winit translation feeding it.
//!
//! The window owns its sink; nothing is registered globally. Events carry
//! the window clock's time in seconds.

use vesper_core::Timer;
use winit::event::{ElementState, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels per scroll "line" when a device reports pixel deltas.
const PIXELS_PER_LINE: f32 = 38.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        match button {
            winit::event::MouseButton::Left => Some(Self::Left),
            winit::event::MouseButton::Right => Some(Self::Right),
            winit::event::MouseButton::Middle => Some(Self::Middle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub action: KeyAction,
    pub time_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Move,
    Down(MouseButton),
    Up(MouseButton),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub action: MouseAction,
    /// Cursor position in physical pixels.
    pub position: (f32, f32),
    pub time_sec: f64,
}

/// Receives translated window events. Every method defaults to a no-op.
pub trait EventSink {
    fn on_framebuffer_resize(&mut self, _width: u32, _height: u32) {}

    fn on_key(&mut self, _event: &KeyEvent) {}

    fn on_mouse(&mut self, _event: &MouseEvent) {}

    /// Scroll in lines; positive y scrolls up.
    fn on_scroll(&mut self, _dx: f32, _dy: f32) {}
}

/// Turns raw winit input into sink calls.
///
/// Tracks the last cursor position so button events can report where they
/// happened.
#[derive(Debug, Default)]
pub struct EventTranslator {
    timer: Timer,
    cursor: (f32, f32),
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cursor(&self) -> (f32, f32) {
        self.cursor
    }

    pub fn resized(&mut self, width: u32, height: u32, sink: &mut impl EventSink) {
        sink.on_framebuffer_resize(width, height);
    }

    /// Keys without a known key code are dropped.
    pub fn key(&mut self, key: PhysicalKey, state: ElementState, sink: &mut impl EventSink) {
        let PhysicalKey::Code(key) = key else {
            return;
        };
        let action = match state {
            ElementState::Pressed => KeyAction::Down,
            ElementState::Released => KeyAction::Up,
        };
        sink.on_key(&KeyEvent {
            key,
            action,
            time_sec: self.timer.elapsed_secs(),
        });
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64, sink: &mut impl EventSink) {
        self.cursor = (x as f32, y as f32);
        sink.on_mouse(&MouseEvent {
            action: MouseAction::Move,
            position: self.cursor,
            time_sec: self.timer.elapsed_secs(),
        });
    }

    /// Buttons other than left, right and middle are dropped.
    pub fn mouse_button(
        &mut self,
        button: winit::event::MouseButton,
        state: ElementState,
        sink: &mut impl EventSink,
    ) {
        let Some(button) = MouseButton::from_winit(button) else {
            return;
        };
        let action = match state {
            ElementState::Pressed => MouseAction::Down(button),
            ElementState::Released => MouseAction::Up(button),
        };
        sink.on_mouse(&MouseEvent {
            action,
            position: self.cursor,
            time_sec: self.timer.elapsed_secs(),
        });
    }

    pub fn scroll(&mut self, delta: MouseScrollDelta, sink: &mut impl EventSink) {
        let (dx, dy) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x, y),
            MouseScrollDelta::PixelDelta(p) => {
                (p.x as f32 / PIXELS_PER_LINE, p.y as f32 / PIXELS_PER_LINE)
            }
        };
        sink.on_scroll(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        resizes: Vec<(u32, u32)>,
        keys: Vec<KeyEvent>,
        mouse: Vec<MouseEvent>,
        scrolls: Vec<(f32, f32)>,
    }

    impl EventSink for Recorder {
        fn on_framebuffer_resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn on_key(&mut self, event: &KeyEvent) {
            self.keys.push(*event);
        }

        fn on_mouse(&mut self, event: &MouseEvent) {
            self.mouse.push(*event);
        }

        fn on_scroll(&mut self, dx: f32, dy: f32) {
            self.scrolls.push((dx, dy));
        }
    }

    #[test]
    fn test_resize_forwarded() {
        let mut sink = Recorder::default();
        EventTranslator::new().resized(640, 480, &mut sink);
        assert_eq!(sink.resizes, vec![(640, 480)]);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut translator = EventTranslator::new();
        let mut sink = Recorder::default();

        translator.key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Pressed, &mut sink);
        translator.key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Released, &mut sink);

        let actions: Vec<_> = sink.keys.iter().map(|e| (e.key, e.action)).collect();
        assert_eq!(
            actions,
            vec![(KeyCode::KeyW, KeyAction::Down), (KeyCode::KeyW, KeyAction::Up)]
        );
        assert!(sink.keys[1].time_sec >= sink.keys[0].time_sec);
    }

    #[test]
    fn test_unidentified_key_dropped() {
        let mut sink = Recorder::default();
        EventTranslator::new().key(
            PhysicalKey::Unidentified(winit::keyboard::NativeKeyCode::Unidentified),
            ElementState::Pressed,
            &mut sink,
        );
        assert!(sink.keys.is_empty());
    }

    #[test]
    fn test_button_reports_last_cursor_position() {
        let mut translator = EventTranslator::new();
        let mut sink = Recorder::default();

        translator.cursor_moved(12.0, 34.0, &mut sink);
        translator.mouse_button(winit::event::MouseButton::Right, ElementState::Pressed, &mut sink);

        assert_eq!(sink.mouse.len(), 2);
        assert_eq!(sink.mouse[0].action, MouseAction::Move);
        assert_eq!(sink.mouse[1].action, MouseAction::Down(MouseButton::Right));
        assert_eq!(sink.mouse[1].position, (12.0, 34.0));
    }

    #[test]
    fn test_extra_buttons_dropped() {
        let mut sink = Recorder::default();
        EventTranslator::new().mouse_button(
            winit::event::MouseButton::Other(7),
            ElementState::Pressed,
            &mut sink,
        );
        assert!(sink.mouse.is_empty());
    }

    #[test]
    fn test_pixel_scroll_converted_to_lines() {
        let mut translator = EventTranslator::new();
        let mut sink = Recorder::default();

        translator.scroll(MouseScrollDelta::LineDelta(0.0, 1.0), &mut sink);
        translator.scroll(
            MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 2.0 * PIXELS_PER_LINE as f64)),
            &mut sink,
        );
        assert_eq!(sink.scrolls, vec![(0.0, 1.0), (0.0, 2.0)]);
    }
}
