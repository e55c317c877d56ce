//! Window, surface and input plumbing.
//!
//! - [`Window`] wraps a winit window and forwards its events to an
//!   [`EventSink`] it owns
//! - [`Surface`] owns the Vulkan surface created for a window
//! - [`InputState`] is the stock sink: pressed keys and buttons, cursor, scroll

mod events;
mod input;
mod surface;
mod window;

pub use events::{EventSink, EventTranslator, KeyAction, KeyEvent, MouseAction, MouseButton, MouseEvent};
pub use input::{InputState, KeyCode};
pub use surface::{Surface, required_extensions};
pub use window::Window;

pub use winit::event::{Event, WindowEvent};
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
