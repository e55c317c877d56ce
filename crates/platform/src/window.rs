//! The application window and its event routing.

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, RawDisplayHandle};
use vesper_core::{Error, Result, WindowConfig};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use crate::events::{EventSink, EventTranslator};
use crate::input::InputState;
use crate::surface::Surface;

/// A winit window that owns the sink its events are delivered to.
///
/// Events reach the sink only through [`dispatch`](Self::dispatch), so there
/// is no global callback state and several windows can coexist.
pub struct Window<S: EventSink = InputState> {
    window: Arc<WinitWindow>,
    sink: S,
    translator: EventTranslator,
    width: u32,
    height: u32,
    resized: bool,
}

impl<S: EventSink> Window<S> {
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig, sink: S) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;
        let size = window.inner_size();

        tracing::info!("Window '{}' created: {}x{}", config.title, size.width, size.height);

        Ok(Self {
            window: Arc::new(window),
            sink,
            translator: EventTranslator::new(),
            width: size.width,
            height: size.height,
            resized: false,
        })
    }

    #[inline]
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Current framebuffer size in physical pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Zero-sized while minimized; nothing should be presented then.
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns whether a resize arrived since the last call, and clears it.
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Translates `event` into sink calls.
    ///
    /// Returns `true` when the event was input or a resize the sink saw.
    pub fn dispatch(&mut self, event: &WindowEvent) -> bool {
        let sink = &mut self.sink;
        match event {
            WindowEvent::Resized(size) => {
                if (size.width, size.height) != (self.width, self.height) {
                    self.width = size.width;
                    self.height = size.height;
                    self.resized = true;
                    tracing::debug!("Framebuffer resized: {}x{}", size.width, size.height);
                }
                self.translator.resized(size.width, size.height, sink);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.translator.key(event.physical_key, event.state, sink);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.translator.cursor_moved(position.x, position.y, sink);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.translator.mouse_button(*button, *state, sink);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.translator.scroll(*delta, sink);
            }
            _ => return false,
        }
        true
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle> {
        self.window
            .display_handle()
            .map(|h| h.as_raw())
            .map_err(|e| Error::Window(format!("no display handle: {e}")))
    }

    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        Surface::new(self.window.as_ref(), entry, instance)
    }
}
