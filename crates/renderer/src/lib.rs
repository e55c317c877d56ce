//! Frame loop on top of the RHI.
//!
//! - [`Renderer`] owns instance, device, surface and swapchain for a window
//! - [`RenderTargets`] holds the depth buffer and framebuffers of one swapchain generation
//! - [`DepthBuffer`] is the gpu-allocator backed depth attachment

pub mod depth_buffer;
pub mod render_target;
pub mod renderer;

pub use depth_buffer::DepthBuffer;
pub use render_target::RenderTargets;
pub use renderer::{FrameStatus, Renderer};
