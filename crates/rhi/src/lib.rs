//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate wraps the parts of Vulkan the rendering core needs, on top of `ash`:
//! - Instance, physical device and logical device creation
//! - Fences and semaphores behind the [`sync::SyncDevice`] seam
//! - The presentation synchronization manager (frames in flight vs. swapchain images)
//! - Surface capability probing, swapchain negotiation and the swapchain manager
//! - The render pass and per-frame command buffers

mod error;

pub mod command;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod present_sync;
pub mod render_pass;
pub mod surface;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
mod mock;

pub use command::{CommandBuffer, CommandPool};
pub use device::Device;
pub use error::{RhiError, RhiResult};
pub use instance::Instance;
pub use present_sync::{FrameInFlightIndex, MAX_FRAMES_IN_FLIGHT, PresentationSyncManager, SwapchainIndex};
pub use render_pass::{Framebuffer, RenderPass};
pub use surface::SurfaceCapabilities;
pub use swapchain::{AcquireStatus, PresentStatus, SurfaceRotation, SwapchainManager, SwapchainSpec};

// Re-export ash types that users might need
pub use ash::vk;
