//! Framebuffers for the current swapchain generation.
//!
//! Render targets remember the [`SwapchainSpec`] they were built for. The
//! frame loop compares that spec against the live swapchain each frame and
//! rebuilds on any difference. Rebuilding the swapchain itself invalidates
//! the image views, so the owner discards its targets at that point.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use vesper_rhi::device::Device;
use vesper_rhi::{Framebuffer, RenderPass, RhiResult, SwapchainIndex, SwapchainManager, SwapchainSpec};

use crate::depth_buffer::DepthBuffer;

/// Whether targets built for `built` are unusable with a swapchain at `current`.
pub fn needs_rebuild(built: Option<&SwapchainSpec>, current: &SwapchainSpec) -> bool {
    built != Some(current)
}

/// Depth buffer plus one framebuffer per swapchain image.
pub struct RenderTargets {
    spec: SwapchainSpec,
    // Framebuffers reference the depth view, so they are declared (and dropped) first.
    framebuffers: Vec<Framebuffer>,
    depth: DepthBuffer,
}

impl RenderTargets {
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        swapchain: &SwapchainManager,
    ) -> RhiResult<Self> {
        let spec = swapchain.make_spec();
        let extent = spec.extent();
        let depth = DepthBuffer::new(device.clone(), extent)?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(device.clone(), render_pass, view, depth.view(), extent))
            .collect::<RhiResult<Vec<_>>>()?;

        debug!(
            "Render targets built: {} framebuffers at {}x{}",
            framebuffers.len(),
            extent.width,
            extent.height
        );
        Ok(Self {
            spec,
            framebuffers,
            depth,
        })
    }

    #[inline]
    pub fn spec(&self) -> &SwapchainSpec {
        &self.spec
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.depth.extent()
    }

    pub fn framebuffer(&self, image: SwapchainIndex) -> vk::Framebuffer {
        self.framebuffers[image.as_usize()].handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(count: u32, width: u32, height: u32) -> SwapchainSpec {
        SwapchainSpec::new(count, vk::Format::B8G8R8A8_SRGB, vk::Extent2D { width, height })
    }

    #[test]
    fn test_nothing_built_needs_rebuild() {
        assert!(needs_rebuild(None, &spec(3, 800, 600)));
    }

    #[test]
    fn test_same_spec_is_reused() {
        let built = spec(3, 800, 600);
        assert!(!needs_rebuild(Some(&built), &spec(3, 800, 600)));
    }

    #[test]
    fn test_any_field_change_rebuilds() {
        let built = spec(3, 800, 600);
        assert!(needs_rebuild(Some(&built), &spec(2, 800, 600)));
        assert!(needs_rebuild(Some(&built), &spec(3, 1024, 600)));
        assert!(needs_rebuild(
            Some(&built),
            &SwapchainSpec::new(3, vk::Format::R8G8B8A8_UNORM, built.extent())
        ));
    }
}
