//! Frame orchestration.
//!
//! One [`Renderer::render_frame`] call runs the whole presentation protocol:
//! wait for the frame slot, acquire, claim the image, record, submit, present,
//! advance. Out-of-date and suboptimal swapchains are rebuilt in place.

use std::sync::Arc;

use ash::vk;
use glam::{Mat4, Vec3};
use tracing::{debug, info};

use vesper_core::{GraphicsConfig, PresentModePreference};
use vesper_platform::{EventSink, Surface, Window};
use vesper_rhi::device::Device;
use vesper_rhi::instance::Instance;
use vesper_rhi::physical_device::select_physical_device;
use vesper_rhi::render_pass::clear_values;
use vesper_rhi::{
    AcquireStatus, CommandBuffer, CommandPool, FrameInFlightIndex, MAX_FRAMES_IN_FLIGHT,
    PresentStatus, RenderPass, RhiError, RhiResult, SwapchainIndex, SwapchainManager,
};
use vesper_scene::RenderList;

use crate::render_target::{RenderTargets, needs_rebuild};

/// Maps the configured preference onto a Vulkan present mode.
pub fn present_mode_for(preference: PresentModePreference) -> vk::PresentModeKHR {
    match preference {
        PresentModePreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentModePreference::Mailbox => vk::PresentModeKHR::MAILBOX,
    }
}

/// Opaque clear color for the ambient term.
pub fn clear_color(ambient: Vec3) -> [f32; 4] {
    ambient.extend(1.0).to_array()
}

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// Nothing was submitted: the window is minimized or the swapchain had to
    /// be rebuilt before an image could be acquired.
    Skipped,
}

/// Owns the Vulkan objects of one window.
pub struct Renderer {
    // Fields drop in declaration order: everything that holds the device
    // first, then the surface, the device and finally the instance.
    targets: Option<RenderTargets>,
    command_buffers: Vec<CommandBuffer>,
    command_pool: CommandPool,
    render_pass: RenderPass,
    swapchain: SwapchainManager,
    surface: Surface,
    device: Arc<Device>,
    _instance: Instance,

    frame: FrameInFlightIndex,
    present_mode: vk::PresentModeKHR,
    width: u32,
    height: u32,
    resize_pending: bool,
}

impl Renderer {
    pub fn new<S: EventSink>(window: &Window<S>, graphics: &GraphicsConfig) -> RhiResult<Self> {
        let (width, height) = window.size();
        info!("Initializing renderer ({}x{})", width, height);

        let display = window
            .raw_display_handle()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let extensions = vesper_platform::required_extensions(display)
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let instance = Instance::new(graphics.validation, &extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let gpu = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &gpu)?;

        let present_mode = present_mode_for(graphics.present_mode);
        let mut swapchain = SwapchainManager::new(device.clone(), &instance);
        swapchain.init(width, height, surface.handle(), present_mode)?;

        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffers = command_pool.allocate(MAX_FRAMES_IN_FLIGHT as u32)?;

        info!("Renderer ready (validation: {})", instance.has_validation());
        Ok(Self {
            targets: None,
            command_buffers,
            command_pool,
            render_pass,
            swapchain,
            surface,
            device,
            _instance: instance,
            frame: FrameInFlightIndex::default(),
            present_mode,
            width,
            height,
            resize_pending: false,
        })
    }

    /// Records a new framebuffer size. The swapchain is rebuilt at the start
    /// of the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        debug!("Resize {}x{} -> {}x{}", self.width, self.height, width, height);
        self.width = width;
        self.height = height;
        self.resize_pending = true;
    }

    fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Draws `list` into the next swapchain image and presents it.
    ///
    /// # Errors
    ///
    /// Device loss, failed acquires and failed resource creation are errors
    /// the caller should treat as fatal.
    pub fn render_frame(&mut self, list: &RenderList) -> RhiResult<FrameStatus> {
        if self.is_minimized() {
            return Ok(FrameStatus::Skipped);
        }
        if self.resize_pending {
            self.rebuild_swapchain()?;
        }

        let frame = self.frame;
        self.swapchain.sync().wait_for_frame(frame)?;

        let (acquired, image) = self.swapchain.acquire_next_image(frame);
        match acquired {
            AcquireStatus::Success | AcquireStatus::Suboptimal => {}
            AcquireStatus::OutOfDate => {
                debug!("Swapchain out of date on acquire");
                self.rebuild_swapchain()?;
                return Ok(FrameStatus::Skipped);
            }
            AcquireStatus::Fail => {
                return Err(RhiError::SwapchainError(
                    "failed to acquire a swapchain image".to_string(),
                ));
            }
        }

        self.ensure_targets()?;
        self.swapchain.sync().wait_for_image(frame, image)?;
        self.record(frame, image, list.ambient_color)?;

        let sync = self.swapchain.sync();
        let wait_semaphores = [sync.image_available(frame)];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished(frame)];
        let command_buffers = [self.command_buffers[frame.get()].handle()];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let device = &self.device;
        self.swapchain.sync_mut().submit_frame(frame, image, |fence| {
            // SAFETY: the command buffer was just recorded, and the framebuffer
            // and semaphores it uses outlive the fence, which every rebuild waits on.
            unsafe { device.submit_graphics(std::slice::from_ref(&submit_info), fence) }
        })?;

        let presented = self
            .swapchain
            .present(self.device.present_queue(), image, signal_semaphores[0])?;
        self.frame.advance();

        if acquired == AcquireStatus::Suboptimal || presented != PresentStatus::Success {
            debug!("Swapchain stale after present ({:?}/{:?})", acquired, presented);
            self.rebuild_swapchain()?;
        }
        Ok(FrameStatus::Presented)
    }

    fn record(&self, frame: FrameInFlightIndex, image: SwapchainIndex, ambient: Vec3) -> RhiResult<()> {
        let Some(targets) = self.targets.as_ref() else {
            return Err(RhiError::InvalidHandle("render targets missing".to_string()));
        };
        let extent = targets.extent();
        let cmd = &self.command_buffers[frame.get()];

        cmd.reset()?;
        cmd.begin()?;
        cmd.begin_render_pass(
            self.render_pass.handle(),
            targets.framebuffer(image),
            extent,
            &clear_values(clear_color(ambient)),
        );
        cmd.set_viewport_and_scissor(extent);
        cmd.end_render_pass();
        cmd.end()
    }

    fn ensure_targets(&mut self) -> RhiResult<()> {
        let current = self.swapchain.make_spec();
        if needs_rebuild(self.targets.as_ref().map(RenderTargets::spec), &current) {
            self.targets = Some(RenderTargets::new(
                self.device.clone(),
                &self.render_pass,
                &self.swapchain,
            )?);
        }
        Ok(())
    }

    fn rebuild_swapchain(&mut self) -> RhiResult<()> {
        self.device.wait_idle()?;
        self.targets = None;
        self.swapchain
            .init(self.width, self.height, self.surface.handle(), self.present_mode)?;

        if self.render_pass.color_format() != self.swapchain.format() {
            info!(
                "Swapchain format changed {:?} -> {:?}, rebuilding render pass",
                self.render_pass.color_format(),
                self.swapchain.format()
            );
            self.render_pass = RenderPass::new(self.device.clone(), self.swapchain.format())?;
        }
        self.resize_pending = false;
        Ok(())
    }

    /// Multiply into the projection so the image matches the display orientation.
    pub fn pre_rotation(&self) -> Mat4 {
        self.swapchain.pre_rotation()
    }

    /// Aspect ratio for perspective projections, already corrected for rotation.
    pub fn perspective_ratio(&self) -> f32 {
        self.swapchain.perspective_ratio()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            tracing::error!("wait_idle failed during renderer teardown: {:?}", e);
        }
        debug!(
            "Renderer dropping ({} command buffers from family {})",
            self.command_buffers.len(),
            self.command_pool.queue_family_index()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_mapping() {
        assert_eq!(present_mode_for(PresentModePreference::Fifo), vk::PresentModeKHR::FIFO);
        assert_eq!(
            present_mode_for(PresentModePreference::Mailbox),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn test_default_config_presents_fifo() {
        let graphics = GraphicsConfig::default();
        assert_eq!(present_mode_for(graphics.present_mode), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_clear_color_is_opaque_ambient() {
        assert_eq!(
            clear_color(vesper_scene::AMBIENT_COLOR),
            [0.01, 0.01, 0.01, 1.0]
        );
    }
}
