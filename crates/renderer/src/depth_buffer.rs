//! Depth attachment backing the render pass.
//!
//! One depth image is shared by every framebuffer of a swapchain generation;
//! only one frame writes it at a time because the render pass clears it and
//! the external dependency orders early-fragment tests across submissions.

use std::sync::{Arc, PoisonError};

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use vesper_rhi::device::Device;
use vesper_rhi::render_pass::DEPTH_FORMAT;
use vesper_rhi::{RhiError, RhiResult};

/// GPU-only depth image plus its view.
///
/// Destruction order is view, image, then the allocation.
pub struct DepthBuffer {
    device: Arc<Device>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    extent: vk::Extent2D,
}

impl DepthBuffer {
    /// Allocates a [`DEPTH_FORMAT`] image covering `extent`.
    ///
    /// # Errors
    ///
    /// A zero-sized extent is rejected before anything is created.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "depth buffer extent {}x{} is empty",
                extent.width, extent.height
            )));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocated = device
            .allocator()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocate(&AllocationCreateDesc {
                name: "depth_buffer",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
        let allocation = match allocated {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e.into());
            }
        };

        let mut buffer = Self {
            device,
            image,
            view: vk::ImageView::null(),
            allocation: Some(allocation),
            extent,
        };
        // From here on Drop cleans up whatever was created.
        buffer.bind_and_create_view()?;

        debug!("Depth buffer created: {}x{}", extent.width, extent.height);
        Ok(buffer)
    }

    fn bind_and_create_view(&mut self) -> RhiResult<()> {
        let Some(allocation) = self.allocation.as_ref() else {
            return Err(RhiError::InvalidHandle("depth buffer has no memory".to_string()));
        };
        unsafe {
            self.device
                .handle()
                .bind_image_memory(self.image, allocation.memory(), allocation.offset())?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .level_count(1)
                    .layer_count(1),
            );
        self.view = unsafe { self.device.handle().create_image_view(&view_info, None)? };
        Ok(())
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.handle().destroy_image_view(self.view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self
                .device
                .allocator()
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = allocator.free(allocation) {
                error!("Failed to free depth buffer memory: {:?}", e);
            }
        }

        debug!(
            "Depth buffer destroyed: {}x{}",
            self.extent.width, self.extent.height
        );
    }
}
