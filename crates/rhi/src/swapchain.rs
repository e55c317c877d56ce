//! Swapchain negotiation and management.
//!
//! Negotiation is a set of pure functions from [`SurfaceCapabilities`] to
//! concrete swapchain parameters, so every preference rule is testable
//! without a GPU. [`SwapchainManager`] drives them: it owns the swapchain,
//! its image views, the rotation metadata and the
//! [`PresentationSyncManager`] sized for the current image count.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init()--> Ready --destroy()--> Uninitialized
//!                           Ready --init()-----> Ready   (rebuild, old chain passed as a hint)
//! ```

use std::sync::Arc;

use ash::vk;
use glam::Mat4;
use tracing::{debug, error, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::present_sync::{FrameInFlightIndex, PresentationSyncManager, SwapchainIndex};
use crate::surface::SurfaceCapabilities;

/// Pixel format and color space picked whenever the surface offers them.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Prefers [`PREFERRED_SURFACE_FORMAT`], otherwise the first format listed.
///
/// The fallback depends on driver ordering and is not necessarily the best
/// remaining format.
///
/// # Panics
///
/// Panics if `formats` is empty.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    if formats.contains(&PREFERRED_SURFACE_FORMAT) {
        return PREFERRED_SURFACE_FORMAT;
    }

    let fallback = formats[0];
    warn!(
        "Preferred surface format unavailable, using {:?} / {:?}",
        fallback.format, fallback.color_space
    );
    fallback
}

/// Returns `preferred` when supported, otherwise FIFO (always available).
pub fn choose_present_mode(
    present_modes: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if present_modes.contains(&preferred) {
        preferred
    } else {
        debug!("Present mode {:?} unsupported, falling back to FIFO", preferred);
        vk::PresentModeKHR::FIFO
    }
}

/// Surface-dictated extent, or the desired size clamped into the surface limits
/// when the surface reports the flexible sentinel.
pub fn choose_extent(caps: &SurfaceCapabilities, width: u32, height: u32) -> vk::Extent2D {
    if !caps.has_flexible_extent() {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more image than the minimum, capped by a nonzero maximum.
pub fn choose_image_count(caps: &SurfaceCapabilities) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// Extent of the buffers to render into, before the presentation engine
/// applies `transform`.
///
/// Width and height are swapped for 90° and 270° rotations.
pub fn identity_extent(extent: vk::Extent2D, transform: vk::SurfaceTransformFlagsKHR) -> vk::Extent2D {
    let quarter_turn =
        vk::SurfaceTransformFlagsKHR::ROTATE_90 | vk::SurfaceTransformFlagsKHR::ROTATE_270;
    if transform.intersects(quarter_turn) {
        vk::Extent2D {
            width: extent.height,
            height: extent.width,
        }
    } else {
        extent
    }
}

/// Everything negotiation decides for one swapchain generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedSwapchain {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    /// Extent as reported (or clamped) for the surface.
    pub extent: vk::Extent2D,
    /// Extent of the swapchain images themselves.
    pub image_extent: vk::Extent2D,
    pub image_count: u32,
    pub transform: vk::SurfaceTransformFlagsKHR,
}

impl NegotiatedSwapchain {
    /// Applies every preference rule to `caps`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] if the surface offers no format
    /// or no present mode.
    pub fn negotiate(
        caps: &SurfaceCapabilities,
        preferred_mode: vk::PresentModeKHR,
        desired_width: u32,
        desired_height: u32,
    ) -> RhiResult<Self> {
        if !caps.is_adequate() {
            return Err(RhiError::SwapchainError(
                "surface offers no formats or no present modes".to_string(),
            ));
        }

        let extent = choose_extent(caps, desired_width, desired_height);
        Ok(Self {
            surface_format: choose_surface_format(&caps.formats),
            present_mode: choose_present_mode(&caps.present_modes, preferred_mode),
            extent,
            image_extent: identity_extent(extent, caps.current_transform),
            image_count: choose_image_count(caps),
            transform: caps.current_transform,
        })
    }
}

/// Rotation the presentation engine applies to presented images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurfaceRotation {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SurfaceRotation {
    /// Maps a surface transform onto a rotation.
    ///
    /// # Errors
    ///
    /// Mirrored and inherited transforms are rejected with
    /// [`RhiError::UnsupportedTransform`].
    pub fn from_transform(transform: vk::SurfaceTransformFlagsKHR) -> RhiResult<Self> {
        match transform {
            vk::SurfaceTransformFlagsKHR::IDENTITY => Ok(Self::Identity),
            vk::SurfaceTransformFlagsKHR::ROTATE_90 => Ok(Self::Rotate90),
            vk::SurfaceTransformFlagsKHR::ROTATE_180 => Ok(Self::Rotate180),
            vk::SurfaceTransformFlagsKHR::ROTATE_270 => Ok(Self::Rotate270),
            other => Err(RhiError::UnsupportedTransform(other)),
        }
    }

    pub fn degrees(self) -> f32 {
        match self {
            Self::Identity => 0.0,
            Self::Rotate90 => 90.0,
            Self::Rotate180 => 180.0,
            Self::Rotate270 => 270.0,
        }
    }

    #[inline]
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }

    /// Pre-rotation matrix (about +Z) and the aspect ratio to feed into
    /// perspective projections.
    ///
    /// For quarter turns the ratio is `height / width` of `extent`, so the
    /// projection stays correct on a rotated display.
    pub fn compensation(self, extent: vk::Extent2D) -> (Mat4, f32) {
        let width = extent.width as f32;
        let height = extent.height as f32;
        let ratio = if self.is_quarter_turn() {
            height / width
        } else {
            width / height
        };
        (Mat4::from_rotation_z(self.degrees().to_radians()), ratio)
    }
}

/// Image count, format and extent of a swapchain generation.
///
/// Equality is structural. Dependents (framebuffers, depth buffers) compare a
/// stored spec with [`SwapchainManager::make_spec`] to decide whether to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapchainSpec {
    pub count: u32,
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
}

impl SwapchainSpec {
    pub fn new(count: u32, format: vk::Format, extent: vk::Extent2D) -> Self {
        Self {
            count,
            format,
            width: extent.width,
            height: extent.height,
        }
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Outcome of an image acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    Success,
    /// The image is usable but the swapchain no longer matches the surface exactly.
    Suboptimal,
    /// The swapchain must be rebuilt before the next acquire. No image was acquired.
    OutOfDate,
    /// Any other failure. No image was acquired.
    Fail,
}

impl AcquireStatus {
    /// True when an image index came back and may be rendered into.
    #[inline]
    pub fn has_image(self) -> bool {
        matches!(self, Self::Success | Self::Suboptimal)
    }
}

/// Outcome of a present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Success,
    Suboptimal,
    OutOfDate,
}

/// Maps the raw acquire result onto an [`AcquireStatus`] and image index.
///
/// No valid index exists for `OutOfDate` or `Fail`; [`SwapchainIndex::MAX`]
/// is returned instead.
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> (AcquireStatus, SwapchainIndex) {
    match result {
        Ok((index, false)) => (AcquireStatus::Success, SwapchainIndex::new(index)),
        Ok((index, true)) => (AcquireStatus::Suboptimal, SwapchainIndex::new(index)),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => (AcquireStatus::OutOfDate, SwapchainIndex::MAX),
        Err(e) => {
            error!("Failed to acquire swapchain image: {:?}", e);
            (AcquireStatus::Fail, SwapchainIndex::MAX)
        }
    }
}

/// Maps the raw present result onto a [`PresentStatus`].
///
/// # Errors
///
/// Every error other than out-of-date is returned as is.
pub fn classify_present(result: Result<bool, vk::Result>) -> RhiResult<PresentStatus> {
    match result {
        Ok(false) => Ok(PresentStatus::Success),
        Ok(true) => Ok(PresentStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
        Err(e) => Err(e.into()),
    }
}

/// Whether `format` stores sRGB-encoded color.
///
/// # Panics
///
/// Only the formats negotiation can select are classified; any other format
/// is an internal error.
pub fn is_srgb_format(format: vk::Format) -> bool {
    match format {
        vk::Format::B8G8R8A8_SRGB => true,
        vk::Format::R8G8B8A8_UNORM => false,
        other => panic!("cannot determine whether swapchain format {:?} is sRGB", other),
    }
}

/// Owns the swapchain, its image views and the presentation sync primitives.
pub struct SwapchainManager {
    device: Arc<Device>,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    /// Owned by the swapchain; only the views are destroyed by us.
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    rotation: SurfaceRotation,
    pre_rotation: Mat4,
    perspective_ratio: f32,
    sync: Option<PresentationSyncManager>,
}

impl SwapchainManager {
    /// Creates a manager in the uninitialized state. No swapchain exists until
    /// [`init`](Self::init) is called.
    pub fn new(device: Arc<Device>, instance: &Instance) -> Self {
        Self {
            swapchain_loader: ash::khr::swapchain::Device::new(instance.handle(), device.handle()),
            surface_loader: instance.surface_loader(),
            device,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            views: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            rotation: SurfaceRotation::Identity,
            pre_rotation: Mat4::IDENTITY,
            perspective_ratio: 1.0,
            sync: None,
        }
    }

    /// Builds (or rebuilds) the swapchain for `surface`.
    ///
    /// The desired size only matters when the surface reports a flexible
    /// extent. An existing swapchain is handed to the driver as the old
    /// swapchain and destroyed after the new one exists. Views, sync
    /// primitives and rotation metadata are all recreated.
    ///
    /// # Errors
    ///
    /// Any failure here leaves the manager uninitialized and is not retried.
    pub fn init(
        &mut self,
        desired_width: u32,
        desired_height: u32,
        surface: vk::SurfaceKHR,
        preferred_mode: vk::PresentModeKHR,
    ) -> RhiResult<()> {
        self.device.wait_idle()?;
        self.destroy_except_swapchain();

        let caps = SurfaceCapabilities::probe(self.device.physical_device(), surface, &self.surface_loader)?;
        let negotiated = NegotiatedSwapchain::negotiate(&caps, preferred_mode, desired_width, desired_height)?;
        let rotation = SurfaceRotation::from_transform(negotiated.transform)?;

        let families = self.device.queue_families();
        let family_indices = families.unique_families();
        let sharing_mode = if families.is_shared() {
            vk::SharingMode::EXCLUSIVE
        } else {
            warn!(
                "Graphics queue family {:?} and present queue family {:?} differ",
                families.graphics_family, families.present_family
            );
            vk::SharingMode::CONCURRENT
        };

        let old_swapchain = self.swapchain;
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(negotiated.image_count)
            .image_format(negotiated.surface_format.format)
            .image_color_space(negotiated.surface_format.color_space)
            .image_extent(negotiated.image_extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .pre_transform(negotiated.transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(negotiated.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&family_indices);
        }

        let created = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) };

        // The old chain is retired whether or not the new one was created.
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = vk::SwapchainKHR::null();
        self.swapchain = created?;

        self.images = unsafe { self.swapchain_loader.get_swapchain_images(self.swapchain)? };
        self.views = create_image_views(&self.device, &self.images, negotiated.surface_format.format)?;
        assert_eq!(
            self.images.len(),
            self.views.len(),
            "swapchain image count and view count diverged"
        );

        self.format = negotiated.surface_format.format;
        self.extent = negotiated.image_extent;
        self.present_mode = negotiated.present_mode;
        self.rotation = rotation;
        (self.pre_rotation, self.perspective_ratio) = rotation.compensation(negotiated.extent);

        self.sync = Some(PresentationSyncManager::new(self.device.clone(), self.images.len())?);

        info!(
            "Swapchain created {{ res: {}x{}, format: {:?}, present_mode: {:?}, images: {}, rotation: {:?} }}",
            self.extent.width,
            self.extent.height,
            self.format,
            self.present_mode,
            self.images.len(),
            self.rotation
        );
        Ok(())
    }

    /// Waits for in-flight work and releases everything, returning to the
    /// uninitialized state. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("wait_idle failed before swapchain teardown: {:?}", e);
        }
        self.destroy_except_swapchain();

        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(self.swapchain, None) };
            self.swapchain = vk::SwapchainKHR::null();
            info!("Swapchain destroyed");
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.swapchain != vk::SwapchainKHR::null() && self.sync.is_some()
    }

    /// Acquires the next image, signaling the frame slot's image-available
    /// semaphore once the presentation engine is done with it.
    ///
    /// # Panics
    ///
    /// Panics if the manager is uninitialized.
    pub fn acquire_next_image(&self, frame: FrameInFlightIndex) -> (AcquireStatus, SwapchainIndex) {
        let semaphore = self.sync().image_available(frame);
        let result = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };
        classify_acquire(result)
    }

    /// Queues `image` for presentation after `wait_semaphore` is signaled.
    ///
    /// # Errors
    ///
    /// Out-of-date and suboptimal are reported through [`PresentStatus`];
    /// anything else is an error.
    pub fn present(
        &self,
        queue: vk::Queue,
        image: SwapchainIndex,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentStatus> {
        let swapchains = [self.swapchain];
        let image_indices = [image.get()];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        classify_present(unsafe { self.swapchain_loader.queue_present(queue, &present_info) })
    }

    /// Snapshot of the current (count, format, extent).
    pub fn make_spec(&self) -> SwapchainSpec {
        SwapchainSpec::new(self.size(), self.format, self.extent)
    }

    /// Number of presentable images.
    pub fn size(&self) -> u32 {
        assert_eq!(
            self.images.len(),
            self.views.len(),
            "swapchain image count and view count diverged"
        );
        self.views.len() as u32
    }

    /// See [`is_srgb_format`].
    pub fn is_format_srgb(&self) -> bool {
        is_srgb_format(self.format)
    }

    /// # Panics
    ///
    /// Panics if the manager is uninitialized.
    pub fn sync(&self) -> &PresentationSyncManager {
        match &self.sync {
            Some(sync) => sync,
            None => panic!("swapchain manager used before init"),
        }
    }

    /// # Panics
    ///
    /// Panics if the manager is uninitialized.
    pub fn sync_mut(&mut self) -> &mut PresentationSyncManager {
        match &mut self.sync {
            Some(sync) => sync,
            None => panic!("swapchain manager used before init"),
        }
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Extent of the swapchain images (already swapped for quarter turns).
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn rotation(&self) -> SurfaceRotation {
        self.rotation
    }

    /// Multiply into the projection so output matches the display orientation.
    #[inline]
    pub fn pre_rotation(&self) -> Mat4 {
        self.pre_rotation
    }

    /// Aspect ratio to use for perspective projections.
    #[inline]
    pub fn perspective_ratio(&self) -> f32 {
        self.perspective_ratio
    }

    #[inline]
    pub fn image_view(&self, index: SwapchainIndex) -> vk::ImageView {
        self.views[index.as_usize()]
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.views
    }

    fn destroy_except_swapchain(&mut self) {
        // Dropping the sync manager waits for its fences.
        self.sync = None;
        self.images.clear();
        for &view in &self.views {
            unsafe { self.device.handle().destroy_image_view(view, None) };
        }
        self.views.clear();
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> RhiResult<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => views.push(view),
            Err(e) => {
                for &view in &views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} swapchain image views", views.len());
    Ok(views)
}
