//! Surface capability probing.

use ash::vk;
use tracing::debug;

use crate::error::RhiResult;

/// What a surface supports for one physical device.
///
/// An immutable snapshot. Nothing is cached: re-probe whenever the surface
/// may have changed (resize, out-of-date swapchain).
#[derive(Debug, Clone)]
pub struct SurfaceCapabilities {
    /// Supported (pixel format, color space) pairs, in driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub min_image_count: u32,
    /// Zero means unbounded.
    pub max_image_count: u32,
    /// `u32::MAX` in both dimensions means the surface lets the swapchain pick.
    pub current_extent: vk::Extent2D,
    pub min_image_extent: vk::Extent2D,
    pub max_image_extent: vk::Extent2D,
    /// Rotation/flip the presentation engine applies on its own.
    pub current_transform: vk::SurfaceTransformFlagsKHR,
}

impl SurfaceCapabilities {
    /// Queries formats, present modes and limits for `physical_device` on `surface`.
    ///
    /// # Errors
    ///
    /// Fails only when the device or surface handle is invalid.
    pub fn probe(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let (capabilities, formats, present_modes) = unsafe {
            (
                surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?,
                surface_loader.get_physical_device_surface_formats(physical_device, surface)?,
                surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?,
            )
        };

        let caps = Self::from_raw(&capabilities, formats, present_modes);
        debug!(
            "Surface: {} formats, {} present modes, images {}..{}, extent {}x{}, transform {:?}",
            caps.formats.len(),
            caps.present_modes.len(),
            caps.min_image_count,
            if caps.max_image_count == 0 {
                "unbounded".to_string()
            } else {
                caps.max_image_count.to_string()
            },
            caps.current_extent.width,
            caps.current_extent.height,
            caps.current_transform
        );
        Ok(caps)
    }

    /// Builds a snapshot from already-queried values.
    pub fn from_raw(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> Self {
        Self {
            formats,
            present_modes,
            min_image_count: capabilities.min_image_count,
            max_image_count: capabilities.max_image_count,
            current_extent: capabilities.current_extent,
            min_image_extent: capabilities.min_image_extent,
            max_image_extent: capabilities.max_image_extent,
            current_transform: capabilities.current_transform,
        }
    }

    /// A swapchain can be built only with at least one format and one present mode.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// True when the surface reports the "swapchain decides" extent sentinel.
    #[inline]
    pub fn has_flexible_extent(&self) -> bool {
        self.current_extent.width == u32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 4,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_raw_copies_limits() {
        let caps = SurfaceCapabilities::from_raw(&raw((800, 600)), vec![], vec![]);
        assert_eq!(caps.min_image_count, 2);
        assert_eq!(caps.max_image_count, 4);
        assert_eq!(caps.current_extent.width, 800);
        assert_eq!(caps.current_transform, vk::SurfaceTransformFlagsKHR::ROTATE_90);
        assert!(!caps.has_flexible_extent());
    }

    #[test]
    fn test_flexible_extent_sentinel() {
        let caps = SurfaceCapabilities::from_raw(&raw((u32::MAX, u32::MAX)), vec![], vec![]);
        assert!(caps.has_flexible_extent());
    }

    #[test]
    fn test_is_adequate() {
        let format = vk::SurfaceFormatKHR::default();
        let adequate =
            SurfaceCapabilities::from_raw(&raw((1, 1)), vec![format], vec![vk::PresentModeKHR::FIFO]);
        assert!(adequate.is_adequate());

        let no_formats = SurfaceCapabilities::from_raw(&raw((1, 1)), vec![], vec![vk::PresentModeKHR::FIFO]);
        assert!(!no_formats.is_adequate());

        let no_modes = SurfaceCapabilities::from_raw(&raw((1, 1)), vec![format], vec![]);
        assert!(!no_modes.is_adequate());
    }
}
