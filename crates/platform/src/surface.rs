//! Vulkan surface ownership.

use std::ffi::{CStr, c_char};

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use vesper_core::{Error, Result};

/// A `vk::SurfaceKHR` plus the loader that destroys it.
///
/// The Vulkan instance it was created from must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Creates a surface presenting to `window`.
    pub fn new<W>(window: &W, entry: &ash::Entry, instance: &ash::Instance) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| Error::Window(format!("no display handle: {e}")))?;
        let target = window
            .window_handle()
            .map_err(|e| Error::Window(format!("no window handle: {e}")))?;

        // SAFETY: both handles come from a live window, and the surface is
        // destroyed in Drop before the instance goes away.
        let handle = unsafe {
            ash_window::create_surface(entry, instance, display.as_raw(), target.as_raw(), None)
        }
        .map_err(|e| Error::Vulkan(format!("vkCreateSurfaceKHR: {e}")))?;

        tracing::info!("Vulkan surface created");
        Ok(Self {
            handle,
            loader: ash::khr::surface::Instance::new(entry, instance),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.handle, None) };
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Instance extensions needed to create a surface on `display`.
///
/// The pointers reference static strings owned by the loader.
pub fn required_extensions(display: RawDisplayHandle) -> Result<Vec<*const c_char>> {
    let extensions = ash_window::enumerate_required_extensions(display)
        .map_err(|e| Error::Vulkan(format!("surface extensions: {e}")))?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        // SAFETY: ash_window returns null-terminated static strings.
        let names: Vec<_> = extensions
            .iter()
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect();
        tracing::debug!("Surface extensions: {:?}", names);
    }

    Ok(extensions.to_vec())
}
