//! Synchronization primitives.
//!
//! - [`SyncDevice`] - the create/destroy/wait/reset operations the
//!   presentation layer needs from a device
//! - [`Semaphore`] - GPU-to-GPU ordering between queue operations
//! - [`Fence`] - GPU-to-CPU completion signal the host can wait on
//!
//! Both wrappers are generic over the device so the frame protocol can be
//! exercised without a GPU. In the renderer `D` is always
//! [`Device`](crate::device::Device).

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Timeout used for "wait until ready" fence waits.
pub const WAIT_FOREVER: u64 = u64::MAX;

/// Device operations on fences and semaphores.
///
/// Handles are opaque to callers; only the implementing device interprets them.
pub trait SyncDevice: Send + Sync {
    /// Creates an unsignaled binary semaphore.
    fn create_semaphore(&self) -> RhiResult<vk::Semaphore>;

    /// Destroys a semaphore. It must not be referenced by pending GPU work.
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Creates a fence, optionally already signaled.
    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence>;

    /// Destroys a fence. It must not be referenced by pending GPU work.
    fn destroy_fence(&self, fence: vk::Fence);

    /// Blocks until every fence in `fences` is signaled or `timeout` (ns) expires.
    fn wait_for_fences(&self, fences: &[vk::Fence], timeout: u64) -> RhiResult<()>;

    /// Returns every fence in `fences` to the unsignaled state.
    fn reset_fences(&self, fences: &[vk::Fence]) -> RhiResult<()>;

    /// Signals `fence` once previously queued work completes, without
    /// submitting any work of its own.
    fn signal_fence(&self, fence: vk::Fence) -> RhiResult<()>;

    /// Non-blocking signaled check.
    fn fence_status(&self, fence: vk::Fence) -> RhiResult<bool>;
}

/// Owned binary semaphore.
pub struct Semaphore<D: SyncDevice = Device> {
    device: Arc<D>,
    semaphore: vk::Semaphore,
}

impl<D: SyncDevice> Semaphore<D> {
    /// Creates a new semaphore in the unsignaled state.
    pub fn new(device: Arc<D>) -> RhiResult<Self> {
        let semaphore = device.create_semaphore()?;
        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl<D: SyncDevice> Drop for Semaphore<D> {
    fn drop(&mut self) {
        self.device.destroy_semaphore(self.semaphore);
        debug!("Destroyed semaphore");
    }
}

/// Owned fence.
pub struct Fence<D: SyncDevice = Device> {
    device: Arc<D>,
    fence: vk::Fence,
}

impl<D: SyncDevice> Fence<D> {
    /// Creates a new fence.
    ///
    /// Pass `signaled = true` for fences that are waited on before the first
    /// submission that would signal them.
    pub fn new(device: Arc<D>, signaled: bool) -> RhiResult<Self> {
        let fence = device.create_fence(signaled)?;
        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        self.device.wait_for_fences(&[self.fence], timeout)
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// The fence must not be pending on any queue.
    pub fn reset(&self) -> RhiResult<()> {
        self.device.reset_fences(&[self.fence])
    }

    /// Non-blocking signaled check; errors count as "not signaled".
    pub fn is_signaled(&self) -> bool {
        matches!(self.device.fence_status(self.fence), Ok(true))
    }
}

impl<D: SyncDevice> Drop for Fence<D> {
    fn drop(&mut self) {
        self.device.destroy_fence(self.fence);
        debug!("Destroyed fence");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSyncDevice;

    #[test]
    fn test_fence_created_signaled_does_not_block() {
        let device = Arc::new(MockSyncDevice::new());
        let fence = Fence::new(device.clone(), true).unwrap();

        assert!(fence.is_signaled());
        fence.wait(0).unwrap();
    }

    #[test]
    fn test_fence_reset_then_wait_times_out() {
        let device = Arc::new(MockSyncDevice::new());
        let fence = Fence::new(device.clone(), true).unwrap();

        fence.reset().unwrap();
        assert!(!fence.is_signaled());
        assert!(fence.wait(0).is_err());

        device.signal(fence.handle());
        fence.wait(0).unwrap();
    }

    #[test]
    fn test_drop_destroys_handles() {
        let device = Arc::new(MockSyncDevice::new());
        {
            let _semaphore = Semaphore::new(device.clone()).unwrap();
            let _fence = Fence::new(device.clone(), false).unwrap();
            assert_eq!(device.live_semaphores(), 1);
            assert_eq!(device.live_fences(), 1);
        }
        assert_eq!(device.live_semaphores(), 0);
        assert_eq!(device.live_fences(), 0);
    }

    #[test]
    fn test_wrappers_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
    }
}
