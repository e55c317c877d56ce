//! In-memory [`SyncDevice`] for exercising the frame protocol without a GPU.
//!
//! Fences are booleans behind a mutex; waits genuinely block on a condvar
//! until another thread calls [`MockSyncDevice::signal`], which stands in for
//! GPU completion.

use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use ash::vk::{self, Handle};

use crate::error::{RhiError, RhiResult};
use crate::sync::SyncDevice;

#[derive(Default)]
struct MockState {
    next_handle: u64,
    fences: HashMap<u64, bool>,
    semaphores: HashSet<u64>,
    waited: Vec<vk::Fence>,
}

pub(crate) struct MockSyncDevice {
    state: Mutex<MockState>,
    signaled: Condvar,
}

impl MockSyncDevice {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_handle: 1,
                ..Default::default()
            }),
            signaled: Condvar::new(),
        }
    }

    /// Simulates the GPU finishing the work guarded by `fence`.
    pub(crate) fn signal(&self, fence: vk::Fence) {
        let mut state = self.state.lock().unwrap();
        if let Some(value) = state.fences.get_mut(&fence.as_raw()) {
            *value = true;
        }
        self.signaled.notify_all();
    }

    pub(crate) fn is_signaled(&self, fence: vk::Fence) -> bool {
        self.state.lock().unwrap().fences[&fence.as_raw()]
    }

    pub(crate) fn live_fences(&self) -> usize {
        self.state.lock().unwrap().fences.len()
    }

    pub(crate) fn live_semaphores(&self) -> usize {
        self.state.lock().unwrap().semaphores.len()
    }

    /// Every fence passed to a wait call, in call order.
    pub(crate) fn waited_fences(&self) -> Vec<vk::Fence> {
        self.state.lock().unwrap().waited.clone()
    }

    fn allocate(state: &mut MockState) -> u64 {
        let handle = state.next_handle;
        state.next_handle += 1;
        handle
    }
}

impl SyncDevice for MockSyncDevice {
    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        let mut state = self.state.lock().unwrap();
        let handle = Self::allocate(&mut state);
        state.semaphores.insert(handle);
        Ok(vk::Semaphore::from_raw(handle))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state.lock().unwrap().semaphores.remove(&semaphore.as_raw());
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        let mut state = self.state.lock().unwrap();
        let handle = Self::allocate(&mut state);
        state.fences.insert(handle, signaled);
        Ok(vk::Fence::from_raw(handle))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.state.lock().unwrap().fences.remove(&fence.as_raw());
    }

    fn wait_for_fences(&self, fences: &[vk::Fence], timeout: u64) -> RhiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.waited.extend_from_slice(fences);

        let all_signaled = |state: &MockState| {
            fences
                .iter()
                .all(|f| state.fences.get(&f.as_raw()).copied().unwrap_or(false))
        };

        if timeout == u64::MAX {
            while !all_signaled(&state) {
                state = self.signaled.wait(state).unwrap();
            }
            return Ok(());
        }

        let (state, result) = self
            .signaled
            .wait_timeout_while(state, Duration::from_nanos(timeout), |s| !all_signaled(s))
            .unwrap();
        drop(state);

        if result.timed_out() {
            Err(RhiError::VulkanError(vk::Result::TIMEOUT))
        } else {
            Ok(())
        }
    }

    fn reset_fences(&self, fences: &[vk::Fence]) -> RhiResult<()> {
        let mut state = self.state.lock().unwrap();
        for fence in fences {
            if let Some(value) = state.fences.get_mut(&fence.as_raw()) {
                *value = false;
            }
        }
        Ok(())
    }

    fn signal_fence(&self, fence: vk::Fence) -> RhiResult<()> {
        self.signal(fence);
        Ok(())
    }

    fn fence_status(&self, fence: vk::Fence) -> RhiResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .fences
            .get(&fence.as_raw())
            .copied()
            .unwrap_or(false))
    }
}
