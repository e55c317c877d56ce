//! Presentation synchronization.
//!
//! The CPU records frame N+1 while the GPU still renders frame N, so two
//! independent index spaces exist:
//!
//! - [`FrameInFlightIndex`] cycles through [`MAX_FRAMES_IN_FLIGHT`] slots,
//!   each with its own image-available semaphore, render-finished semaphore
//!   and in-flight fence.
//! - [`SwapchainIndex`] is whatever image the presentation engine hands out
//!   at acquire time. There are usually more images than frame slots.
//!
//! Because the two do not line up, each swapchain image remembers which
//! in-flight fence last guarded it. The frame protocol is:
//!
//! ```text
//! 1. wait_for_frame(frame)          wait the frame slot's fence
//! 2. acquire                        presentation engine returns an image index
//! 3. wait_for_image(frame, image)   wait the fence still guarding that image, if any
//!    record commands
//! 4. submit_frame(frame, image, ..) reset the frame fence, record it for the image and
//!                                   submit: wait image_available, signal render_finished + fence
//! 5. present                        wait render_finished
//! 6. advance(frame)
//! ```
//!
//! The frame fence is unsignaled only between a successful reset and the
//! submission that will signal it. A failed submission re-signals it, so
//! nothing ever waits on a fence no queued work owns.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use crate::device::Device;
use crate::error::RhiResult;
use crate::sync::{Fence, Semaphore, SyncDevice, WAIT_FOREVER};

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Frame slot in `[0, MAX_FRAMES_IN_FLIGHT)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameInFlightIndex(usize);

impl FrameInFlightIndex {
    /// Wraps `index`, which must be below [`MAX_FRAMES_IN_FLIGHT`].
    pub fn new(index: usize) -> Self {
        assert!(
            index < MAX_FRAMES_IN_FLIGHT,
            "frame-in-flight index {} out of range (max {})",
            index,
            MAX_FRAMES_IN_FLIGHT
        );
        Self(index)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }

    /// The slot used by the frame after this one.
    #[inline]
    pub fn next(self) -> Self {
        Self((self.0 + 1) % MAX_FRAMES_IN_FLIGHT)
    }

    /// Moves to the next slot in place.
    #[inline]
    pub fn advance(&mut self) {
        *self = self.next();
    }
}

/// Swapchain image slot returned by the presentation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapchainIndex(u32);

impl SwapchainIndex {
    /// Sentinel meaning "no image was acquired".
    pub const MAX: Self = Self(u32::MAX);

    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// False for the [`SwapchainIndex::MAX`] sentinel.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::MAX
    }
}

/// Owns the frame-in-flight primitives and the per-image "in use" table.
///
/// Sized for one swapchain generation; the swapchain manager builds a new
/// one on every (re)initialization.
pub struct PresentationSyncManager<D: SyncDevice = Device> {
    device: Arc<D>,
    image_available: Vec<Semaphore<D>>,
    render_finished: Vec<Semaphore<D>>,
    in_flight: Vec<Fence<D>>,
    /// Fence of the frame slot that last rendered into each swapchain image.
    images_in_use: Vec<Option<vk::Fence>>,
}

impl<D: SyncDevice> PresentationSyncManager<D> {
    /// Allocates [`MAX_FRAMES_IN_FLIGHT`] semaphore pairs and fences plus
    /// `image_count` empty image slots.
    ///
    /// Fences start signaled so the first wait on each slot returns at once.
    ///
    /// # Errors
    ///
    /// Returns an error if any primitive cannot be created. Primitives
    /// created before the failure are destroyed.
    pub fn new(device: Arc<D>, image_count: usize) -> RhiResult<Self> {
        let mut image_available = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut render_finished = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut in_flight = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            image_available.push(Semaphore::new(device.clone())?);
            render_finished.push(Semaphore::new(device.clone())?);
            in_flight.push(Fence::new(device.clone(), true)?);
        }

        info!(
            "Presentation sync created: {} frames in flight, {} swapchain images",
            MAX_FRAMES_IN_FLIGHT, image_count
        );

        Ok(Self {
            device,
            image_available,
            render_finished,
            in_flight,
            images_in_use: vec![None; image_count],
        })
    }

    /// Number of frame slots (always [`MAX_FRAMES_IN_FLIGHT`]).
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of swapchain image slots being tracked.
    #[inline]
    pub fn image_slot_count(&self) -> usize {
        self.images_in_use.len()
    }

    /// Semaphore the acquire for `frame` signals.
    #[inline]
    pub fn image_available(&self, frame: FrameInFlightIndex) -> vk::Semaphore {
        self.image_available[frame.get()].handle()
    }

    /// Semaphore the submission for `frame` signals and present waits on.
    #[inline]
    pub fn render_finished(&self, frame: FrameInFlightIndex) -> vk::Semaphore {
        self.render_finished[frame.get()].handle()
    }

    /// Fence the submission for `frame` signals on completion.
    #[inline]
    pub fn in_flight_fence(&self, frame: FrameInFlightIndex) -> vk::Fence {
        self.in_flight[frame.get()].handle()
    }

    /// Fence currently guarding `image`, if any frame has rendered into it.
    #[inline]
    pub fn image_in_use(&self, image: SwapchainIndex) -> Option<vk::Fence> {
        self.images_in_use
            .get(image.as_usize())
            .copied()
            .flatten()
    }

    /// Step 1: blocks until the GPU work that last used `frame` has completed.
    pub fn wait_for_frame(&self, frame: FrameInFlightIndex) -> RhiResult<()> {
        self.in_flight[frame.get()].wait(WAIT_FOREVER)
    }

    /// Step 3: blocks until `image` is no longer targeted by another frame
    /// slot's work.
    ///
    /// Only waits when the fence recorded for `image` belongs to a slot other
    /// than `frame`; the slot's own fence was already waited in step 1.
    ///
    /// # Panics
    ///
    /// Panics if `image` is outside the tracked image range.
    pub fn wait_for_image(&self, frame: FrameInFlightIndex, image: SwapchainIndex) -> RhiResult<()> {
        let slot = self.image_slot(image);
        let frame_fence = self.in_flight[frame.get()].handle();

        if let Some(previous) = self.images_in_use[slot]
            && previous != frame_fence
        {
            debug!("Image {} still in flight, waiting for its fence", slot);
            self.device.wait_for_fences(&[previous], WAIT_FOREVER)?;
        }
        Ok(())
    }

    /// Steps 4 and 5: resets the frame fence, hands it to `submit`, and
    /// records it as the fence guarding `image` once the submission is queued.
    ///
    /// `submit` must queue work that signals the fence it is given. If it
    /// fails, the fence is signaled again and the image keeps its previous
    /// owner, so later waits and teardown do not block.
    ///
    /// # Panics
    ///
    /// Panics if `image` is outside the tracked image range.
    pub fn submit_frame<F>(
        &mut self,
        frame: FrameInFlightIndex,
        image: SwapchainIndex,
        submit: F,
    ) -> RhiResult<()>
    where
        F: FnOnce(vk::Fence) -> RhiResult<()>,
    {
        let slot = self.image_slot(image);
        let fence = &self.in_flight[frame.get()];
        fence.reset()?;

        if let Err(e) = submit(fence.handle()) {
            warn!("Frame {} submission failed, releasing its fence", frame.get());
            if let Err(signal_err) = self.device.signal_fence(fence.handle()) {
                error!("Failed to re-signal frame fence: {:?}", signal_err);
            }
            return Err(e);
        }

        self.images_in_use[slot] = Some(fence.handle());
        Ok(())
    }

    fn image_slot(&self, image: SwapchainIndex) -> usize {
        let slot = image.as_usize();
        assert!(
            slot < self.images_in_use.len(),
            "swapchain index {} out of range ({} images)",
            slot,
            self.images_in_use.len()
        );
        slot
    }

    /// Blocks until every frame slot's fence is signaled.
    pub fn wait_all(&self) -> RhiResult<()> {
        let fences: Vec<vk::Fence> = self.in_flight.iter().map(Fence::handle).collect();
        self.device.wait_for_fences(&fences, WAIT_FOREVER)
    }
}

impl<D: SyncDevice> Drop for PresentationSyncManager<D> {
    fn drop(&mut self) {
        // Primitives may still be referenced by submitted work.
        if let Err(e) = self.wait_all() {
            error!("Failed to wait for in-flight frames before teardown: {:?}", e);
        }
        self.images_in_use.clear();
        debug!("Presentation sync destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::RhiError;
    use crate::mock::MockSyncDevice;

    fn manager(images: usize) -> (Arc<MockSyncDevice>, PresentationSyncManager<MockSyncDevice>) {
        let device = Arc::new(MockSyncDevice::new());
        let sync = PresentationSyncManager::new(device.clone(), images).unwrap();
        (device, sync)
    }

    /// Signals every frame fence so dropping the manager does not block.
    fn retire_all(device: &MockSyncDevice, sync: &PresentationSyncManager<MockSyncDevice>) {
        for i in 0..MAX_FRAMES_IN_FLIGHT {
            device.signal(sync.in_flight_fence(FrameInFlightIndex::new(i)));
        }
    }

    #[test]
    fn test_init_allocates_fixed_frames_and_per_image_slots() {
        let (device, sync) = manager(3);

        assert_eq!(sync.frames_in_flight(), MAX_FRAMES_IN_FLIGHT);
        assert_eq!(device.live_fences(), MAX_FRAMES_IN_FLIGHT);
        assert_eq!(device.live_semaphores(), 2 * MAX_FRAMES_IN_FLIGHT);
        assert_eq!(sync.image_slot_count(), 3);
        for i in 0..3 {
            assert_eq!(sync.image_in_use(SwapchainIndex::new(i)), None);
        }
    }

    #[test]
    fn test_frame_count_independent_of_image_count() {
        let (_, one) = manager(1);
        let (_, five) = manager(5);
        assert_eq!(one.frames_in_flight(), five.frames_in_flight());
        assert_eq!(one.image_slot_count(), 1);
        assert_eq!(five.image_slot_count(), 5);
    }

    #[test]
    fn test_fences_start_signaled() {
        let (device, sync) = manager(2);
        for i in 0..MAX_FRAMES_IN_FLIGHT {
            let frame = FrameInFlightIndex::new(i);
            assert!(device.is_signaled(sync.in_flight_fence(frame)));
        }
        sync.wait_all().unwrap();
    }

    /// Stands in for a queue submission: the fence stays unsignaled until
    /// the test signals it.
    fn queued(_fence: vk::Fence) -> RhiResult<()> {
        Ok(())
    }

    #[test]
    fn test_submit_records_fence_for_image() {
        let (device, mut sync) = manager(3);
        let frame = FrameInFlightIndex::new(0);
        let image = SwapchainIndex::new(2);
        let fence = sync.in_flight_fence(frame);

        sync.wait_for_frame(frame).unwrap();
        sync.wait_for_image(frame, image).unwrap();
        let mut handed = None;
        sync.submit_frame(frame, image, |f| {
            handed = Some(f);
            Ok(())
        })
        .unwrap();

        assert_eq!(handed, Some(fence));
        assert_eq!(sync.image_in_use(image), Some(fence));
        assert!(!device.is_signaled(fence));
        retire_all(&device, &sync);
    }

    #[test]
    fn test_free_image_needs_no_wait() {
        let (device, sync) = manager(3);
        let frame = FrameInFlightIndex::new(0);

        sync.wait_for_image(frame, SwapchainIndex::new(0)).unwrap();
        assert!(device.waited_fences().is_empty());
    }

    #[test]
    fn test_same_image_from_two_frames_waits_for_first_fence() {
        let (device, mut sync) = manager(3);
        let first = FrameInFlightIndex::new(0);
        let second = first.next();
        let image = SwapchainIndex::new(1);

        // Frame 0 renders into image 1; its fence stays unsignaled (GPU busy).
        sync.wait_for_frame(first).unwrap();
        sync.wait_for_image(first, image).unwrap();
        sync.submit_frame(first, image, queued).unwrap();
        let first_fence = sync.in_flight_fence(first);

        // Frame 1 is handed the same image before frame 0 retired.
        sync.wait_for_frame(second).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            sync.wait_for_image(second, image).unwrap();
            done_tx.send(()).unwrap();
            sync
        });

        assert!(
            done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "second frame reused the image before the first frame's fence signaled"
        );

        device.signal(first_fence);
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("wait did not resume after the fence signaled");

        let mut sync = worker.join().unwrap();
        sync.submit_frame(second, image, queued).unwrap();
        assert_eq!(sync.image_in_use(image), Some(sync.in_flight_fence(second)));
        assert!(device.waited_fences().contains(&first_fence));
        retire_all(&device, &sync);
    }

    #[test]
    fn test_same_frame_does_not_wait_on_itself() {
        let (device, mut sync) = manager(2);
        let frame = FrameInFlightIndex::new(0);
        let image = SwapchainIndex::new(0);

        sync.submit_frame(frame, image, queued).unwrap();
        device.signal(sync.in_flight_fence(frame));
        sync.wait_for_frame(frame).unwrap();
        let waits_before = device.waited_fences().len();

        sync.wait_for_image(frame, image).unwrap();
        assert_eq!(device.waited_fences().len(), waits_before);
    }

    #[test]
    fn test_failed_submit_releases_fence() {
        let (device, mut sync) = manager(3);
        let frame = FrameInFlightIndex::new(0);
        let image = SwapchainIndex::new(0);
        let fence = sync.in_flight_fence(frame);

        sync.wait_for_frame(frame).unwrap();
        sync.wait_for_image(frame, image).unwrap();
        let result = sync.submit_frame(frame, image, |_| {
            Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
        });

        assert!(matches!(
            result,
            Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
        ));
        assert!(device.is_signaled(fence));
        assert_eq!(sync.image_in_use(image), None);
    }

    #[test]
    fn test_teardown_after_failed_submit_does_not_block() {
        let (device, mut sync) = manager(3);
        let frame = FrameInFlightIndex::new(0);

        sync.wait_for_frame(frame).unwrap();
        let _ = sync.submit_frame(frame, SwapchainIndex::new(0), |_| {
            Err(RhiError::SwapchainError("recording failed".to_string()))
        });

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            sync.wait_for_frame(frame).unwrap();
            drop(sync);
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("teardown blocked on a fence no submission owns");
        assert_eq!(device.live_fences(), 0);
    }

    #[test]
    fn test_drop_waits_then_destroys_everything() {
        let (device, sync) = manager(3);
        drop(sync);
        assert_eq!(device.live_fences(), 0);
        assert_eq!(device.live_semaphores(), 0);
    }

    #[test]
    fn test_frame_index_cycles() {
        let mut frame = FrameInFlightIndex::default();
        let start = frame;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            frame.advance();
        }
        assert_eq!(frame, start);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_frame_index_out_of_range_panics() {
        FrameInFlightIndex::new(MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_swapchain_index_sentinel() {
        assert!(!SwapchainIndex::MAX.is_valid());
        assert!(SwapchainIndex::new(0).is_valid());
        assert_eq!(SwapchainIndex::MAX.get(), u32::MAX);
    }
}
