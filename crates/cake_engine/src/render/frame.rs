//! Frame-in-flight scheduling
//!
//! Up to [`MAX_FRAMES_IN_FLIGHT`] frames are prepared on the CPU while the
//! GPU works on earlier ones. Each slot owns a fence; the slot's command
//! buffer and uniform memory may only be touched after that fence has been
//! observed signaled. [`FrameScheduler::begin`] is the only way to obtain a
//! [`FrameSlot`], and it performs that wait.

use ash::vk;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Number of frames the CPU may run ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// CPU-visible completion signal for one frame slot
pub trait FrameFence {
    /// Block until the slot's previous submission has completed
    fn wait(&self) -> VulkanResult<()>;
    /// Unsignal before handing the fence to a new submission
    fn reset(&self) -> VulkanResult<()>;
    /// Return to the signaled state after a submission that never reached
    /// the queue
    fn restore(&mut self) -> VulkanResult<()>;
}

/// Proof that the slot's fence was observed signaled
///
/// Only [`FrameScheduler::begin`] creates these.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameSlot {
    index: usize,
}

impl FrameSlot {
    /// Frame-in-flight index in `[0, MAX_FRAMES_IN_FLIGHT)`
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Rotates through frame slots, waiting on each before reuse
pub struct FrameScheduler<F> {
    slots: Vec<F>,
    current: usize,
}

impl<F: FrameFence> FrameScheduler<F> {
    /// Schedule over `slots`, which must start signaled
    pub fn new(slots: Vec<F>) -> VulkanResult<Self> {
        if slots.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "frame scheduler needs at least one slot".to_string(),
            });
        }
        Ok(Self { slots, current: 0 })
    }

    /// Index of the slot the next `begin` waits on
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a scheduler has at least one slot
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wait for the current slot's fence and hand out its token
    pub fn begin(&self) -> VulkanResult<FrameSlot> {
        self.slots[self.current].wait()?;
        Ok(FrameSlot { index: self.current })
    }

    /// Synchronization objects of a slot that is ready
    pub fn slot(&self, slot: &FrameSlot) -> &F {
        &self.slots[slot.index]
    }

    /// Unsignal the slot's fence right before submitting to it
    fn arm(&self, slot: &FrameSlot) -> VulkanResult<()> {
        self.slots[slot.index].reset()
    }

    /// Arm the slot's fence and run `submit` with it
    ///
    /// If `submit` fails the fence is restored to signaled, so a later
    /// `begin` or teardown wait on this slot cannot hang. The submit error
    /// is still returned and ends the frame loop.
    pub fn submit(&mut self, slot: &FrameSlot, submit: impl FnOnce(&F) -> VulkanResult<()>) -> VulkanResult<()> {
        self.arm(slot)?;
        let fence = &mut self.slots[slot.index];
        if let Err(e) = submit(&*fence) {
            fence.restore()?;
            return Err(e);
        }
        Ok(())
    }

    /// Move on to the next slot
    pub fn advance(&mut self, slot: FrameSlot) {
        self.current = (slot.index + 1) % self.slots.len();
    }
}

/// Frame synchronizer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No swapchain yet
    Uninitialized,
    /// Ready to acquire the next image
    Ready,
    /// Acquire reported a stale swapchain; the frame was dropped
    AcquireFailed,
    /// Commands submitted, waiting on present
    Presenting,
    /// Swapchain-dependent resources are being rebuilt
    Recreating,
}

/// Result of an image acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Render into `image_index`; recreate after present if `suboptimal`
    Ready {
        /// Swapchain image to render into
        image_index: u32,
        /// Swapchain no longer matches the surface exactly
        suboptimal: bool,
    },
    /// Swapchain is out of date; recreate and skip this frame
    Stale,
}

/// Sort an acquire result into proceed, stale, or fatal
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> VulkanResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready { image_index, suboptimal }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
        Err(e) => Err(VulkanError::Api(e)),
    }
}

/// Whether the swapchain must be recreated after present
///
/// `suboptimal_at_acquire` carries the flag from the acquire of the same
/// frame; `resize_pending` is the window's resize flag.
pub fn classify_present(
    result: Result<bool, vk::Result>,
    suboptimal_at_acquire: bool,
    resize_pending: bool,
) -> VulkanResult<bool> {
    match result {
        Ok(suboptimal) => Ok(suboptimal || suboptimal_at_acquire || resize_pending),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(e) => Err(VulkanError::Api(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Simulated GPU fence
    ///
    /// A submission stays in flight until the CPU waits on it. Every wait is
    /// recorded in a log shared by all slots, so tests can see which fence
    /// was waited on and when.
    struct MockFence {
        index: usize,
        signaled: Cell<bool>,
        in_flight: Cell<bool>,
        log: Rc<RefCell<Vec<usize>>>,
    }

    impl MockFence {
        fn set(count: usize) -> (Vec<Self>, Rc<RefCell<Vec<usize>>>) {
            let log = Rc::new(RefCell::new(Vec::new()));
            let fences = (0..count)
                .map(|index| Self {
                    index,
                    signaled: Cell::new(true),
                    in_flight: Cell::new(false),
                    log: Rc::clone(&log),
                })
                .collect();
            (fences, log)
        }

        fn submit(&self) {
            assert!(!self.signaled.get(), "submitted to a fence that was not reset");
            self.in_flight.set(true);
        }
    }

    impl FrameFence for MockFence {
        fn wait(&self) -> VulkanResult<()> {
            self.log.borrow_mut().push(self.index);
            if self.in_flight.replace(false) {
                self.signaled.set(true);
            }
            if self.signaled.get() {
                Ok(())
            } else {
                // reset but never submitted: a real wait would hang
                Err(VulkanError::Api(vk::Result::TIMEOUT))
            }
        }

        fn reset(&self) -> VulkanResult<()> {
            if !self.signaled.get() {
                return Err(VulkanError::InvalidOperation {
                    reason: format!("fence {} reset while still in flight", self.index),
                });
            }
            self.signaled.set(false);
            Ok(())
        }

        fn restore(&mut self) -> VulkanResult<()> {
            self.in_flight.set(false);
            self.signaled.set(true);
            Ok(())
        }
    }

    #[test]
    fn test_slots_are_reused_only_after_fence_signaled() {
        let (fences, log) = MockFence::set(MAX_FRAMES_IN_FLIGHT);
        let mut scheduler = FrameScheduler::new(fences).expect("slots");
        let mut uniform_writes = vec![0u32; MAX_FRAMES_IN_FLIGHT];

        let frames = 7;
        for frame in 0..frames {
            let waits_before = log.borrow().len();
            let slot = scheduler.begin().expect("wait");
            assert_eq!(slot.index(), frame % MAX_FRAMES_IN_FLIGHT);

            // the token is handed out right after a wait on that same fence
            assert_eq!(log.borrow().len(), waits_before + 1);
            assert_eq!(log.borrow().last(), Some(&slot.index()));

            let fence = scheduler.slot(&slot);
            assert!(!fence.in_flight.get(), "slot {} still in flight", slot.index());
            assert!(fence.signaled.get(), "slot {} touched before its fence signaled", slot.index());
            uniform_writes[slot.index()] += 1;

            scheduler.arm(&slot).expect("reset");
            scheduler.slot(&slot).submit();
            scheduler.advance(slot);
        }

        assert_eq!(*log.borrow(), vec![0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(uniform_writes, vec![4, 3]);
        assert!(scheduler.slots.iter().all(|fence| fence.in_flight.get() || fence.signaled.get()));
    }

    #[test]
    fn test_arming_an_in_flight_fence_is_rejected() {
        let (fences, log) = MockFence::set(1);
        let mut scheduler = FrameScheduler::new(fences).expect("slots");

        let slot = scheduler.begin().expect("first wait");
        scheduler.arm(&slot).expect("reset");
        scheduler.slot(&slot).submit();

        // resetting behind the scheduler's back, without a wait, fails
        assert!(scheduler.slots[0].reset().is_err());

        scheduler.advance(slot);
        let slot = scheduler.begin().expect("second wait completes the submission");
        assert_eq!(*log.borrow(), vec![0, 0]);
        assert!(scheduler.arm(&slot).is_ok());
    }

    #[test]
    fn test_failed_submit_leaves_fence_waitable() {
        let (fences, log) = MockFence::set(MAX_FRAMES_IN_FLIGHT);
        let mut scheduler = FrameScheduler::new(fences).expect("slots");

        let slot = scheduler.begin().expect("wait");
        let result = scheduler.submit(&slot, |_| Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST)));
        assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
        assert!(scheduler.slot(&slot).signaled.get());
        drop(slot);

        let again = scheduler.begin().expect("fence was restored");
        assert_eq!(again.index(), 0);
        assert_eq!(*log.borrow(), vec![0, 0]);
    }

    #[test]
    fn test_successful_submit_leaves_fence_in_flight() {
        let (fences, _log) = MockFence::set(MAX_FRAMES_IN_FLIGHT);
        let mut scheduler = FrameScheduler::new(fences).expect("slots");

        let slot = scheduler.begin().expect("wait");
        scheduler
            .submit(&slot, |fence| {
                fence.submit();
                Ok(())
            })
            .expect("submit");
        assert!(scheduler.slot(&slot).in_flight.get());
        assert!(!scheduler.slot(&slot).signaled.get());
    }

    #[test]
    fn test_dropped_frame_does_not_advance_or_reset() {
        let (fences, log) = MockFence::set(MAX_FRAMES_IN_FLIGHT);
        let scheduler = FrameScheduler::new(fences).expect("slots");

        let slot = scheduler.begin().expect("wait");
        // stale acquire: bail out without arming
        drop(slot);

        let again = scheduler.begin().expect("second wait does not deadlock");
        assert_eq!(again.index(), 0);
        assert!(scheduler.slot(&again).signaled.get());
        assert_eq!(*log.borrow(), vec![0, 0]);
    }

    #[test]
    fn test_empty_scheduler_is_rejected() {
        assert!(FrameScheduler::<MockFence>::new(Vec::new()).is_err());
    }

    #[test]
    fn test_acquire_classification() {
        assert_eq!(
            classify_acquire(Ok((2, false))).ok(),
            Some(AcquireOutcome::Ready {
                image_index: 2,
                suboptimal: false
            })
        );
        assert_eq!(
            classify_acquire(Ok((0, true))).ok(),
            Some(AcquireOutcome::Ready {
                image_index: 0,
                suboptimal: true
            })
        );
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).ok(),
            Some(AcquireOutcome::Stale)
        );
        assert!(matches!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        ));
    }

    #[test]
    fn test_present_classification() {
        assert!(!classify_present(Ok(false), false, false).expect("ok"));
        assert!(classify_present(Ok(true), false, false).expect("ok"));
        assert!(classify_present(Ok(false), true, false).expect("ok"));
        assert!(classify_present(Ok(false), false, true).expect("ok"));
        assert!(classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR), false, false).expect("ok"));
        assert!(classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR), false, false).is_err());
    }
}
