//! Bounded frame-synchronization pool
//!
//! A fixed ring of fence/semaphore pairs caps the number of frames the CPU
//! may record ahead of the GPU. Each frame takes the next slot in ring order:
//! its fence gates reuse (waited with a bounded timeout, then reset) and its
//! semaphore carries the swapchain image acquisition for that frame.

use ash::vk;
use glyphterm_engine::{term_debug, term_err, term_warn, Error, Result};
use std::sync::Arc;

use crate::context::VulkanContext;

/// One slot in the ring: a fence and the acquire semaphore tied to it.
pub struct SyncSlot {
    /// Signaled when the GPU has fully retired the frame that last used
    /// this slot. Created signaled so the first pass over the ring never
    /// blocks.
    pub fence: vk::Fence,

    /// Signaled by swapchain image acquisition, waited by the frame's
    /// first submission.
    pub acquire_semaphore: vk::Semaphore,
}

/// Fixed-size ring of [`SyncSlot`]s, advanced one slot per frame.
pub struct FrameSyncPool {
    context: Arc<VulkanContext>,
    slots: Vec<SyncSlot>,
    next: usize,
    wait_timeout_ns: u64,
}

impl FrameSyncPool {
    pub fn new(context: Arc<VulkanContext>, depth: u32, wait_timeout_ns: u64) -> Result<Self> {
        let fence_info =
            vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let semaphore_info = vk::SemaphoreCreateInfo::default();

        let mut slots = Vec::with_capacity(depth as usize);
        for _ in 0..depth {
            let fence = unsafe {
                context.device.create_fence(&fence_info, None).map_err(|e| {
                    term_err!("glyphterm::sync_pool", "Failed to create fence: {:?}", e)
                })?
            };
            let acquire_semaphore = unsafe {
                context
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| {
                        unsafe { context.device.destroy_fence(fence, None) };
                        term_err!("glyphterm::sync_pool", "Failed to create semaphore: {:?}", e)
                    })?
            };
            slots.push(SyncSlot { fence, acquire_semaphore });
        }

        term_debug!("glyphterm::sync_pool", "Sync pool created with {} slots", depth);

        Ok(Self {
            context,
            slots,
            next: 0,
            wait_timeout_ns,
        })
    }

    /// Number of slots in the ring.
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Take the next slot in ring order, blocking until its previous use has
    /// retired. The slot's fence is reset before returning, so the caller
    /// MUST arm it again (by a fenced submission, or [`Self::signal_slot`]
    /// on the error path) or the ring will deadlock a full cycle later.
    pub fn acquire_slot(&mut self) -> Result<&SyncSlot> {
        let index = self.next;
        self.next = (self.next + 1) % self.slots.len();
        let slot = &self.slots[index];

        unsafe {
            match self.context.device.wait_for_fences(
                &[slot.fence],
                true,
                self.wait_timeout_ns,
            ) {
                Ok(()) => {}
                Err(vk::Result::TIMEOUT) => {
                    return Err(Error::Timeout(format!(
                        "Frame slot {} not retired within {} ms",
                        index,
                        self.wait_timeout_ns / 1_000_000
                    )));
                }
                Err(e) => {
                    return Err(term_err!(
                        "glyphterm::sync_pool",
                        "Fence wait failed on slot {}: {:?}",
                        index,
                        e
                    ));
                }
            }
            self.context
                .device
                .reset_fences(&[slot.fence])
                .map_err(|e| {
                    term_err!("glyphterm::sync_pool", "Fence reset failed: {:?}", e)
                })?;
        }

        Ok(slot)
    }

    /// Re-arm a slot's fence with an empty submission. Used when a frame
    /// aborts after [`Self::acquire_slot`] but before its fenced submission
    /// (e.g. the swapchain went out of date during image acquisition).
    pub fn signal_slot(&self, slot_fence: vk::Fence) -> Result<()> {
        let submit = vk::SubmitInfo2::default();
        unsafe {
            self.context
                .device
                .queue_submit2(self.context.graphics_queue, &[submit], slot_fence)
                .map_err(|e| {
                    term_err!("glyphterm::sync_pool", "Empty re-arm submit failed: {:?}", e)
                })
        }
    }

    /// Wait until every slot's fence is signaled, i.e. every in-flight frame
    /// has retired. Bounded by the same timeout as per-slot waits.
    pub fn wait_all(&self) -> Result<()> {
        let fences: Vec<vk::Fence> = self.slots.iter().map(|s| s.fence).collect();
        unsafe {
            match self
                .context
                .device
                .wait_for_fences(&fences, true, self.wait_timeout_ns)
            {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => Err(Error::Timeout(format!(
                    "In-flight frames not retired within {} ms",
                    self.wait_timeout_ns / 1_000_000
                ))),
                Err(e) => Err(term_err!(
                    "glyphterm::sync_pool",
                    "Fence wait failed during drain: {:?}",
                    e
                )),
            }
        }
    }
}

impl Drop for FrameSyncPool {
    fn drop(&mut self) {
        if let Err(e) = self.wait_all() {
            term_warn!("glyphterm::sync_pool", "Drain before destruction failed: {}", e);
        }
        unsafe {
            for slot in &self.slots {
                self.context.device.destroy_fence(slot.fence, None);
                self.context.device.destroy_semaphore(slot.acquire_semaphore, None);
            }
        }
    }
}
