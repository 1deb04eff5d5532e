//! Frame pacing and the acquire/submit/present protocol.
//!
//! This module bounds how many frames of CPU work may be in flight ahead of
//! the GPU. The [`FramePacer`] owns [`PACED_FRAMES`](crate::PACED_FRAMES)
//! frame slots, used in round-robin order; each slot bundles the
//! synchronization primitives and command buffer for one in-flight frame:
//!
//! - a `work_submitted` fence the CPU waits on before reusing the slot -
//!   the sole mechanism bounding CPU lead over the GPU
//! - an `image_acquired` semaphore gating rendering on the presentation
//!   engine handing over an image
//! - a `render_finished` semaphore gating presentation on rendering
//!
//! # Frame protocol
//!
//! ```text
//! begin_frame:
//!   1. wait on the slot's work_submitted fence (frame i-N fully done)
//!   2. acquire the next presentable image, signaling image_acquired
//!   3. stale surface? abort the frame pre-submission (the only
//!      cancellation point) and report SurfaceStale
//! record:
//!   pass sequencing appends to the slot's command buffer
//! end_frame:
//!   4. reset the fence, submit gated on image_acquired, signaling
//!      render_finished and the fence
//!   5. present gated on render_finished
//!   6. advance to the next slot; report staleness for post-present rebuild
//! ```
//!
//! For any two frames `i` and `i + PACED_FRAMES` the GPU work of frame `i`
//! is complete before recording of the later frame begins (same slot, same
//! fence). Frames in distinct slots overlap freely.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use ember_rhi::RhiResult;
use ember_rhi::command::{CommandBuffer, CommandPool};
use ember_rhi::device::Device;
use ember_rhi::swapchain::Swapchain;
use ember_rhi::sync::{Fence, Semaphore};

use crate::PACED_FRAMES;

/// Everything pass recording needs to know about the current frame,
/// passed explicitly instead of read from shared state.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    /// Index of the frame slot in use.
    pub slot_index: usize,
    /// Index of the acquired presentable image.
    pub image_index: u32,
    /// Monotonically increasing frame number.
    pub frame_number: u64,
}

/// Outcome of [`FramePacer::begin_frame`].
pub enum FrameStart {
    /// An image was acquired; record and submit the frame.
    Acquired(FrameContext),
    /// The surface is stale; the frame was aborted before any submission
    /// and the caller must rebuild surface resources.
    SurfaceStale,
}

/// Synchronization primitives and command buffer for one in-flight frame.
pub struct FrameSlot {
    /// Command buffer recorded for this slot's frame.
    command_buffer: CommandBuffer,
    /// Signaled by the presentation engine when the acquired image is ready.
    image_acquired: Semaphore,
    /// Signaled by the GPU when the frame's rendering completes.
    render_finished: Semaphore,
    /// Signaled by the GPU when the frame's submission fully completes;
    /// created signaled so a fresh slot's first wait returns immediately.
    work_submitted: Fence,
}

impl FrameSlot {
    fn new(device: &Arc<Device>, pool: &CommandPool, index: usize) -> RhiResult<Self> {
        let command_buffer = CommandBuffer::new(device.clone(), pool)?;
        let image_acquired = Semaphore::new(device.clone(), &format!("image acquired {}", index))?;
        let render_finished =
            Semaphore::new(device.clone(), &format!("render finished {}", index))?;
        let work_submitted = Fence::new(device.clone(), true, &format!("work submitted {}", index))?;

        Ok(Self {
            command_buffer,
            image_acquired,
            render_finished,
            work_submitted,
        })
    }

    /// Returns the slot's command buffer.
    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }
}

/// Owns the rotating frame slots and drives the frame protocol.
///
/// # Thread Safety
///
/// Not thread-safe; the single recording thread owns it.
pub struct FramePacer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// The frame slots, all created together and destroyed together.
    slots: Vec<FrameSlot>,
    /// Index of the slot serving the current frame.
    current_slot: usize,
    /// Number of frames completed through `end_frame`.
    frame_number: u64,
}

impl FramePacer {
    /// Creates the pacer and all its frame slots.
    ///
    /// # Errors
    ///
    /// Returns an error if any primitive creation fails.
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(PACED_FRAMES);
        for index in 0..PACED_FRAMES {
            slots.push(FrameSlot::new(&device, pool, index)?);
        }

        info!("Frame pacer created with {} slots", PACED_FRAMES);

        Ok(Self {
            device,
            slots,
            current_slot: 0,
            frame_number: 0,
        })
    }

    /// Returns the slot serving the current frame.
    #[inline]
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[self.current_slot]
    }

    /// Returns the number of frames completed so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Begins a frame: waits for the slot to be free, then acquires the
    /// next presentable image.
    ///
    /// Blocks on the slot's `work_submitted` fence, which bounds CPU lead
    /// to [`PACED_FRAMES`] frames. On a stale surface the frame is aborted
    /// before any state change - the fence stays signaled and the slot is
    /// not advanced, so the frame can simply be retried after a rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait or the acquisition fails for any reason
    /// other than a stale surface.
    pub fn begin_frame(&mut self, swapchain: &Swapchain) -> RhiResult<FrameStart> {
        let slot = &self.slots[self.current_slot];

        slot.work_submitted.wait()?;

        match swapchain.acquire_next_image(slot.image_acquired.handle()) {
            Ok((image_index, _suboptimal)) => Ok(FrameStart::Acquired(FrameContext {
                slot_index: self.current_slot,
                image_index,
                frame_number: self.frame_number,
            })),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Surface stale during acquire, aborting frame");
                Ok(FrameStart::SurfaceStale)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ends a frame: submits the slot's command sequence and presents the
    /// acquired image, then advances to the next slot.
    ///
    /// The submission waits on `image_acquired` at color-attachment output
    /// and signals `render_finished` plus the slot fence; presentation
    /// waits on `render_finished`. Once submitted, the frame cannot be
    /// withdrawn.
    ///
    /// # Returns
    ///
    /// `true` if presentation reported a stale or suboptimal surface; the
    /// caller rebuilds after the (best-effort) present.
    ///
    /// # Errors
    ///
    /// Returns an error if the fence reset, submission or presentation
    /// fails for any reason other than staleness.
    pub fn end_frame(&mut self, swapchain: &Swapchain, ctx: &FrameContext) -> RhiResult<bool> {
        let slot = &self.slots[self.current_slot];

        slot.work_submitted.reset()?;

        let wait_semaphores = [slot.image_acquired.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_finished.handle()];
        let command_buffers = [slot.command_buffer.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.handle().queue_submit(
                self.device.graphics_queue(),
                &[submit_info],
                slot.work_submitted.handle(),
            )?;
        }

        let present_result = swapchain.present(
            self.device.present_queue(),
            ctx.image_index,
            slot.render_finished.handle(),
        );

        self.current_slot = next_slot(self.current_slot);
        self.frame_number += 1;

        match present_result {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Surface stale during present");
                Ok(true)
            }
            Err(vk::Result::SUBOPTIMAL_KHR) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Round-robin slot advance.
fn next_slot(current: usize) -> usize {
    (current + 1) % PACED_FRAMES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paced_frames_is_reasonable() {
        assert!(PACED_FRAMES >= 1);
        assert!(PACED_FRAMES <= 3);
    }

    #[test]
    fn test_slot_rotation_is_round_robin() {
        let mut slot = 0;
        let mut seen = Vec::new();
        for _ in 0..(PACED_FRAMES * 3) {
            seen.push(slot);
            slot = next_slot(slot);
        }

        // Every PACED_FRAMES-th frame lands on the same slot
        for (i, &s) in seen.iter().enumerate() {
            assert_eq!(s, i % PACED_FRAMES);
        }
    }

    #[test]
    fn test_frame_context_is_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<FrameContext>();
    }
}
