//! Synchronization primitives.
//!
//! This module provides wrappers for the two Vulkan synchronization objects
//! the frame loop is built on:
//! - [`Semaphore`] - GPU-to-GPU ordering (between queue operations)
//! - [`Fence`] - GPU-to-CPU ordering (the host waits on it)
//!
//! # Overview
//!
//! Semaphores order work on the GPU timeline and are never waited on by the
//! CPU: the frame pacer uses one to gate rendering on image acquisition and
//! one to gate presentation on rendering. Fences are what bounds how far the
//! CPU may run ahead - the pacer waits on a slot's fence before reusing the
//! slot's resources.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan semaphore wrapper.
///
/// Immutable after creation; the frame pacer owns one pair per frame slot.
pub struct Semaphore {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan semaphore handle.
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a new semaphore in the unsignaled state.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>, name: &str) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };
        device.set_object_name(semaphore, name);

        debug!("Created semaphore '{}'", name);

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Vulkan fence wrapper.
///
/// Fences let the host observe GPU completion. The pacer creates its
/// per-slot fences signaled so the first wait on a fresh slot returns
/// immediately.
pub struct Fence {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan fence handle.
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// # Arguments
    ///
    /// * `signaled` - If true, the fence starts in the signaled state
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool, name: &str) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };
        device.set_object_name(fence, name);

        debug!("Created fence '{}' (signaled: {})", name, signaled);

        Ok(Self { device, fence })
    }

    /// Returns the Vulkan fence handle.
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks the calling thread until the fence signals.
    ///
    /// The timeout is effectively infinite; a timeout surfacing here means
    /// the device has stopped making progress and is treated as fatal by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails or times out.
    pub fn wait(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().wait_for_fences(
                std::slice::from_ref(&self.fence),
                true,
                u64::MAX,
            )?;
        }
        Ok(())
    }

    /// Resets the fence to the unsignaled state.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_fences(std::slice::from_ref(&self.fence))?;
        }
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_primitives_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Semaphore>();
        assert_send::<Fence>();
    }
}
