//! Deferred, ordered teardown of GPU resources.
//!
//! This module provides the [`TeardownStack`], a LIFO registry of release
//! descriptors. Long-lived GPU resources register how they are released at
//! creation time, in creation order; at shutdown the stack is flushed once
//! and unwinds in strict reverse order, so a resource that depends on
//! another (a view into an image, an image into its allocation) is always
//! released before the resource it depends on.
//!
//! # Overview
//!
//! Entries are tagged descriptors - a resource kind plus the raw handles
//! needed to release it - rather than opaque callables. That keeps the stack
//! inspectable (each release is logged with its label) and avoids capturing
//! references into live objects, which would go stale when a resource is
//! replaced mid-run.
//!
//! The stack holds release *knowledge* only. The component that created a
//! resource keeps using its handles until the flush actually runs. Resources
//! that are destroyed and recreated during the run (the depth target, the
//! swapchain) are deliberately not registered here; their owners release
//! them explicitly on the rebuild path.
//!
//! If renderer construction fails partway, the stack is flushed with
//! whatever was registered up to that point, unwinding the partial build in
//! reverse order before the error propagates.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use tracing::{debug, info, warn};

use crate::device::Device;

/// A releasable GPU resource, tagged by kind.
pub enum ReleaseResource {
    /// An image with its views and backing allocation.
    ///
    /// Views are destroyed first, then the image, then the allocation is
    /// returned to the allocator.
    Image {
        /// The image handle.
        image: vk::Image,
        /// Every view created over the image (whole-resource and per-layer).
        views: Vec<vk::ImageView>,
        /// Backing memory; `None` for resources whose memory is owned
        /// elsewhere.
        allocation: Option<Allocation>,
    },
    /// A sampler.
    Sampler(vk::Sampler),
}

impl ReleaseResource {
    /// Human-readable kind tag, for flush logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseResource::Image { .. } => "image",
            ReleaseResource::Sampler(_) => "sampler",
        }
    }
}

/// One registered release action: a label plus the tagged resource.
pub struct ReleaseEntry {
    label: String,
    resource: ReleaseResource,
}

impl ReleaseEntry {
    /// Returns the label this entry was registered under.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the tagged resource.
    #[inline]
    pub fn resource(&self) -> &ReleaseResource {
        &self.resource
    }

    /// Releases the underlying resource.
    fn release(self, device: &Device) {
        debug!("teardown: releasing {} '{}'", self.resource.kind(), self.label);
        match self.resource {
            ReleaseResource::Image {
                image,
                views,
                allocation,
            } => unsafe {
                for view in views {
                    device.handle().destroy_image_view(view, None);
                }
                device.handle().destroy_image(image, None);
                if let Some(allocation) = allocation {
                    let mut allocator = device.allocator().lock().unwrap();
                    if let Err(e) = allocator.free(allocation) {
                        warn!("Failed to free allocation for '{}': {:?}", self.label, e);
                    }
                }
            },
            ReleaseResource::Sampler(sampler) => unsafe {
                device.handle().destroy_sampler(sampler, None);
            },
        }
    }
}

/// LIFO registry of release descriptors.
///
/// Push in creation order; [`flush`](Self::flush) releases in reverse. A
/// second flush is a no-op, so reaching shutdown through an error path after
/// a successful flush is harmless.
#[derive(Default)]
pub struct TeardownStack {
    entries: Vec<ReleaseEntry>,
}

impl TeardownStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a release descriptor.
    ///
    /// Registration order must follow creation/dependency order: push a
    /// resource after everything it depends on.
    pub fn push(&mut self, label: impl Into<String>, resource: ReleaseResource) {
        self.entries.push(ReleaseEntry {
            label: label.into(),
            resource,
        });
    }

    /// Returns the number of registered entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all entries, most recently pushed first.
    fn drain_lifo(&mut self) -> Vec<ReleaseEntry> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries
    }

    /// Releases every registered resource in reverse push order.
    ///
    /// The caller must guarantee the GPU no longer uses any of them
    /// (a device-wide idle wait precedes this at shutdown).
    pub fn flush(&mut self, device: &Device) {
        let entries = self.drain_lifo();
        if entries.is_empty() {
            return;
        }

        let count = entries.len();
        for entry in entries {
            entry.release(device);
        }
        info!("Teardown stack flushed ({} entries)", count);
    }
}

impl Drop for TeardownStack {
    fn drop(&mut self) {
        // The stack cannot release without a device; dropping unflushed
        // entries is a leak the owner should have prevented
        if !self.entries.is_empty() {
            warn!(
                "Teardown stack dropped with {} unflushed entries",
                self.entries.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_sampler_entry(stack: &mut TeardownStack, label: &str) {
        stack.push(label, ReleaseResource::Sampler(vk::Sampler::null()));
    }

    #[test]
    fn test_drain_is_reverse_of_push_order() {
        let mut stack = TeardownStack::new();
        for i in 0..8 {
            null_sampler_entry(&mut stack, &format!("entry-{}", i));
        }

        let labels: Vec<String> = stack
            .drain_lifo()
            .into_iter()
            .map(|e| e.label().to_string())
            .collect();

        let expected: Vec<String> = (0..8).rev().map(|i| format!("entry-{}", i)).collect();
        assert_eq!(labels, expected);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_second_drain_is_empty() {
        let mut stack = TeardownStack::new();
        null_sampler_entry(&mut stack, "only");

        assert_eq!(stack.drain_lifo().len(), 1);
        assert!(stack.drain_lifo().is_empty());
    }

    #[test]
    fn test_entry_introspection() {
        let mut stack = TeardownStack::new();
        null_sampler_entry(&mut stack, "linear-sampler");
        stack.push(
            "gbuffer-albedo",
            ReleaseResource::Image {
                image: vk::Image::null(),
                views: Vec::new(),
                allocation: None,
            },
        );

        assert_eq!(stack.len(), 2);
        let entries = stack.drain_lifo();
        assert_eq!(entries[0].label(), "gbuffer-albedo");
        assert_eq!(entries[0].resource().kind(), "image");
        assert_eq!(entries[1].label(), "linear-sampler");
        assert_eq!(entries[1].resource().kind(), "sampler");
    }
}
