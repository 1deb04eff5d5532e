//! Usage-tracked images and layout transitions.
//!
//! This module is the resource-state core of the renderer. Every GPU image
//! the pipeline touches is a [`TrackedImage`]: alongside the Vulkan handles
//! it records, per array layer, the usage the GPU will observe at the point
//! the next recorded command executes - a [`ResourceState`] of layout,
//! access mask and pipeline stage.
//!
//! # Transitions
//!
//! Moving an image (or a subset of its layers) to a new usage goes through
//! [`TrackedImage::transition`] / [`TrackedImage::transition_layers`]. The
//! tracker reads the "before" side of the barrier from its own recorded
//! state, appends exactly one `vkCmdPipelineBarrier` to the command
//! sequence, and overwrites the recorded state of exactly the affected
//! layers. Callers never supply the prior state, which removes the
//! stale-barrier bug class that comes with caller-side bookkeeping.
//!
//! Layers of one image may sit in different states simultaneously: while one
//! cube face is being rendered, the other five stay shader-readable. A
//! transition whose target state equals the current one still emits a
//! (degenerate) barrier - elision is not attempted.
//!
//! # Single writer
//!
//! `transition` takes `&mut self`; the recording thread is the only writer
//! of tracked state. Malformed requests (out-of-range layers, a range whose
//! layers disagree on their current state) are contract violations checked
//! with debug assertions, not runtime errors.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, info};

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandBuffer, CommandPool};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::teardown::ReleaseResource;

/// The usage of an image as observed by the GPU: memory layout, access
/// intent and the pipeline stage scoping the synchronization point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceState {
    /// GPU-internal memory arrangement.
    pub layout: vk::ImageLayout,
    /// Access intent of the next use.
    pub access: vk::AccessFlags,
    /// Pipeline stage at which the next use takes effect.
    pub stage: vk::PipelineStageFlags,
}

impl ResourceState {
    /// State of a freshly created image; contents are undefined.
    pub const UNDEFINED: Self = Self {
        layout: vk::ImageLayout::UNDEFINED,
        access: vk::AccessFlags::empty(),
        stage: vk::PipelineStageFlags::TOP_OF_PIPE,
    };

    /// Destination of a staging copy.
    pub const TRANSFER_DST: Self = Self {
        layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        access: vk::AccessFlags::TRANSFER_WRITE,
        stage: vk::PipelineStageFlags::TRANSFER,
    };

    /// Depth attachment being written (depth prepass).
    pub const DEPTH_WRITE: Self = Self {
        layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
    };

    /// Depth attachment read with an EQUAL test, no writes (G-buffer pass).
    pub const DEPTH_EQUAL_READ: Self = Self {
        layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
    };

    /// Depth bound read-only as attachment and sampled in the fragment
    /// shader at the same time (lighting pass).
    pub const DEPTH_SAMPLED: Self = Self {
        layout: vk::ImageLayout::READ_ONLY_OPTIMAL,
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags::SHADER_READ.as_raw(),
        ),
        stage: vk::PipelineStageFlags::from_raw(
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS.as_raw()
                | vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw(),
        ),
    };

    /// Color attachment being written.
    pub const COLOR_WRITE: Self = Self {
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    };

    /// Sampled in the fragment shader.
    pub const SHADER_SAMPLED: Self = Self {
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        access: vk::AccessFlags::SHADER_READ,
        stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
    };

    /// Handed to the presentation engine.
    pub const PRESENT_SRC: Self = Self {
        layout: vk::ImageLayout::PRESENT_SRC_KHR,
        access: vk::AccessFlags::empty(),
        stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    };
}

/// Per-layer usage bookkeeping.
///
/// Pure state machine; the GPU-facing side of a transition is built from
/// what this records.
struct LayerUsage {
    states: Vec<ResourceState>,
}

impl LayerUsage {
    fn new(layers: u32) -> Self {
        Self {
            states: vec![ResourceState::UNDEFINED; layers as usize],
        }
    }

    /// Returns the recorded state of one layer.
    fn state(&self, layer: u32) -> ResourceState {
        self.states[layer as usize]
    }

    /// Reads the "before" state of a layer range and overwrites the range
    /// with `after`. Layers outside the range are untouched.
    ///
    /// The range must be in bounds and its layers must agree on their
    /// current state (caller contract).
    fn begin_transition(
        &mut self,
        base_layer: u32,
        layer_count: u32,
        after: ResourceState,
    ) -> ResourceState {
        let base = base_layer as usize;
        let count = layer_count as usize;
        debug_assert!(count > 0, "transition must cover at least one layer");
        debug_assert!(
            base + count <= self.states.len(),
            "layer range {}..{} out of bounds for {} layers",
            base,
            base + count,
            self.states.len()
        );

        let before = self.states[base];
        debug_assert!(
            self.states[base..base + count].iter().all(|s| *s == before),
            "layers in one transition must share their current state"
        );

        for state in &mut self.states[base..base + count] {
            *state = after;
        }

        before
    }
}

/// Builds the single image memory barrier describing a state hand-off.
fn image_barrier(
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    before: ResourceState,
    after: ResourceState,
    base_layer: u32,
    layer_count: u32,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(before.layout)
        .new_layout(after.layout)
        .src_access_mask(before.access)
        .dst_access_mask(after.access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(base_layer)
                .layer_count(layer_count),
        )
}

/// Immutable image creation parameters.
///
/// Built fully before the creation call with struct-update syntax; nothing
/// accumulates between creations.
#[derive(Clone, Debug)]
pub struct ImageConfig {
    /// Pixel format.
    pub format: vk::Format,
    /// 2D extent.
    pub extent: vk::Extent2D,
    /// Array layer count (6 for cube images).
    pub layers: u32,
    /// Image aspect (color or depth).
    pub aspect: vk::ImageAspectFlags,
    /// Usage flags.
    pub usage: vk::ImageUsageFlags,
    /// Whether the image may be viewed as a cube map.
    pub cube_compatible: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            format: vk::Format::R8G8B8A8_SRGB,
            extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            layers: 1,
            aspect: vk::ImageAspectFlags::COLOR,
            usage: vk::ImageUsageFlags::SAMPLED,
            cube_compatible: false,
        }
    }
}

/// A GPU image with per-layer usage tracking.
///
/// Every image exposes one whole-resource view plus one view per array
/// layer, uniformly - the whole view of a 6-layer cube-compatible image is
/// a cube view, of a multi-layer image an array view, of a flat image a 2D
/// view. Layer views are always 2D.
///
/// The struct carries no `Drop`: startup-lifetime images hand a release
/// descriptor to the teardown stack via
/// [`release_resource`](Self::release_resource); rebuild-lifetime images
/// (the depth target, swapchain wrappers) are destroyed explicitly with
/// [`destroy`](Self::destroy).
pub struct TrackedImage {
    /// The image handle.
    image: vk::Image,
    /// Whole-resource view.
    full_view: vk::ImageView,
    /// One 2D view per array layer.
    layer_views: Vec<vk::ImageView>,
    /// Backing allocation; `None` for externally owned images.
    allocation: Option<Allocation>,
    /// Whether `destroy`/`release_resource` should destroy the image handle.
    owns_image: bool,
    /// Pixel format.
    format: vk::Format,
    /// 2D extent.
    extent: vk::Extent2D,
    /// Array layer count.
    layers: u32,
    /// Image aspect.
    aspect: vk::ImageAspectFlags,
    /// Per-layer usage states.
    usage: LayerUsage,
}

impl TrackedImage {
    /// Creates a GPU-only image from an immutable configuration.
    ///
    /// The image starts with undefined contents; issue an initial transition
    /// before first use.
    ///
    /// # Errors
    ///
    /// Returns an error if image creation, memory allocation or view
    /// creation fails, or if the extent has a zero dimension.
    pub fn new(device: &Arc<Device>, config: &ImageConfig, label: &str) -> RhiResult<Self> {
        if config.extent.width == 0 || config.extent.height == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "Image '{}' dimensions must be greater than 0",
                label
            )));
        }

        let flags = if config.cube_compatible {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(config.format)
            .extent(vk::Extent3D {
                width: config.extent.width,
                height: config.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(config.layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(config.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .flags(flags);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: label,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        device.set_object_name(image, label);

        let (full_view, layer_views) = create_views(device, image, config, label)?;

        info!(
            "Created image '{}': {}x{} {:?}, {} layer(s)",
            label, config.extent.width, config.extent.height, config.format, config.layers
        );

        Ok(Self {
            image,
            full_view,
            layer_views,
            allocation: Some(allocation),
            owns_image: true,
            format: config.format,
            extent: config.extent,
            layers: config.layers,
            aspect: config.aspect,
            usage: LayerUsage::new(config.layers),
        })
    }

    /// Wraps an externally owned image (a swapchain image) with tracking and
    /// views. The wrapper never destroys the image handle itself.
    ///
    /// # Errors
    ///
    /// Returns an error if view creation fails.
    pub fn from_raw(
        device: &Arc<Device>,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
        label: &str,
    ) -> RhiResult<Self> {
        let config = ImageConfig {
            format,
            extent,
            ..Default::default()
        };
        device.set_object_name(image, label);
        let (full_view, layer_views) = create_views(device, image, &config, label)?;

        Ok(Self {
            image,
            full_view,
            layer_views,
            allocation: None,
            owns_image: false,
            format,
            extent,
            layers: 1,
            aspect: vk::ImageAspectFlags::COLOR,
            usage: LayerUsage::new(1),
        })
    }

    /// Creates a sampled image and uploads pixel data through a staging
    /// buffer, leaving it in [`ResourceState::SHADER_SAMPLED`].
    ///
    /// # Errors
    ///
    /// Returns an error if creation, the staging upload or the blocking
    /// submit fails.
    pub fn with_pixels(
        device: &Arc<Device>,
        pool: &CommandPool,
        config: &ImageConfig,
        pixels: &[u8],
        label: &str,
    ) -> RhiResult<Self> {
        let config = ImageConfig {
            usage: config.usage | vk::ImageUsageFlags::TRANSFER_DST,
            ..config.clone()
        };
        let mut image = Self::new(device, &config, label)?;

        let staging = Buffer::new_with_data(device.clone(), BufferUsage::Staging, pixels)?;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(config.aspect)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(config.layers),
            )
            .image_extent(vk::Extent3D {
                width: config.extent.width,
                height: config.extent.height,
                depth: 1,
            });

        pool.record_one_time(|cmd| {
            image.transition(cmd, ResourceState::TRANSFER_DST);
            cmd.copy_buffer_to_image(
                staging.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            image.transition(cmd, ResourceState::SHADER_SAMPLED);
            Ok(())
        })?;

        debug!("Uploaded {} bytes into image '{}'", pixels.len(), label);

        Ok(image)
    }

    /// Loads an equirectangular HDR file into an RGBA32F sampled image.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or the upload fails.
    pub fn from_hdr_file(
        device: &Arc<Device>,
        pool: &CommandPool,
        path: &Path,
        label: &str,
    ) -> RhiResult<Self> {
        let decoded = image::ImageReader::open(path)
            .map_err(|e| RhiError::AssetError(format!("Failed to open {:?}: {}", path, e)))?
            .decode()
            .map_err(|e| RhiError::AssetError(format!("Failed to decode {:?}: {}", path, e)))?;

        let rgba = decoded.to_rgba32f();
        let (width, height) = (rgba.width(), rgba.height());
        let pixels: &[u8] = bytemuck::cast_slice(rgba.as_raw());

        info!("Decoded HDR environment {:?} ({}x{})", path, width, height);

        let config = ImageConfig {
            format: vk::Format::R32G32B32A32_SFLOAT,
            extent: vk::Extent2D { width, height },
            ..Default::default()
        };

        Self::with_pixels(device, pool, &config, pixels, label)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Transitions every layer to `state`, appending exactly one barrier to
    /// the command sequence.
    ///
    /// The barrier's "before" side comes from the recorded state; afterwards
    /// the recorded state equals `state` for all layers.
    pub fn transition(&mut self, cmd: &CommandBuffer, state: ResourceState) {
        self.transition_layers(cmd, state, 0, self.layers);
    }

    /// Transitions `layer_count` layers starting at `base_layer`, leaving
    /// the other layers' recorded usage untouched.
    pub fn transition_layers(
        &mut self,
        cmd: &CommandBuffer,
        state: ResourceState,
        base_layer: u32,
        layer_count: u32,
    ) {
        let before = self.usage.begin_transition(base_layer, layer_count, state);
        let barrier = image_barrier(
            self.image,
            self.aspect,
            before,
            state,
            base_layer,
            layer_count,
        );
        cmd.pipeline_barrier(before.stage, state.stage, &[barrier]);
    }

    /// Returns the recorded usage of one layer.
    #[inline]
    pub fn layer_state(&self, layer: u32) -> ResourceState {
        self.usage.state(layer)
    }

    /// Returns the recorded usage of layer 0, the common case for flat
    /// images.
    #[inline]
    pub fn current_state(&self) -> ResourceState {
        self.usage.state(0)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the whole-resource view.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.full_view
    }

    /// Returns the 2D view of one layer.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is out of bounds.
    #[inline]
    pub fn layer_view(&self, layer: u32) -> vk::ImageView {
        self.layer_views[layer as usize]
    }

    /// Returns the pixel format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the 2D extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Returns the array layer count.
    #[inline]
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Returns the image aspect.
    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    // =========================================================================
    // Lifetime
    // =========================================================================

    /// Hands out the release descriptor for the teardown stack.
    ///
    /// The image keeps its handles and remains usable; only the allocation
    /// moves into the descriptor. Call exactly once, at registration time,
    /// and do not also call [`destroy`](Self::destroy) afterwards.
    pub fn release_resource(&mut self) -> ReleaseResource {
        let mut views = vec![self.full_view];
        views.extend_from_slice(&self.layer_views);

        ReleaseResource::Image {
            image: if self.owns_image {
                self.image
            } else {
                vk::Image::null()
            },
            views,
            allocation: self.allocation.take(),
        }
    }

    /// Destroys the views, the image (if owned) and the allocation now.
    ///
    /// Used on the rebuild path (depth target, swapchain wrappers), where
    /// resources die and are recreated mid-run. The GPU must be idle.
    pub fn destroy(&mut self, device: &Device) {
        unsafe {
            device.handle().destroy_image_view(self.full_view, None);
            for view in self.layer_views.drain(..) {
                device.handle().destroy_image_view(view, None);
            }
            if self.owns_image {
                device.handle().destroy_image(self.image, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free image allocation: {:?}", e);
            }
        }
        self.full_view = vk::ImageView::null();
        self.image = vk::Image::null();
    }
}

/// Creates the whole-resource view plus one 2D view per layer.
fn create_views(
    device: &Arc<Device>,
    image: vk::Image,
    config: &ImageConfig,
    label: &str,
) -> RhiResult<(vk::ImageView, Vec<vk::ImageView>)> {
    let full_view_type = if config.cube_compatible && config.layers == 6 {
        vk::ImageViewType::CUBE
    } else if config.layers > 1 {
        vk::ImageViewType::TYPE_2D_ARRAY
    } else {
        vk::ImageViewType::TYPE_2D
    };

    let full_range = vk::ImageSubresourceRange::default()
        .aspect_mask(config.aspect)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(config.layers);

    let full_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(full_view_type)
        .format(config.format)
        .subresource_range(full_range);

    let full_view = unsafe { device.handle().create_image_view(&full_info, None)? };
    device.set_object_name(full_view, &format!("{} view", label));

    let mut layer_views = Vec::with_capacity(config.layers as usize);
    for layer in 0..config.layers {
        let layer_range = vk::ImageSubresourceRange::default()
            .aspect_mask(config.aspect)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(layer)
            .layer_count(1);

        let layer_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(config.format)
            .subresource_range(layer_range);

        let view = unsafe { device.handle().create_image_view(&layer_info, None)? };
        device.set_object_name(view, &format!("{} layer {} view", label, layer));
        layer_views.push(view);
    }

    Ok((full_view, layer_views))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_sequence_chains_before_states() {
        let mut usage = LayerUsage::new(1);

        let sequence = [
            ResourceState::COLOR_WRITE,
            ResourceState::SHADER_SAMPLED,
            ResourceState::COLOR_WRITE,
            ResourceState::PRESENT_SRC,
        ];

        let mut expected_before = ResourceState::UNDEFINED;
        for state in sequence {
            let before = usage.begin_transition(0, 1, state);
            assert_eq!(before, expected_before);
            assert_eq!(usage.state(0), state);
            expected_before = state;
        }
    }

    #[test]
    fn test_noop_transition_still_reports_before() {
        let mut usage = LayerUsage::new(1);
        usage.begin_transition(0, 1, ResourceState::COLOR_WRITE);

        // Same target again: legal, reported as a degenerate hand-off
        let before = usage.begin_transition(0, 1, ResourceState::COLOR_WRITE);
        assert_eq!(before, ResourceState::COLOR_WRITE);
        assert_eq!(usage.state(0), ResourceState::COLOR_WRITE);
    }

    #[test]
    fn test_partial_layer_transition_leaves_siblings_untouched() {
        let mut usage = LayerUsage::new(6);
        usage.begin_transition(0, 6, ResourceState::SHADER_SAMPLED);

        // Render into faces 2 and 3 only
        let before = usage.begin_transition(2, 2, ResourceState::COLOR_WRITE);
        assert_eq!(before, ResourceState::SHADER_SAMPLED);

        for layer in [0, 1, 4, 5] {
            assert_eq!(usage.state(layer), ResourceState::SHADER_SAMPLED);
        }
        assert_eq!(usage.state(2), ResourceState::COLOR_WRITE);
        assert_eq!(usage.state(3), ResourceState::COLOR_WRITE);

        // The untouched layers transition independently of [2, 3]
        let before = usage.begin_transition(0, 2, ResourceState::COLOR_WRITE);
        assert_eq!(before, ResourceState::SHADER_SAMPLED);
        let before = usage.begin_transition(4, 2, ResourceState::COLOR_WRITE);
        assert_eq!(before, ResourceState::SHADER_SAMPLED);

        for layer in 0..6 {
            assert_eq!(usage.state(layer), ResourceState::COLOR_WRITE);
        }
    }

    #[test]
    fn test_barrier_fields_mirror_states() {
        let before = ResourceState::DEPTH_WRITE;
        let after = ResourceState::DEPTH_SAMPLED;

        let barrier = image_barrier(
            vk::Image::null(),
            vk::ImageAspectFlags::DEPTH,
            before,
            after,
            0,
            1,
        );

        assert_eq!(barrier.old_layout, before.layout);
        assert_eq!(barrier.new_layout, after.layout);
        assert_eq!(barrier.src_access_mask, before.access);
        assert_eq!(barrier.dst_access_mask, after.access);
        assert_eq!(barrier.subresource_range.base_array_layer, 0);
        assert_eq!(barrier.subresource_range.layer_count, 1);
        assert_eq!(
            barrier.subresource_range.aspect_mask,
            vk::ImageAspectFlags::DEPTH
        );
    }

    #[test]
    fn test_barrier_covers_requested_layer_range() {
        let barrier = image_barrier(
            vk::Image::null(),
            vk::ImageAspectFlags::COLOR,
            ResourceState::SHADER_SAMPLED,
            ResourceState::COLOR_WRITE,
            2,
            3,
        );

        assert_eq!(barrier.subresource_range.base_array_layer, 2);
        assert_eq!(barrier.subresource_range.layer_count, 3);
    }

    #[test]
    fn test_image_config_defaults() {
        let config = ImageConfig::default();
        assert_eq!(config.layers, 1);
        assert_eq!(config.aspect, vk::ImageAspectFlags::COLOR);
        assert!(!config.cube_compatible);
    }
}
