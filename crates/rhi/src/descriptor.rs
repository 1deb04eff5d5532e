//! Descriptor set layouts, pools and writes.
//!
//! The renderer binds two kinds of descriptor data: a global set shared by
//! every frame (samplers, scene textures, light buffers, environment maps)
//! and a per-slot frame set (uniforms plus the attachments the lighting and
//! blit passes sample). This module provides the layout/pool wrappers and a
//! batched writer that keeps the referenced info structures alive until the
//! update is issued.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Descriptor set layout wrapper.
pub struct DescriptorSetLayout {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan layout handle.
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Creates a layout from binding descriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
        label: &str,
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };
        device.set_object_name(layout, label);

        debug!(
            "Created descriptor set layout '{}' ({} binding(s))",
            label,
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    /// Returns the Vulkan layout handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Builds a descriptor set layout binding for the given type and stages.
pub fn layout_binding(
    binding: u32,
    descriptor_type: vk::DescriptorType,
    count: u32,
    stages: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(descriptor_type)
        .descriptor_count(count)
        .stage_flags(stages)
}

/// Descriptor pool wrapper.
pub struct DescriptorPool {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan pool handle.
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Creates a pool able to allocate `max_sets` sets from `pool_sizes`.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!("Created descriptor pool (max {} sets)", max_sets);

        Ok(Self { device, pool })
    }

    /// Allocates one set per layout in `layouts`.
    ///
    /// The sets live as long as the pool; they are not individually freed.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails (pool exhausted).
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };
        Ok(sets)
    }

    /// Returns the Vulkan pool handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// One pending descriptor write.
enum PendingWrite {
    Buffer {
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        info: vk::DescriptorImageInfo,
    },
    ImageArray {
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        infos: Vec<vk::DescriptorImageInfo>,
    },
}

/// Batched descriptor writer.
///
/// Collects writes, then issues one `vkUpdateDescriptorSets` call. Owning
/// the buffer/image info structures until [`update`](Self::update) keeps the
/// pointers inside `VkWriteDescriptorSet` valid.
#[derive(Default)]
pub struct DescriptorWriter {
    writes: Vec<PendingWrite>,
}

impl DescriptorWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a whole-buffer uniform write.
    pub fn uniform_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) -> Self {
        self.writes.push(PendingWrite::Buffer {
            set,
            binding,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            info: vk::DescriptorBufferInfo::default()
                .buffer(buffer)
                .offset(0)
                .range(range),
        });
        self
    }

    /// Queues a whole-buffer storage write.
    pub fn storage_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) -> Self {
        self.writes.push(PendingWrite::Buffer {
            set,
            binding,
            descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
            info: vk::DescriptorBufferInfo::default()
                .buffer(buffer)
                .offset(0)
                .range(range),
        });
        self
    }

    /// Queues a standalone sampler write.
    pub fn sampler(mut self, set: vk::DescriptorSet, binding: u32, sampler: vk::Sampler) -> Self {
        self.writes.push(PendingWrite::Image {
            set,
            binding,
            descriptor_type: vk::DescriptorType::SAMPLER,
            info: vk::DescriptorImageInfo::default().sampler(sampler),
        });
        self
    }

    /// Queues a sampled-image write in the given layout.
    pub fn sampled_image(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> Self {
        self.writes.push(PendingWrite::Image {
            set,
            binding,
            descriptor_type: vk::DescriptorType::SAMPLED_IMAGE,
            info: vk::DescriptorImageInfo::default()
                .image_view(view)
                .image_layout(layout),
        });
        self
    }

    /// Queues a combined image/sampler write.
    pub fn combined_image_sampler(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        layout: vk::ImageLayout,
        sampler: vk::Sampler,
    ) -> Self {
        self.writes.push(PendingWrite::Image {
            set,
            binding,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            info: vk::DescriptorImageInfo::default()
                .image_view(view)
                .image_layout(layout)
                .sampler(sampler),
        });
        self
    }

    /// Queues a sampled-image array write (scene texture table).
    pub fn sampled_image_array(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        views: &[vk::ImageView],
        layout: vk::ImageLayout,
    ) -> Self {
        self.writes.push(PendingWrite::ImageArray {
            set,
            binding,
            descriptor_type: vk::DescriptorType::SAMPLED_IMAGE,
            infos: views
                .iter()
                .map(|&view| {
                    vk::DescriptorImageInfo::default()
                        .image_view(view)
                        .image_layout(layout)
                })
                .collect(),
        });
        self
    }

    /// Issues all queued writes in one call.
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|pending| match pending {
                PendingWrite::Buffer {
                    set,
                    binding,
                    descriptor_type,
                    info,
                } => vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*descriptor_type)
                    .buffer_info(std::slice::from_ref(info)),
                PendingWrite::Image {
                    set,
                    binding,
                    descriptor_type,
                    info,
                } => vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*descriptor_type)
                    .image_info(std::slice::from_ref(info)),
                PendingWrite::ImageArray {
                    set,
                    binding,
                    descriptor_type,
                    infos,
                } => vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*descriptor_type)
                    .image_info(infos),
            })
            .collect();

        unsafe {
            device.handle().update_descriptor_sets(&writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_binding_fields() {
        let binding = layout_binding(
            3,
            vk::DescriptorType::UNIFORM_BUFFER,
            1,
            vk::ShaderStageFlags::VERTEX,
        );
        assert_eq!(binding.binding, 3);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.descriptor_count, 1);
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn test_writer_collects_writes() {
        let writer = DescriptorWriter::new()
            .sampler(vk::DescriptorSet::null(), 0, vk::Sampler::null())
            .sampled_image(
                vk::DescriptorSet::null(),
                1,
                vk::ImageView::null(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        assert_eq!(writer.writes.len(), 2);
    }
}
