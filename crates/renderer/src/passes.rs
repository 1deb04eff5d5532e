//! The fixed pass sequence and its pipelines.
//!
//! One frame records four passes into a single command sequence, in a
//! statically known order:
//!
//! 1. **Depth prepass** - writes depth only
//! 2. **G-buffer pass** - re-tests depth with EQUAL, writes albedo and
//!    material properties
//! 3. **Lighting pass** - reads depth, G-buffer and environment data,
//!    writes the HDR target with a full-screen triangle
//! 4. **Blit pass** - reads the HDR target, writes the acquired
//!    presentable image, which then moves to present usage
//!
//! Between passes, every resource whose required usage differs from its
//! current usage goes through the transition tracker; this module decides
//! *when* a transition happens, the tracker decides *what* the barrier
//! contains. Transitions are issued even when degenerate - the tracker
//! does not elide.

use std::path::Path;
use std::sync::Arc;

use ash::vk;

use ember_rhi::RhiResult;
use ember_rhi::command::CommandBuffer;
use ember_rhi::device::Device;
use ember_rhi::image::{ResourceState, TrackedImage};
use ember_rhi::pipeline::{
    CullMode, DepthCompare, GraphicsPipelineBuilder, Pipeline, PipelineLayout,
};
use ember_rhi::rendering::{ColorAttachment, DepthAttachment, rendering_info};
use ember_rhi::shader::{Shader, ShaderStage};
use ember_rhi::vertex::Vertex;

use ember_scene::{DrawBatch, TextureIndices};

use crate::environment::EnvironmentMaps;
use crate::targets::{ALBEDO_FORMAT, HDR_FORMAT, MATERIAL_FORMAT, RenderTargets};

/// The pipelines and layouts of the fixed pass sequence.
pub struct FramePipelines {
    /// Layout shared by the geometry passes (global + frame sets, texture
    /// indices push constant).
    pub geometry_layout: PipelineLayout,
    /// Layout shared by the full-screen passes (global + frame sets).
    pub fullscreen_layout: PipelineLayout,
    /// Depth prepass pipeline.
    pub prepass: Pipeline,
    /// G-buffer generation pipeline.
    pub gbuffer: Pipeline,
    /// Lighting pipeline.
    pub lighting: Pipeline,
    /// Blit-to-swapchain pipeline.
    pub blit: Pipeline,
}

impl FramePipelines {
    /// Loads the shaders and builds all four pipelines.
    ///
    /// Texture and light counts are baked in as specialization constants.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader fails to load or a pipeline fails to
    /// build.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &Arc<Device>,
        shader_dir: &Path,
        set_layouts: &[vk::DescriptorSetLayout],
        depth_format: vk::Format,
        swapchain_format: vk::Format,
        texture_count: u32,
        point_light_count: u32,
        directional_light_count: u32,
    ) -> RhiResult<Self> {
        let push_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<TextureIndices>() as u32);

        let geometry_layout = PipelineLayout::new(
            device.clone(),
            set_layouts,
            std::slice::from_ref(&push_range),
            "geometry pass layout",
        )?;
        let fullscreen_layout =
            PipelineLayout::new(device.clone(), set_layouts, &[], "fullscreen pass layout")?;

        let geometry_vert = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("geometry.vert.spv"),
            ShaderStage::Vertex,
        )?;
        let prepass_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("depth_prepass.frag.spv"),
            ShaderStage::Fragment,
        )?
        .with_specialization(&[texture_count]);
        let gbuffer_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("gbuffer.frag.spv"),
            ShaderStage::Fragment,
        )?
        .with_specialization(&[texture_count]);
        let fullscreen_vert = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("fullscreen.vert.spv"),
            ShaderStage::Vertex,
        )?;
        let lighting_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("lighting.frag.spv"),
            ShaderStage::Fragment,
        )?
        .with_specialization(&[point_light_count, directional_light_count]);
        let blit_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("blit.frag.spv"),
            ShaderStage::Fragment,
        )?;

        let vertex_binding = Vertex::binding_description();
        let vertex_attributes = Vertex::attribute_descriptions();

        let prepass = GraphicsPipelineBuilder::new()
            .vertex_shader(&geometry_vert)
            .fragment_shader(&prepass_frag)
            .vertex_binding(vertex_binding)
            .vertex_attributes(&vertex_attributes)
            .depth_test(DepthCompare::Less)
            .depth_write()
            .depth_attachment_format(depth_format)
            .build(device.clone(), &geometry_layout, "depth prepass")?;

        let gbuffer = GraphicsPipelineBuilder::new()
            .vertex_shader(&geometry_vert)
            .fragment_shader(&gbuffer_frag)
            .vertex_binding(vertex_binding)
            .vertex_attributes(&vertex_attributes)
            .depth_test(DepthCompare::Equal)
            .color_attachment_formats(&[ALBEDO_FORMAT, MATERIAL_FORMAT])
            .depth_attachment_format(depth_format)
            .build(device.clone(), &geometry_layout, "gbuffer")?;

        let lighting = GraphicsPipelineBuilder::new()
            .vertex_shader(&fullscreen_vert)
            .fragment_shader(&lighting_frag)
            .cull_mode(CullMode::Front)
            .color_attachment_formats(&[HDR_FORMAT])
            .depth_attachment_format(depth_format)
            .build(device.clone(), &fullscreen_layout, "lighting")?;

        let blit = GraphicsPipelineBuilder::new()
            .vertex_shader(&fullscreen_vert)
            .fragment_shader(&blit_frag)
            .cull_mode(CullMode::Front)
            .color_attachment_formats(&[swapchain_format])
            .build(device.clone(), &fullscreen_layout, "blit")?;

        Ok(Self {
            geometry_layout,
            fullscreen_layout,
            prepass,
            gbuffer,
            lighting,
            blit,
        })
    }
}

/// The descriptor sets bound while recording one frame.
#[derive(Clone, Copy)]
pub struct FrameSets {
    /// Global set: samplers, scene textures, lights, environment maps.
    pub global: vk::DescriptorSet,
    /// Per-slot set: transform UBO plus the sampled attachments.
    pub frame: vk::DescriptorSet,
}

/// Records the four fixed passes for one frame into `cmd`.
///
/// `swap_image` is the acquired presentable image; it leaves the sequence
/// in present usage.
pub fn record_frame(
    cmd: &CommandBuffer,
    extent: vk::Extent2D,
    pipelines: &FramePipelines,
    sets: FrameSets,
    targets: &mut RenderTargets,
    environment: &mut EnvironmentMaps,
    swap_image: &mut TrackedImage,
    batches: &[DrawBatch],
) {
    let bound_sets = [sets.global, sets.frame];

    // Depth prepass
    targets.depth.transition(cmd, ResourceState::DEPTH_WRITE);
    {
        let depth = DepthAttachment::new(targets.depth.view()).to_vk();
        let info = rendering_info(extent, &[], Some(&depth));

        cmd.begin_label("depth prepass", [0.8, 0.2, 0.2, 1.0]);
        cmd.begin_rendering(&info);
        cmd.bind_pipeline(pipelines.prepass.handle());
        cmd.bind_descriptor_sets(pipelines.geometry_layout.handle(), 0, &bound_sets);
        cmd.set_viewport_extent(extent);
        cmd.set_scissor_extent(extent);
        draw_batches(cmd, pipelines.geometry_layout.handle(), batches);
        cmd.end_rendering();
        cmd.end_label();
    }

    // G-buffer pass: equal-test against prepass depth, write the two
    // color attachments
    targets.albedo.transition(cmd, ResourceState::COLOR_WRITE);
    targets.material.transition(cmd, ResourceState::COLOR_WRITE);
    targets
        .depth
        .transition(cmd, ResourceState::DEPTH_EQUAL_READ);
    {
        let colors = [
            ColorAttachment::new(targets.albedo.view()).to_vk(),
            ColorAttachment::new(targets.material.view()).to_vk(),
        ];
        let depth = DepthAttachment::new(targets.depth.view()).load().to_vk();
        let info = rendering_info(extent, &colors, Some(&depth));

        cmd.begin_label("gbuffer", [0.8, 0.5, 0.2, 1.0]);
        cmd.begin_rendering(&info);
        cmd.bind_pipeline(pipelines.gbuffer.handle());
        cmd.bind_descriptor_sets(pipelines.geometry_layout.handle(), 0, &bound_sets);
        cmd.set_viewport_extent(extent);
        cmd.set_scissor_extent(extent);
        draw_batches(cmd, pipelines.geometry_layout.handle(), batches);
        cmd.end_rendering();
        cmd.end_label();
    }

    // Lighting pass: everything it reads becomes shader-visible first.
    // The cube transition is degenerate after the first frame and is
    // still issued.
    targets.hdr.transition(cmd, ResourceState::COLOR_WRITE);
    targets.albedo.transition(cmd, ResourceState::SHADER_SAMPLED);
    targets
        .material
        .transition(cmd, ResourceState::SHADER_SAMPLED);
    environment
        .cube
        .transition(cmd, ResourceState::SHADER_SAMPLED);
    targets.depth.transition(cmd, ResourceState::DEPTH_SAMPLED);
    {
        let colors = [ColorAttachment::new(targets.hdr.view()).to_vk()];
        let depth = DepthAttachment::new(targets.depth.view())
            .layout(vk::ImageLayout::READ_ONLY_OPTIMAL)
            .load()
            .dont_store()
            .to_vk();
        let info = rendering_info(extent, &colors, Some(&depth));

        cmd.begin_label("lighting", [0.9, 0.8, 0.3, 1.0]);
        cmd.begin_rendering(&info);
        cmd.bind_pipeline(pipelines.lighting.handle());
        cmd.bind_descriptor_sets(pipelines.fullscreen_layout.handle(), 0, &bound_sets);
        cmd.set_viewport_extent(extent);
        cmd.set_scissor_extent(extent);
        cmd.draw(3, 1);
        cmd.end_rendering();
        cmd.end_label();
    }

    // Blit pass into the acquired presentable image
    targets.depth.transition(cmd, ResourceState::DEPTH_WRITE);
    targets.hdr.transition(cmd, ResourceState::SHADER_SAMPLED);
    swap_image.transition(cmd, ResourceState::COLOR_WRITE);
    {
        let colors = [ColorAttachment::new(swap_image.view()).to_vk()];
        let info = rendering_info(extent, &colors, None);

        cmd.begin_label("blit", [0.3, 0.7, 0.4, 1.0]);
        cmd.begin_rendering(&info);
        cmd.bind_pipeline(pipelines.blit.handle());
        cmd.bind_descriptor_sets(pipelines.fullscreen_layout.handle(), 0, &bound_sets);
        cmd.set_viewport_extent(extent);
        cmd.set_scissor_extent(extent);
        cmd.draw(3, 1);
        cmd.end_rendering();
        cmd.end_label();
    }

    swap_image.transition(cmd, ResourceState::PRESENT_SRC);
}

/// Draws every batch with its texture indices pushed to the fragment stage.
fn draw_batches(cmd: &CommandBuffer, layout: vk::PipelineLayout, batches: &[DrawBatch]) {
    for batch in batches {
        cmd.push_constants(
            layout,
            vk::ShaderStageFlags::FRAGMENT,
            &batch.texture_indices,
        );
        cmd.bind_vertex_buffers(0, &[batch.vertex_buffer.handle()]);
        cmd.bind_index_buffer(batch.index_buffer.handle());
        cmd.draw_indexed(batch.index_count);
    }
}
