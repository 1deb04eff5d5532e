//! Environment map baking.
//!
//! At startup the renderer turns an equirectangular HDR panorama into a
//! cube map, then convolves that cube into a small diffuse-irradiance cube.
//! Both are rendered face by face through per-layer views: the face under
//! render is transitioned to attachment usage while its five siblings stay
//! shader-readable, which is exactly the partial-layer case the transition
//! tracker exists for.
//!
//! Baking happens once, on blocking one-time command submissions; nothing
//! here runs on the per-frame path.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{info, warn};

use ember_rhi::RhiResult;
use ember_rhi::command::CommandPool;
use ember_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, DescriptorWriter, layout_binding};
use ember_rhi::device::Device;
use ember_rhi::image::{ImageConfig, ResourceState, TrackedImage};
use ember_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, PipelineLayout};
use ember_rhi::rendering::{ColorAttachment, rendering_info};
use ember_rhi::sampler::Sampler;
use ember_rhi::shader::{Shader, ShaderStage};
use ember_rhi::teardown::TeardownStack;

/// Cube face count.
const FACES: u32 = 6;

/// Diffuse irradiance cube edge length.
const IRRADIANCE_SIZE: u32 = 64;

/// Baked environment data consumed by the lighting pass.
pub struct EnvironmentMaps {
    /// The environment cube map.
    pub cube: TrackedImage,
    /// The diffuse-irradiance cube map.
    pub irradiance: TrackedImage,
}

impl EnvironmentMaps {
    /// Bakes the environment and irradiance cubes and registers them on the
    /// teardown stack.
    ///
    /// When `hdr_path` is absent or unreadable a small procedural sky is
    /// used instead, so the renderer starts without assets on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if any resource creation, shader load or bake
    /// submission fails.
    pub fn bake(
        device: &Arc<Device>,
        pool: &CommandPool,
        shader_dir: &Path,
        hdr_path: Option<&Path>,
        sampler: &Sampler,
        teardown: &mut TeardownStack,
    ) -> RhiResult<Self> {
        let mut source = load_source(device, pool, hdr_path)?;

        let cube_size = (source.extent().width / 3).max(IRRADIANCE_SIZE);
        let mut cube = create_cube(device, pool, cube_size, "environment cube")?;
        let mut irradiance = create_cube(device, pool, IRRADIANCE_SIZE, "irradiance cube")?;

        // Shared fullscreen-face pipeline plumbing
        let set_layout = DescriptorSetLayout::new(
            device.clone(),
            &[layout_binding(
                0,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                1,
                vk::ShaderStageFlags::FRAGMENT,
            )],
            "environment bake set layout",
        )?;
        let descriptor_pool = DescriptorPool::new(
            device.clone(),
            2,
            &[vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2,
            }],
        )?;
        let sets = descriptor_pool.allocate(&[set_layout.handle(), set_layout.handle()])?;

        DescriptorWriter::new()
            .combined_image_sampler(
                sets[0],
                0,
                source.view(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                sampler.handle(),
            )
            .combined_image_sampler(
                sets[1],
                0,
                cube.view(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                sampler.handle(),
            )
            .update(device);

        let push_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<u32>() as u32);
        let layout = PipelineLayout::new(
            device.clone(),
            &[set_layout.handle()],
            &[push_range],
            "environment bake layout",
        )?;

        let face_vert = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("cubemap_face.vert.spv"),
            ShaderStage::Vertex,
        )?;
        let env_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("equirect_to_cube.frag.spv"),
            ShaderStage::Fragment,
        )?;
        let irradiance_frag = Shader::from_spirv_file(
            device.clone(),
            &shader_dir.join("diffuse_irradiance.frag.spv"),
            ShaderStage::Fragment,
        )?;

        let env_pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&face_vert)
            .fragment_shader(&env_frag)
            .cull_mode(CullMode::None)
            .color_attachment_formats(&[cube.format()])
            .build(device.clone(), &layout, "equirect to cube")?;
        let irradiance_pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&face_vert)
            .fragment_shader(&irradiance_frag)
            .cull_mode(CullMode::None)
            .color_attachment_formats(&[irradiance.format()])
            .build(device.clone(), &layout, "diffuse irradiance")?;

        render_faces(pool, &mut cube, &layout, env_pipeline.handle(), sets[0])?;
        info!("Environment cube baked ({}x{} per face)", cube_size, cube_size);

        render_faces(
            pool,
            &mut irradiance,
            &layout,
            irradiance_pipeline.handle(),
            sets[1],
        )?;
        info!("Irradiance cube baked ({0}x{0} per face)", IRRADIANCE_SIZE);

        // The panorama was only needed as bake input
        source.destroy(device);

        teardown.push("environment cube", cube.release_resource());
        teardown.push("irradiance cube", irradiance.release_resource());

        Ok(Self { cube, irradiance })
    }
}

/// Loads the HDR panorama, or a procedural sky when no asset is available.
fn load_source(
    device: &Arc<Device>,
    pool: &CommandPool,
    hdr_path: Option<&Path>,
) -> RhiResult<TrackedImage> {
    if let Some(path) = hdr_path {
        if path.exists() {
            return TrackedImage::from_hdr_file(device, pool, path, "environment panorama");
        }
        warn!(
            "Environment HDR {:?} not found, using procedural sky",
            path
        );
    }

    let (width, height) = (256u32, 128u32);
    let pixels = procedural_sky_pixels(width, height);

    TrackedImage::with_pixels(
        device,
        pool,
        &ImageConfig {
            format: vk::Format::R32G32B32A32_SFLOAT,
            extent: vk::Extent2D { width, height },
            ..Default::default()
        },
        bytemuck::cast_slice(&pixels),
        "procedural sky",
    )
}

/// Simple vertical sky gradient in linear RGBA32F.
fn procedural_sky_pixels(width: u32, height: u32) -> Vec<f32> {
    let zenith = [0.18, 0.32, 0.62];
    let horizon = [0.92, 0.78, 0.58];

    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let t = y as f32 / (height - 1).max(1) as f32;
        let row = [
            zenith[0] + (horizon[0] - zenith[0]) * t,
            zenith[1] + (horizon[1] - zenith[1]) * t,
            zenith[2] + (horizon[2] - zenith[2]) * t,
        ];
        for _ in 0..width {
            pixels.extend_from_slice(&[row[0], row[1], row[2], 1.0]);
        }
    }
    pixels
}

/// Creates a cube-compatible color target, shader-readable on all faces.
fn create_cube(
    device: &Arc<Device>,
    pool: &CommandPool,
    size: u32,
    label: &str,
) -> RhiResult<TrackedImage> {
    let mut cube = TrackedImage::new(
        device,
        &ImageConfig {
            format: vk::Format::R32G32B32A32_SFLOAT,
            extent: vk::Extent2D {
                width: size,
                height: size,
            },
            layers: FACES,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            cube_compatible: true,
            ..Default::default()
        },
        label,
    )?;

    pool.record_one_time(|cmd| {
        cube.transition(cmd, ResourceState::SHADER_SAMPLED);
        Ok(())
    })?;

    Ok(cube)
}

/// Renders into all six faces of `target`, one layer view at a time.
///
/// Each face is moved to attachment usage, drawn, and moved back while the
/// other layers keep their shader-readable state.
fn render_faces(
    pool: &CommandPool,
    target: &mut TrackedImage,
    layout: &PipelineLayout,
    pipeline: vk::Pipeline,
    set: vk::DescriptorSet,
) -> RhiResult<()> {
    let extent = target.extent();

    pool.record_one_time(|cmd| {
        for face in 0..FACES {
            target.transition_layers(cmd, ResourceState::COLOR_WRITE, face, 1);

            let colors = [ColorAttachment::new(target.layer_view(face)).to_vk()];
            let info = rendering_info(extent, &colors, None);

            cmd.begin_label(&format!("bake face {}", face), [0.4, 0.6, 0.9, 1.0]);
            cmd.begin_rendering(&info);
            cmd.bind_pipeline(pipeline);
            cmd.bind_descriptor_sets(layout.handle(), 0, &[set]);
            cmd.set_viewport_extent(extent);
            cmd.set_scissor_extent(extent);
            cmd.push_constants(
                layout.handle(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                &face,
            );
            cmd.draw(3, 1);
            cmd.end_rendering();
            cmd.end_label();

            target.transition_layers(cmd, ResourceState::SHADER_SAMPLED, face, 1);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedural_sky_dimensions() {
        let pixels = procedural_sky_pixels(8, 4);
        assert_eq!(pixels.len(), 8 * 4 * 4);
        // Alpha stays opaque
        assert!(pixels.chunks(4).all(|p| p[3] == 1.0));
    }

    #[test]
    fn test_procedural_sky_gradient_runs_zenith_to_horizon() {
        let pixels = procedural_sky_pixels(2, 2);
        let first_row_r = pixels[0];
        let last_row_r = pixels[(2 * 4) as usize];
        assert!(last_row_r > first_row_r);
    }
}
