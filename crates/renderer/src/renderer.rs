//! Top-level render orchestration.
//!
//! The [`Renderer`] owns every GPU resource and drives one frame per
//! [`render_frame`](Renderer::render_frame) call: pace, record the fixed
//! pass sequence, submit, present. It also owns the two recovery paths the
//! frame loop needs - the zero-extent stall and stale-surface rebuild -
//! and the ordered teardown at shutdown.
//!
//! # Shutdown order
//!
//! 1. Wait for the device to go idle
//! 2. Destroy the rebuild-lifetime resources (depth target)
//! 3. Flush the teardown stack (startup-lifetime resources, LIFO)
//! 4. Drop swapchain, then surface
//! 5. Remaining RAII fields drop, releasing their device references;
//!    the device itself goes down after them and the instance last
//!
//! Construction follows the same discipline in reverse: if it fails
//! partway, the stack is flushed with whatever had been registered and the
//! error propagates.

use std::mem::ManuallyDrop;
use std::path::PathBuf;
use std::sync::Arc;

use ash::vk;
use glam::{Mat4, Vec3};
use tracing::{debug, error, info};

use ember_platform::{Surface, Window};
use ember_rhi::command::CommandPool;
use ember_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, DescriptorWriter, layout_binding,
};
use ember_rhi::device::Device;
use ember_rhi::instance::Instance;
use ember_rhi::physical_device::{PhysicalDeviceInfo, select_physical_device};
use ember_rhi::sampler::{Sampler, SamplerConfig};
use ember_rhi::swapchain::Swapchain;
use ember_rhi::teardown::TeardownStack;
use ember_rhi::{RhiError, RhiResult};

use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_scene::Scene;

use crate::PACED_FRAMES;
use crate::environment::EnvironmentMaps;
use crate::frame_pacer::{FramePacer, FrameStart};
use crate::passes::{FramePipelines, FrameSets, record_frame};
use crate::targets::{RenderTargets, select_depth_format};
use crate::uniforms::{DirectionalLight, ModelViewProjection, PointLight};

/// Renderer configuration, fixed at construction.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Directory holding the compiled SPIR-V shaders.
    pub shader_dir: PathBuf,
    /// Optional equirectangular HDR panorama for the environment bake.
    pub environment_hdr: Option<PathBuf>,
    /// Enable validation layers.
    pub validation: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shaders"),
            environment_hdr: Some(PathBuf::from("assets/environment.hdr")),
            validation: cfg!(debug_assertions),
        }
    }
}

/// Everything `build_resources` produces on success.
struct RendererResources {
    sampler: Sampler,
    scene: Scene,
    environment: EnvironmentMaps,
    targets: RenderTargets,
    point_light_buffer: Buffer,
    directional_light_buffer: Buffer,
    uniform_buffers: Vec<Buffer>,
    global_set_layout: DescriptorSetLayout,
    frame_set_layout: DescriptorSetLayout,
    descriptor_pool: DescriptorPool,
    global_set: vk::DescriptorSet,
    frame_sets: Vec<vk::DescriptorSet>,
    pipelines: FramePipelines,
    pacer: FramePacer,
}

/// The render orchestrator.
pub struct Renderer {
    // Dropped in declaration order after `Drop::drop` runs; everything
    // holding a device Arc comes before `device`, and `instance` is last
    command_pool: CommandPool,
    teardown: TeardownStack,
    scene: Scene,
    environment: EnvironmentMaps,
    targets: RenderTargets,
    _sampler: Sampler,
    _point_light_buffer: Buffer,
    _directional_light_buffer: Buffer,
    uniform_buffers: Vec<Buffer>,
    _global_set_layout: DescriptorSetLayout,
    _frame_set_layout: DescriptorSetLayout,
    _descriptor_pool: DescriptorPool,
    global_set: vk::DescriptorSet,
    frame_sets: Vec<vk::DescriptorSet>,
    pipelines: FramePipelines,
    pacer: FramePacer,
    swapchain: ManuallyDrop<Swapchain>,
    surface: ManuallyDrop<Surface>,
    device: Arc<Device>,
    instance: Instance,

    // Transform state fed by the application
    model: Mat4,
    view: Mat4,
    projection: Mat4,

    // Output state
    width: u32,
    height: u32,
    resize_pending: bool,
}

impl Renderer {
    /// Creates the renderer for a window.
    ///
    /// # Errors
    ///
    /// Returns an error if any GPU resource creation fails; everything
    /// registered on the teardown stack up to the failure point is
    /// released, in reverse order, before the error propagates.
    pub fn new(window: &Window, config: &RendererConfig) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();

        info!("Initializing renderer ({}x{})", width, height);

        let instance = Instance::new(config.validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        let mut teardown = TeardownStack::new();

        let resources = match Self::build_resources(
            &instance,
            &physical_device_info,
            &device,
            &command_pool,
            &swapchain,
            config,
            &mut teardown,
        ) {
            Ok(resources) => resources,
            Err(e) => {
                error!("Renderer construction failed, unwinding partial build: {}", e);
                let _ = device.wait_idle();
                teardown.flush(&device);
                return Err(e);
            }
        };

        info!("Renderer initialized");

        Ok(Self {
            command_pool,
            teardown,
            scene: resources.scene,
            environment: resources.environment,
            targets: resources.targets,
            _sampler: resources.sampler,
            _point_light_buffer: resources.point_light_buffer,
            _directional_light_buffer: resources.directional_light_buffer,
            uniform_buffers: resources.uniform_buffers,
            _global_set_layout: resources.global_set_layout,
            _frame_set_layout: resources.frame_set_layout,
            _descriptor_pool: resources.descriptor_pool,
            global_set: resources.global_set,
            frame_sets: resources.frame_sets,
            pipelines: resources.pipelines,
            pacer: resources.pacer,
            swapchain: ManuallyDrop::new(swapchain),
            surface: ManuallyDrop::new(surface),
            device,
            instance,
            model: Mat4::IDENTITY,
            view: Mat4::look_at_rh(Vec3::new(2.5, 2.0, 2.5), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(
                60f32.to_radians(),
                width as f32 / height.max(1) as f32,
                0.1,
                100.0,
            ),
            width,
            height,
            resize_pending: false,
        })
    }

    /// Builds everything beyond the core Vulkan objects.
    fn build_resources(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
        device: &Arc<Device>,
        command_pool: &CommandPool,
        swapchain: &Swapchain,
        config: &RendererConfig,
        teardown: &mut TeardownStack,
    ) -> RhiResult<RendererResources> {
        let sampler = Sampler::new(
            device,
            &SamplerConfig {
                max_anisotropy: Some(
                    physical_device_info
                        .properties
                        .limits
                        .max_sampler_anisotropy,
                ),
                ..Default::default()
            },
            "linear sampler",
        )?;
        teardown.push("linear sampler", sampler.release_resource());

        let scene = Scene::demo(device, command_pool, teardown)?;

        let environment = EnvironmentMaps::bake(
            device,
            command_pool,
            &config.shader_dir,
            config.environment_hdr.as_deref(),
            &sampler,
            teardown,
        )?;

        let depth_format = select_depth_format(instance.handle(), physical_device_info)?;
        let targets = RenderTargets::new(
            device,
            command_pool,
            swapchain.extent(),
            depth_format,
            teardown,
        )?;

        // Static light set
        let point_lights = [
            PointLight::new(Vec3::new(1.8, 1.2, 1.5), Vec3::new(1.0, 0.72, 0.45), 900.0),
            PointLight::new(Vec3::new(-1.6, 0.8, -1.2), Vec3::new(0.4, 0.6, 1.0), 500.0),
        ];
        let directional_lights = [DirectionalLight::new(
            Vec3::new(-0.4, -1.0, -0.3),
            Vec3::new(1.0, 0.98, 0.92),
            30_000.0,
        )];

        let point_light_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Storage,
            bytemuck::cast_slice(&point_lights),
        )?;
        let directional_light_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Storage,
            bytemuck::cast_slice(&directional_lights),
        )?;

        let mut uniform_buffers = Vec::with_capacity(PACED_FRAMES);
        for _ in 0..PACED_FRAMES {
            uniform_buffers.push(Buffer::new(
                device.clone(),
                BufferUsage::Uniform,
                std::mem::size_of::<ModelViewProjection>() as vk::DeviceSize,
            )?);
        }

        let (global_set_layout, frame_set_layout, descriptor_pool, global_set, frame_sets) =
            Self::build_descriptors(
                device,
                &sampler,
                &scene,
                &environment,
                &targets,
                &point_light_buffer,
                &directional_light_buffer,
                &uniform_buffers,
            )?;

        let pipelines = FramePipelines::new(
            device,
            &config.shader_dir,
            &[global_set_layout.handle(), frame_set_layout.handle()],
            depth_format,
            swapchain.format(),
            scene.texture_count(),
            point_lights.len() as u32,
            directional_lights.len() as u32,
        )?;

        let pacer = FramePacer::new(device.clone(), command_pool)?;

        Ok(RendererResources {
            sampler,
            scene,
            environment,
            targets,
            point_light_buffer,
            directional_light_buffer,
            uniform_buffers,
            global_set_layout,
            frame_set_layout,
            descriptor_pool,
            global_set,
            frame_sets,
            pipelines,
            pacer,
        })
    }

    /// Creates the descriptor layouts, pool and sets, and writes them.
    #[allow(clippy::too_many_arguments, clippy::type_complexity)]
    fn build_descriptors(
        device: &Arc<Device>,
        sampler: &Sampler,
        scene: &Scene,
        environment: &EnvironmentMaps,
        targets: &RenderTargets,
        point_light_buffer: &Buffer,
        directional_light_buffer: &Buffer,
        uniform_buffers: &[Buffer],
    ) -> RhiResult<(
        DescriptorSetLayout,
        DescriptorSetLayout,
        DescriptorPool,
        vk::DescriptorSet,
        Vec<vk::DescriptorSet>,
    )> {
        let fragment = vk::ShaderStageFlags::FRAGMENT;
        let texture_count = scene.texture_count();

        let global_set_layout = DescriptorSetLayout::new(
            device.clone(),
            &[
                layout_binding(0, vk::DescriptorType::SAMPLER, 1, fragment),
                layout_binding(1, vk::DescriptorType::SAMPLED_IMAGE, texture_count, fragment),
                layout_binding(2, vk::DescriptorType::STORAGE_BUFFER, 1, fragment),
                layout_binding(3, vk::DescriptorType::STORAGE_BUFFER, 1, fragment),
                layout_binding(4, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, fragment),
                layout_binding(5, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, fragment),
            ],
            "global set layout",
        )?;

        let frame_set_layout = DescriptorSetLayout::new(
            device.clone(),
            &[
                layout_binding(
                    0,
                    vk::DescriptorType::UNIFORM_BUFFER,
                    1,
                    vk::ShaderStageFlags::VERTEX | fragment,
                ),
                layout_binding(1, vk::DescriptorType::SAMPLED_IMAGE, 1, fragment),
                layout_binding(2, vk::DescriptorType::SAMPLED_IMAGE, 1, fragment),
                layout_binding(3, vk::DescriptorType::SAMPLED_IMAGE, 1, fragment),
                layout_binding(4, vk::DescriptorType::SAMPLED_IMAGE, 1, fragment),
            ],
            "frame set layout",
        )?;

        let frames = PACED_FRAMES as u32;
        let descriptor_pool = DescriptorPool::new(
            device.clone(),
            1 + frames,
            &[
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::SAMPLER,
                    descriptor_count: 1,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::SAMPLED_IMAGE,
                    descriptor_count: texture_count + 4 * frames,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::STORAGE_BUFFER,
                    descriptor_count: 2,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: 2,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: frames,
                },
            ],
        )?;

        let global_set = descriptor_pool.allocate(&[global_set_layout.handle()])?[0];
        let frame_sets =
            descriptor_pool.allocate(&vec![frame_set_layout.handle(); PACED_FRAMES])?;

        let shader_read = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;

        DescriptorWriter::new()
            .sampler(global_set, 0, sampler.handle())
            .sampled_image_array(global_set, 1, &scene.texture_views(), shader_read)
            .storage_buffer(
                global_set,
                2,
                point_light_buffer.handle(),
                point_light_buffer.size(),
            )
            .storage_buffer(
                global_set,
                3,
                directional_light_buffer.handle(),
                directional_light_buffer.size(),
            )
            .combined_image_sampler(
                global_set,
                4,
                environment.cube.view(),
                shader_read,
                sampler.handle(),
            )
            .combined_image_sampler(
                global_set,
                5,
                environment.irradiance.view(),
                shader_read,
                sampler.handle(),
            )
            .update(device);

        for (set, ubo) in frame_sets.iter().zip(uniform_buffers) {
            DescriptorWriter::new()
                .uniform_buffer(*set, 0, ubo.handle(), ubo.size())
                .sampled_image(*set, 1, targets.albedo.view(), shader_read)
                .sampled_image(*set, 2, targets.material.view(), shader_read)
                .sampled_image(
                    *set,
                    3,
                    targets.depth.view(),
                    vk::ImageLayout::READ_ONLY_OPTIMAL,
                )
                .sampled_image(*set, 4, targets.hdr.view(), shader_read)
                .update(device);
        }

        Ok((
            global_set_layout,
            frame_set_layout,
            descriptor_pool,
            global_set,
            frame_sets,
        ))
    }

    /// Sets the camera transforms used for subsequent frames.
    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }

    /// Sets the scene's model transform.
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }

    /// Returns the current output extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Returns the number of frames completed so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.pacer.frame_number()
    }

    /// Notifies the renderer of a new output size.
    ///
    /// The rebuild happens on the next frame. A zero dimension stalls
    /// frame pacing until a usable size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }

        debug!(
            "Resize requested: {}x{} -> {}x{}",
            self.width, self.height, width, height
        );
        self.width = width;
        self.height = height;
        self.resize_pending = true;

        if width > 0 && height > 0 {
            self.projection =
                Mat4::perspective_rh(60f32.to_radians(), width as f32 / height as f32, 0.1, 100.0);
        }
    }

    /// Renders one frame.
    ///
    /// Recoverable conditions - zero-size output, stale surface - are
    /// absorbed here: the frame is skipped or retried after a rebuild and
    /// never surfaces as an error. Anything else is fatal and propagates.
    ///
    /// # Errors
    ///
    /// Returns an error on device failure (failed wait, submission or
    /// rebuild).
    pub fn render_frame(&mut self) -> RhiResult<()> {
        // Zero-size stall: no pass sequencing, no frame advance, no pacer
        // interaction until the output is usable again
        if !extent_is_renderable(self.width, self.height) {
            debug!("Output extent is zero, stalling frame pacing");
            return Ok(());
        }

        if self.resize_pending {
            self.rebuild_surface()?;
            if self.resize_pending {
                return Ok(());
            }
        }

        let ctx = match self.pacer.begin_frame(&self.swapchain)? {
            FrameStart::Acquired(ctx) => ctx,
            FrameStart::SurfaceStale => {
                // Aborted pre-submission; rebuild and let the caller retry
                self.rebuild_surface()?;
                return Ok(());
            }
        };

        let mvp = ModelViewProjection::new(self.model, self.view, self.projection);
        self.uniform_buffers[ctx.slot_index].write_data(0, bytemuck::bytes_of(&mvp))?;

        let extent = self.swapchain.extent();
        {
            let cmd = self.pacer.current_slot().command_buffer();
            cmd.reset()?;
            cmd.begin()?;
            record_frame(
                cmd,
                extent,
                &self.pipelines,
                FrameSets {
                    global: self.global_set,
                    frame: self.frame_sets[ctx.slot_index],
                },
                &mut self.targets,
                &mut self.environment,
                self.swapchain.image_mut(ctx.image_index as usize),
                self.scene.batches(),
            );
            cmd.end()?;
        }

        let stale = self.pacer.end_frame(&self.swapchain, &ctx)?;

        if stale {
            // Presentation already happened best-effort; rebuild afterwards
            self.rebuild_surface()?;
        }

        Ok(())
    }

    /// Rebuilds the surface-dependent resources after a resize or stale
    /// surface.
    ///
    /// Protocol: drain the whole device, destroy the depth target, recreate
    /// the swapchain under the construction-time preference policy,
    /// recreate the depth target at the new extent with its initial
    /// transition, and re-point the descriptor bindings that embedded the
    /// old depth view. Safe to invoke repeatedly; zero-size conditions
    /// leave the rebuild pending for a later retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the drain or any recreation step fails.
    fn rebuild_surface(&mut self) -> RhiResult<()> {
        if !extent_is_renderable(self.width, self.height) {
            debug!("Deferring surface rebuild until extent is non-zero");
            self.resize_pending = true;
            return Ok(());
        }

        info!("Rebuilding surface resources ({}x{})", self.width, self.height);

        // The one operation allowed to stall the whole pipeline
        self.device.wait_idle()?;

        self.targets.destroy_depth(&self.device);

        self.swapchain
            .recreate(&self.instance, self.surface.handle(), self.width, self.height)?;

        self.targets
            .recreate_depth(&self.device, &self.command_pool, self.swapchain.extent())?;

        // Frame sets embedded the old depth view
        for set in &self.frame_sets {
            DescriptorWriter::new()
                .sampled_image(
                    *set,
                    3,
                    self.targets.depth.view(),
                    vk::ImageLayout::READ_ONLY_OPTIMAL,
                )
                .update(&self.device);
        }

        self.resize_pending = false;
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to drain device during renderer drop: {:?}", e);
        }

        self.targets.destroy_depth(&self.device);
        self.teardown.flush(&self.device);

        unsafe {
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
        }

        info!("Renderer destroyed");
    }
}

/// A frame can only be paced against an output with two non-zero
/// dimensions (a minimized window reports zero).
fn extent_is_renderable(width: u32, height: u32) -> bool {
    width > 0 && height > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extent_is_not_renderable() {
        assert!(extent_is_renderable(1280, 720));
        assert!(!extent_is_renderable(0, 720));
        assert!(!extent_is_renderable(1280, 0));
        assert!(!extent_is_renderable(0, 0));
    }

    #[test]
    fn test_config_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.shader_dir, PathBuf::from("shaders"));
        assert!(config.environment_hdr.is_some());
    }
}
