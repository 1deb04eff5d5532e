//! Render target creation and lifetime.
//!
//! The deferred pipeline draws into four offscreen targets: a depth buffer,
//! two G-buffer color attachments (albedo, material properties) and an HDR
//! lighting target. All are [`TrackedImage`]s so pass sequencing moves them
//! between usages through the transition tracker.
//!
//! Lifetimes differ: the G-buffer and HDR targets live for the whole run
//! and are registered on the teardown stack at creation; the depth target
//! follows the presentation surface and is destroyed/recreated explicitly
//! on rebuild, so it is deliberately kept off the stack.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use ember_rhi::command::CommandPool;
use ember_rhi::device::Device;
use ember_rhi::image::{ImageConfig, ResourceState, TrackedImage};
use ember_rhi::teardown::TeardownStack;
use ember_rhi::{RhiError, RhiResult};

/// G-buffer albedo format.
pub const ALBEDO_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;
/// G-buffer material-properties format.
pub const MATERIAL_FORMAT: vk::Format = vk::Format::R16G16B16A16_UNORM;
/// HDR lighting target format.
pub const HDR_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

/// Depth format preference order.
pub const DEPTH_FORMAT_CANDIDATES: &[vk::Format] = &[
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// The offscreen targets of the deferred pipeline.
pub struct RenderTargets {
    /// Depth buffer; rebuild lifetime, destroyed explicitly.
    pub depth: TrackedImage,
    /// G-buffer albedo attachment.
    pub albedo: TrackedImage,
    /// G-buffer material-properties attachment.
    pub material: TrackedImage,
    /// HDR lighting attachment.
    pub hdr: TrackedImage,
    /// Chosen depth format.
    depth_format: vk::Format,
}

impl RenderTargets {
    /// Creates all targets at the given extent and issues their initial
    /// transitions.
    ///
    /// The G-buffer and HDR targets register on the teardown stack; the
    /// depth target does not (see module docs).
    ///
    /// # Errors
    ///
    /// Returns an error if any image creation or the initial transition
    /// submit fails.
    pub fn new(
        device: &Arc<Device>,
        pool: &CommandPool,
        extent: vk::Extent2D,
        depth_format: vk::Format,
        teardown: &mut TeardownStack,
    ) -> RhiResult<Self> {
        let depth = create_depth(device, pool, extent, depth_format)?;

        let color_config = ImageConfig {
            extent,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            ..Default::default()
        };

        let mut albedo = TrackedImage::new(
            device,
            &ImageConfig {
                format: ALBEDO_FORMAT,
                ..color_config.clone()
            },
            "gbuffer albedo",
        )?;
        let mut material = TrackedImage::new(
            device,
            &ImageConfig {
                format: MATERIAL_FORMAT,
                ..color_config.clone()
            },
            "gbuffer material",
        )?;
        let mut hdr = TrackedImage::new(
            device,
            &ImageConfig {
                format: HDR_FORMAT,
                ..color_config
            },
            "hdr target",
        )?;

        // Steady state between frames is shader-readable; each frame
        // transitions into attachment usage and back
        pool.record_one_time(|cmd| {
            albedo.transition(cmd, ResourceState::SHADER_SAMPLED);
            material.transition(cmd, ResourceState::SHADER_SAMPLED);
            hdr.transition(cmd, ResourceState::SHADER_SAMPLED);
            Ok(())
        })?;

        teardown.push("gbuffer albedo", albedo.release_resource());
        teardown.push("gbuffer material", material.release_resource());
        teardown.push("hdr target", hdr.release_resource());

        info!(
            "Render targets created at {}x{} (depth {:?})",
            extent.width, extent.height, depth_format
        );

        Ok(Self {
            depth,
            albedo,
            material,
            hdr,
            depth_format,
        })
    }

    /// Returns the chosen depth format.
    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    /// Destroys the depth target (surface rebuild, step 2).
    pub fn destroy_depth(&mut self, device: &Device) {
        debug!("Destroying depth target for rebuild");
        self.depth.destroy(device);
    }

    /// Recreates the depth target at a new extent and re-issues its initial
    /// transition (surface rebuild, step 4).
    ///
    /// # Errors
    ///
    /// Returns an error if creation or the transition submit fails.
    pub fn recreate_depth(
        &mut self,
        device: &Arc<Device>,
        pool: &CommandPool,
        extent: vk::Extent2D,
    ) -> RhiResult<()> {
        self.depth = create_depth(device, pool, extent, self.depth_format)?;
        Ok(())
    }
}

/// Picks the first supported depth format from the preference list.
pub fn select_depth_format(
    instance: &ash::Instance,
    info: &ember_rhi::physical_device::PhysicalDeviceInfo,
) -> RhiResult<vk::Format> {
    info.find_supported_format(
        instance,
        DEPTH_FORMAT_CANDIDATES,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
    .ok_or_else(|| RhiError::InvalidHandle("No supported depth format".to_string()))
}

/// Returns the image aspect a depth format requires.
fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    let has_stencil = matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT
    );
    if has_stencil {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

/// Creates the depth image and moves it into attachment usage.
fn create_depth(
    device: &Arc<Device>,
    pool: &CommandPool,
    extent: vk::Extent2D,
    format: vk::Format,
) -> RhiResult<TrackedImage> {
    let mut depth = TrackedImage::new(
        device,
        &ImageConfig {
            format,
            extent,
            aspect: depth_aspect(format),
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            ..Default::default()
        },
        "depth target",
    )?;

    pool.record_one_time(|cmd| {
        depth.transition(cmd, ResourceState::DEPTH_WRITE);
        Ok(())
    })?;

    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_candidates_are_depth_formats() {
        for format in DEPTH_FORMAT_CANDIDATES {
            assert!(matches!(
                *format,
                vk::Format::D32_SFLOAT
                    | vk::Format::D32_SFLOAT_S8_UINT
                    | vk::Format::D24_UNORM_S8_UINT
            ));
        }
    }

    #[test]
    fn test_depth_aspect_includes_stencil_only_when_present() {
        assert_eq!(
            depth_aspect(vk::Format::D32_SFLOAT),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            depth_aspect(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn test_target_formats_are_distinct_concerns() {
        // Albedo stays 8-bit sRGB, material props get wider fixed point,
        // lighting accumulates in float
        assert_eq!(ALBEDO_FORMAT, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(MATERIAL_FORMAT, vk::Format::R16G16B16A16_UNORM);
        assert_eq!(HDR_FORMAT, vk::Format::R32G32B32A32_SFLOAT);
    }
}
