//! Texture samplers.
//!
//! Samplers are created from an immutable [`SamplerConfig`] value and
//! released through the teardown stack, so the struct carries no `Drop`.

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;
use crate::teardown::ReleaseResource;

/// Immutable sampler creation parameters.
#[derive(Clone, Copy, Debug)]
pub struct SamplerConfig {
    /// Min/mag filter.
    pub filter: vk::Filter,
    /// Address mode on all axes.
    pub address_mode: vk::SamplerAddressMode,
    /// Anisotropic filtering limit; `None` disables anisotropy.
    pub max_anisotropy: Option<f32>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: None,
        }
    }
}

/// Sampler wrapper.
pub struct Sampler {
    sampler: vk::Sampler,
}

impl Sampler {
    /// Creates a sampler from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if sampler creation fails.
    pub fn new(device: &Device, config: &SamplerConfig, label: &str) -> RhiResult<Self> {
        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(config.filter)
            .min_filter(config.filter)
            .address_mode_u(config.address_mode)
            .address_mode_v(config.address_mode)
            .address_mode_w(config.address_mode)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

        if let Some(max_anisotropy) = config.max_anisotropy {
            create_info = create_info
                .anisotropy_enable(true)
                .max_anisotropy(max_anisotropy);
        }

        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        device.set_object_name(sampler, label);

        debug!("Created sampler '{}'", label);

        Ok(Self { sampler })
    }

    /// Returns the Vulkan sampler handle.
    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }

    /// Hands out the release descriptor for the teardown stack.
    pub fn release_resource(&self) -> ReleaseResource {
        ReleaseResource::Sampler(self.sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_config_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.filter, vk::Filter::LINEAR);
        assert_eq!(config.address_mode, vk::SamplerAddressMode::REPEAT);
        assert!(config.max_anisotropy.is_none());
    }
}
