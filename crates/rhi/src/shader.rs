//! Shader module loading.
//!
//! This module wraps VkShaderModule creation from SPIR-V binaries and
//! carries the per-stage data pipelines need: entry point, stage flags and
//! optional specialization constants (used to bake light and texture counts
//! into the lighting and G-buffer shaders).

use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Shader stage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    /// Converts to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Returns a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Vulkan shader module wrapper.
///
/// Immutable after creation apart from
/// [`with_specialization`](Self::with_specialization), which is applied
/// before the shader is handed to a pipeline builder.
pub struct Shader {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan shader module handle.
    module: vk::ShaderModule,
    /// Shader stage type.
    stage: ShaderStage,
    /// Specialization map entries (kept alive for the pipeline build).
    spec_entries: Vec<vk::SpecializationMapEntry>,
    /// Specialization constant payload.
    spec_data: Vec<u8>,
    /// Pre-built specialization info pointing into the vectors above.
    spec_info: Option<Box<vk::SpecializationInfo<'static>>>,
}

impl Shader {
    /// Creates a shader module from a SPIR-V file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the module cannot be
    /// created.
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage)
    }

    /// Creates a shader module from SPIR-V bytes.
    ///
    /// The entry point is always `main`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not 4-byte aligned or module
    /// creation fails.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
    ) -> RhiResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(RhiError::ShaderError(format!(
                "SPIR-V code must be 4-byte aligned, got {} bytes",
                bytes.len()
            )));
        }

        let code: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        info!("Created {} shader module", stage);

        Ok(Self {
            device,
            module,
            stage,
            spec_entries: Vec::new(),
            spec_data: Vec::new(),
            spec_info: None,
        })
    }

    /// Bakes 32-bit specialization constants into the shader, one per
    /// constant ID starting at 0.
    pub fn with_specialization(mut self, constants: &[u32]) -> Self {
        self.spec_data = constants.iter().flat_map(|c| c.to_le_bytes()).collect();
        self.spec_entries = (0..constants.len())
            .map(|i| vk::SpecializationMapEntry {
                constant_id: i as u32,
                offset: (i * 4) as u32,
                size: 4,
            })
            .collect();

        // The vectors are heap storage, so the raw pointers stay valid as
        // the Shader moves; they die together with it
        self.spec_info = Some(Box::new(vk::SpecializationInfo {
            map_entry_count: self.spec_entries.len() as u32,
            p_map_entries: self.spec_entries.as_ptr(),
            data_size: self.spec_data.len(),
            p_data: self.spec_data.as_ptr() as *const std::ffi::c_void,
            _marker: std::marker::PhantomData,
        }));

        self
    }

    /// Returns the Vulkan shader module handle.
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Returns the shader stage.
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Creates the pipeline stage create info for this shader.
    ///
    /// The returned structure borrows from this shader and must not outlive
    /// it.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        const ENTRY_POINT: &CStr = c"main";

        let mut info = vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(ENTRY_POINT);

        if let Some(spec) = &self.spec_info {
            info = info.specialization_info(spec);
        }

        info
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_flags() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }
}
