//! Drawable batches and scene assembly.
//!
//! A [`DrawBatch`] is what the geometry passes consume: a vertex/index
//! buffer pair plus the small per-batch metadata (texture table indices)
//! pushed to the fragment shader. The [`Scene`] owns the batches, the
//! texture table they index into, and nothing else - pass sequencing
//! iterates it without knowing where the content came from.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use tracing::info;

use ember_rhi::RhiResult;
use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::command::CommandPool;
use ember_rhi::device::Device;
use ember_rhi::image::{ImageConfig, TrackedImage};
use ember_rhi::teardown::TeardownStack;
use ember_rhi::vertex::Vertex;

use crate::geometry;

/// Texture table indices for one batch, pushed to the fragment stage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct TextureIndices {
    /// Albedo texture index.
    pub albedo: u32,
    /// Roughness texture index.
    pub roughness: u32,
    /// Metalness texture index.
    pub metalness: u32,
    /// Normal map index.
    pub normal: u32,
}

/// One drawable batch: geometry buffers plus per-batch metadata.
pub struct DrawBatch {
    /// Vertex buffer.
    pub vertex_buffer: Buffer,
    /// Index buffer (32-bit indices).
    pub index_buffer: Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Texture table indices.
    pub texture_indices: TextureIndices,
}

impl DrawBatch {
    /// Uploads a mesh into GPU buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or the upload fails.
    pub fn from_mesh(
        device: &Arc<Device>,
        vertices: &[Vertex],
        indices: &[u32],
        texture_indices: TextureIndices,
    ) -> RhiResult<Self> {
        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(vertices),
        )?;
        let index_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Index,
            bytemuck::cast_slice(indices),
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            texture_indices,
        })
    }
}

/// The demo scene: a textured cube resting on a ground plane.
///
/// Textures are flat-color 1x1 images; enough to exercise the texture
/// table without an asset importer.
pub struct Scene {
    batches: Vec<DrawBatch>,
    textures: Vec<TrackedImage>,
}

impl Scene {
    /// Builds the demo scene and registers its textures on the teardown
    /// stack.
    ///
    /// # Errors
    ///
    /// Returns an error if any GPU resource creation fails.
    pub fn demo(
        device: &Arc<Device>,
        pool: &CommandPool,
        teardown: &mut TeardownStack,
    ) -> RhiResult<Self> {
        // Texture table: albedo pairs plus shared flat roughness/metalness
        // and a neutral normal map
        let texture_data: [(&str, [u8; 4]); 5] = [
            ("albedo brick", [170, 74, 68, 255]),
            ("albedo slate", [96, 104, 114, 255]),
            ("roughness flat", [200, 200, 200, 255]),
            ("metalness flat", [16, 16, 16, 255]),
            ("normal flat", [128, 128, 255, 255]),
        ];

        let mut textures = Vec::with_capacity(texture_data.len());
        for (label, pixel) in texture_data {
            let mut texture = TrackedImage::with_pixels(
                device,
                pool,
                &ImageConfig {
                    format: vk::Format::R8G8B8A8_UNORM,
                    ..Default::default()
                },
                &pixel,
                label,
            )?;
            teardown.push(label, texture.release_resource());
            textures.push(texture);
        }

        let cube_indices = TextureIndices {
            albedo: 0,
            roughness: 2,
            metalness: 3,
            normal: 4,
        };
        let plane_indices = TextureIndices {
            albedo: 1,
            roughness: 2,
            metalness: 3,
            normal: 4,
        };

        let (cube_vertices, cube_idx) = geometry::cube_mesh(1.0);
        let (plane_vertices, plane_idx) = geometry::plane_mesh(8.0, -0.5);

        let batches = vec![
            DrawBatch::from_mesh(device, &cube_vertices, &cube_idx, cube_indices)?,
            DrawBatch::from_mesh(device, &plane_vertices, &plane_idx, plane_indices)?,
        ];

        info!(
            "Demo scene built: {} batches, {} textures",
            batches.len(),
            textures.len()
        );

        Ok(Self { batches, textures })
    }

    /// Returns the ordered drawable batches.
    #[inline]
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Returns the texture table views, in index order.
    pub fn texture_views(&self) -> Vec<vk::ImageView> {
        self.textures.iter().map(|t| t.view()).collect()
    }

    /// Returns the number of textures in the table.
    #[inline]
    pub fn texture_count(&self) -> u32 {
        self.textures.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_indices_is_pod() {
        let indices = TextureIndices {
            albedo: 0,
            roughness: 1,
            metalness: 2,
            normal: 3,
        };
        let bytes = bytemuck::bytes_of(&indices);
        assert_eq!(bytes.len(), 16);
    }
}
