//! GPU-visible uniform and storage buffer layouts.
//!
//! Layouts match std140/std430 expectations; the tests pin the sizes so a
//! field reorder cannot silently shift shader data.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-frame transform uniforms.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelViewProjection {
    /// Model transform.
    pub model: Mat4,
    /// View transform.
    pub view: Mat4,
    /// Projection transform.
    pub projection: Mat4,
}

impl ModelViewProjection {
    /// Creates the uniform block.
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model,
            view,
            projection,
        }
    }
}

/// A point light in the lighting storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    _pad0: f32,
    /// Linear RGB color.
    pub color: Vec3,
    /// Luminous flux.
    pub lumen: f32,
}

impl PointLight {
    /// Creates a point light.
    pub fn new(position: Vec3, color: Vec3, lumen: f32) -> Self {
        Self {
            position,
            _pad0: 0.0,
            color,
            lumen,
        }
    }
}

/// A directional light in the lighting storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLight {
    /// World-space direction the light travels.
    pub direction: Vec3,
    _pad0: f32,
    /// Linear RGB color.
    pub color: Vec3,
    /// Illuminance.
    pub lux: f32,
}

impl DirectionalLight {
    /// Creates a directional light.
    pub fn new(direction: Vec3, color: Vec3, lux: f32) -> Self {
        Self {
            direction: direction.normalize(),
            _pad0: 0.0,
            color,
            lux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mvp_size() {
        assert_eq!(std::mem::size_of::<ModelViewProjection>(), 3 * 64);
    }

    #[test]
    fn test_light_sizes_match_std430() {
        // vec3 + pad, vec3, f32 -> two 16-byte rows
        assert_eq!(std::mem::size_of::<PointLight>(), 32);
        assert_eq!(std::mem::size_of::<DirectionalLight>(), 32);
    }

    #[test]
    fn test_directional_light_normalizes() {
        let light = DirectionalLight::new(Vec3::new(0.0, -2.0, 0.0), Vec3::ONE, 100.0);
        assert!((light.direction.length() - 1.0).abs() < 1e-6);
    }
}
