//! Procedural demo geometry.
//!
//! Hand-built meshes with positions, normals, texture coordinates and
//! tangents, matching the vertex layout the geometry passes expect.

use glam::{Vec2, Vec3, Vec4};

use ember_rhi::vertex::Vertex;

/// Builds an axis-aligned cube centered at the origin.
///
/// Returns `(vertices, indices)`; four vertices per face so normals and
/// tangents stay flat.
pub fn cube_mesh(size: f32) -> (Vec<Vertex>, Vec<u32>) {
    let h = size * 0.5;

    // (normal, tangent, four corners)
    let faces: [(Vec3, Vec3, [Vec3; 4]); 6] = [
        (
            Vec3::Z,
            Vec3::X,
            [
                Vec3::new(-h, -h, h),
                Vec3::new(h, -h, h),
                Vec3::new(h, h, h),
                Vec3::new(-h, h, h),
            ],
        ),
        (
            Vec3::NEG_Z,
            Vec3::NEG_X,
            [
                Vec3::new(h, -h, -h),
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, h, -h),
                Vec3::new(h, h, -h),
            ],
        ),
        (
            Vec3::X,
            Vec3::NEG_Z,
            [
                Vec3::new(h, -h, h),
                Vec3::new(h, -h, -h),
                Vec3::new(h, h, -h),
                Vec3::new(h, h, h),
            ],
        ),
        (
            Vec3::NEG_X,
            Vec3::Z,
            [
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, -h, h),
                Vec3::new(-h, h, h),
                Vec3::new(-h, h, -h),
            ],
        ),
        (
            Vec3::Y,
            Vec3::X,
            [
                Vec3::new(-h, h, h),
                Vec3::new(h, h, h),
                Vec3::new(h, h, -h),
                Vec3::new(-h, h, -h),
            ],
        ),
        (
            Vec3::NEG_Y,
            Vec3::X,
            [
                Vec3::new(-h, -h, -h),
                Vec3::new(h, -h, -h),
                Vec3::new(h, -h, h),
                Vec3::new(-h, -h, h),
            ],
        ),
    ];

    let uvs = [
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 0.0),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, tangent, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(uvs) {
            vertices.push(Vertex::new(
                corner,
                normal,
                uv,
                Vec4::new(tangent.x, tangent.y, tangent.z, 1.0),
            ));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// Builds a ground plane in the XZ plane at the given height.
pub fn plane_mesh(size: f32, y: f32) -> (Vec<Vertex>, Vec<u32>) {
    let h = size * 0.5;
    let normal = Vec3::Y;
    let tangent = Vec4::new(1.0, 0.0, 0.0, 1.0);

    let vertices = vec![
        Vertex::new(Vec3::new(-h, y, h), normal, Vec2::new(0.0, size), tangent),
        Vertex::new(Vec3::new(h, y, h), normal, Vec2::new(size, size), tangent),
        Vertex::new(Vec3::new(h, y, -h), normal, Vec2::new(size, 0.0), tangent),
        Vertex::new(Vec3::new(-h, y, -h), normal, Vec2::new(0.0, 0.0), tangent),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_mesh_counts() {
        let (vertices, indices) = cube_mesh(1.0);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_cube_normals_are_unit_length() {
        let (vertices, _) = cube_mesh(2.0);
        for vertex in &vertices {
            assert!((vertex.normal.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_plane_mesh_height() {
        let (vertices, indices) = plane_mesh(4.0, -0.5);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert!(vertices.iter().all(|v| v.position.y == -0.5));
    }
}
