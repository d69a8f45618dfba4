//! Earth body - sphere mesh at the scene-scale radius

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Flat color shown until (or instead of) the surface texture
pub const EARTH_FALLBACK_COLOR: [f32; 4] = [0.12, 0.28, 0.55, 1.0];

/// Vertex for Earth mesh
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct EarthVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl EarthVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<EarthVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Generate a UV sphere of the given radius.
/// Returns (vertices, indices)
pub fn generate_earth_sphere(radius: f32, segments: u32, rings: u32) -> (Vec<EarthVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            // Longitude runs east from scene +X, which is Earth-frame +X
            let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
            let normal = Vec3::new(ring_radius * theta.cos(), y, -ring_radius * theta.sin());

            // Equirectangular: u = 0.5 at the prime meridian
            let u = 0.5 + seg as f32 / segments as f32;
            let v = ring as f32 / rings as f32;

            vertices.push(EarthVertex {
                position: (normal * radius).to_array(),
                normal: normal.to_array(),
                uv: [u, v],
            });
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.push(current);
            indices.push(next);
            indices.push(current + 1);

            indices.push(current + 1);
            indices.push(next);
            indices.push(next + 1);
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::earth_radius_scene;

    #[test]
    fn test_sphere_uses_scene_radius() {
        let radius = earth_radius_scene();
        let (vertices, indices) = generate_earth_sphere(radius, 32, 16);
        assert_eq!(vertices.len(), 33 * 17);
        assert_eq!(indices.len(), 32 * 16 * 6);
        for v in &vertices {
            let p = Vec3::from(v.position);
            assert!((p.length() - radius).abs() < 1e-4);
        }
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }
}
