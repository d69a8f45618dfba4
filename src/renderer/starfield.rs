//! Background starfield: a fixed point cloud generated once per mount

use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_STAR_COUNT: usize = 4000;
/// Half-width of the cube the stars are scattered in (scene units)
pub const DEFAULT_STAR_EXTENT: f32 = 400.0;
pub const DEFAULT_STAR_SEED: u64 = 0x5eed_57a2;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct StarVertex {
    pub position: [f32; 3],
    pub brightness: f32,
}

impl StarVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Uniformly scatter `count` stars in a cube of half-width `extent`.
/// An extent that is not a positive finite number yields no stars.
pub fn generate_starfield(count: usize, extent: f32, seed: u64) -> Vec<StarVertex> {
    if !(extent.is_finite() && extent > 0.0) {
        log::warn!("Starfield extent {} is not positive, skipping stars", extent);
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| StarVertex {
            position: [
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            ],
            brightness: rng.gen_range(0.35..1.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_count_inside_cube() {
        let stars = generate_starfield(500, 10.0, 7);
        assert_eq!(stars.len(), 500);
        for star in &stars {
            assert!(star.position.iter().all(|c| (-10.0..10.0).contains(c)));
            assert!((0.35..1.0).contains(&star.brightness));
        }
    }

    #[test]
    fn test_same_seed_same_stars() {
        assert_eq!(generate_starfield(100, 50.0, 1), generate_starfield(100, 50.0, 1));
        assert_ne!(generate_starfield(100, 50.0, 1), generate_starfield(100, 50.0, 2));
        assert!(generate_starfield(0, 50.0, 1).is_empty());
    }

    #[test]
    fn test_degenerate_extent_gives_empty_field() {
        for extent in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            assert!(generate_starfield(100, extent, 1).is_empty(), "extent {}", extent);
        }
    }
}
