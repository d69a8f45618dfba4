//! Kilometer to scene-unit conversion shared by every renderable

use glam::Vec3;

/// Scene units per kilometer. Earth radius, marker positions and orbit path
/// points all go through this one factor.
pub const SCENE_UNITS_PER_KM: f64 = 1.0 / 1000.0;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Convert a physical length in km to scene units
pub fn km_to_scene(km: f64) -> f64 {
    km * SCENE_UNITS_PER_KM
}

/// Convert scene units back to km
pub fn scene_to_km(scene: f64) -> f64 {
    scene / SCENE_UNITS_PER_KM
}

/// Earth radius in scene units
pub fn earth_radius_scene() -> f32 {
    km_to_scene(EARTH_RADIUS_KM) as f32
}

/// Map an Earth-frame position in km (Z toward the pole) into scene space
/// (Y up). Earth X -> scene X, Earth Z -> scene Y, Earth Y -> scene -Z, which
/// keeps the frame right-handed.
pub fn earth_frame_km_to_scene(x_km: f64, y_km: f64, z_km: f64) -> Vec3 {
    Vec3::new(
        km_to_scene(x_km) as f32,
        km_to_scene(z_km) as f32,
        -km_to_scene(y_km) as f32,
    )
}

/// Inverse of [`earth_frame_km_to_scene`], returning km in the Earth frame
pub fn scene_to_earth_frame_km(p: Vec3) -> [f64; 3] {
    [
        scene_to_km(p.x as f64),
        -scene_to_km(p.z as f64),
        scene_to_km(p.y as f64),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_linear_and_invertible() {
        for km in [0.0, 1.0, 6371.0, 35786.0, -420.5, 1.0e6] {
            let scene = km_to_scene(km);
            assert!((scene / SCENE_UNITS_PER_KM - km).abs() < 1e-9 * km.abs().max(1.0));
            assert!((scene_to_km(scene) - km).abs() < 1e-9 * km.abs().max(1.0));
        }
        assert!((km_to_scene(2.0 * 700.0) - 2.0 * km_to_scene(700.0)).abs() < 1e-12);
    }

    #[test]
    fn test_earth_radius_uses_same_factor() {
        assert!((earth_radius_scene() - 6.371).abs() < 1e-6);
    }

    #[test]
    fn test_axis_mapping_roundtrip() {
        let scene = earth_frame_km_to_scene(7000.0, -1200.0, 300.0);
        assert!((scene.y - 0.3).abs() < 1e-6);
        assert!((scene.z - 1.2).abs() < 1e-6);
        let back = scene_to_earth_frame_km(scene);
        assert!((back[0] - 7000.0).abs() < 1e-2);
        assert!((back[1] + 1200.0).abs() < 1e-2);
        assert!((back[2] - 300.0).abs() < 1e-2);
    }

    #[test]
    fn test_mapping_preserves_length() {
        let (x, y, z) = (4000.0, 3000.0, 1200.0);
        let r_km = ((x * x + y * y + z * z) as f64).sqrt();
        let scene = earth_frame_km_to_scene(x, y, z);
        assert!((scene.length() as f64 - km_to_scene(r_km)).abs() < 1e-5);
    }
}
