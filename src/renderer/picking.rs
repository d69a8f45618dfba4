//! Pointer picking against marker spheres

use glam::Vec3;

/// Pick radius of a marker in scene units (about 120 km)
pub const MARKER_PICK_RADIUS: f32 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first intersection with a sphere, if any.
    /// A sphere containing the origin reports the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let near = -b - sqrt_d;
        let far = -b + sqrt_d;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}

/// Nearest marker hit by the ray. Only markers take part; Earth and orbit
/// paths never block or win a pick.
pub fn pick_nearest<I>(ray: &Ray, markers: I, radius: f32) -> Option<u32>
where
    I: IntoIterator<Item = (u32, Vec3)>,
{
    markers
        .into_iter()
        .filter_map(|(id, position)| ray.intersect_sphere(position, radius).map(|t| (id, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray_down_z() -> Ray {
        Ray {
            origin: Vec3::new(0.0, 0.0, 50.0),
            direction: Vec3::NEG_Z,
        }
    }

    #[test]
    fn test_sphere_intersection() {
        let ray = ray_down_z();
        let t = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((t - 49.0).abs() < 1e-4);
        assert!((ray.at(t).z - 1.0).abs() < 1e-4);

        assert!(ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0).is_none());
        // Behind the origin
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 60.0), 1.0).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let markers = vec![
            (1, Vec3::new(0.0, 0.0, -10.0)),
            (2, Vec3::new(0.0, 0.05, 20.0)),
            (3, Vec3::new(3.0, 0.0, 30.0)),
        ];
        assert_eq!(pick_nearest(&ray_down_z(), markers, MARKER_PICK_RADIUS), Some(2));
    }

    #[test]
    fn test_miss_returns_none() {
        let markers = vec![(1, Vec3::new(1.0, 1.0, 0.0))];
        assert_eq!(pick_nearest(&ray_down_z(), markers, MARKER_PICK_RADIUS), None);
        assert_eq!(pick_nearest(&ray_down_z(), Vec::new(), MARKER_PICK_RADIUS), None);
    }
}
