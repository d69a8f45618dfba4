//! Idealized orbit rings per orbit class

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::{Quat, Vec3};

use super::transform::{km_to_scene, EARTH_RADIUS_KM};

/// Default number of points per generated ring
pub const DEFAULT_PATH_POINTS: usize = 100;

/// Reference inclination used by classes without a characteristic plane
const REFERENCE_INCLINATION_DEG: f64 = 51.6;
const NEAR_POLAR_INCLINATION_DEG: f64 = 98.0;
const FALLBACK_ALTITUDE_KM: f64 = 500.0;

/// Named altitude band used to group objects and draw reference rings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrbitClass {
    Leo,
    Meo,
    Geo,
    Sso,
    Heo,
    Polar,
    /// Code the class table does not know; drawn with the fallback ring
    Unrecognized(String),
}

impl OrbitClass {
    /// Every class with a dedicated band, in display order
    pub fn known() -> &'static [OrbitClass] {
        &[
            Self::Leo,
            Self::Meo,
            Self::Geo,
            Self::Sso,
            Self::Heo,
            Self::Polar,
        ]
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "LEO" => Self::Leo,
            "MEO" => Self::Meo,
            "GEO" => Self::Geo,
            "SSO" => Self::Sso,
            "HEO" => Self::Heo,
            "POLAR" => Self::Polar,
            _ => Self::Unrecognized(code.trim().to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Leo => "LEO",
            Self::Meo => "MEO",
            Self::Geo => "GEO",
            Self::Sso => "SSO",
            Self::Heo => "HEO",
            Self::Polar => "POLAR",
            Self::Unrecognized(code) => code,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Leo => "Low Earth Orbit",
            Self::Meo => "Medium Earth Orbit",
            Self::Geo => "Geostationary Orbit",
            Self::Sso => "Sun-Synchronous Orbit",
            Self::Heo => "High Earth Orbit",
            Self::Polar => "Polar Orbit",
            Self::Unrecognized(code) => code,
        }
    }

    /// Altitude band (min, max) in km
    pub fn altitude_band_km(&self) -> (f64, f64) {
        match self {
            Self::Leo => (160.0, 2000.0),
            Self::Meo => (2000.0, 35786.0),
            Self::Geo => (35786.0, 35786.0),
            Self::Sso => (600.0, 800.0),
            Self::Heo => (35786.0, 70000.0),
            Self::Polar => (200.0, 1000.0),
            Self::Unrecognized(_) => (FALLBACK_ALTITUDE_KM, FALLBACK_ALTITUDE_KM),
        }
    }

    pub fn default_inclination_deg(&self) -> f64 {
        match self {
            Self::Sso | Self::Polar => NEAR_POLAR_INCLINATION_DEG,
            Self::Geo | Self::Unrecognized(_) => 0.0,
            Self::Leo | Self::Meo | Self::Heo => REFERENCE_INCLINATION_DEG,
        }
    }

    /// Ring color (RGBA)
    pub fn color(&self) -> [f32; 4] {
        match self {
            Self::Leo => [0.25, 0.55, 1.0, 1.0],
            Self::Meo => [0.2, 0.9, 0.6, 1.0],
            Self::Geo => [1.0, 0.85, 0.2, 1.0],
            Self::Sso => [0.85, 0.4, 1.0, 1.0],
            Self::Heo => [1.0, 0.45, 0.25, 1.0],
            Self::Polar => [0.4, 0.9, 1.0, 1.0],
            Self::Unrecognized(_) => [0.7, 0.7, 0.7, 1.0],
        }
    }

    /// Semi-major axis of the idealized ring in km
    pub fn semi_major_axis_km(&self) -> f64 {
        let (min, max) = self.altitude_band_km();
        EARTH_RADIUS_KM + (min + max) / 2.0
    }
}

impl fmt::Display for OrbitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A renderable ring for one orbit class
#[derive(Debug, Clone)]
pub struct OrbitPath {
    pub class: OrbitClass,
    pub name: String,
    pub color: [f32; 4],
    /// One revolution in scene units; the renderer closes the loop
    pub points: Arc<Vec<Vec3>>,
    pub inclination_deg: f64,
    /// Launches recorded for this class by the launch service
    pub launch_count: usize,
}

impl OrbitPath {
    pub fn has_launches(&self) -> bool {
        self.launch_count > 0
    }
}

/// Generate ring points for a class. Pure: identical inputs give identical
/// output.
pub fn generate_orbit_points(
    class: &OrbitClass,
    inclination_deg: Option<f64>,
    num_points: usize,
) -> Vec<Vec3> {
    let inclination = inclination_deg.unwrap_or_else(|| class.default_inclination_deg());
    let a_km = class.semi_major_axis_km();
    let eccentricity = 0.0_f64;
    let rotation = Quat::from_rotation_x(inclination.to_radians() as f32);

    let mut points = Vec::with_capacity(num_points);
    for i in 0..num_points {
        let true_anomaly = 2.0 * std::f64::consts::PI * i as f64 / num_points as f64;
        let r_km = a_km * (1.0 - eccentricity * eccentricity)
            / (1.0 + eccentricity * true_anomaly.cos());

        // Orbital plane starts as the equatorial scene plane (XZ)
        let in_plane = Vec3::new(
            km_to_scene(r_km * true_anomaly.cos()) as f32,
            0.0,
            km_to_scene(r_km * true_anomaly.sin()) as f32,
        );
        points.push(rotation * in_plane);
    }
    points
}

/// Append the first point so a line strip draws the full revolution
pub fn closed_loop(points: &[Vec3]) -> Vec<Vec3> {
    let mut closed = points.to_vec();
    if let Some(first) = points.first() {
        closed.push(*first);
    }
    closed
}

/// Cache of generated rings keyed by (class, inclination)
pub struct OrbitPathCache {
    points_per_orbit: usize,
    entries: HashMap<(OrbitClass, u64), Arc<Vec<Vec3>>>,
}

impl OrbitPathCache {
    pub fn new(points_per_orbit: usize) -> Self {
        Self {
            points_per_orbit: points_per_orbit.max(3),
            entries: HashMap::new(),
        }
    }

    /// Path for a class, generating it on first use
    pub fn path(
        &mut self,
        class: &OrbitClass,
        inclination_deg: Option<f64>,
        launch_count: usize,
    ) -> OrbitPath {
        let inclination = inclination_deg.unwrap_or_else(|| class.default_inclination_deg());
        let key = (class.clone(), inclination.to_bits());
        let points_per_orbit = self.points_per_orbit;
        let points = self
            .entries
            .entry(key)
            .or_insert_with(|| {
                Arc::new(generate_orbit_points(class, Some(inclination), points_per_orbit))
            })
            .clone();

        OrbitPath {
            class: class.clone(),
            name: class.display_name().to_string(),
            color: class.color(),
            points,
            inclination_deg: inclination,
            launch_count,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_orbit_points(&OrbitClass::Leo, Some(51.6), 100);
        let b = generate_orbit_points(&OrbitClass::Leo, Some(51.6), 100);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_closed_loop_first_equals_last() {
        let points = generate_orbit_points(&OrbitClass::Meo, None, 100);
        let closed = closed_loop(&points);
        assert_eq!(closed.len(), 101);
        assert_eq!(closed.first(), closed.last());
        assert!(closed_loop(&[]).is_empty());
    }

    #[test]
    fn test_geo_is_equatorial_circle() {
        let points = generate_orbit_points(&OrbitClass::Geo, None, 64);
        let radius = km_to_scene(EARTH_RADIUS_KM + 35786.0) as f32;
        for p in &points {
            assert!(p.y.abs() < 1e-4, "GEO ring should stay in the equatorial plane");
            assert!((p.length() - radius).abs() < 1e-3);
        }
    }

    #[test]
    fn test_inclination_tilts_plane() {
        let points = generate_orbit_points(&OrbitClass::Polar, None, 100);
        let max_y = points.iter().map(|p| p.y.abs()).fold(0.0_f32, f32::max);
        let radius = points[0].length();
        // 98 degrees puts the ring almost through the poles
        assert!(max_y > radius * 0.95);
        assert_eq!(OrbitClass::Sso.default_inclination_deg(), 98.0);
        assert_eq!(OrbitClass::Heo.default_inclination_deg(), 51.6);
    }

    #[test]
    fn test_unrecognized_class_falls_back() {
        let class = OrbitClass::from_code("XYZ");
        assert_eq!(class, OrbitClass::Unrecognized("XYZ".into()));

        let points = generate_orbit_points(&class, None, 50);
        let radius = km_to_scene(EARTH_RADIUS_KM + 500.0) as f32;
        assert_eq!(points.len(), 50);
        for p in &points {
            assert!((p.length() - radius).abs() < 1e-4);
            assert!(p.y.abs() < 1e-5);
        }
    }

    #[test]
    fn test_semi_major_axis_uses_band_midpoint() {
        assert!((OrbitClass::Sso.semi_major_axis_km() - (EARTH_RADIUS_KM + 700.0)).abs() < 1e-9);
        assert!((OrbitClass::Geo.semi_major_axis_km() - (EARTH_RADIUS_KM + 35786.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cache_reuses_sequences() {
        let mut cache = OrbitPathCache::new(100);
        let first = cache.path(&OrbitClass::Leo, None, 0);
        let second = cache.path(&OrbitClass::Leo, None, 3);
        assert!(Arc::ptr_eq(&first.points, &second.points));
        assert!(second.has_launches());
        assert_eq!(cache.len(), 1);

        let tilted = cache.path(&OrbitClass::Leo, Some(30.0), 0);
        assert!(!Arc::ptr_eq(&first.points, &tilted.points));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_class_codes_roundtrip() {
        for class in OrbitClass::known() {
            assert_eq!(&OrbitClass::from_code(class.code()), class);
        }
        assert_eq!(OrbitClass::from_code(" sso "), OrbitClass::Sso);
    }
}
