//! Camera and orbit controls for the 3D viewport

use glam::{Mat4, Vec2, Vec3};

use super::picking::Ray;

const MIN_DISTANCE: f32 = 7.0;
const MAX_DISTANCE: f32 = 600.0;
/// Radians of rotation per pixel of drag
const ROTATE_SPEED: f32 = 0.005;
/// Below this the residual drag velocity is dropped
const REST_VELOCITY: f32 = 1e-5;

/// Orbital camera that rotates around a target point
#[derive(Debug, Clone)]
pub struct Camera {
    /// Target point the camera looks at (Earth center)
    pub target: Vec3,
    /// Distance from target in scene units
    pub distance: f32,
    /// Azimuth angle (rotation around Y axis) in radians
    pub azimuth: f32,
    /// Elevation angle (rotation above/below XZ plane) in radians
    pub elevation: f32,
    /// Field of view in radians
    pub fov: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 25.0, // About 4 Earth radii out
            azimuth: 0.0,
            elevation: 0.3, // Slightly above equator
            fov: 45.0_f32.to_radians(),
            near: 0.01,
            far: 2000.0,
        }
    }
}

impl Camera {
    /// Get camera position in world space
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Rotate by angles in radians, keeping clear of the poles
    pub fn rotate(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation = (self.elevation + d_elevation).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }

    /// Zoom the camera (mouse wheel)
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.1)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// World-space ray through a point in normalized device coordinates
    /// (x right, y up, both in -1..1)
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect_ratio: f32) -> Ray {
        let inverse = self.view_projection_matrix(aspect_ratio).inverse();
        // perspective_rh maps depth to 0..1
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }
}

/// Damped drag rotation plus optional auto-rotate
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Fraction of drag velocity removed each 60 Hz frame
    pub damping: f32,
    pub auto_rotate: bool,
    /// Auto-rotate speed in radians per second
    pub auto_rotate_speed: f32,
    velocity: Vec2,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            damping: 0.1,
            auto_rotate: false,
            auto_rotate_speed: 0.1,
            velocity: Vec2::ZERO,
        }
    }
}

impl OrbitControls {
    /// Feed a pointer drag in pixels
    pub fn drag(&mut self, delta: Vec2) {
        self.velocity += delta * ROTATE_SPEED;
    }

    /// Stop any residual motion
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }

    /// Advance the camera by one frame
    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        if self.auto_rotate {
            camera.rotate(self.auto_rotate_speed * dt, 0.0);
        }

        if self.velocity == Vec2::ZERO {
            return;
        }
        camera.rotate(-self.velocity.x, self.velocity.y);

        // Frame-rate independent decay normalized to 60 Hz
        let keep = (1.0 - self.damping.clamp(0.0, 1.0)).powf(dt * 60.0);
        self.velocity *= keep;
        if self.velocity.length() < REST_VELOCITY {
            self.velocity = Vec2::ZERO;
        }
    }
}

/// Camera uniform data for shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera, aspect_ratio: f32) -> Self {
        let pos = camera.position();
        Self {
            view_proj: camera
                .view_projection_matrix(aspect_ratio)
                .to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection_matrix(aspect_ratio).to_cols_array_2d(),
            camera_pos: [pos.x, pos.y, pos.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::default();
        let ray = camera.ray_from_ndc(Vec2::ZERO, 1.5);
        let expected = (camera.target - camera.position()).normalize();
        assert!(ray.direction.dot(expected) > 0.9999);
        assert!((ray.origin - camera.position()).length() < 0.1);
    }

    #[test]
    fn test_offset_ray_leans_right() {
        let camera = Camera {
            azimuth: 0.0,
            elevation: 0.0,
            ..Camera::default()
        };
        // Camera on +Z looking at the origin, so screen right is +X
        let ray = camera.ray_from_ndc(Vec2::new(0.5, 0.0), 1.0);
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.y.abs() < 1e-4);
    }

    #[test]
    fn test_damping_brings_drag_to_rest() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::default();
        controls.drag(Vec2::new(40.0, 0.0));

        let start = camera.azimuth;
        for _ in 0..600 {
            controls.update(&mut camera, 1.0 / 60.0);
        }
        assert!(!controls.is_moving());
        // Total travel is the geometric series of the initial velocity
        let expected = 40.0 * ROTATE_SPEED / 0.1;
        assert!((start - camera.azimuth - expected).abs() < 1e-3);
    }

    #[test]
    fn test_auto_rotate_advances_azimuth() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls {
            auto_rotate: true,
            ..OrbitControls::default()
        };
        controls.update(&mut camera, 2.0);
        assert!((camera.azimuth - 0.2).abs() < 1e-6);

        controls.auto_rotate = false;
        controls.update(&mut camera, 2.0);
        assert!((camera.azimuth - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        for _ in 0..100 {
            camera.zoom(1.0);
        }
        assert_eq!(camera.distance, MIN_DISTANCE);
    }
}
