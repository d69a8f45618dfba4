//! Marker and orbit-path vertex data

use bytemuck::{Pod, Zeroable};

use crate::data::{CatalogObject, ObjectKind, ObjectStatus};
use crate::propagation::{closed_loop, OrbitPath};

pub const WARNING_ORANGE: [f32; 3] = [1.0, 0.55, 0.1];
pub const ACTIVE_GREEN: [f32; 3] = [0.2, 0.85, 0.35];
pub const INACTIVE_SLATE: [f32; 3] = [0.4, 0.45, 0.52];
pub const NEUTRAL_GRAY: [f32; 3] = [0.7, 0.7, 0.7];
pub const HIGHLIGHT_YELLOW: [f32; 3] = [1.0, 0.95, 0.2];

pub const MARKER_OPACITY: f32 = 0.7;
pub const SELECTED_OPACITY: f32 = 1.0;
const MARKER_SIZE: f32 = 1.0;
const SELECTED_SIZE: f32 = 1.8;

/// Path opacity, raised when the launch service reports launches to the class
pub const PATH_OPACITY: f32 = 0.45;
pub const PATH_OPACITY_WITH_LAUNCHES: f32 = 0.9;

/// Instance data for each marker billboard
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    /// Position in scene units
    pub position: [f32; 3],
    pub color: [f32; 4],
    /// Size multiplier
    pub size: f32,
}

impl MarkerInstance {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Size
                wgpu::VertexAttribute {
                    offset: 28,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }

    pub fn new(position: glam::Vec3, object: &CatalogObject, selected: bool) -> Self {
        Self {
            position: position.to_array(),
            color: marker_color(object, selected),
            size: if selected { SELECTED_SIZE } else { MARKER_SIZE },
        }
    }
}

/// Base color by classification and status
pub fn status_color(object: &CatalogObject) -> [f32; 3] {
    let debris_like = matches!(
        object.kind,
        Some(ObjectKind::Debris) | Some(ObjectKind::RocketBody)
    ) || object.status == Some(ObjectStatus::Debris);

    if debris_like {
        return WARNING_ORANGE;
    }
    match object.status {
        Some(ObjectStatus::Active) => ACTIVE_GREEN,
        Some(ObjectStatus::Inactive) => INACTIVE_SLATE,
        _ => NEUTRAL_GRAY,
    }
}

/// RGBA for a marker; selection overrides the status color
pub fn marker_color(object: &CatalogObject, selected: bool) -> [f32; 4] {
    let ([r, g, b], a) = if selected {
        (HIGHLIGHT_YELLOW, SELECTED_OPACITY)
    } else {
        (status_color(object), MARKER_OPACITY)
    };
    [r, g, b, a]
}

/// Orbit path line vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct OrbitVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl OrbitVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OrbitVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Line-list segments for one closed ring: n points give n segments, the last
/// joining back to the first.
pub fn path_segments(path: &OrbitPath) -> Vec<OrbitVertex> {
    let opacity = if path.has_launches() {
        PATH_OPACITY_WITH_LAUNCHES
    } else {
        PATH_OPACITY
    };
    let [r, g, b, _] = path.color;
    let color = [r, g, b, opacity];

    closed_loop(&path.points)
        .windows(2)
        .flat_map(|pair| {
            [
                OrbitVertex {
                    position: pair[0].to_array(),
                    color,
                },
                OrbitVertex {
                    position: pair[1].to_array(),
                    color,
                },
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::described;
    use crate::propagation::{OrbitClass, OrbitPathCache};

    #[test]
    fn test_status_colors() {
        let debris = described(1, "D", None, Some(ObjectKind::Debris), None);
        let body = described(2, "R", None, Some(ObjectKind::RocketBody), Some(ObjectStatus::Inactive));
        let active = described(3, "A", None, Some(ObjectKind::Satellite), Some(ObjectStatus::Active));
        let inactive = described(4, "I", None, None, Some(ObjectStatus::Inactive));
        let unknown = described(5, "U", None, None, Some(ObjectStatus::Other("decayed".into())));

        assert_eq!(status_color(&debris), WARNING_ORANGE);
        assert_eq!(status_color(&body), WARNING_ORANGE);
        assert_eq!(status_color(&active), ACTIVE_GREEN);
        assert_eq!(status_color(&inactive), INACTIVE_SLATE);
        assert_eq!(status_color(&unknown), NEUTRAL_GRAY);
    }

    #[test]
    fn test_selection_overrides_color_and_opacity() {
        let obj = described(1, "A", None, None, Some(ObjectStatus::Active));
        let selected = MarkerInstance::new(glam::Vec3::ONE, &obj, true);
        let normal = MarkerInstance::new(glam::Vec3::ONE, &obj, false);
        assert_eq!(selected.color, [1.0, 0.95, 0.2, 1.0]);
        assert_eq!(normal.color[3], 0.7);
        assert!(selected.size > normal.size);
    }

    #[test]
    fn test_path_segments_close_the_loop() {
        let mut cache = OrbitPathCache::new(10);
        let path = cache.path(&OrbitClass::Leo, None, 0);
        let segments = path_segments(&path);
        assert_eq!(segments.len(), 20);
        assert_eq!(segments.last().unwrap().position, path.points[0].to_array());
        assert_eq!(segments[0].color[3], PATH_OPACITY);

        let launched = cache.path(&OrbitClass::Leo, None, 2);
        assert_eq!(path_segments(&launched)[0].color[3], PATH_OPACITY_WITH_LAUNCHES);
    }
}
