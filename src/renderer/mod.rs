//! 3D rendering module using wgpu
//!
//! The scene manager owns every entity and resource; the wgpu callback only
//! draws the frames it is handed.

mod camera;
mod earth;
mod markers;
mod picking;
mod resources;
mod scene;
mod scheduler;
mod starfield;
mod surface;
mod textures;
mod wgpu_callback;

pub use markers::{ACTIVE_GREEN, INACTIVE_SLATE, NEUTRAL_GRAY, WARNING_ORANGE};
pub use scene::{
    MarkerUpdate, RenderableKind, SceneConfig, SceneContext, SceneEvent, SceneManager, SceneState,
    WorkingSetPass, DEFAULT_MARKER_CAP,
};
pub use starfield::{DEFAULT_STAR_COUNT, DEFAULT_STAR_EXTENT, DEFAULT_STAR_SEED};
pub use wgpu_callback::{SceneCallback, WgpuSurface};
