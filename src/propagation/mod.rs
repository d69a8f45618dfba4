//! Orbital propagation and scene-space geometry
//!
//! - `propagator` runs SGP4 (via satkit) for the working set and reports a
//!   per-object result so one bad element set never blocks the rest.
//! - `transform` owns the single km to scene-unit factor.
//! - `orbit_path` builds the idealized per-class rings.

mod orbit_path;
mod propagator;
mod transform;

pub use orbit_path::{closed_loop, OrbitClass, OrbitPath, OrbitPathCache, DEFAULT_PATH_POINTS};
pub use propagator::{format_time, propagate_object, PositionedObject, Propagator, SatelliteState};
pub use transform::{earth_radius_scene, scene_to_earth_frame_km, scene_to_km, EARTH_RADIUS_KM};
