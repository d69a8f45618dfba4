//! egui panels around the 3D viewport

mod panels;
mod view_controls;

pub use panels::*;
pub use view_controls::*;
