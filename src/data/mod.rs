//! Catalog data: records, file and service loading, filtering, statistics

mod client;
mod filter;
mod loader;
mod space_object;
mod stats;

#[cfg(test)]
pub mod fixtures;

pub use client::*;
pub use filter::*;
pub use loader::*;
pub use space_object::*;
pub use stats::*;
