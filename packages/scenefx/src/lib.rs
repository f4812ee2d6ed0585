pub mod color;
pub mod config;
pub mod geometry;
pub mod mesh_asset;
pub mod profiling;
pub mod rng;
pub mod scene_graph;

// Effects
pub mod dissolve;
pub mod grass;
pub mod progress;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
