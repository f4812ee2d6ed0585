//! Procedural grass placement.
//!
//! Two variants share the same instance format:
//! - [`placement`]: one pass over a terrain, instances distributed by
//!   triangle area (or on a disk when there is no terrain).
//! - [`system`]: chunks around a moving viewpoint with distance-based
//!   density tiers and per-chunk deterministic layouts.

pub mod blade;
pub mod chunk;
pub mod height;
pub mod placement;
pub mod sway;
pub mod system;
pub mod types;

pub use blade::{BladeMesh, BladeVertex};
pub use chunk::{
    chunk_key, density_tier_index, diff_chunk_coords, generate_chunk_instances,
    has_viewpoint_changed_chunk, instance_count_for_distance, parse_chunk_key,
    visible_chunk_coords, ChunkCoord, ChunkData, ChunkDiff,
};
pub use height::{
    CompositeHeightSampler, CompositeMode, FlatHeightSampler, HeightMapSampler, HeightSampler,
    RaycastHeightSampler, RaycastOptions,
};
pub use placement::{extract_terrain_triangles, filter_by_spread, place_grass, place_on_disk, place_on_triangles};
pub use sway::{sway_offset, value_noise, GRASS_SHADER_WGSL};
pub use system::{ChunkEntry, GrassSystem, UpdateStats};
pub use types::{
    to_gpu_instances, DensityTier, MIN_CHUNK_SIZE, GpuGrassInstance, GrassInstance, GrassSystemConfig,
    PerformancePreset, SimpleGrassParams,
};
