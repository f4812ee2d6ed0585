//! Chunk grid math and per-chunk instance generation.
//!
//! The world XZ plane is split into square chunks of `chunk_size`. A chunk's
//! layout depends only on its coordinate and the configuration, never on when
//! or in which order chunks are generated.

use std::collections::HashSet;
use std::fmt;

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::rng::{chunk_seed, SeededRandom};

use super::height::HeightSampler;
use super::types::{DensityTier, GrassInstance, GrassSystemConfig};

/// Integer grid coordinate of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a world position.
    pub fn from_world(x: f32, z: f32, chunk_size: f32) -> Self {
        Self {
            x: (x / chunk_size).floor() as i32,
            z: (z / chunk_size).floor() as i32,
        }
    }

    /// World-space center of the chunk (Y is 0).
    pub fn center(&self, chunk_size: f32) -> Vec3 {
        let half = chunk_size * 0.5;
        Vec3::new(
            self.x as f32 * chunk_size + half,
            0.0,
            self.z as f32 * chunk_size + half,
        )
    }

    /// Seed for this chunk's layout.
    pub fn seed(&self) -> u32 {
        chunk_seed(self.x, self.z)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

/// Map key of a chunk, `"x,z"`.
pub fn chunk_key(coord: ChunkCoord) -> String {
    coord.to_string()
}

/// Inverse of [`chunk_key`].
pub fn parse_chunk_key(key: &str) -> Result<ChunkCoord, String> {
    let (x, z) = key
        .split_once(',')
        .ok_or_else(|| format!("Invalid chunk key '{}'", key))?;
    let x = x
        .trim()
        .parse()
        .map_err(|_| format!("Invalid chunk key '{}'", key))?;
    let z = z
        .trim()
        .parse()
        .map_err(|_| format!("Invalid chunk key '{}'", key))?;
    Ok(ChunkCoord { x, z })
}

/// Index of the first tier whose `max_distance` covers `distance`.
///
/// `None` means the chunk is beyond every tier and gets no grass.
pub fn density_tier_index(distance: f32, tiers: &[DensityTier]) -> Option<usize> {
    tiers.iter().position(|tier| distance <= tier.max_distance)
}

/// Instances per chunk at `distance`, 0 beyond the last tier.
pub fn instance_count_for_distance(distance: f32, tiers: &[DensityTier]) -> usize {
    density_tier_index(distance, tiers).map_or(0, |i| tiers[i].clumps_per_chunk)
}

/// Chunks around the viewpoint whose center lies within the render radius
/// plus half a chunk diagonal.
///
/// Empty when the chunk size is not positive or either length is not finite.
pub fn visible_chunk_coords(view_x: f32, view_z: f32, render_radius: f32, chunk_size: f32) -> Vec<ChunkCoord> {
    if !chunk_size.is_finite() || chunk_size <= 0.0 || !render_radius.is_finite() || render_radius < 0.0 {
        return Vec::new();
    }
    let view_chunk = ChunkCoord::from_world(view_x, view_z, chunk_size);
    let chunk_radius = (render_radius / chunk_size).ceil() as i32;
    let margin = chunk_size * std::f32::consts::SQRT_2 * 0.5;
    let view = Vec2::new(view_x, view_z);

    let mut coords = Vec::new();
    for dx in -chunk_radius..=chunk_radius {
        for dz in -chunk_radius..=chunk_radius {
            let coord = ChunkCoord::new(view_chunk.x + dx, view_chunk.z + dz);
            let center = coord.center(chunk_size);
            if Vec2::new(center.x, center.z).distance(view) <= render_radius + margin {
                coords.push(coord);
            }
        }
    }
    coords
}

/// Whether moving the viewpoint from `previous` to `current` crosses a chunk
/// boundary.
pub fn has_viewpoint_changed_chunk(previous: Vec3, current: Vec3, chunk_size: f32) -> bool {
    ChunkCoord::from_world(previous.x, previous.z, chunk_size)
        != ChunkCoord::from_world(current.x, current.z, chunk_size)
}

/// Chunks entering and leaving the visible set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkDiff {
    pub added: Vec<ChunkCoord>,
    pub removed: Vec<ChunkCoord>,
}

/// Set difference between two chunk lists, keeping input order.
pub fn diff_chunk_coords(old: &[ChunkCoord], new: &[ChunkCoord]) -> ChunkDiff {
    let old_set: HashSet<ChunkCoord> = old.iter().copied().collect();
    let new_set: HashSet<ChunkCoord> = new.iter().copied().collect();
    ChunkDiff {
        added: new.iter().filter(|c| !old_set.contains(c)).copied().collect(),
        removed: old.iter().filter(|c| !new_set.contains(c)).copied().collect(),
    }
}

/// Placement state of one chunk relative to the viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkData {
    pub coord: ChunkCoord,
    /// World-space center (Y is 0).
    pub center: Vec3,
    /// Horizontal distance from the viewpoint to the center.
    pub distance: f32,
    pub tier_index: Option<usize>,
    pub instance_count: usize,
}

impl ChunkData {
    pub fn new(coord: ChunkCoord, viewpoint: Vec3, config: &GrassSystemConfig) -> Self {
        let center = coord.center(config.chunk_size);
        let distance = Vec2::new(center.x, center.z).distance(Vec2::new(viewpoint.x, viewpoint.z));
        let tier_index = density_tier_index(distance, &config.density_tiers);
        let instance_count = tier_index.map_or(0, |i| config.density_tiers[i].clumps_per_chunk);
        Self {
            coord,
            center,
            distance,
            tier_index,
            instance_count,
        }
    }
}

/// Generate the instances of one chunk.
///
/// Draws per instance, in order: local X, local Z, rotation, scale, color.
pub fn generate_chunk_instances(
    chunk: &ChunkData,
    config: &GrassSystemConfig,
    heights: &mut dyn HeightSampler,
) -> Vec<GrassInstance> {
    if chunk.instance_count == 0 {
        return Vec::new();
    }

    let mut rng = SeededRandom::new(chunk.coord.seed());
    let size = config.chunk_size;

    (0..chunk.instance_count)
        .map(|_| {
            let x = chunk.center.x + (rng.next_f32() - 0.5) * size;
            let z = chunk.center.z + (rng.next_f32() - 0.5) * size;
            let y = heights.height_at(x, z);

            let rotation_y = rng.angle();
            let scale = config.base_scale * (1.0 + (rng.next_f32() - 0.5) * 2.0 * config.scale_variation);
            let color_offset = (rng.next_f32() - 0.5) * 2.0 * config.color_variation;

            GrassInstance {
                position: Vec3::new(x, y, z),
                rotation_y,
                scale,
                color_offset,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grass::height::FlatHeightSampler;

    #[test]
    fn test_world_to_chunk_floors() {
        assert_eq!(ChunkCoord::from_world(9.99, 0.0, 10.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world(-0.01, 10.0, 10.0), ChunkCoord::new(-1, 1));
        assert_eq!(ChunkCoord::new(-1, 2).center(10.0), Vec3::new(-5.0, 0.0, 25.0));
    }

    #[test]
    fn test_chunk_key_round_trip() {
        let coord = ChunkCoord::new(-3, 12);
        assert_eq!(chunk_key(coord), "-3,12");
        assert_eq!(parse_chunk_key("-3,12").unwrap(), coord);
        assert_eq!(parse_chunk_key(" 4 , -5 ").unwrap(), ChunkCoord::new(4, -5));
        assert!(parse_chunk_key("4").is_err());
        assert!(parse_chunk_key("a,b").is_err());
    }

    #[test]
    fn test_tier_lookup() {
        let tiers = crate::grass::PerformancePreset::Low.density_tiers();
        assert_eq!(density_tier_index(0.0, &tiers), Some(0));
        assert_eq!(density_tier_index(10.0, &tiers), Some(0));
        assert_eq!(density_tier_index(10.01, &tiers), Some(1));
        assert_eq!(density_tier_index(20.0, &tiers), Some(2));
        assert_eq!(density_tier_index(20.5, &tiers), None);
        assert_eq!(instance_count_for_distance(12.0, &tiers), 25);
        assert_eq!(instance_count_for_distance(99.0, &tiers), 0);
    }

    #[test]
    fn test_visible_chunks_default_config() {
        // Radius 15, size 10: a 5x5 block trimmed to a disk of 15 + 7.07
        let coords = visible_chunk_coords(5.0, 5.0, 15.0, 10.0);
        assert!(coords.contains(&ChunkCoord::new(0, 0)));
        assert!(coords.contains(&ChunkCoord::new(2, 0)));
        assert!(!coords.contains(&ChunkCoord::new(2, 2)));
        assert!(!coords.contains(&ChunkCoord::new(-2, -2)));
        let max_reach = 15.0 + 10.0 * std::f32::consts::SQRT_2 * 0.5;
        for c in &coords {
            let center = c.center(10.0);
            assert!(Vec2::new(center.x - 5.0, center.z - 5.0).length() <= max_reach);
        }
        assert_eq!(coords.len(), 13);
    }

    #[test]
    fn test_visible_chunks_degenerate_grid_is_empty() {
        assert!(visible_chunk_coords(0.0, 0.0, 15.0, 0.0).is_empty());
        assert!(visible_chunk_coords(0.0, 0.0, 15.0, -10.0).is_empty());
        assert!(visible_chunk_coords(0.0, 0.0, 15.0, f32::NAN).is_empty());
        assert!(visible_chunk_coords(0.0, 0.0, f32::INFINITY, 10.0).is_empty());
        assert!(visible_chunk_coords(0.0, 0.0, -1.0, 10.0).is_empty());
        // Zero radius still covers the chunk under the viewpoint
        assert_eq!(visible_chunk_coords(5.0, 5.0, 0.0, 10.0), vec![ChunkCoord::new(0, 0)]);
    }

    #[test]
    fn test_viewpoint_chunk_change() {
        let a = Vec3::new(1.0, 0.0, 1.0);
        assert!(!has_viewpoint_changed_chunk(a, Vec3::new(9.0, 50.0, 9.0), 10.0));
        assert!(has_viewpoint_changed_chunk(a, Vec3::new(10.0, 0.0, 1.0), 10.0));
    }

    #[test]
    fn test_diff() {
        let old = [ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)];
        let new = [ChunkCoord::new(1, 0), ChunkCoord::new(2, 0)];
        let diff = diff_chunk_coords(&old, &new);
        assert_eq!(diff.added, vec![ChunkCoord::new(2, 0)]);
        assert_eq!(diff.removed, vec![ChunkCoord::new(0, 0)]);
    }

    #[test]
    fn test_chunk_data() {
        let config = GrassSystemConfig::default();
        let data = ChunkData::new(ChunkCoord::new(0, 0), Vec3::new(5.0, 3.0, 5.0), &config);
        assert_eq!(data.distance, 0.0);
        assert_eq!(data.tier_index, Some(0));
        assert_eq!(data.instance_count, 50);

        let far = ChunkData::new(ChunkCoord::new(5, 5), Vec3::ZERO, &config);
        assert_eq!(far.tier_index, None);
        assert_eq!(far.instance_count, 0);
    }

    #[test]
    fn test_generated_instances_stay_in_chunk() {
        let config = GrassSystemConfig::default();
        let data = ChunkData::new(ChunkCoord::new(-2, 3), Vec3::new(-15.0, 0.0, 35.0), &config);
        let mut heights = FlatHeightSampler::new(0.25);
        let instances = generate_chunk_instances(&data, &config, &mut heights);
        assert_eq!(instances.len(), data.instance_count);

        for instance in &instances {
            assert!((instance.position.x - data.center.x).abs() <= 5.0 + 1e-4);
            assert!((instance.position.z - data.center.z).abs() <= 5.0 + 1e-4);
            assert_eq!(instance.position.y, 0.25);
            assert!(instance.scale >= 0.35 - 1e-6 && instance.scale <= 0.65 + 1e-6);
            assert!(instance.color_offset.abs() <= 0.15 + 1e-6);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = GrassSystemConfig::default();
        let data = ChunkData::new(ChunkCoord::new(7, -1), Vec3::new(75.0, 0.0, -5.0), &config);
        let a = generate_chunk_instances(&data, &config, &mut FlatHeightSampler::default());
        let b = generate_chunk_instances(&data, &config, &mut FlatHeightSampler::default());
        assert_eq!(a, b);
    }
}
