//! Chunked grass around a moving viewpoint.
//!
//! The system keeps a map of active chunks. It is rebuilt on the first update
//! and whenever the viewpoint enters a different chunk: each visible chunk
//! reuses its instances when its density tier is unchanged and is regenerated
//! otherwise. The new map replaces the old one in a single assignment, so
//! readers never observe a half-updated set.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use serde::Serialize;

use crate::scene_graph::{EntityId, SceneGraph};

use super::chunk::{generate_chunk_instances, visible_chunk_coords, ChunkCoord, ChunkData};
use super::height::{FlatHeightSampler, HeightSampler, RaycastHeightSampler, RaycastOptions};
use super::types::{to_gpu_instances, GpuGrassInstance, GrassInstance, GrassSystemConfig};

/// An active chunk and its instances.
#[derive(Debug, Clone)]
pub struct ChunkEntry {
    pub data: ChunkData,
    /// Shared so a reused chunk keeps the exact same buffer.
    pub instances: Arc<Vec<GrassInstance>>,
}

/// What the last chunk rebuild did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStats {
    pub active_chunks: usize,
    pub regenerated: usize,
    pub reused: usize,
    pub total_instances: usize,
}

pub struct GrassSystem {
    config: GrassSystemConfig,
    heights: Box<dyn HeightSampler>,
    chunks: BTreeMap<ChunkCoord, ChunkEntry>,
    view_chunk: Option<ChunkCoord>,
    last_stats: UpdateStats,
}

impl GrassSystem {
    pub fn new(config: GrassSystemConfig, heights: Box<dyn HeightSampler>) -> Self {
        Self {
            config: config.sanitized(),
            heights,
            chunks: BTreeMap::new(),
            view_chunk: None,
            last_stats: UpdateStats::default(),
        }
    }

    /// Grass on flat ground at height 0.
    pub fn flat(config: GrassSystemConfig) -> Self {
        Self::new(config, Box::new(FlatHeightSampler::new(0.0)))
    }

    /// Grass seated on the meshes under `terrain` with a raycast sampler, or
    /// on flat ground when there is no terrain.
    pub fn with_terrain(scene: &SceneGraph, terrain: Option<EntityId>, config: GrassSystemConfig) -> Self {
        match terrain {
            Some(_) => {
                let sampler = RaycastHeightSampler::new(scene, terrain, RaycastOptions::default());
                Self::new(config, Box::new(sampler))
            }
            None => Self::flat(config),
        }
    }

    pub fn config(&self) -> &GrassSystemConfig {
        &self.config
    }

    /// Replace the configuration. All chunks are regenerated on the next
    /// update.
    pub fn set_config(&mut self, config: GrassSystemConfig) {
        self.config = config.sanitized();
        self.chunks.clear();
        self.view_chunk = None;
    }

    /// Replace the height sampler. All chunks are regenerated on the next
    /// update.
    pub fn set_height_sampler(&mut self, heights: Box<dyn HeightSampler>) {
        self.heights = heights;
        self.chunks.clear();
        self.view_chunk = None;
    }

    /// Track the viewpoint. Returns true when the chunk map was rebuilt.
    pub fn update(&mut self, viewpoint: Vec3) -> bool {
        let current = ChunkCoord::from_world(viewpoint.x, viewpoint.z, self.config.chunk_size);
        if self.view_chunk == Some(current) {
            return false;
        }
        self.view_chunk = Some(current);
        self.rebuild(viewpoint);
        true
    }

    /// Rebuild the chunk map for `viewpoint` unconditionally.
    pub fn rebuild(&mut self, viewpoint: Vec3) {
        let config = &self.config;
        let heights = self.heights.as_mut();
        let previous = &self.chunks;

        let mut stats = UpdateStats::default();
        let mut next = BTreeMap::new();

        let coords = visible_chunk_coords(viewpoint.x, viewpoint.z, config.render_radius, config.chunk_size);
        for coord in coords {
            let data = ChunkData::new(coord, viewpoint, config);
            let Some(tier) = data.tier_index else {
                continue;
            };

            let instances = match previous.get(&coord) {
                Some(existing) if existing.data.tier_index == Some(tier) => {
                    stats.reused += 1;
                    Arc::clone(&existing.instances)
                }
                _ => {
                    stats.regenerated += 1;
                    Arc::new(generate_chunk_instances(&data, config, heights))
                }
            };

            stats.total_instances += instances.len();
            next.insert(coord, ChunkEntry { data, instances });
        }

        stats.active_chunks = next.len();
        self.chunks = next;
        self.last_stats = stats;

        if self.config.debug {
            log::info!(
                "Grass chunks: {}, total instances: {} ({} regenerated, {} reused)",
                stats.active_chunks,
                stats.total_instances,
                stats.regenerated,
                stats.reused
            );
        } else {
            log::debug!(
                "Grass chunks: {}, total instances: {}",
                stats.active_chunks,
                stats.total_instances
            );
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ChunkEntry> {
        self.chunks.values()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkEntry> {
        self.chunks.get(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_instance_count(&self) -> usize {
        self.chunks.values().map(|c| c.instances.len()).sum()
    }

    pub fn last_stats(&self) -> UpdateStats {
        self.last_stats
    }

    /// Chunk the viewpoint was in at the last rebuild.
    pub fn view_chunk(&self) -> Option<ChunkCoord> {
        self.view_chunk
    }

    /// One GPU instance buffer per active chunk.
    pub fn chunk_buffers(&self) -> Vec<(ChunkCoord, Vec<GpuGrassInstance>)> {
        self.chunks
            .iter()
            .map(|(coord, entry)| (*coord, to_gpu_instances(&entry.instances, self.config.base_color)))
            .collect()
    }
}
