//! Mapping a single scroll-driven progress scalar onto per-zone dissolve progress.
//!
//! The scroll choreographer produces one global value in [0, 1]. Each zone of
//! the scene (model, sky, ocean, fog) dissolves over its own sub-range of that
//! value. Ranges may overlap; an empty or inverted range acts as a step.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Particles with opacity at or below this are treated as invisible.
pub const VISIBILITY_EPSILON: f32 = 0.001;

/// Remap `progress` into the `[start, end]` window, clamped to [0, 1].
///
/// When `end <= start` the window has no width and the result is a hard step
/// at `start`: 0 up to and including `start`, 1 afterwards.
pub fn remap_progress(progress: f32, start: f32, end: f32) -> f32 {
    if end <= start {
        return if progress <= start { 0.0 } else { 1.0 };
    }
    ((progress - start) / (end - start)).clamp(0.0, 1.0)
}

/// Global dissolve progress from the camera's distance to the origin.
///
/// Progress is 0 at `start_distance` and beyond, rising to 1 at
/// `end_distance`. The divisor never drops below 1 so a misconfigured pair
/// cannot divide by zero.
pub fn progress_from_distance(camera_position: Vec3, start_distance: f32, end_distance: f32) -> f32 {
    let distance = camera_position.length();
    let raw = (start_distance - distance) / (start_distance - end_distance).max(1.0);
    raw.clamp(0.0, 1.0)
}

/// Scene zones with independent dissolve timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Model,
    Sky,
    Ocean,
    Fog,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Model, Zone::Sky, Zone::Ocean, Zone::Fog];

    pub fn name(&self) -> &'static str {
        match self {
            Zone::Model => "model",
            Zone::Sky => "sky",
            Zone::Ocean => "ocean",
            Zone::Fog => "fog",
        }
    }
}

fn default_start_distance() -> f32 {
    800.0
}

fn default_end_distance() -> f32 {
    200.0
}

fn default_world_max_points() -> usize {
    30_000
}

fn default_hotel_max_points() -> usize {
    8_000
}

fn default_point_size() -> f32 {
    0.5
}

fn default_sky_point_size() -> f32 {
    2.0
}

fn default_scatter_start() -> f32 {
    0.3
}

fn default_zone_end() -> f32 {
    1.0
}

/// Dissolve timing and particle budget settings for the whole scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DissolveSettings {
    /// Camera distance at which dissolving begins.
    #[serde(default = "default_start_distance")]
    pub start_distance: f32,

    /// Camera distance at which dissolving completes.
    #[serde(default = "default_end_distance")]
    pub end_distance: f32,

    #[serde(default = "default_world_max_points")]
    pub world_max_points: usize,

    #[serde(default = "default_point_size")]
    pub world_point_size: f32,

    #[serde(default = "default_hotel_max_points")]
    pub hotel_max_points: usize,

    #[serde(default = "default_point_size")]
    pub hotel_point_size: f32,

    #[serde(default = "default_sky_point_size")]
    pub sky_point_size: f32,

    #[serde(default = "default_point_size")]
    pub ocean_point_size: f32,

    /// Zone progress below which particles stay at their origin.
    #[serde(default = "default_scatter_start")]
    pub scatter_start: f32,

    #[serde(default)]
    pub model_start: f32,
    #[serde(default = "default_zone_end")]
    pub model_end: f32,

    #[serde(default)]
    pub sky_start: f32,
    #[serde(default = "default_zone_end")]
    pub sky_end: f32,

    #[serde(default)]
    pub ocean_start: f32,
    #[serde(default = "default_zone_end")]
    pub ocean_end: f32,

    #[serde(default)]
    pub fog_start: f32,
    #[serde(default = "default_zone_end")]
    pub fog_end: f32,
}

impl Default for DissolveSettings {
    fn default() -> Self {
        Self {
            start_distance: default_start_distance(),
            end_distance: default_end_distance(),
            world_max_points: default_world_max_points(),
            world_point_size: default_point_size(),
            hotel_max_points: default_hotel_max_points(),
            hotel_point_size: default_point_size(),
            sky_point_size: default_sky_point_size(),
            ocean_point_size: default_point_size(),
            scatter_start: default_scatter_start(),
            model_start: 0.0,
            model_end: default_zone_end(),
            sky_start: 0.0,
            sky_end: default_zone_end(),
            ocean_start: 0.0,
            ocean_end: default_zone_end(),
            fog_start: 0.0,
            fog_end: default_zone_end(),
        }
    }
}

impl DissolveSettings {
    /// The `(start, end)` window configured for a zone.
    pub fn range(&self, zone: Zone) -> (f32, f32) {
        match zone {
            Zone::Model => (self.model_start, self.model_end),
            Zone::Sky => (self.sky_start, self.sky_end),
            Zone::Ocean => (self.ocean_start, self.ocean_end),
            Zone::Fog => (self.fog_start, self.fog_end),
        }
    }

    /// Progress of one zone for the given global progress.
    pub fn zone_progress(&self, zone: Zone, global_progress: f32) -> f32 {
        let (start, end) = self.range(zone);
        remap_progress(global_progress, start, end)
    }

    pub fn resolve(&self, global_progress: f32) -> ZoneProgress {
        ZoneProgress {
            model: self.zone_progress(Zone::Model, global_progress),
            sky: self.zone_progress(Zone::Sky, global_progress),
            ocean: self.zone_progress(Zone::Ocean, global_progress),
            fog: self.zone_progress(Zone::Fog, global_progress),
        }
    }

    /// Global progress derived from the camera position.
    pub fn global_progress(&self, camera_position: Vec3) -> f32 {
        progress_from_distance(camera_position, self.start_distance, self.end_distance)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.world_max_points == 0 || self.hotel_max_points == 0 {
            return Err("Dissolve max points must be positive".to_string());
        }
        let sizes = [
            self.world_point_size,
            self.hotel_point_size,
            self.sky_point_size,
            self.ocean_point_size,
        ];
        if sizes.iter().any(|s| *s <= 0.0) {
            return Err("Dissolve point sizes must be positive".to_string());
        }
        Ok(())
    }
}

/// Progress for every zone at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZoneProgress {
    pub model: f32,
    pub sky: f32,
    pub ocean: f32,
    pub fog: f32,
}

impl ZoneProgress {
    pub fn get(&self, zone: Zone) -> f32 {
        match zone {
            Zone::Model => self.model,
            Zone::Sky => self.sky,
            Zone::Ocean => self.ocean,
            Zone::Fog => self.fog,
        }
    }

    /// Ground fog opacity fades linearly with the fog zone's progress.
    pub fn fog_opacity(&self, base_opacity: f32) -> f32 {
        base_opacity * (1.0 - self.fog)
    }

    /// Whether ground fog should be drawn at all.
    pub fn fog_visible(&self, enabled: bool, base_opacity: f32) -> bool {
        enabled && self.fog_opacity(base_opacity) > VISIBILITY_EPSILON
    }
}
