//! Scene configuration loaded from JSON.
//!
//! Everything a host would otherwise tweak from a debug panel lives here and
//! is passed explicitly to the engines that need it.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::dissolve::DissolveConfig;
use crate::grass::{GrassSystemConfig, PerformancePreset, SimpleGrassParams};
use crate::progress::{DissolveSettings, ZoneProgress};

const SKY_MAX_POINTS: usize = 200;
const OCEAN_MAX_POINTS: usize = 6000;

fn default_fog_enabled() -> bool {
    true
}

fn default_fog_opacity() -> f32 {
    0.5
}

/// Low-lying fog layer that fades out with the fog zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FogSettings {
    #[serde(default = "default_fog_enabled")]
    pub enabled: bool,

    /// Opacity before any dissolve.
    #[serde(default = "default_fog_opacity")]
    pub opacity: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: default_fog_enabled(),
            opacity: default_fog_opacity(),
        }
    }
}

/// Scene parts with their own dissolve effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DissolveTarget {
    World,
    Hotel,
    Sky,
    Ocean,
}

impl DissolveTarget {
    pub const ALL: [DissolveTarget; 4] = [
        DissolveTarget::World,
        DissolveTarget::Hotel,
        DissolveTarget::Sky,
        DissolveTarget::Ocean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DissolveTarget::World => "world",
            DissolveTarget::Hotel => "hotel",
            DissolveTarget::Sky => "sky",
            DissolveTarget::Ocean => "ocean",
        }
    }

    /// Progress driving this target for a resolved set of zones.
    pub fn progress(&self, zones: &ZoneProgress) -> f32 {
        match self {
            DissolveTarget::World | DissolveTarget::Hotel => zones.model,
            DissolveTarget::Sky => zones.sky,
            DissolveTarget::Ocean => zones.ocean,
        }
    }
}

/// Top-level scene configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    #[serde(default)]
    pub dissolve: DissolveSettings,

    /// Single-pass grass placement.
    #[serde(default)]
    pub grass: SimpleGrassParams,

    /// Chunked grass around the viewpoint.
    #[serde(default)]
    pub grass_system: GrassSystemConfig,

    /// Overrides the chunked system's density tiers when set.
    #[serde(default)]
    pub performance_preset: Option<PerformancePreset>,

    #[serde(default)]
    pub fog: FogSettings,
}

impl SceneConfig {
    /// Load a configuration from a JSON file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;
        Self::from_json(&content).map_err(|e| format!("{:?}: {}", path, e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: SceneConfig =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.dissolve
            .validate()
            .map_err(|e| format!("dissolve: {}", e))?;
        self.grass.validate().map_err(|e| format!("grass: {}", e))?;
        self.effective_grass_system()
            .validate()
            .map_err(|e| format!("grassSystem: {}", e))?;
        if !(0.0..=1.0).contains(&self.fog.opacity) {
            return Err(format!("fog: opacity must be in [0, 1], got {}", self.fog.opacity));
        }
        Ok(())
    }

    /// The chunked grass configuration with the performance preset applied.
    pub fn effective_grass_system(&self) -> GrassSystemConfig {
        match self.performance_preset {
            Some(preset) => self.grass_system.clone().with_preset(preset),
            None => self.grass_system.clone(),
        }
    }

    /// Dissolve parameters for one scene part.
    pub fn dissolve_config(&self, target: DissolveTarget) -> DissolveConfig {
        let settings = &self.dissolve;
        let base = DissolveConfig::default();
        match target {
            DissolveTarget::World => DissolveConfig {
                max_points: settings.world_max_points,
                point_size: settings.world_point_size,
                color: Color::from_u32(0xcfd8df),
                scatter_multiplier: 1.15,
                ..base
            },
            DissolveTarget::Hotel => DissolveConfig {
                max_points: settings.hotel_max_points,
                point_size: settings.hotel_point_size,
                color: Color::from_u32(0xd9e1e8),
                scatter_multiplier: 0.9,
                ..base
            },
            DissolveTarget::Sky => DissolveConfig {
                max_points: SKY_MAX_POINTS,
                point_size: settings.sky_point_size,
                color: Color::from_u32(0xdbe8f3),
                size_attenuation: false,
                ..base
            },
            DissolveTarget::Ocean => DissolveConfig {
                max_points: OCEAN_MAX_POINTS,
                point_size: settings.ocean_point_size,
                color: Color::from_u32(0xa4bfd4),
                ..base
            },
        }
    }

    /// Fog opacity for a global dissolve progress, or `None` when the fog is
    /// hidden.
    pub fn fog_opacity(&self, global_progress: f32) -> Option<f32> {
        let zones = self.dissolve.resolve(global_progress);
        if zones.fog_visible(self.fog.enabled, self.fog.opacity) {
            Some(zones.fog_opacity(self.fog.opacity))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config.dissolve.world_max_points, 30000);
        assert_eq!(config.grass.count, 1000);
        assert_eq!(config.grass_system.chunk_size, 10.0);
        assert!(config.performance_preset.is_none());
        assert!(config.fog.enabled);
    }

    #[test]
    fn test_parse_camel_case() {
        let json = r##"{
            "dissolve": { "scatterStart": 0.5, "skyStart": 0.2, "skyEnd": 0.6 },
            "grass": { "count": 250, "baseColor": "#ff0000" },
            "grassSystem": { "renderRadius": 20 },
            "performancePreset": "high",
            "fog": { "opacity": 0.8 }
        }"##;
        let config = SceneConfig::from_json(json).unwrap();
        assert!((config.dissolve.scatter_start - 0.5).abs() < 1e-6);
        assert!((config.dissolve.sky_end - 0.6).abs() < 1e-6);
        assert_eq!(config.grass.count, 250);
        assert!((config.grass.base_color.r - 1.0).abs() < 1e-6);
        assert_eq!(config.performance_preset, Some(PerformancePreset::High));
        assert!((config.fog.opacity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_preset_overrides_tiers() {
        let mut config = SceneConfig::default();
        assert_eq!(
            config.effective_grass_system().density_tiers,
            PerformancePreset::Low.density_tiers()
        );
        config.performance_preset = Some(PerformancePreset::Medium);
        assert_eq!(
            config.effective_grass_system().density_tiers,
            PerformancePreset::Medium.density_tiers()
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SceneConfig::from_json(r#"{"grass": {"height": 0}}"#).is_err());
        assert!(SceneConfig::from_json(r#"{"fog": {"opacity": 2}}"#).is_err());
        assert!(SceneConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_dissolve_targets() {
        let config = SceneConfig::default();
        let world = config.dissolve_config(DissolveTarget::World);
        assert_eq!(world.max_points, 30000);
        assert!((world.scatter_multiplier - 1.15).abs() < 1e-6);

        let hotel = config.dissolve_config(DissolveTarget::Hotel);
        assert_eq!(hotel.max_points, 8000);
        assert!((hotel.scatter_multiplier - 0.9).abs() < 1e-6);

        let sky = config.dissolve_config(DissolveTarget::Sky);
        assert_eq!(sky.max_points, 200);
        assert!(!sky.size_attenuation);
        assert!((sky.point_size - 2.0).abs() < 1e-6);

        for target in DissolveTarget::ALL {
            assert!(config.dissolve_config(target).validate().is_ok(), "{}", target.name());
        }
    }

    #[test]
    fn test_target_progress_follows_zone() {
        let mut config = SceneConfig::default();
        config.dissolve.sky_start = 0.5;
        config.dissolve.sky_end = 1.0;
        let zones = config.dissolve.resolve(0.75);
        assert!((DissolveTarget::World.progress(&zones) - 0.75).abs() < 1e-6);
        assert!((DissolveTarget::Sky.progress(&zones) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fog_fades_with_zone() {
        let config = SceneConfig::default();
        let start = config.fog_opacity(0.0).unwrap();
        assert!((start - 0.5).abs() < 1e-6);
        let half = config.fog_opacity(0.5).unwrap();
        assert!((half - 0.25).abs() < 1e-6);
        assert!(config.fog_opacity(1.0).is_none());

        let disabled = SceneConfig {
            fog: FogSettings { enabled: false, opacity: 0.5 },
            ..SceneConfig::default()
        };
        assert!(disabled.fog_opacity(0.0).is_none());
    }
}
