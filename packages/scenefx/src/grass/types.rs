//! Grass data types: instances, density tiers, presets and configuration.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// One placed grass blade (or clump).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrassInstance {
    /// World-space base position.
    pub position: Vec3,
    /// Rotation about +Y in radians, in [0, 2π).
    pub rotation_y: f32,
    /// Uniform scale.
    pub scale: f32,
    /// HSL lightness perturbation applied to the base color.
    pub color_offset: f32,
}

impl GrassInstance {
    /// Instance transform: translate, rotate about Y, uniform scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            self.position,
        )
    }

    /// Instance color for a given base color.
    pub fn color(&self, base: Color) -> Color {
        if self.color_offset == 0.0 {
            return base;
        }
        base.offset_lightness(self.color_offset)
    }

    pub fn to_gpu(&self, base: Color) -> GpuGrassInstance {
        GpuGrassInstance {
            position: self.position.to_array(),
            rotation_y: self.rotation_y,
            color: self.color(base).to_array(),
            scale: self.scale,
        }
    }
}

/// GPU instance data for a grass blade.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuGrassInstance {
    /// World position of the blade base.
    pub position: [f32; 3],
    /// Rotation about +Y in radians.
    pub rotation_y: f32,
    /// Per-instance RGB color.
    pub color: [f32; 3],
    /// Uniform scale.
    pub scale: f32,
}

impl GpuGrassInstance {
    /// Returns the vertex buffer layout for instanced rendering.
    /// Bound as the second vertex buffer with step_mode::Instance.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuGrassInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // position: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2, // After blade vertex attributes (0, 1)
                    format: wgpu::VertexFormat::Float32x3,
                },
                // rotation_y: f32
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32,
                },
                // color: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // scale: f32
                wgpu::VertexAttribute {
                    offset: 28,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Flatten instances into GPU data.
pub fn to_gpu_instances(instances: &[GrassInstance], base: Color) -> Vec<GpuGrassInstance> {
    instances.iter().map(|i| i.to_gpu(base)).collect()
}

/// Instance density for chunks up to a given distance from the viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityTier {
    /// Largest chunk-center distance this tier applies to.
    pub max_distance: f32,
    /// Instances generated per chunk.
    pub clumps_per_chunk: usize,
}

impl DensityTier {
    pub const fn new(max_distance: f32, clumps_per_chunk: usize) -> Self {
        Self {
            max_distance,
            clumps_per_chunk,
        }
    }
}

/// Device performance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformancePreset {
    Low,
    Medium,
    High,
}

const LOW_TIERS: [DensityTier; 3] = [
    DensityTier::new(10.0, 50),
    DensityTier::new(15.0, 25),
    DensityTier::new(20.0, 10),
];

const MEDIUM_TIERS: [DensityTier; 3] = [
    DensityTier::new(10.0, 100),
    DensityTier::new(15.0, 50),
    DensityTier::new(20.0, 25),
];

const HIGH_TIERS: [DensityTier; 3] = [
    DensityTier::new(15.0, 200),
    DensityTier::new(25.0, 100),
    DensityTier::new(30.0, 50),
];

impl PerformancePreset {
    pub fn density_tiers(&self) -> Vec<DensityTier> {
        match self {
            PerformancePreset::Low => LOW_TIERS.to_vec(),
            PerformancePreset::Medium => MEDIUM_TIERS.to_vec(),
            PerformancePreset::High => HIGH_TIERS.to_vec(),
        }
    }
}

impl std::str::FromStr for PerformancePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(PerformancePreset::Low),
            "medium" => Ok(PerformancePreset::Medium),
            "high" => Ok(PerformancePreset::High),
            other => Err(format!("Unknown performance preset '{}'", other)),
        }
    }
}

/// Smallest chunk side the chunked system will work with.
pub const MIN_CHUNK_SIZE: f32 = 0.1;

fn default_render_radius() -> f32 {
    15.0
}

fn default_chunk_size() -> f32 {
    10.0
}

fn default_density_tiers() -> Vec<DensityTier> {
    PerformancePreset::Low.density_tiers()
}

fn default_base_scale() -> f32 {
    0.5
}

fn default_scale_variation() -> f32 {
    0.3
}

fn default_system_color() -> Color {
    Color::from_u32(0x4a7c23)
}

fn default_color_variation() -> f32 {
    0.15
}

fn default_system_sway_strength() -> f32 {
    0.1
}

fn default_system_sway_speed() -> f32 {
    1.0
}

/// Configuration of the chunked grass system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrassSystemConfig {
    /// Radius around the viewpoint that gets grass.
    #[serde(default = "default_render_radius")]
    pub render_radius: f32,

    /// Side length of a square chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f32,

    /// Tiers ordered by increasing distance.
    #[serde(default = "default_density_tiers")]
    pub density_tiers: Vec<DensityTier>,

    #[serde(default = "default_base_scale")]
    pub base_scale: f32,

    /// Relative scale spread, 0 to 1.
    #[serde(default = "default_scale_variation")]
    pub scale_variation: f32,

    #[serde(default = "default_system_color")]
    pub base_color: Color,

    /// Lightness spread around the base color.
    #[serde(default = "default_color_variation")]
    pub color_variation: f32,

    #[serde(default = "default_system_sway_strength")]
    pub sway_strength: f32,

    #[serde(default = "default_system_sway_speed")]
    pub sway_speed: f32,

    /// Log chunk counts on every update.
    #[serde(default)]
    pub debug: bool,
}

impl Default for GrassSystemConfig {
    fn default() -> Self {
        Self {
            render_radius: default_render_radius(),
            chunk_size: default_chunk_size(),
            density_tiers: default_density_tiers(),
            base_scale: default_base_scale(),
            scale_variation: default_scale_variation(),
            base_color: default_system_color(),
            color_variation: default_color_variation(),
            sway_strength: default_system_sway_strength(),
            sway_speed: default_system_sway_speed(),
            debug: false,
        }
    }
}

impl GrassSystemConfig {
    /// Replace the density tiers with a preset's.
    pub fn with_preset(mut self, preset: PerformancePreset) -> Self {
        self.density_tiers = preset.density_tiers();
        self
    }

    /// Clamp grid parameters into a usable range: a chunk size below
    /// [`MIN_CHUNK_SIZE`] (or non-finite) becomes [`MIN_CHUNK_SIZE`], and a
    /// negative or non-finite render radius becomes 0.
    pub fn sanitized(mut self) -> Self {
        if !self.chunk_size.is_finite() || self.chunk_size < MIN_CHUNK_SIZE {
            log::warn!("chunkSize {} out of range, using {}", self.chunk_size, MIN_CHUNK_SIZE);
            self.chunk_size = MIN_CHUNK_SIZE;
        }
        if !self.render_radius.is_finite() || self.render_radius < 0.0 {
            log::warn!("renderRadius {} out of range, using 0", self.render_radius);
            self.render_radius = 0.0;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size <= 0.0 || !self.chunk_size.is_finite() {
            return Err("chunkSize must be a positive number".to_string());
        }
        if self.render_radius < 0.0 || !self.render_radius.is_finite() {
            return Err("renderRadius must be a non-negative number".to_string());
        }
        if self.density_tiers.is_empty() {
            return Err("densityTiers must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_count() -> usize {
    1000
}

fn default_spread() -> f32 {
    50.0
}

fn default_height() -> f32 {
    0.3
}

fn default_width() -> f32 {
    0.08
}

fn default_simple_color() -> Color {
    Color::from_u32(0x3d6b1e)
}

fn default_simple_sway_strength() -> f32 {
    0.15
}

fn default_simple_sway_speed() -> f32 {
    1.2
}

fn default_min_normal_y() -> f32 {
    0.5
}

fn default_seed() -> u32 {
    crate::rng::DEFAULT_GRASS_SEED
}

/// Parameters of the single-pass grass placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleGrassParams {
    /// Target instance count.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Diameter of the placement area around `center`. Zero disables the
    /// terrain filter.
    #[serde(default = "default_spread")]
    pub spread: f32,

    /// Blade height.
    #[serde(default = "default_height")]
    pub height: f32,

    /// Blade width.
    #[serde(default = "default_width")]
    pub width: f32,

    #[serde(default = "default_simple_color")]
    pub base_color: Color,

    #[serde(default = "default_simple_sway_strength")]
    pub sway_strength: f32,

    #[serde(default = "default_simple_sway_speed")]
    pub sway_speed: f32,

    /// Placement center; only X and Z are used for filtering.
    #[serde(default)]
    pub center: [f32; 3],

    /// Ground height when there is no terrain.
    #[serde(default)]
    pub ground_y: f32,

    /// Triangles whose unit normal has a smaller Y are skipped.
    #[serde(default = "default_min_normal_y")]
    pub min_normal_y: f32,

    /// Lightness spread; zero keeps every blade at the base color.
    #[serde(default)]
    pub color_variation: f32,

    #[serde(default = "default_seed")]
    pub seed: u32,
}

impl Default for SimpleGrassParams {
    fn default() -> Self {
        Self {
            count: default_count(),
            spread: default_spread(),
            height: default_height(),
            width: default_width(),
            base_color: default_simple_color(),
            sway_strength: default_simple_sway_strength(),
            sway_speed: default_simple_sway_speed(),
            center: [0.0; 3],
            ground_y: 0.0,
            min_normal_y: default_min_normal_y(),
            color_variation: 0.0,
            seed: default_seed(),
        }
    }
}

impl SimpleGrassParams {
    pub fn center_xz(&self) -> Vec2 {
        Vec2::new(self.center[0], self.center[2])
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.height <= 0.0 || self.width <= 0.0 {
            return Err("Grass blade height and width must be positive".to_string());
        }
        if self.spread < 0.0 {
            return Err("spread must not be negative".to_string());
        }
        Ok(())
    }
}
