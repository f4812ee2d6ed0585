//! Mesh dissolve: scatter the vertices of a mesh hierarchy into a particle
//! cloud driven by a progress scalar.
//!
//! A [`DissolveEngine`] is attached to one root node of a [`SceneGraph`]. On
//! build it samples a bounded number of vertex positions (in root-local space)
//! and precomputes a random scatter vector per point. Each frame the host calls
//! [`DissolveEngine::update`]; the engine moves every point between its origin
//! and scattered location, fades the particle cloud in and out, and fades and
//! hides the source meshes. Teardown restores the source.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::BoundingBox;
use crate::progress::VISIBILITY_EPSILON;
use crate::rng::{SeededRandom, DEFAULT_SCATTER_SEED};
use crate::scene_graph::{EntityId, Material, SceneGraph};

/// Smallest and largest base scatter distance, before the multiplier.
const MIN_SCATTER: f32 = 6.0;
const MAX_SCATTER: f32 = 40.0;

/// Fraction of the source radius used as the base scatter distance.
const SCATTER_RADIUS_FACTOR: f32 = 0.15;

/// How far a scatter direction is bent toward a random direction.
const DIRECTION_JITTER: f32 = 0.35;

/// Progress at which the particle cloud starts fading out.
const FADE_OUT_START: f32 = 0.9;

/// Changes smaller than this in both inputs skip the update.
const UPDATE_EPSILON: f32 = 0.001;

fn default_max_points() -> usize {
    12_000
}

fn default_point_size() -> f32 {
    0.5
}

fn default_color() -> Color {
    Color::from_u32(0xcfd8df)
}

fn default_scatter_multiplier() -> f32 {
    1.0
}

fn default_size_attenuation() -> bool {
    true
}

fn default_seed() -> u32 {
    DEFAULT_SCATTER_SEED
}

/// Parameters of one dissolve effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DissolveConfig {
    /// Upper bound on sampled points.
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    #[serde(default = "default_point_size")]
    pub point_size: f32,

    #[serde(default = "default_color")]
    pub color: Color,

    /// Scales how far points fly out.
    #[serde(default = "default_scatter_multiplier")]
    pub scatter_multiplier: f32,

    /// Whether point size shrinks with distance from the camera.
    #[serde(default = "default_size_attenuation")]
    pub size_attenuation: bool,

    /// Seed for scatter directions and magnitudes.
    #[serde(default = "default_seed")]
    pub seed: u32,
}

impl Default for DissolveConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            point_size: default_point_size(),
            color: default_color(),
            scatter_multiplier: default_scatter_multiplier(),
            size_attenuation: default_size_attenuation(),
            seed: default_seed(),
        }
    }
}

impl DissolveConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_points == 0 {
            return Err("maxPoints must be positive".to_string());
        }
        if self.point_size <= 0.0 {
            return Err("pointSize must be positive".to_string());
        }
        if self.scatter_multiplier <= 0.0 {
            return Err("scatterMultiplier must be positive".to_string());
        }
        Ok(())
    }

    /// Whether switching to `other` requires resampling the source.
    fn needs_rebuild(&self, other: &DissolveConfig) -> bool {
        self.max_points != other.max_points
            || self.scatter_multiplier != other.scatter_multiplier
            || self.seed != other.seed
    }
}

/// GPU vertex data for one dissolve particle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuPoint {
    /// Root-local position.
    pub position: [f32; 3],
    /// Point size in world units (or pixels without attenuation).
    pub size: f32,
    /// RGBA color, alpha carries the cloud opacity.
    pub color: [f32; 4],
}

impl GpuPoint {
    /// Vertex buffer layout for drawing the cloud as a point list.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuPoint>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // size: f32
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                // color: vec4<f32>
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Sampled points with their scatter vectors and the current positions.
///
/// All three position arrays always have the same length.
#[derive(Debug, Clone)]
pub struct PointCloud {
    origin_positions: Vec<Vec3>,
    scatter_vectors: Vec<Vec3>,
    current_positions: Vec<Vec3>,
    center: Vec3,
    scatter_distance: f32,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.origin_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origin_positions.is_empty()
    }

    pub fn origin_positions(&self) -> &[Vec3] {
        &self.origin_positions
    }

    pub fn scatter_vectors(&self) -> &[Vec3] {
        &self.scatter_vectors
    }

    pub fn current_positions(&self) -> &[Vec3] {
        &self.current_positions
    }

    /// Center of the sampled points' bounding box.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Scatter distance after the multiplier.
    pub fn scatter_distance(&self) -> f32 {
        self.scatter_distance
    }

    fn apply(&mut self, t: f32) {
        for ((current, origin), scatter) in self
            .current_positions
            .iter_mut()
            .zip(&self.origin_positions)
            .zip(&self.scatter_vectors)
        {
            *current = *origin + *scatter * t;
        }
    }
}

/// Interpolation parameter before easing: how far into the scatter phase
/// `progress` is. Always 0 once `scatter_start` reaches 1.
pub fn scatter_t(progress: f32, scatter_start: f32) -> f32 {
    if scatter_start >= 1.0 {
        return 0.0;
    }
    ((progress - scatter_start) / (1.0 - scatter_start)).clamp(0.0, 1.0)
}

/// Opacity of the particle cloud at `progress`.
///
/// Rises quickly (full at ~0.87), then fades to zero over the last tenth.
pub fn particle_opacity(progress: f32) -> f32 {
    let fade_out = 1.0 - ((progress - FADE_OUT_START) / (1.0 - FADE_OUT_START)).clamp(0.0, 1.0);
    (progress * 1.15).min(1.0) * fade_out
}

/// Factor applied to every source material's opacity at `progress`.
pub fn mesh_fade(progress: f32) -> f32 {
    1.0 - (progress * 1.1).min(1.0)
}

/// Sample vertex positions of every mesh under `root`, in root-local space.
///
/// Every `stride`-th vertex of each mesh is taken, with the stride chosen so the
/// total stays near `max_points`; the result is capped at `max_points`.
pub fn sample_points(scene: &SceneGraph, root: EntityId, max_points: usize) -> Vec<Vec3> {
    let meshes = scene.meshes_under(root);
    let total_vertices: usize = meshes
        .iter()
        .filter_map(|id| scene.mesh(*id))
        .map(|mesh| mesh.geometry.vertex_count())
        .sum();

    let max_points = max_points.max(1);
    if total_vertices == 0 {
        return Vec::new();
    }

    let stride = total_vertices.div_ceil(max_points).max(1);
    let root_inverse = scene.world_matrix(root).inverse();

    let mut points = Vec::with_capacity(total_vertices / stride + meshes.len());
    for id in meshes {
        let Some(mesh) = scene.mesh(id) else {
            continue;
        };
        let to_root = root_inverse * scene.world_matrix(id);
        for position in mesh.geometry.positions.iter().step_by(stride) {
            if points.len() >= max_points {
                return points;
            }
            points.push(to_root.transform_point3(*position));
        }
    }
    points
}

/// Precompute scatter vectors for `points`.
///
/// Each vector points away from the cloud center, bent toward a random
/// direction, with a random magnitude in `[0.5, 1.3)` times the scatter
/// distance. Returns the vectors, the center and the scatter distance.
pub fn scatter_vectors(
    points: &[Vec3],
    scatter_multiplier: f32,
    rng: &mut SeededRandom,
) -> (Vec<Vec3>, Vec3, f32) {
    let bounds = BoundingBox::from_points(points);
    let center = bounds.center();
    let base = (bounds.radius() * SCATTER_RADIUS_FACTOR).clamp(MIN_SCATTER, MAX_SCATTER);
    let scatter_distance = base * scatter_multiplier;

    let vectors = points
        .iter()
        .map(|point| {
            let offset = *point - center;
            let direction = if offset.length_squared() < 1e-6 {
                rng.unit_vector()
            } else {
                offset.normalize()
            };
            let jitter = rng.unit_vector();
            let direction = direction.lerp(jitter, DIRECTION_JITTER).normalize_or_zero();
            // Opposite unit vectors can cancel exactly
            let direction = if direction == Vec3::ZERO { jitter } else { direction };
            let magnitude = scatter_distance * (0.5 + rng.next_f32() * 0.8);
            direction * magnitude
        })
        .collect();

    (vectors, center, scatter_distance)
}

/// Source state captured at build time and restored on teardown.
#[derive(Debug, Clone)]
struct SavedMesh {
    id: EntityId,
    visible: bool,
    materials: Vec<Material>,
}

/// Scroll-driven dissolve of one scene subtree.
#[derive(Debug)]
pub struct DissolveEngine {
    root: EntityId,
    config: DissolveConfig,
    rebuild_key: String,
    cloud: Option<PointCloud>,
    saved: Vec<SavedMesh>,
    last_progress: f32,
    last_scatter_start: f32,
    particle_opacity: f32,
    cloud_visible: bool,
    buffer_writes: u64,
}

impl DissolveEngine {
    /// Attach to `root` and build the point cloud.
    pub fn attach(scene: &SceneGraph, root: EntityId, config: DissolveConfig, rebuild_key: &str) -> Self {
        let mut engine = Self {
            root,
            config,
            rebuild_key: rebuild_key.to_string(),
            cloud: None,
            saved: Vec::new(),
            last_progress: -1.0,
            last_scatter_start: -1.0,
            particle_opacity: 0.0,
            cloud_visible: false,
            buffer_writes: 0,
        };
        engine.build(scene);
        engine
    }

    fn build(&mut self, scene: &SceneGraph) {
        self.saved = scene
            .meshes_under(self.root)
            .into_iter()
            .filter_map(|id| {
                scene.mesh(id).map(|mesh| SavedMesh {
                    id,
                    visible: mesh.visible,
                    materials: mesh.materials.clone(),
                })
            })
            .collect();

        let points = crate::profiling::timed("dissolve.sample", || {
            sample_points(scene, self.root, self.config.max_points)
        });

        self.cloud = if points.is_empty() {
            log::warn!(
                "Dissolve source '{}' has no vertices, no particles will be drawn",
                self.rebuild_key
            );
            None
        } else {
            let mut rng = SeededRandom::new(self.config.seed);
            let (scatter, center, scatter_distance) =
                scatter_vectors(&points, self.config.scatter_multiplier, &mut rng);
            log::info!(
                "Dissolve '{}': {} points from {} meshes, scatter distance {:.2}",
                self.rebuild_key,
                points.len(),
                self.saved.len(),
                scatter_distance
            );
            Some(PointCloud {
                current_positions: points.clone(),
                origin_positions: points,
                scatter_vectors: scatter,
                center,
                scatter_distance,
            })
        };

        self.last_progress = -1.0;
        self.last_scatter_start = -1.0;
        self.particle_opacity = 0.0;
        self.cloud_visible = false;
    }

    /// Apply new parameters, rebuilding when the key, point budget, seed or
    /// scatter multiplier changed. Returns whether a rebuild happened.
    ///
    /// Point size and color changes only affect the emitted GPU points.
    pub fn reconfigure(
        &mut self,
        scene: &mut SceneGraph,
        config: DissolveConfig,
        rebuild_key: &str,
    ) -> bool {
        let rebuild = rebuild_key != self.rebuild_key || self.config.needs_rebuild(&config);
        self.config = config;
        if !rebuild {
            return false;
        }
        log::debug!("Dissolve '{}' -> '{}': rebuilding", self.rebuild_key, rebuild_key);
        self.restore_source(scene);
        self.rebuild_key = rebuild_key.to_string();
        self.build(scene);
        true
    }

    /// Advance the effect. Returns false when the inputs did not change enough
    /// to do anything.
    pub fn update(&mut self, scene: &mut SceneGraph, progress: f32, scatter_start: f32) -> bool {
        let progress = progress.clamp(0.0, 1.0);
        let scatter_start = scatter_start.clamp(0.0, 1.0);
        if (progress - self.last_progress).abs() < UPDATE_EPSILON
            && (scatter_start - self.last_scatter_start).abs() < UPDATE_EPSILON
        {
            return false;
        }
        self.last_progress = progress;
        self.last_scatter_start = scatter_start;

        let opacity = particle_opacity(progress);

        if let Some(cloud) = self.cloud.as_mut() {
            let t = scatter_t(progress, scatter_start);
            cloud.apply(t * t);
            self.buffer_writes += 1;
        }

        self.particle_opacity = opacity;
        self.cloud_visible = self.cloud.is_some() && opacity > VISIBILITY_EPSILON;

        let dissolving = progress > VISIBILITY_EPSILON;
        let fade = mesh_fade(progress);
        for saved in &self.saved {
            let Some(mesh) = scene.mesh_mut(saved.id) else {
                continue;
            };
            mesh.visible = if dissolving { false } else { saved.visible };
            for (material, base) in mesh.materials.iter_mut().zip(&saved.materials) {
                material.opacity = base.opacity * fade;
                material.transparent = if dissolving { true } else { base.transparent };
            }
        }

        true
    }

    fn restore_source(&self, scene: &mut SceneGraph) {
        for saved in &self.saved {
            if let Some(mesh) = scene.mesh_mut(saved.id) {
                mesh.visible = saved.visible;
                for (material, base) in mesh.materials.iter_mut().zip(&saved.materials) {
                    *material = *base;
                }
            }
        }
    }

    /// Restore source visibility and materials and drop the point cloud.
    pub fn teardown(self, scene: &mut SceneGraph) {
        self.restore_source(scene);
        log::debug!("Dissolve '{}' torn down", self.rebuild_key);
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn config(&self) -> &DissolveConfig {
        &self.config
    }

    pub fn rebuild_key(&self) -> &str {
        &self.rebuild_key
    }

    pub fn point_cloud(&self) -> Option<&PointCloud> {
        self.cloud.as_ref()
    }

    pub fn point_count(&self) -> usize {
        self.cloud.as_ref().map_or(0, PointCloud::len)
    }

    pub fn particle_opacity(&self) -> f32 {
        self.particle_opacity
    }

    /// Whether the particle cloud should be drawn this frame.
    pub fn is_cloud_visible(&self) -> bool {
        self.cloud_visible
    }

    /// Number of times the position buffer has been rewritten.
    pub fn buffer_write_count(&self) -> u64 {
        self.buffer_writes
    }

    /// Current cloud as GPU vertex data.
    pub fn gpu_points(&self) -> Vec<GpuPoint> {
        let Some(cloud) = &self.cloud else {
            return Vec::new();
        };
        let [r, g, b] = self.config.color.to_array();
        let color = [r, g, b, self.particle_opacity];
        cloud
            .current_positions
            .iter()
            .map(|p| GpuPoint {
                position: p.to_array(),
                size: self.config.point_size,
                color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_asset::MeshGeometry;
    use crate::scene_graph::Transform;
    use std::sync::Arc;

    fn cube_scene() -> (SceneGraph, EntityId, EntityId) {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let mut positions = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    positions.push(Vec3::new(x, y, z));
                }
            }
        }
        let mesh = scene.create_mesh("cube", Arc::new(MeshGeometry::triangle_list(positions)));
        scene.attach(root, mesh);
        (scene, root, mesh)
    }

    #[test]
    fn test_scatter_t() {
        assert_eq!(scatter_t(0.3, 0.3), 0.0);
        assert!((scatter_t(0.65, 0.3) - 0.5).abs() < 1e-6);
        assert_eq!(scatter_t(1.0, 0.3), 1.0);
        assert_eq!(scatter_t(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_particle_opacity_curve() {
        assert_eq!(particle_opacity(0.0), 0.0);
        assert!((particle_opacity(0.3) - 0.345).abs() < 1e-6);
        assert!((particle_opacity(0.9) - 1.0).abs() < 1e-6);
        assert!((particle_opacity(0.95) - 0.5).abs() < 1e-5);
        assert!(particle_opacity(1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mesh_fade() {
        assert_eq!(mesh_fade(0.0), 1.0);
        assert!((mesh_fade(0.5) - 0.45).abs() < 1e-6);
        assert_eq!(mesh_fade(1.0), 0.0);
    }

    #[test]
    fn test_sample_points_respects_budget() {
        let (scene, root, _) = cube_scene();
        assert_eq!(sample_points(&scene, root, 100).len(), 8);
        // stride = ceil(8 / 3) = 3 -> vertices 0, 3, 6
        assert_eq!(sample_points(&scene, root, 3).len(), 3);
        assert_eq!(sample_points(&scene, root, 1).len(), 1);
    }

    #[test]
    fn test_sample_points_in_root_space() {
        let (mut scene, root, mesh) = cube_scene();
        scene.set_transform(root, Transform::from_position(Vec3::new(100.0, 0.0, 0.0)));
        scene.set_transform(mesh, Transform::from_position(Vec3::new(0.0, 5.0, 0.0)));

        let points = sample_points(&scene, root, 100);
        // Root translation cancels out, the mesh offset remains
        assert!((points[0] - Vec3::new(-1.0, 4.0, -1.0)).length() < 1e-4);
    }

    #[test]
    fn test_scatter_vectors_magnitude() {
        let points = vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO];
        let mut rng = SeededRandom::new(1);
        let (vectors, center, distance) = scatter_vectors(&points, 2.0, &mut rng);
        assert_eq!(center, Vec3::ZERO);
        // Tiny source clamps to the minimum base distance
        assert!((distance - 12.0).abs() < 1e-5);
        for v in &vectors {
            let len = v.length();
            assert!(len >= distance * 0.5 - 1e-4 && len < distance * 1.3 + 1e-4);
        }
        // Point on +X keeps a positive X component after jitter
        assert!(vectors[1].x > 0.0);
    }

    #[test]
    fn test_update_fades_source() {
        let (mut scene, root, mesh) = cube_scene();
        let mut engine = DissolveEngine::attach(&scene, root, DissolveConfig::default(), "cube");

        assert!(engine.update(&mut scene, 0.5, 0.0));
        let node = scene.mesh(mesh).unwrap();
        assert!(!node.visible);
        assert!(node.materials[0].transparent);
        assert!((node.materials[0].opacity - 0.45).abs() < 1e-6);
        assert!(engine.is_cloud_visible());

        assert!(engine.update(&mut scene, 0.0, 0.0));
        let node = scene.mesh(mesh).unwrap();
        assert!(node.visible);
        assert!(!node.materials[0].transparent);
        assert_eq!(node.materials[0].opacity, 1.0);
        assert!(!engine.is_cloud_visible());
    }

    #[test]
    fn test_update_is_noop_for_tiny_changes() {
        let (mut scene, root, _) = cube_scene();
        let mut engine = DissolveEngine::attach(&scene, root, DissolveConfig::default(), "cube");
        assert!(engine.update(&mut scene, 0.4, 0.1));
        assert!(!engine.update(&mut scene, 0.4005, 0.1));
        assert_eq!(engine.buffer_write_count(), 1);
        assert!(engine.update(&mut scene, 0.4, 0.2));
        assert_eq!(engine.buffer_write_count(), 2);
    }

    #[test]
    fn test_reconfigure_triggers() {
        let (mut scene, root, _) = cube_scene();
        let mut engine = DissolveEngine::attach(&scene, root, DissolveConfig::default(), "a");
        engine.update(&mut scene, 0.5, 0.0);

        let restyled = DissolveConfig {
            point_size: 2.0,
            ..Default::default()
        };
        assert!(!engine.reconfigure(&mut scene, restyled.clone(), "a"));
        assert!(engine.reconfigure(&mut scene, restyled.clone(), "b"));

        let wider = DissolveConfig {
            scatter_multiplier: 1.5,
            ..restyled
        };
        assert!(engine.reconfigure(&mut scene, wider, "b"));
        // Rebuild resets the no-op guard
        assert!(engine.update(&mut scene, 0.5, 0.0));
    }

    #[test]
    fn test_empty_source_builds_no_cloud() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("empty");
        let mut engine = DissolveEngine::attach(&scene, root, DissolveConfig::default(), "empty");
        assert!(engine.point_cloud().is_none());
        assert!(engine.update(&mut scene, 0.5, 0.0));
        assert!(!engine.is_cloud_visible());
        assert!(engine.gpu_points().is_empty());
        assert_eq!(engine.buffer_write_count(), 0);
    }

    #[test]
    fn test_gpu_points_carry_style() {
        let (mut scene, root, _) = cube_scene();
        let config = DissolveConfig {
            point_size: 0.75,
            ..Default::default()
        };
        let mut engine = DissolveEngine::attach(&scene, root, config, "cube");
        engine.update(&mut scene, 0.3, 0.3);
        let points = engine.gpu_points();
        assert_eq!(points.len(), 8);
        assert_eq!(points[0].size, 0.75);
        assert!((points[0].color[3] - 0.345).abs() < 1e-6);
        assert_eq!(std::mem::size_of::<GpuPoint>(), 32);
    }
}
