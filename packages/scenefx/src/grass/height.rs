//! Terrain height samplers used to seat grass instances on the ground.
//!
//! Samplers are only queried while chunks are (re)generated, never per frame,
//! so the raycast sampler trades memory for speed with a bounded memo cache.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;

use crate::geometry::{BoundingBox, Triangle};
use crate::scene_graph::{EntityId, SceneGraph};

/// Something that can report the ground height at a world XZ position.
pub trait HeightSampler {
    fn height_at(&mut self, x: f32, z: f32) -> f32;
}

impl<F> HeightSampler for F
where
    F: FnMut(f32, f32) -> f32,
{
    fn height_at(&mut self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}

/// Constant height everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatHeightSampler {
    pub height: f32,
}

impl FlatHeightSampler {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl HeightSampler for FlatHeightSampler {
    fn height_at(&mut self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Options for [`RaycastHeightSampler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastOptions {
    /// Height the downward ray starts from. Surfaces above it are ignored.
    pub ray_origin_y: f32,
    /// Height reported when the ray hits nothing.
    pub default_height: f32,
    /// Cached samples kept before the oldest are evicted.
    pub max_cache_size: usize,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            ray_origin_y: 1000.0,
            default_height: 0.0,
            max_cache_size: 10_000,
        }
    }
}

/// Cells per side of the triangle lookup grid, at most.
const GRID_RESOLUTION: f32 = 128.0;

/// Uniform XZ grid of triangle indices.
#[derive(Debug, Default)]
struct TriangleGrid {
    origin: Vec2,
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl TriangleGrid {
    fn build(triangles: &[Triangle]) -> Self {
        let mut bounds = BoundingBox::empty();
        for t in triangles {
            bounds.expand(t.v0);
            bounds.expand(t.v1);
            bounds.expand(t.v2);
        }
        if bounds.is_empty() {
            return Self::default();
        }

        let extent = (bounds.max.x - bounds.min.x).max(bounds.max.z - bounds.min.z);
        let mut grid = Self {
            origin: Vec2::new(bounds.min.x, bounds.min.z),
            cell_size: (extent / GRID_RESOLUTION).max(1e-3),
            cells: HashMap::new(),
        };

        for (index, t) in triangles.iter().enumerate() {
            let min = Vec2::new(t.v0.x.min(t.v1.x).min(t.v2.x), t.v0.z.min(t.v1.z).min(t.v2.z));
            let max = Vec2::new(t.v0.x.max(t.v1.x).max(t.v2.x), t.v0.z.max(t.v1.z).max(t.v2.z));
            let (x0, z0) = grid.cell(min);
            let (x1, z1) = grid.cell(max);
            for cx in x0..=x1 {
                for cz in z0..=z1 {
                    grid.cells.entry((cx, cz)).or_default().push(index);
                }
            }
        }
        grid
    }

    fn cell(&self, p: Vec2) -> (i32, i32) {
        let local = (p - self.origin) / self.cell_size;
        (local.x.floor() as i32, local.y.floor() as i32)
    }

    fn candidates(&self, p: Vec2) -> &[usize] {
        if self.cells.is_empty() {
            return &[];
        }
        self.cells
            .get(&self.cell(p))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Height from a straight-down ray against terrain triangles.
///
/// The first surface the ray meets (the highest one at or below
/// `ray_origin_y`) wins. Results are memoized per 0.1-unit cell, so nearby
/// queries reuse the first sample taken in their cell.
#[derive(Debug)]
pub struct RaycastHeightSampler {
    triangles: Vec<Triangle>,
    grid: TriangleGrid,
    options: RaycastOptions,
    cache: HashMap<(i64, i64), f32>,
    order: VecDeque<(i64, i64)>,
}

impl RaycastHeightSampler {
    /// Build from every mesh under `terrain`. `None` behaves like a flat
    /// sampler at the default height.
    pub fn new(scene: &SceneGraph, terrain: Option<EntityId>, options: RaycastOptions) -> Self {
        let mut triangles = Vec::new();
        if let Some(root) = terrain {
            for id in scene.meshes_under(root) {
                let Some(mesh) = scene.mesh(id) else {
                    continue;
                };
                let world = scene.world_matrix(id);
                let positions = &mesh.geometry.positions;
                for [i0, i1, i2] in mesh.geometry.triangle_indices() {
                    triangles.push(Triangle::new(
                        world.transform_point3(positions[i0]),
                        world.transform_point3(positions[i1]),
                        world.transform_point3(positions[i2]),
                    ));
                }
            }
            if triangles.is_empty() {
                log::warn!("No meshes found in terrain, using default height");
            }
        }
        Self::from_triangles(triangles, options)
    }

    pub fn from_triangles(triangles: Vec<Triangle>, options: RaycastOptions) -> Self {
        let grid = TriangleGrid::build(&triangles);
        Self {
            triangles,
            grid,
            options,
            cache: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn options(&self) -> &RaycastOptions {
        &self.options
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.order.clear();
    }

    fn cast(&self, xz: Vec2) -> f32 {
        self.grid
            .candidates(xz)
            .iter()
            .filter_map(|&i| self.triangles[i].height_at(xz))
            .filter(|&h| h <= self.options.ray_origin_y)
            .fold(None, |best: Option<f32>, h| Some(best.map_or(h, |b| b.max(h))))
            .unwrap_or(self.options.default_height)
    }
}

fn cache_key(x: f32, z: f32) -> (i64, i64) {
    ((x * 10.0).round() as i64, (z * 10.0).round() as i64)
}

impl HeightSampler for RaycastHeightSampler {
    fn height_at(&mut self, x: f32, z: f32) -> f32 {
        if self.triangles.is_empty() {
            return self.options.default_height;
        }

        let key = cache_key(x, z);
        if let Some(&height) = self.cache.get(&key) {
            return height;
        }

        if self.options.max_cache_size > 0 {
            while self.cache.len() >= self.options.max_cache_size {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.cache.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        let height = self.cast(Vec2::new(x, z));
        if self.options.max_cache_size > 0 {
            self.cache.insert(key, height);
            self.order.push_back(key);
        }
        height
    }
}

/// Bilinear lookup into a row-major height grid covering a world rectangle.
///
/// Positions outside the rectangle report 0.
#[derive(Debug, Clone)]
pub struct HeightMapSampler {
    data: Vec<f32>,
    width: usize,
    depth: usize,
    world_width: f32,
    world_depth: f32,
    pub height_scale: f32,
    pub offset: Vec2,
}

impl HeightMapSampler {
    /// `data` holds `width * depth` samples, rows along Z.
    pub fn new(
        data: Vec<f32>,
        width: usize,
        depth: usize,
        world_width: f32,
        world_depth: f32,
    ) -> Result<Self, String> {
        if width < 2 || depth < 2 {
            return Err("Height map needs at least 2x2 samples".to_string());
        }
        if data.len() != width * depth {
            return Err(format!(
                "Height map has {} samples, expected {}",
                data.len(),
                width * depth
            ));
        }
        if world_width <= 0.0 || world_depth <= 0.0 {
            return Err("Height map world size must be positive".to_string());
        }
        Ok(Self {
            data,
            width,
            depth,
            world_width,
            world_depth,
            height_scale: 1.0,
            offset: Vec2::ZERO,
        })
    }

    pub fn with_scale(mut self, height_scale: f32) -> Self {
        self.height_scale = height_scale;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    fn at(&self, px: usize, pz: usize) -> f32 {
        self.data[pz.min(self.depth - 1) * self.width + px.min(self.width - 1)]
    }
}

impl HeightSampler for HeightMapSampler {
    fn height_at(&mut self, x: f32, z: f32) -> f32 {
        let u = (x - self.offset.x) / self.world_width + 0.5;
        let v = (z - self.offset.y) / self.world_depth + 0.5;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return 0.0;
        }

        let gx = u * (self.width - 1) as f32;
        let gz = v * (self.depth - 1) as f32;
        let px = gx.floor() as usize;
        let pz = gz.floor() as usize;
        let fx = gx - px as f32;
        let fz = gz - pz as f32;

        let h0 = self.at(px, pz) * (1.0 - fx) + self.at(px + 1, pz) * fx;
        let h1 = self.at(px, pz + 1) * (1.0 - fx) + self.at(px + 1, pz + 1) * fx;
        (h0 * (1.0 - fz) + h1 * fz) * self.height_scale
    }
}

/// How a [`CompositeHeightSampler`] combines its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    Max,
    Min,
    Average,
}

/// Several samplers combined into one, e.g. ground plus a water surface.
pub struct CompositeHeightSampler {
    samplers: Vec<Box<dyn HeightSampler>>,
    mode: CompositeMode,
}

impl CompositeHeightSampler {
    pub fn new(samplers: Vec<Box<dyn HeightSampler>>, mode: CompositeMode) -> Self {
        Self { samplers, mode }
    }
}

impl HeightSampler for CompositeHeightSampler {
    fn height_at(&mut self, x: f32, z: f32) -> f32 {
        if self.samplers.is_empty() {
            return 0.0;
        }
        let count = self.samplers.len() as f32;
        let heights = self.samplers.iter_mut().map(|s| s.height_at(x, z));
        match self.mode {
            CompositeMode::Max => heights.fold(f32::NEG_INFINITY, f32::max),
            CompositeMode::Min => heights.fold(f32::INFINITY, f32::min),
            CompositeMode::Average => heights.sum::<f32>() / count,
        }
    }
}
