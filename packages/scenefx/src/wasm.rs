use std::sync::Arc;

use glam::Vec3;
use wasm_bindgen::prelude::*;

use crate::config::SceneConfig;
use crate::dissolve::{DissolveConfig, DissolveEngine};
use crate::grass::{place_grass as place_grass_instances, to_gpu_instances, GpuGrassInstance, GrassSystem, SimpleGrassParams};
use crate::mesh_asset::MeshGeometry;
use crate::scene_graph::{EntityId, SceneGraph};

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

#[wasm_bindgen]
pub fn set_profiling_enabled(enabled: bool) {
    crate::profiling::set_profiling_enabled(enabled);
}

/// Number of floats per instance in flat instance arrays.
pub const INSTANCE_STRIDE: usize = std::mem::size_of::<GpuGrassInstance>() / std::mem::size_of::<f32>();

fn flatten_instances(instances: &[GpuGrassInstance]) -> Vec<f32> {
    bytemuck::cast_slice(instances).to_vec()
}

/// Scene with a single mesh built from flat buffers.
fn single_mesh_scene(positions: &[f32], indices: Option<Vec<u32>>) -> (SceneGraph, EntityId) {
    let geometry = MeshGeometry::from_flat(positions, indices.as_deref());
    let mut scene = SceneGraph::new();
    let root = scene.create_group("root");
    let mesh = scene.create_mesh("mesh", Arc::new(geometry));
    scene.attach(root, mesh);
    (scene, root)
}

/// A dissolve over one mesh supplied by the host.
#[wasm_bindgen]
pub struct WasmDissolve {
    scene: SceneGraph,
    engine: DissolveEngine,
}

#[wasm_bindgen]
impl WasmDissolve {
    /// Build from flat `[x, y, z, ...]` positions and optional triangle
    /// indices. `config_json` is a dissolve config; empty uses defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(positions: &[f32], indices: Option<Vec<u32>>, config_json: &str) -> Result<WasmDissolve, JsValue> {
        let config: DissolveConfig = if config_json.trim().is_empty() {
            DissolveConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse dissolve config: {}", e)))?
        };
        config.validate().map_err(|e| JsValue::from_str(&e))?;

        let (scene, root) = single_mesh_scene(positions, indices);
        let engine = DissolveEngine::attach(&scene, root, config, "wasm");
        Ok(Self { scene, engine })
    }

    /// Returns true when the point positions changed.
    pub fn update(&mut self, progress: f32, scatter_start: f32) -> bool {
        self.engine.update(&mut self.scene, progress, scatter_start)
    }

    /// Current point positions as flat `[x, y, z, ...]`.
    pub fn positions(&self) -> Vec<f32> {
        self.engine
            .point_cloud()
            .map(|cloud| cloud.current_positions().iter().flat_map(|p| p.to_array()).collect())
            .unwrap_or_default()
    }

    pub fn particle_opacity(&self) -> f32 {
        self.engine.particle_opacity()
    }

    pub fn is_cloud_visible(&self) -> bool {
        self.engine.is_cloud_visible()
    }

    pub fn point_count(&self) -> usize {
        self.engine.point_count()
    }

    /// Opacity of the source mesh material after the last update.
    pub fn mesh_opacity(&self) -> f32 {
        self.scene
            .meshes_under(self.engine.root())
            .first()
            .and_then(|id| self.scene.mesh(*id))
            .and_then(|mesh| mesh.materials.first())
            .map_or(1.0, |material| material.opacity)
    }
}

/// Place grass over a terrain given as flat buffers. An empty `positions`
/// places on a flat disk.
///
/// Returns `INSTANCE_STRIDE` floats per instance: position, rotation, color,
/// scale.
#[wasm_bindgen]
pub fn place_grass(positions: &[f32], indices: Option<Vec<u32>>, params_json: &str) -> Result<Vec<f32>, JsValue> {
    let params: SimpleGrassParams = if params_json.trim().is_empty() {
        SimpleGrassParams::default()
    } else {
        serde_json::from_str(params_json)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse grass params: {}", e)))?
    };
    params.validate().map_err(|e| JsValue::from_str(&e))?;

    let instances = if positions.is_empty() {
        place_grass_instances(&SceneGraph::new(), None, &params)
    } else {
        let (scene, root) = single_mesh_scene(positions, indices);
        place_grass_instances(&scene, Some(root), &params)
    };
    Ok(flatten_instances(&to_gpu_instances(&instances, params.base_color)))
}

/// Chunked grass following the camera.
#[wasm_bindgen]
pub struct WasmGrassSystem {
    system: GrassSystem,
}

#[wasm_bindgen]
impl WasmGrassSystem {
    /// `config_json` is a scene config; only `grassSystem` and
    /// `performancePreset` are used. Terrain buffers may be empty for flat
    /// ground.
    #[wasm_bindgen(constructor)]
    pub fn new(positions: &[f32], indices: Option<Vec<u32>>, config_json: &str) -> Result<WasmGrassSystem, JsValue> {
        let config = if config_json.trim().is_empty() {
            SceneConfig::default()
        } else {
            SceneConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e))?
        };
        let system_config = config.effective_grass_system();

        let system = if positions.is_empty() {
            GrassSystem::flat(system_config)
        } else {
            let (scene, root) = single_mesh_scene(positions, indices);
            GrassSystem::with_terrain(&scene, Some(root), system_config)
        };
        Ok(Self { system })
    }

    /// Returns true when the chunk set was rebuilt.
    pub fn update(&mut self, x: f32, z: f32) -> bool {
        self.system.update(Vec3::new(x, 0.0, z))
    }

    pub fn chunk_count(&self) -> usize {
        self.system.chunk_count()
    }

    pub fn instance_count(&self) -> usize {
        self.system.total_instance_count()
    }

    /// All active instances, `INSTANCE_STRIDE` floats each.
    pub fn instances(&self) -> Vec<f32> {
        let gpu: Vec<GpuGrassInstance> = self
            .system
            .chunk_buffers()
            .into_iter()
            .flat_map(|(_, buffer)| buffer)
            .collect();
        flatten_instances(&gpu)
    }
}
