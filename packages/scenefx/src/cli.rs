use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SceneConfig;
use crate::dissolve::{DissolveConfig, DissolveEngine};
use crate::grass::{place_grass, GrassInstance, GrassSystem, UpdateStats};
use crate::mesh_asset::load_obj;
use crate::progress::Zone;
use crate::scene_graph::{EntityId, SceneGraph};

/// Side length of the density preview image in pixels.
const PREVIEW_SIZE: u32 = 256;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log build timings
    #[arg(long, global = true)]
    profile: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place grass over a terrain in one pass
    Grass {
        /// Terrain OBJ file
        #[arg(long)]
        terrain: PathBuf,

        /// Scene config JSON (uses its `grass` section)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON file for the instances (stdout summary only if omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write a top-down density preview PNG
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Evaluate a dissolve over a model at one progress value
    Dissolve {
        /// Model OBJ file
        #[arg(long)]
        model: PathBuf,

        /// Dissolve progress in [0, 1]
        #[arg(long)]
        progress: f32,

        /// Progress below which points stay at their origin
        #[arg(long, default_value_t = 0.3)]
        scatter_start: f32,

        /// Point budget
        #[arg(long)]
        max_points: Option<usize>,

        /// Output JSON file for the evaluated cloud
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Walk the chunked grass system along a path of viewpoints
    Chunks {
        /// Terrain OBJ file (flat ground if omitted)
        #[arg(long)]
        terrain: Option<PathBuf>,

        /// Scene config JSON (uses `grassSystem` and `performancePreset`)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Viewpoints as `x,z`
        #[arg(long, required = true, num_args = 1.., value_parser = parse_xz)]
        path: Vec<(f32, f32)>,
    },

    /// Print per-zone dissolve progress
    Zones {
        /// Scene config JSON
        #[arg(long)]
        config: PathBuf,

        /// Global dissolve progress
        #[arg(long)]
        progress: f32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.profile {
        crate::profiling::set_profiling_enabled(true);
    }

    match cli.command {
        Commands::Grass { terrain, config, out, preview } => {
            run_grass(&terrain, config.as_deref(), out.as_deref(), preview.as_deref())
        }
        Commands::Dissolve { model, progress, scatter_start, max_points, out } => {
            run_dissolve(&model, progress, scatter_start, max_points, out.as_deref())
        }
        Commands::Chunks { terrain, config, path } => {
            run_chunks(terrain.as_deref(), config.as_deref(), &path)
        }
        Commands::Zones { config, progress } => run_zones(&config, progress),
    }
}

fn parse_xz(s: &str) -> Result<(f32, f32), String> {
    let (x, z) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,z`, got '{}'", s))?;
    let x = x.trim().parse::<f32>().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let z = z.trim().parse::<f32>().map_err(|e| format!("bad z in '{}': {}", s, e))?;
    Ok((x, z))
}

fn load_config(path: Option<&Path>) -> Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load(path).map_err(|e| anyhow!(e)),
        None => Ok(SceneConfig::default()),
    }
}

/// Load every object of an OBJ file under one group node.
fn load_scene(path: &Path) -> Result<(SceneGraph, EntityId)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read OBJ file {:?}", path))?;
    let models = load_obj(&content).map_err(|e| anyhow!("{:?}: {}", path, e))?;

    let mut scene = SceneGraph::new();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".to_string());
    let root = scene.create_group(&name);
    for model in models {
        let mesh = scene.create_mesh(&model.name, Arc::new(model.geometry));
        scene.attach(root, mesh);
    }
    Ok((scene, root))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn run_grass(terrain: &Path, config: Option<&Path>, out: Option<&Path>, preview: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let (scene, root) = load_scene(terrain)?;

    let instances = place_grass(&scene, Some(root), &config.grass);
    println!("Placed {} grass instances on {:?}", instances.len(), terrain);

    if let Some(out) = out {
        write_json(out, &instances)?;
        println!("Wrote instances to {:?}", out);
    }
    if let Some(preview) = preview {
        write_density_preview(preview, &instances)?;
        println!("Wrote density preview to {:?}", preview);
    }
    Ok(())
}

/// Render instance density seen from above as a grayscale image.
fn write_density_preview(path: &Path, instances: &[GrassInstance]) -> Result<()> {
    let mut image = image::GrayImage::new(PREVIEW_SIZE, PREVIEW_SIZE);
    if instances.is_empty() {
        image.save(path)?;
        return Ok(());
    }

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_z, mut max_z) = (f32::INFINITY, f32::NEG_INFINITY);
    for instance in instances {
        min_x = min_x.min(instance.position.x);
        max_x = max_x.max(instance.position.x);
        min_z = min_z.min(instance.position.z);
        max_z = max_z.max(instance.position.z);
    }
    let extent = (max_x - min_x).max(max_z - min_z).max(f32::EPSILON);

    let size = PREVIEW_SIZE as usize;
    let mut counts = vec![0u32; size * size];
    for instance in instances {
        let px = ((instance.position.x - min_x) / extent * (size - 1) as f32) as usize;
        let pz = ((instance.position.z - min_z) / extent * (size - 1) as f32) as usize;
        counts[pz.min(size - 1) * size + px.min(size - 1)] += 1;
    }

    let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f32;
    for (i, count) in counts.iter().enumerate() {
        let value = (*count as f32 / peak * 255.0).round() as u8;
        image.put_pixel((i % size) as u32, (i / size) as u32, image::Luma([value]));
    }
    image.save(path)?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DissolveReport {
    progress: f32,
    scatter_start: f32,
    point_count: usize,
    particle_opacity: f32,
    cloud_visible: bool,
    scatter_distance: f32,
    positions: Vec<Vec3>,
}

fn run_dissolve(
    model: &Path,
    progress: f32,
    scatter_start: f32,
    max_points: Option<usize>,
    out: Option<&Path>,
) -> Result<()> {
    let (mut scene, root) = load_scene(model)?;

    let mut config = DissolveConfig::default();
    if let Some(max_points) = max_points {
        config.max_points = max_points;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    let mut engine = DissolveEngine::attach(&scene, root, config, "cli");
    engine.update(&mut scene, progress, scatter_start);

    let report = DissolveReport {
        progress,
        scatter_start,
        point_count: engine.point_count(),
        particle_opacity: engine.particle_opacity(),
        cloud_visible: engine.is_cloud_visible(),
        scatter_distance: engine.point_cloud().map_or(0.0, |c| c.scatter_distance()),
        positions: engine
            .point_cloud()
            .map(|c| c.current_positions().to_vec())
            .unwrap_or_default(),
    };

    println!(
        "{} points, particle opacity {:.3}, cloud {}",
        report.point_count,
        report.particle_opacity,
        if report.cloud_visible { "visible" } else { "hidden" }
    );

    if let Some(out) = out {
        write_json(out, &report)?;
        println!("Wrote point cloud to {:?}", out);
    }

    engine.teardown(&mut scene);
    Ok(())
}

fn run_chunks(terrain: Option<&Path>, config: Option<&Path>, path: &[(f32, f32)]) -> Result<()> {
    let config = load_config(config)?;
    let system_config = config.effective_grass_system();

    let mut system = match terrain {
        Some(terrain) => {
            let (scene, root) = load_scene(terrain)?;
            GrassSystem::with_terrain(&scene, Some(root), system_config)
        }
        None => GrassSystem::flat(system_config),
    };

    println!("{:>10} {:>10} {:>7} {:>7} {:>7} {:>10}", "x", "z", "chunks", "regen", "reused", "instances");
    for (x, z) in path {
        let rebuilt = system.update(Vec3::new(*x, 0.0, *z));
        let UpdateStats { active_chunks, regenerated, reused, total_instances } = system.last_stats();
        if rebuilt {
            println!(
                "{:>10.2} {:>10.2} {:>7} {:>7} {:>7} {:>10}",
                x, z, active_chunks, regenerated, reused, total_instances
            );
        } else {
            println!("{:>10.2} {:>10.2} (same chunk, no rebuild)", x, z);
        }
    }
    Ok(())
}

fn run_zones(config: &Path, progress: f32) -> Result<()> {
    let config = SceneConfig::load(config).map_err(|e| anyhow!(e))?;
    let zones = config.dissolve.resolve(progress);

    println!("global: {:.3}", progress.clamp(0.0, 1.0));
    for zone in Zone::ALL {
        let (start, end) = config.dissolve.range(zone);
        println!("{:>6}: {:.3}  (window {:.2}..{:.2})", zone.name(), zones.get(zone), start, end);
    }
    match config.fog_opacity(progress) {
        Some(opacity) => println!("fog opacity: {:.3}", opacity),
        None => println!("fog hidden"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xz() {
        assert_eq!(parse_xz("1.5,-2").unwrap(), (1.5, -2.0));
        assert_eq!(parse_xz(" 3 , 4 ").unwrap(), (3.0, 4.0));
        assert!(parse_xz("3").is_err());
        assert!(parse_xz("a,b").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["scenefx", "chunks", "--path", "0,0", "15,0"]).unwrap();
        match cli.command {
            Commands::Chunks { path, terrain, .. } => {
                assert_eq!(path, vec![(0.0, 0.0), (15.0, 0.0)]);
                assert!(terrain.is_none());
            }
            _ => panic!("expected chunks"),
        }

        let cli = Cli::try_parse_from(["scenefx", "dissolve", "--model", "m.obj", "--progress", "0.5"]).unwrap();
        match cli.command {
            Commands::Dissolve { scatter_start, max_points, .. } => {
                assert!((scatter_start - 0.3).abs() < 1e-6);
                assert!(max_points.is_none());
            }
            _ => panic!("expected dissolve"),
        }
    }
}
