//! Single-pass grass placement over a terrain's upward-facing triangles.
//!
//! Instances are distributed proportionally to triangle area and sampled
//! uniformly inside each triangle. Without terrain they fall back to a uniform
//! disk around the configured center.

use glam::{Vec2, Vec3};

use crate::geometry::{sample_disk, Triangle, MIN_TRIANGLE_AREA};
use crate::rng::SeededRandom;
use crate::scene_graph::{EntityId, SceneGraph};

use super::types::{GrassInstance, SimpleGrassParams};

/// Upward-facing world-space triangles of every mesh under `terrain`.
///
/// A triangle is kept when the Y component of its unit normal (from winding
/// order) is at least `min_normal_y` and its area is at least
/// [`MIN_TRIANGLE_AREA`].
pub fn extract_terrain_triangles(
    scene: &SceneGraph,
    terrain: EntityId,
    min_normal_y: f32,
) -> Vec<Triangle> {
    let mut triangles = Vec::new();
    for id in scene.meshes_under(terrain) {
        let Some(mesh) = scene.mesh(id) else {
            continue;
        };
        let world = scene.world_matrix(id);
        let positions = &mesh.geometry.positions;
        for [i0, i1, i2] in mesh.geometry.triangle_indices() {
            let triangle = Triangle::new(
                world.transform_point3(positions[i0]),
                world.transform_point3(positions[i1]),
                world.transform_point3(positions[i2]),
            );
            if is_placeable(&triangle, min_normal_y) {
                triangles.push(triangle);
            }
        }
    }
    triangles
}

fn is_placeable(triangle: &Triangle, min_normal_y: f32) -> bool {
    triangle.normal().y >= min_normal_y && triangle.area >= MIN_TRIANGLE_AREA
}

/// Keep triangles whose centroid lies within `spread / 2` of `center` on XZ.
///
/// A non-positive or non-finite spread disables the filter. If nothing passes,
/// the unfiltered set is returned.
pub fn filter_by_spread(triangles: Vec<Triangle>, center: Vec2, spread: f32) -> Vec<Triangle> {
    if !(spread > 0.0 && spread.is_finite()) {
        return triangles;
    }
    let max_radius_sq = (spread * 0.5) * (spread * 0.5);
    let filtered: Vec<Triangle> = triangles
        .iter()
        .filter(|tri| {
            let c = tri.centroid();
            Vec2::new(c.x, c.z).distance_squared(center) <= max_radius_sq
        })
        .copied()
        .collect();

    log::debug!("{} of {} triangles in range", filtered.len(), triangles.len());
    if filtered.is_empty() {
        log::debug!("No triangles in range, using all");
        return triangles;
    }
    filtered
}

/// Place up to `params.count` instances over `triangles`, weighted by area.
///
/// Each triangle receives `ceil(area / total * count)` instances, in order,
/// until the count is reached. The generator is advanced in a fixed order
/// (position, rotation, scale, then color when enabled) so layouts are
/// reproducible from the seed.
pub fn place_on_triangles(triangles: &[Triangle], params: &SimpleGrassParams) -> Vec<GrassInstance> {
    let count = params.count;
    let total_area: f32 = triangles.iter().map(|t| t.area).sum();
    if count == 0 || triangles.is_empty() || total_area <= 0.0 {
        return Vec::new();
    }

    let mut rng = SeededRandom::new(params.seed);
    let mut instances = Vec::with_capacity(count);

    'triangles: for triangle in triangles {
        let share = ((triangle.area / total_area) * count as f32).ceil() as usize;
        for _ in 0..share {
            if instances.len() >= count {
                break 'triangles;
            }
            let position = triangle.sample_point(&mut rng);
            instances.push(finish_instance(position, params, &mut rng));
        }
    }

    instances
}

/// Place `params.count` instances uniformly on a disk of diameter `spread`.
pub fn place_on_disk(params: &SimpleGrassParams) -> Vec<GrassInstance> {
    let mut rng = SeededRandom::new(params.seed);
    let center = params.center_xz();
    let max_radius = params.spread * 0.5;

    (0..params.count)
        .map(|_| {
            let xz = sample_disk(&mut rng, center, max_radius);
            let position = Vec3::new(xz.x, params.ground_y, xz.y);
            finish_instance(position, params, &mut rng)
        })
        .collect()
}

fn finish_instance(position: Vec3, params: &SimpleGrassParams, rng: &mut SeededRandom) -> GrassInstance {
    let rotation_y = rng.angle();
    let scale = 0.6 + rng.next_f32() * 0.8;
    let color_offset = if params.color_variation > 0.0 {
        (rng.next_f32() - 0.5) * 2.0 * params.color_variation
    } else {
        0.0
    };
    GrassInstance {
        position,
        rotation_y,
        scale,
        color_offset,
    }
}

/// Place grass on `terrain` (or on a flat disk when there is none).
///
/// A terrain with no placeable triangles yields no instances.
pub fn place_grass(
    scene: &SceneGraph,
    terrain: Option<EntityId>,
    params: &SimpleGrassParams,
) -> Vec<GrassInstance> {
    crate::profiling::timed("grass.place", || {
        let instances = match terrain {
            Some(root) => {
                let triangles = extract_terrain_triangles(scene, root, params.min_normal_y);
                log::debug!("Extracted {} terrain triangles", triangles.len());
                if triangles.is_empty() {
                    log::warn!("No valid terrain triangles found, placing no grass");
                    return Vec::new();
                }
                let triangles = filter_by_spread(triangles, params.center_xz(), params.spread);
                place_on_triangles(&triangles, params)
            }
            None => place_on_disk(params),
        };
        log::info!("Placed {} grass instances", instances.len());
        instances
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_asset::MeshGeometry;
    use crate::scene_graph::Transform;
    use std::sync::Arc;

    fn ground(scene: &mut SceneGraph, size: f32, segments: u32) -> EntityId {
        let root = scene.create_group("terrain");
        let mesh = scene.create_mesh("ground", Arc::new(MeshGeometry::plane(size, segments)));
        scene.attach(root, mesh);
        root
    }

    #[test]
    fn test_extract_keeps_upward_faces() {
        let mut scene = SceneGraph::new();
        let root = ground(&mut scene, 10.0, 2);
        let triangles = extract_terrain_triangles(&scene, root, 0.5);
        assert_eq!(triangles.len(), 8);
        let area: f32 = triangles.iter().map(|t| t.area).sum();
        assert!((area - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_extract_uses_world_transform() {
        let mut scene = SceneGraph::new();
        let root = ground(&mut scene, 2.0, 1);
        scene.set_transform(
            root,
            Transform {
                position: Vec3::new(0.0, 3.0, 0.0),
                scale: Vec3::splat(2.0),
                ..Default::default()
            },
        );
        let triangles = extract_terrain_triangles(&scene, root, 0.5);
        let area: f32 = triangles.iter().map(|t| t.area).sum();
        assert!((area - 16.0).abs() < 1e-3);
        assert!(triangles.iter().all(|t| (t.v0.y - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_extract_drops_flipped_and_tiny() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("terrain");
        let geometry = MeshGeometry::triangle_list(vec![
            // Facing down
            Vec3::ZERO,
            Vec3::X,
            Vec3::Z,
            // Sliver
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 0.01),
            Vec3::new(0.01, 0.0, 0.0),
        ]);
        let mesh = scene.create_mesh("bad", Arc::new(geometry));
        scene.attach(root, mesh);
        assert!(extract_terrain_triangles(&scene, root, 0.5).is_empty());
    }

    #[test]
    fn test_spread_filter_falls_back() {
        let far = Triangle::new(
            Vec3::new(100.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, 101.0),
            Vec3::new(101.0, 0.0, 100.0),
        );
        let kept = filter_by_spread(vec![far], Vec2::ZERO, 10.0);
        assert_eq!(kept.len(), 1);

        let near = Triangle::new(Vec3::ZERO, Vec3::Z, Vec3::X);
        let kept = filter_by_spread(vec![far, near], Vec2::ZERO, 10.0);
        assert_eq!(kept, vec![near]);

        let kept = filter_by_spread(vec![far, near], Vec2::ZERO, 0.0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_count_is_never_exceeded() {
        let mut scene = SceneGraph::new();
        let root = ground(&mut scene, 10.0, 7);
        let params = SimpleGrassParams {
            count: 500,
            ..Default::default()
        };
        let instances = place_grass(&scene, Some(root), &params);
        assert_eq!(instances.len(), 500);
        for instance in &instances {
            assert!((0.0..std::f32::consts::TAU).contains(&instance.rotation_y));
            assert!(instance.scale >= 0.6 && instance.scale < 1.4);
            assert_eq!(instance.color_offset, 0.0);
        }
    }

    #[test]
    fn test_empty_terrain_places_nothing() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("terrain");
        assert!(place_grass(&scene, Some(root), &SimpleGrassParams::default()).is_empty());
    }

    #[test]
    fn test_disk_fallback() {
        let scene = SceneGraph::new();
        let params = SimpleGrassParams {
            count: 200,
            spread: 20.0,
            center: [5.0, 0.0, -5.0],
            ground_y: 1.5,
            ..Default::default()
        };
        let instances = place_grass(&scene, None, &params);
        assert_eq!(instances.len(), 200);
        for instance in &instances {
            assert_eq!(instance.position.y, 1.5);
            let xz = Vec2::new(instance.position.x, instance.position.z);
            assert!(xz.distance(Vec2::new(5.0, -5.0)) <= 10.0 + 1e-4);
        }
    }

    #[test]
    fn test_color_variation_is_opt_in() {
        let params = SimpleGrassParams {
            count: 50,
            color_variation: 0.2,
            ..Default::default()
        };
        let instances = place_on_disk(&params);
        assert!(instances.iter().any(|i| i.color_offset != 0.0));
        assert!(instances.iter().all(|i| i.color_offset.abs() <= 0.2));
    }
}
