//! Wind sway of grass blades.
//!
//! The vertex stage displaces each blade vertex by a smooth value-noise field
//! sampled at the instance's world XZ and scrolled over time. The offset grows
//! with the square of the height ratio, so the base stays planted. The CPU
//! functions here mirror the shader for previews and tests.

use glam::{Vec2, Vec3};

/// Scale from world XZ to noise space.
const NOISE_FREQUENCY: f32 = 0.1;

/// Scroll rate of the noise field relative to the sway speed.
const NOISE_SCROLL: f32 = 0.3;

/// Offset between the X and Z noise samples.
const Z_CHANNEL_OFFSET: f32 = 100.0;

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Pseudo-random value in [0, 1) for a lattice point.
pub fn hash(p: Vec2) -> f32 {
    fract((p.dot(Vec2::new(127.1, 311.7))).sin() * 43_758.547)
}

/// Smooth 2D value noise in [0, 1].
pub fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let f = f * f * (Vec2::splat(3.0) - 2.0 * f);

    let a = hash(i);
    let b = hash(i + Vec2::new(1.0, 0.0));
    let c = hash(i + Vec2::new(0.0, 1.0));
    let d = hash(i + Vec2::new(1.0, 1.0));

    let ab = a + (b - a) * f.x;
    let cd = c + (d - c) * f.x;
    ab + (cd - ab) * f.y
}

/// Displacement of a blade vertex.
///
/// `height_ratio` is 0 at the base and 1 at the tip.
pub fn sway_offset(world_xz: Vec2, time: f32, strength: f32, speed: f32, height_ratio: f32) -> Vec3 {
    let falloff = height_ratio * height_ratio;
    let p = world_xz * NOISE_FREQUENCY + Vec2::splat(time * speed * NOISE_SCROLL);
    let noise_x = value_noise(p);
    let noise_z = value_noise(p + Vec2::splat(Z_CHANNEL_OFFSET));
    Vec3::new(
        (noise_x - 0.5) * strength * falloff,
        0.0,
        (noise_z - 0.5) * strength * falloff,
    )
}

/// WGSL for instanced grass: blade vertices (locations 0, 1) plus a
/// `GpuGrassInstance` (locations 2 to 5).
pub const GRASS_SHADER_WGSL: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    time: f32,
    sway_strength: f32,
    sway_speed: f32,
    _pad: f32,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOut {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) height_ratio: f32,
};

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    var f = fract(p);
    f = f * f * (3.0 - 2.0 * f);
    let a = hash(i);
    let b = hash(i + vec2<f32>(1.0, 0.0));
    let c = hash(i + vec2<f32>(0.0, 1.0));
    let d = hash(i + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, f.x), mix(c, d, f.x), f.y);
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) instance_position: vec3<f32>,
    @location(3) rotation_y: f32,
    @location(4) instance_color: vec3<f32>,
    @location(5) scale: f32,
) -> VertexOut {
    let s = sin(rotation_y);
    let c = cos(rotation_y);
    let local = position * scale;
    let rotated = vec3<f32>(c * local.x + s * local.z, local.y, -s * local.x + c * local.z);
    var world = rotated + instance_position;

    let falloff = uv.y * uv.y;
    let p = world.xz * 0.1 + uniforms.time * uniforms.sway_speed * 0.3;
    let noise_x = value_noise(p);
    let noise_z = value_noise(p + 100.0);
    world.x += (noise_x - 0.5) * uniforms.sway_strength * falloff;
    world.z += (noise_z - 0.5) * uniforms.sway_strength * falloff;

    var out: VertexOut;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.color = instance_color;
    out.height_ratio = uv.y;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    // Darker toward the base, slightly lit at the tip
    let ao = mix(0.5, 1.0, in.height_ratio);
    let color = in.color * ao + vec3<f32>(0.05) * in.height_ratio;
    return vec4<f32>(color, 1.0);
}
"#;
