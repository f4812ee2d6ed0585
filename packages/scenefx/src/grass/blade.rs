//! Blade meshes shared by every grass instance.

use bytemuck::{Pod, Zeroable};

/// Vertex of a blade mesh. `uv.y` is the height ratio used by the sway.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BladeVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl BladeVertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BladeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv: vec2<f32>
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Indexed blade mesh in blade-local space (base at the origin, up is +Y).
#[derive(Debug, Clone, PartialEq)]
pub struct BladeMesh {
    pub vertices: Vec<BladeVertex>,
    pub indices: Vec<u16>,
}

fn vertex(x: f32, y: f32, z: f32, u: f32, v: f32) -> BladeVertex {
    BladeVertex {
        position: [x, y, z],
        uv: [u, v],
    }
}

impl BladeMesh {
    /// Two crossed triangles, each `width` wide at the base and `height` tall.
    pub fn crossed_triangles(width: f32, height: f32) -> Self {
        let half = width * 0.5;
        let vertices = vec![
            vertex(-half, 0.0, 0.0, 0.0, 0.0),
            vertex(half, 0.0, 0.0, 1.0, 0.0),
            vertex(0.0, height, 0.0, 0.5, 1.0),
            vertex(0.0, 0.0, -half, 0.0, 0.0),
            vertex(0.0, 0.0, half, 1.0, 0.0),
            vertex(0.0, height, 0.0, 0.5, 1.0),
        ];
        Self {
            vertices,
            indices: vec![0, 1, 2, 3, 4, 5],
        }
    }

    /// `cards` upright quads of `width` × `height`, rotated evenly about Y.
    ///
    /// Two cards give the usual cross; three look fuller from every angle.
    pub fn cards(width: f32, height: f32, cards: u16) -> Self {
        let cards = cards.max(1);
        let half = width * 0.5;
        let mut vertices = Vec::with_capacity(cards as usize * 4);
        let mut indices = Vec::with_capacity(cards as usize * 6);

        for card in 0..cards {
            let angle = std::f32::consts::PI * card as f32 / cards as f32;
            let (sin, cos) = angle.sin_cos();
            let (dx, dz) = (half * cos, half * sin);
            let base = card * 4;
            vertices.push(vertex(-dx, 0.0, -dz, 0.0, 0.0));
            vertices.push(vertex(dx, 0.0, dz, 1.0, 0.0));
            vertices.push(vertex(dx, height, dz, 1.0, 1.0));
            vertices.push(vertex(-dx, height, -dz, 0.0, 1.0));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossed_triangles() {
        let blade = BladeMesh::crossed_triangles(0.08, 0.3);
        assert_eq!(blade.triangle_count(), 2);
        assert_eq!(blade.vertices[1].position, [0.04, 0.0, 0.0]);
        assert_eq!(blade.vertices[5].position, [0.0, 0.3, 0.0]);
        // Base vertices have a height ratio of zero so they never sway
        assert!(blade
            .vertices
            .iter()
            .filter(|v| v.position[1] == 0.0)
            .all(|v| v.uv[1] == 0.0));
    }

    #[test]
    fn test_cards() {
        let blade = BladeMesh::cards(0.15, 0.6, 2);
        assert_eq!(blade.vertices.len(), 8);
        assert_eq!(blade.triangle_count(), 4);
        // Second card lies along Z
        let v = blade.vertices[5].position;
        assert!(v[0].abs() < 1e-6 && (v[2] - 0.075).abs() < 1e-6);
        assert_eq!(std::mem::size_of::<BladeVertex>(), 20);
    }
}
