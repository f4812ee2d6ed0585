//! Triangle mesh geometry and OBJ loading.
//!
//! Geometry is stored the way a GPU vertex buffer would hold it: a position
//! attribute plus an optional index buffer. Without an index buffer the
//! positions are read as a flat triangle list.

use std::collections::HashMap;

use glam::Vec3;

/// Position-only mesh geometry in local space.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Optional triangle indices into `positions`.
    pub indices: Option<Vec<u32>>,
}

impl MeshGeometry {
    /// Create indexed geometry.
    pub fn indexed(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
        }
    }

    /// Create non-indexed geometry (every three positions form a triangle).
    pub fn triangle_list(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            indices: None,
        }
    }

    /// Number of entries in the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Vertex indices of each triangle.
    ///
    /// Triangles referencing out-of-range vertices are skipped.
    pub fn triangle_indices(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let vertex_count = self.positions.len();
        (0..self.triangle_count())
            .map(move |i| match &self.indices {
                Some(indices) => [
                    indices[i * 3] as usize,
                    indices[i * 3 + 1] as usize,
                    indices[i * 3 + 2] as usize,
                ],
                None => [i * 3, i * 3 + 1, i * 3 + 2],
            })
            .filter(move |tri| tri.iter().all(|&idx| idx < vertex_count))
    }

    /// Build from flat `[x, y, z, ...]` positions and optional indices, as
    /// handed over by a JavaScript host.
    pub fn from_flat(positions: &[f32], indices: Option<&[u32]>) -> Self {
        let positions: Vec<Vec3> = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();
        match indices {
            Some(indices) if !indices.is_empty() => Self::indexed(positions, indices.to_vec()),
            _ => Self::triangle_list(positions),
        }
    }

    /// Flat grid on the XZ plane centered at the origin, facing +Y.
    ///
    /// `segments` quads per side, each split into two triangles.
    pub fn plane(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let step = size / segments as f32;
        let half = size * 0.5;
        let row = segments + 1;

        let mut positions = Vec::with_capacity((row * row) as usize);
        for iz in 0..=segments {
            for ix in 0..=segments {
                positions.push(Vec3::new(
                    -half + ix as f32 * step,
                    0.0,
                    -half + iz as f32 * step,
                ));
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for iz in 0..segments {
            for ix in 0..segments {
                let a = iz * row + ix;
                let b = a + 1;
                let c = a + row;
                let d = c + 1;
                // Counter-clockwise seen from above so normals point up
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        Self::indexed(positions, indices)
    }
}

/// One named object from an OBJ file.
#[derive(Debug, Clone)]
pub struct ObjModel {
    pub name: String,
    pub geometry: MeshGeometry,
}

/// Parse Wavefront OBJ content into one geometry per object.
///
/// Faces are triangulated. Materials are ignored.
pub fn load_obj(obj_content: &str) -> Result<Vec<ObjModel>, String> {
    let mut cursor = std::io::Cursor::new(obj_content.as_bytes());

    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj_buf(&mut cursor, &load_options, |_| {
        Ok((vec![], HashMap::new()))
    })
    .map_err(|e| format!("Failed to parse OBJ: {}", e))?;

    let models: Vec<ObjModel> = models
        .into_iter()
        .filter(|model| !model.mesh.positions.is_empty())
        .map(|model| {
            let positions = model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            ObjModel {
                name: model.name,
                geometry: MeshGeometry::indexed(positions, model.mesh.indices),
            }
        })
        .collect();

    if models.is_empty() {
        return Err("OBJ file contains no vertices".to_string());
    }

    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_list_without_indices() {
        let geometry = MeshGeometry::triangle_list(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Z,
            Vec3::ONE,
            Vec3::X,
            Vec3::Z,
        ]);
        assert_eq!(geometry.triangle_count(), 2);
        let tris: Vec<_> = geometry.triangle_indices().collect();
        assert_eq!(tris, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let geometry = MeshGeometry::indexed(vec![Vec3::ZERO, Vec3::X, Vec3::Z], vec![0, 1, 2, 0, 1, 9]);
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.triangle_indices().count(), 1);
    }

    #[test]
    fn test_plane_geometry() {
        let plane = MeshGeometry::plane(10.0, 4);
        assert_eq!(plane.vertex_count(), 25);
        assert_eq!(plane.triangle_count(), 32);
        assert_eq!(plane.positions[0], Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(plane.positions[24], Vec3::new(5.0, 0.0, 5.0));
    }

    #[test]
    fn test_from_flat() {
        let geometry = MeshGeometry::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0], None);
        assert_eq!(geometry.vertex_count(), 3);
        assert!(geometry.indices.is_none());
    }

    #[test]
    fn test_obj_parsing() {
        let obj_content = r#"
            o ground
            v 0 0 0
            v 1 0 0
            v 0 0 1
            f 1 3 2
        "#;

        let models = load_obj(obj_content).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].geometry.vertex_count(), 3);
        assert_eq!(models[0].geometry.triangle_count(), 1);
    }

    #[test]
    fn test_obj_without_vertices_is_an_error() {
        assert!(load_obj("# nothing here\n").is_err());
    }
}
