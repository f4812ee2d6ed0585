//! Scene graph holding the source geometry that effects read from.
//!
//! Nodes are either groups or meshes. Every node carries a local transform;
//! world matrices are composed by walking up the parent chain. The dissolve
//! effect reads geometry and world transforms through this graph and toggles
//! mesh visibility and material opacity, nothing else.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::mesh_asset::MeshGeometry;

/// Unique identifier for scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Local transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// Surface material state the dissolve effect may touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            transparent: false,
        }
    }
}

/// A renderable mesh: shared geometry with its own materials and visibility.
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub geometry: Arc<MeshGeometry>,
    pub materials: Vec<Material>,
    pub visible: bool,
}

impl MeshNode {
    pub fn new(geometry: Arc<MeshGeometry>) -> Self {
        Self {
            geometry,
            materials: vec![Material::default()],
            visible: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }
}

/// Arena of scene nodes indexed by [`EntityId`].
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HashMap<EntityId, SceneNode>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    fn new_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, name: &str, kind: NodeKind) -> EntityId {
        let id = self.new_id();
        self.nodes.insert(
            id,
            SceneNode {
                name: name.to_string(),
                transform: Transform::default(),
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Create a detached group node.
    pub fn create_group(&mut self, name: &str) -> EntityId {
        self.insert(name, NodeKind::Group)
    }

    /// Create a detached mesh node with a single opaque material.
    pub fn create_mesh(&mut self, name: &str, geometry: Arc<MeshGeometry>) -> EntityId {
        self.insert(name, NodeKind::Mesh(MeshNode::new(geometry)))
    }

    /// Parent `child` under `parent`, detaching it from any previous parent.
    ///
    /// Returns false if either node is missing or the link would form a cycle.
    pub fn attach(&mut self, parent: EntityId, child: EntityId) -> bool {
        if parent == child || !self.exists(parent) || !self.exists(child) {
            return false;
        }
        // Refuse to parent a node under its own descendant
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return false;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }

        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        true
    }

    /// Detach a node from its parent, keeping its subtree intact.
    pub fn detach(&mut self, id: EntityId) {
        let parent = self.nodes.get_mut(&id).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
        }
    }

    /// Destroy a node and its whole subtree.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.exists(id) {
            return false;
        }
        self.detach(id);
        for node_id in self.traverse(id) {
            self.nodes.remove(&node_id);
        }
        true
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    pub fn mesh(&self, id: EntityId) -> Option<&MeshNode> {
        self.nodes.get(&id).and_then(SceneNode::mesh)
    }

    pub fn mesh_mut(&mut self, id: EntityId) -> Option<&mut MeshNode> {
        self.nodes.get_mut(&id).and_then(SceneNode::mesh_mut)
    }

    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// World matrix of a node (parent chain composed root-first).
    pub fn world_matrix(&self, id: EntityId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = Some(id);
        while let Some(node) = cursor.and_then(|c| self.nodes.get(&c)) {
            matrix = node.transform.matrix() * matrix;
            cursor = node.parent;
        }
        matrix
    }

    /// Depth-first, pre-order list of `root` and all its descendants.
    pub fn traverse(&self, root: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                order.push(id);
                // Reverse so the first child is visited first
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// Mesh nodes under `root` (inclusive), in traversal order.
    pub fn meshes_under(&self, root: EntityId) -> Vec<EntityId> {
        self.traverse(root)
            .into_iter()
            .filter(|id| self.mesh(*id).is_some())
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Arc<MeshGeometry> {
        Arc::new(MeshGeometry::triangle_list(vec![Vec3::ZERO, Vec3::X, Vec3::Z]))
    }

    #[test]
    fn test_create_and_attach() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let mesh = scene.create_mesh("mesh", unit_triangle());

        assert!(scene.attach(root, mesh));
        assert_eq!(scene.get(mesh).unwrap().parent(), Some(root));
        assert_eq!(scene.get(root).unwrap().children(), &[mesh]);
        assert!(scene.mesh(mesh).unwrap().visible);
        assert!(scene.mesh(root).is_none());
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let a = scene.create_group("a");
        let b = scene.create_group("b");
        assert!(scene.attach(a, b));
        assert!(!scene.attach(b, a));
        assert!(!scene.attach(a, a));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let child = scene.create_group("child");
        scene.attach(root, child);

        scene.set_transform(root, Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        scene.set_transform(
            child,
            Transform {
                position: Vec3::new(0.0, 2.0, 0.0),
                scale: Vec3::splat(2.0),
                ..Default::default()
            },
        );

        let p = scene.world_matrix(child).transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(12.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_traverse_order() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let a = scene.create_group("a");
        let b = scene.create_mesh("b", unit_triangle());
        let c = scene.create_mesh("c", unit_triangle());
        scene.attach(root, a);
        scene.attach(root, c);
        scene.attach(a, b);

        assert_eq!(scene.traverse(root), vec![root, a, b, c]);
        assert_eq!(scene.meshes_under(root), vec![b, c]);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut scene = SceneGraph::new();
        let root = scene.create_group("root");
        let a = scene.create_group("a");
        let b = scene.create_mesh("b", unit_triangle());
        scene.attach(root, a);
        scene.attach(a, b);

        assert!(scene.destroy(a));
        assert!(!scene.exists(a));
        assert!(!scene.exists(b));
        assert!(scene.get(root).unwrap().children().is_empty());
        assert_eq!(scene.len(), 1);
    }
}
