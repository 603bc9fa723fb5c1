//! Scene graph consumed by segmentation and the outline compositor.
//!
//! Nodes are a tagged variant (group, mesh, light) visited through
//! [`SceneVisitor`]; world transforms are accumulated during the walk.

pub mod camera;
pub mod mesh;

use glam::{Mat4, Vec3};

pub use camera::{Camera, Projection};
pub use mesh::{Geometry, Material, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
}

impl Mesh {
    pub fn new(geometry: Geometry) -> Self { Self { geometry, material: Material::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { direction: Vec3 },
}

/// Carried by the graph for the host's benefit; the matte material ignores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct Node {
    id: ObjectId,
    pub name: String,
    pub transform: Mat4,
    pub visible: bool,
    pub kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    pub fn id(&self) -> ObjectId { self.id }
    pub fn children(&self) -> &[Node] { &self.children }

    fn find(&self, id: ObjectId) -> Option<&Node> {
        if self.id == id { return Some(self); }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        if self.id == id { return Some(self); }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn find_named(&self, name: &str) -> Option<&Node> {
        if self.name == name { return Some(self); }
        self.children.iter().find_map(|c| c.find_named(name))
    }

    fn collect_ids(&self, out: &mut Vec<ObjectId>) {
        out.push(self.id);
        for c in &self.children { c.collect_ids(out); }
    }
}

/// Pre-order traversal callbacks. `world` is the accumulated node transform.
pub trait SceneVisitor {
    fn visit_group(&mut self, _node: &Node, _world: &Mat4) {}
    fn visit_mesh(&mut self, _node: &Node, _mesh: &Mesh, _world: &Mat4) {}
    fn visit_light(&mut self, _node: &Node, _light: &Light, _world: &Mat4) {}
}

#[derive(Debug, Clone)]
pub struct Scene {
    root: Node,
    next_id: u32,
}

impl Default for Scene {
    fn default() -> Self { Self::new() }
}

impl Scene {
    pub fn new() -> Self {
        let root = Node {
            id: ObjectId(0),
            name: "root".into(),
            transform: Mat4::IDENTITY,
            visible: true,
            kind: NodeKind::Group,
            children: Vec::new(),
        };
        Self { root, next_id: 1 }
    }

    pub fn root(&self) -> &Node { &self.root }
    pub fn root_id(&self) -> ObjectId { self.root.id }

    /// Attach a node under `parent`. Returns `None` when the parent does not exist.
    pub fn add(&mut self, parent: ObjectId, name: &str, kind: NodeKind, transform: Mat4) -> Option<ObjectId> {
        let id = ObjectId(self.next_id);
        let parent = self.root.find_mut(parent)?;
        parent.children.push(Node { id, name: name.to_string(), transform, visible: true, kind, children: Vec::new() });
        self.next_id += 1;
        Some(id)
    }

    pub fn add_group(&mut self, parent: ObjectId, name: &str, transform: Mat4) -> Option<ObjectId> {
        self.add(parent, name, NodeKind::Group, transform)
    }

    pub fn add_mesh(&mut self, parent: ObjectId, name: &str, mesh: Mesh, transform: Mat4) -> Option<ObjectId> {
        self.add(parent, name, NodeKind::Mesh(mesh), transform)
    }

    pub fn add_light(&mut self, parent: ObjectId, name: &str, light: Light) -> Option<ObjectId> {
        self.add(parent, name, NodeKind::Light(light), Mat4::IDENTITY)
    }

    pub fn node(&self, id: ObjectId) -> Option<&Node> { self.root.find(id) }
    pub fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> { self.root.find_mut(id) }

    /// First node called `name`, pre-order.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> { self.root.find_named(name).map(|n| n.id) }

    /// `id` and every node below it, pre-order. Empty when `id` is unknown.
    pub fn subtree_ids(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if let Some(n) = self.node(id) { n.collect_ids(&mut out); }
        out
    }

    /// Visit visible nodes pre-order; hidden nodes prune their subtree.
    pub fn walk<V: SceneVisitor>(&self, visitor: &mut V) {
        fn rec<V: SceneVisitor>(node: &Node, parent: &Mat4, v: &mut V) {
            if !node.visible { return; }
            let world = *parent * node.transform;
            match &node.kind {
                NodeKind::Group => v.visit_group(node, &world),
                NodeKind::Mesh(mesh) => v.visit_mesh(node, mesh, &world),
                NodeKind::Light(light) => v.visit_light(node, light, &world),
            }
            for c in &node.children { rec(c, &world, v); }
        }
        rec(&self.root, &Mat4::IDENTITY, visitor);
    }

    /// Mutable pass over every mesh, hidden or not, in the same order as [`Scene::walk`].
    pub fn try_for_each_mesh_mut<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(ObjectId, &str, &mut Mesh) -> Result<(), E>,
    {
        fn rec<E, F: FnMut(ObjectId, &str, &mut Mesh) -> Result<(), E>>(node: &mut Node, f: &mut F) -> Result<(), E> {
            let Node { id, name, kind, children, .. } = node;
            if let NodeKind::Mesh(mesh) = kind { f(*id, name, mesh)?; }
            for c in children.iter_mut() { rec(c, f)?; }
            Ok(())
        }
        rec(&mut self.root, &mut f)
    }

    pub fn mesh_count(&self) -> usize {
        struct Count(usize);
        impl SceneVisitor for Count {
            fn visit_mesh(&mut self, _: &Node, _: &Mesh, _: &Mat4) { self.0 += 1; }
        }
        let mut c = Count(0);
        self.walk(&mut c);
        c.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mesh::generate_cube;

    #[derive(Default)]
    struct Recorder { names: Vec<String>, mesh_origins: Vec<Vec3> }

    impl SceneVisitor for Recorder {
        fn visit_group(&mut self, node: &Node, _: &Mat4) { self.names.push(format!("g:{}", node.name)); }
        fn visit_mesh(&mut self, node: &Node, _: &Mesh, world: &Mat4) {
            self.names.push(format!("m:{}", node.name));
            self.mesh_origins.push(world.transform_point3(Vec3::ZERO));
        }
        fn visit_light(&mut self, node: &Node, _: &Light, _: &Mat4) { self.names.push(format!("l:{}", node.name)); }
    }

    #[test]
    fn walk_is_preorder_and_accumulates_transforms() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let g = scene.add_group(root, "model", Mat4::from_translation(Vec3::X)).expect("group");
        scene.add_mesh(g, "body", Mesh::new(generate_cube(1.0)), Mat4::from_translation(Vec3::Y));
        scene.add_light(root, "sun", Light { kind: LightKind::Ambient, color: [1.0; 3], intensity: 0.5 });
        let mut rec = Recorder::default();
        scene.walk(&mut rec);
        assert_eq!(rec.names, vec!["g:root", "g:model", "m:body", "l:sun"]);
        assert!((rec.mesh_origins[0] - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn hidden_nodes_prune_walk_but_not_mesh_pass() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let g = scene.add_group(root, "g", Mat4::IDENTITY).expect("group");
        scene.add_mesh(g, "a", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY);
        scene.node_mut(g).expect("node").visible = false;
        assert_eq!(scene.mesh_count(), 0);
        let mut seen = 0;
        scene.try_for_each_mesh_mut::<(), _>(|_, _, _| { seen += 1; Ok(()) }).expect("pass");
        assert_eq!(seen, 1);
    }

    #[test]
    fn subtree_ids_include_descendants() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let g = scene.add_group(root, "g", Mat4::IDENTITY).expect("group");
        let m = scene.add_mesh(g, "m", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY).expect("mesh");
        assert_eq!(scene.subtree_ids(g), vec![g, m]);
        assert!(scene.add_group(ObjectId(99), "orphan", Mat4::IDENTITY).is_none());
        assert_eq!(scene.find_by_name("m"), Some(m));
        assert_eq!(scene.find_by_name("nope"), None);
    }
}
