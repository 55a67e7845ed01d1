use glam::{Mat4, Vec2, Vec3};

use crate::scene::MaterialId;

pub type MeshId = u32;
pub type InstanceId = u32;

/// Handle to an entry in a scene's shape arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Mesh(MeshId),
    Instance(InstanceId),
}

/// Triangle mesh owning its geometry arrays.
///
/// A mesh lives in the scene's arena independently of attachment: a mesh that
/// is referenced by an instance but never attached as a scene shape still
/// provides geometry for that instance, without being shaded or visible
/// itself.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    transform: Mat4,
    material: Option<MaterialId>,
    dirty: bool,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) -> Mesh {
        debug_assert!(indices.len() % 3 == 0, "index array must describe whole triangles");
        Mesh {
            vertices,
            normals,
            uvs,
            indices,
            transform: Mat4::IDENTITY,
            material: None,
            dirty: false,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Mesh {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Mesh {
        self.material = Some(material);
        self
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.dirty = true;
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
        self.dirty = true;
    }

    pub fn set_geometry(&mut self, vertices: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) {
        debug_assert!(indices.len() % 3 == 0, "index array must describe whole triangles");
        self.vertices = vertices;
        self.normals = normals;
        self.uvs = uvs;
        self.indices = indices;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

/// Shape referencing a base mesh with its own transform and optional material
/// override. Never owns geometry.
#[derive(Debug, Clone)]
pub struct Instance {
    base: MeshId,
    transform: Mat4,
    material: Option<MaterialId>,
    dirty: bool,
}

impl Instance {
    pub fn new(base: MeshId) -> Instance {
        Instance {
            base,
            transform: Mat4::IDENTITY,
            material: None,
            dirty: false,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Instance {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Instance {
        self.material = Some(material);
        self
    }

    pub fn base(&self) -> MeshId {
        self.base
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.dirty = true;
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
