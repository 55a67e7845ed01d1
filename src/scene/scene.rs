use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::scene::{
    Camera, Instance, InstanceId, Light, Material, MaterialId, Mesh, MeshId, ShapeId, Texture,
    TextureId,
};

bitflags! {
    /// Coarse per-scene change summary, read by the compiler to pick which
    /// serializers to re-run and cleared once a compile succeeds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SceneDirty: u32 {
        const CAMERA = 1 << 0;
        const LIGHTS = 1 << 1;
        const SHAPES = 1 << 2;
    }
}

/// Process-unique scene identity, used as the compilation cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(0);

/// Mutable object graph of camera, shapes, lights, materials and textures.
///
/// Entities live in per-kind arenas addressed by small ids; those ids are the
/// stable keys everything downstream (collector indices, instance base
/// references, light back-references) is built on. Shapes additionally have
/// an attachment list: only attached shapes are enumerated, but a mesh kept
/// in the arena without attachment can still back instances.
#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    camera: Option<Camera>,
    meshes: Vec<Mesh>,
    instances: Vec<Instance>,
    shapes: Vec<ShapeId>,
    lights: Vec<Light>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    dirty: SceneDirty,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            camera: None,
            meshes: Vec::new(),
            instances: Vec::new(),
            shapes: Vec::new(),
            lights: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            dirty: SceneDirty::empty(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
        self.dirty |= SceneDirty::CAMERA;
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Registers a mesh in the arena without attaching it as a scene shape.
    pub fn create_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = self.meshes.len() as MeshId;
        self.meshes.push(mesh);
        id
    }

    /// Registers an instance in the arena without attaching it.
    pub fn create_instance(&mut self, instance: Instance) -> InstanceId {
        debug_assert!((instance.base() as usize) < self.meshes.len(), "instance base mesh must exist");
        let id = self.instances.len() as InstanceId;
        self.instances.push(instance);
        id
    }

    /// Attaches an arena shape, making it part of the enumerated scene.
    pub fn attach_shape(&mut self, shape: ShapeId) {
        self.shapes.push(shape);
        self.dirty |= SceneDirty::SHAPES;
    }

    /// Registers and attaches a mesh.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = self.create_mesh(mesh);
        self.attach_shape(ShapeId::Mesh(id));
        id
    }

    /// Registers and attaches an instance.
    pub fn add_instance(&mut self, instance: Instance) -> InstanceId {
        let id = self.create_instance(instance);
        self.attach_shape(ShapeId::Instance(id));
        id
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.dirty |= SceneDirty::LIGHTS;
        self.lights.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = self.materials.len() as MaterialId;
        self.materials.push(material);
        id
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let id = self.textures.len() as TextureId;
        self.textures.push(texture);
        id
    }

    /// Attached shapes in attachment order.
    pub fn shapes(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.iter().copied()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    pub fn lights_mut(&mut self) -> impl Iterator<Item = &mut Light> {
        self.lights.iter_mut()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id as usize]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        &mut self.meshes[id as usize]
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id as usize]
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> &mut Instance {
        &mut self.instances[id as usize]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id as usize]
    }

    pub fn material_mut(&mut self, id: MaterialId) -> &mut Material {
        &mut self.materials[id as usize]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id as usize]
    }

    pub fn texture_mut(&mut self, id: TextureId) -> &mut Texture {
        &mut self.textures[id as usize]
    }

    /// Material assigned to a shape, `None` meaning "use the default".
    pub fn shape_material(&self, shape: ShapeId) -> Option<MaterialId> {
        match shape {
            ShapeId::Mesh(id) => self.mesh(id).material(),
            ShapeId::Instance(id) => self.instance(id).material(),
        }
    }

    pub fn shape_is_dirty(&self, shape: ShapeId) -> bool {
        match shape {
            ShapeId::Mesh(id) => self.mesh(id).is_dirty(),
            ShapeId::Instance(id) => self.instance(id).is_dirty(),
        }
    }

    pub fn dirty_flags(&self) -> SceneDirty {
        self.dirty
    }

    pub fn clear_dirty_flags(&mut self) {
        self.dirty = SceneDirty::empty();
    }
}

impl Default for Scene {
    fn default() -> Scene {
        Scene::new()
    }
}
