use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};

use crate::collector::Bundle;
use crate::compile::MaterialRef;
use crate::compute::{BufferUsage, ComputeBackend, ComputeError};
use crate::intersect::ShapeHandle;
use crate::scene::TextureId;

/// Sentinel for "no material / no texture / no environment light".
pub const NO_INDEX: i32 = -1;

/// Camera model selector for the device integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraType {
    #[default]
    Default,
    Physical,
}

/// Discriminants stored in [`GpuLight::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LightType {
    Point = 0,
    Directional = 1,
    Spot = 2,
    Area = 3,
    ImageBased = 4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuCamera {
    pub forward: Vec4,
    pub up: Vec4,
    pub right: Vec4,
    pub position: Vec4,
    pub sensor_size: Vec2,
    pub depth_range: Vec2,
    pub aperture: f32,
    pub focal_length: f32,
    pub focus_distance: f32,
    pub aspect_ratio: f32,
}

/// Per-shape descriptor: where the shape's geometry and material-id run live
/// in the linear buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuShape {
    pub prim_count: i32,
    pub vertex_start: i32,
    pub index_start: i32,
    pub material_start: i32,
    pub transform: Mat4,
    /// Reserved for motion blur, always zero.
    pub linear_velocity: Vec4,
    /// Reserved for motion blur, always the identity rotation.
    pub angular_velocity: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub albedo: Vec4,
    pub ior: f32,
    pub roughness: f32,
    pub fresnel: f32,
    pub kind: i32,
    pub albedo_map: i32,
    pub normal_map: i32,
    pub roughness_map: i32,
    pub bump_flag: i32,
    pub base_material: i32,
    pub top_material: i32,
    pub _pad: [i32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: Vec4,
    pub direction: Vec4,
    pub radiance: Vec4,
    pub kind: i32,
    pub shape_index: i32,
    pub prim_index: i32,
    pub texture: i32,
    pub texture_diffuse: i32,
    pub multiplier: f32,
    /// Inner and outer cone angle cosines, spot lights only.
    pub cone: Vec2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTexture {
    pub width: i32,
    pub height: i32,
    pub format: i32,
    pub data_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuVolume {
    pub kind: i32,
    pub phase: i32,
    pub _pad: [i32; 2],
    pub absorption: Vec4,
    pub scattering: Vec4,
    pub emission: Vec4,
}

/// Device-ready representation of one scene: the cache value of the
/// compiler.
///
/// Buffers grow in capacity but never shrink across incremental updates; the
/// `*_count` fields carry the element counts actually written.
pub struct CompiledScene<B: ComputeBackend> {
    pub camera: B::Buffer<GpuCamera>,
    pub shapes: B::Buffer<GpuShape>,
    pub vertices: B::Buffer<Vec4>,
    pub normals: B::Buffer<Vec4>,
    pub uvs: B::Buffer<Vec2>,
    pub indices: B::Buffer<u32>,
    pub material_ids: B::Buffer<i32>,
    pub materials: B::Buffer<GpuMaterial>,
    pub lights: B::Buffer<GpuLight>,
    pub textures: B::Buffer<GpuTexture>,
    pub texture_data: B::Buffer<u8>,
    pub volumes: B::Buffer<GpuVolume>,

    pub camera_type: CameraType,
    pub shape_count: usize,
    pub light_count: usize,
    pub material_count: usize,
    pub texture_count: usize,
    /// Index of the image-based light driving the environment, [`NO_INDEX`]
    /// if the scene has none.
    pub environment_light: i32,

    pub material_bundle: Option<Bundle<MaterialRef>>,
    pub texture_bundle: Option<Bundle<TextureId>>,

    pub(crate) isect_shapes: Vec<ShapeHandle>,
    pub(crate) visible_shapes: Vec<ShapeHandle>,
}

impl<B: ComputeBackend> CompiledScene<B> {
    pub(crate) fn allocate(backend: &B) -> Result<CompiledScene<B>, ComputeError> {
        Ok(CompiledScene {
            camera: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            shapes: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            vertices: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            normals: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            uvs: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            indices: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            material_ids: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            materials: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            lights: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            textures: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            texture_data: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            volumes: backend.create_buffer(1, BufferUsage::ReadOnly)?,
            camera_type: CameraType::Default,
            shape_count: 0,
            light_count: 0,
            material_count: 0,
            texture_count: 0,
            environment_light: NO_INDEX,
            material_bundle: None,
            texture_bundle: None,
            isect_shapes: Vec::new(),
            visible_shapes: Vec::new(),
        })
    }

    /// Every intersection-backend handle owned by this scene, including
    /// backing meshes that are never visible themselves.
    pub fn shape_handles(&self) -> &[ShapeHandle] {
        &self.isect_shapes
    }

    /// The subset of handles attached for traversal.
    pub fn visible_handles(&self) -> &[ShapeHandle] {
        &self.visible_shapes
    }
}

/// Grows `buffer` to at least `needed` elements, never shrinking. Returns
/// whether a reallocation happened.
pub(crate) fn ensure_capacity<B: ComputeBackend, T: Pod>(
    backend: &B,
    buffer: &mut B::Buffer<T>,
    needed: usize,
) -> Result<bool, ComputeError> {
    if backend.capacity(buffer) < needed {
        *buffer = backend.create_buffer(needed, BufferUsage::ReadOnly)?;
        return Ok(true);
    }
    Ok(false)
}
