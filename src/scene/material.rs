use glam::Vec4;
use indexmap::IndexMap;

use crate::scene::TextureId;

pub type MaterialId = u32;

/// Closed set of shading models the serializer understands. The discriminant
/// is the value written into device material records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Bxdf {
    Zero = 0,
    Lambert = 1,
    Emissive = 2,
    Passthrough = 3,
    Translucent = 4,
    IdealReflect = 5,
    IdealRefract = 6,
    MicrofacetGgx = 7,
    MicrofacetBeckmann = 8,
    MicrofacetRefractionGgx = 9,
    MicrofacetRefractionBeckmann = 10,
    Mix = 11,
    FresnelBlend = 12,
}

/// Value held by a named material input slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Value(Vec4),
    Texture(TextureId),
    Material(MaterialId),
}

/// Shading model plus named input slots.
///
/// Compound models (`Mix`, `FresnelBlend`) reference other materials through
/// material-typed inputs, forming a DAG over the scene's material arena.
/// Slot names the serializer understands: `albedo`, `normal`, `bump`,
/// `fresnel`, `ior`, `roughness`, `base_material`, `top_material`, `weight`.
#[derive(Debug, Clone)]
pub struct Material {
    kind: Bxdf,
    inputs: IndexMap<&'static str, Input>,
    dirty: bool,
}

impl Material {
    pub fn new(kind: Bxdf) -> Material {
        Material {
            kind,
            inputs: IndexMap::new(),
            dirty: false,
        }
    }

    pub fn with_input(mut self, slot: &'static str, input: Input) -> Material {
        self.inputs.insert(slot, input);
        self
    }

    pub fn kind(&self) -> Bxdf {
        self.kind
    }

    pub fn input(&self, slot: &str) -> Option<Input> {
        self.inputs.get(slot).copied()
    }

    pub fn set_input(&mut self, slot: &'static str, input: Input) {
        self.inputs.insert(slot, input);
        self.dirty = true;
    }

    /// Material-typed inputs, in slot insertion order.
    pub fn sub_materials(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.inputs.values().filter_map(|input| match input {
            Input::Material(id) => Some(*id),
            _ => None,
        })
    }

    /// Texture-typed inputs, in slot insertion order.
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.inputs.values().filter_map(|input| match input {
            Input::Texture(id) => Some(*id),
            _ => None,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
