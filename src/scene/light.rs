use glam::{Vec2, Vec3};

use crate::scene::{ShapeId, TextureId};

/// Emitter variants understood by the light serializer.
#[derive(Debug, Clone)]
pub enum LightKind {
    Point {
        position: Vec3,
        radiance: Vec3,
    },
    Directional {
        direction: Vec3,
        radiance: Vec3,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        radiance: Vec3,
        /// Inner and outer cone angle cosines.
        cone: Vec2,
    },
    /// Emits from the triangles of a scene shape.
    Area {
        shape: ShapeId,
        prim_index: u32,
    },
    /// Environment emission sampled from a texture.
    ImageBased {
        texture: TextureId,
        multiplier: f32,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    kind: LightKind,
    dirty: bool,
}

impl Light {
    pub fn new(kind: LightKind) -> Light {
        Light { kind, dirty: false }
    }

    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: LightKind) {
        self.kind = kind;
        self.dirty = true;
    }

    /// Texture dependency, if the variant carries one.
    pub fn texture(&self) -> Option<TextureId> {
        match self.kind {
            LightKind::ImageBased { texture, .. } => Some(texture),
            _ => None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
