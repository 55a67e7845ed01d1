mod camera;
mod light;
mod material;
mod scene;
mod shape;
mod texture;

pub mod test_scenes;

pub use camera::Camera;
pub use light::{Light, LightKind};
pub use material::{Bxdf, Input, Material, MaterialId};
pub use scene::{Scene, SceneDirty, SceneId};
pub use shape::{Instance, InstanceId, Mesh, MeshId, ShapeId};
pub use texture::{Texture, TextureFormat, TextureId};
