//! Incremental compilation of a mutable scene graph into flat, device-ready
//! buffers for a compute backend, mirrored into a ray-intersection backend.
//!
//! The scene graph ([`scene::Scene`]) is an object graph of camera, shapes,
//! lights, materials and textures with per-entity dirty flags. The compiler
//! ([`compile::SceneCompiler`]) turns it into a [`compile::CompiledScene`]:
//! linear buffers of shape descriptors, geometry arrays, material and light
//! records with resolved cross-indices, plus intersection-backend handles for
//! the visible shape set. Compiled scenes are cached per scene identity, and
//! recompiles only re-run the serializers whose inputs actually changed.

pub mod collector;
pub mod compile;
pub mod compute;
pub mod intersect;
pub mod scene;

mod error;

pub use compile::{CompiledScene, SceneCompiler};
pub use error::CompileError;

#[cfg(test)]
mod tests;
