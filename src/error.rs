use thiserror::Error;

use crate::compute::ComputeError;
use crate::intersect::IntersectError;

/// Fatal compilation errors surfaced to the caller.
///
/// The first three are structural scene-authoring errors checked before any
/// cache mutation; the rest propagate backend failures unmodified.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("scene has no camera")]
    NoCamera,
    #[error("scene has no lights")]
    NoLights,
    #[error("scene has no shapes")]
    NoShapes,
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error(transparent)]
    Intersect(#[from] IntersectError),
}
