//! Ray-intersection backend abstraction.
//!
//! The backend owns its shape storage; callers only see small stable
//! [`ShapeHandle`] ids and drive an explicit create/attach/detach/delete
//! lifecycle, with [`IntersectionBackend::commit`] publishing the attached
//! set for traversal. [`HostIntersector`] is an arena-of-records
//! implementation used by the tests to observe that lifecycle.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntersectError {
    #[error("intersection backend rejected shape: {0}")]
    ShapeCreation(String),
    #[error("intersection backend commit failed: {0}")]
    Commit(String),
}

/// Stable id of a shape registered with the intersection backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u32);

pub trait IntersectionBackend {
    /// Registers a triangle mesh. Vertices are tightly packed positions,
    /// indices describe `prim_count` triangles.
    fn create_mesh(
        &mut self,
        vertices: &[Vec3],
        indices: &[u32],
        prim_count: usize,
    ) -> Result<ShapeHandle, IntersectError>;

    /// Registers an instance of a previously created mesh.
    fn create_instance(&mut self, base: ShapeHandle) -> Result<ShapeHandle, IntersectError>;

    fn set_transform(&mut self, handle: ShapeHandle, transform: Mat4, inverse: Mat4);

    fn set_id(&mut self, handle: ShapeHandle, id: u32);

    fn attach(&mut self, handle: ShapeHandle);

    fn detach(&mut self, handle: ShapeHandle);

    fn detach_all(&mut self);

    fn delete(&mut self, handle: ShapeHandle);

    /// Publishes the currently attached set.
    fn commit(&mut self) -> Result<(), IntersectError>;
}

#[derive(Debug)]
enum HostShapeKind {
    Mesh { prim_count: usize },
    Instance { base: ShapeHandle },
}

#[derive(Debug)]
struct HostShape {
    kind: HostShapeKind,
    transform: Mat4,
    inverse: Mat4,
    id: u32,
}

/// In-memory intersection backend recording the handle lifecycle.
#[derive(Debug, Default)]
pub struct HostIntersector {
    shapes: HashMap<ShapeHandle, HostShape>,
    attached: Vec<ShapeHandle>,
    next_handle: u32,
    commits: u32,
}

impl HostIntersector {
    pub fn new() -> HostIntersector {
        HostIntersector::default()
    }

    fn insert(&mut self, kind: HostShapeKind) -> ShapeHandle {
        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;
        self.shapes.insert(
            handle,
            HostShape {
                kind,
                transform: Mat4::IDENTITY,
                inverse: Mat4::IDENTITY,
                id: 0,
            },
        );
        handle
    }

    /// Handles attached at the last state change, in attach order.
    pub fn attached(&self) -> &[ShapeHandle] {
        &self.attached
    }

    /// Backend ids of the attached handles, in attach order.
    pub fn attached_ids(&self) -> Vec<u32> {
        self.attached.iter().map(|handle| self.shapes[handle].id).collect()
    }

    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn contains(&self, handle: ShapeHandle) -> bool {
        self.shapes.contains_key(&handle)
    }

    pub fn is_instance(&self, handle: ShapeHandle) -> bool {
        matches!(self.shapes[&handle].kind, HostShapeKind::Instance { .. })
    }

    /// Base mesh handle, for instance shapes.
    pub fn base_of(&self, handle: ShapeHandle) -> Option<ShapeHandle> {
        match self.shapes[&handle].kind {
            HostShapeKind::Instance { base } => Some(base),
            HostShapeKind::Mesh { .. } => None,
        }
    }

    /// Triangle count, for mesh shapes.
    pub fn prim_count(&self, handle: ShapeHandle) -> Option<usize> {
        match self.shapes[&handle].kind {
            HostShapeKind::Mesh { prim_count } => Some(prim_count),
            HostShapeKind::Instance { .. } => None,
        }
    }

    pub fn transform(&self, handle: ShapeHandle) -> Mat4 {
        self.shapes[&handle].transform
    }

    pub fn inverse_transform(&self, handle: ShapeHandle) -> Mat4 {
        self.shapes[&handle].inverse
    }
}

impl IntersectionBackend for HostIntersector {
    fn create_mesh(
        &mut self,
        _vertices: &[Vec3],
        indices: &[u32],
        prim_count: usize,
    ) -> Result<ShapeHandle, IntersectError> {
        debug_assert_eq!(indices.len(), prim_count * 3);
        Ok(self.insert(HostShapeKind::Mesh { prim_count }))
    }

    fn create_instance(&mut self, base: ShapeHandle) -> Result<ShapeHandle, IntersectError> {
        if !self.shapes.contains_key(&base) {
            return Err(IntersectError::ShapeCreation(format!(
                "instance references unknown base handle {base:?}"
            )));
        }
        Ok(self.insert(HostShapeKind::Instance { base }))
    }

    fn set_transform(&mut self, handle: ShapeHandle, transform: Mat4, inverse: Mat4) {
        let shape = self.shapes.get_mut(&handle).expect("unknown shape handle");
        shape.transform = transform;
        shape.inverse = inverse;
    }

    fn set_id(&mut self, handle: ShapeHandle, id: u32) {
        self.shapes.get_mut(&handle).expect("unknown shape handle").id = id;
    }

    fn attach(&mut self, handle: ShapeHandle) {
        debug_assert!(self.shapes.contains_key(&handle));
        if !self.attached.contains(&handle) {
            self.attached.push(handle);
        }
    }

    fn detach(&mut self, handle: ShapeHandle) {
        self.attached.retain(|&attached| attached != handle);
    }

    fn detach_all(&mut self) {
        self.attached.clear();
    }

    fn delete(&mut self, handle: ShapeHandle) {
        self.attached.retain(|&attached| attached != handle);
        self.shapes.remove(&handle);
    }

    fn commit(&mut self) -> Result<(), IntersectError> {
        self.commits += 1;
        Ok(())
    }
}
