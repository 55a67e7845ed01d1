use std::collections::HashMap;

use log::debug;

use crate::compile::compiled::CompiledScene;
use crate::compile::partition::partition;
use crate::compute::ComputeBackend;
use crate::intersect::{IntersectError, IntersectionBackend, ShapeHandle};
use crate::scene::{MeshId, Scene};

/// Rebuilds the intersection-backend mirror of the shape set: one mesh
/// handle per base and excluded mesh (sequential ids from 1), then one
/// instance handle per scene instance. Mesh and instance handles land in the
/// visible list; excluded-mesh handles back instances without being visible
/// themselves.
///
/// The replacement handle set is created in full before the old one is
/// retired, and deleted again if any creation fails, so the compiled scene's
/// handle lists are always either fully old or fully new.
pub(crate) fn update_intersector<B: ComputeBackend, I: IntersectionBackend>(
    intersector: &mut I,
    scene: &Scene,
    out: &mut CompiledScene<B>,
) -> Result<(), IntersectError> {
    let part = partition(scene);
    debug!(
        "intersector rebuild: {} meshes, {} excluded, {} instances",
        part.meshes.len(),
        part.excluded_meshes.len(),
        part.instances.len()
    );

    let mut created: Vec<ShapeHandle> = Vec::new();
    let mut visible: Vec<ShapeHandle> = Vec::new();
    let mut base_handles: HashMap<MeshId, ShapeHandle> = HashMap::new();

    let result = (|| -> Result<(), IntersectError> {
        let mut id = 1;

        for &mesh_id in &part.meshes {
            let mesh = scene.mesh(mesh_id);
            let handle = intersector.create_mesh(mesh.vertices(), mesh.indices(), mesh.triangle_count())?;
            created.push(handle);
            let transform = mesh.transform();
            intersector.set_transform(handle, transform, transform.inverse());
            intersector.set_id(handle, id);
            id += 1;
            visible.push(handle);
            base_handles.insert(mesh_id, handle);
        }

        for &mesh_id in &part.excluded_meshes {
            let mesh = scene.mesh(mesh_id);
            let handle = intersector.create_mesh(mesh.vertices(), mesh.indices(), mesh.triangle_count())?;
            created.push(handle);
            let transform = mesh.transform();
            intersector.set_transform(handle, transform, transform.inverse());
            intersector.set_id(handle, id);
            id += 1;
            base_handles.insert(mesh_id, handle);
        }

        for &instance_id in &part.instances {
            let instance = scene.instance(instance_id);
            let base = base_handles[&instance.base()];
            let handle = intersector.create_instance(base)?;
            created.push(handle);
            let transform = instance.transform();
            intersector.set_transform(handle, transform, transform.inverse());
            intersector.set_id(handle, id);
            id += 1;
            visible.push(handle);
        }

        Ok(())
    })();

    if let Err(err) = result {
        for &handle in &created {
            intersector.delete(handle);
        }
        return Err(err);
    }

    // Retire the old handle set and adopt the new one.
    for &handle in &out.isect_shapes {
        intersector.detach(handle);
        intersector.delete(handle);
    }
    out.isect_shapes = created;
    out.visible_shapes = visible;

    Ok(())
}

/// Full replace of the attached set: detach everything, attach the visible
/// handles, commit.
pub(crate) fn reload_intersector<B: ComputeBackend, I: IntersectionBackend>(
    intersector: &mut I,
    out: &CompiledScene<B>,
) -> Result<(), IntersectError> {
    intersector.detach_all();
    for &handle in &out.visible_shapes {
        intersector.attach(handle);
    }
    intersector.commit()
}
