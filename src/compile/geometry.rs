use std::collections::HashMap;

use glam::Vec4;
use log::debug;

use crate::collector::Collector;
use crate::compile::compiled::{ensure_capacity, CompiledScene, GpuShape, NO_INDEX};
use crate::compile::partition::partition;
use crate::compile::MaterialRef;
use crate::compute::ComputeBackend;
use crate::error::CompileError;
use crate::scene::{MaterialId, MeshId, Scene};

/// Serializes meshes, excluded meshes and instances into the linear
/// geometry buffers and per-shape descriptors, resolving material ids
/// through the committed material collector. Clears the dirty flag of every
/// processed shape.
pub(crate) fn update_geometry<B: ComputeBackend>(
    backend: &B,
    scene: &mut Scene,
    materials: &Collector<MaterialRef>,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let part = partition(scene);

    // Element totals. Only meshes occupy the vertex arrays; instances
    // contribute a private material-id run for their triangles.
    let mut vertex_total = 0;
    let mut normal_total = 0;
    let mut uv_total = 0;
    let mut index_total = 0;
    let mut matid_total = 0;
    for &id in part.meshes.iter().chain(&part.excluded_meshes) {
        let mesh = scene.mesh(id);
        vertex_total += mesh.vertices().len();
        normal_total += mesh.normals().len();
        uv_total += mesh.uvs().len();
        index_total += mesh.indices().len();
        matid_total += mesh.triangle_count();
    }
    for &id in &part.instances {
        matid_total += scene.mesh(scene.instance(id).base()).triangle_count();
    }
    let shape_total = part.shape_total();

    ensure_capacity(backend, &mut out.vertices, vertex_total)?;
    ensure_capacity(backend, &mut out.normals, normal_total)?;
    ensure_capacity(backend, &mut out.uvs, uv_total)?;
    ensure_capacity(backend, &mut out.indices, index_total)?;
    ensure_capacity(backend, &mut out.material_ids, matid_total)?;
    ensure_capacity(backend, &mut out.shapes, shape_total)?;

    debug!(
        "geometry rebuild: {} shapes ({} meshes, {} excluded, {} instances), {} vertices, {} indices",
        shape_total,
        part.meshes.len(),
        part.excluded_meshes.len(),
        part.instances.len(),
        vertex_total,
        index_total
    );

    {
        let mut vertices = backend.map_write(&mut out.vertices)?;
        let mut normals = backend.map_write(&mut out.normals)?;
        let mut uvs = backend.map_write(&mut out.uvs)?;
        let mut indices = backend.map_write(&mut out.indices)?;
        let mut material_ids = backend.map_write(&mut out.material_ids)?;
        let mut shapes = backend.map_write(&mut out.shapes)?;

        let mut vertex_cursor = 0;
        let mut normal_cursor = 0;
        let mut uv_cursor = 0;
        let mut index_cursor = 0;
        let mut matid_cursor = 0;
        let mut shape_cursor = 0;

        // Descriptors of serialized base meshes, for instance lookup below.
        let mut descriptors: HashMap<MeshId, GpuShape> = HashMap::new();

        for (pass, ids) in [(MeshPass::Shaded, &part.meshes), (MeshPass::Excluded, &part.excluded_meshes)] {
            for &id in ids {
                let mesh = scene.mesh(id);
                let descriptor = GpuShape {
                    prim_count: mesh.triangle_count() as i32,
                    vertex_start: vertex_cursor as i32,
                    index_start: index_cursor as i32,
                    material_start: matid_cursor as i32,
                    transform: mesh.transform(),
                    linear_velocity: Vec4::ZERO,
                    angular_velocity: Vec4::new(0.0, 0.0, 0.0, 1.0),
                };
                descriptors.insert(id, descriptor);

                for (slot, vertex) in vertices[vertex_cursor..].iter_mut().zip(mesh.vertices()) {
                    *slot = vertex.extend(1.0);
                }
                vertex_cursor += mesh.vertices().len();

                for (slot, normal) in normals[normal_cursor..].iter_mut().zip(mesh.normals()) {
                    *slot = normal.extend(0.0);
                }
                normal_cursor += mesh.normals().len();

                uvs[uv_cursor..uv_cursor + mesh.uvs().len()].copy_from_slice(mesh.uvs());
                uv_cursor += mesh.uvs().len();

                indices[index_cursor..index_cursor + mesh.indices().len()].copy_from_slice(mesh.indices());
                index_cursor += mesh.indices().len();

                shapes[shape_cursor] = descriptor;
                shape_cursor += 1;

                // Excluded meshes are never shaded directly; their slots hold
                // the sentinel so instances alone decide the shading.
                let matid = match pass {
                    MeshPass::Shaded => material_index(materials, mesh.material()),
                    MeshPass::Excluded => NO_INDEX,
                };
                material_ids[matid_cursor..matid_cursor + mesh.triangle_count()].fill(matid);
                matid_cursor += mesh.triangle_count();
            }
        }

        for &id in &part.instances {
            let instance = scene.instance(id);
            let base = instance.base();
            let prim_count = scene.mesh(base).triangle_count();

            // The base mesh was serialized in one of the passes above, so its
            // descriptor is present; the instance reuses it except for its
            // own transform and a private material-id run.
            let mut descriptor = descriptors[&base];
            descriptor.material_start = matid_cursor as i32;
            descriptor.transform = instance.transform();

            shapes[shape_cursor] = descriptor;
            shape_cursor += 1;

            let matid = material_index(materials, instance.material());
            material_ids[matid_cursor..matid_cursor + prim_count].fill(matid);
            matid_cursor += prim_count;
        }
    }

    out.shape_count = shape_total;

    for &id in part.meshes.iter().chain(&part.excluded_meshes) {
        scene.mesh_mut(id).set_dirty(false);
    }
    for &id in &part.instances {
        scene.instance_mut(id).set_dirty(false);
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum MeshPass {
    Shaded,
    Excluded,
}

fn material_index(materials: &Collector<MaterialRef>, material: Option<MaterialId>) -> i32 {
    let key = material.map(MaterialRef::Scene).unwrap_or(MaterialRef::Default);
    materials
        .item_index(key)
        .expect("shape material missing from committed collector") as i32
}
