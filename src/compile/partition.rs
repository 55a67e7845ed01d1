use std::collections::HashSet;

use crate::scene::{InstanceId, MeshId, Scene, ShapeId};

/// Scene shapes split into base meshes, instance-only ("excluded") meshes
/// and instances.
///
/// The concatenation meshes, then excluded meshes, then instances is the
/// canonical shape order: geometry serialization and intersection-handle
/// creation both walk it, and the two walks must agree.
#[derive(Debug, Default)]
pub(crate) struct Partition {
    pub meshes: Vec<MeshId>,
    pub excluded_meshes: Vec<MeshId>,
    pub instances: Vec<InstanceId>,
}

impl Partition {
    pub fn shape_total(&self) -> usize {
        self.meshes.len() + self.excluded_meshes.len() + self.instances.len()
    }
}

/// Classifies the attached shapes in attachment order. Base meshes that are
/// referenced by an instance but not attached themselves come out as
/// excluded meshes, in the order their referencing instances appear.
pub(crate) fn partition(scene: &Scene) -> Partition {
    let mut part = Partition::default();
    let mut attached_meshes = HashSet::new();
    let mut attached_instances = HashSet::new();

    for shape in scene.shapes() {
        match shape {
            ShapeId::Mesh(id) => {
                if attached_meshes.insert(id) {
                    part.meshes.push(id);
                }
            }
            ShapeId::Instance(id) => {
                if attached_instances.insert(id) {
                    part.instances.push(id);
                }
            }
        }
    }

    let mut excluded = HashSet::new();
    for &instance in &part.instances {
        let base = scene.instance(instance).base();
        if !attached_meshes.contains(&base) && excluded.insert(base) {
            part.excluded_meshes.push(base);
        }
    }

    part
}

/// Position of `shape` in the canonical order, `None` if it is not part of
/// the partition. Re-runs the partition; only used for area-light shape
/// back-references, where the linear cost is acceptable.
pub(crate) fn shape_index(scene: &Scene, shape: ShapeId) -> Option<usize> {
    let part = partition(scene);
    let mut index = 0;

    for &mesh in &part.meshes {
        if shape == ShapeId::Mesh(mesh) {
            return Some(index);
        }
        index += 1;
    }
    for &mesh in &part.excluded_meshes {
        if shape == ShapeId::Mesh(mesh) {
            return Some(index);
        }
        index += 1;
    }
    for &instance in &part.instances {
        if shape == ShapeId::Instance(instance) {
            return Some(index);
        }
        index += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Instance, Mesh, Scene};

    fn mesh() -> Mesh {
        Mesh::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    #[test]
    fn splits_attached_shapes_in_attachment_order() {
        let mut scene = Scene::new();
        let a = scene.add_mesh(mesh());
        let i = scene.add_instance(Instance::new(a));
        let b = scene.add_mesh(mesh());

        let part = partition(&scene);
        assert_eq!(part.meshes, vec![a, b]);
        assert_eq!(part.instances, vec![i]);
        assert!(part.excluded_meshes.is_empty());
    }

    #[test]
    fn unattached_instance_bases_become_excluded_meshes() {
        let mut scene = Scene::new();
        let attached = scene.add_mesh(mesh());
        let backing = scene.create_mesh(mesh());
        let first = scene.add_instance(Instance::new(backing));
        let second = scene.add_instance(Instance::new(backing));

        let part = partition(&scene);
        assert_eq!(part.meshes, vec![attached]);
        // One excluded entry even with two referencing instances.
        assert_eq!(part.excluded_meshes, vec![backing]);
        assert_eq!(part.instances, vec![first, second]);
    }

    #[test]
    fn shape_index_follows_canonical_concatenation() {
        let mut scene = Scene::new();
        let attached = scene.add_mesh(mesh());
        let backing = scene.create_mesh(mesh());
        let instance = scene.add_instance(Instance::new(backing));

        assert_eq!(shape_index(&scene, ShapeId::Mesh(attached)), Some(0));
        assert_eq!(shape_index(&scene, ShapeId::Mesh(backing)), Some(1));
        assert_eq!(shape_index(&scene, ShapeId::Instance(instance)), Some(2));
        assert_eq!(shape_index(&scene, ShapeId::Instance(99)), None);
    }

    #[test]
    fn repeated_partitions_agree() {
        let mut scene = Scene::new();
        let backing = scene.create_mesh(mesh());
        scene.add_instance(Instance::new(backing));
        scene.add_mesh(mesh());
        scene.add_instance(Instance::new(backing));

        let first = partition(&scene);
        let second = partition(&scene);
        assert_eq!(first.meshes, second.meshes);
        assert_eq!(first.excluded_meshes, second.excluded_meshes);
        assert_eq!(first.instances, second.instances);
    }
}
