use bytemuck::cast_slice;

use crate::compile::{CameraType, LightType, SceneCompiler, NO_INDEX};
use crate::compute::HostBackend;
use crate::error::CompileError;
use crate::intersect::HostIntersector;
use crate::scene::{test_scenes, Bxdf, Light, LightKind, Scene, ShapeId};

fn compiler() -> SceneCompiler<HostBackend, HostIntersector> {
    let _ = env_logger::builder().is_test(true).try_init();
    SceneCompiler::new(HostBackend, HostIntersector::new())
}

#[test]
fn material_collection_yields_transitive_closure_once() {
    let (mut scene, _shared) = test_scenes::shared_material_scene();
    let mut compiler = compiler();
    let compiled = compiler.compile(&mut scene).unwrap();

    // Two mix materials, two tops, one shared base; the shared base appears
    // exactly once.
    assert_eq!(compiled.material_count, 5);

    let records = &compiled.materials.contents()[..5];
    let mixes: Vec<_> = records.iter().filter(|r| r.kind == Bxdf::Mix as i32).collect();
    assert_eq!(mixes.len(), 2);
    assert_eq!(mixes[0].base_material, mixes[1].base_material);
    assert_ne!(mixes[0].top_material, mixes[1].top_material);
}

#[test]
fn unassigned_shapes_fall_back_to_the_default_material() {
    let (mut scene, _mesh) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();
    let compiled = compiler.compile(&mut scene).unwrap();

    assert_eq!(compiled.material_count, 1);
    let record = &compiled.materials.contents()[0];
    assert_eq!(record.kind, Bxdf::Lambert as i32);
    assert_eq!(record.albedo, glam::Vec4::new(0.5, 0.6, 0.5, 1.0));

    // Every triangle's material-id slot resolves to that record.
    let shape = compiled.shapes.contents()[0];
    let matids = compiled.material_ids.contents();
    for prim in 0..shape.prim_count as usize {
        assert_eq!(matids[shape.material_start as usize + prim], 0);
    }
}

#[test]
fn recompiling_unchanged_scene_does_not_resync() {
    let (mut scene, _, _, _) = test_scenes::instanced_scene();
    let mut compiler = compiler();

    compiler.compile(&mut scene).unwrap();
    let commits = compiler.intersector().commit_count();
    let (shape_writes, vertex_writes, light_writes, material_writes) = {
        let compiled = compiler.cached(scene.id()).unwrap();
        (
            compiled.shapes.write_count(),
            compiled.vertices.write_count(),
            compiled.lights.write_count(),
            compiled.materials.write_count(),
        )
    };

    compiler.compile(&mut scene).unwrap();

    assert_eq!(compiler.intersector().commit_count(), commits);
    let compiled = compiler.cached(scene.id()).unwrap();
    assert_eq!(compiled.shapes.write_count(), shape_writes);
    assert_eq!(compiled.vertices.write_count(), vertex_writes);
    assert_eq!(compiled.lights.write_count(), light_writes);
    assert_eq!(compiled.materials.write_count(), material_writes);
}

#[test]
fn forced_geometry_rebuild_is_byte_identical() {
    let (mut scene, attached, _, _) = test_scenes::instanced_scene();
    let mut compiler = compiler();

    let (shapes_before, vertices_before, matids_before) = {
        let compiled = compiler.compile(&mut scene).unwrap();
        (
            cast_slice::<_, u8>(compiled.shapes.contents()).to_vec(),
            cast_slice::<_, u8>(compiled.vertices.contents()).to_vec(),
            cast_slice::<_, u8>(compiled.material_ids.contents()).to_vec(),
        )
    };
    let commits = compiler.intersector().commit_count();

    // Dirty with no actual change: the rebuild must reproduce the same
    // bytes.
    scene.mesh_mut(attached).set_dirty(true);
    {
        let compiled = compiler.compile(&mut scene).unwrap();
        assert_eq!(cast_slice::<_, u8>(compiled.shapes.contents()), &shapes_before[..]);
        assert_eq!(cast_slice::<_, u8>(compiled.vertices.contents()), &vertices_before[..]);
        assert_eq!(cast_slice::<_, u8>(compiled.material_ids.contents()), &matids_before[..]);
    }
    assert_eq!(compiler.intersector().commit_count(), commits + 1);
}

#[test]
fn dirty_mesh_rebuilds_geometry_but_not_lights() {
    let (mut scene, mesh) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();
    compiler.compile(&mut scene).unwrap();

    let commits = compiler.intersector().commit_count();
    let (light_writes, vertex_writes) = {
        let compiled = compiler.cached(scene.id()).unwrap();
        (compiled.lights.write_count(), compiled.vertices.write_count())
    };

    scene.mesh_mut(mesh).set_dirty(true);
    compiler.compile(&mut scene).unwrap();

    let compiled = compiler.cached(scene.id()).unwrap();
    assert_eq!(compiled.lights.write_count(), light_writes);
    assert_eq!(compiled.vertices.write_count(), vertex_writes + 1);
    assert_eq!(compiler.intersector().commit_count(), commits + 1);
}

#[test]
fn dirty_camera_updates_only_the_camera_buffer() {
    let (mut scene, _) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();
    compiler.compile(&mut scene).unwrap();

    let commits = compiler.intersector().commit_count();
    let (camera_writes, vertex_writes) = {
        let compiled = compiler.cached(scene.id()).unwrap();
        (compiled.camera.write_count(), compiled.vertices.write_count())
    };

    scene.camera_mut().unwrap().set_aperture(0.1);
    compiler.compile(&mut scene).unwrap();

    let compiled = compiler.cached(scene.id()).unwrap();
    assert_eq!(compiled.camera.write_count(), camera_writes + 1);
    assert_eq!(compiled.vertices.write_count(), vertex_writes);
    assert_eq!(compiled.camera_type, CameraType::Physical);
    assert_eq!(compiler.intersector().commit_count(), commits);
    assert!(!scene.camera().unwrap().is_dirty());
}

#[test]
fn excluded_mesh_occupies_buffers_but_stays_invisible() {
    let (mut scene, _, _, _) = test_scenes::instanced_scene();
    let mut compiler = compiler();

    {
        let compiled = compiler.compile(&mut scene).unwrap();
        assert_eq!(compiled.shape_count, 3);

        // Canonical order: attached mesh, excluded mesh, instance.
        let shapes = compiled.shapes.contents();
        let matids = compiled.material_ids.contents();
        let excluded = shapes[1];
        let instance = shapes[2];

        for prim in 0..excluded.prim_count as usize {
            assert_eq!(matids[excluded.material_start as usize + prim], NO_INDEX);
        }

        // The instance reuses the excluded mesh's geometry offsets but owns
        // a private material run with a real material id.
        assert_eq!(instance.vertex_start, excluded.vertex_start);
        assert_eq!(instance.index_start, excluded.index_start);
        assert_ne!(instance.material_start, excluded.material_start);
        assert_ne!(instance.transform, excluded.transform);
        for prim in 0..instance.prim_count as usize {
            assert!(matids[instance.material_start as usize + prim] >= 0);
        }
    }

    // Backend ids run 1..=3 over mesh, excluded, instance; only the mesh and
    // the instance are attached.
    assert_eq!(compiler.intersector().shape_count(), 3);
    assert_eq!(compiler.intersector().attached_ids(), vec![1, 3]);
    let attached = compiler.intersector().attached().to_vec();
    assert!(!compiler.intersector().is_instance(attached[0]));
    assert!(compiler.intersector().is_instance(attached[1]));
    // The instance's base is the detached backing mesh, not the visible one.
    let base = compiler.intersector().base_of(attached[1]).unwrap();
    assert_ne!(base, attached[0]);
    assert_eq!(compiler.intersector().prim_count(base), Some(2));
}

#[test]
fn area_light_resolves_canonical_shape_index() {
    let (mut scene, _, _, instance) = test_scenes::instanced_scene();
    scene.add_light(Light::new(LightKind::Area {
        shape: ShapeId::Instance(instance),
        prim_index: 1,
    }));

    let mut compiler = compiler();
    let compiled = compiler.compile(&mut scene).unwrap();

    let area = compiled.lights.contents()[..compiled.light_count]
        .iter()
        .find(|light| light.kind == LightType::Area as i32)
        .copied()
        .unwrap();
    // meshes (1) then excluded meshes (1) come before the instance.
    assert_eq!(area.shape_index, 2);
    assert_eq!(area.prim_index, 1);
}

#[test]
fn switching_active_scene_resyncs_intersector() {
    let (mut scene_a, _) = test_scenes::single_mesh_scene();
    let (mut scene_b, _) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();

    compiler.compile(&mut scene_a).unwrap();
    let after_a = compiler.intersector().commit_count();

    compiler.compile(&mut scene_b).unwrap();
    let after_b = compiler.intersector().commit_count();
    assert_eq!(after_b, after_a + 1);

    // Nothing is dirty in either scene; switching back still re-syncs.
    compiler.compile(&mut scene_a).unwrap();
    assert_eq!(compiler.intersector().commit_count(), after_b + 1);

    // Recompiling the already-active scene does not.
    compiler.compile(&mut scene_a).unwrap();
    assert_eq!(compiler.intersector().commit_count(), after_b + 1);
}

#[test]
fn textureless_scene_gets_placeholder_texture_buffers() {
    let (mut scene, _) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();
    let compiled = compiler.compile(&mut scene).unwrap();

    assert_eq!(compiled.texture_count, 0);
    assert_eq!(compiled.textures.contents().len(), 1);
    assert_eq!(compiled.texture_data.contents().len(), 1);
    assert!(compiled.texture_bundle.is_none());
}

#[test]
fn textures_pack_descriptors_and_data_blob() {
    let (mut scene, albedo, _environment) = test_scenes::textured_scene();
    let mut compiler = compiler();
    let compiled = compiler.compile(&mut scene).unwrap();

    assert_eq!(compiled.texture_count, 2);

    // Discovery order: the material sweep finds the albedo texture before
    // the light sweep finds the environment map.
    let records = compiled.textures.contents();
    assert_eq!(records[0].width, 2);
    assert_eq!(records[0].height, 2);
    assert_eq!(records[0].data_offset, 0);
    assert_eq!(records[1].data_offset, scene.texture(albedo).size_in_bytes() as i32);

    let blob = compiled.texture_data.contents();
    assert_eq!(
        &blob[..scene.texture(albedo).size_in_bytes()],
        scene.texture(albedo).data()
    );

    // The lone image-based light is the environment light and aliases its
    // texture index into the diffuse lane.
    assert_eq!(compiled.environment_light, 0);
    let light = compiled.lights.contents()[0];
    assert_eq!(light.kind, LightType::ImageBased as i32);
    assert_eq!(light.texture, 1);
    assert_eq!(light.texture_diffuse, 1);

    // The material record references the albedo texture's committed slot.
    let material = compiled.materials.contents()[0];
    assert_eq!(material.albedo_map, 0);
}

#[test]
fn missing_camera_lights_or_shapes_fail_before_caching() {
    let mut compiler = compiler();
    let mut scene = Scene::new();

    assert!(matches!(compiler.compile(&mut scene), Err(CompileError::NoCamera)));

    scene.set_camera(test_scenes::default_camera());
    assert!(matches!(compiler.compile(&mut scene), Err(CompileError::NoLights)));

    scene.add_light(Light::new(LightKind::Point {
        position: glam::Vec3::ZERO,
        radiance: glam::Vec3::ONE,
    }));
    assert!(matches!(compiler.compile(&mut scene), Err(CompileError::NoShapes)));

    // Nothing was cached by the failed attempts.
    assert!(compiler.cached(scene.id()).is_none());

    scene.add_mesh(test_scenes::unit_quad());
    assert!(compiler.compile(&mut scene).is_ok());
}

#[test]
fn compile_clears_dirty_state() {
    let (mut scene, _) = test_scenes::shared_material_scene();
    let mut compiler = compiler();
    compiler.compile(&mut scene).unwrap();

    assert!(scene.dirty_flags().is_empty());
    assert!(!scene.camera().unwrap().is_dirty());
    assert!(scene.shapes().all(|shape| !scene.shape_is_dirty(shape)));
    assert!(scene.lights().all(|light| !light.is_dirty()));
}

#[test]
fn attaching_a_shape_grows_geometry_buffers() {
    let (mut scene, _) = test_scenes::single_mesh_scene();
    let mut compiler = compiler();
    compiler.compile(&mut scene).unwrap();

    let vertex_capacity = compiler.cached(scene.id()).unwrap().vertices.contents().len();

    scene.add_mesh(test_scenes::unit_quad());
    let compiled = compiler.compile(&mut scene).unwrap();

    assert_eq!(compiled.shape_count, 2);
    assert_eq!(compiled.vertices.contents().len(), vertex_capacity * 2);
}
