//! Small scenes shared by the compiler tests.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::scene::{
    Bxdf, Camera, Input, Instance, InstanceId, Light, LightKind, Material, MaterialId, Mesh,
    MeshId, Scene, Texture, TextureFormat, TextureId,
};

/// Unit quad in the XY plane, facing +Z.
pub fn unit_quad() -> Mesh {
    Mesh::new(
        vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ],
        vec![Vec3::Z; 4],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        vec![0, 1, 2, 2, 3, 0],
    )
}

pub fn default_camera() -> Camera {
    Camera::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y)
}

pub fn lambert(albedo: Vec4) -> Material {
    Material::new(Bxdf::Lambert).with_input("albedo", Input::Value(albedo))
}

/// 2x2 RGBA8 checkerboard.
pub fn checker_texture() -> Texture {
    Texture::new(
        2,
        2,
        TextureFormat::Rgba8,
        vec![
            255, 255, 255, 255, 0, 0, 0, 255, //
            0, 0, 0, 255, 255, 255, 255, 255,
        ],
    )
}

/// One unshaded quad lit by a point light.
pub fn single_mesh_scene() -> (Scene, MeshId) {
    let mut scene = Scene::new();
    scene.set_camera(default_camera());
    let mesh = scene.add_mesh(unit_quad());
    scene.add_light(Light::new(LightKind::Point {
        position: Vec3::new(0.0, 2.0, 0.0),
        radiance: Vec3::splat(10.0),
    }));
    (scene, mesh)
}

/// A visible quad plus an instance whose base mesh is registered but never
/// attached, leaving it an excluded mesh.
pub fn instanced_scene() -> (Scene, MeshId, MeshId, InstanceId) {
    let mut scene = Scene::new();
    scene.set_camera(default_camera());

    let visible_material = scene.add_material(lambert(Vec4::new(0.7, 0.7, 0.7, 1.0)));
    let instance_material = scene.add_material(lambert(Vec4::new(0.2, 0.4, 0.8, 1.0)));

    let attached = scene.add_mesh(unit_quad().with_material(visible_material));
    let backing = scene.create_mesh(unit_quad());
    let instance = scene.add_instance(
        Instance::new(backing)
            .with_transform(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)))
            .with_material(instance_material),
    );

    scene.add_light(Light::new(LightKind::Point {
        position: Vec3::new(0.0, 2.0, 0.0),
        radiance: Vec3::splat(10.0),
    }));

    (scene, attached, backing, instance)
}

/// Two quads whose mix materials blend distinct tops over one shared base.
pub fn shared_material_scene() -> (Scene, MaterialId) {
    let mut scene = Scene::new();
    scene.set_camera(default_camera());

    let shared = scene.add_material(lambert(Vec4::splat(0.5)));
    let red_top = scene.add_material(lambert(Vec4::new(0.8, 0.1, 0.1, 1.0)));
    let blue_top = scene.add_material(lambert(Vec4::new(0.1, 0.1, 0.8, 1.0)));

    let left = scene.add_material(
        Material::new(Bxdf::Mix)
            .with_input("base_material", Input::Material(shared))
            .with_input("top_material", Input::Material(red_top))
            .with_input("weight", Input::Value(Vec4::splat(0.5))),
    );
    let right = scene.add_material(
        Material::new(Bxdf::Mix)
            .with_input("base_material", Input::Material(shared))
            .with_input("top_material", Input::Material(blue_top))
            .with_input("weight", Input::Value(Vec4::splat(0.25))),
    );

    scene.add_mesh(unit_quad().with_material(left));
    scene.add_mesh(
        unit_quad()
            .with_transform(Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)))
            .with_material(right),
    );

    scene.add_light(Light::new(LightKind::Point {
        position: Vec3::new(0.0, 2.0, 0.0),
        radiance: Vec3::splat(10.0),
    }));

    (scene, shared)
}

/// Quad shaded by a textured material under an image-based light.
pub fn textured_scene() -> (Scene, TextureId, TextureId) {
    let mut scene = Scene::new();
    scene.set_camera(default_camera());

    let albedo = scene.add_texture(checker_texture());
    let environment = scene.add_texture(Texture::new(2, 1, TextureFormat::Rgba32, vec![0; 32]));

    let material =
        scene.add_material(Material::new(Bxdf::Lambert).with_input("albedo", Input::Texture(albedo)));
    scene.add_mesh(unit_quad().with_material(material));

    scene.add_light(Light::new(LightKind::ImageBased {
        texture: environment,
        multiplier: 1.0,
    }));

    (scene, albedo, environment)
}
