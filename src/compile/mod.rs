//! The scene compiler: turns a scene graph into a cached [`CompiledScene`],
//! re-running only the serializers whose inputs changed since the last
//! compile of that scene.

mod accel;
mod compiled;
mod geometry;
mod lights;
mod materials;
mod partition;
mod textures;

pub use compiled::{
    CameraType, CompiledScene, GpuCamera, GpuLight, GpuMaterial, GpuShape, GpuTexture, GpuVolume,
    LightType, NO_INDEX,
};

use std::collections::HashMap;

use glam::Vec4;
use log::debug;

use crate::collector::Collector;
use crate::compute::ComputeBackend;
use crate::error::CompileError;
use crate::intersect::IntersectionBackend;
use crate::scene::{Bxdf, Input, Material, MaterialId, Scene, SceneDirty, SceneId, TextureId};

/// Key under which materials are collected and indexed: a scene material or
/// the compiler's default material, which lives outside any scene arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialRef {
    Default,
    Scene(MaterialId),
}

/// Compiles scenes against a compute backend and an intersection backend,
/// caching the compiled representation per scene identity. At most one
/// cached scene is active (synced into the intersection backend) at a time.
pub struct SceneCompiler<B: ComputeBackend, I: IntersectionBackend> {
    backend: B,
    intersector: I,
    default_material: Material,
    mat_collector: Collector<MaterialRef>,
    tex_collector: Collector<TextureId>,
    cache: HashMap<SceneId, CompiledScene<B>>,
    active: Option<SceneId>,
}

/// Material used for shapes without an assigned one.
fn default_diffuse() -> Material {
    Material::new(Bxdf::Lambert).with_input("albedo", Input::Value(Vec4::new(0.5, 0.6, 0.5, 1.0)))
}

impl<B: ComputeBackend, I: IntersectionBackend> SceneCompiler<B, I> {
    pub fn new(backend: B, intersector: I) -> SceneCompiler<B, I> {
        SceneCompiler::with_default_material(backend, intersector, default_diffuse())
    }

    /// Compiler with a caller-supplied fallback material for unassigned
    /// shapes.
    pub fn with_default_material(
        backend: B,
        intersector: I,
        default_material: Material,
    ) -> SceneCompiler<B, I> {
        SceneCompiler {
            backend,
            intersector,
            default_material,
            mat_collector: Collector::new(),
            tex_collector: Collector::new(),
            cache: HashMap::new(),
            active: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn intersector(&self) -> &I {
        &self.intersector
    }

    pub fn cached(&self, id: SceneId) -> Option<&CompiledScene<B>> {
        self.cache.get(&id)
    }

    /// Compiles `scene`, reusing the cached representation where possible,
    /// and leaves it as the active scene. On success all scene-level and
    /// collected per-material dirty flags are cleared.
    pub fn compile(&mut self, scene: &mut Scene) -> Result<&CompiledScene<B>, CompileError> {
        // Structural authoring errors abort before any cache mutation.
        if scene.camera().is_none() {
            return Err(CompileError::NoCamera);
        }
        if scene.light_count() == 0 {
            return Err(CompileError::NoLights);
        }
        if scene.shape_count() == 0 {
            return Err(CompileError::NoShapes);
        }

        self.collect_dependencies(scene);

        let id = scene.id();
        if let Some(mut out) = self.cache.remove(&id) {
            // A failure inside a serializer can leave the entry partially
            // updated; it is reinserted either way so its buffers and
            // intersector handles stay owned.
            let result = self.update_cached(scene, &mut out);
            self.cache.insert(id, out);
            result?;
        } else {
            let mut out = CompiledScene::allocate(&self.backend)?;
            if let Err(err) = self.build_full(scene, &mut out) {
                // The entry never reaches the cache; release any intersector
                // handles it created.
                for &handle in &out.isect_shapes {
                    self.intersector.delete(handle);
                }
                return Err(err);
            }
            self.cache.insert(id, out);
        }

        Ok(&self.cache[&id])
    }

    /// Rebuilds both collectors for this compile pass. Materials come from
    /// the attached shapes, walking compound inputs depth-first; textures
    /// come from the committed materials and then from the lights.
    fn collect_dependencies(&mut self, scene: &Scene) {
        let SceneCompiler {
            mat_collector,
            tex_collector,
            default_material,
            ..
        } = self;

        mat_collector.clear();
        tex_collector.clear();

        mat_collector.collect(scene.shapes(), |shape| {
            let mut found: Vec<MaterialRef> = Vec::new();
            let mut stack = vec![scene
                .shape_material(shape)
                .map(MaterialRef::Scene)
                .unwrap_or(MaterialRef::Default)];
            while let Some(key) = stack.pop() {
                if found.contains(&key) {
                    continue;
                }
                found.push(key);
                let material = match key {
                    MaterialRef::Default => &*default_material,
                    MaterialRef::Scene(id) => scene.material(id),
                };
                stack.extend(material.sub_materials().map(MaterialRef::Scene));
            }
            found
        });
        mat_collector.commit();

        let committed: Vec<MaterialRef> = mat_collector.iter().collect();
        tex_collector.collect(committed, |key| {
            let material = match key {
                MaterialRef::Default => &*default_material,
                MaterialRef::Scene(id) => scene.material(id),
            };
            material.textures().collect::<Vec<_>>()
        });
        tex_collector.collect(scene.lights(), |light| light.texture());
        tex_collector.commit();
    }

    fn build_full(&mut self, scene: &mut Scene, out: &mut CompiledScene<B>) -> Result<(), CompileError> {
        debug!("full compile of scene {:?}", scene.id());

        update_camera(&self.backend, scene, out)?;
        geometry::update_geometry(&self.backend, scene, &self.mat_collector, out)?;
        materials::update_materials(
            &self.backend,
            scene,
            &self.default_material,
            &self.mat_collector,
            &self.tex_collector,
            out,
        )?;
        textures::update_textures(&self.backend, scene, &self.tex_collector, out)?;
        lights::update_lights(&self.backend, scene, &self.tex_collector, out)?;
        write_default_volume(&self.backend, out)?;
        accel::update_intersector(&mut self.intersector, scene, out)?;
        accel::reload_intersector(&mut self.intersector, out)?;

        self.active = Some(scene.id());
        scene.clear_dirty_flags();
        self.clear_material_dirty(scene);
        Ok(())
    }

    fn update_cached(&mut self, scene: &mut Scene, out: &mut CompiledScene<B>) -> Result<(), CompileError> {
        let flags = scene.dirty_flags();

        if flags.contains(SceneDirty::CAMERA) || scene.camera().is_some_and(|camera| camera.is_dirty()) {
            update_camera(&self.backend, scene, out)?;
        }

        if flags.contains(SceneDirty::LIGHTS) || scene.lights().any(|light| light.is_dirty()) {
            lights::update_lights(&self.backend, scene, &self.tex_collector, out)?;
        }

        let shapes_dirty =
            flags.contains(SceneDirty::SHAPES) || scene.shapes().any(|shape| scene.shape_is_dirty(shape));
        if shapes_dirty {
            geometry::update_geometry(&self.backend, scene, &self.mat_collector, out)?;
            accel::update_intersector(&mut self.intersector, scene, out)?;
            accel::reload_intersector(&mut self.intersector, out)?;
        }

        let materials_dirty = match &out.material_bundle {
            None => true,
            Some(bundle) => self.mat_collector.needs_update(bundle, |key| match key {
                MaterialRef::Default => false,
                MaterialRef::Scene(id) => scene.material(id).is_dirty(),
            }),
        };
        if materials_dirty {
            materials::update_materials(
                &self.backend,
                scene,
                &self.default_material,
                &self.mat_collector,
                &self.tex_collector,
                out,
            )?;
        }

        let textures_dirty = !self.tex_collector.is_empty()
            && match &out.texture_bundle {
                None => true,
                Some(bundle) => self
                    .tex_collector
                    .needs_update(bundle, |id| scene.texture(id).is_dirty()),
            };
        if textures_dirty {
            textures::update_textures(&self.backend, scene, &self.tex_collector, out)?;
        }

        // Switching the active scene re-syncs the intersector even when
        // nothing else changed.
        if self.active != Some(scene.id()) {
            accel::reload_intersector(&mut self.intersector, out)?;
            self.active = Some(scene.id());
        }

        scene.clear_dirty_flags();
        self.clear_material_dirty(scene);
        Ok(())
    }

    fn clear_material_dirty(&self, scene: &mut Scene) {
        self.mat_collector.finalize(|key| {
            if let MaterialRef::Scene(id) = key {
                scene.material_mut(id).set_dirty(false);
            }
        });
    }
}

fn update_camera<B: ComputeBackend>(
    backend: &B,
    scene: &mut Scene,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let camera = scene.camera_mut().ok_or(CompileError::NoCamera)?;
    out.camera_type = if camera.aperture() > 0.0 {
        CameraType::Physical
    } else {
        CameraType::Default
    };

    {
        let mut record = backend.map_write(&mut out.camera)?;
        record[0] = GpuCamera {
            forward: camera.forward().extend(0.0),
            up: camera.up().extend(0.0),
            right: camera.right().extend(0.0),
            position: camera.position().extend(1.0),
            sensor_size: camera.sensor_size(),
            depth_range: camera.depth_range(),
            aperture: camera.aperture(),
            focal_length: camera.focal_length(),
            focus_distance: camera.focus_distance(),
            aspect_ratio: camera.aspect_ratio(),
        };
    }

    camera.set_dirty(false);
    Ok(())
}

/// A single default homogeneous volume; proper volume support would replace
/// this with a volume collector pass.
fn write_default_volume<B: ComputeBackend>(
    backend: &B,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let mut record = backend.map_write(&mut out.volumes)?;
    record[0] = GpuVolume {
        kind: 1,
        phase: 0,
        _pad: [0; 2],
        absorption: Vec4::new(0.09, 0.09, 0.09, 0.0),
        scattering: Vec4::new(0.1, 0.1, 0.1, 0.0),
        emission: Vec4::ZERO,
    };
    Ok(())
}
