use bytemuck::Zeroable;
use log::debug;

use crate::collector::Collector;
use crate::compile::compiled::{ensure_capacity, CompiledScene, GpuLight, LightType, NO_INDEX};
use crate::compile::partition;
use crate::compute::ComputeBackend;
use crate::error::CompileError;
use crate::scene::{Light, LightKind, Scene, TextureId};

/// Serializes the scene's lights in enumeration order, tracking the
/// environment-light index, and clears their dirty flags.
pub(crate) fn update_lights<B: ComputeBackend>(
    backend: &B,
    scene: &mut Scene,
    textures: &Collector<TextureId>,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let count = scene.light_count();
    ensure_capacity(backend, &mut out.lights, count)?;
    debug!("light rebuild: {count} lights");

    // No environment until an image-based light shows up; the last one seen
    // wins.
    out.environment_light = NO_INDEX;

    {
        let mut records = backend.map_write(&mut out.lights)?;
        for (slot, light) in scene.lights().enumerate() {
            records[slot] = write_light(scene, light, textures);
            if matches!(light.kind(), LightKind::ImageBased { .. }) {
                out.environment_light = slot as i32;
            }
        }
    }

    out.light_count = count;

    for light in scene.lights_mut() {
        light.set_dirty(false);
    }

    Ok(())
}

fn write_light(scene: &Scene, light: &Light, textures: &Collector<TextureId>) -> GpuLight {
    let mut record = GpuLight::zeroed();
    record.shape_index = NO_INDEX;
    record.texture = NO_INDEX;
    record.texture_diffuse = NO_INDEX;

    match *light.kind() {
        LightKind::Point { position, radiance } => {
            record.kind = LightType::Point as i32;
            record.position = position.extend(1.0);
            record.radiance = radiance.extend(0.0);
        }
        LightKind::Directional { direction, radiance } => {
            record.kind = LightType::Directional as i32;
            record.direction = direction.extend(0.0);
            record.radiance = radiance.extend(0.0);
        }
        LightKind::Spot {
            position,
            direction,
            radiance,
            cone,
        } => {
            record.kind = LightType::Spot as i32;
            record.position = position.extend(1.0);
            record.direction = direction.extend(0.0);
            record.radiance = radiance.extend(0.0);
            record.cone = cone;
        }
        LightKind::ImageBased { texture, multiplier } => {
            record.kind = LightType::ImageBased as i32;
            record.multiplier = multiplier;
            let index = textures
                .item_index(texture)
                .expect("light texture missing from committed collector") as i32;
            record.texture = index;
            record.texture_diffuse = index;
        }
        LightKind::Area { shape, prim_index } => {
            record.kind = LightType::Area as i32;
            record.shape_index = partition::shape_index(scene, shape)
                .map(|index| index as i32)
                .unwrap_or(NO_INDEX);
            record.prim_index = prim_index as i32;
        }
    }

    record
}
