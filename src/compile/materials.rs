use bytemuck::Zeroable;
use log::debug;

use crate::collector::Collector;
use crate::compile::compiled::{ensure_capacity, CompiledScene, GpuMaterial, NO_INDEX};
use crate::compile::MaterialRef;
use crate::compute::ComputeBackend;
use crate::error::CompileError;
use crate::scene::{Bxdf, Input, Material, Scene, TextureId};

/// Serializes every committed material in collector index order, refreshes
/// the stored bundle and clears the serialized materials' dirty flags.
pub(crate) fn update_materials<B: ComputeBackend>(
    backend: &B,
    scene: &mut Scene,
    default_material: &Material,
    materials: &Collector<MaterialRef>,
    textures: &Collector<TextureId>,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let count = materials.len();
    ensure_capacity(backend, &mut out.materials, count)?;
    debug!("material rebuild: {count} records");

    {
        let mut records = backend.map_write(&mut out.materials)?;
        for (slot, key) in materials.iter().enumerate() {
            let material = match key {
                MaterialRef::Default => default_material,
                MaterialRef::Scene(id) => scene.material(id),
            };
            records[slot] = write_material(material, materials, textures);
        }
    }

    out.material_count = count;
    out.material_bundle = Some(materials.bundle());

    materials.finalize(|key| {
        if let MaterialRef::Scene(id) = key {
            scene.material_mut(id).set_dirty(false);
        }
    });

    Ok(())
}

/// Builds the fixed-size device record for one material.
///
/// Invariant violations here (an input slot holding an unexpected value
/// kind) indicate a malformed material graph and panic rather than surface
/// as recoverable errors.
fn write_material(
    material: &Material,
    materials: &Collector<MaterialRef>,
    textures: &Collector<TextureId>,
) -> GpuMaterial {
    let mut record = GpuMaterial::zeroed();
    record.kind = material.kind() as i32;
    record.albedo_map = NO_INDEX;
    record.normal_map = NO_INDEX;
    record.roughness_map = NO_INDEX;
    record.base_material = NO_INDEX;
    record.top_material = NO_INDEX;

    match material.kind() {
        Bxdf::Zero => {
            record.albedo = glam::Vec4::ZERO;
        }

        Bxdf::MicrofacetGgx
        | Bxdf::MicrofacetBeckmann
        | Bxdf::MicrofacetRefractionGgx
        | Bxdf::MicrofacetRefractionBeckmann => {
            // Roughness resolves before the shared surface block. The block's
            // scalar default below only lands when the input is not a
            // constant, so a texture-driven roughness keeps its map index
            // with the default scalar beside it.
            match material.input("roughness") {
                Some(Input::Value(value)) => {
                    record.roughness = value.x;
                    record.roughness_map = NO_INDEX;
                }
                Some(Input::Texture(texture)) => {
                    record.roughness_map = texture_index(textures, texture);
                }
                _ => panic!("microfacet material requires a constant or texture roughness input"),
            }
            write_surface_inputs(material, textures, &mut record);
        }

        Bxdf::Lambert
        | Bxdf::Emissive
        | Bxdf::Passthrough
        | Bxdf::Translucent
        | Bxdf::IdealReflect
        | Bxdf::IdealRefract => {
            write_surface_inputs(material, textures, &mut record);
        }

        Bxdf::Mix | Bxdf::FresnelBlend => {
            match (material.input("base_material"), material.input("top_material")) {
                (Some(Input::Material(base)), Some(Input::Material(top))) => {
                    record.base_material = material_slot(materials, base);
                    record.top_material = material_slot(materials, top);
                }
                _ => panic!("compound material requires material-typed base and top inputs"),
            }

            if material.kind() == Bxdf::Mix {
                record.fresnel = 0.0;
                match material.input("weight") {
                    Some(Input::Texture(texture)) => {
                        record.roughness_map = texture_index(textures, texture);
                    }
                    Some(Input::Value(value)) => {
                        record.roughness_map = NO_INDEX;
                        record.roughness = value.x;
                    }
                    _ => panic!("mix material requires a constant or texture weight input"),
                }
            } else {
                record.fresnel = 1.0;
                match material.input("ior") {
                    Some(Input::Value(value)) => record.ior = value.x,
                    _ => panic!("fresnel blend material requires a constant ior input"),
                }
            }
        }
    }

    record
}

/// Field block shared by the single-function surface models: albedo, normal
/// or bump map, fresnel flag, index of refraction and the roughness scalar
/// default. Both the diffuse-family arm and the microfacet arm call this.
fn write_surface_inputs(material: &Material, textures: &Collector<TextureId>, record: &mut GpuMaterial) {
    match material.input("albedo") {
        Some(Input::Value(value)) => {
            record.albedo = value;
            record.albedo_map = NO_INDEX;
        }
        Some(Input::Texture(texture)) => {
            record.albedo_map = texture_index(textures, texture);
        }
        _ => panic!("surface material requires a constant or texture albedo input"),
    }

    // A normal map wins over a bump map when both are present; the flag
    // records which interpretation the shader should use.
    match material.input("normal") {
        Some(Input::Texture(texture)) => {
            record.normal_map = texture_index(textures, texture);
            record.bump_flag = 0;
        }
        _ => match material.input("bump") {
            Some(Input::Texture(texture)) => {
                record.normal_map = texture_index(textures, texture);
                record.bump_flag = 1;
            }
            _ => {
                record.normal_map = NO_INDEX;
                record.bump_flag = 0;
            }
        },
    }

    record.fresnel = match material.input("fresnel") {
        Some(Input::Value(value)) if value.x > 0.0 => 1.0,
        _ => 0.0,
    };

    record.ior = match material.input("ior") {
        Some(Input::Value(value)) => value.x,
        _ => 1.0,
    };

    record.roughness = match material.input("roughness") {
        Some(Input::Value(value)) => value.x,
        _ => 0.99,
    };
}

fn texture_index(textures: &Collector<TextureId>, texture: TextureId) -> i32 {
    textures
        .item_index(texture)
        .expect("material texture missing from committed collector") as i32
}

fn material_slot(materials: &Collector<MaterialRef>, material: crate::scene::MaterialId) -> i32 {
    materials
        .item_index(MaterialRef::Scene(material))
        .expect("sub-material missing from committed collector") as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn committed_materials(keys: &[MaterialRef]) -> Collector<MaterialRef> {
        let mut collector = Collector::new();
        collector.collect(keys.iter().copied(), |key| [key]);
        collector.commit();
        collector
    }

    fn committed_textures(keys: &[TextureId]) -> Collector<TextureId> {
        let mut collector = Collector::new();
        collector.collect(keys.iter().copied(), |key| [key]);
        collector.commit();
        collector
    }

    #[test]
    fn diffuse_constant_albedo() {
        let material = Material::new(Bxdf::Lambert)
            .with_input("albedo", Input::Value(Vec4::new(0.8, 0.4, 0.2, 1.0)));
        let record = write_material(&material, &committed_materials(&[]), &committed_textures(&[]));

        assert_eq!(record.kind, Bxdf::Lambert as i32);
        assert_eq!(record.albedo, Vec4::new(0.8, 0.4, 0.2, 1.0));
        assert_eq!(record.albedo_map, NO_INDEX);
        assert_eq!(record.normal_map, NO_INDEX);
        assert_eq!(record.fresnel, 0.0);
        assert_eq!(record.ior, 1.0);
        assert_eq!(record.roughness, 0.99);
    }

    #[test]
    fn textured_albedo_resolves_collector_index() {
        let textures = committed_textures(&[5, 9]);
        let material = Material::new(Bxdf::Lambert).with_input("albedo", Input::Texture(9));
        let record = write_material(&material, &committed_materials(&[]), &textures);
        assert_eq!(record.albedo_map, 1);
    }

    #[test]
    fn normal_map_wins_over_bump_map() {
        let textures = committed_textures(&[3, 4]);
        let material = Material::new(Bxdf::Lambert)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("normal", Input::Texture(3))
            .with_input("bump", Input::Texture(4));
        let record = write_material(&material, &committed_materials(&[]), &textures);
        assert_eq!(record.normal_map, 0);
        assert_eq!(record.bump_flag, 0);

        let bump_only = Material::new(Bxdf::Lambert)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("bump", Input::Texture(4));
        let record = write_material(&bump_only, &committed_materials(&[]), &textures);
        assert_eq!(record.normal_map, 1);
        assert_eq!(record.bump_flag, 1);
    }

    #[test]
    fn fresnel_flag_derives_from_positive_constant() {
        let enabled = Material::new(Bxdf::IdealReflect)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("fresnel", Input::Value(Vec4::splat(1.0)))
            .with_input("ior", Input::Value(Vec4::splat(1.5)));
        let record = write_material(&enabled, &committed_materials(&[]), &committed_textures(&[]));
        assert_eq!(record.fresnel, 1.0);
        assert_eq!(record.ior, 1.5);

        let disabled = Material::new(Bxdf::IdealReflect)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("fresnel", Input::Value(Vec4::splat(0.0)));
        let record = write_material(&disabled, &committed_materials(&[]), &committed_textures(&[]));
        assert_eq!(record.fresnel, 0.0);
    }

    #[test]
    fn microfacet_constant_roughness_lands_in_scalar() {
        let material = Material::new(Bxdf::MicrofacetGgx)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("roughness", Input::Value(Vec4::splat(0.25)));
        let record = write_material(&material, &committed_materials(&[]), &committed_textures(&[]));
        assert_eq!(record.roughness, 0.25);
        assert_eq!(record.roughness_map, NO_INDEX);
    }

    #[test]
    fn microfacet_texture_roughness_keeps_map_and_default_scalar() {
        let textures = committed_textures(&[7]);
        let material = Material::new(Bxdf::MicrofacetRefractionBeckmann)
            .with_input("albedo", Input::Value(Vec4::ONE))
            .with_input("roughness", Input::Texture(7));
        let record = write_material(&material, &committed_materials(&[]), &textures);
        assert_eq!(record.roughness_map, 0);
        // The shared block's default applies because the input is no
        // constant.
        assert_eq!(record.roughness, 0.99);
    }

    #[test]
    fn mix_forces_fresnel_off_and_stores_sub_materials() {
        let materials = committed_materials(&[
            MaterialRef::Scene(0),
            MaterialRef::Scene(1),
            MaterialRef::Scene(2),
        ]);
        let material = Material::new(Bxdf::Mix)
            .with_input("base_material", Input::Material(1))
            .with_input("top_material", Input::Material(2))
            .with_input("weight", Input::Value(Vec4::splat(0.3)));
        let record = write_material(&material, &materials, &committed_textures(&[]));

        assert_eq!(record.fresnel, 0.0);
        assert_eq!(record.base_material, 1);
        assert_eq!(record.top_material, 2);
        assert_eq!(record.roughness, 0.3);
        assert_eq!(record.roughness_map, NO_INDEX);
    }

    #[test]
    fn fresnel_blend_forces_fresnel_on() {
        let materials = committed_materials(&[MaterialRef::Scene(0), MaterialRef::Scene(1)]);
        let material = Material::new(Bxdf::FresnelBlend)
            .with_input("base_material", Input::Material(0))
            .with_input("top_material", Input::Material(1))
            .with_input("ior", Input::Value(Vec4::splat(1.33)));
        let record = write_material(&material, &materials, &committed_textures(&[]));

        assert_eq!(record.fresnel, 1.0);
        assert_eq!(record.ior, 1.33);
    }

    #[test]
    #[should_panic(expected = "constant ior input")]
    fn fresnel_blend_without_ior_is_an_invariant_violation() {
        let materials = committed_materials(&[MaterialRef::Scene(0), MaterialRef::Scene(1)]);
        let material = Material::new(Bxdf::FresnelBlend)
            .with_input("base_material", Input::Material(0))
            .with_input("top_material", Input::Material(1));
        write_material(&material, &materials, &committed_textures(&[]));
    }

    #[test]
    fn zero_material_writes_zero_color() {
        let record = write_material(
            &Material::new(Bxdf::Zero),
            &committed_materials(&[]),
            &committed_textures(&[]),
        );
        assert_eq!(record.albedo, Vec4::ZERO);
        assert_eq!(record.kind, 0);
    }
}
