use log::debug;

use crate::collector::Collector;
use crate::compile::compiled::{ensure_capacity, CompiledScene, GpuTexture};
use crate::compute::ComputeBackend;
use crate::error::CompileError;
use crate::scene::{Scene, TextureId};

/// Serializes the committed texture set: one descriptor per texture, then
/// the raw pixel bytes packed into the data blob at the descriptor offsets.
pub(crate) fn update_textures<B: ComputeBackend>(
    backend: &B,
    scene: &Scene,
    textures: &Collector<TextureId>,
    out: &mut CompiledScene<B>,
) -> Result<(), CompileError> {
    let count = textures.len();
    if count == 0 {
        // Single-element placeholders keep the backend bindings valid for a
        // textureless scene.
        ensure_capacity(backend, &mut out.textures, 1)?;
        ensure_capacity(backend, &mut out.texture_data, 1)?;
        out.texture_count = 0;
        return Ok(());
    }

    ensure_capacity(backend, &mut out.textures, count)?;

    let total_bytes: usize = textures.iter().map(|id| scene.texture(id).size_in_bytes()).sum();
    debug!("texture rebuild: {count} textures, {total_bytes} bytes");

    {
        let mut records = backend.map_write(&mut out.textures)?;
        let mut offset = 0;
        for (slot, id) in textures.iter().enumerate() {
            let texture = scene.texture(id);
            records[slot] = GpuTexture {
                width: texture.width() as i32,
                height: texture.height() as i32,
                format: texture.format() as i32,
                data_offset: offset as i32,
            };
            offset += texture.size_in_bytes();
        }
    }

    ensure_capacity(backend, &mut out.texture_data, total_bytes)?;

    {
        let mut blob = backend.map_write(&mut out.texture_data)?;
        let mut offset = 0;
        for id in textures.iter() {
            let texture = scene.texture(id);
            blob[offset..offset + texture.size_in_bytes()].copy_from_slice(texture.data());
            offset += texture.size_in_bytes();
        }
    }

    out.texture_count = count;
    out.texture_bundle = Some(textures.bundle());

    Ok(())
}
