//! Startup textures: loaded from disk when configured, generated otherwise.

use std::path::Path;

use anyhow::Result;
use image::{Rgba, RgbaImage};
use planet_engine::render::{Backend, RenderContext, Texture};

use crate::config::StudioConfig;
use crate::scene::TextureKey;

#[derive(Debug, Clone)]
pub struct TextureBank {
    surface: Texture,
    detail: Texture,
}

impl TextureBank {
    pub fn load<B: Backend>(ctx: &mut RenderContext<B>, config: &StudioConfig) -> Result<Self> {
        Ok(Self {
            surface: load_or_generate(ctx, "surface", config.surface_texture.as_deref(), generated_surface)?,
            detail: load_or_generate(ctx, "detail", config.detail_texture.as_deref(), generated_detail)?,
        })
    }

    pub fn get(&self, key: TextureKey) -> &Texture {
        match key {
            TextureKey::Surface => &self.surface,
            TextureKey::Detail => &self.detail,
        }
    }
}

fn load_or_generate<B: Backend>(
    ctx: &mut RenderContext<B>,
    label: &str,
    path: Option<&Path>,
    generate: fn() -> RgbaImage,
) -> Result<Texture> {
    if let Some(path) = path {
        match Texture::load(ctx, path) {
            Ok(texture) => return Ok(texture),
            Err(e) => log::warn!("{e:#}; using generated {label} texture"),
        }
    }
    Texture::from_image(ctx, label, &generate())
}

fn hash2(x: u32, y: u32) -> u8 {
    let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0xC2B2_AE3D);
    h ^= h >> 13;
    (h & 0xFF) as u8
}

/// Equirectangular albedo: pale poles, warm tropics, per-texel grain.
pub fn generated_surface() -> RgbaImage {
    const W: u32 = 256;
    const H: u32 = 128;

    RgbaImage::from_fn(W, H, |x, y| {
        let lat = (y as f32 / (H - 1) as f32 - 0.5).abs() * 2.0;
        let grain = hash2(x, y) as f32 / 255.0 * 0.15;
        let polar = ((lat - 0.8) / 0.2).clamp(0.0, 1.0);
        let warm = 1.0 - lat;

        let r = 0.75 + 0.2 * warm + grain;
        let g = 0.72 + 0.1 * warm + grain;
        let b = 0.68 + grain;
        let mix = |c: f32| ((c * (1.0 - polar) + polar) * 255.0).clamp(0.0, 255.0) as u8;
        Rgba([mix(r), mix(g), mix(b), 255])
    })
}

/// Tileable gray speckle sampled at a higher frequency than the surface.
pub fn generated_detail() -> RgbaImage {
    const SIZE: u32 = 64;

    RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        let v = 180 + hash2(x + 1000, y + 7000) / 4;
        Rgba([v, v, v, 255])
    })
}
