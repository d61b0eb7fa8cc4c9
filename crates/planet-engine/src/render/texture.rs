use std::path::Path;

use anyhow::{Context, Result};

use super::backend::{Backend, TextureId};
use super::context::RenderContext;

/// Uploaded 2D RGBA texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
}

impl Texture {
    /// Uploads raw RGBA8 pixels.
    pub fn from_rgba<B: Backend>(
        ctx: &mut RenderContext<B>,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "texture `{label}` has zero size");
        let expected = width as usize * height as usize * 4;
        anyhow::ensure!(
            rgba.len() == expected,
            "texture `{label}`: expected {expected} bytes for {width}x{height}, got {}",
            rgba.len()
        );

        let id = ctx.backend_mut().create_texture(label, width, height, rgba);
        Ok(Self { id, width, height })
    }

    pub fn from_image<B: Backend>(ctx: &mut RenderContext<B>, label: &str, image: &image::RgbaImage) -> Result<Self> {
        Self::from_rgba(ctx, label, image.width(), image.height(), image.as_raw())
    }

    /// Decodes the image at `path` and uploads it.
    pub fn load<B: Backend>(ctx: &mut RenderContext<B>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?
            .to_rgba8();
        log::debug!("loaded texture {} ({}x{})", path.display(), image.width(), image.height());
        Self::from_image(ctx, &path.display().to_string(), &image)
    }

    /// Activates this texture at `unit`.
    pub fn bind<B: Backend>(&self, ctx: &mut RenderContext<B>, unit: u32) {
        ctx.backend_mut().bind_texture(unit, self.id);
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{Call, RecordingBackend};

    #[test]
    fn rejects_mismatched_pixel_data() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        assert!(Texture::from_rgba(&mut ctx, "bad", 2, 2, &[0; 12]).is_err());
        assert!(Texture::from_rgba(&mut ctx, "empty", 0, 4, &[]).is_err());
        assert!(ctx.backend().calls().is_empty());
    }

    #[test]
    fn bind_targets_the_requested_unit() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]));
        let tex = Texture::from_image(&mut ctx, "red", &image).unwrap();
        assert_eq!(tex.size(), (4, 2));

        tex.bind(&mut ctx, 2);
        assert_eq!(ctx.backend().calls().last(), Some(&Call::BindTexture {
            unit: 2,
            texture: tex.id(),
        }));
    }

    #[test]
    fn load_reports_missing_files() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let err = Texture::load(&mut ctx, "definitely/not/here.png").unwrap_err();
        assert!(format!("{err:#}").contains("here.png"));
    }
}
