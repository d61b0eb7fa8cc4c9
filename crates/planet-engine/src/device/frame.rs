/// A single acquired frame.
///
/// Short-lived: holding the surface texture prevents acquisition of the next
/// frame. Finish it with `Gpu::submit` or `Gpu::submit_and_capture`.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// Attachments a frame is rendered into.
pub struct FrameTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// RGBA8 pixels of a presented frame, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl CapturedFrame {
    pub fn into_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba)
    }
}

/// Row pitch of a texture-to-buffer copy of `width` RGBA8 pixels.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strips row padding and converts BGRA to RGBA when `bgra` is set.
pub(crate) fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32, bgra: bool) -> Vec<u8> {
    let row = width as usize * 4;
    let mut out = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * padded_row as usize;
        let Some(src) = data.get(start..start + row) else {
            break;
        };
        out.extend_from_slice(src);
    }
    if bgra {
        for px in out.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pitch_is_aligned() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn unpad_drops_padding_and_swizzles() {
        let mut data = vec![0u8; 2 * 256];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        data[256..260].copy_from_slice(&[5, 6, 7, 8]);

        assert_eq!(unpad_rows(&data, 1, 2, 256, false), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(unpad_rows(&data, 1, 2, 256, true), vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn captured_frame_converts_to_image() {
        let frame = CapturedFrame {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 255, 0, 255],
        };
        let image = frame.into_image().unwrap();
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }
}
