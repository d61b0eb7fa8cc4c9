//! Writing captured frames to disk as PNG.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use planet_engine::device::CapturedFrame;

/// `planet-<unix seconds>-<milliseconds>.png`
pub fn capture_file_name(at: SystemTime) -> String {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("planet-{}-{:03}.png", since.as_secs(), since.subsec_millis())
}

/// Saves `frame` under `dir`, creating the directory if needed.
pub fn save_capture(dir: &Path, frame: CapturedFrame, at: SystemTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let (width, height) = (frame.width, frame.height);
    let image = frame
        .into_image()
        .with_context(|| format!("captured {width}x{height} frame has the wrong byte length"))?;

    let path = dir.join(capture_file_name(at));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn file_name_is_timestamped() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_042);
        assert_eq!(capture_file_name(at), "planet-1700000000-042.png");
    }

    #[test]
    fn writes_a_readable_png() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("captures");
        let frame = CapturedFrame {
            width: 2,
            height: 2,
            rgba: vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
        };

        let path = save_capture(&dir, frame, UNIX_EPOCH + Duration::from_secs(5)).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 1).0, [0, 0, 255, 255]);
        assert_eq!(path.parent(), Some(dir.as_path()));
    }

    #[test]
    fn short_frames_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let frame = CapturedFrame {
            width: 4,
            height: 4,
            rgba: vec![0; 8],
        };
        assert!(save_capture(tmp.path(), frame, SystemTime::now()).is_err());
    }
}
