use std::path::PathBuf;

use crate::geometry::MAX_SUBDIVISIONS;

/// Studio settings. Every field can be overridden with a `PLANET_*` variable.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    /// `PLANET_SUBDIVISIONS`
    pub subdivisions: u32,
    /// `PLANET_WINDOW_SIZE`, as `WIDTHxHEIGHT` logical pixels.
    pub window_size: (f64, f64),
    /// `PLANET_CAPTURE_DIR`
    pub capture_dir: PathBuf,
    /// `PLANET_SURFACE_TEXTURE`; a generated texture is used when unset or unreadable.
    pub surface_texture: Option<PathBuf>,
    /// `PLANET_DETAIL_TEXTURE`
    pub detail_texture: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            subdivisions: 6,
            window_size: (1280.0, 720.0),
            capture_dir: PathBuf::from("captures"),
            surface_texture: None,
            detail_texture: None,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`. Unparsable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("PLANET_SUBDIVISIONS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n <= MAX_SUBDIVISIONS => config.subdivisions = n,
                Ok(n) => {
                    log::warn!("PLANET_SUBDIVISIONS={n} exceeds {MAX_SUBDIVISIONS}, clamping");
                    config.subdivisions = MAX_SUBDIVISIONS;
                }
                Err(e) => log::warn!("ignoring PLANET_SUBDIVISIONS={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup("PLANET_WINDOW_SIZE") {
            match parse_size(&raw) {
                Some(size) => config.window_size = size,
                None => log::warn!("ignoring PLANET_WINDOW_SIZE={raw:?}: expected WIDTHxHEIGHT"),
            }
        }

        if let Some(dir) = lookup("PLANET_CAPTURE_DIR").filter(|s| !s.is_empty()) {
            config.capture_dir = PathBuf::from(dir);
        }
        config.surface_texture = lookup("PLANET_SURFACE_TEXTURE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        config.detail_texture = lookup("PLANET_DETAIL_TEXTURE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        config
    }
}

fn parse_size(raw: &str) -> Option<(f64, f64)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w >= 1.0 && h >= 1.0 && w.is_finite() && h.is_finite()).then_some((w, h))
}
