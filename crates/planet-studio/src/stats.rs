/// Frame-rate readout over fixed one-second windows.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FpsReport {
    pub fps: f32,
    pub mean_frame_ms: f32,
}

const WINDOW_SECS: f32 = 1.0;

impl FpsCounter {
    /// Records one frame of `dt` seconds. Returns a report when a window closes.
    pub fn record(&mut self, dt: f32) -> Option<FpsReport> {
        self.frames += 1;
        self.elapsed += dt.max(0.0);

        if self.elapsed < WINDOW_SECS {
            return None;
        }

        let report = FpsReport {
            fps: self.frames as f32 / self.elapsed,
            mean_frame_ms: self.elapsed * 1000.0 / self.frames as f32,
        };
        self.frames = 0;
        self.elapsed = 0.0;
        Some(report)
    }
}
