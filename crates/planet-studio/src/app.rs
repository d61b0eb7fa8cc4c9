use std::time::SystemTime;

use anyhow::{Context, Result};
use planet_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use planet_engine::device::Gpu;
use planet_engine::render::{RenderContext, WgpuBackend};

use crate::capture;
use crate::config::StudioConfig;
use crate::frame::Stage;
use crate::panel::Panel;
use crate::stats::FpsCounter;

/// Studio application driven by the engine runtime.
pub struct StudioApp {
    config: StudioConfig,
    running: Option<Running>,
}

/// State that exists once the GPU is up.
struct Running {
    ctx: RenderContext<WgpuBackend>,
    stage: Stage,
    panel: Panel,
    fps: FpsCounter,
}

impl StudioApp {
    pub fn new(config: StudioConfig) -> Self {
        Self { config, running: None }
    }
}

impl App for StudioApp {
    fn on_gpu_ready(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> Result<()> {
        let backend = WgpuBackend::new(gpu.device(), gpu.queue(), gpu.surface_format());
        let mut ctx = RenderContext::new(backend);
        let stage = Stage::new(&mut ctx, &self.config).context("failed to set up the scene")?;

        if !gpu.supports_capture() {
            log::warn!("frame capture is unavailable on this surface");
        }
        window.set_title("planet studio");
        log::info!("keys: 1/2/3 scenes, Tab/Up/Down edit, R reset, M mode, C capture, Esc quit");

        self.running = Some(Running {
            ctx,
            stage,
            panel: Panel::default(),
            fps: FpsCounter::default(),
        });
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if let Some(running) = &mut self.running {
            running.stage.resize(&mut running.ctx, width, height);
        }
    }

    fn on_frame(&mut self, fcx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(running) = &mut self.running else {
            return AppControl::Continue;
        };
        let Running { ctx, stage, panel, fps } = running;

        let outcome = panel.handle(fcx.input, fcx.input_frame, stage);
        if outcome.quit {
            return AppControl::Exit;
        }

        let dt = fcx.time.dt;
        stage.step(ctx, dt);

        let presented = fcx.present_with_capture(outcome.capture, |encoder, target| {
            ctx.backend_mut().encode(encoder, target);
        });

        match presented.capture {
            Some(Ok(frame)) => match capture::save_capture(&self.config.capture_dir, frame, SystemTime::now()) {
                Ok(path) => log::info!("saved capture {}", path.display()),
                Err(e) => log::warn!("capture failed: {e:#}"),
            },
            Some(Err(e)) => log::warn!("capture failed: {e:#}"),
            None if outcome.capture => log::warn!("capture skipped: no frame was presented"),
            None => {}
        }

        if let Some(report) = fps.record(dt) {
            log::info!("{:.1} fps ({:.2} ms/frame)", report.fps, report.mean_frame_ms);
        }

        presented.control
    }
}
