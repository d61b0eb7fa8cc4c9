use anyhow::Result;
use winit::window::{Window, WindowId};

use crate::device::{CapturedFrame, FrameTarget, Gpu, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

/// Result of presenting a frame.
pub struct Presented {
    pub control: AppControl,
    /// Present only when a capture was requested and the frame was acquired.
    pub capture: Option<Result<CapturedFrame>>,
}

impl FrameCtx<'_, '_> {
    /// Acquires the next surface texture, lets `encode` record into it, presents,
    /// then reads the frame back when `capture` is set.
    ///
    /// Surface errors are handled here: the frame is skipped (`encode` is not
    /// called), or `Exit` is returned when the error is fatal.
    pub fn present_with_capture<F>(&mut self, capture: bool, encode: F) -> Presented
    where
        F: FnOnce(&mut wgpu::CommandEncoder, &FrameTarget<'_>),
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let control = match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("fatal surface error");
                        AppControl::Exit
                    }
                    _ => AppControl::Continue,
                };
                return Presented { control, capture: None };
            }
        };

        {
            let target = self.gpu.target(&frame.view);
            encode(&mut frame.encoder, &target);
        }

        self.window.window.pre_present_notify();
        let capture = if capture {
            Some(self.gpu.submit_and_capture(frame))
        } else {
            self.gpu.submit(frame);
            None
        };

        Presented {
            control: AppControl::Continue,
            capture,
        }
    }
}
