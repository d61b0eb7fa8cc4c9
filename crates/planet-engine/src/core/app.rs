use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::{FrameCtx, WindowCtx};
use crate::device::Gpu;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Callbacks run on the event-loop thread, so everything an app does in
/// `on_window_event` or `on_resize` is applied before the next `on_frame`.
pub trait App {
    /// Called once after the window's GPU context exists. An error aborts the runtime.
    fn on_gpu_ready(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> anyhow::Result<()> {
        let _ = (window, gpu);
        Ok(())
    }

    /// Called after the surface was reconfigured to `width` x `height` physical pixels.
    fn on_resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
