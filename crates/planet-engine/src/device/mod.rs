//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface and its depth attachment
//! - acquiring frames, presenting them, and reading them back for capture

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::{CapturedFrame, FrameTarget, GpuFrame};
pub use gpu::Gpu;
pub use init::GpuInit;
