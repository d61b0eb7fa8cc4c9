//! Planet engine crate.
//!
//! Platform + GPU runtime pieces and the rendering core used by the studio.

pub mod camera;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
