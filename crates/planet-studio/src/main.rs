mod app;
mod assets;
mod capture;
mod config;
mod frame;
mod geometry;
mod panel;
mod programs;
mod scene;
mod stats;

use planet_engine::device::GpuInit;
use planet_engine::logging::{init_logging, LoggingConfig};
use planet_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use app::StudioApp;
use config::StudioConfig;

fn main() {
    init_logging(LoggingConfig::with_default_filter(log::LevelFilter::Info));

    let config = StudioConfig::from_env();
    log::debug!("{config:?}");

    let runtime = RuntimeConfig {
        title: "planet studio".to_string(),
        initial_size: LogicalSize::new(config.window_size.0, config.window_size.1),
    };

    if let Err(e) = Runtime::run(runtime, GpuInit::default(), StudioApp::new(config)) {
        log::error!("planet studio failed: {e:#}");
        std::process::exit(1);
    }
}
