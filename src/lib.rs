//! Watches a camera for people standing too close to each other.
//!
//! Every frame goes through pose estimation. Each detected person is reduced to one reference
//! point (the midpoint of their hips, or of their shoulders when the hips aren't visible), and
//! every pair of reference points closer than a pixel threshold is a violation. Frames are
//! annotated and shown in a window, and per-frame counts are appended to a plain-text log.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter, in [`env_logger`] syntax.
//! - `SOCIAL_DISTANCE_MODEL`: path to the MoveNet MultiPose ONNX model.

pub mod config;
pub mod display;
pub mod event_log;
pub mod image;
pub mod monitor;
pub mod overlay;
pub mod pose;
pub mod proximity;
pub mod timer;
pub mod video;

use log::LevelFilter;

#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(module_path!()), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library log at *debug* level, `wgpu` at *warn* level. `RUST_LOG`
/// overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
