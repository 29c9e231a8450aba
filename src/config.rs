//! Runtime configuration.
//!
//! Everything has a fixed default. The only environment override is the pose model path
//! (`SOCIAL_DISTANCE_MODEL`), since the model is not shipped with the binary.

use std::{
    env::{self, VarError},
    path::{Path, PathBuf},
};

use anyhow::bail;

use crate::{image::Resolution, video::webcam::WebcamOptions};

/// Pixel distance below which two people are considered too close.
pub const DEFAULT_THRESHOLD_PX: f32 = 180.0;
/// Minimum confidence for a keypoint (and a person) to count as detected.
pub const DEFAULT_KEYPOINT_THRESHOLD: f32 = 0.15;
/// Capture devices, in the order they are tried.
pub const DEFAULT_CAMERAS: [&str; 2] = ["/dev/video0", "/dev/video1"];
pub const DEFAULT_DISPLAY: &str = "display://0";
pub const STATUS_LABEL: &str = "SocialDistance (poseNet)";
const LOG_FILE_NAME: &str = "room.log";
const MODEL_FILE_NAME: &str = "movenet_multipose.onnx";
const ENV_VAR_MODEL: &str = "SOCIAL_DISTANCE_MODEL";

#[derive(Debug, Clone)]
pub struct Config {
    /// Pixel distance threshold; pairs strictly closer than this are violations.
    pub threshold_px: f32,
    pub keypoint_threshold: f32,
    pub cameras: Vec<String>,
    /// Preferred capture resolution. `None` picks the largest the camera offers.
    pub camera_resolution: Option<Resolution>,
    /// Minimum capture frame rate.
    pub camera_fps: Option<u32>,
    pub display: String,
    pub status: String,
    pub model_path: PathBuf,
    /// Resolution frames are resampled to for the pose network.
    pub model_input: Resolution,
    pub log_path: PathBuf,
    /// Draw pair distances and the status line onto the frame.
    pub overlay_text: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_base_dir(&base_dir())
    }
}

impl Config {
    /// Creates the default configuration with model and log file placed in `dir`.
    pub fn with_base_dir(dir: &Path) -> Self {
        Self {
            threshold_px: DEFAULT_THRESHOLD_PX,
            keypoint_threshold: DEFAULT_KEYPOINT_THRESHOLD,
            cameras: DEFAULT_CAMERAS.iter().map(|s| s.to_string()).collect(),
            camera_resolution: None,
            camera_fps: None,
            display: DEFAULT_DISPLAY.to_string(),
            status: STATUS_LABEL.to_string(),
            model_path: dir.join(MODEL_FILE_NAME),
            model_input: Resolution::new(256, 256),
            log_path: dir.join(LOG_FILE_NAME),
            overlay_text: false,
        }
    }

    /// Loads the default configuration and applies environment overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        match env::var(ENV_VAR_MODEL) {
            Ok(path) => {
                log::debug!("model override: `{ENV_VAR_MODEL}` is set to '{path}'");
                config.model_path = path.into();
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(s)) => {
                bail!(
                    "invalid value set for `{ENV_VAR_MODEL}` variable: {}",
                    s.to_string_lossy()
                );
            }
        }
        Ok(config)
    }

    /// Returns the format negotiation options for opening a camera.
    pub fn webcam_options(&self) -> WebcamOptions {
        let mut options = WebcamOptions::default();
        if let Some(res) = self.camera_resolution {
            options = options.resolution(res);
        }
        if let Some(fps) = self.camera_fps {
            options = options.fps(fps);
        }
        options
    }
}

/// The directory containing the running executable, or the working directory if that cannot be
/// determined.
fn base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::with_base_dir(Path::new("/opt/monitor"));
        assert_eq!(config.threshold_px, 180.0);
        assert_eq!(config.keypoint_threshold, 0.15);
        assert_eq!(config.cameras, ["/dev/video0", "/dev/video1"]);
        assert_eq!(config.display, "display://0");
        assert_eq!(config.log_path, Path::new("/opt/monitor/room.log"));
        assert_eq!(
            config.model_path,
            Path::new("/opt/monitor/movenet_multipose.onnx")
        );
        assert!(!config.overlay_text);
        assert_eq!(config.webcam_options(), WebcamOptions::default());
    }

    #[test]
    fn camera_preferences() {
        let mut config = Config::with_base_dir(Path::new("/opt/monitor"));
        config.camera_resolution = Some(Resolution::RES_720P);
        config.camera_fps = Some(30);
        assert_eq!(
            config.webcam_options(),
            WebcamOptions::default()
                .resolution(Resolution::RES_720P)
                .fps(30)
        );
    }

    #[test]
    fn default_dir_is_absolute_or_empty() {
        let config = Config::default();
        let dir = config.log_path.parent().unwrap();
        assert!(dir.is_absolute() || dir.as_os_str().is_empty());
    }
}
