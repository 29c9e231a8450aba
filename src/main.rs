use anyhow::Context;
use social_distance::{
    config::Config,
    display::{self, WindowSink},
    event_log::EventLog,
    monitor::Monitor,
    pose::movenet::MoveNet,
    proximity::ProximityEvaluator,
    video::{open_first, webcam::Webcam},
};

fn main() -> anyhow::Result<()> {
    social_distance::init_logger!();

    let config = Config::from_env()?;
    log::debug!("{config:?}");

    display::run(move || {
        let sink = WindowSink::new(&config.display)?;
        let estimator = MoveNet::load(
            &config.model_path,
            config.model_input,
            config.keypoint_threshold,
        )
        .with_context(|| format!("failed to load model {}", config.model_path.display()))?;
        let options = config.webcam_options();
        let camera = open_first(&config.cameras, |path| Webcam::open(path, options))?;
        let log = EventLog::open(&config.log_path);

        log::info!(
            "display={} log={}",
            config.display,
            config.log_path.display()
        );

        Monitor::new(
            camera,
            estimator,
            sink,
            ProximityEvaluator::new(config.threshold_px),
            log,
        )
        .status(config.status)
        .overlay_text(config.overlay_text)
        .run()?;

        Ok(())
    })
}
