//! The capture → estimate → evaluate → draw → display → log loop.

use std::io::Write;

use chrono::{Local, NaiveDateTime};

use crate::{
    display::DisplaySink,
    event_log::EventLog,
    overlay::{annotate, hud_text},
    pose::PoseEstimator,
    proximity::ProximityEvaluator,
    timer::{FpsCounter, Timer},
    video::CaptureSource,
};

/// What happened during one [`Monitor::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No frame was available; nothing was drawn or logged.
    Skipped,
    /// A frame was evaluated, displayed and logged.
    Processed { people: usize, violations: usize },
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Drives the distance monitor until the display goes inactive.
pub struct Monitor<C, P, D, W: Write> {
    capture: C,
    estimator: P,
    display: D,
    evaluator: ProximityEvaluator,
    log: EventLog<W>,
    status: String,
    overlay_text: bool,
    clock: fn() -> NaiveDateTime,

    fps: FpsCounter,
    t_capture: Timer,
    t_infer: Timer,
    t_draw: Timer,
}

impl<C, P, D, W> Monitor<C, P, D, W>
where
    C: CaptureSource,
    P: PoseEstimator,
    D: DisplaySink,
    W: Write,
{
    pub fn new(
        capture: C,
        estimator: P,
        display: D,
        evaluator: ProximityEvaluator,
        log: EventLog<W>,
    ) -> Self {
        Self {
            capture,
            estimator,
            display,
            evaluator,
            log,
            status: String::new(),
            overlay_text: false,
            clock: local_now,
            fps: FpsCounter::new("monitor"),
            t_capture: Timer::new("capture"),
            t_infer: Timer::new("infer"),
            t_draw: Timer::new("draw"),
        }
    }

    /// Sets the status label passed to the display after every rendered frame.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Enables drawing pair distances and the status line onto frames.
    pub fn overlay_text(mut self, enabled: bool) -> Self {
        self.overlay_text = enabled;
        self
    }

    /// Replaces the wall clock used for log timestamps.
    pub fn clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Processes at most one frame.
    pub fn step(&mut self) -> anyhow::Result<Step> {
        let Some(mut frame) = self.t_capture.time(|| self.capture.next_frame())? else {
            return Ok(Step::Skipped);
        };

        let poses = self.t_infer.time(|| self.estimator.process(&frame))?;
        let evaluation = self.evaluator.evaluate_poses(&poses);
        let hud = hud_text(&evaluation, self.evaluator.threshold());
        log::trace!("{} poses: {hud}", poses.len());

        self.t_draw
            .time(|| annotate(&mut frame, &evaluation, &hud, self.overlay_text));

        self.display.render(&frame)?;
        self.display.set_status(&self.status);

        let (people, violations) = (evaluation.people(), evaluation.violations());
        self.log.record((self.clock)(), people, violations);

        self.fps
            .tick_with([&self.t_capture, &self.t_infer, &self.t_draw]);

        Ok(Step::Processed { people, violations })
    }

    /// Runs until the display reports it is no longer active.
    ///
    /// Fails if a step fails or if the display stopped because of an error. The event log session
    /// is closed either way. On success, returns the log's writer (if logging was enabled).
    pub fn run(mut self) -> anyhow::Result<Option<W>> {
        log::info!(
            "monitoring with a threshold of {}px",
            self.evaluator.threshold()
        );
        self.log.start_session((self.clock)());

        let mut result = Ok(());
        while self.display.is_active() {
            if let Err(e) = self.step() {
                result = Err(e);
                break;
            }
        }

        log::info!("monitor stopped");
        let result = result.and_then(|()| self.display.finish());
        let out = self.log.end_session((self.clock)());
        result.map(|()| out)
    }
}
