use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io,
    rc::Rc,
};

use anyhow::bail;
use chrono::{NaiveDate, NaiveDateTime};
use social_distance::{
    display::DisplaySink,
    event_log::EventLog,
    image::Image,
    monitor::{Monitor, Step},
    overlay::{MARKER_COLOR, OK_COLOR, VIOLATION_COLOR},
    pose::{BodyPart, PersonPose, PoseEstimator},
    proximity::ProximityEvaluator,
    video::CaptureSource,
};

/// Yields scripted frames, then nothing.
struct FakeCamera(VecDeque<Option<Image>>);

impl FakeCamera {
    fn new<I: IntoIterator<Item = Option<Image>>>(frames: I) -> Self {
        Self(frames.into_iter().collect())
    }
}

impl CaptureSource for FakeCamera {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        Ok(self.0.pop_front().flatten())
    }
}

/// Returns the same poses for every frame.
struct FixedPoses(Vec<PersonPose>);

impl PoseEstimator for FixedPoses {
    fn process(&mut self, _frame: &Image) -> anyhow::Result<Vec<PersonPose>> {
        Ok(self.0.clone())
    }
}

struct FailingEstimator;

impl PoseEstimator for FailingEstimator {
    fn process(&mut self, _frame: &Image) -> anyhow::Result<Vec<PersonPose>> {
        bail!("inference failed")
    }
}

#[derive(Default)]
struct Shown {
    frames: Vec<Image>,
    statuses: Vec<String>,
}

/// Stays active for a fixed number of `is_active` checks.
struct FakeDisplay {
    checks_left: Cell<usize>,
    shown: Rc<RefCell<Shown>>,
    failure: Option<&'static str>,
}

impl FakeDisplay {
    fn new(checks: usize) -> (Self, Rc<RefCell<Shown>>) {
        let shown = Rc::new(RefCell::new(Shown::default()));
        let display = Self {
            checks_left: Cell::new(checks),
            shown: shown.clone(),
            failure: None,
        };
        (display, shown)
    }
}

impl DisplaySink for FakeDisplay {
    fn is_active(&self) -> bool {
        let left = self.checks_left.get();
        self.checks_left.set(left.saturating_sub(1));
        left > 0
    }

    fn render(&mut self, frame: &Image) -> anyhow::Result<()> {
        self.shown.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.shown.borrow_mut().statuses.push(status.to_string());
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        match self.failure.take() {
            Some(msg) => bail!(msg),
            None => Ok(()),
        }
    }
}

/// A log writer that stays readable after the monitor consumed the log.
#[derive(Clone, Debug, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn lines(&self) -> Vec<String> {
        log_lines(self.0.borrow().clone())
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut *self.0.borrow_mut(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn person_at(x: f32, y: f32) -> PersonPose {
    PersonPose::with_parts([
        (BodyPart::LeftHip, [x, y]),
        (BodyPart::RightHip, [x, y]),
        (BodyPart::LeftShoulder, [x, y - 60.0]),
        (BodyPart::RightShoulder, [x, y - 60.0]),
    ])
}

/// Two people 100px apart and a third one 300px below the first.
fn crowd() -> Vec<PersonPose> {
    vec![
        person_at(50.0, 50.0),
        person_at(150.0, 50.0),
        person_at(50.0, 350.0),
    ]
}

fn frame() -> Image {
    Image::new(400, 400)
}

fn log_lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn logs_one_line_per_processed_frame() {
    let camera = FakeCamera::new([Some(frame()), None, Some(frame())]);
    let (display, shown) = FakeDisplay::new(3);

    let out = Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(Vec::new()),
    )
    .status("SocialDistance (poseNet)")
    .clock(noon)
    .run()
    .unwrap()
    .unwrap();

    assert_eq!(
        log_lines(out),
        [
            "--- START 2024-05-01 12:00:00 ---",
            "2024-05-01 12:00:00,people=3,viol=1",
            "2024-05-01 12:00:00,people=3,viol=1",
            "--- END 2024-05-01 12:00:00 ---",
        ]
    );

    let shown = shown.borrow();
    assert_eq!(shown.frames.len(), 2);
    assert_eq!(shown.statuses, ["SocialDistance (poseNet)"; 2]);
}

#[test]
fn annotates_rendered_frames() {
    let camera = FakeCamera::new([Some(frame())]);
    let (display, shown) = FakeDisplay::new(1);

    Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::<Vec<u8>>::disabled(),
    )
    .run()
    .unwrap();

    let shown = shown.borrow();
    let frame = &shown.frames[0];
    // Violating pair (0, 1) is joined in red, the others in green.
    assert_eq!(frame.get(100, 50), VIOLATION_COLOR);
    assert_eq!(frame.get(50, 200), OK_COLOR);
    assert_eq!(frame.get(100, 200), OK_COLOR);
    // Markers are drawn on top of the lines.
    assert_eq!(frame.get(50, 50), MARKER_COLOR);
    assert_eq!(frame.get(150, 50), MARKER_COLOR);
    assert_eq!(frame.get(50, 350), MARKER_COLOR);
}

#[test]
fn empty_scene_has_no_violations() {
    let camera = FakeCamera::new([Some(frame())]);
    let (display, shown) = FakeDisplay::new(1);

    let out = Monitor::new(
        camera,
        FixedPoses(Vec::new()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(Vec::new()),
    )
    .clock(noon)
    .run()
    .unwrap()
    .unwrap();

    assert_eq!(log_lines(out)[1], "2024-05-01 12:00:00,people=0,viol=0");
    // Nothing drawn.
    let shown = shown.borrow();
    assert!(shown.frames[0].data().iter().all(|&b| b == 0));
}

#[test]
fn step_reports_outcome() {
    let camera = FakeCamera::new([None, Some(frame())]);
    let (display, _shown) = FakeDisplay::new(0);

    let mut monitor = Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::<Vec<u8>>::disabled(),
    );
    assert_eq!(monitor.step().unwrap(), Step::Skipped);
    assert_eq!(
        monitor.step().unwrap(),
        Step::Processed {
            people: 3,
            violations: 1
        }
    );
}

#[test]
fn inactive_display_runs_no_frames() {
    let camera = FakeCamera::new([Some(frame())]);
    let (display, shown) = FakeDisplay::new(0);

    let out = Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(Vec::new()),
    )
    .clock(noon)
    .run()
    .unwrap()
    .unwrap();

    assert_eq!(
        log_lines(out),
        [
            "--- START 2024-05-01 12:00:00 ---",
            "--- END 2024-05-01 12:00:00 ---",
        ]
    );
    assert!(shown.borrow().frames.is_empty());
}

#[test]
fn estimator_error_stops_the_loop() {
    let camera = FakeCamera::new([Some(frame()), Some(frame())]);
    let (display, shown) = FakeDisplay::new(5);
    let out = SharedBuf::default();

    let err = Monitor::new(
        camera,
        FailingEstimator,
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(out.clone()),
    )
    .clock(noon)
    .run()
    .unwrap_err();

    assert_eq!(err.to_string(), "inference failed");
    assert!(shown.borrow().frames.is_empty());
    // The session is still closed.
    assert_eq!(
        out.lines(),
        [
            "--- START 2024-05-01 12:00:00 ---",
            "--- END 2024-05-01 12:00:00 ---",
        ]
    );
}

#[test]
fn display_failure_fails_the_run() {
    let camera = FakeCamera::new([Some(frame())]);
    let (mut display, shown) = FakeDisplay::new(1);
    display.failure = Some("failed to open window 'display://0'");
    let out = SharedBuf::default();

    let err = Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(out.clone()),
    )
    .clock(noon)
    .run()
    .unwrap_err();

    assert_eq!(err.to_string(), "failed to open window 'display://0'");
    assert_eq!(shown.borrow().frames.len(), 1);
    assert_eq!(
        out.lines(),
        [
            "--- START 2024-05-01 12:00:00 ---",
            "2024-05-01 12:00:00,people=3,viol=1",
            "--- END 2024-05-01 12:00:00 ---",
        ]
    );
}

struct BrokenPipe;

impl io::Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn log_failure_does_not_stop_the_loop() {
    let camera = FakeCamera::new([Some(frame()), Some(frame())]);
    let (display, shown) = FakeDisplay::new(2);

    let out = Monitor::new(
        camera,
        FixedPoses(crowd()),
        display,
        ProximityEvaluator::new(180.0),
        EventLog::new(BrokenPipe),
    )
    .run()
    .unwrap();

    assert!(out.is_none());
    assert_eq!(shown.borrow().frames.len(), 2);
}
