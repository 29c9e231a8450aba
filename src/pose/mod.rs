//! Multi-person body pose estimation.
//!
//! A [`PoseEstimator`] turns a frame into a list of [`PersonPose`]s, one per detected person. Each
//! pose holds one [`Keypoint`] per [`BodyPart`], some of which may be absent.

pub mod movenet;

use crate::image::Image;

/// Anatomical keypoint index, in the order used by the pose networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
    Neck = 17,
}

impl BodyPart {
    /// The number of keypoints in a full [`PersonPose`].
    pub const COUNT: usize = 18;

    /// Returns the keypoint index of this body part.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single detected landmark.
///
/// A non-negative `id` marks the keypoint as present. Absent keypoints carry a negative `id` and
/// their coordinates are meaningless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    id: i32,
    x: f32,
    y: f32,
}

impl Keypoint {
    /// Creates a present keypoint for `part` at pixel coordinates `(x, y)`.
    pub fn new(part: BodyPart, x: f32, y: f32) -> Self {
        Self {
            id: part as i32,
            x,
            y,
        }
    }

    /// Creates an absent keypoint.
    pub const fn absent() -> Self {
        Self {
            id: -1,
            x: 0.0,
            y: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.id >= 0
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }
}

/// The keypoints of one detected person in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonPose {
    keypoints: Vec<Keypoint>,
}

impl Default for PersonPose {
    fn default() -> Self {
        Self {
            keypoints: vec![Keypoint::absent(); BodyPart::COUNT],
        }
    }
}

impl PersonPose {
    /// Creates a pose from keypoints ordered by [`BodyPart`] index.
    ///
    /// The list may be shorter than [`BodyPart::COUNT`]; missing entries are treated as absent.
    pub fn from_keypoints(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Builds a pose where only the given parts are present.
    pub fn with_parts<I: IntoIterator<Item = (BodyPart, [f32; 2])>>(parts: I) -> Self {
        let mut pose = Self::default();
        for (part, [x, y]) in parts {
            pose.set(part, x, y);
        }
        pose
    }

    /// Marks `part` as present at `(x, y)`.
    pub fn set(&mut self, part: BodyPart, x: f32, y: f32) {
        if self.keypoints.len() <= part.index() {
            self.keypoints.resize(part.index() + 1, Keypoint::absent());
        }
        self.keypoints[part.index()] = Keypoint::new(part, x, y);
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the coordinates of `part`, or [`None`] if the keypoint is absent or missing.
    pub fn get(&self, part: BodyPart) -> Option<[f32; 2]> {
        self.keypoints
            .get(part.index())
            .filter(|kp| kp.is_present())
            .map(|kp| [kp.x(), kp.y()])
    }

    /// Returns the number of keypoints that are present.
    pub fn num_present(&self) -> usize {
        self.keypoints.iter().filter(|kp| kp.is_present()).count()
    }
}

/// A pose-estimation engine.
pub trait PoseEstimator {
    /// Detects all people in `frame`, returning their poses in pixel coordinates of `frame`.
    fn process(&mut self, frame: &Image) -> anyhow::Result<Vec<PersonPose>>;
}

impl<P: PoseEstimator + ?Sized> PoseEstimator for Box<P> {
    fn process(&mut self, frame: &Image) -> anyhow::Result<Vec<PersonPose>> {
        (**self).process(frame)
    }
}
