//! Reference points and pairwise distance checks.
//!
//! Every detected person is reduced to a single [`Point`] (see [`reference_point`]). The
//! [`ProximityEvaluator`] then compares every unordered pair of points against a distance
//! threshold in pixels.

use std::fmt;

use itertools::Itertools;

use crate::pose::{BodyPart, PersonPose};

/// A 2D position in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the point halfway between `self` and `other`.
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Computes the Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

fn pair_midpoint(pose: &PersonPose, left: BodyPart, right: BodyPart) -> Option<Point> {
    let l = Point::from(pose.get(left)?);
    let r = Point::from(pose.get(right)?);
    Some(l.midpoint(r))
}

/// Derives the position of one person.
///
/// This is the midpoint of the hips if both are present, otherwise the midpoint of the shoulders
/// if both of those are present. A person with neither pair yields [`None`] and is left out of
/// the distance checks.
pub fn reference_point(pose: &PersonPose) -> Option<Point> {
    pair_midpoint(pose, BodyPart::LeftHip, BodyPart::RightHip)
        .or_else(|| pair_midpoint(pose, BodyPart::LeftShoulder, BodyPart::RightShoulder))
}

/// Collects the [`reference_point`] of every pose that has one, in pose order.
pub fn reference_points(poses: &[PersonPose]) -> Vec<Point> {
    poses.iter().filter_map(reference_point).collect()
}

/// Two reference points and the distance between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair {
    /// Index of the first point. Always less than `b`.
    pub a: usize,
    /// Index of the second point.
    pub b: usize,
    pub distance: f32,
    /// Whether the two points are closer than the threshold.
    pub violating: bool,
}

/// The result of checking one frame's reference points.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    points: Vec<Point>,
    pairs: Vec<Pair>,
    violations: usize,
}

impl Evaluation {
    /// The reference points, one per counted person.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Every unordered pair of points, in `(a, b)` enumeration order.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Returns the number of people (reference points) in the frame.
    #[inline]
    pub fn people(&self) -> usize {
        self.points.len()
    }

    /// Returns the number of violating pairs.
    #[inline]
    pub fn violations(&self) -> usize {
        self.violations
    }

    /// Returns the two endpoints of `pair`.
    pub fn endpoints(&self, pair: &Pair) -> (Point, Point) {
        (self.points[pair.a], self.points[pair.b])
    }
}

/// Classifies pairs of reference points against a fixed distance threshold.
#[derive(Debug, Clone, Copy)]
pub struct ProximityEvaluator {
    threshold: f32,
}

impl ProximityEvaluator {
    /// Creates an evaluator flagging pairs closer than `threshold` pixels.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is negative or not finite.
    pub fn new(threshold: f32) -> Self {
        assert!(
            threshold.is_finite() && threshold >= 0.0,
            "invalid proximity threshold {threshold}"
        );
        Self { threshold }
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Returns whether two points at `distance` from each other are too close.
    ///
    /// The comparison is strict: a distance equal to the threshold is not a violation.
    #[inline]
    pub fn is_violation(&self, distance: f32) -> bool {
        distance < self.threshold
    }

    /// Checks every unordered pair of `points`.
    pub fn evaluate(&self, points: Vec<Point>) -> Evaluation {
        let pairs = (0..points.len())
            .tuple_combinations()
            .map(|(a, b)| {
                let distance = points[a].distance(points[b]);
                Pair {
                    a,
                    b,
                    distance,
                    violating: self.is_violation(distance),
                }
            })
            .collect::<Vec<_>>();
        let violations = pairs.iter().filter(|pair| pair.violating).count();

        Evaluation {
            points,
            pairs,
            violations,
        }
    }

    /// Derives the reference points of `poses` and evaluates them.
    pub fn evaluate_poses(&self, poses: &[PersonPose]) -> Evaluation {
        self.evaluate(reference_points(poses))
    }
}
