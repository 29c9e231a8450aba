//! Visual feedback drawn on top of each frame.

use crate::image::{draw, Color, Image};
use crate::proximity::{Evaluation, Point};

/// Line color for a pair of people that are too close.
pub const VIOLATION_COLOR: Color = Color::from_rgb8(255, 0, 0);
/// Line color for a pair of people that keep their distance.
pub const OK_COLOR: Color = Color::from_rgb8(0, 255, 0);
/// Color of the per-person marker.
pub const MARKER_COLOR: Color = Color::from_rgb8(0, 200, 255);
pub const TEXT_COLOR: Color = Color::WHITE;

const LINE_WIDTH: u32 = 3;
const MARKER_RADIUS: u32 = 6;

/// A surface that shapes can be drawn onto.
pub trait Overlay {
    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: u32);
    fn draw_circle(&mut self, center: Point, radius: u32, color: Color);
    /// Draws `text` with its top left corner at `pos`.
    fn draw_text(&mut self, pos: Point, text: &str, color: Color);
}

impl Overlay for Image {
    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: u32) {
        draw::line(
            self,
            from.x as i32,
            from.y as i32,
            to.x as i32,
            to.y as i32,
        )
        .color(color)
        .stroke_width(width);
    }

    fn draw_circle(&mut self, center: Point, radius: u32, color: Color) {
        draw::circle(self, center.x as i32, center.y as i32, radius)
            .color(color)
            .filled();
    }

    fn draw_text(&mut self, pos: Point, text: &str, color: Color) {
        draw::text(self, pos.x as i32, pos.y as i32, text)
            .color(color)
            .align_left()
            .align_top();
    }
}

/// Formats the heads-up status line for an evaluation.
///
/// The line starts with `ALERT!` when any pair is violating.
pub fn hud_text(evaluation: &Evaluation, threshold: f32) -> String {
    let hud = format!(
        "people={}  viol={}  thr={}px",
        evaluation.people(),
        evaluation.violations(),
        threshold,
    );
    if evaluation.violations() > 0 {
        format!("ALERT!  {hud}")
    } else {
        hud
    }
}

/// Draws pair lines and person markers for `evaluation`.
///
/// When `with_text` is set, the distance of every pair is printed next to its midpoint and the
/// `hud` line is printed in the top left corner.
pub fn annotate<O: Overlay + ?Sized>(
    target: &mut O,
    evaluation: &Evaluation,
    hud: &str,
    with_text: bool,
) {
    for pair in evaluation.pairs() {
        let (a, b) = evaluation.endpoints(pair);
        let color = if pair.violating {
            VIOLATION_COLOR
        } else {
            OK_COLOR
        };
        target.draw_line(a, b, color, LINE_WIDTH);

        if with_text {
            let mid = a.midpoint(b);
            let label = format!("{}", pair.distance as i32);
            target.draw_text(Point::new(mid.x - 8.0, mid.y - 12.0), &label, TEXT_COLOR);
        }
    }

    for &point in evaluation.points() {
        target.draw_circle(point, MARKER_RADIUS, MARKER_COLOR);
    }

    if with_text {
        target.draw_text(Point::new(10.0, 10.0), hud, TEXT_COLOR);
    }
}
