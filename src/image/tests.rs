use super::*;
use Color as C;

// Test-only color; not part of the public `Color` API.
impl Color {
    const RED: Self = Self([255, 0, 0, 255]);
}

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let data = data
        .into_iter()
        .flat_map(|row| row.into_iter())
        .flat_map(|col| col.0)
        .collect::<Vec<_>>();
    Image::from_rgba8(Resolution::new(W as u32, H as u32), &data)
}

#[test]
fn from_rgba8() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    assert_eq!(image.resolution(), Resolution::new(2, 2));
    assert_eq!(image.get(0, 0), C::RED);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(0, 1), C::BLUE);
    assert_eq!(image.get(1, 1), C::WHITE);
}

#[test]
#[should_panic(expected = "incorrect buffer size")]
fn from_rgba8_wrong_size() {
    Image::from_rgba8(Resolution::new(2, 2), &[0; 12]);
}

#[test]
fn clear() {
    let mut image = Image::new(3, 2);
    assert_eq!(image.get(2, 1), C::NULL);
    image.clear(C::WHITE);
    assert!(image.data().chunks(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn draw_horizontal_line() {
    let mut image = Image::new(5, 3);
    draw::line(&mut image, 0, 1, 4, 1).color(C::RED);
    for x in 0..5 {
        assert_eq!(image.get(x, 1), C::RED);
        assert_eq!(image.get(x, 0), C::NULL);
        assert_eq!(image.get(x, 2), C::NULL);
    }
}

#[test]
fn draw_thick_line() {
    let mut image = Image::new(5, 5);
    draw::line(&mut image, 0, 2, 4, 2)
        .color(C::GREEN)
        .stroke_width(3);
    for y in 1..=3 {
        assert_eq!(image.get(2, y), C::GREEN);
    }
    assert_eq!(image.get(2, 0), C::NULL);
    assert_eq!(image.get(2, 4), C::NULL);
}

#[test]
fn draw_filled_circle() {
    let mut image = Image::new(9, 9);
    draw::circle(&mut image, 4, 4, 2).color(C::BLUE).filled();
    assert_eq!(image.get(4, 4), C::BLUE);
    assert_eq!(image.get(4, 2), C::BLUE);
    assert_eq!(image.get(6, 4), C::BLUE);
    assert_eq!(image.get(0, 0), C::NULL);
    assert_eq!(image.get(8, 8), C::NULL);
}

#[test]
fn draw_circle_outline() {
    let mut image = Image::new(9, 9);
    draw::circle(&mut image, 4, 4, 3);
    assert_eq!(image.get(4, 4), C::NULL);
    assert_eq!(image.get(4, 1), C::GREEN);
}

#[test]
fn draw_out_of_bounds_is_clipped() {
    let mut image = Image::new(4, 4);
    draw::line(&mut image, -10, -10, 20, 20).color(C::RED);
    draw::circle(&mut image, 100, 100, 6).filled();
    for i in 0..4 {
        assert_eq!(image.get(i, i), C::RED);
    }
}

#[test]
fn draw_text() {
    let mut image = Image::new(40, 20);
    draw::text(&mut image, 1, 1, "viol").align_left().align_top();
    assert!(image.data().chunks(4).any(|px| px == [255, 255, 255, 255]));
}
