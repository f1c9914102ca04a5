//! Conversions between on-screen (client) coordinates and the image pixel grid.
//!
//! The backing surface always has the bitmap's natural size, while the widget
//! may be displayed at any size. Everything the canvas emits is expressed in
//! the backing grid so annotations stay valid at every display scale.

use egui::{pos2, Pos2, Rect};

use crate::model::BoxRect;

/// Decimal digits kept by [`round4`].
const ROUND_FACTOR: f64 = 10_000.0;

/// Rounds to 4 decimal digits.
pub fn round4(v: f32) -> f32 {
    ((v as f64 * ROUND_FACTOR).round() / ROUND_FACTOR) as f32
}

/// Maps a client point into image space.
///
/// `bounds` is where the surface is laid out on screen and `pixel_size` its
/// backing resolution. Returns `None` for an unlaid-out surface (zero or
/// non-finite extent) or an empty backing buffer.
pub fn client_to_image(client: Pos2, bounds: Rect, pixel_size: [u32; 2]) -> Option<Pos2> {
    let display_w = bounds.width() as f64;
    let display_h = bounds.height() as f64;
    if !(display_w.is_finite() && display_h.is_finite()) || display_w <= 0.0 || display_h <= 0.0 {
        return None;
    }
    if pixel_size[0] == 0 || pixel_size[1] == 0 {
        return None;
    }
    if !(client.x.is_finite() && client.y.is_finite()) {
        return None;
    }

    let scale_x = pixel_size[0] as f64 / display_w;
    let scale_y = pixel_size[1] as f64 / display_h;
    let x = (client.x as f64 - bounds.min.x as f64) * scale_x;
    let y = (client.y as f64 - bounds.min.y as f64) * scale_y;
    Some(pos2(round4(x as f32), round4(y as f32)))
}

/// Builds the rectangle spanned by a drag, with the origin at the min corner
/// and a non-negative extent regardless of drag direction.
pub fn normalize_drag(anchor: Pos2, current: Pos2) -> BoxRect {
    BoxRect {
        x: anchor.x.min(current.x),
        y: anchor.y.min(current.y),
        width: (current.x - anchor.x).abs(),
        height: (current.y - anchor.y).abs(),
    }
}

/// Lays out a surface of `pixel_size` inside `available`, anchored top-left,
/// shrinking to fit while preserving aspect ratio. Never upscales.
pub fn fit_surface(available: Rect, pixel_size: [u32; 2]) -> Rect {
    let pw = pixel_size[0].max(1) as f32;
    let ph = pixel_size[1].max(1) as f32;
    let scale = (available.width() / pw)
        .min(available.height() / ph)
        .min(1.0)
        .max(0.0);
    Rect::from_min_size(available.min, egui::vec2(pw * scale, ph * scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(left: f32, top: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(left, top), egui::vec2(w, h))
    }

    #[test]
    fn identity_when_displayed_at_natural_size() {
        let p = client_to_image(pos2(110.0, 220.0), bounds(100.0, 200.0, 640.0, 480.0), [640, 480]);
        assert_eq!(p, Some(pos2(10.0, 20.0)));
    }

    #[test]
    fn half_size_display_doubles_coordinates() {
        let p = client_to_image(pos2(50.0, 25.0), bounds(0.0, 0.0, 320.0, 240.0), [640, 480]);
        assert_eq!(p, Some(pos2(100.0, 50.0)));
    }

    #[test]
    fn mapping_is_independent_of_display_scale() {
        let pixel = [1000, 750];
        let target = pos2(123.25, 456.5);
        for s in [0.1_f32, 0.33, 0.5, 0.75, 1.0, 1.7, 2.0, 3.3] {
            let b = bounds(37.0, 11.0, 1000.0 * s, 750.0 * s);
            let client = pos2(37.0 + target.x * s, 11.0 + target.y * s);
            let mapped = client_to_image(client, b, pixel).unwrap();
            assert!((mapped.x - target.x).abs() < 1e-2, "scale {s}: {mapped:?}");
            assert!((mapped.y - target.y).abs() < 1e-2, "scale {s}: {mapped:?}");
        }
    }

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(round4(1.234_56), 1.2346);
        assert_eq!(round4(-0.000_04), 0.0);
        // 1/3 scale produces a repeating fraction
        let p = client_to_image(pos2(1.0, 1.0), bounds(0.0, 0.0, 3.0, 3.0), [1, 1]).unwrap();
        assert_eq!(p.x, 0.3333);
    }

    #[test]
    fn unlaid_out_surface_yields_nothing() {
        assert_eq!(client_to_image(pos2(1.0, 1.0), bounds(0.0, 0.0, 0.0, 10.0), [10, 10]), None);
        assert_eq!(client_to_image(pos2(1.0, 1.0), Rect::NOTHING, [10, 10]), None);
        assert_eq!(client_to_image(pos2(1.0, 1.0), bounds(0.0, 0.0, 10.0, 10.0), [0, 10]), None);
        assert_eq!(
            client_to_image(pos2(f32::NAN, 1.0), bounds(0.0, 0.0, 10.0, 10.0), [10, 10]),
            None
        );
    }

    #[test]
    fn normalize_handles_every_drag_direction() {
        let expected = BoxRect { x: 10.0, y: 10.0, width: 40.0, height: 40.0 };
        assert_eq!(normalize_drag(pos2(10.0, 10.0), pos2(50.0, 50.0)), expected);
        assert_eq!(normalize_drag(pos2(50.0, 50.0), pos2(10.0, 10.0)), expected);
        assert_eq!(normalize_drag(pos2(50.0, 10.0), pos2(10.0, 50.0)), expected);
        assert_eq!(normalize_drag(pos2(10.0, 50.0), pos2(50.0, 10.0)), expected);
    }

    #[test]
    fn fit_surface_shrinks_but_never_grows() {
        let big = fit_surface(bounds(0.0, 0.0, 400.0, 400.0), [800, 400]);
        assert_eq!(big.size(), egui::vec2(400.0, 200.0));
        let small = fit_surface(bounds(5.0, 5.0, 400.0, 400.0), [100, 50]);
        assert_eq!(small, bounds(5.0, 5.0, 100.0, 50.0));
    }
}
