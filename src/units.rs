//! Length conversions between the package's native unit and pixel space.
//!
//! Two transforms live here and they are not interchangeable:
//!
//! - [`to_pixels`] / [`to_native`] convert absolute lengths between EMUs
//!   (English Metric Units, 914 400 per inch) and 96 dpi pixels. Import uses
//!   this path exclusively.
//! - [`normalize_placement`] maps a pixel geometry onto fractions of the
//!   960×540 canvas. Export uses this path and then projects the fractions onto
//!   whatever container it writes.

use crate::Geometry;

pub const EMU_PER_INCH: i64 = 914_400;
pub const PIXELS_PER_INCH: i64 = 96;
pub const EMU_PER_PIXEL: i64 = EMU_PER_INCH / PIXELS_PER_INCH;

pub const CANVAS_WIDTH_PX: f64 = 960.0;
pub const CANVAS_HEIGHT_PX: f64 = 540.0;

/// Slide size written to exported packages, 10in × 5.625in.
pub const SLIDE_WIDTH_EMU: i64 = 9_144_000;
pub const SLIDE_HEIGHT_EMU: i64 = 5_143_500;

/// Converts a length in EMUs into pixels.
pub fn to_pixels(emu: i64) -> f64 {
    emu as f64 / EMU_PER_PIXEL as f64
}

/// Converts a length in pixels into EMUs, rounded to the nearest unit.
pub fn to_native(px: f64) -> i64 {
    (px * EMU_PER_PIXEL as f64).round() as i64
}

/// A rectangle expressed as fractions of the canvas (`0.0..=1.0` when on-canvas).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Placement {
    /// Projects the fractions onto a slide measured in EMUs.
    pub fn to_native_rect(&self, slide_width: i64, slide_height: i64) -> (i64, i64, i64, i64) {
        let sw = slide_width as f64;
        let sh = slide_height as f64;
        (
            (self.x * sw).round() as i64,
            (self.y * sh).round() as i64,
            (self.w * sw).round() as i64,
            (self.h * sh).round() as i64,
        )
    }

    /// Projects the fractions onto a page, returning `(x, y, w, h)` with the
    /// origin in the top-left corner.
    pub fn to_page_rect(&self, page_width: f64, page_height: f64) -> (f64, f64, f64, f64) {
        (
            self.x * page_width,
            self.y * page_height,
            self.w * page_width,
            self.h * page_height,
        )
    }
}

/// Maps a pixel geometry to fractions of the 960×540 canvas, applying scale.
pub fn normalize_placement(geometry: &Geometry) -> Placement {
    Placement {
        x: geometry.x / CANVAS_WIDTH_PX,
        y: geometry.y / CANVAS_HEIGHT_PX,
        w: geometry.width * geometry.scale_x() / CANVAS_WIDTH_PX,
        h: geometry.height * geometry.scale_y() / CANVAS_HEIGHT_PX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_matches_inch_ratio() {
        assert_eq!(EMU_PER_PIXEL, 9525);
        assert_eq!(to_pixels(EMU_PER_INCH), 96.0);
    }

    #[test]
    fn test_native_round_trip() {
        assert_eq!(to_pixels(914_400), 96.0);
        assert_eq!(to_native(100.0), 952_500);
        assert_eq!(to_native(to_pixels(1_828_800)), 1_828_800);
    }

    #[test]
    fn test_to_native_rounds() {
        assert_eq!(to_native(0.5), 4763);
        assert_eq!(to_native(-1.0), -9525);
    }

    #[test]
    fn test_canvas_matches_slide_size() {
        assert_eq!(to_native(CANVAS_WIDTH_PX), SLIDE_WIDTH_EMU);
        assert_eq!(to_native(CANVAS_HEIGHT_PX), SLIDE_HEIGHT_EMU);
    }

    #[test]
    fn test_normalize_placement_applies_scale() {
        let geometry = Geometry {
            x: 480.0,
            y: 270.0,
            width: 96.0,
            height: 54.0,
            scale_x: Some(2.0),
            scale_y: None,
        };
        let placement = normalize_placement(&geometry);
        assert_eq!(placement, Placement { x: 0.5, y: 0.5, w: 0.2, h: 0.1 });
    }

    #[test]
    fn test_placement_projection() {
        let placement = Placement { x: 0.5, y: 0.5, w: 0.25, h: 0.5 };
        assert_eq!(
            placement.to_native_rect(SLIDE_WIDTH_EMU, SLIDE_HEIGHT_EMU),
            (4_572_000, 2_571_750, 2_286_000, 2_571_750)
        );
        assert_eq!(placement.to_page_rect(720.0, 405.0), (360.0, 202.5, 180.0, 202.5));
    }
}
