//! Diagnostic overlay rendering
//!
//! Produces the annotated frames handed to the frame recorder: the
//! binarized ROI band blended over the raw frame, the ROI bound rows, a
//! column marker for the detected error and a bottom-edge tick for the
//! current steering position.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::{Rgb, RgbImage};

// Internal
use crate::line_det::{self, binarize, box_blur, extract_band_channel};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Blend weights for the raw frame and the binarized band.
const FRAME_WEIGHT: f64 = 0.8;
const BAND_WEIGHT: f64 = 0.9;

/// Marker line thickness in pixels.
const MARKER_PX: u32 = 2;

/// Height of the steering tick on the bottom edge.
const STEERING_TICK_PX: u32 = 8;

const ROI_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const ERROR_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const STEERING_COLOUR: Rgb<u8> = Rgb([0, 0, 255]);

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Render the diagnostic overlay for one frame.
///
/// `error` is `None` on frames where no error/steering pair was produced
/// (bad frames), in which case only the band blend and ROI bounds are
/// drawn.
pub fn render_overlay(
    frame: &RgbImage,
    det_params: &line_det::Params,
    error: Option<f64>,
    steering: f64,
) -> RgbImage {
    let mut out = frame.clone();
    let (width, height) = frame.dimensions();
    let (bottom, top) = det_params.roi;

    let top_row = height - (height as f64 * top) as u32;
    let bottom_row = height - (height as f64 * bottom) as u32;

    // Blend the binarized band over the raw frame so the operator can see
    // exactly what detection saw
    let mut band = extract_band_channel(frame, (top_row, bottom_row), det_params.detection_channel);
    band = box_blur(&band, det_params.blur_kernel_px);
    binarize(&mut band, det_params.binary_threshold);

    for (x, y, px) in band.enumerate_pixels() {
        let out_px = out.get_pixel_mut(x, top_row + y);
        for c in 0..3 {
            let blended = out_px.0[c] as f64 * FRAME_WEIGHT + px.0[0] as f64 * BAND_WEIGHT;
            out_px.0[c] = blended.min(255.0) as u8;
        }
    }

    // ROI bound rows
    draw_row(&mut out, bottom_row, ROI_COLOUR);
    draw_row(&mut out, top_row, ROI_COLOUR);

    // Error marker column
    if let Some(e) = error {
        draw_column(&mut out, norm_to_column(e, width), 0, height, ERROR_COLOUR);
    }

    // Steering tick on the bottom edge, drawn whether or not a new steering
    // demand was issued this tick
    let tick_top = height.saturating_sub(STEERING_TICK_PX);
    draw_column(
        &mut out,
        norm_to_column(steering, width),
        tick_top,
        height,
        STEERING_COLOUR,
    );

    out
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a normalised value in `[-1, 1]` onto a column index.
fn norm_to_column(value: f64, width: u32) -> u32 {
    let half = (width / 2) as f64;
    let col = (value * half + half).round();

    (col.max(0.0) as u32).min(width - MARKER_PX)
}

/// Draw a horizontal marker row of `MARKER_PX` thickness.
fn draw_row(img: &mut RgbImage, row: u32, colour: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let row = row.min(height - MARKER_PX);

    for y in row..row + MARKER_PX {
        for x in 0..width {
            img.put_pixel(x, y, colour);
        }
    }
}

/// Draw a vertical marker column of `MARKER_PX` thickness over the given
/// row range.
fn draw_column(img: &mut RgbImage, column: u32, from_row: u32, to_row: u32, colour: Rgb<u8>) {
    for y in from_row..to_row {
        for x in column..column + MARKER_PX {
            img.put_pixel(x, y, colour);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn blank_frame() -> RgbImage {
        RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))
    }

    #[test]
    fn test_overlay_preserves_dimensions() {
        let frame = blank_frame();
        let overlay = render_overlay(&frame, &line_det::Params::default(), Some(0.0), 0.0);

        assert_eq!(overlay.dimensions(), frame.dimensions());
    }

    #[test]
    fn test_roi_rows_drawn() {
        let overlay = render_overlay(&blank_frame(), &line_det::Params::default(), None, 0.0);

        // Default ROI (0.1, 0.5) on a 100 px tall frame puts the bounds at
        // rows 90 and 50
        assert_eq!(*overlay.get_pixel(0, 90), ROI_COLOUR);
        assert_eq!(*overlay.get_pixel(0, 50), ROI_COLOUR);
    }

    #[test]
    fn test_error_marker_column() {
        let overlay = render_overlay(&blank_frame(), &line_det::Params::default(), Some(0.5), 0.0);

        // Error 0.5 maps to column 75
        assert_eq!(*overlay.get_pixel(75, 0), ERROR_COLOUR);
        // No marker at the centre
        assert_eq!(*overlay.get_pixel(50, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_no_error_marker_on_bad_frames() {
        let overlay = render_overlay(&blank_frame(), &line_det::Params::default(), None, 0.0);

        assert_eq!(*overlay.get_pixel(50, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_steering_tick_on_bottom_edge() {
        let overlay = render_overlay(&blank_frame(), &line_det::Params::default(), None, -1.0);

        // Full left steering puts the tick at column 0
        assert_eq!(*overlay.get_pixel(0, 99), STEERING_COLOUR);
        assert_eq!(*overlay.get_pixel(0, 0), Rgb([0, 0, 0]));
    }
}
