//! Image filtering for line detection
//!
//! Single-channel operations over the cropped ROI band: channel extraction,
//! box blur and binarisation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::{GrayImage, Luma, RgbImage};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Extract one colour channel of the given row band into a grayscale plane.
///
/// `rows` is the half-open `[start, end)` row range of the band. The caller
/// guarantees `start < end <= height` and `channel <= 2`.
pub fn extract_band_channel(
    frame: &RgbImage,
    rows: (u32, u32),
    channel: usize,
) -> GrayImage {
    let (start, end) = rows;
    let width = frame.width();

    GrayImage::from_fn(width, end - start, |x, y| {
        Luma([frame.get_pixel(x, start + y).0[channel]])
    })
}

/// Apply a box blur of the given odd kernel size.
///
/// Windows are clipped at the image borders and averaged over the samples
/// actually inside the image, so border pixels are not darkened.
pub fn box_blur(plane: &GrayImage, kernel_px: u32) -> GrayImage {
    let radius = (kernel_px / 2) as i64;

    // Horizontal then vertical pass
    let horizontal = blur_pass(plane, radius, true);
    blur_pass(&horizontal, radius, false)
}

/// Threshold the plane in place: samples at or above `threshold` become 255,
/// all others become 0.
pub fn binarize(plane: &mut GrayImage, threshold: u8) {
    for px in plane.pixels_mut() {
        px.0[0] = if px.0[0] >= threshold { 255 } else { 0 };
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// One separable blur pass along either the rows or the columns.
fn blur_pass(plane: &GrayImage, radius: i64, along_rows: bool) -> GrayImage {
    let (width, height) = plane.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let (pos, limit) = if along_rows {
            (x as i64, width as i64)
        } else {
            (y as i64, height as i64)
        };

        let lo = (pos - radius).max(0);
        let hi = (pos + radius).min(limit - 1);

        let mut sum: u32 = 0;
        for i in lo..=hi {
            let sample = if along_rows {
                plane.get_pixel(i as u32, y)
            } else {
                plane.get_pixel(x, i as u32)
            };
            sum += sample.0[0] as u32;
        }

        let count = (hi - lo + 1) as u32;
        Luma([((sum as f64 / count as f64).round()) as u8])
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_box_blur_uniform_plane_unchanged() {
        let plane = GrayImage::from_pixel(16, 8, Luma([200]));
        let blurred = box_blur(&plane, 5);

        assert!(blurred.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn test_box_blur_spreads_peak() {
        let mut plane = GrayImage::from_pixel(9, 9, Luma([0]));
        plane.put_pixel(4, 4, Luma([255]));

        let blurred = box_blur(&plane, 3);

        // Peak attenuated, direct neighbour raised
        assert!(blurred.get_pixel(4, 4).0[0] < 255);
        assert!(blurred.get_pixel(3, 4).0[0] > 0);
        // Outside the kernel reach nothing changes
        assert_eq!(blurred.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_binarize() {
        let mut plane = GrayImage::from_fn(4, 1, |x, _| Luma([(x as u8) * 80]));
        binarize(&mut plane, 160);

        let vals: Vec<u8> = plane.pixels().map(|p| p.0[0]).collect();
        assert_eq!(vals, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_extract_band_channel() {
        let frame = RgbImage::from_fn(4, 4, |_, y| image::Rgb([10, 20, (y as u8) * 10]));
        let band = extract_band_channel(&frame, (1, 3), 2);

        assert_eq!(band.dimensions(), (4, 2));
        assert_eq!(band.get_pixel(0, 0).0[0], 10);
        assert_eq!(band.get_pixel(0, 1).0[0], 20);
    }
}
