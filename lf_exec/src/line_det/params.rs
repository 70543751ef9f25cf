//! Parameters structure for LineDet

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::LineDetError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line detection.
#[derive(Clone, Debug, Deserialize)]
pub struct Params {
    // ---- REGION OF INTEREST ----

    /// Vertical band of the frame examined for the line, as `(bottom, top)`
    /// fractions of the frame height measured from the bottom edge.
    ///
    /// Constraint: `0 <= bottom < top <= 1`.
    pub roi: (f64, f64),

    // ---- PREPROCESSING ----

    /// Index of the colour channel the line is detected in (0 = red,
    /// 1 = green, 2 = blue).
    pub detection_channel: usize,

    /// Size of the box blur kernel applied before binarisation.
    ///
    /// Units: pixels. Must be odd.
    pub blur_kernel_px: u32,

    /// Binarisation threshold - a blurred channel sample at or above this
    /// value counts as an "on" pixel.
    pub binary_threshold: u8,

    // ---- DENSITY WINDOW ----

    /// Minimum fraction of "on" pixels in the band for a centroid to be
    /// trusted. Below this the line is treated as not in frame.
    pub min_density: f64,

    /// Maximum fraction of "on" pixels in the band. Above this the frame is
    /// treated as saturated and unusable.
    pub max_density: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are self-consistent.
    ///
    /// Violations are configuration errors, raised once at init and never
    /// per-frame.
    pub fn validate(&self) -> Result<(), LineDetError> {
        let (bottom, top) = self.roi;

        if !(0.0..=1.0).contains(&bottom) || !(0.0..=1.0).contains(&top) || bottom >= top {
            return Err(LineDetError::InvalidRoi(bottom, top));
        }

        if self.detection_channel > 2 {
            return Err(LineDetError::InvalidChannel(self.detection_channel));
        }

        if self.blur_kernel_px == 0 || self.blur_kernel_px % 2 == 0 {
            return Err(LineDetError::InvalidBlurKernel(self.blur_kernel_px));
        }

        if !(0.0..=1.0).contains(&self.min_density)
            || !(0.0..=1.0).contains(&self.max_density)
            || self.min_density >= self.max_density
        {
            return Err(LineDetError::InvalidDensityWindow(
                self.min_density,
                self.max_density,
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Params {
            roi: (0.1, 0.5),
            detection_channel: 2,
            blur_kernel_px: 23,
            binary_threshold: 220,
            min_density: 0.03,
            max_density: 0.40,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
