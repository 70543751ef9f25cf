//! Implementations for the LineDet state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::RgbImage;
use log::trace;
use serde::Serialize;

// Internal
use super::{binarize, box_blur, extract_band_channel, Detection, LineDetError, Params};
use util::{maths::round_dp, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line detection module state.
///
/// Detection itself is pure - the only state carried here is the parameter
/// set and the report of the most recent frame.
#[derive(Default)]
pub struct LineDet {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
}

/// Status report for LineDet processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Fraction of "on" pixels within the examined band.
    pub density: f64,

    /// Column of the detected line centroid, if one was trusted.
    pub centroid_px: Option<u32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LineDet {
    type InitData = &'static str;
    type InitError = LineDetError;

    type InputData = RgbImage;
    type OutputData = Detection;
    type StatusReport = StatusReport;
    type ProcError = LineDetError;

    /// Initialise the LineDet module.
    ///
    /// Expected init data is the path to the parameter file. Invalid
    /// parameters (ROI bounds in particular) fail here, never per-frame.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), LineDetError> {
        self.params = params::load(init_data).map_err(LineDetError::ParamLoadError)?;
        self.params.validate()
    }

    /// Run detection over a single frame.
    ///
    /// Expected per-frame conditions (no line, saturated frame) are encoded
    /// in the returned [`Detection`], so this never errors.
    fn proc(
        &mut self,
        frame: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let (detection, report) = locate(frame, &self.params);
        self.report = report;

        trace!("LineDet: {:?} (density {:.3})", detection, report.density);

        Ok((detection, report))
    }
}

impl LineDet {
    /// Create a detector with the given parameters directly, without a
    /// parameter file.
    pub fn with_params(params: Params) -> Result<Self, LineDetError> {
        params.validate()?;

        Ok(LineDet {
            params,
            report: StatusReport::default(),
        })
    }

    /// The detector's parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Locate the guide line in the frame.
///
/// Deterministic given the frame and parameters, no side effects. The
/// caller must have validated `params` (see [`Params::validate`]).
pub fn locate(frame: &RgbImage, params: &Params) -> (Detection, StatusReport) {
    let height = frame.height();
    let (bottom, top) = params.roi;

    // Crop to the ROI band. Row 0 is the top of the frame, so the `top`
    // bound (closer to 1.0) maps to the smaller row index.
    let top_row = height - (height as f64 * top) as u32;
    let bottom_row = height - (height as f64 * bottom) as u32;

    let mut band = extract_band_channel(frame, (top_row, bottom_row), params.detection_channel);
    band = box_blur(&band, params.blur_kernel_px);
    binarize(&mut band, params.binary_threshold);

    // Count "on" pixels and accumulate their column sum for the centroid
    let mut on_count: u64 = 0;
    let mut column_sum: u64 = 0;

    for (x, _, px) in band.enumerate_pixels() {
        if px.0[0] == 255 {
            on_count += 1;
            column_sum += x as u64;
        }
    }

    let total = (band.width() as u64) * (band.height() as u64);
    let density = match total {
        0 => 0.0,
        t => on_count as f64 / t as f64,
    };

    if density < params.min_density {
        return (Detection::NotFound, StatusReport {
            density,
            centroid_px: None,
        });
    }

    if density > params.max_density {
        return (Detection::BadFrame, StatusReport {
            density,
            centroid_px: None,
        });
    }

    // Centroid is the mean "on" column, rounded to the nearest whole column
    let centroid = (column_sum as f64 / on_count as f64).round() as u32;

    // Normalise the offset from the frame centre into [-1, 1]
    let half_width = (frame.width() / 2) as f64;
    let error = round_dp((centroid as f64 - half_width) / half_width, 2);

    (
        Detection::Line(error),
        StatusReport {
            density,
            centroid_px: Some(centroid),
        },
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    /// A 100x100 frame with a vertical blue stripe of the given width
    /// centred on the given column.
    fn stripe_frame(centre: u32, stripe_width: u32) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, _| {
            let half = stripe_width / 2;
            let on = x + half >= centre && x <= centre + half;
            if on {
                Rgb([0, 0, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_centred_stripe_zero_error() {
        let frame = stripe_frame(50, 31);
        let (det, report) = locate(&frame, &Params::default());

        assert_eq!(det, Detection::Line(0.0));
        assert_eq!(report.centroid_px, Some(50));
    }

    #[test]
    fn test_offset_stripe_error() {
        let frame = stripe_frame(70, 31);
        let (det, _) = locate(&frame, &Params::default());

        // (70 - 50) / 50
        assert_eq!(det, Detection::Line(0.4));
    }

    #[test]
    fn test_blank_frame_not_found() {
        let frame = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let (det, report) = locate(&frame, &Params::default());

        assert_eq!(det, Detection::NotFound);
        assert_eq!(report.density, 0.0);
    }

    #[test]
    fn test_saturated_frame_bad() {
        let frame = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let (det, report) = locate(&frame, &Params::default());

        assert_eq!(det, Detection::BadFrame);
        assert!(report.density > 0.9);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let frame = stripe_frame(33, 31);
        let params = Params::default();

        assert_eq!(locate(&frame, &params).0, locate(&frame, &params).0);
    }

    #[test]
    fn test_roi_validation() {
        let mut params = Params::default();

        params.roi = (0.5, 0.1);
        assert!(matches!(
            params.validate(),
            Err(LineDetError::InvalidRoi(_, _))
        ));

        params.roi = (-0.1, 0.5);
        assert!(params.validate().is_err());

        params.roi = (0.1, 1.5);
        assert!(params.validate().is_err());

        params.roi = (0.1, 0.5);
        assert!(params.validate().is_ok());
    }
}
