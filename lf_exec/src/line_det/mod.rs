//! Line detection module
//!
//! Locates the coloured guide line within a region of interest of a camera
//! frame and reports how far its centre is from the centre of the frame.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filter;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use filter::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LineDet operation.
///
/// All of these are configuration errors raised at init. Per-frame
/// conditions are expected and reported through [`Detection`] instead.
#[derive(Debug, thiserror::Error)]
pub enum LineDetError {
    #[error("Could not load the parameter file: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid ROI: expected 0 <= bottom < top <= 1, found ({0}, {1})")]
    InvalidRoi(f64, f64),

    #[error("Invalid detection channel index: {0} (expected 0, 1 or 2)")]
    InvalidChannel(usize),

    #[error("Invalid density window: expected 0 <= min < max <= 1, found ({0}, {1})")]
    InvalidDensityWindow(f64, f64),

    #[error("Invalid blur kernel size: {0} (expected an odd size of at least 1)")]
    InvalidBlurKernel(u32),
}

/// The outcome of running detection over a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Detection {
    /// The line was found, with the given normalised lateral error in
    /// `[-1, 1]`. Negative is left of the frame centre, positive right.
    Line(f64),

    /// Too few pixels passed the binarisation threshold to trust a centroid,
    /// the line is probably not in the frame.
    NotFound,

    /// Too many pixels passed the threshold - saturation, glare or an
    /// occluded lens. A centroid over such a frame would be meaningless.
    BadFrame,
}
