//! Parameters structure for SteerCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control.
///
/// Gains are immutable for a run - there is no runtime retuning path.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Params {
    /// Proportional gain.
    pub kp: f64,

    /// Integral gain.
    pub ki: f64,

    /// Derivative gain.
    pub kd: f64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            kp: 1.5,
            ki: 0.0,
            kd: 0.0,
        }
    }
}
