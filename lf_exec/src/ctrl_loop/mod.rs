//! Control loop module
//!
//! Sequences the per-tick pipeline: throttle schedule, frame capture, line
//! detection, recovery-or-correction, steering actuation and frame logging.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod recovery;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use params::*;
pub use recovery::*;
pub use state::*;

use crate::eqpt::EqptError;
use crate::line_det::LineDetError;
use crate::steer_ctrl::SteerCtrlError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during CtrlLoop operation.
#[derive(Debug, thiserror::Error)]
pub enum CtrlLoopError {
    #[error("Could not load the parameter file: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Invalid control loop parameters: {0}")]
    InvalidParams(String),

    #[error("LineDet error: {0}")]
    LineDetError(#[from] LineDetError),

    #[error("SteerCtrl error: {0}")]
    SteerCtrlError(#[from] SteerCtrlError),

    #[error("Equipment error: {0}")]
    EqptError(#[from] EqptError),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] util::archive::ArchiveError),
}

/// The reason a run came to an end.
///
/// All of these are normal returns, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum StopCause {
    /// The configured iteration budget was reached.
    Complete,

    /// The recovery policy classified a loss of line as genuine end of line.
    EndOfLine,

    /// The externally injected stop flag was raised.
    StopRequested,
}
