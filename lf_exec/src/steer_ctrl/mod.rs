//! Steering control module
//!
//! PID feedback controller converting the lateral error signal from line
//! detection into a normalised steering demand.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SteerCtrl operation.
///
/// Cyclic processing itself cannot fail - it only refuses to advance state
/// when there is no input.
#[derive(Debug, thiserror::Error)]
pub enum SteerCtrlError {
    #[error("Could not load the parameter file: {0}")]
    ParamLoadError(util::params::LoadError),
}
