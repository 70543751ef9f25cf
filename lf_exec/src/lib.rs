//! # Line follower library.
//!
//! This library allows the line follower executable and its tests to access
//! the processing modules and equipment abstractions.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control loop - sequences capture, detection, recovery, steering and logging each tick
pub mod ctrl_loop;

/// Equipment abstractions - camera, car and frame recorder collaborators
pub mod eqpt;

/// Line detection module - converts a camera frame into a lateral error signal
pub mod line_det;

/// Steering control module - PID feedback controller turning error into steering demand
pub mod steer_ctrl;

/// Visualisation - renders the diagnostic overlay written to the frame recorder
pub mod viz;
