//! Loss-of-line recovery policy
//!
//! Classifies a `NotFound` tick as either a transient loss worth steering
//! through or a genuine end of line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Params;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The decision taken for a tick on which the line was not found.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecoveryAction {
    /// Keep driving with the given synthetic error - steer hard toward
    /// where the line was last seen.
    Continue(f64),

    /// The line has genuinely ended, stop the run.
    Terminate,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Decide how to react to a `NotFound` detection.
///
/// The line is declared ended when it was last seen near the frame centre
/// (it ran out ahead of us, rather than slipping out of a turn) or when the
/// extrapolation has already run for more ticks than the configured limit.
/// Otherwise a synthetic error of magnitude 1 with the sign of the last
/// valid error is returned - bounded dead reckoning, not an estimator.
pub fn assess(last_valid_error: f64, time_off_line: u32, params: &Params) -> RecoveryAction {
    let end_of_line = last_valid_error.abs() < params.steering_threshold
        || time_off_line > params.time_off_line_limit;

    if end_of_line {
        RecoveryAction::Terminate
    } else {
        RecoveryAction::Continue(last_valid_error.signum())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> Params {
        Params::default()
    }

    #[test]
    fn test_small_last_error_terminates() {
        // Line last seen near the centre: it ended ahead of the car
        assert_eq!(assess(0.0, 0, &params()), RecoveryAction::Terminate);
        assert_eq!(assess(0.69, 0, &params()), RecoveryAction::Terminate);
        assert_eq!(assess(-0.5, 3, &params()), RecoveryAction::Terminate);
    }

    #[test]
    fn test_loss_limit_terminates_regardless_of_error() {
        let p = params();
        assert_eq!(
            assess(0.95, p.time_off_line_limit + 1, &p),
            RecoveryAction::Terminate
        );
        assert_eq!(
            assess(-1.0, p.time_off_line_limit + 1, &p),
            RecoveryAction::Terminate
        );
    }

    #[test]
    fn test_extrapolates_with_unit_magnitude_and_matching_sign() {
        let p = params();

        assert_eq!(assess(0.8, 0, &p), RecoveryAction::Continue(1.0));
        assert_eq!(assess(-0.72, 10, &p), RecoveryAction::Continue(-1.0));

        // Right at the loss limit the extrapolation is still allowed
        assert_eq!(
            assess(0.8, p.time_off_line_limit, &p),
            RecoveryAction::Continue(1.0)
        );
    }
}
