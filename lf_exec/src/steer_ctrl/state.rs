//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Params, SteerCtrlError};
use util::{maths::round_dp, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control module state.
///
/// The accumulator is mutated at most once per tick and only ever reset by
/// constructing a fresh instance.
#[derive(Default)]
pub struct SteerCtrl {
    pub(crate) params: Params,

    pub(crate) error_sum: f64,
    pub(crate) previous_error: f64,

    pub(crate) report: StatusReport,
}

/// Status report for SteerCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Accumulated error sum (integral term input).
    pub error_sum: f64,

    /// Error from the previous tick (derivative term input).
    pub previous_error: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SteerCtrl {
    type InitData = &'static str;
    type InitError = SteerCtrlError;

    type InputData = Option<f64>;
    type OutputData = Option<f64>;
    type StatusReport = StatusReport;
    type ProcError = SteerCtrlError;

    /// Initialise the SteerCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), SteerCtrlError> {
        self.params = params::load(init_data).map_err(SteerCtrlError::ParamLoadError)?;
        Ok(())
    }

    /// Compute the steering demand for the current error.
    ///
    /// An absent error produces an absent demand and leaves the accumulator
    /// untouched, preventing integral windup across signal-less frames.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let error = match input_data {
            Some(e) => *e,
            None => return Ok((None, self.report)),
        };

        self.error_sum += error;

        let derivative = error - self.previous_error;
        let output = self.params.kp * error
            + self.params.kd * derivative
            + self.params.ki * self.error_sum;

        self.previous_error = error;

        self.report = StatusReport {
            error_sum: self.error_sum,
            previous_error: self.previous_error,
        };

        let output = round_dp(output, 2);

        trace!("SteerCtrl: error {:.2} -> output {:.2}", error, output);

        Ok((Some(output), self.report))
    }
}

impl SteerCtrl {
    /// Create a controller with the given gains directly, without a
    /// parameter file.
    pub fn with_params(params: Params) -> Self {
        SteerCtrl {
            params,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn gains(kp: f64, ki: f64, kd: f64) -> Params {
        Params { kp, ki, kd }
    }

    #[test]
    fn test_pure_proportional() {
        let mut ctrl = SteerCtrl::with_params(gains(1.5, 0.0, 0.0));

        let (out, _) = ctrl.proc(&Some(0.4)).unwrap();
        assert_eq!(out, Some(0.6));

        // With ki = kd = 0 repeated identical errors keep yielding kp * e
        let (out, _) = ctrl.proc(&Some(0.4)).unwrap();
        assert_eq!(out, Some(0.6));
    }

    #[test]
    fn test_integral_accumulates() {
        let mut ctrl = SteerCtrl::with_params(gains(0.0, 1.0, 0.0));

        assert_eq!(ctrl.proc(&Some(0.1)).unwrap().0, Some(0.1));
        assert_eq!(ctrl.proc(&Some(0.1)).unwrap().0, Some(0.2));
        assert_eq!(ctrl.proc(&Some(0.1)).unwrap().0, Some(0.3));
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let mut ctrl = SteerCtrl::with_params(gains(0.0, 0.0, 1.0));

        // First call: derivative from the initial previous error of 0
        assert_eq!(ctrl.proc(&Some(0.5)).unwrap().0, Some(0.5));
        // Second call with the same error: derivative is 0
        assert_eq!(ctrl.proc(&Some(0.5)).unwrap().0, Some(0.0));
        // Step down
        assert_eq!(ctrl.proc(&Some(0.2)).unwrap().0, Some(-0.3));
    }

    #[test]
    fn test_absent_error_does_not_mutate_state() {
        let params = gains(1.0, 1.0, 1.0);

        let mut with_gap = SteerCtrl::with_params(params);
        let mut without_gap = SteerCtrl::with_params(params);

        assert_eq!(with_gap.proc(&None).unwrap().0, None);

        // After the absent input both controllers must agree on every
        // subsequent output
        let a = with_gap.proc(&Some(0.3)).unwrap().0;
        let b = without_gap.proc(&Some(0.3)).unwrap().0;
        assert_eq!(a, b);

        let a = with_gap.proc(&Some(-0.2)).unwrap().0;
        let b = without_gap.proc(&Some(-0.2)).unwrap().0;
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_rounded_to_two_decimals() {
        let mut ctrl = SteerCtrl::with_params(gains(1.0, 0.0, 0.0));

        let (out, _) = ctrl.proc(&Some(0.333)).unwrap();
        assert_eq!(out, Some(0.33));
    }
}
