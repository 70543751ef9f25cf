//! Parameters structure for CtrlLoop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::CtrlLoopError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the control loop.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Params {
    // ---- RUNTIME ----

    /// Number of ticks to run before stopping.
    pub num_iterations: u32,

    /// Target period of one tick.
    ///
    /// Units: seconds. Zero disables cycle pacing (used by tests).
    pub cycle_period_s: f64,

    // ---- THROTTLE SCHEDULE ----

    /// Speed demanded during the "on" blocks of the throttle pulse schedule.
    pub throttle_pulse_speed: f64,

    /// Number of consecutive ticks forming one block of the schedule.
    pub throttle_pulse_block: u32,

    /// Period of the schedule in blocks - the first block of each period is
    /// "on", the rest are "off".
    pub throttle_pulse_period: u32,

    // ---- RECOVERY ----

    /// Minimum magnitude of the last valid error for a loss of line to be
    /// treated as recoverable. Below this the line simply ended ahead of us.
    pub steering_threshold: f64,

    /// Maximum number of consecutive ticks the recovery extrapolation may
    /// run before the loss is declared terminal.
    pub time_off_line_limit: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are self-consistent.
    pub fn validate(&self) -> Result<(), CtrlLoopError> {
        if self.throttle_pulse_block == 0 || self.throttle_pulse_period == 0 {
            return Err(CtrlLoopError::InvalidParams(
                "throttle pulse block and period must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.steering_threshold) {
            return Err(CtrlLoopError::InvalidParams(format!(
                "steering_threshold must be within [0, 1], found {}",
                self.steering_threshold
            )));
        }

        if self.cycle_period_s < 0.0 {
            return Err(CtrlLoopError::InvalidParams(format!(
                "cycle_period_s must not be negative, found {}",
                self.cycle_period_s
            )));
        }

        Ok(())
    }

    /// Speed demand for the given tick under the pulse schedule.
    ///
    /// The schedule is a fixed on/off pattern over the iteration index,
    /// intentionally decoupled from steering.
    pub fn throttle_demand(&self, iteration: u32) -> f64 {
        if (iteration / self.throttle_pulse_block) % self.throttle_pulse_period == 0 {
            self.throttle_pulse_speed
        } else {
            0.0
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params {
            num_iterations: 320,
            cycle_period_s: 1.0 / 32.0,
            throttle_pulse_speed: 0.23,
            throttle_pulse_block: 10,
            throttle_pulse_period: 8,
            steering_threshold: 0.7,
            time_off_line_limit: 45,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_throttle_schedule() {
        let params = Params::default();

        // First block of each period is on
        assert_eq!(params.throttle_demand(0), 0.23);
        assert_eq!(params.throttle_demand(9), 0.23);
        // Remaining blocks are off
        assert_eq!(params.throttle_demand(10), 0.0);
        assert_eq!(params.throttle_demand(79), 0.0);
        // Next period starts at block 8
        assert_eq!(params.throttle_demand(80), 0.23);
    }

    #[test]
    fn test_validate() {
        let mut params = Params::default();
        assert!(params.validate().is_ok());

        params.throttle_pulse_block = 0;
        assert!(params.validate().is_err());

        params.throttle_pulse_block = 10;
        params.steering_threshold = 1.2;
        assert!(params.validate().is_err());
    }
}
