//! PCA9685 servo driven car
//!
//! [`SteeringActuator`] implementation for an RC car with a positional
//! steering servo and a continuous throttle servo, both on a PCA9685 16
//! channel driver board.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::info;
use pwm_pca9685::{Channel, Pca9685};
use serde::Deserialize;

// Internal
use super::{EqptError, SteeringActuator};
use util::maths::{clamp, lin_map, round_dp};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// PWM counts per cycle on the PCA9685.
const COUNTS_PER_CYCLE: f64 = 4096.0;

/// PWM cycle period at the 50 Hz servo update rate.
///
/// Units: microseconds
const CYCLE_PERIOD_US: f64 = 20_000.0;

/// Prescale value putting the board's internal 25 MHz oscillator at 50 Hz.
const SERVO_PRESCALE: u8 = 121;

/// Positional servo pulse widths at 0 and 180 degrees.
///
/// Units: microseconds
const SERVO_PULSE_RANGE_US: (f64, f64) = (500.0, 2500.0);

/// Continuous servo pulse width at zero throttle, and the swing to full
/// throttle in either direction.
///
/// Units: microseconds
const THROTTLE_NEUTRAL_US: f64 = 1500.0;
const THROTTLE_SWING_US: f64 = 500.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the car actuator.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CarParams {
    // ---- CHANNELS ----

    /// PCA9685 channel of the steering servo.
    pub steering_channel: u8,

    /// PCA9685 channel of the throttle servo.
    pub throttle_channel: u8,

    // ---- STEERING GEOMETRY ----

    /// Servo angle at which the wheels point straight ahead.
    ///
    /// Units: degrees
    pub centre_angle_deg: f64,

    /// Maximum deflection either side of centre.
    ///
    /// Units: degrees
    pub max_angle_deg: f64,

    // ---- SPEED LIMITS ----

    /// Maximum magnitude a speed demand is scaled to.
    pub max_speed: f64,

    /// Minimum effective speed magnitude - scaled demands below this do not
    /// overcome drivetrain friction and are treated as zero.
    pub min_speed: f64,

    // ---- BRAKING ----

    /// Reverse pulse applied during the braking sequence.
    pub brake_speed: f64,

    /// Duration of the braking pulse.
    ///
    /// Units: seconds
    pub brake_duration_s: f64,
}

/// Car actuator on a PCA9685 driver board, generic over the I2C bus.
pub struct Pca9685Car<I2C> {
    driver: Pca9685<I2C>,

    params: CarParams,

    steering_channel: Channel,
    throttle_channel: Channel,

    current_steering: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CarParams {
    /// Check the parameters are self-consistent.
    pub fn validate(&self) -> Result<(), EqptError> {
        if self.steering_channel == self.throttle_channel {
            return Err(EqptError::DriverError(
                "steering and throttle must use distinct channels".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.max_speed) || self.max_speed == 0.0 {
            return Err(EqptError::DriverError(format!(
                "max_speed must be within (0, 1], found {}",
                self.max_speed
            )));
        }

        if !(0.0..self.max_speed).contains(&self.min_speed) {
            return Err(EqptError::DriverError(format!(
                "min_speed must be within [0, max_speed), found {}",
                self.min_speed
            )));
        }

        Ok(())
    }
}

impl Default for CarParams {
    fn default() -> Self {
        CarParams {
            steering_channel: 1,
            throttle_channel: 0,
            centre_angle_deg: 83.0,
            max_angle_deg: 35.0,
            max_speed: 0.8,
            min_speed: 0.17,
            brake_speed: -0.9,
            brake_duration_s: 0.45,
        }
    }
}

impl<I2C, E> Pca9685Car<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: std::fmt::Debug,
{
    /// Create a new car actuator on the given initialised driver board.
    ///
    /// Configures the board for the 50 Hz servo update rate and centres the
    /// steering.
    pub fn new(mut driver: Pca9685<I2C>, params: CarParams) -> Result<Self, EqptError> {
        params.validate()?;

        driver.set_prescale(SERVO_PRESCALE).map_err(driver_err)?;
        driver.enable().map_err(driver_err)?;

        let mut car = Self {
            driver,
            params,
            steering_channel: channel_from_index(params.steering_channel)?,
            throttle_channel: channel_from_index(params.throttle_channel)?,
            current_steering: 0.0,
        };

        car.set_steering(Some(0.0))?;
        car.set_speed(0.0)?;

        Ok(car)
    }

    /// Set the pulse width on a channel, with the on edge at count zero.
    fn set_pulse(&mut self, channel: Channel, pulse_us: f64) -> Result<(), EqptError> {
        let off_count = (pulse_us * COUNTS_PER_CYCLE / CYCLE_PERIOD_US) as u16;

        self.driver
            .set_channel_on_off(channel, 0, off_count)
            .map_err(driver_err)
    }
}

impl<I2C, E> SteeringActuator for Pca9685Car<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: std::fmt::Debug,
{
    fn set_steering(&mut self, position: Option<f64>) -> Result<(), EqptError> {
        let position = match position {
            Some(p) => clamp(&p, &-1.0, &1.0),
            None => return Ok(()),
        };

        let angle_deg = steering_angle_deg(&self.params, position);
        let pulse_us = lin_map((0.0, 180.0), SERVO_PULSE_RANGE_US, angle_deg);

        self.set_pulse(self.steering_channel, pulse_us)?;
        self.current_steering = position;

        Ok(())
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), EqptError> {
        let effective = effective_speed(&self.params, speed);
        let pulse_us = THROTTLE_NEUTRAL_US + effective * THROTTLE_SWING_US;

        self.set_pulse(self.throttle_channel, pulse_us)
    }

    fn stop(&mut self) -> Result<(), EqptError> {
        info!("Stopping car");

        self.set_steering(Some(0.0))?;
        self.set_speed(self.params.brake_speed)?;
        std::thread::sleep(std::time::Duration::from_secs_f64(self.params.brake_duration_s));
        self.set_speed(0.0)
    }

    fn current_steering(&self) -> f64 {
        self.current_steering
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Servo angle for a normalised steering position.
///
/// The position is clamped to `[-1, 1]` and mapped to a deflection about
/// the centre trim.
pub fn steering_angle_deg(params: &CarParams, position: f64) -> f64 {
    let clamped = clamp(&position, &-1.0, &1.0);
    params.centre_angle_deg + round_dp(clamped * params.max_angle_deg, 2)
}

/// Effective throttle setting for a normalised speed demand.
///
/// The demand is clamped to `[-1, 1]`, scaled by the maximum speed, and
/// zeroed when below the minimum effective magnitude.
pub fn effective_speed(params: &CarParams, speed: f64) -> f64 {
    let scaled = round_dp(clamp(&speed, &-1.0, &1.0) * params.max_speed, 2);

    if scaled.abs() < params.min_speed {
        0.0
    } else {
        scaled
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map a channel index from the parameter file onto the driver's channel
/// type.
fn channel_from_index(index: u8) -> Result<Channel, EqptError> {
    let channel = match index {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        _ => {
            return Err(EqptError::DriverError(format!(
                "channel index {} out of range (0-15)",
                index
            )))
        }
    };

    Ok(channel)
}

/// Convert a driver error into an equipment error.
fn driver_err<E: std::fmt::Debug>(e: pwm_pca9685::Error<E>) -> EqptError {
    match e {
        pwm_pca9685::Error::I2C(e) => EqptError::DriverError(format!("I2C error: {:?}", e)),
        pwm_pca9685::Error::InvalidInputData => {
            EqptError::DriverError("invalid input data".into())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_steering_angle_mapping() {
        let params = CarParams::default();

        assert_eq!(steering_angle_deg(&params, 0.0), 83.0);
        assert_eq!(steering_angle_deg(&params, 1.0), 118.0);
        assert_eq!(steering_angle_deg(&params, -1.0), 48.0);

        // Out of range demands are clamped to full deflection
        assert_eq!(steering_angle_deg(&params, 2.5), 118.0);
        assert_eq!(steering_angle_deg(&params, -3.0), 48.0);
    }

    #[test]
    fn test_speed_scaling_and_deadband() {
        let params = CarParams::default();

        assert_eq!(effective_speed(&params, 1.0), 0.8);
        assert_eq!(effective_speed(&params, -1.0), -0.8);
        assert_eq!(effective_speed(&params, 0.5), 0.4);

        // Below the deadband the drivetrain would stall, demand is zeroed
        assert_eq!(effective_speed(&params, 0.2), 0.0);
        assert_eq!(effective_speed(&params, 0.0), 0.0);

        // Brake pulse passes the deadband
        assert_eq!(effective_speed(&params, -0.9), -0.72);
    }

    #[test]
    fn test_params_validation() {
        let mut params = CarParams::default();
        assert!(params.validate().is_ok());

        params.throttle_channel = params.steering_channel;
        assert!(params.validate().is_err());

        params.throttle_channel = 0;
        params.min_speed = 0.9;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_channel_from_index() {
        assert!(channel_from_index(0).is_ok());
        assert!(channel_from_index(15).is_ok());
        assert!(channel_from_index(16).is_err());
    }
}
