//! Simulated equipment
//!
//! Stand-ins for the camera and car used when running without hardware and
//! by the control loop tests: a camera producing a synthetic drifting line,
//! a car which records every demand it is given, and a frame sink which
//! counts frames without touching the filesystem.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use image::{Rgb, RgbImage};
use log::debug;

// Internal
use super::{EqptError, FrameSink, FrameSource, SteeringActuator};
use util::maths::clamp;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Camera producing a blue line which drifts sideways over the run, leaving
/// the frame eventually so that the end-of-line handling is exercised.
pub struct SimCamera {
    dims: (u32, u32),

    stripe_centre: f64,
    stripe_width: u32,
    drift_px: f64,
}

/// Car which records every demand instead of driving servos.
#[derive(Default)]
pub struct SimCar {
    /// Every call made on the actuator, in order.
    pub calls: Vec<CarCall>,

    current_steering: f64,
}

/// Frame sink which counts writes and drops the frames.
#[derive(Default)]
pub struct NullSink {
    /// Number of frames written so far.
    pub frames_written: u32,

    /// Whether the sink has been closed.
    pub closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A recorded actuator demand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CarCall {
    /// `set_steering`, with the clamped position or `None` for no change.
    Steering(Option<f64>),

    /// `set_speed`, with the clamped demand.
    Speed(f64),

    /// `stop`.
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCamera {
    /// Create a camera with the line starting at the frame centre and
    /// drifting right by the given number of pixels per frame.
    pub fn new(width: u32, height: u32, drift_px: f64) -> Self {
        Self {
            dims: (width, height),
            stripe_centre: width as f64 / 2.0,
            stripe_width: (width / 8).max(31),
            drift_px,
        }
    }
}

impl FrameSource for SimCamera {
    fn latest_frame(&mut self) -> Result<RgbImage, EqptError> {
        let (width, height) = self.dims;
        let centre = self.stripe_centre;
        let half = (self.stripe_width / 2) as f64;

        let frame = RgbImage::from_fn(width, height, |x, _| {
            if (x as f64 - centre).abs() <= half {
                Rgb([0, 0, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });

        self.stripe_centre += self.drift_px;

        Ok(frame)
    }

    fn frame_dims(&self) -> (u32, u32) {
        self.dims
    }
}

impl SteeringActuator for SimCar {
    fn set_steering(&mut self, position: Option<f64>) -> Result<(), EqptError> {
        let position = position.map(|p| clamp(&p, &-1.0, &1.0));

        if let Some(p) = position {
            self.current_steering = p;
        }

        debug!("SimCar steering: {:?}", position);
        self.calls.push(CarCall::Steering(position));

        Ok(())
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), EqptError> {
        let speed = clamp(&speed, &-1.0, &1.0);

        debug!("SimCar speed: {}", speed);
        self.calls.push(CarCall::Speed(speed));

        Ok(())
    }

    fn stop(&mut self) -> Result<(), EqptError> {
        self.current_steering = 0.0;
        self.calls.push(CarCall::Stop);

        Ok(())
    }

    fn current_steering(&self) -> f64 {
        self.current_steering
    }
}

impl FrameSink for NullSink {
    fn write(&mut self, _frame: &RgbImage) -> Result<(), EqptError> {
        if self.closed {
            return Err(EqptError::SinkClosed);
        }

        self.frames_written += 1;

        Ok(())
    }

    fn close(&mut self) -> Result<(), EqptError> {
        self.closed = true;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_camera_is_deterministic() {
        let mut a = SimCamera::new(100, 100, 4.0);
        let mut b = SimCamera::new(100, 100, 4.0);

        assert_eq!(a.latest_frame().unwrap(), b.latest_frame().unwrap());
        assert_eq!(a.latest_frame().unwrap(), b.latest_frame().unwrap());
    }

    #[test]
    fn test_sim_camera_line_drifts() {
        let mut cam = SimCamera::new(100, 100, 10.0);

        let first = cam.latest_frame().unwrap();
        let second = cam.latest_frame().unwrap();

        // Stripe starts on the centre column and moves between frames
        assert_eq!(first.get_pixel(50, 0).0, [0, 0, 255]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_null_sink_rejects_writes_after_close() {
        let mut sink = NullSink::default();
        let frame = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));

        sink.write(&frame).unwrap();
        sink.close().unwrap();

        assert!(matches!(sink.write(&frame), Err(EqptError::SinkClosed)));
        assert_eq!(sink.frames_written, 1);
    }
}
