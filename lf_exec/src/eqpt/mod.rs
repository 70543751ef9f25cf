//! Equipment abstractions
//!
//! Capability traits for the external collaborators of the control loop,
//! allowing the loop to be exercised against fakes without hardware.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// V4L2 camera frame source.
pub mod cam;

/// PCA9685 servo driven car actuator.
pub mod car;

/// Session-directory frame recorder.
pub mod rec;

/// Simulated equipment for hardware-less runs and tests.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of camera frames.
///
/// Implementations always deliver the most recent frame available - at most
/// one frame is in flight and stale frames are dropped, never queued.
/// Frame dimensions are fixed for the lifetime of the source.
pub trait FrameSource {
    /// Get the latest available frame, blocking until one is ready.
    fn latest_frame(&mut self) -> Result<RgbImage, EqptError>;

    /// Frame dimensions `(width, height)` this source delivers.
    fn frame_dims(&self) -> (u32, u32);
}

/// The car's steering and throttle actuators.
///
/// Implementations clamp demands to physical limits internally - the
/// control modules never need to know those limits.
pub trait SteeringActuator {
    /// Set the steering position in `[-1, 1]` (negative left, positive
    /// right). `None` means no change.
    fn set_steering(&mut self, position: Option<f64>) -> Result<(), EqptError>;

    /// Set the speed in `[-1, 1]` (negative reverse). Demands below the
    /// minimum effective magnitude are treated as zero.
    fn set_speed(&mut self, speed: f64) -> Result<(), EqptError>;

    /// Bring the car to a full stop: centre the steering, apply a bounded
    /// braking pulse, then zero the speed.
    fn stop(&mut self) -> Result<(), EqptError>;

    /// The current steering position in `[-1, 1]`.
    fn current_steering(&self) -> f64;
}

/// A sink for annotated frames.
///
/// Sinks are append-only for the duration of a run and produce one video
/// artifact per process lifetime.
pub trait FrameSink {
    /// Append an annotated frame to the artifact.
    fn write(&mut self, frame: &RgbImage) -> Result<(), EqptError>;

    /// Finalise the artifact. Writes after closing are an error.
    fn close(&mut self) -> Result<(), EqptError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors raised by equipment implementations.
#[derive(Debug, thiserror::Error)]
pub enum EqptError {
    #[error("Camera error: {0}")]
    CameraError(String),

    #[error("Servo driver error: {0}")]
    DriverError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("The frame sink is already closed")]
    SinkClosed,
}
