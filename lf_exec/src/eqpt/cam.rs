//! V4L2 camera frame source
//!
//! [`FrameSource`] implementation capturing RGB24 frames from a V4L2 device
//! via `rscam`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use image::RgbImage;
use log::info;
use rscam::{Camera, Config};
use serde::Deserialize;

// Internal
use super::{EqptError, FrameSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the camera.
#[derive(Clone, Debug, Deserialize)]
pub struct CamParams {
    /// The V4L2 device path, e.g. `/dev/video0`.
    pub device: String,

    /// Frame width in pixels.
    pub frame_width: u32,

    /// Frame height in pixels.
    pub frame_height: u32,

    /// Requested capture rate.
    ///
    /// Units: frames per second
    pub fps: u32,
}

/// A started V4L2 camera.
pub struct V4l2Camera {
    camera: Camera,

    dims: (u32, u32),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CamParams {
    fn default() -> Self {
        CamParams {
            device: String::from("/dev/video0"),
            frame_width: 640,
            frame_height: 480,
            fps: 50,
        }
    }
}

impl V4l2Camera {
    /// Open and start the camera described by the parameters.
    pub fn new(params: &CamParams) -> Result<Self, EqptError> {
        let mut camera = Camera::new(&params.device).map_err(EqptError::IoError)?;

        camera
            .start(&Config {
                interval: (1, params.fps),
                resolution: (params.frame_width, params.frame_height),
                format: b"RGB3",
                ..Default::default()
            })
            .map_err(|e| EqptError::CameraError(format!("failed to start capture: {:?}", e)))?;

        info!(
            "Camera {} started at {}x{} {} fps",
            params.device, params.frame_width, params.frame_height, params.fps
        );

        Ok(Self {
            camera,
            dims: (params.frame_width, params.frame_height),
        })
    }
}

impl FrameSource for V4l2Camera {
    /// Capture the most recent frame.
    ///
    /// The driver hands over the latest filled buffer, so stale frames are
    /// dropped by construction rather than queued.
    fn latest_frame(&mut self) -> Result<RgbImage, EqptError> {
        let frame = self
            .camera
            .capture()
            .map_err(|e| EqptError::CameraError(format!("capture failed: {:?}", e)))?;

        let (width, height) = self.dims;

        RgbImage::from_raw(width, height, frame.to_vec()).ok_or_else(|| {
            EqptError::CameraError(format!(
                "captured buffer too small for a {}x{} RGB frame",
                width, height
            ))
        })
    }

    fn frame_dims(&self) -> (u32, u32) {
        self.dims
    }
}
