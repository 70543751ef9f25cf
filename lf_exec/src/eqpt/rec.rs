//! Session frame recorder
//!
//! [`FrameSink`] implementation writing the annotated frames of a run into
//! the session directory as a numbered PNG sequence - the run's one video
//! artifact.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use image::RgbImage;
use log::info;
use std::path::PathBuf;

// Internal
use super::{EqptError, FrameSink};
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Frame recorder writing into `<session>/video/`.
pub struct FrameRecorder {
    dir: PathBuf,

    frames_written: u32,

    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameRecorder {
    /// Create the recorder and its directory inside the session.
    pub fn new(session: &Session) -> Result<Self, EqptError> {
        let dir = session.session_root.join("video");
        std::fs::create_dir_all(&dir).map_err(EqptError::IoError)?;

        Ok(Self {
            dir,
            frames_written: 0,
            closed: false,
        })
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }
}

impl FrameSink for FrameRecorder {
    fn write(&mut self, frame: &RgbImage) -> Result<(), EqptError> {
        if self.closed {
            return Err(EqptError::SinkClosed);
        }

        let path = self.dir.join(format!("frame_{:06}.png", self.frames_written));
        frame.save(path).map_err(EqptError::ImageError)?;

        self.frames_written += 1;

        Ok(())
    }

    fn close(&mut self) -> Result<(), EqptError> {
        if !self.closed {
            self.closed = true;
            info!(
                "Frame recorder closed, {} frames written to {:?}",
                self.frames_written, self.dir
            );
        }

        Ok(())
    }
}
