//! Main line follower executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and all modules
//!     - Main loop (driven by `ctrl_loop`):
//!         - Throttle schedule output
//!         - Frame acquisition
//!         - Line detection processing
//!         - Recovery assessment or steering control processing
//!         - Steering actuation
//!         - Frame and archive logging
//!     - Save the run report into the session
//!
//! # Modules
//!
//! All processing modules (e.g. `line_det`) shall meet the following
//! requirements:
//!     1. Provide a public struct implementing the `util::module::State`
//!        trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use lf_lib::ctrl_loop::CtrlLoop;
use lf_lib::eqpt::rec::FrameRecorder;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frame dimensions of the simulated camera.
#[cfg(not(all(feature = "hw", target_arch = "arm")))]
const SIM_FRAME_DIMS: (u32, u32) = (640, 480);

/// Sideways drift of the simulated line per frame.
///
/// Units: pixels
#[cfg(not(all(feature = "hw", target_arch = "arm")))]
const SIM_DRIFT_PX: f64 = 4.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("lf_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Line Follower Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ctrl_loop = CtrlLoop::default();
    ctrl_loop
        .init(&session)
        .wrap_err("Failed to initialise CtrlLoop")?;
    info!("CtrlLoop init complete");

    info!("Module initialisation complete\n");

    // ---- STOP FLAG ----

    // The run can be ended early from the terminal. The flag is observed by
    // the control loop at the start of each tick.
    let stop = Arc::new(AtomicBool::new(false));

    {
        let stop = stop.clone();
        thread::spawn(move || {
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_ok() {
                info!("Stop requested from the terminal");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    info!("Press ENTER to stop the run early\n");

    // ---- INITIALISE EQUIPMENT ----

    let mut recorder =
        FrameRecorder::new(&session).wrap_err("Failed to initialise the frame recorder")?;

    // ---- RUN ----

    #[cfg(all(feature = "hw", target_arch = "arm"))]
    let report = {
        use color_eyre::eyre::eyre;
        use lf_lib::eqpt::{
            cam::{CamParams, V4l2Camera},
            car::{CarParams, Pca9685Car},
        };
        use pwm_pca9685::{Address, Pca9685};
        use rppal::i2c::I2c;

        let cam_params: CamParams =
            util::params::load("cam.toml").wrap_err("Could not load cam params")?;
        let car_params: CarParams =
            util::params::load("car.toml").wrap_err("Could not load car params")?;

        let mut cam = V4l2Camera::new(&cam_params).wrap_err("Failed to start the camera")?;

        let i2c = I2c::new().wrap_err("Failed to open the I2C bus")?;
        let driver = Pca9685::new(i2c, Address::default())
            .map_err(|e| eyre!("Failed to initialise the PCA9685 driver: {:?}", e))?;
        let mut car =
            Pca9685Car::new(driver, car_params).wrap_err("Failed to initialise the car")?;

        info!("Equipment initialisation complete\n");

        ctrl_loop
            .run(&mut cam, &mut car, &mut recorder, &stop)
            .wrap_err("Control loop failed")?
    };

    #[cfg(not(all(feature = "hw", target_arch = "arm")))]
    let report = {
        use lf_lib::eqpt::sim::{SimCamera, SimCar};

        info!("Hardware support not enabled, running against simulated equipment\n");

        let mut cam = SimCamera::new(SIM_FRAME_DIMS.0, SIM_FRAME_DIMS.1, SIM_DRIFT_PX);
        let mut car = SimCar::default();

        ctrl_loop
            .run(&mut cam, &mut car, &mut recorder, &stop)
            .wrap_err("Control loop failed")?
    };

    // ---- SAVE REPORT ----

    session.save("run_report.json", &report);
    info!("Run report saved to the session directory");

    Ok(())
}
