//! Implementations for the CtrlLoop state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// Internal
use super::{assess, CtrlLoopError, Params, RecoveryAction, StopCause};
use crate::eqpt::{FrameSink, FrameSource, SteeringActuator};
use crate::line_det::{self, Detection, LineDet};
use crate::steer_ctrl::{self, SteerCtrl};
use crate::viz;
use util::{
    archive::Archiver,
    maths::round_dp,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control loop state.
///
/// Owns the detection and steering modules and the per-run loop state, and
/// drives the external camera, car and frame sink collaborators.
#[derive(Default)]
pub struct CtrlLoop {
    pub(crate) params: Params,

    pub(crate) line_det: LineDet,
    pub(crate) steer_ctrl: SteerCtrl,

    pub(crate) state: LoopState,

    arch_ticks: Option<Archiver>,
}

/// Per-run mutable loop state, discarded at loop termination.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct LoopState {
    /// Number of completed ticks.
    pub iterations: u32,

    /// Consecutive ticks on which the line was not found.
    pub time_off_line: u32,

    /// The most recent error produced by an actual detection (never a
    /// recovery extrapolation).
    pub last_valid_error: f64,
}

/// Summary of a completed run.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RunReport {
    /// Number of completed ticks.
    pub iterations: u32,

    /// Why the run ended.
    pub stop_cause: StopCause,

    /// Mean achieved tick rate.
    ///
    /// Units: hertz
    pub mean_rate_hz: f64,
}

/// One row of the per-tick archive.
#[derive(Serialize)]
struct TickRecord {
    tick: u32,
    density: f64,
    centroid_px: Option<u32>,
    error: Option<f64>,
    steering: Option<f64>,
    speed: f64,
    time_off_line: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Outcome of a single tick.
enum TickOutcome {
    Continue,
    EndOfLine,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CtrlLoop {
    /// Initialise the control loop and its modules from the parameter files.
    pub fn init(&mut self, session: &Session) -> Result<(), CtrlLoopError> {
        self.params = params::load("ctrl_loop.toml")?;
        self.params.validate()?;

        self.line_det.init("line_det.toml", session)?;
        self.steer_ctrl.init("steer_ctrl.toml", session)?;

        self.arch_ticks = Some(Archiver::from_path(session, "ctrl_loop/ticks.csv")?);

        Ok(())
    }

    /// Create a control loop with the given parameters directly, without
    /// parameter files or a session. No archives are written.
    pub fn with_params(
        params: Params,
        det_params: line_det::Params,
        gains: steer_ctrl::Params,
    ) -> Result<Self, CtrlLoopError> {
        params.validate()?;

        Ok(CtrlLoop {
            params,
            line_det: LineDet::with_params(det_params)?,
            steer_ctrl: SteerCtrl::with_params(gains),
            state: LoopState::default(),
            arch_ticks: None,
        })
    }

    /// Run the control loop to completion.
    ///
    /// Returns when the iteration budget is exhausted, the recovery policy
    /// declares end of line, the stop flag is raised, or the equipment
    /// fails. On every one of those paths the car is brought to a stop and
    /// the frame sink is closed before returning.
    pub fn run<C, A, S>(
        &mut self,
        cam: &mut C,
        car: &mut A,
        sink: &mut S,
        stop: &AtomicBool,
    ) -> Result<RunReport, CtrlLoopError>
    where
        C: FrameSource,
        A: SteeringActuator,
        S: FrameSink,
    {
        info!(
            "Control loop starting with a budget of {} ticks",
            self.params.num_iterations
        );

        let start = Instant::now();

        let outcome = self.run_inner(cam, car, sink, stop);

        // The car must be left safed on every exit path, including
        // equipment errors and external stop requests
        if let Err(e) = car.stop() {
            warn!("Failed to stop the car during shutdown: {}", e);
        }
        if let Err(e) = sink.close() {
            warn!("Failed to close the frame sink: {}", e);
        }

        let stop_cause = outcome?;

        let elapsed_s = start.elapsed().as_secs_f64();
        let mean_rate_hz = if elapsed_s > 0.0 {
            round_dp(self.state.iterations as f64 / elapsed_s, 2)
        } else {
            0.0
        };

        info!(
            "Control loop finished: {:?} after {} ticks ({} Hz)",
            stop_cause, self.state.iterations, mean_rate_hz
        );

        Ok(RunReport {
            iterations: self.state.iterations,
            stop_cause,
            mean_rate_hz,
        })
    }

    /// The loop proper, separated from [`Self::run`] so that cleanup stays
    /// unconditional.
    fn run_inner<C, A, S>(
        &mut self,
        cam: &mut C,
        car: &mut A,
        sink: &mut S,
        stop: &AtomicBool,
    ) -> Result<StopCause, CtrlLoopError>
    where
        C: FrameSource,
        A: SteeringActuator,
        S: FrameSink,
    {
        loop {
            // The stop flag is observed exactly once per tick, at the start -
            // there is no mid-tick cancellation
            if stop.load(Ordering::Relaxed) {
                info!("External stop requested");
                return Ok(StopCause::StopRequested);
            }

            if self.state.iterations >= self.params.num_iterations {
                return Ok(StopCause::Complete);
            }

            let tick_start = Instant::now();

            if let TickOutcome::EndOfLine = self.tick(cam, car, sink)? {
                return Ok(StopCause::EndOfLine);
            }

            self.state.iterations += 1;

            // Cycle pacing - a zero period disables it
            if self.params.cycle_period_s > 0.0 {
                let period = Duration::from_secs_f64(self.params.cycle_period_s);

                match period.checked_sub(tick_start.elapsed()) {
                    Some(d) => std::thread::sleep(d),
                    None => warn!(
                        "Tick {} overran by {:.06} s",
                        self.state.iterations - 1,
                        tick_start.elapsed().as_secs_f64() - self.params.cycle_period_s
                    ),
                }
            }
        }
    }

    /// One pass of the capture, detect, recover-or-correct, actuate, log
    /// pipeline.
    fn tick<C, A, S>(
        &mut self,
        cam: &mut C,
        car: &mut A,
        sink: &mut S,
    ) -> Result<TickOutcome, CtrlLoopError>
    where
        C: FrameSource,
        A: SteeringActuator,
        S: FrameSink,
    {
        let tick = self.state.iterations;

        // Throttle follows the fixed pulse schedule, decoupled from steering
        let speed = self.params.throttle_demand(tick);
        car.set_speed(speed)?;

        let frame = cam.latest_frame()?;

        let (detection, det_report) = self.line_det.proc(&frame)?;

        let error = match detection {
            Detection::BadFrame => {
                // Unusable frame: log it for diagnostics and skip the tick
                // without touching the controller or the loss counter
                debug!(
                    "Tick {}: bad frame (density {:.3}), skipping",
                    tick, det_report.density
                );

                let overlay = viz::render_overlay(
                    &frame,
                    self.line_det.params(),
                    None,
                    car.current_steering(),
                );
                sink.write(&overlay)?;
                self.archive_tick(tick, det_report.density, None, None, None, speed)?;

                return Ok(TickOutcome::Continue);
            }

            Detection::NotFound => {
                match assess(
                    self.state.last_valid_error,
                    self.state.time_off_line,
                    &self.params,
                ) {
                    RecoveryAction::Terminate => {
                        info!("End of line detected on tick {}", tick);
                        return Ok(TickOutcome::EndOfLine);
                    }
                    RecoveryAction::Continue(synthetic) => {
                        self.state.time_off_line += 1;
                        debug!(
                            "Tick {}: line lost, steering with synthetic error {} \
                             ({} ticks off line)",
                            tick, synthetic, self.state.time_off_line
                        );
                        synthetic
                    }
                }
            }

            Detection::Line(e) => {
                self.state.time_off_line = 0;
                self.state.last_valid_error = e;
                e
            }
        };

        let (steering, _) = self.steer_ctrl.proc(&Some(error))?;
        car.set_steering(steering)?;

        let overlay = viz::render_overlay(
            &frame,
            self.line_det.params(),
            Some(error),
            car.current_steering(),
        );
        sink.write(&overlay)?;
        self.archive_tick(
            tick,
            det_report.density,
            det_report.centroid_px,
            Some(error),
            steering,
            speed,
        )?;

        Ok(TickOutcome::Continue)
    }

    /// Archive one tick record, if an archiver was set up.
    fn archive_tick(
        &mut self,
        tick: u32,
        density: f64,
        centroid_px: Option<u32>,
        error: Option<f64>,
        steering: Option<f64>,
        speed: f64,
    ) -> Result<(), CtrlLoopError> {
        if let Some(ref mut arch) = self.arch_ticks {
            arch.serialise(TickRecord {
                tick,
                density,
                centroid_px,
                error,
                steering,
                speed,
                time_off_line: self.state.time_off_line,
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::sim::{CarCall, NullSink, SimCar};
    use crate::eqpt::EqptError;
    use image::{Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Camera serving a fixed script of frames, then blanks. Optionally
    /// raises a stop flag after serving a given number of frames.
    struct ScriptedCamera {
        frames: VecDeque<RgbImage>,
        served: u32,
        raise_stop_after: Option<(u32, Arc<AtomicBool>)>,
    }

    impl ScriptedCamera {
        fn new(frames: Vec<RgbImage>) -> Self {
            Self {
                frames: frames.into(),
                served: 0,
                raise_stop_after: None,
            }
        }
    }

    impl FrameSource for ScriptedCamera {
        fn latest_frame(&mut self) -> Result<RgbImage, EqptError> {
            let frame = self.frames.pop_front().unwrap_or_else(blank_frame);

            self.served += 1;
            if let Some((after, ref flag)) = self.raise_stop_after {
                if self.served == after {
                    flag.store(true, Ordering::Relaxed);
                }
            }

            Ok(frame)
        }

        fn frame_dims(&self) -> (u32, u32) {
            (100, 100)
        }
    }

    fn blank_frame() -> RgbImage {
        RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))
    }

    fn saturated_frame() -> RgbImage {
        RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]))
    }

    /// A frame with a 31 px wide vertical blue stripe centred on the given
    /// column.
    fn stripe_frame(centre: u32) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, _| {
            if x + 15 >= centre && x <= centre + 15 {
                Rgb([0, 0, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn loop_params() -> Params {
        Params {
            num_iterations: 10,
            cycle_period_s: 0.0,
            ..Params::default()
        }
    }

    fn ctrl_loop(params: Params) -> CtrlLoop {
        CtrlLoop::with_params(
            params,
            crate::line_det::Params::default(),
            crate::steer_ctrl::Params::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_scripted_run_ends_at_end_of_line() {
        // Three good frames, one saturated, one blank - the spec scenario
        let mut cam = ScriptedCamera::new(vec![
            stripe_frame(50),
            stripe_frame(50),
            stripe_frame(50),
            saturated_frame(),
            blank_frame(),
        ]);
        let mut car = SimCar::default();
        let mut sink = NullSink::default();
        let stop = AtomicBool::new(false);

        let mut ctrl = ctrl_loop(loop_params());
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        // The blank frame follows a centred line, so the loss is classified
        // as a genuine end of line on the fifth tick
        assert_eq!(report.stop_cause, StopCause::EndOfLine);
        assert_eq!(report.iterations, 4);

        // Ticks 1-3 steer, the saturated tick 4 must not reach the
        // controller, tick 5 terminates before steering
        assert_eq!(
            car.calls,
            vec![
                CarCall::Speed(0.23),
                CarCall::Steering(Some(0.0)),
                CarCall::Speed(0.23),
                CarCall::Steering(Some(0.0)),
                CarCall::Speed(0.23),
                CarCall::Steering(Some(0.0)),
                CarCall::Speed(0.23),
                CarCall::Speed(0.23),
                CarCall::Stop,
            ]
        );

        // The bad frame is still logged, the terminating tick is not
        assert_eq!(sink.frames_written, 4);
        assert!(sink.closed);
    }

    #[test]
    fn test_offset_line_produces_proportional_steering() {
        let mut cam = ScriptedCamera::new(vec![stripe_frame(70), stripe_frame(70)]);
        let mut car = SimCar::default();
        let mut sink = NullSink::default();
        let stop = AtomicBool::new(false);

        let mut ctrl = ctrl_loop(loop_params());
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        // Error 0.4 with kp = 1.5 gives a 0.6 steering demand
        assert!(car.calls.contains(&CarCall::Steering(Some(0.6))));

        // The line was last seen well inside the steering threshold, so the
        // following blank frame ends the run
        assert_eq!(report.stop_cause, StopCause::EndOfLine);
    }

    #[test]
    fn test_recovery_extrapolates_then_terminates() {
        let mut cam = ScriptedCamera::new(vec![stripe_frame(90)]);
        let mut car = SimCar::default();
        let mut sink = NullSink::default();
        let stop = AtomicBool::new(false);

        let mut ctrl = ctrl_loop(Params {
            time_off_line_limit: 2,
            ..loop_params()
        });
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        // Tick 1 sees the line far right (error 0.82), ticks 2-4 extrapolate
        // with full right steering, tick 5 exceeds the loss limit
        assert_eq!(report.stop_cause, StopCause::EndOfLine);
        assert_eq!(report.iterations, 4);

        let full_right: Vec<_> = car
            .calls
            .iter()
            .filter(|c| **c == CarCall::Steering(Some(1.0)))
            .collect();
        // Tick 1 demand (1.5 * 0.82) also clamps to 1.0, then three
        // extrapolation ticks
        assert_eq!(full_right.len(), 4);
    }

    #[test]
    fn test_completes_iteration_budget_on_steady_line() {
        let mut cam = ScriptedCamera::new(vec![stripe_frame(50); 10]);
        let mut car = SimCar::default();
        let mut sink = NullSink::default();
        let stop = AtomicBool::new(false);

        let mut ctrl = ctrl_loop(loop_params());
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        assert_eq!(report.stop_cause, StopCause::Complete);
        assert_eq!(report.iterations, 10);
        assert_eq!(sink.frames_written, 10);
    }

    #[test]
    fn test_external_stop_safes_the_car() {
        let stop = Arc::new(AtomicBool::new(false));

        let mut cam = ScriptedCamera::new(vec![stripe_frame(50); 10]);
        cam.raise_stop_after = Some((3, stop.clone()));

        let mut car = SimCar::default();
        let mut sink = NullSink::default();

        let mut ctrl = ctrl_loop(loop_params());
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        // The flag is raised during tick 3 and observed at the start of
        // tick 4
        assert_eq!(report.stop_cause, StopCause::StopRequested);
        assert_eq!(report.iterations, 3);

        // The stop sequence runs exactly once, after every other demand
        assert_eq!(car.calls.last(), Some(&CarCall::Stop));
        assert_eq!(
            car.calls.iter().filter(|c| **c == CarCall::Stop).count(),
            1
        );
        assert!(sink.closed);
    }

    #[test]
    fn test_bad_frames_do_not_reset_or_advance_recovery() {
        // A far-right line, then a saturated frame, then a blank: the bad
        // frame must leave both the loss counter and the last valid error
        // untouched, so the blank still extrapolates
        let mut cam = ScriptedCamera::new(vec![
            stripe_frame(90),
            saturated_frame(),
            blank_frame(),
            stripe_frame(90),
        ]);
        let mut car = SimCar::default();
        let mut sink = NullSink::default();
        let stop = AtomicBool::new(false);

        let mut ctrl = ctrl_loop(Params {
            num_iterations: 4,
            ..loop_params()
        });
        let report = ctrl.run(&mut cam, &mut car, &mut sink, &stop).unwrap();

        assert_eq!(report.stop_cause, StopCause::Complete);
        assert_eq!(report.iterations, 4);

        // Tick 3 extrapolated (loss count 1), tick 4 reset the counter
        assert_eq!(ctrl.state.time_off_line, 0);
        assert_eq!(ctrl.state.last_valid_error, 0.82);
    }
}
