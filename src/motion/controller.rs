// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Motion controller.
//!
//! Owns the main-loop half of the motion subsystem for one robot: axis configuration, geometry,
//! planner, the producer end of the pipeline and the homing sequencer. The interrupt half (step
//! generator and hardware port) sits behind a [`StepperPort`]. Two entry points drive it:
//!
//! - The step timer interrupt ticks the [`StepEngine`] every
//!   [`TICK_INTERVAL_NS`](crate::motion::block::TICK_INTERVAL_NS).
//! - Everything else runs from the main loop, with [`MotionController::service`] called about
//!   once per millisecond.
//!
//! Planning never holds off the tick: blocks pass through the lock-free pipeline, and the port is
//! only entered for a few field reads or writes at a time.
//!
//! ```ignore
//! let (writer, reader) = pipeline.split();
//! let engine = StepEngine::new(reader, io);
//! let mut motion = MotionController::new(&cfg, writer, engine)?;
//! motion.submit_move(&MoveArgs::new().with_axis(0, 20.0).with_axis(1, 35.0))?;
//! loop {
//!     motion.service(now_ms());
//! }
//! ```

use heapless::Vec;
use log::{debug, info, warn};

use crate::kinematics::{Geometry, Kinematics, RobotAttributes};
use crate::motion::args::{MoveArgs, MoveMode};
use crate::motion::block::MotionBlock;
use crate::motion::config::{AxesConfig, MotionConfig};
use crate::motion::enabler::MotorEnabler;
use crate::motion::engine::{StepEngine, StepperPort};
use crate::motion::error::{ConfigError, MoveError};
use crate::motion::homing::{HomingSequencer, HomingStep};
use crate::motion::io::MotionIo;
use crate::motion::pipeline::{BlockWriter, DEFAULT_PIPELINE_LEN};
use crate::motion::planner::MotionPlanner;
use crate::motion::status::MotionStatus;
use crate::motion::values::{AxisEnd, AxisFloats, AxisPosition, StepCounts, MAX_AXES};

/// Segment length below which moves are never subdivided.
const MIN_BLOCK_DISTANCE: f32 = 0.01;

/// A long move being queued one segment at a time.
#[derive(Copy, Clone, Debug)]
struct SplitMove {
    args: MoveArgs,
    start: AxisFloats,
    end: AxisFloats,
    segments: u32,
    next: u32,
}

impl SplitMove {
    /// Point `k` of `segments` along the line.
    fn point(&self, k: u32) -> AxisFloats {
        let frac = k as f32 / self.segments as f32;
        let mut out = self.end;
        for axis in 0..MAX_AXES {
            if self.end.is_valid(axis) {
                let (a, b) = (self.start.get(axis), self.end.get(axis));
                out.set(axis, a + (b - a) * frac);
            }
        }
        out
    }
}

/// Motion subsystem of one robot, generic over how it reaches the step generator.
pub struct MotionController<P: StepperPort<N>, const N: usize = DEFAULT_PIPELINE_LEN> {
    stepper: P,
    axes: AxesConfig,
    geometry: Geometry,
    pipeline: BlockWriter<N>,
    planner: MotionPlanner,
    homing: HomingSequencer,
    enabler: MotorEnabler,

    /// Last commanded position
    pos: AxisPosition,
    relative: bool,
    allow_out_of_bounds: bool,
    block_distance: f32,
    split: Option<SplitMove>,
    now_ms: u32,
}

impl<P: StepperPort<N>, const N: usize> MotionController<P, N> {
    /// Validate `cfg` and build the controller on an empty pipeline. Motors start disabled at
    /// home.
    pub fn new(cfg: &MotionConfig, mut pipeline: BlockWriter<N>, mut stepper: P) -> Result<Self, ConfigError> {
        let axes = cfg.axes_config()?;

        let len = cfg.pipeline_len.min(N);
        if len < cfg.pipeline_len {
            warn!("motion: pipeline length {} capped at {}", cfg.pipeline_len, N);
        }
        pipeline.set_len(len)?;

        let mut pos = AxisPosition::default();
        for axis in 0..axes.num_axes() {
            let home = axes.axis(axis);
            pos.units.set(axis, home.home_offset_val);
            pos.steps_from_home[axis] = home.home_off_steps;
        }

        let mut enabler = MotorEnabler::new(cfg.step_disable_secs);
        stepper.with_engine(|engine| {
            for axis in 0..axes.num_axes() {
                engine
                    .generator_mut()
                    .set_total_step_position(axis, pos.steps_from_home[axis]);
            }
            enabler.disable(engine.io_mut());
        });

        info!(
            "motion: {:?}, {} axes, pipeline {}, block {} mm, junction dev {}",
            cfg.robot_geom,
            axes.num_axes(),
            len,
            cfg.block_distance_mm,
            cfg.junction_deviation
        );

        Ok(Self {
            stepper,
            axes,
            geometry: cfg.robot_geom,
            pipeline,
            planner: MotionPlanner::new(cfg.junction_deviation),
            homing: HomingSequencer::new(&cfg.homing),
            enabler,
            pos,
            relative: false,
            allow_out_of_bounds: cfg.allow_out_of_bounds,
            block_distance: cfg.block_distance_mm,
            split: None,
            now_ms: 0,
        })
    }

    // ================================================================
    // Move submission
    // ================================================================

    /// Whether [`submit_move`](Self::submit_move) would currently be accepted.
    pub fn can_accept(&self) -> bool {
        !self.homing.is_homing() && self.split.is_none() && self.pipeline.can_accept()
    }

    /// Queue a move.
    ///
    /// A move with any step target is stepwise and bypasses the kinematics. Otherwise the target
    /// is in working units; axes left unset keep their last commanded value. Long moves are
    /// split into segments of at most `blockDistanceMM`, the rest of which are queued from
    /// [`service`](Self::service) as space frees up.
    ///
    /// A move rejected up front leaves the commanded position and the queue untouched. If a split
    /// move ends early anyway, the segments already queued stay and run to a stop.
    pub fn submit_move(&mut self, args: &MoveArgs) -> Result<(), MoveError> {
        self.reconcile_aborted();
        if self.homing.is_homing() || self.split.is_some() {
            return Err(MoveError::Busy);
        }
        if !self.pipeline.can_accept() {
            return Err(MoveError::PipelineFull);
        }

        let relative = match args.mode() {
            MoveMode::Relative => true,
            MoveMode::Absolute => false,
            MoveMode::Default => self.relative,
        };

        if args.is_stepwise() {
            let args = if relative {
                args.relative()
            } else {
                args.absolute()
            };
            return self.add_stepwise(&args);
        }

        let mut dest = self.pos.units;
        let target = args.target();
        for axis in 0..self.axes.num_axes() {
            if target.is_valid(axis) {
                let val = target.get(axis);
                dest.set(axis, if relative { dest.get(axis) + val } else { val });
            }
        }
        let mut args = *args;
        args.set_target(dest);

        let length = dest.distance_to(&self.pos.units, &self.axes.primary_mask());
        let segments = if self.block_distance > MIN_BLOCK_DISTANCE && !args.is_dont_split() {
            libm::ceilf(length / self.block_distance) as u32
        } else {
            1
        };
        if segments <= 1 {
            return self.add_to_planner(&args);
        }

        // Reject an unreachable end point before any segment is queued
        let allow = args.is_out_of_bounds_allowed() || self.allow_out_of_bounds;
        self.geometry
            .to_actuator(&dest, &self.pos, &self.axes, allow)?;

        debug!("motion: {} mm split into {} segments", length, segments);
        self.split = Some(SplitMove {
            args,
            start: self.pos.units,
            end: dest,
            segments,
            next: 0,
        });
        self.continue_split()
    }

    /// Queue as many pending segments as fit. An error drops the rest of the move.
    fn continue_split(&mut self) -> Result<(), MoveError> {
        while self.pipeline.can_accept() {
            let Some(split) = self.split.as_mut() else {
                break;
            };
            split.next += 1;
            let last = split.next >= split.segments;
            let mut seg = split.args;
            if last {
                seg.set_target(split.end);
                self.split = None;
            } else {
                seg.set_target(split.point(split.next));
                seg.set_more_moves_coming(true);
                seg.set_sequence_id(None);
            }

            match self.add_to_planner(&seg) {
                Ok(()) => {}
                Err(MoveError::NoMovement) => {
                    if last {
                        self.planner.release_tail(&mut self.pipeline, &self.axes);
                    }
                }
                Err(e) => {
                    warn!("motion: split move dropped: {}", e);
                    self.split = None;
                    self.planner.release_tail(&mut self.pipeline, &self.axes);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn add_to_planner(&mut self, args: &MoveArgs) -> Result<(), MoveError> {
        let allow = args.is_out_of_bounds_allowed() || self.allow_out_of_bounds;
        let dest = self
            .geometry
            .to_actuator(args.target(), &self.pos, &self.axes, allow)?;
        self.planner
            .move_to(args, &dest, &mut self.pos, &self.axes, &mut self.pipeline)?;
        self.pos.units = *args.target();
        self.geometry.correct_overflow(&mut self.pos, &self.axes);
        self.enable_motors();
        Ok(())
    }

    fn add_stepwise(&mut self, args: &MoveArgs) -> Result<(), MoveError> {
        self.planner
            .move_to_stepwise(args, &mut self.pos, &self.axes, &mut self.pipeline)?;
        self.pos.units = self
            .geometry
            .from_actuator(&self.pos.steps_from_home, &self.pos, &self.axes);
        self.enable_motors();
        Ok(())
    }

    /// Pull the commanded position back by whatever end-stop aborts left unexecuted.
    fn reconcile_aborted(&mut self) {
        let Some(skipped) = self
            .stepper
            .with_engine(|engine| engine.generator_mut().take_skipped_steps())
            .flatten()
        else {
            return;
        };
        for (total, lost) in self.pos.steps_from_home.iter_mut().zip(skipped) {
            *total -= lost;
        }
        self.pos.units = self
            .geometry
            .from_actuator(&self.pos.steps_from_home, &self.pos, &self.axes);
        debug!("motion: end-stop abort, {:?} steps skipped", skipped);
    }

    fn enable_motors(&mut self) {
        let (enabler, now_ms) = (&mut self.enabler, self.now_ms);
        self.stepper
            .with_engine(|engine| enabler.enable(engine.io_mut(), now_ms));
    }

    // ================================================================
    // Periodic work
    // ================================================================

    /// Main-loop housekeeping: queue pending split segments, run homing, time out the motors.
    pub fn service(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
        self.reconcile_aborted();

        if self.split.is_some() {
            // Already logged; the remaining segments are gone
            let _ = self.continue_split();
        }
        self.service_homing(now_ms);

        if !self.pipeline.is_empty() {
            self.enable_motors();
        }
        let enabler = &mut self.enabler;
        self.stepper
            .with_engine(|engine| enabler.service(engine.io_mut(), now_ms));
    }

    fn service_homing(&mut self, now_ms: u32) {
        while self.pipeline.can_accept() {
            let last_done = self.last_completed_sequence_id();
            let Some(step) = self.homing.service(now_ms, last_done, &self.axes) else {
                break;
            };
            match step {
                HomingStep::SetHome(axis) => self.set_current_position_as_home(axis),
                HomingStep::Move(args) => {
                    if let Err(e) = self.add_stepwise(&args) {
                        debug!("homing: move skipped: {}", e);
                        self.homing.cancel_command();
                    }
                }
            }
        }
    }

    // ================================================================
    // Control
    // ================================================================

    /// Hold (true) or resume (false) stepping. Queued blocks are kept.
    pub fn pause(&mut self, paused: bool) {
        if paused != self.is_paused() {
            info!("motion: {}", if paused { "paused" } else { "resumed" });
        }
        self.stepper
            .with_engine(|engine| engine.generator_mut().pause(paused));
    }

    pub fn is_paused(&self) -> bool {
        self.stepper
            .inspect(|engine| engine.generator().is_paused())
            .unwrap_or_default()
    }

    /// Latched when an end-stop test aborts a block; cleared by `pause(false)` or [`stop`](Self::stop).
    pub fn is_endstop_hit(&self) -> bool {
        self.stepper
            .inspect(|engine| engine.generator().is_endstop_hit())
            .unwrap_or_default()
    }

    /// Drop all queued motion, abort homing, and take the position actually reached as the
    /// commanded one.
    pub fn stop(&mut self) {
        self.split = None;
        let steps = self
            .stepper
            .with_engine(|engine| {
                engine.stop();
                engine.generator().total_step_position()
            })
            .unwrap_or(self.pos.steps_from_home);
        self.planner.reset();
        self.homing.abort();

        self.pos.units = self.geometry.from_actuator(&steps, &self.pos, &self.axes);
        self.pos.steps_from_home = steps;
        info!("motion: stopped at {:?}", steps);
    }

    /// Sticky mode for moves that carry no relative/absolute override.
    pub fn set_relative(&mut self, relative: bool) {
        self.relative = relative;
    }

    #[inline]
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Declare the current position of `axis` to be its configured home.
    pub fn set_current_position_as_home(&mut self, axis: usize) {
        let Some(cfg) = self.axes.get(axis) else {
            return;
        };
        let steps = cfg.home_off_steps;
        self.pos.units.set(axis, cfg.home_offset_val);
        self.pos.steps_from_home[axis] = steps;
        self.stepper
            .with_engine(|engine| engine.generator_mut().set_total_step_position(axis, steps));
    }

    /// Run the configured homing sequence for the axes present in `args` (all if none).
    ///
    /// Queued motion is dropped first.
    pub fn start_homing(&mut self, args: &MoveArgs) {
        self.stop();
        self.homing.start(args);
        self.enable_motors();
    }

    #[inline]
    pub fn is_homing(&self) -> bool {
        self.homing.is_homing()
    }

    #[inline]
    pub fn is_homed(&self) -> bool {
        self.homing.is_homed()
    }

    /// No motion queued or pending.
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_empty() && self.split.is_none() && !self.homing.is_homing()
    }

    // ================================================================
    // Reporting
    // ================================================================

    /// Current state; the position comes from steps actually issued.
    pub fn status(&mut self) -> MotionStatus {
        let num_axes = self.axes.num_axes();
        let (steps, endstops, paused, endstop_hit) = self
            .stepper
            .with_engine(|engine| {
                let mut endstops = [[false; 2]; MAX_AXES];
                let io = engine.io_mut();
                for (axis, ends) in endstops.iter_mut().enumerate().take(num_axes) {
                    for (slot, end) in ends.iter_mut().zip(AxisEnd::BOTH) {
                        *slot = io.has_endstop(axis, end) && io.read_endstop(axis, end);
                    }
                }
                let gen = engine.generator();
                (
                    gen.total_step_position(),
                    endstops,
                    gen.is_paused(),
                    gen.is_endstop_hit(),
                )
            })
            .unwrap_or((self.pos.steps_from_home, [[false; 2]; MAX_AXES], false, false));
        let position = self.geometry.from_actuator(&steps, &self.pos, &self.axes);

        MotionStatus {
            position: *position.values(),
            steps,
            endstops,
            queued: self.pipeline.count(),
            paused,
            endstop_hit,
            homing: self.homing.is_homing(),
            homed: self.homing.is_homed(),
            relative: self.relative,
        }
    }

    /// Steps actually issued, relative to home.
    pub fn step_position(&self) -> StepCounts {
        self.stepper
            .inspect(|engine| engine.generator().total_step_position())
            .unwrap_or(self.pos.steps_from_home)
    }

    /// Commanded position, including moves still queued.
    #[inline]
    pub fn commanded_position(&self) -> &AxisPosition {
        &self.pos
    }

    pub fn attributes(&self) -> RobotAttributes {
        self.geometry.attributes(&self.axes)
    }

    pub fn last_completed_sequence_id(&self) -> Option<u32> {
        self.stepper
            .inspect(|engine| engine.generator().last_completed_sequence_id())
            .flatten()
    }

    #[inline]
    pub fn axes(&self) -> &AxesConfig {
        &self.axes
    }

    #[inline]
    pub fn queued_count(&self) -> usize {
        self.pipeline.count()
    }

    #[inline]
    pub fn pipeline_capacity(&self) -> usize {
        self.pipeline.capacity()
    }

    /// Copies of the queued blocks, oldest first.
    pub fn queued_blocks(&mut self) -> Vec<MotionBlock, N> {
        self.pipeline.blocks()
    }
}

/// Host build: the controller owns its engine and is ticked directly.
impl<IO: MotionIo, const N: usize> MotionController<StepEngine<IO, N>, N> {
    /// Step timer interrupt body.
    #[inline]
    pub fn on_tick(&mut self) {
        self.stepper.on_tick();
    }

    #[inline]
    pub fn io(&self) -> &IO {
        self.stepper.io()
    }

    #[inline]
    pub fn io_mut(&mut self) -> &mut IO {
        self.stepper.io_mut()
    }
}
