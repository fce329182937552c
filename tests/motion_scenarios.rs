// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! End-to-end runs of the motion controller against a simulated machine.

use plotbot::kinematics::Geometry;
use plotbot::motion::{
    AxisConfig, AxisEnd, EndstopCheck, HomingConfig, MotionConfig, MotionController, MotionIo,
    MotionPipeline, MoveArgs, MoveError, StepEngine, MAX_AXES,
};

/// Ticks per millisecond at the 20 µs tick.
const TICKS_PER_MS: u32 = 50;

/// Steppers that really move, and min switches that close at a fixed position.
#[derive(Default)]
struct SimMachine {
    pos: [i32; MAX_AXES],
    forward: [bool; MAX_AXES],
    high: [bool; MAX_AXES],
    min_switch_at: [Option<i32>; MAX_AXES],
    enabled: bool,
}

impl MotionIo for SimMachine {
    fn set_direction(&mut self, axis: usize, forward: bool) {
        self.forward[axis] = forward;
    }

    fn pulse_start(&mut self, axis: usize) {
        assert!(!self.high[axis], "step pulse restarted while high");
        assert!(self.enabled, "stepping with drivers disabled");
        self.high[axis] = true;
        self.pos[axis] += if self.forward[axis] { 1 } else { -1 };
    }

    fn pulse_end(&mut self, axis: usize) -> bool {
        core::mem::replace(&mut self.high[axis], false)
    }

    fn read_endstop(&mut self, axis: usize, end: AxisEnd) -> bool {
        match end {
            AxisEnd::Min => self.min_switch_at[axis].is_some_and(|at| self.pos[axis] <= at),
            AxisEnd::Max => false,
        }
    }

    fn has_endstop(&self, axis: usize, end: AxisEnd) -> bool {
        end == AxisEnd::Min && self.min_switch_at[axis].is_some()
    }

    fn enable_motors(&mut self, on: bool) {
        self.enabled = on;
    }
}

struct Rig<const N: usize> {
    motion: MotionController<StepEngine<SimMachine, N>, N>,
    ticks: u32,
}

impl<const N: usize> Rig<N> {
    fn new(cfg: &MotionConfig, machine: SimMachine) -> Self {
        let (writer, reader) = Box::leak(Box::new(MotionPipeline::<N>::new())).split();
        Self {
            motion: MotionController::new(cfg, writer, StepEngine::new(reader, machine)).unwrap(),
            ticks: 0,
        }
    }

    fn now_ms(&self) -> u32 {
        self.ticks / TICKS_PER_MS
    }

    fn tick(&mut self) {
        self.motion.on_tick();
        self.ticks += 1;
        if self.ticks % TICKS_PER_MS == 0 {
            let now = self.now_ms();
            self.motion.service(now);
        }
    }

    fn run_until_idle(&mut self, max_ticks: u32) {
        let limit = self.ticks + max_ticks;
        while !self.motion.is_idle() {
            assert!(self.ticks < limit, "still busy after {} ticks", max_ticks);
            self.tick();
        }
        let now = self.now_ms();
        self.motion.service(now);
    }

    /// Keep offering `args` until the controller takes it.
    fn submit_blocking(&mut self, args: &MoveArgs) {
        loop {
            match self.motion.submit_move(args) {
                Ok(()) => return,
                Err(e) if e.is_retryable() => {
                    for _ in 0..TICKS_PER_MS {
                        self.tick();
                    }
                }
                Err(e) => panic!("move rejected: {}", e),
            }
        }
    }
}

fn linear_axis() -> AxisConfig {
    AxisConfig::default()
        .with_rotation(100.0, 1.0)
        .with_max_speed(100.0)
        .with_max_accel(100.0)
        .with_max_rpm(9600.0)
        .with_limits(Some(0.0), Some(200.0))
}

fn plotter(homing_seq: &str) -> MotionConfig {
    let mut cfg = MotionConfig {
        robot_geom: Geometry::Cartesian,
        homing: HomingConfig::with_sequence(homing_seq).unwrap(),
        ..Default::default()
    };
    cfg.axes.push(linear_axis()).unwrap();
    cfg.axes.push(linear_axis()).unwrap();
    cfg
}

#[test]
fn stepwise_relative_block_runs_at_axis_limit() {
    let axis = AxisConfig::default()
        .with_max_speed(50.0)
        .with_max_accel(50.0)
        .with_max_rpm(30.0)
        .with_rotation(9600.0, 1.0)
        .with_limits(None, Some(92.5));
    let mut cfg = MotionConfig {
        robot_geom: Geometry::SandTableScara,
        ..Default::default()
    };
    cfg.axes.push(axis.clone()).unwrap();
    cfg.axes.push(axis).unwrap();

    let mut rig = Rig::<16>::new(&cfg, SimMachine::default());
    let args = MoveArgs::new()
        .with_axis_steps(0, -10_000)
        .with_axis_steps(1, 10_000)
        .relative();
    rig.motion.submit_move(&args).unwrap();
    rig.run_until_idle(200_000);

    assert_eq!(rig.motion.io().pos[..2], [-10_000, 10_000]);
    assert_eq!(rig.motion.status().steps[..2], [-10_000, 10_000]);
    // 4800 steps/s plus one pulse-end tick per step
    assert!((100_000..130_000).contains(&rig.ticks), "{} ticks", rig.ticks);
}

#[test]
fn homing_finds_switches_and_backs_off() {
    let seq = "A-50000N;#;B-50000N;#;A+50;B+50;#;A=h;B=h;$";
    let machine = SimMachine {
        pos: [1234, 777, 0],
        min_switch_at: [Some(0), Some(0), None],
        ..Default::default()
    };
    let mut rig = Rig::<8>::new(&plotter(seq), machine);

    rig.motion.start_homing(&MoveArgs::new());
    rig.run_until_idle(500_000);

    assert!(rig.motion.is_homed());
    assert_eq!(rig.motion.io().pos[..2], [50, 50]);
    let status = rig.motion.status();
    assert_eq!(status.steps[..2], [0, 0]);
    assert!(status.homed && !status.homing);
    assert_eq!(rig.motion.commanded_position().steps_from_home[..2], [0, 0]);

    // Absolute moves are now measured from the switch
    rig.motion
        .submit_move(&MoveArgs::new().with_axis(0, 10.0).with_axis(1, 5.0))
        .unwrap();
    rig.run_until_idle(500_000);
    assert_eq!(rig.motion.io().pos[..2], [1050, 550]);
}

#[test]
fn homing_times_out_without_switch() {
    let mut cfg = plotter("A-1000000N;#;A=h;$");
    cfg.homing.max_homing_secs = 1;
    let mut rig = Rig::<8>::new(&cfg, SimMachine::default());

    rig.motion.start_homing(&MoveArgs::new());
    for _ in 0..(2_000 * TICKS_PER_MS) {
        rig.tick();
    }
    assert!(!rig.motion.is_homing());
    assert!(!rig.motion.is_homed());
}

#[test]
fn polyline_with_backpressure_ends_on_target() {
    let mut cfg = plotter("");
    cfg.block_distance_mm = 2.0;
    let mut rig = Rig::<4>::new(&cfg, SimMachine::default());

    let points = [
        (10.0, 0.0),
        (10.0, 10.0),
        (0.0, 10.0),
        (25.5, 17.25),
        (3.0, 40.0),
        (3.0, 40.5),
        (60.0, 12.0),
    ];
    for (i, &(x, y)) in points.iter().enumerate() {
        rig.submit_blocking(&MoveArgs::new().with_axis(0, x).with_axis(1, y).numbered(i as u32));
    }
    rig.run_until_idle(5_000_000);

    assert_eq!(rig.motion.io().pos[..2], [6000, 1200]);
    assert_eq!(rig.motion.last_completed_sequence_id(), Some(6));
    let status = rig.motion.status();
    assert!((status.position[0] - 60.0).abs() < 1e-3);
    assert!((status.position[1] - 12.0).abs() < 1e-3);
}

#[test]
fn endstop_abort_then_continue_from_actual_position() {
    let machine = SimMachine {
        pos: [500, 0, 0],
        min_switch_at: [Some(0), None, None],
        ..Default::default()
    };
    let mut rig = Rig::<8>::new(&plotter(""), machine);
    // The controller believes it is at 0 with the switch actually 5 mm away
    rig.motion.set_current_position_as_home(0);

    let seek = MoveArgs::new()
        .with_axis(0, -20.0)
        .relative()
        .allow_out_of_bounds()
        .with_endstop(0, AxisEnd::Min, EndstopCheck::Hit);
    rig.motion.submit_move(&seek).unwrap();
    rig.run_until_idle(1_000_000);

    assert_eq!(rig.motion.io().pos[0], 0);
    assert_eq!(rig.motion.status().steps[0], -500);
    assert_eq!(rig.motion.commanded_position().steps_from_home[0], -500);
    assert!((rig.motion.commanded_position().units.get(0) + 5.0).abs() < 1e-3);

    rig.motion
        .submit_move(&MoveArgs::new().with_axis(0, 1.0).relative().allow_out_of_bounds())
        .unwrap();
    rig.run_until_idle(1_000_000);
    assert_eq!(rig.motion.io().pos[0], 100);
    assert!(rig.motion.status().endstop_hit);
}

#[test]
fn stop_mid_move_then_resume_from_reached_position() {
    let mut rig = Rig::<8>::new(&plotter(""), SimMachine::default());
    rig.motion.submit_move(&MoveArgs::new().with_axis(0, 150.0)).unwrap();
    rig.motion.submit_move(&MoveArgs::new().with_axis(1, 150.0)).unwrap();
    for _ in 0..30_000 {
        rig.tick();
    }
    rig.motion.stop();
    assert!(rig.motion.is_idle());
    let reached = rig.motion.io().pos[0];
    assert!(reached > 0 && reached < 15_000);

    rig.motion.submit_move(&MoveArgs::new().with_axis(0, 20.0)).unwrap();
    rig.run_until_idle(2_000_000);
    assert_eq!(rig.motion.io().pos[..2], [2000, 0]);
}

#[test]
fn rejected_moves_leave_queue_alone() {
    let mut rig = Rig::<8>::new(&plotter(""), SimMachine::default());
    assert_eq!(
        rig.motion.submit_move(&MoveArgs::new().with_axis(1, -1.0)),
        Err(MoveError::OutOfBounds)
    );
    assert_eq!(
        rig.motion.submit_move(&MoveArgs::new().with_axis(1, 0.0)),
        Err(MoveError::NoMovement)
    );
    assert!(rig.motion.is_idle());
    assert_eq!(rig.motion.status().queued, 0);
}

#[test]
fn sand_table_reaches_target() {
    let arm = AxisConfig::default()
        .with_rotation(9600.0, 1.0)
        .with_max_rpm(30.0)
        .with_limits(None, Some(92.5));
    let mut cfg = MotionConfig {
        robot_geom: Geometry::SandTableScara,
        ..Default::default()
    };
    cfg.axes.push(arm.clone()).unwrap();
    cfg.axes.push(arm).unwrap();
    let mut rig = Rig::<8>::new(&cfg, SimMachine::default());

    for &(x, y) in &[(50.0, 50.0), (-100.0, 20.0), (0.0, 0.0)] {
        rig.motion
            .submit_move(&MoveArgs::new().with_axis(0, x).with_axis(1, y))
            .unwrap();
        rig.run_until_idle(2_000_000);
        let status = rig.motion.status();
        assert!((status.position[0] - x).abs() < 0.2, "x {} vs {}", status.position[0], x);
        assert!((status.position[1] - y).abs() < 0.2, "y {} vs {}", status.position[1], y);
    }
}
