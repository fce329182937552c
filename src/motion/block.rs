// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! One planned straight-line segment in actuator step space.
//!
//! The planner fills in the geometry (step counts, distance, unit vector) and the speed envelope
//! (entry, exit, junction cap). [`MotionBlock::prepare_for_stepping`] then turns that envelope
//! into fixed-point ramp parameters so the step generator never touches floating point.
//!
//! Rates in the ramp are "TTicks" values: steps per tick scaled by [`TTICKS_VALUE`]. A step is
//! emitted each time the step accumulator passes [`TTICKS_VALUE`].

use crate::motion::config::AxesConfig;
use crate::motion::values::{EndstopChecks, StepCounts, MAX_AXES};

/// Step generator tick period.
pub const TICK_INTERVAL_NS: u32 = 20_000;
/// Fixed-point unit of one step.
pub const TTICKS_VALUE: u32 = 1_000_000_000;
pub const TICKS_PER_SEC: u32 = 1_000_000_000 / TICK_INTERVAL_NS;
pub const NS_IN_A_MS: u32 = 1_000_000;
/// Multiplier converting steps/s into a TTicks rate.
pub const TTICKS_PER_STEP_PER_SEC: u32 = TTICKS_VALUE / TICKS_PER_SEC;
/// Moves shorter than this (units, primary axes) are treated as no movement.
pub const MIN_MOVE_DIST: f32 = 0.0001;

/// Convert steps/s to a TTicks rate, saturating below one step per tick.
#[inline]
pub fn step_rate_to_tticks(steps_per_sec: f32) -> u32 {
    let rate = steps_per_sec.clamp(0.0, TICKS_PER_SEC as f32) * TTICKS_PER_STEP_PER_SEC as f32;
    (rate as u32).min(TTICKS_VALUE - 1)
}

/// Convert a TTicks rate back to steps/s.
#[inline]
pub fn tticks_to_step_rate(tticks: u32) -> f32 {
    tticks as f32 / TTICKS_PER_STEP_PER_SEC as f32
}

/// `sqrt(v² + 2ad)`: speed reachable from `v` over distance `d` at acceleration `a`.
#[inline]
pub fn max_achievable_speed(accel: f32, velocity: f32, distance: f32) -> f32 {
    libm::sqrtf(velocity * velocity + 2.0 * accel * distance)
}

/// A planned motion segment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionBlock {
    steps: StepCounts,
    axis_with_max_steps: usize,

    /// Units (or steps/s for stepwise blocks)
    pub(crate) feedrate: f32,
    /// Path length over primary axes
    pub(crate) move_distance: f32,
    pub(crate) unit_vector: [f32; MAX_AXES],

    pub(crate) entry_speed: f32,
    pub(crate) exit_speed: f32,
    /// Junction-deviation bound on `entry_speed`
    pub(crate) max_entry_speed: f32,

    // Ramp, TTicks units
    initial_rate: u32,
    peak_rate: u32,
    final_rate: u32,
    accel_per_ms: u32,
    steps_before_decel: u32,

    pub(crate) is_executing: bool,
    pub(crate) can_execute: bool,
    pub(crate) followed_by_more: bool,
    pub(crate) stepwise: bool,

    pub(crate) endstops: EndstopChecks,
    pub(crate) sequence_id: Option<u32>,
}

impl MotionBlock {
    pub const EMPTY: MotionBlock = MotionBlock::new();

    pub const fn new() -> Self {
        Self {
            steps: [0; MAX_AXES],
            axis_with_max_steps: 0,
            feedrate: 0.0,
            move_distance: 0.0,
            unit_vector: [0.0; MAX_AXES],
            entry_speed: 0.0,
            exit_speed: 0.0,
            max_entry_speed: 0.0,
            initial_rate: 0,
            peak_rate: 0,
            final_rate: 0,
            accel_per_ms: 0,
            steps_before_decel: 0,
            is_executing: false,
            can_execute: false,
            followed_by_more: false,
            stepwise: false,
            endstops: EndstopChecks::none(),
            sequence_id: None,
        }
    }

    /// Set the signed step count for `axis`, tracking the axis with the most steps.
    pub fn set_steps(&mut self, axis: usize, steps: i32) {
        if axis >= MAX_AXES {
            return;
        }
        self.steps[axis] = steps;
        if steps.unsigned_abs() > self.steps[self.axis_with_max_steps].unsigned_abs() {
            self.axis_with_max_steps = axis;
        }
    }

    #[inline]
    pub fn steps(&self, axis: usize) -> i32 {
        self.steps[axis]
    }

    #[inline]
    pub fn abs_steps(&self, axis: usize) -> u32 {
        self.steps[axis].unsigned_abs()
    }

    #[inline]
    pub fn step_counts(&self) -> &StepCounts {
        &self.steps
    }

    /// Axis whose step count drives the ramp clock.
    #[inline]
    pub fn axis_with_max_steps(&self) -> usize {
        self.axis_with_max_steps
    }

    #[inline]
    pub fn has_steps(&self) -> bool {
        self.steps.iter().any(|&s| s != 0)
    }

    #[inline]
    pub fn feedrate(&self) -> f32 {
        self.feedrate
    }

    #[inline]
    pub fn move_distance(&self) -> f32 {
        self.move_distance
    }

    #[inline]
    pub fn entry_speed(&self) -> f32 {
        self.entry_speed
    }

    #[inline]
    pub fn exit_speed(&self) -> f32 {
        self.exit_speed
    }

    #[inline]
    pub fn max_entry_speed(&self) -> f32 {
        self.max_entry_speed
    }

    #[inline]
    pub fn initial_rate(&self) -> u32 {
        self.initial_rate
    }

    #[inline]
    pub fn peak_rate(&self) -> u32 {
        self.peak_rate
    }

    #[inline]
    pub fn final_rate(&self) -> u32 {
        self.final_rate
    }

    #[inline]
    pub fn accel_per_ms(&self) -> u32 {
        self.accel_per_ms
    }

    #[inline]
    pub fn steps_before_decel(&self) -> u32 {
        self.steps_before_decel
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.is_executing
    }

    #[inline]
    pub fn can_execute(&self) -> bool {
        self.can_execute
    }

    #[inline]
    pub fn followed_by_more(&self) -> bool {
        self.followed_by_more
    }

    #[inline]
    pub fn is_stepwise(&self) -> bool {
        self.stepwise
    }

    #[inline]
    pub fn endstops(&self) -> EndstopChecks {
        self.endstops
    }

    #[inline]
    pub fn sequence_id(&self) -> Option<u32> {
        self.sequence_id
    }

    /// Compute the fixed-point ramp from the current entry/exit speeds and feedrate.
    ///
    /// Returns false (and changes nothing) once the block is executing.
    pub fn prepare_for_stepping(&mut self, axes: &AxesConfig) -> bool {
        if self.is_executing {
            return false;
        }

        let max_axis = self.axis_with_max_steps;
        let rates = axes.rates(max_axis);
        let abs_max = self.abs_steps(max_axis);

        if self.stepwise {
            // Constant rate, feedrate already in steps/s
            let rate = step_rate_to_tticks(self.feedrate.min(rates.max_step_rate));
            self.initial_rate = rate;
            self.peak_rate = rate;
            self.final_rate = rate;
            self.accel_per_ms = 0;
            self.steps_before_decel = abs_max;
            return true;
        }

        let (min_rate, max_rate) = (rates.min_step_rate, rates.max_step_rate);
        let accel = rates.max_accel_steps;
        let initial = (self.entry_speed / rates.step_distance).max(min_rate).min(max_rate);
        let fin = (self.exit_speed / rates.step_distance).max(min_rate).min(max_rate);
        let mut peak = (self.feedrate / rates.step_distance).max(min_rate).min(max_rate);

        // Accelerate-then-decelerate meeting point:
        //   peak² = initial² + 2·a·s_acc,  fin² = peak² − 2·a·s_dec,  s_acc + s_dec = total
        let meet = libm::ceilf((fin * fin - initial * initial) / 4.0 / accel + abs_max as f32 / 2.0);
        let steps_accel = if meet > 0.0 {
            (meet as u32).min(abs_max)
        } else {
            0
        };

        let to_peak = ((peak * peak - initial * initial) / 2.0 / accel).max(0.0) as u32;
        let steps_decel = if steps_accel > to_peak {
            // Cruise phase
            ((peak * peak - fin * fin) / 2.0 / accel).max(0.0) as u32
        } else {
            peak = libm::sqrtf(initial * initial + 2.0 * accel * steps_accel as f32);
            abs_max - steps_accel
        };

        self.initial_rate = step_rate_to_tticks(initial);
        self.peak_rate = step_rate_to_tticks(peak).max(self.initial_rate);
        self.final_rate = step_rate_to_tticks(fin);
        self.accel_per_ms = rates.accel_per_ms;
        self.steps_before_decel = abs_max - steps_decel.min(abs_max);
        true
    }
}

impl Default for MotionBlock {
    fn default() -> Self {
        Self::new()
    }
}
