// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Junction-deviation look-ahead planner.
//!
//! Each accepted move becomes one [`MotionBlock`]. Its junction with the previous block bounds
//! how fast the machine may pass through the corner:
//!
//! ```text
//! cos θ      = −(prev_unit · cur_unit)
//! sin(θ/2)   = sqrt((1 − cos θ) / 2)
//! v_junction = sqrt(a_master · δ · sin(θ/2) / (1 − sin(θ/2)))
//! ```
//!
//! After every append the queue is re-optimized: a backward pass from the newest block derives
//! the fastest entry speed that can still decelerate to the required exit, then a forward pass
//! caps every exit at what acceleration from the entry allows. Executing blocks are never
//! touched.

use crate::motion::args::{MoveArgs, MoveMode};
use crate::motion::block::{max_achievable_speed, MotionBlock, MIN_MOVE_DIST};
use crate::motion::config::AxesConfig;
use crate::motion::error::MoveError;
use crate::motion::pipeline::{BlockWriter, QueuedBlocks};
use crate::motion::values::{AxisFloats, AxisPosition, MAX_AXES};

/// Feedrate used when a move carries none; always clamped to the axis limit.
const UNLIMITED_FEEDRATE: f32 = 1e8;

/// Cosine bounds outside which the junction formula is skipped.
const JUNCTION_STRAIGHT: f32 = -0.95;
const JUNCTION_REVERSAL: f32 = 0.95;

/// What the planner remembers about the last block for the next junction.
#[derive(Copy, Clone, Debug)]
struct PrevBlock {
    feedrate: f32,
    unit_vector: [f32; MAX_AXES],
}

/// Converts moves into motion blocks and keeps the pipeline's speed profile optimal.
#[derive(Clone, Debug)]
pub struct MotionPlanner {
    junction_deviation: f32,
    prev: Option<PrevBlock>,
}

impl MotionPlanner {
    /// Entry speed of a block with no usable predecessor.
    pub const MIN_PLANNER_SPEED: f32 = 0.0;

    pub fn new(junction_deviation: f32) -> Self {
        Self {
            junction_deviation,
            prev: None,
        }
    }

    #[inline]
    pub fn junction_deviation(&self) -> f32 {
        self.junction_deviation
    }

    /// Forget the previous block, so the next move starts from standstill.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    /// Plan a move to `args.target()` (units, every axis filled) whose actuator position is
    /// `dest_steps`.
    ///
    /// On success the block is queued, the pipeline re-optimized and `pos.steps_from_home`
    /// advanced. `pos.units` is left to the caller.
    pub fn move_to<const N: usize>(
        &mut self,
        args: &MoveArgs,
        dest_steps: &AxisFloats,
        pos: &mut AxisPosition,
        axes: &AxesConfig,
        pipeline: &mut BlockWriter<N>,
    ) -> Result<(), MoveError> {
        let num_axes = axes.num_axes();
        let target = args.target();

        let mut deltas = [0.0f32; MAX_AXES];
        let mut is_move = false;
        let mut is_primary_move = false;
        let mut square_sum = 0.0;
        for axis in 0..num_axes {
            deltas[axis] = target.get(axis) - pos.units.get(axis);
            if deltas[axis] != 0.0 {
                is_move = true;
                if axes.is_primary(axis) {
                    square_sum += deltas[axis] * deltas[axis];
                    is_primary_move = true;
                }
            }
        }
        let move_dist = libm::sqrtf(square_sum);
        if !is_move || move_dist < MIN_MOVE_DIST {
            return Err(MoveError::NoMovement);
        }

        let max_speed = axes.axis(axes.first_primary_axis()).max_speed;
        let feedrate = args.feedrate().unwrap_or(UNLIMITED_FEEDRATE).min(max_speed);

        let mut unit_vector = [0.0f32; MAX_AXES];
        for axis in 0..num_axes {
            if axes.is_primary(axis) {
                unit_vector[axis] = deltas[axis] / move_dist;
            }
        }

        let mut block = MotionBlock::new();
        for axis in 0..num_axes {
            let steps = libm::roundf(dest_steps.get(axis) - pos.steps_from_home[axis] as f32);
            block.set_steps(axis, steps as i32);
        }
        if !block.has_steps() {
            return Err(MoveError::NoMovement);
        }
        block.feedrate = feedrate;
        block.move_distance = move_dist;
        block.unit_vector = unit_vector;
        block.followed_by_more = args.more_moves_coming();
        block.endstops = args.endstops();
        block.sequence_id = args.sequence_id();

        if pipeline.is_empty() {
            self.prev = None;
        }
        block.max_entry_speed = if is_primary_move {
            self.junction_speed(feedrate, &unit_vector, axes)
        } else {
            Self::MIN_PLANNER_SPEED
        };

        if !pipeline.add(block) {
            return Err(MoveError::PipelineFull);
        }
        self.prev = Some(PrevBlock {
            feedrate,
            unit_vector,
        });

        self.recalculate_pipeline(pipeline, axes);

        for (axis, total) in pos.steps_from_home.iter_mut().enumerate() {
            *total += block.steps(axis);
        }
        Ok(())
    }

    /// Plan a constant-rate move given directly in actuator steps.
    ///
    /// Relative moves use the steps as given, any other mode measures them from home. The rate is
    /// the move's feedrate (steps/s) or, if absent, the slowest max step rate of the moving axes.
    pub fn move_to_stepwise<const N: usize>(
        &mut self,
        args: &MoveArgs,
        pos: &mut AxisPosition,
        axes: &AxesConfig,
        pipeline: &mut BlockWriter<N>,
    ) -> Result<(), MoveError> {
        let relative = args.mode() == MoveMode::Relative;

        let mut block = MotionBlock::new();
        let mut rate = UNLIMITED_FEEDRATE;
        for axis in 0..axes.num_axes() {
            if !args.is_steps_valid(axis) {
                continue;
            }
            let steps = if relative {
                args.steps(axis)
            } else {
                args.steps(axis) - pos.steps_from_home[axis]
            };
            if steps != 0 {
                rate = rate.min(axes.rates(axis).max_step_rate);
                block.set_steps(axis, steps);
            }
        }
        if !block.has_steps() {
            return Err(MoveError::NoMovement);
        }

        block.stepwise = true;
        block.feedrate = args.feedrate().unwrap_or(rate);
        block.endstops = args.endstops();
        block.sequence_id = args.sequence_id();
        if block.prepare_for_stepping(axes) {
            block.can_execute = true;
        }

        if !pipeline.add(block) {
            return Err(MoveError::PipelineFull);
        }
        // Stepwise blocks start and end at rest
        self.prev = None;

        for (axis, total) in pos.steps_from_home.iter_mut().enumerate() {
            *total += block.steps(axis);
        }
        Ok(())
    }

    fn junction_speed(&self, feedrate: f32, unit_vector: &[f32; MAX_AXES], axes: &AxesConfig) -> f32 {
        let Some(prev) = self.prev else {
            return Self::MIN_PLANNER_SPEED;
        };
        if self.junction_deviation <= 0.0 || prev.feedrate <= 0.0 {
            return Self::MIN_PLANNER_SPEED;
        }

        let cos_theta: f32 = -prev
            .unit_vector
            .iter()
            .zip(unit_vector)
            .map(|(p, c)| p * c)
            .sum::<f32>();

        if cos_theta >= JUNCTION_REVERSAL {
            return Self::MIN_PLANNER_SPEED;
        }
        let mut vmax = prev.feedrate.min(feedrate);
        if cos_theta > JUNCTION_STRAIGHT {
            let sin_half = libm::sqrtf(0.5 * (1.0 - cos_theta));
            let limit = libm::sqrtf(
                axes.master_max_accel() * self.junction_deviation * sin_half / (1.0 - sin_half),
            );
            vmax = vmax.min(limit);
        }
        vmax
    }

    /// Re-optimize entry and exit speeds from the newest block back to the first one that is
    /// executing or already at its junction limit, then rebuild the ramps of every block touched.
    ///
    /// Running it twice in a row changes nothing.
    pub fn recalculate_pipeline<const N: usize>(
        &self,
        pipeline: &mut BlockWriter<N>,
        axes: &AxesConfig,
    ) {
        pipeline.edit(|queue| Self::recalculate(queue, axes));
    }

    fn recalculate<const N: usize>(queue: &mut QueuedBlocks<'_, N>, axes: &AxesConfig) {
        let accel = axes.master_max_accel();

        // Backward pass, newest first
        let mut earliest = None;
        let mut prev_exit = 0.0;
        let mut following_entry = 0.0;
        let mut idx = 0;
        while let Some(block) = queue.peek_nth_from_put(idx) {
            let settled = block.entry_speed == block.max_entry_speed && idx > 1;
            if block.is_executing || block.stepwise || settled {
                prev_exit = block.exit_speed;
                break;
            }

            if idx > 0 {
                if let Some(following) = queue.peek_nth_from_put_mut(idx - 1) {
                    let entry = max_achievable_speed(accel, following.exit_speed, following.move_distance);
                    following.entry_speed = entry.min(following.max_entry_speed);
                    following_entry = following.entry_speed;
                }
            }
            if let Some(block) = queue.peek_nth_from_put_mut(idx) {
                block.exit_speed = following_entry;
            }
            earliest = Some(idx);
            idx += 1;
        }

        let Some(earliest) = earliest else {
            return;
        };

        // Forward pass, oldest first
        for idx in (0..=earliest).rev() {
            let Some(block) = queue.peek_nth_from_put_mut(idx) else {
                break;
            };
            block.entry_speed = prev_exit;
            let reachable = max_achievable_speed(accel, block.entry_speed, block.move_distance);
            block.exit_speed = reachable.min(block.exit_speed);
            prev_exit = block.exit_speed;
        }

        // A split move keeps its first block back until the next one has arrived
        let count = queue.count();
        for idx in (0..=earliest).rev() {
            let Some(block) = queue.peek_nth_from_put_mut(idx) else {
                break;
            };
            if block.prepare_for_stepping(axes) && (!block.followed_by_more || count > 1) {
                block.can_execute = true;
            }
        }
    }

    /// The move the newest block belonged to ended early: let that block run on its own.
    ///
    /// Its exit speed is already zero, as the newest block's always is.
    pub fn release_tail<const N: usize>(&self, pipeline: &mut BlockWriter<N>, axes: &AxesConfig) {
        pipeline.edit(|queue| {
            let Some(block) = queue.peek_nth_from_put_mut(0) else {
                return;
            };
            if !block.followed_by_more || block.is_executing {
                return;
            }
            block.followed_by_more = false;
            if block.prepare_for_stepping(axes) {
                block.can_execute = true;
            }
        });
    }
}

impl Default for MotionPlanner {
    fn default() -> Self {
        Self::new(crate::motion::config::MotionConfig::JUNCTION_DEVIATION_DEFAULT)
    }
}
