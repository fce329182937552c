// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Move request passed to the motion controller.
//!
//! ```ignore
//! let args = MoveArgs::new()
//!     .with_axis(0, 25.0)
//!     .with_axis(1, 40.0)
//!     .with_feedrate(30.0);
//! controller.submit_move(&args)?;
//! ```

use crate::motion::values::{AxisEnd, AxisFloats, EndstopCheck, EndstopChecks, StepCounts, MAX_AXES};

/// Relative/absolute override carried by a single move.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MoveMode {
    /// Use the controller's current mode.
    #[default]
    Default,
    Absolute,
    Relative,
}

/// A single move request.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MoveArgs {
    target: AxisFloats,
    steps: StepCounts,
    steps_valid: u8,
    mode: MoveMode,
    feedrate: Option<f32>,
    endstops: EndstopChecks,
    allow_out_of_bounds: bool,
    dont_split: bool,
    more_moves_coming: bool,
    sequence_id: Option<u32>,
}

impl MoveArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target for `axis` in physical units.
    pub fn with_axis(mut self, axis: usize, val: f32) -> Self {
        if axis < MAX_AXES {
            self.target.set(axis, val);
        }
        self
    }

    /// Raw step target for `axis`. Any step target makes this a stepwise move.
    pub fn with_axis_steps(mut self, axis: usize, steps: i32) -> Self {
        if axis < MAX_AXES {
            self.steps[axis] = steps;
            self.steps_valid |= 1 << axis;
        }
        self
    }

    pub fn relative(mut self) -> Self {
        self.mode = MoveMode::Relative;
        self
    }

    pub fn absolute(mut self) -> Self {
        self.mode = MoveMode::Absolute;
        self
    }

    /// Units/s, or steps/s for stepwise moves.
    pub fn with_feedrate(mut self, feedrate: f32) -> Self {
        self.feedrate = Some(feedrate);
        self
    }

    pub fn with_endstops(mut self, endstops: EndstopChecks) -> Self {
        self.endstops = endstops;
        self
    }

    pub fn with_endstop(mut self, axis: usize, end: AxisEnd, check: EndstopCheck) -> Self {
        self.endstops.set(axis, end, check);
        self
    }

    pub fn allow_out_of_bounds(mut self) -> Self {
        self.allow_out_of_bounds = true;
        self
    }

    /// Never subdivide this move into shorter blocks.
    pub fn dont_split(mut self) -> Self {
        self.dont_split = true;
        self
    }

    /// Tag the block so its completion can be observed.
    pub fn numbered(mut self, id: u32) -> Self {
        self.sequence_id = Some(id);
        self
    }

    #[inline]
    pub fn target(&self) -> &AxisFloats {
        &self.target
    }

    pub(crate) fn set_target(&mut self, target: AxisFloats) {
        self.target = target;
    }

    #[inline]
    pub fn steps(&self, axis: usize) -> i32 {
        self.steps[axis]
    }

    #[inline]
    pub fn is_steps_valid(&self, axis: usize) -> bool {
        axis < MAX_AXES && self.steps_valid & (1 << axis) != 0
    }

    #[inline]
    pub fn is_stepwise(&self) -> bool {
        self.steps_valid != 0
    }

    #[inline]
    pub fn mode(&self) -> MoveMode {
        self.mode
    }

    #[inline]
    pub fn feedrate(&self) -> Option<f32> {
        self.feedrate
    }

    pub(crate) fn set_feedrate(&mut self, feedrate: f32) {
        self.feedrate = Some(feedrate);
    }

    #[inline]
    pub fn endstops(&self) -> EndstopChecks {
        self.endstops
    }

    pub(crate) fn set_endstop(&mut self, axis: usize, end: AxisEnd, check: EndstopCheck) {
        self.endstops.set(axis, end, check);
    }

    #[inline]
    pub fn is_out_of_bounds_allowed(&self) -> bool {
        self.allow_out_of_bounds
    }

    #[inline]
    pub fn is_dont_split(&self) -> bool {
        self.dont_split
    }

    #[inline]
    pub fn more_moves_coming(&self) -> bool {
        self.more_moves_coming
    }

    pub(crate) fn set_more_moves_coming(&mut self, more: bool) {
        self.more_moves_coming = more;
    }

    #[inline]
    pub fn sequence_id(&self) -> Option<u32> {
        self.sequence_id
    }

    pub(crate) fn set_sequence_id(&mut self, id: Option<u32>) {
        self.sequence_id = id;
    }
}
