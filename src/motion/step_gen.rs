// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-driven step generator.
//!
//! [`StepGenerator::on_tick`] runs every [`TICK_INTERVAL_NS`] and executes the block at the head
//! of the pipeline. Each tick does at most one of:
//!
//! 1. End every raised step pulse (and nothing else, so pulses last a full tick).
//! 2. Claim the head block and set it up: directions, counters, armed end-stop tests.
//! 3. Abort the block if an armed end-stop test trips.
//! 4. Advance the block: once per millisecond adjust the rate along the ramp, then add the rate
//!    to the step accumulator; on overflow step the lead axis and Bresenham the others.
//!
//! Integer arithmetic only. The block is retired when its last step is issued.

use heapless::Vec;

use crate::motion::block::{
    MotionBlock, NS_IN_A_MS, TICK_INTERVAL_NS, TTICKS_PER_STEP_PER_SEC, TTICKS_VALUE,
};
use crate::motion::io::MotionIo;
use crate::motion::pipeline::BlockReader;
use crate::motion::values::{AxisEnd, EndstopCheck, StepCounts, MAX_AXES};

/// Slowest rate the generator will run at, 10 steps/s in TTicks.
pub const MIN_STEP_RATE_PER_TTICKS: u32 = 10 * TTICKS_PER_STEP_PER_SEC;

/// One armed end-stop test.
#[derive(Copy, Clone, Debug)]
struct EndstopTest {
    axis: usize,
    end: AxisEnd,
    /// Abort on triggered (true) or on released (false).
    abort_when_triggered: bool,
}

/// Ramp parameters of the block being executed, copied out of the pipeline when claimed.
#[derive(Copy, Clone, Debug)]
struct ActiveBlock {
    lead: usize,
    accel_per_ms: u32,
    steps_before_decel: u32,
    peak_rate: u32,
    final_rate: u32,
    sequence_id: Option<u32>,
}

impl From<&MotionBlock> for ActiveBlock {
    fn from(block: &MotionBlock) -> Self {
        Self {
            lead: block.axis_with_max_steps(),
            accel_per_ms: block.accel_per_ms(),
            steps_before_decel: block.steps_before_decel(),
            peak_rate: block.peak_rate(),
            final_rate: block.final_rate(),
            sequence_id: block.sequence_id(),
        }
    }
}

/// Executes motion blocks one tick at a time.
#[derive(Debug)]
pub struct StepGenerator {
    paused: bool,
    endstop_hit: bool,
    last_completed: Option<u32>,
    /// Actual position, steps from home
    position: StepCounts,
    /// Steps dropped by end-stop aborts since last taken
    skipped: StepCounts,

    current: Option<ActiveBlock>,
    direction: [i32; MAX_AXES],
    steps_total: [u32; MAX_AXES],
    step_count: [u32; MAX_AXES],
    acc_relative: [u32; MAX_AXES],
    acc_step: u32,
    acc_ns: u32,
    rate: u32,
    checks: Vec<EndstopTest, { MAX_AXES * 2 }>,
}

impl StepGenerator {
    pub const fn new() -> Self {
        Self {
            paused: false,
            endstop_hit: false,
            last_completed: None,
            position: [0; MAX_AXES],
            skipped: [0; MAX_AXES],
            current: None,
            direction: [1; MAX_AXES],
            steps_total: [0; MAX_AXES],
            step_count: [0; MAX_AXES],
            acc_relative: [0; MAX_AXES],
            acc_step: 0,
            acc_ns: 0,
            rate: 0,
            checks: Vec::new(),
        }
    }

    /// Pause or resume stepping. Resuming clears the end-stop latch.
    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            self.endstop_hit = false;
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Abandon the block in progress and resume. The caller clears the pipeline.
    pub fn stop(&mut self) {
        self.current = None;
        self.checks.clear();
        self.acc_step = 0;
        self.acc_ns = 0;
        self.rate = 0;
        self.steps_total = [0; MAX_AXES];
        self.step_count = [0; MAX_AXES];
        self.skipped = [0; MAX_AXES];
        self.paused = false;
        self.endstop_hit = false;
    }

    /// Signed steps that aborted blocks never issued, if any, resetting the tally.
    pub fn take_skipped_steps(&mut self) -> Option<StepCounts> {
        if self.skipped.iter().all(|&s| s == 0) {
            return None;
        }
        Some(core::mem::replace(&mut self.skipped, [0; MAX_AXES]))
    }

    /// True once an end-stop test has aborted a block, until resumed or stopped.
    #[inline]
    pub fn is_endstop_hit(&self) -> bool {
        self.endstop_hit
    }

    /// Sequence id of the most recent numbered block to finish.
    #[inline]
    pub fn last_completed_sequence_id(&self) -> Option<u32> {
        self.last_completed
    }

    /// Steps actually issued, relative to home.
    #[inline]
    pub fn total_step_position(&self) -> StepCounts {
        self.position
    }

    pub fn set_total_step_position(&mut self, axis: usize, steps: i32) {
        if axis < MAX_AXES {
            self.position[axis] = steps;
        }
    }

    /// Current rate in TTicks.
    #[inline]
    pub fn current_rate(&self) -> u32 {
        self.rate
    }

    /// Advance by one tick.
    pub fn on_tick<IO: MotionIo, const N: usize>(
        &mut self,
        queue: &mut BlockReader<N>,
        io: &mut IO,
    ) {
        let mut pulse_ended = false;
        for axis in 0..MAX_AXES {
            pulse_ended |= io.pulse_end(axis);
        }
        if pulse_ended || self.paused {
            return;
        }

        let Some(active) = self.current else {
            if let Some(block) = queue.claim() {
                self.setup_block(&block, io);
            }
            return;
        };

        let finished = if self.endstop_tripped(io) {
            self.endstop_hit = true;
            for axis in 0..MAX_AXES {
                let remaining = (self.steps_total[axis] - self.step_count[axis]) as i32;
                self.skipped[axis] += self.direction[axis] * remaining;
            }
            true
        } else {
            self.update_rate(&active);
            self.advance(&active, io)
        };

        if finished {
            if active.sequence_id.is_some() {
                self.last_completed = active.sequence_id;
            }
            self.current = None;
            queue.retire();
        }
    }

    fn setup_block<IO: MotionIo>(&mut self, block: &MotionBlock, io: &mut IO) {
        for axis in 0..MAX_AXES {
            let steps = block.steps(axis);
            self.steps_total[axis] = steps.unsigned_abs();
            self.step_count[axis] = 0;
            self.acc_relative[axis] = 0;
            self.direction[axis] = if steps < 0 { -1 } else { 1 };
            io.set_direction(axis, steps >= 0);
        }

        self.checks.clear();
        let requested = block.endstops();
        if requested.any() {
            for axis in 0..MAX_AXES {
                for end in AxisEnd::BOTH {
                    if !io.has_endstop(axis, end) {
                        continue;
                    }
                    let abort_when_triggered = match requested.get(axis, end) {
                        EndstopCheck::None => continue,
                        EndstopCheck::Hit => true,
                        EndstopCheck::NotHit => false,
                        EndstopCheck::Towards => {
                            let towards = match end {
                                AxisEnd::Min => block.steps(axis) < 0,
                                AxisEnd::Max => block.steps(axis) > 0,
                            };
                            if !towards {
                                continue;
                            }
                            true
                        }
                    };
                    // Capacity covers both ends of every axis
                    let _ = self.checks.push(EndstopTest {
                        axis,
                        end,
                        abort_when_triggered,
                    });
                }
            }
        }

        self.acc_step = 0;
        self.acc_ns = 0;
        self.rate = block.initial_rate();
        self.current = Some(ActiveBlock::from(block));
    }

    fn endstop_tripped<IO: MotionIo>(&self, io: &mut IO) -> bool {
        let mut tripped = false;
        for test in &self.checks {
            if io.read_endstop(test.axis, test.end) == test.abort_when_triggered {
                tripped = true;
            }
        }
        tripped
    }

    /// Once per millisecond move the rate one acceleration step along the ramp.
    fn update_rate(&mut self, block: &ActiveBlock) {
        self.acc_ns += TICK_INTERVAL_NS;
        if self.acc_ns < NS_IN_A_MS {
            return;
        }
        self.acc_ns -= NS_IN_A_MS;

        let accel = block.accel_per_ms;
        if self.step_count[block.lead] > block.steps_before_decel {
            let floor = MIN_STEP_RATE_PER_TTICKS.max(block.final_rate);
            if self.rate > floor.saturating_add(accel) {
                self.rate -= accel;
            }
        } else {
            let ceiling = block.peak_rate.max(MIN_STEP_RATE_PER_TTICKS);
            let next = self.rate.saturating_add(accel);
            if self.rate < ceiling && next < TTICKS_VALUE {
                self.rate = next.min(ceiling);
            }
        }
    }

    /// Accumulate the current rate and issue steps on overflow. Returns true when the block is
    /// complete.
    fn advance<IO: MotionIo>(&mut self, block: &ActiveBlock, io: &mut IO) -> bool {
        self.acc_step += self.rate.max(MIN_STEP_RATE_PER_TTICKS);
        if self.acc_step < TTICKS_VALUE {
            return false;
        }
        self.acc_step -= TTICKS_VALUE;

        let lead = block.lead;
        let lead_total = self.steps_total[lead];
        let mut moving = false;

        if self.step_count[lead] < lead_total {
            self.step(lead, io);
            moving |= self.step_count[lead] < lead_total;
        }

        for axis in 0..MAX_AXES {
            if axis == lead || self.step_count[axis] == self.steps_total[axis] {
                continue;
            }
            self.acc_relative[axis] += self.steps_total[axis];
            if self.acc_relative[axis] >= lead_total {
                self.acc_relative[axis] -= lead_total;
                self.step(axis, io);
                moving |= self.step_count[axis] < self.steps_total[axis];
            }
        }
        !moving
    }

    #[inline]
    fn step<IO: MotionIo>(&mut self, axis: usize, io: &mut IO) {
        io.pulse_start(axis);
        self.step_count[axis] += 1;
        self.position[axis] += self.direction[axis];
    }
}

impl Default for StepGenerator {
    fn default() -> Self {
        Self::new()
    }
}
