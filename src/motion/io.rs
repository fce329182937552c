// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hardware port used by the step generator and controller.
//!
//! Every method is called from the tick interrupt except [`MotionIo::enable_motors`], so
//! implementations must be short, non-blocking and infallible. Axis indices without hardware
//! attached are simply ignored.

use crate::motion::values::AxisEnd;

/// Step pulses, direction lines, end-stop inputs and the motor enable output.
pub trait MotionIo {
    /// Drive the direction line of `axis`; `forward` means increasing step count.
    fn set_direction(&mut self, axis: usize, forward: bool);

    /// Raise the step output of `axis`.
    fn pulse_start(&mut self, axis: usize);

    /// Lower the step output of `axis`. Returns true if it was high.
    fn pulse_end(&mut self, axis: usize) -> bool;

    /// Whether the end-stop guarding `end` of `axis` currently reads triggered.
    fn read_endstop(&mut self, axis: usize, end: AxisEnd) -> bool;

    /// Whether an end-stop is fitted at `end` of `axis`.
    fn has_endstop(&self, _axis: usize, _end: AxisEnd) -> bool {
        true
    }

    /// Switch the stepper drivers on or off.
    fn enable_motors(&mut self, _on: bool) {}
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::motion::values::MAX_AXES;

    /// Records pulses and directions; end-stops are set by the test.
    #[derive(Debug, Default)]
    pub struct MockIo {
        pub high: [bool; MAX_AXES],
        pub pulses: [u32; MAX_AXES],
        pub forward: [bool; MAX_AXES],
        pub triggered: [[bool; 2]; MAX_AXES],
        pub missing: [[bool; 2]; MAX_AXES],
        pub enabled: bool,
    }

    fn end_index(end: AxisEnd) -> usize {
        match end {
            AxisEnd::Min => 0,
            AxisEnd::Max => 1,
        }
    }

    impl MockIo {
        pub fn trigger(&mut self, axis: usize, end: AxisEnd, on: bool) {
            self.triggered[axis][end_index(end)] = on;
        }
    }

    impl MotionIo for MockIo {
        fn set_direction(&mut self, axis: usize, forward: bool) {
            self.forward[axis] = forward;
        }

        fn pulse_start(&mut self, axis: usize) {
            assert!(!self.high[axis], "step pulse restarted while high");
            self.high[axis] = true;
            self.pulses[axis] += 1;
        }

        fn pulse_end(&mut self, axis: usize) -> bool {
            core::mem::replace(&mut self.high[axis], false)
        }

        fn read_endstop(&mut self, axis: usize, end: AxisEnd) -> bool {
            self.triggered[axis][end_index(end)]
        }

        fn has_endstop(&self, axis: usize, end: AxisEnd) -> bool {
            !self.missing[axis][end_index(end)]
        }

        fn enable_motors(&mut self, on: bool) {
            self.enabled = on;
        }
    }
}
