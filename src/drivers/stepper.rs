// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Step/direction stepper driver.
//!
//! One rising edge on STEP moves the motor one (micro)step in the direction selected by DIR. The
//! step generator raises STEP on one tick and lowers it on the next, so the pulse width is one
//! tick period; any driver with a minimum high time under that works.

use embedded_hal::digital::v2::OutputPin;

/// STEP and DIR outputs of one driver.
pub struct StepDir<STEP: OutputPin, DIR: OutputPin> {
    step: STEP,
    dir: DIR,

    /// Swap DIR polarity for motors wired in reverse.
    invert_dir: bool,
    step_high: bool,
    forward: bool,
}

impl<STEP: OutputPin, DIR: OutputPin> StepDir<STEP, DIR> {
    /// Take both pins, leaving STEP low and DIR forward.
    pub fn new(mut step: STEP, dir: DIR, invert_dir: bool) -> Self {
        step.set_low().ok();
        let mut out = Self {
            step,
            dir,
            invert_dir,
            step_high: false,
            forward: false,
        };
        out.set_direction(true);
        out
    }

    pub fn set_direction(&mut self, forward: bool) {
        if forward != self.invert_dir {
            self.dir.set_high().ok();
        } else {
            self.dir.set_low().ok();
        }
        self.forward = forward;
    }

    #[inline]
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Raise STEP.
    #[inline]
    pub fn pulse_start(&mut self) {
        self.step.set_high().ok();
        self.step_high = true;
    }

    /// Lower STEP. Returns true if a pulse was in progress.
    #[inline]
    pub fn pulse_end(&mut self) -> bool {
        if !self.step_high {
            return false;
        }
        self.step.set_low().ok();
        self.step_high = false;
        true
    }

    pub fn free(self) -> (STEP, DIR) {
        (self.step, self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::SharedPin;

    #[test]
    fn pulse_is_raised_then_lowered_once() {
        let (step, dir) = (SharedPin::default(), SharedPin::default());
        let mut driver = StepDir::new(step.clone(), dir.clone(), false);
        assert!(dir.is_set_high());

        assert!(!driver.pulse_end());
        driver.pulse_start();
        assert!(step.is_set_high());
        assert!(driver.pulse_end());
        assert!(!step.is_set_high());
        assert!(!driver.pulse_end());
    }

    #[test]
    fn inverted_direction() {
        let dir = SharedPin::default();
        let mut driver = StepDir::new(SharedPin::default(), dir.clone(), true);
        assert!(!dir.is_set_high());
        driver.set_direction(false);
        assert!(dir.is_set_high());
        assert!(!driver.is_forward());
    }
}
