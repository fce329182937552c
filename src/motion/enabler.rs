// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Stepper driver enable with idle timeout.

use log::info;

use crate::motion::io::MotionIo;

/// Turns the drivers on when motion is queued and off again after a quiet period.
#[derive(Clone, Debug)]
pub struct MotorEnabler {
    disable_after_ms: u32,
    enabled: bool,
    last_active_ms: u32,
}

impl MotorEnabler {
    /// Disable the drivers after `step_disable_secs` without motion. Zero or negative keeps them
    /// on once enabled.
    pub fn new(step_disable_secs: f32) -> Self {
        let disable_after_ms = if step_disable_secs > 0.0 {
            (step_disable_secs * 1000.0) as u32
        } else {
            u32::MAX
        };
        Self {
            disable_after_ms,
            enabled: false,
            last_active_ms: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record activity at `now_ms`, switching the drivers on if they were off.
    pub fn enable<IO: MotionIo>(&mut self, io: &mut IO, now_ms: u32) {
        if !self.enabled {
            info!("motors: enabled");
            io.enable_motors(true);
            self.enabled = true;
        }
        self.last_active_ms = now_ms;
    }

    pub fn disable<IO: MotionIo>(&mut self, io: &mut IO) {
        if self.enabled {
            info!("motors: disabled");
        }
        io.enable_motors(false);
        self.enabled = false;
    }

    /// Switch off once idle for longer than the timeout.
    pub fn service<IO: MotionIo>(&mut self, io: &mut IO, now_ms: u32) {
        if self.enabled && now_ms.wrapping_sub(self.last_active_ms) > self.disable_after_ms {
            info!("motors: idle timeout");
            self.disable(io);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::io::mock::MockIo;

    #[test]
    fn enables_once_and_times_out_when_idle() {
        let mut io = MockIo::default();
        let mut enabler = MotorEnabler::new(2.0);

        enabler.enable(&mut io, 1_000);
        assert!(io.enabled && enabler.is_enabled());

        enabler.service(&mut io, 3_000);
        assert!(io.enabled);

        enabler.enable(&mut io, 2_500);
        enabler.service(&mut io, 4_400);
        assert!(io.enabled);

        enabler.service(&mut io, 4_501);
        assert!(!io.enabled && !enabler.is_enabled());
    }

    #[test]
    fn zero_timeout_keeps_drivers_on() {
        let mut io = MockIo::default();
        let mut enabler = MotorEnabler::new(0.0);
        enabler.enable(&mut io, 0);
        enabler.service(&mut io, u32::MAX / 2);
        assert!(io.enabled);
    }
}
