// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Stepper driver enable output, usually shared by every driver on the board.

use embedded_hal::digital::v2::OutputPin;

use super::ActiveLevel;

/// Enable line that remembers its active level and last state. Starts disabled.
pub struct EnablePin<PIN: OutputPin> {
    pin: PIN,
    active: ActiveLevel,
    is_on: bool,
}

impl<PIN: OutputPin> EnablePin<PIN> {
    pub fn new(pin: PIN, active: ActiveLevel) -> Self {
        let mut out = Self {
            pin,
            active,
            is_on: false,
        };
        out.set(false);
        out
    }

    /// Most step/dir drivers take an active-low `EN`.
    pub fn active_low(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::Low)
    }

    pub fn active_high(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::High)
    }

    pub fn set(&mut self, on: bool) {
        if self.active.level(on) {
            self.pin.set_high().ok();
        } else {
            self.pin.set_low().ok();
        }
        self.is_on = on;
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn free(self) -> PIN {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::SharedPin;

    #[test]
    fn active_low_starts_released() {
        let pin = SharedPin::default();
        let mut en = EnablePin::active_low(pin.clone());
        assert!(pin.is_set_high());
        assert!(!en.is_on());

        en.set(true);
        assert!(!pin.is_set_high());
        assert!(en.is_on());
    }
}
