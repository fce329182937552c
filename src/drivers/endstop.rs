// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Limit switch input.

use embedded_hal::digital::v2::InputPin;

use super::ActiveLevel;

/// A limit switch that remembers which level means "triggered".
///
/// A normally-open switch to ground with a pull-up is [`Endstop::active_low`].
pub struct Endstop<PIN: InputPin> {
    pin: PIN,
    active: ActiveLevel,
}

impl<PIN: InputPin> Endstop<PIN> {
    pub fn new(pin: PIN, active: ActiveLevel) -> Self {
        Self { pin, active }
    }

    pub fn active_high(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::High)
    }

    pub fn active_low(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::Low)
    }

    /// Whether the switch currently reads triggered. A failed read counts as not triggered.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.pin
            .is_high()
            .map_or(false, |high| high == self.active.level(true))
    }

    pub fn free(self) -> PIN {
        self.pin
    }
}
