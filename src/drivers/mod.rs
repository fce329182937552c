// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the raw `hw/` layer and below the
//! motion logic. They only depend on `embedded-hal` pin traits, so they build and test on the
//! host.
//!
//! ## Existing drivers
//!
//! - [`stepper`] – Step/direction stepper driver (A4988, DRV8825, TMC2209 in standalone mode)
//! - [`endstop`] – Limit switch input
//! - [`enable`] – Shared driver enable line

pub mod enable;
pub mod endstop;
pub mod stepper;

pub use enable::EnablePin;
pub use endstop::Endstop;
pub use stepper::StepDir;

/// Whether a line is asserted by driving/reading it high or low.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActiveLevel {
    High,
    Low,
}

impl ActiveLevel {
    /// Electrical level representing logical `on`.
    #[inline]
    pub(crate) fn level(self, on: bool) -> bool {
        match self {
            ActiveLevel::High => on,
            ActiveLevel::Low => !on,
        }
    }
}
