// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Plotbot Firmware
//!
//! This crate contains the real-time motion subsystem for stepper-driven drawing robots (XY
//! plotters, mug robots, sand tables), written in Rust, targeting an STM32F777 MCU.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`motion`] | Planner, block pipeline, step generator, homing and the controller API |
//! | [`kinematics`] | Working coordinates to actuator steps for each robot geometry |
//! | [`drivers`] | Device-level drivers (step/dir, end-stops, driver enable) |
//! | `hw` | MCU-level wrappers: pin map, tick timer, USART logging (`board` feature) |
//!
//! Everything except `hw` is hardware independent and builds on the host, where the tests run.
//!
//! ## Getting Started
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! Run the tests on the host:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features board --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod drivers;
#[cfg(feature = "board")]
pub mod hw;
pub mod kinematics;
pub mod motion;
