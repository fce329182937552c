// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers for the STM32F777 plotter board. Built with the `board` feature only.

pub mod board_io;
pub mod pins;
pub mod stepper;
pub mod tick_timer;
pub mod usart;

pub use board_io::BoardIo;
pub use pins::BoardPins;
pub use stepper::{BoardEngine, InterruptStepper, PIPELINE_LEN};
pub use tick_timer::TickTimer;
pub use usart::{Usart, UsartLogger};
