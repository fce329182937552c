// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Motion Subsystem
//!
//! Turns move requests into timed step pulses.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`values`] | Per-axis containers and end-stop test masks |
//! | [`config`] | Axis parameters and derived step-space caches |
//! | [`args`] | Move requests |
//! | [`block`] | Motion blocks and their trapezoidal step ramps |
//! | [`pipeline`] | Lock-free block queue between planner and step generator |
//! | [`planner`] | Junction-deviation look-ahead |
//! | [`step_gen`] | Tick-driven step generation |
//! | [`engine`] | Everything the tick interrupt owns, and the port the main loop reaches it by |
//! | [`homing`] | Homing sequence interpreter |
//! | [`enabler`] | Driver enable and idle timeout |
//! | [`io`] | Hardware port |
//! | [`controller`] | Ties it all together |

pub mod args;
pub mod block;
pub mod config;
pub mod controller;
pub mod enabler;
pub mod engine;
pub mod error;
pub mod homing;
pub mod io;
pub mod pipeline;
pub mod planner;
pub mod status;
pub mod step_gen;
pub mod values;

pub use args::{MoveArgs, MoveMode};
pub use block::MotionBlock;
pub use config::{AxesConfig, AxisConfig, HomingConfig, MotionConfig};
pub use controller::MotionController;
pub use engine::{StepEngine, StepperPort};
pub use error::{ConfigError, MoveError};
pub use homing::{HomingSequencer, HomingStep};
pub use io::MotionIo;
pub use pipeline::{BlockReader, BlockWriter, MotionPipeline};
pub use planner::MotionPlanner;
pub use status::MotionStatus;
pub use step_gen::StepGenerator;
pub use values::{AxisEnd, AxisFloats, AxisPosition, EndstopCheck, EndstopChecks, StepCounts, MAX_AXES};
