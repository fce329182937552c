// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Robot Kinematics
//!
//! Maps points in the robot's working coordinates to actuator step positions and back. The
//! planner and step generator only see actuator steps; the geometry is chosen once from
//! configuration and bound to the controller by value.
//!
//! ## Modules
//!
//! - [`cartesian`] - Independent linear axes (XY plotters, mug drawing robots).
//! - [`scara`] - Two-link rotary arm of a sand table.

pub mod cartesian;
pub mod scara;

pub use cartesian::Cartesian;
pub use scara::SandTableScara;

use serde::{Deserialize, Serialize};

use crate::motion::error::MoveError;
use crate::motion::values::{AxisFloats, AxisPosition, StepCounts};
use crate::motion::AxesConfig;

/// Coordinate transform between working space and actuator steps.
pub trait Kinematics {
    /// Absolute actuator step positions for `target`.
    ///
    /// `pos` is the last commanded position, which rotary geometries use to pick the shortest
    /// rotation. Returns [`MoveError::OutOfBounds`] if the target is unreachable or outside the
    /// configured limits and `allow_out_of_bounds` is false.
    fn to_actuator(
        &self,
        target: &AxisFloats,
        pos: &AxisPosition,
        axes: &AxesConfig,
        allow_out_of_bounds: bool,
    ) -> Result<AxisFloats, MoveError>;

    /// Working-space point for the actuator position `steps`.
    fn from_actuator(&self, steps: &StepCounts, pos: &AxisPosition, axes: &AxesConfig) -> AxisFloats;

    /// Wrap step counters of continuously rotating axes.
    fn correct_overflow(&self, _pos: &mut AxisPosition, _axes: &AxesConfig) {}

    /// Extent of the working area.
    fn attributes(&self, axes: &AxesConfig) -> RobotAttributes;
}

/// Size and origin of a robot's working area, in working units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotAttributes {
    pub size_x: f32,
    pub size_y: f32,
    pub size_z: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub origin_z: f32,
}

/// Supported robot geometries, selected by the `robotGeom` configuration key.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    #[default]
    #[serde(rename = "XYBot", alias = "MugBot")]
    Cartesian,
    SandTableScara,
}

impl Kinematics for Geometry {
    fn to_actuator(
        &self,
        target: &AxisFloats,
        pos: &AxisPosition,
        axes: &AxesConfig,
        allow_out_of_bounds: bool,
    ) -> Result<AxisFloats, MoveError> {
        match self {
            Geometry::Cartesian => Cartesian.to_actuator(target, pos, axes, allow_out_of_bounds),
            Geometry::SandTableScara => {
                SandTableScara.to_actuator(target, pos, axes, allow_out_of_bounds)
            }
        }
    }

    fn from_actuator(&self, steps: &StepCounts, pos: &AxisPosition, axes: &AxesConfig) -> AxisFloats {
        match self {
            Geometry::Cartesian => Cartesian.from_actuator(steps, pos, axes),
            Geometry::SandTableScara => SandTableScara.from_actuator(steps, pos, axes),
        }
    }

    fn correct_overflow(&self, pos: &mut AxisPosition, axes: &AxesConfig) {
        match self {
            Geometry::Cartesian => Cartesian.correct_overflow(pos, axes),
            Geometry::SandTableScara => SandTableScara.correct_overflow(pos, axes),
        }
    }

    fn attributes(&self, axes: &AxesConfig) -> RobotAttributes {
        match self {
            Geometry::Cartesian => Cartesian.attributes(axes),
            Geometry::SandTableScara => SandTableScara.attributes(axes),
        }
    }
}
