// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Independent linear axes.
//!
//! Each axis maps straight to its actuator:
//! `steps = (value − home_offset_val) · steps_per_unit + home_off_steps`.

use super::{Kinematics, RobotAttributes};
use crate::motion::error::MoveError;
use crate::motion::values::{AxisFloats, AxisPosition, StepCounts};
use crate::motion::AxesConfig;

/// Cartesian (XY plotter / mug robot) transform.
#[derive(Copy, Clone, Debug, Default)]
pub struct Cartesian;

impl Kinematics for Cartesian {
    fn to_actuator(
        &self,
        target: &AxisFloats,
        _pos: &AxisPosition,
        axes: &AxesConfig,
        allow_out_of_bounds: bool,
    ) -> Result<AxisFloats, MoveError> {
        let mut pt = *target;
        if !axes.pt_in_bounds(&mut pt, false) && !allow_out_of_bounds {
            return Err(MoveError::OutOfBounds);
        }

        let mut out = AxisFloats::new();
        for axis in 0..axes.num_axes() {
            let cfg = axes.axis(axis);
            let from_home = pt.get(axis) - cfg.home_offset_val;
            out.set(
                axis,
                from_home * cfg.steps_per_unit() + cfg.home_off_steps as f32,
            );
        }
        Ok(out)
    }

    fn from_actuator(&self, steps: &StepCounts, _pos: &AxisPosition, axes: &AxesConfig) -> AxisFloats {
        let mut out = AxisFloats::new();
        for axis in 0..axes.num_axes() {
            let cfg = axes.axis(axis);
            let from_home = (steps[axis] - cfg.home_off_steps) as f32;
            out.set(axis, from_home / cfg.steps_per_unit() + cfg.home_offset_val);
        }
        out
    }

    fn attributes(&self, axes: &AxesConfig) -> RobotAttributes {
        let span = |axis: usize| -> f32 {
            let cfg = axes.get(axis);
            let min = cfg.and_then(|c| c.min_val).unwrap_or(0.0);
            let max = cfg.and_then(|c| c.max_val).unwrap_or(100.0);
            libm::fabsf(max - min)
        };
        RobotAttributes {
            size_x: span(0),
            size_y: span(1),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::AxisConfig;

    fn axes() -> AxesConfig {
        let x = AxisConfig::default()
            .with_rotation(3200.0, 32.0)
            .with_limits(Some(0.0), Some(500.0));
        let mut y = x.clone();
        y.home_offset_val = 10.0;
        y.home_off_steps = 50;
        AxesConfig::new(&[x, y]).unwrap()
    }

    #[test]
    fn linear_mapping_applies_home_offsets() {
        let axes = axes();
        let pos = AxisPosition::default();
        let target = AxisFloats::from_slice(&[20.0, 30.0]);
        let steps = Cartesian.to_actuator(&target, &pos, &axes, false).unwrap();
        assert!((steps.get(0) - 2000.0).abs() < 1e-3);
        assert!((steps.get(1) - 2050.0).abs() < 1e-3);
    }

    #[test]
    fn round_trip_within_a_step() {
        let axes = axes();
        let pos = AxisPosition::default();
        for &(x, y) in &[(0.0, 10.0), (123.45, 67.8), (499.99, 250.0)] {
            let target = AxisFloats::from_slice(&[x, y]);
            let act = Cartesian.to_actuator(&target, &pos, &axes, false).unwrap();
            let steps = [
                libm::roundf(act.get(0)) as i32,
                libm::roundf(act.get(1)) as i32,
                0,
            ];
            let back = Cartesian.from_actuator(&steps, &pos, &axes);
            assert!((back.get(0) - x).abs() < 0.01, "x {} -> {}", x, back.get(0));
            assert!((back.get(1) - y).abs() < 0.01, "y {} -> {}", y, back.get(1));
        }
    }

    #[test]
    fn out_of_bounds_rejected_unless_allowed() {
        let axes = axes();
        let pos = AxisPosition::default();
        let target = AxisFloats::from_slice(&[-5.0, 30.0]);
        assert_eq!(
            Cartesian.to_actuator(&target, &pos, &axes, false),
            Err(MoveError::OutOfBounds)
        );
        let steps = Cartesian.to_actuator(&target, &pos, &axes, true).unwrap();
        assert!((steps.get(0) + 500.0).abs() < 1e-3);
    }

    #[test]
    fn attributes_span_axis_limits() {
        let attrs = Cartesian.attributes(&axes());
        assert_eq!(attrs.size_x, 500.0);
        assert_eq!(attrs.size_y, 500.0);
    }
}
