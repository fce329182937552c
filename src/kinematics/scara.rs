// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-link rotary arm (sand table).
//!
//! Axis 0 turns the upper arm, axis 1 the lower arm. Both angles are absolute, measured clockwise
//! from North (+Y) in degrees. With both step counters at zero the upper arm points North and the
//! lower arm folds straight back over it.
//!
//! Link lengths are taken from the `maxVal` of axis 0 and axis 1.
//!
//! For any reachable target the cosine rule gives two elbow solutions; the one needing the least
//! total rotation from the current position is used. Step counters wrap once per revolution via
//! [`Kinematics::correct_overflow`].

use core::f32::consts::PI;

use super::{Kinematics, RobotAttributes};
use crate::motion::error::MoveError;
use crate::motion::values::{AxisFloats, AxisPosition, StepCounts};
use crate::motion::AxesConfig;

/// Link length used when an arm axis has no `maxVal`.
pub const DEFAULT_ARM_LEN: f32 = 100.0;

/// Targets this close to the centre (per coordinate) fold the arm instead of solving.
const NEAR_ORIGIN: f32 = 1.0;

/// Sand-table SCARA transform.
#[derive(Copy, Clone, Debug, Default)]
pub struct SandTableScara;

impl SandTableScara {
    fn arm_lengths(axes: &AxesConfig) -> (f32, f32) {
        (
            axes.max_val_or(0, DEFAULT_ARM_LEN),
            axes.max_val_or(1, DEFAULT_ARM_LEN),
        )
    }

    /// Arm angles in degrees for the given step counters.
    fn steps_to_polar(steps: &StepCounts, axes: &AxesConfig) -> (f32, f32) {
        let upper = steps[0] as f32 * 360.0 / axes.steps_per_rot(0);
        let lower = 540.0 - steps[1] as f32 * 360.0 / axes.steps_per_rot(1);
        (wrap_degrees(upper), wrap_degrees(lower))
    }

    /// Both elbow solutions `[(upper, lower); 2]` in degrees for a point at least
    /// [`NEAR_ORIGIN`] from the centre.
    fn solutions(x: f32, y: f32, upper_len: f32, lower_len: f32) -> [(f32, f32); 2] {
        let reach = libm::sqrtf(x * x + y * y);
        let bearing = wrap_radians(libm::atan2f(x, y));
        let shoulder = cosine_rule(reach, upper_len, lower_len);
        let elbow = cosine_rule(upper_len, lower_len, reach);

        let a1 = bearing - shoulder;
        let b1 = a1 - elbow + PI;
        let a2 = bearing + shoulder;
        let b2 = a2 + elbow - PI;
        [
            (wrap_degrees(a1.to_degrees()), wrap_degrees(b1.to_degrees())),
            (wrap_degrees(a2.to_degrees()), wrap_degrees(b2.to_degrees())),
        ]
    }
}

impl Kinematics for SandTableScara {
    fn to_actuator(
        &self,
        target: &AxisFloats,
        pos: &AxisPosition,
        axes: &AxesConfig,
        allow_out_of_bounds: bool,
    ) -> Result<AxisFloats, MoveError> {
        let (upper_len, lower_len) = Self::arm_lengths(axes);
        let (cur_upper, cur_lower) = Self::steps_to_polar(&pos.steps_from_home, axes);
        let x = target.get(0);
        let y = target.get(1);

        let (rel_upper, rel_lower) = if libm::fabsf(x) < NEAR_ORIGIN && libm::fabsf(y) < NEAR_ORIGIN {
            // Fold the lower arm back over the upper one
            (0.0, relative_rotation(cur_upper + 180.0, cur_lower))
        } else {
            let reach = libm::sqrtf(x * x + y * y);
            if reach > upper_len + lower_len && !allow_out_of_bounds {
                return Err(MoveError::OutOfBounds);
            }
            let [first, second] = Self::solutions(x, y, upper_len, lower_len);
            let rel = |(upper, lower): (f32, f32)| {
                (
                    relative_rotation(upper, cur_upper),
                    relative_rotation(lower, cur_lower),
                )
            };
            let (r1, r2) = (rel(first), rel(second));
            if libm::fabsf(r1.0) + libm::fabsf(r1.1) <= libm::fabsf(r2.0) + libm::fabsf(r2.1) {
                r1
            } else {
                r2
            }
        };

        let mut out = AxisFloats::new();
        for axis in 0..axes.num_axes() {
            out.set(axis, pos.steps_from_home[axis] as f32);
        }
        let upper_steps = libm::roundf(rel_upper * axes.steps_per_rot(0) / 360.0);
        let lower_steps = libm::roundf(-rel_lower * axes.steps_per_rot(1) / 360.0);
        out.set(0, pos.steps_from_home[0] as f32 + upper_steps);
        out.set(1, pos.steps_from_home[1] as f32 + lower_steps);
        Ok(out)
    }

    fn from_actuator(&self, steps: &StepCounts, pos: &AxisPosition, axes: &AxesConfig) -> AxisFloats {
        let (upper_len, lower_len) = Self::arm_lengths(axes);
        let (upper, lower) = Self::steps_to_polar(steps, axes);
        let (upper, lower) = (upper.to_radians(), lower.to_radians());

        let mut out = pos.units;
        out.set(0, upper_len * libm::sinf(upper) + lower_len * libm::sinf(lower));
        out.set(1, upper_len * libm::cosf(upper) + lower_len * libm::cosf(lower));
        out
    }

    fn correct_overflow(&self, pos: &mut AxisPosition, axes: &AxesConfig) {
        for axis in 0..2 {
            let per_rev = axes.steps_per_rot(axis) as i32;
            if per_rev > 0 {
                pos.steps_from_home[axis] = pos.steps_from_home[axis].rem_euclid(per_rev);
            }
        }
    }

    fn attributes(&self, axes: &AxesConfig) -> RobotAttributes {
        let (upper_len, lower_len) = Self::arm_lengths(axes);
        let reach = upper_len + lower_len;
        RobotAttributes {
            size_x: 2.0 * reach,
            size_y: 2.0 * reach,
            size_z: 0.0,
            origin_x: reach,
            origin_y: reach,
            origin_z: 0.0,
        }
    }
}

/// Angle in radians opposite side `c` of a triangle with sides `a`, `b`, `c`.
fn cosine_rule(a: f32, b: f32, c: f32) -> f32 {
    let denom = 2.0 * a * b;
    if denom == 0.0 {
        return 0.0;
    }
    libm::acosf(((a * a + b * b - c * c) / denom).clamp(-1.0, 1.0))
}

fn wrap_degrees(angle: f32) -> f32 {
    let a = libm::fmodf(angle, 360.0);
    if a < 0.0 {
        a + 360.0
    } else {
        a
    }
}

fn wrap_radians(angle: f32) -> f32 {
    let a = libm::fmodf(angle, 2.0 * PI);
    if a < 0.0 {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Shortest signed rotation in degrees from `current` to `target`, in `(-180, 180]`.
fn relative_rotation(target: f32, current: f32) -> f32 {
    let diff = wrap_degrees(target) - wrap_degrees(current);
    if diff <= -180.0 {
        diff + 360.0
    } else if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::AxisConfig;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    fn axes() -> AxesConfig {
        let arm = AxisConfig::default()
            .with_rotation(9600.0, 1.0)
            .with_max_rpm(30.0)
            .with_limits(None, Some(92.5));
        AxesConfig::new(&[arm.clone(), arm]).unwrap()
    }

    fn at_steps(a: i32, b: i32) -> AxisPosition {
        AxisPosition {
            steps_from_home: [a, b, 0],
            ..Default::default()
        }
    }

    fn rounded(act: &AxisFloats) -> StepCounts {
        [
            libm::roundf(act.get(0)) as i32,
            libm::roundf(act.get(1)) as i32,
            0,
        ]
    }

    #[test]
    fn relative_rotation_takes_short_way() {
        assert!(approx_eq(relative_rotation(10.0, 350.0), 20.0, 1e-4));
        assert!(approx_eq(relative_rotation(350.0, 10.0), -20.0, 1e-4));
        assert!(approx_eq(relative_rotation(180.0, 0.0), 180.0, 1e-4));
        assert!(approx_eq(relative_rotation(0.0, 180.0), 180.0, 1e-4));
    }

    #[test]
    fn home_position_is_folded_at_centre() {
        let axes = axes();
        let pt = SandTableScara.from_actuator(&[0, 0, 0], &AxisPosition::default(), &axes);
        assert!(approx_eq(pt.get(0), 0.0, 1e-3));
        assert!(approx_eq(pt.get(1), 0.0, 1e-3));
    }

    #[test]
    fn round_trip_within_step_resolution() {
        let axes = axes();
        let mut pos = at_steps(0, 0);
        for &(x, y) in &[(50.0, 50.0), (-120.0, 30.0), (10.0, -160.0), (0.0, 184.0)] {
            let target = AxisFloats::from_slice(&[x, y]);
            let act = SandTableScara.to_actuator(&target, &pos, &axes, false).unwrap();
            let steps = rounded(&act);
            let back = SandTableScara.from_actuator(&steps, &pos, &axes);
            assert!(approx_eq(back.get(0), x, 0.2), "x {} -> {}", x, back.get(0));
            assert!(approx_eq(back.get(1), y, 0.2), "y {} -> {}", y, back.get(1));
            pos.steps_from_home = steps;
        }
    }

    #[test]
    fn picks_solution_with_least_rotation() {
        let axes = axes();
        // Upper arm due East, lower arm folded back to the West
        let pos = at_steps(2400, -2400);
        let target = AxisFloats::from_slice(&[92.5, 92.5]);
        let act = SandTableScara.to_actuator(&target, &pos, &axes, false).unwrap();
        // Upper arm stays put, lower arm turns a quarter to North
        assert_eq!(rounded(&act), [2400, -4800, 0]);
    }

    #[test]
    fn centre_target_folds_arm() {
        let axes = axes();
        let pos = at_steps(2400, 0);
        let act = SandTableScara
            .to_actuator(&AxisFloats::from_slice(&[0.0, 0.0]), &pos, &axes, false)
            .unwrap();
        assert_eq!(rounded(&act), [2400, -2400, 0]);
        let back = SandTableScara.from_actuator(&rounded(&act), &pos, &axes);
        assert!(approx_eq(back.get(0), 0.0, 1e-2));
        assert!(approx_eq(back.get(1), 0.0, 1e-2));
    }

    #[test]
    fn unreachable_target_rejected_unless_allowed() {
        let axes = axes();
        let pos = at_steps(0, 0);
        let far = AxisFloats::from_slice(&[200.0, 0.0]);
        assert_eq!(
            SandTableScara.to_actuator(&far, &pos, &axes, false),
            Err(MoveError::OutOfBounds)
        );
        assert!(SandTableScara.to_actuator(&far, &pos, &axes, true).is_ok());
    }

    #[test]
    fn overflow_wraps_into_one_revolution() {
        let axes = axes();
        let mut pos = at_steps(9700, -100);
        SandTableScara.correct_overflow(&mut pos, &axes);
        assert_eq!(pos.steps_from_home[..2], [100, 9500]);
    }

    #[test]
    fn attributes_cover_full_reach() {
        let attrs = SandTableScara.attributes(&axes());
        assert!(approx_eq(attrs.size_x, 370.0, 1e-3));
        assert!(approx_eq(attrs.origin_y, 185.0, 1e-3));
    }
}
