// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Axis and motion configuration.
//!
//! [`AxisConfig`] holds the static per-axis parameters in physical units. [`AxesConfig`] validates
//! a set of them and caches the step-space values the planner and step generator need on every
//! block: max step rate, acceleration in steps/s², step distance, and the master axis used for
//! junction-speed math.
//!
//! All structs deserialize with camelCase keys and fall back to defaults for missing fields.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::kinematics::Geometry;
use crate::motion::block::TTICKS_PER_STEP_PER_SEC;
use crate::motion::error::ConfigError;
use crate::motion::values::{AxisFloats, MAX_AXES};

/// Longest homing sequence accepted from configuration.
pub const HOMING_SEQ_LEN: usize = 128;

/// Static configuration of one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AxisConfig {
    /// Units/s
    pub max_speed: f32,
    /// Units/s; the slowest a ramp on this axis starts or ends at
    pub min_speed: f32,
    /// Units/s²
    #[serde(rename = "maxAcc")]
    pub max_accel: f32,
    pub steps_per_rot: f32,
    pub units_per_rot: f32,
    #[serde(rename = "maxRPM")]
    pub max_rpm: f32,
    pub min_val: Option<f32>,
    pub max_val: Option<f32>,
    /// Contributes to path length and feedrate, unless it is a servo axis.
    #[serde(rename = "isPrimaryAxis")]
    pub is_primary: bool,
    /// Reference axis for junction acceleration.
    #[serde(rename = "isDominantAxis")]
    pub is_dominant: bool,
    /// Positioned directly rather than stepped block by block; never primary.
    #[serde(rename = "isServoAxis")]
    pub is_servo: bool,
    pub home_offset_val: f32,
    pub home_off_steps: i32,
}

impl AxisConfig {
    pub const MAX_SPEED_DEFAULT: f32 = 100.0;
    pub const ACCEL_DEFAULT: f32 = 100.0;
    pub const STEPS_PER_ROT_DEFAULT: f32 = 1.0;
    pub const UNITS_PER_ROT_DEFAULT: f32 = 1.0;
    pub const MAX_RPM_DEFAULT: f32 = 300.0;
    /// Distance an axis moves during homing when the sequence gives no count.
    pub const HOMING_STEPS_DEFAULT: i32 = 100_000;

    /// Steps per physical unit. Falls back to 1 when `units_per_rot` is zero.
    pub fn steps_per_unit(&self) -> f32 {
        if self.units_per_rot != 0.0 {
            self.steps_per_rot / self.units_per_rot
        } else {
            1.0
        }
    }

    /// Physical units travelled per step.
    #[inline]
    pub fn step_distance(&self) -> f32 {
        1.0 / self.steps_per_unit()
    }

    /// Motor limit in steps/s.
    #[inline]
    pub fn max_step_rate(&self) -> f32 {
        self.max_rpm * self.steps_per_rot / 60.0
    }

    /// Whether moves on this axis count towards path length and feedrate.
    #[inline]
    pub fn is_path_axis(&self) -> bool {
        self.is_primary && !self.is_servo
    }

    /// Check `val` against this axis' limits, clamping it in place when `clamp` is set.
    ///
    /// Returns false if the value was outside a configured limit.
    pub fn in_bounds(&self, val: &mut f32, clamp: bool) -> bool {
        let mut ok = true;
        if let Some(min) = self.min_val {
            if *val < min {
                ok = false;
                if clamp {
                    *val = min;
                }
            }
        }
        if let Some(max) = self.max_val {
            if *val > max {
                ok = false;
                if clamp {
                    *val = max;
                }
            }
        }
        ok
    }

    /// Set the speed limit (units/s).
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the acceleration limit (units/s²).
    pub fn with_max_accel(mut self, max_accel: f32) -> Self {
        self.max_accel = max_accel;
        self
    }

    /// Set motor resolution and the travel of one rotation.
    pub fn with_rotation(mut self, steps_per_rot: f32, units_per_rot: f32) -> Self {
        self.steps_per_rot = steps_per_rot;
        self.units_per_rot = units_per_rot;
        self
    }

    pub fn with_max_rpm(mut self, max_rpm: f32) -> Self {
        self.max_rpm = max_rpm;
        self
    }

    pub fn with_limits(mut self, min_val: Option<f32>, max_val: Option<f32>) -> Self {
        self.min_val = min_val;
        self.max_val = max_val;
        self
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            max_speed: Self::MAX_SPEED_DEFAULT,
            min_speed: 0.0,
            max_accel: Self::ACCEL_DEFAULT,
            steps_per_rot: Self::STEPS_PER_ROT_DEFAULT,
            units_per_rot: Self::UNITS_PER_ROT_DEFAULT,
            max_rpm: Self::MAX_RPM_DEFAULT,
            min_val: None,
            max_val: None,
            is_primary: true,
            is_dominant: false,
            is_servo: false,
            home_offset_val: 0.0,
            home_off_steps: 0,
        }
    }
}

/// Step-space values derived from an [`AxisConfig`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AxisRates {
    /// Steps/s
    pub max_step_rate: f32,
    /// Steps/s
    pub min_step_rate: f32,
    /// Steps/s²
    pub max_accel_steps: f32,
    /// Units per step
    pub step_distance: f32,
    /// Fixed-point rate change applied once per millisecond by the step generator.
    pub accel_per_ms: u32,
}

impl AxisRates {
    fn from_config(cfg: &AxisConfig) -> Self {
        let steps_per_unit = cfg.steps_per_unit();
        let max_accel_steps = cfg.max_accel * steps_per_unit;
        let accel_per_ms = max_accel_steps * TTICKS_PER_STEP_PER_SEC as f32 / 1000.0;
        Self {
            max_step_rate: cfg.max_step_rate(),
            min_step_rate: (cfg.min_speed * steps_per_unit).min(cfg.max_step_rate()).max(0.0),
            max_accel_steps,
            step_distance: 1.0 / steps_per_unit,
            accel_per_ms: accel_per_ms as u32,
        }
    }
}

/// Validated set of axes plus derived caches.
#[derive(Clone, Debug, Default)]
pub struct AxesConfig {
    axes: Vec<AxisConfig, MAX_AXES>,
    rates: [AxisRates; MAX_AXES],
    master_fallback: Option<usize>,
    master_axis: usize,
}

impl AxesConfig {
    /// Validate `axes` and build the caches.
    pub fn new(axes: &[AxisConfig]) -> Result<Self, ConfigError> {
        if axes.is_empty() {
            return Err(ConfigError::NoAxes);
        }
        let axes = Vec::from_slice(axes).map_err(|_| ConfigError::TooManyAxes {
            count: axes.len(),
            max: MAX_AXES,
        })?;
        let mut out = Self {
            axes,
            ..Default::default()
        };
        out.validate()?;
        out.rebuild();
        Ok(out)
    }

    /// Axis to use for junction math when none is dominant.
    pub fn with_master_fallback(mut self, axis: Option<usize>) -> Self {
        self.master_fallback = axis.filter(|&a| a < self.axes.len());
        self.rebuild();
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut dominant = 0;
        for (axis, cfg) in self.axes.iter().enumerate() {
            if !(cfg.steps_per_rot > 0.0) {
                return Err(ConfigError::InvalidStepsPerRotation { axis });
            }
            if !(cfg.max_accel > 0.0) {
                return Err(ConfigError::InvalidAcceleration { axis });
            }
            if cfg.is_dominant {
                dominant += 1;
            }
        }
        if dominant > 1 {
            return Err(ConfigError::MultipleDominantAxes);
        }
        Ok(())
    }

    fn rebuild(&mut self) {
        self.rates = [AxisRates::default(); MAX_AXES];
        for (axis, cfg) in self.axes.iter().enumerate() {
            self.rates[axis] = AxisRates::from_config(cfg);
        }

        // Dominant axis, else configured fallback, else first primary, else axis 0
        let dominant = self.axes.iter().position(|a| a.is_dominant);
        let primary = self.axes.iter().position(|a| a.is_path_axis());
        self.master_axis = dominant.or(self.master_fallback).or(primary).unwrap_or(0);
    }

    /// Replace one axis and rebuild the caches.
    pub fn set_axis(&mut self, axis: usize, cfg: AxisConfig) -> Result<(), ConfigError> {
        let slot = self
            .axes
            .get_mut(axis)
            .ok_or(ConfigError::AxisOutOfRange { axis })?;
        let previous = core::mem::replace(slot, cfg);
        if let Err(e) = self.validate() {
            self.axes[axis] = previous;
            return Err(e);
        }
        self.rebuild();
        Ok(())
    }

    #[inline]
    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    /// Configuration for `axis`. Panics if `axis >= num_axes()`.
    #[inline]
    pub fn axis(&self, axis: usize) -> &AxisConfig {
        &self.axes[axis]
    }

    pub fn get(&self, axis: usize) -> Option<&AxisConfig> {
        self.axes.get(axis)
    }

    #[inline]
    pub fn rates(&self, axis: usize) -> &AxisRates {
        &self.rates[axis]
    }

    #[inline]
    pub fn master_axis(&self) -> usize {
        self.master_axis
    }

    /// Acceleration (units/s²) of the master axis.
    pub fn master_max_accel(&self) -> f32 {
        self.axes
            .get(self.master_axis)
            .map_or(AxisConfig::ACCEL_DEFAULT, |a| a.max_accel)
    }

    /// Reference axis for feedrate clamping.
    pub fn first_primary_axis(&self) -> usize {
        self.axes.iter().position(|a| a.is_path_axis()).unwrap_or(0)
    }

    #[inline]
    pub fn is_primary(&self, axis: usize) -> bool {
        self.axes.get(axis).is_some_and(|a| a.is_path_axis())
    }

    pub fn primary_mask(&self) -> [bool; MAX_AXES] {
        core::array::from_fn(|axis| self.is_primary(axis))
    }

    /// Steps per unit for `axis`; 1 for unconfigured axes.
    pub fn steps_per_unit(&self, axis: usize) -> f32 {
        self.axes.get(axis).map_or(1.0, |a| a.steps_per_unit())
    }

    pub fn steps_per_rot(&self, axis: usize) -> f32 {
        self.axes
            .get(axis)
            .map_or(AxisConfig::STEPS_PER_ROT_DEFAULT, |a| a.steps_per_rot)
    }

    /// `max_val` of `axis`, or `fallback` when unset.
    pub fn max_val_or(&self, axis: usize, fallback: f32) -> f32 {
        self.axes
            .get(axis)
            .and_then(|a| a.max_val)
            .unwrap_or(fallback)
    }

    /// Bound-check every configured axis of `pt`, clamping in place when `clamp` is set.
    pub fn pt_in_bounds(&self, pt: &mut AxisFloats, clamp: bool) -> bool {
        let mut ok = true;
        for (axis, cfg) in self.axes.iter().enumerate() {
            let mut val = pt.get(axis);
            if !cfg.in_bounds(&mut val, clamp) {
                ok = false;
                if clamp {
                    pt.set(axis, val);
                }
            }
        }
        ok
    }
}

/// Homing section of the configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomingConfig {
    pub homing_seq: String<HOMING_SEQ_LEN>,
    pub max_homing_secs: u32,
}

impl HomingConfig {
    pub const MAX_HOMING_SECS_DEFAULT: u32 = 1000;

    /// Homing config running `seq`.
    pub fn with_sequence(seq: &str) -> Result<Self, ConfigError> {
        let mut homing_seq = String::new();
        homing_seq
            .push_str(seq)
            .map_err(|_| ConfigError::HomingSequenceTooLong)?;
        Ok(Self {
            homing_seq,
            ..Default::default()
        })
    }
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            homing_seq: String::new(),
            max_homing_secs: Self::MAX_HOMING_SECS_DEFAULT,
        }
    }
}

/// Complete motion configuration for one robot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MotionConfig {
    pub robot_geom: Geometry,
    pub pipeline_len: usize,
    /// Maximum segment length for subdividing long moves; 0 disables subdivision.
    #[serde(rename = "blockDistanceMM")]
    pub block_distance_mm: f32,
    pub allow_out_of_bounds: bool,
    pub junction_deviation: f32,
    /// Master axis when none is flagged dominant.
    pub master_axis: Option<usize>,
    pub step_disable_secs: f32,
    pub homing: HomingConfig,
    pub axes: Vec<AxisConfig, MAX_AXES>,
}

impl MotionConfig {
    pub const PIPELINE_LEN_DEFAULT: usize = 100;
    pub const JUNCTION_DEVIATION_DEFAULT: f32 = 0.05;
    pub const STEP_DISABLE_SECS_DEFAULT: f32 = 60.0;

    /// Validate the configuration and build the axis caches.
    pub fn axes_config(&self) -> Result<AxesConfig, ConfigError> {
        Ok(AxesConfig::new(&self.axes)?.with_master_fallback(self.master_axis))
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            robot_geom: Geometry::default(),
            pipeline_len: Self::PIPELINE_LEN_DEFAULT,
            block_distance_mm: 0.0,
            allow_out_of_bounds: false,
            junction_deviation: Self::JUNCTION_DEVIATION_DEFAULT,
            master_axis: None,
            step_disable_secs: Self::STEP_DISABLE_SECS_DEFAULT,
            homing: HomingConfig::default(),
            axes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    fn plotter_axis() -> AxisConfig {
        AxisConfig::default()
            .with_max_speed(50.0)
            .with_max_accel(50.0)
            .with_max_rpm(30.0)
            .with_rotation(9600.0, 1.0)
            .with_limits(None, Some(92.5))
    }

    #[test]
    fn derived_rates_follow_axis_parameters() {
        let axes = AxesConfig::new(&[plotter_axis(), plotter_axis()]).unwrap();
        let rates = axes.rates(0);
        assert!(approx_eq(rates.max_step_rate, 4800.0, 1e-3));
        assert!(approx_eq(rates.max_accel_steps, 480_000.0, 1.0));
        assert!(approx_eq(rates.step_distance, 1.0 / 9600.0, 1e-9));
        assert_eq!(rates.accel_per_ms, 9_600_000);
        assert_eq!(rates.min_step_rate, 0.0);

        let mut slow = plotter_axis();
        slow.min_speed = 0.25;
        let axes = AxesConfig::new(&[slow.clone()]).unwrap();
        assert!(approx_eq(axes.rates(0).min_step_rate, 2400.0, 1e-3));
        // Never above the motor limit
        slow.min_speed = 10.0;
        let axes = AxesConfig::new(&[slow]).unwrap();
        assert!(approx_eq(axes.rates(0).min_step_rate, 4800.0, 1e-3));
    }

    #[test]
    fn zero_units_per_rot_falls_back_to_one_step_per_unit() {
        let cfg = AxisConfig::default().with_rotation(200.0, 0.0);
        assert_eq!(cfg.steps_per_unit(), 1.0);
    }

    #[test]
    fn master_axis_prefers_dominant_then_fallback_then_primary() {
        let mut second = plotter_axis();
        second.is_dominant = true;
        let axes = AxesConfig::new(&[plotter_axis(), second.clone()]).unwrap();
        assert_eq!(axes.master_axis(), 1);

        let mut servo = plotter_axis();
        servo.is_primary = false;
        let axes = AxesConfig::new(&[servo.clone(), plotter_axis()]).unwrap();
        assert_eq!(axes.master_axis(), 1);
        let axes = axes.with_master_fallback(Some(0));
        assert_eq!(axes.master_axis(), 0);

        let axes = AxesConfig::new(&[servo.clone(), servo]).unwrap();
        assert_eq!(axes.master_axis(), 0);
    }

    #[test]
    fn servo_axes_never_count_as_primary() {
        let mut servo = plotter_axis();
        servo.is_servo = true;
        assert!(servo.is_primary);
        let axes = AxesConfig::new(&[servo, plotter_axis()]).unwrap();
        assert!(!axes.is_primary(0));
        assert!(axes.is_primary(1));
        assert_eq!(axes.first_primary_axis(), 1);
        assert_eq!(axes.master_axis(), 1);
        assert_eq!(axes.primary_mask(), [false, true, false]);
    }

    #[test]
    fn rejects_invalid_axis_sets() {
        assert_eq!(AxesConfig::new(&[]).unwrap_err(), ConfigError::NoAxes);

        let mut dom = plotter_axis();
        dom.is_dominant = true;
        assert_eq!(
            AxesConfig::new(&[dom.clone(), dom]).unwrap_err(),
            ConfigError::MultipleDominantAxes
        );

        let bad = AxisConfig::default().with_rotation(0.0, 1.0);
        assert_eq!(
            AxesConfig::new(&[plotter_axis(), bad]).unwrap_err(),
            ConfigError::InvalidStepsPerRotation { axis: 1 }
        );

        let four = [
            plotter_axis(),
            plotter_axis(),
            plotter_axis(),
            plotter_axis(),
        ];
        assert!(matches!(
            AxesConfig::new(&four),
            Err(ConfigError::TooManyAxes { count: 4, .. })
        ));
    }

    #[test]
    fn set_axis_rebuilds_caches_and_keeps_old_on_error() {
        let mut axes = AxesConfig::new(&[plotter_axis(), plotter_axis()]).unwrap();
        axes.set_axis(1, plotter_axis().with_max_rpm(60.0)).unwrap();
        assert!(approx_eq(axes.rates(1).max_step_rate, 9600.0, 1e-3));

        let bad = plotter_axis().with_max_accel(0.0);
        assert!(axes.set_axis(1, bad).is_err());
        assert!(approx_eq(axes.axis(1).max_rpm, 60.0, 1e-6));
    }

    #[test]
    fn bounds_clamp_only_when_asked() {
        let axes = AxesConfig::new(&[plotter_axis(), plotter_axis()]).unwrap();
        let mut pt = AxisFloats::from_slice(&[100.0, 10.0]);
        assert!(!axes.pt_in_bounds(&mut pt, false));
        assert_eq!(pt.get(0), 100.0);
        assert!(!axes.pt_in_bounds(&mut pt, true));
        assert_eq!(pt.get(0), 92.5);
        assert!(axes.pt_in_bounds(&mut pt, false));
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let json = r#"{
            "robotGeom": "SandTableScara",
            "pipelineLen": 50,
            "junctionDeviation": 0.02,
            "homing": { "homingSeq": "A-100n;#;A=h;$", "maxHomingSecs": 30 },
            "axes": [
                { "maxSpeed": 50, "maxAcc": 50, "stepsPerRot": 9600, "maxRPM": 30, "maxVal": 92.5 },
                { "isPrimaryAxis": false }
            ]
        }"#;
        let cfg: MotionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.robot_geom, Geometry::SandTableScara);
        assert_eq!(cfg.pipeline_len, 50);
        assert!(approx_eq(cfg.junction_deviation, 0.02, 1e-6));
        assert!(approx_eq(cfg.step_disable_secs, 60.0, 1e-6));
        assert_eq!(cfg.homing.homing_seq.as_str(), "A-100n;#;A=h;$");
        assert_eq!(cfg.homing.max_homing_secs, 30);
        assert_eq!(cfg.axes.len(), 2);
        assert_eq!(cfg.axes[0].max_val, Some(92.5));
        assert_eq!(cfg.axes[0].min_val, None);
        assert!(!cfg.axes[1].is_primary);
        assert!(approx_eq(cfg.axes[1].max_speed, 100.0, 1e-6));
    }
}
