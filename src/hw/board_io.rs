// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! [`MotionIo`] for the plotter board: three step/dir drivers, four end-stops on X and Y, and a
//! shared driver enable.

use crate::drivers::{EnablePin, Endstop, StepDir};
use crate::hw::pins::{
    AxisPins, EndstopPins, MotorEnable, XDir, XMax, XMin, XStep, YDir, YMax, YMin, YStep, ZDir, ZStep,
};
use crate::motion::{AxisEnd, MotionIo};

pub struct BoardIo {
    x: StepDir<XStep, XDir>,
    y: StepDir<YStep, YDir>,
    z: StepDir<ZStep, ZDir>,
    x_min: Endstop<XMin>,
    x_max: Endstop<XMax>,
    y_min: Endstop<YMin>,
    y_max: Endstop<YMax>,
    enable: EnablePin<MotorEnable>,
}

impl BoardIo {
    /// Wrap the motion pins. Drivers start disabled.
    pub fn new(
        x: AxisPins<XStep, XDir>,
        y: AxisPins<YStep, YDir>,
        z: AxisPins<ZStep, ZDir>,
        endstops: EndstopPins,
        motor_enable: MotorEnable,
    ) -> Self {
        Self {
            x: StepDir::new(x.step, x.dir, false),
            y: StepDir::new(y.step, y.dir, false),
            z: StepDir::new(z.step, z.dir, false),
            x_min: Endstop::active_low(endstops.x_min),
            x_max: Endstop::active_low(endstops.x_max),
            y_min: Endstop::active_low(endstops.y_min),
            y_max: Endstop::active_low(endstops.y_max),
            enable: EnablePin::active_low(motor_enable),
        }
    }
}

impl MotionIo for BoardIo {
    fn set_direction(&mut self, axis: usize, forward: bool) {
        match axis {
            0 => self.x.set_direction(forward),
            1 => self.y.set_direction(forward),
            2 => self.z.set_direction(forward),
            _ => {}
        }
    }

    fn pulse_start(&mut self, axis: usize) {
        match axis {
            0 => self.x.pulse_start(),
            1 => self.y.pulse_start(),
            2 => self.z.pulse_start(),
            _ => {}
        }
    }

    fn pulse_end(&mut self, axis: usize) -> bool {
        match axis {
            0 => self.x.pulse_end(),
            1 => self.y.pulse_end(),
            2 => self.z.pulse_end(),
            _ => false,
        }
    }

    fn read_endstop(&mut self, axis: usize, end: AxisEnd) -> bool {
        match (axis, end) {
            (0, AxisEnd::Min) => self.x_min.is_triggered(),
            (0, AxisEnd::Max) => self.x_max.is_triggered(),
            (1, AxisEnd::Min) => self.y_min.is_triggered(),
            (1, AxisEnd::Max) => self.y_max.is_triggered(),
            _ => false,
        }
    }

    fn has_endstop(&self, axis: usize, _end: AxisEnd) -> bool {
        axis < 2
    }

    fn enable_motors(&mut self, on: bool) {
        self.enable.set(on);
    }
}
