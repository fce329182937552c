// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 plotter board.

use stm32f7xx_hal::{
    gpio::{gpioa, gpioc, gpiod, gpioe, Alternate, Input, Output, PullUp, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOC, dp.GPIOD, dp.GPIOE);
/// ```
pub struct BoardPins {
    pub usart1: Usart1Pins,
    pub x: AxisPins<XStep, XDir>,
    pub y: AxisPins<YStep, YDir>,
    pub z: AxisPins<ZStep, ZDir>,
    pub endstops: EndstopPins,
    pub motor_enable: MotorEnable,
}

pub type XStep = gpiod::PD12<Output<PushPull>>;
pub type XDir = gpiod::PD13<Output<PushPull>>;
pub type YStep = gpiod::PD14<Output<PushPull>>;
pub type YDir = gpiod::PD15<Output<PushPull>>;
pub type ZStep = gpioe::PE9<Output<PushPull>>;
pub type ZDir = gpioe::PE10<Output<PushPull>>;

pub type XMin = gpioc::PC6<Input<PullUp>>;
pub type XMax = gpioc::PC7<Input<PullUp>>;
pub type YMin = gpioc::PC8<Input<PullUp>>;
pub type YMax = gpioc::PC9<Input<PullUp>>;

/// Shared active-low EN of all step/dir drivers
pub type MotorEnable = gpioa::PA3<Output<PushPull>>;

pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// STEP and DIR of one driver
pub struct AxisPins<STEP, DIR> {
    pub step: STEP,
    pub dir: DIR,
}

/// Normally-open switches to ground, internal pull-ups
pub struct EndstopPins {
    pub x_min: XMin,
    pub x_max: XMax,
    pub y_min: YMin,
    pub y_max: YMax,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpioc: pac::GPIOC, gpiod: pac::GPIOD, gpioe: pac::GPIOE) -> Self {
        let gpioa = gpioa.split();
        let gpioc = gpioc.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        Self {
            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            x: AxisPins {
                step: gpiod.pd12.into_push_pull_output(),
                dir: gpiod.pd13.into_push_pull_output(),
            },

            y: AxisPins {
                step: gpiod.pd14.into_push_pull_output(),
                dir: gpiod.pd15.into_push_pull_output(),
            },

            z: AxisPins {
                step: gpioe.pe9.into_push_pull_output(),
                dir: gpioe.pe10.into_push_pull_output(),
            },

            endstops: EndstopPins {
                x_min: gpioc.pc6.into_pull_up_input(),
                x_max: gpioc.pc7.into_pull_up_input(),
                y_min: gpioc.pc8.into_pull_up_input(),
                y_max: gpioc.pc9.into_pull_up_input(),
            },

            motor_enable: gpioa.pa3.into_push_pull_output(),
        }
    }
}
