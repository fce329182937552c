#![no_main]
#![no_std]

// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::interrupt::{self as cs, Mutex};
use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use log::{info, warn, LevelFilter};
use panic_halt as _;

use hal::{
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use plotbot::hw::{
    BoardIo, BoardPins, InterruptStepper, TickTimer, Usart, UsartLogger, PIPELINE_LEN,
};
use plotbot::kinematics::Geometry;
use plotbot::motion::block::TICKS_PER_SEC;
use plotbot::motion::{
    AxisConfig, HomingConfig, MotionConfig, MotionController, MotionPipeline, MoveArgs, StepEngine,
};

const TICKS_PER_MS: u32 = TICKS_PER_SEC / 1000;

const HOMING_SEQ: &str = "A-40000N;B-40000N;#;A+400;B+400;#;A=h;B=h;$";

static TICK_TIMER: Mutex<RefCell<Option<TickTimer<pac::TIM2>>>> = Mutex::new(RefCell::new(None));
static LOGGER: UsartLogger<pac::USART1> = UsartLogger::new();

static TICKS: AtomicU32 = AtomicU32::new(0);
static MILLIS: AtomicU32 = AtomicU32::new(0);

/// XY plotter: 200-step motors at 16x microstepping on 40 mm/rev belts, pen lift on Z.
fn plotter_config() -> MotionConfig {
    let belt = AxisConfig::default()
        .with_rotation(3200.0, 40.0)
        .with_max_speed(100.0)
        .with_max_accel(500.0)
        .with_max_rpm(600.0)
        .with_limits(Some(0.0), Some(200.0));
    let mut pen = AxisConfig::default()
        .with_rotation(3200.0, 8.0)
        .with_max_speed(20.0)
        .with_max_accel(200.0)
        .with_limits(Some(0.0), Some(5.0));
    pen.is_primary = false;

    let mut cfg = MotionConfig {
        robot_geom: Geometry::Cartesian,
        pipeline_len: PIPELINE_LEN,
        block_distance_mm: 5.0,
        ..Default::default()
    };
    cfg.homing = HomingConfig::with_sequence(HOMING_SEQ).unwrap_or_default();
    cfg.axes.push(belt.clone()).ok();
    cfg.axes.push(belt).ok();
    cfg.axes.push(pen).ok();
    cfg
}

#[interrupt]
fn TIM2() {
    cs::free(|cs| {
        if let Some(timer) = TICK_TIMER.borrow(cs).borrow_mut().as_mut() {
            timer.clear_update();
        }
    });
    InterruptStepper::on_tick();
    if TICKS.fetch_add(1, Ordering::Relaxed) % TICKS_PER_MS == TICKS_PER_MS - 1 {
        MILLIS.fetch_add(1, Ordering::Relaxed);
    }
}

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(216.MHz()).freeze();

    // GPIO
    let pins = BoardPins::new(dp.GPIOA, dp.GPIOC, dp.GPIOD, dp.GPIOE);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(
        dp.USART1,
        (pins.usart1.tx, pins.usart1.rx),
        &clocks,
        usart_cfg,
    );
    LOGGER.init(Usart::new(serial), LevelFilter::Info);
    info!("plotbot: boot");

    // Motion
    let pipeline = cortex_m::singleton!(: MotionPipeline<PIPELINE_LEN> = MotionPipeline::new()).unwrap();
    let (writer, reader) = pipeline.split();
    let io = BoardIo::new(pins.x, pins.y, pins.z, pins.endstops, pins.motor_enable);
    let stepper = InterruptStepper::install(StepEngine::new(reader, io));
    let mut motion = match MotionController::new(&plotter_config(), writer, stepper) {
        Ok(motion) => motion,
        Err(e) => {
            warn!("plotbot: bad motion config: {}", e);
            loop {
                cortex_m::asm::wfi();
            }
        }
    };
    let timer = TickTimer::tim2(dp.TIM2, clocks.timclk1().raw());
    cs::free(|cs| TICK_TIMER.borrow(cs).replace(Some(timer)));
    unsafe { NVIC::unmask(pac::Interrupt::TIM2) };

    motion.start_homing(&MoveArgs::new());

    // Test square once homed
    let square = [(20.0, 20.0), (180.0, 20.0), (180.0, 180.0), (20.0, 180.0), (20.0, 20.0)];
    let mut next = 0;

    loop {
        motion.service(MILLIS.load(Ordering::Relaxed));

        if motion.is_homed() && next < square.len() {
            let (x, y) = square[next];
            let args = MoveArgs::new().with_axis(0, x).with_axis(1, y);
            match motion.submit_move(&args) {
                Ok(()) => next += 1,
                Err(e) if e.is_retryable() => {}
                Err(e) => {
                    warn!("plotbot: move {} rejected: {}", next, e);
                    next += 1;
                }
            }
        }
        cortex_m::asm::wfi();
    }
}
