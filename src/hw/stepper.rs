// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! [`StepperPort`] backed by a `static` the tick interrupt can reach.
//!
//! The TIM2 handler calls [`InterruptStepper::on_tick`]; the controller calls through the port.
//! Both take the engine in a critical section, which on the main-loop side lasts only a few
//! field accesses. Planning and logging happen outside it.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};

use crate::hw::board_io::BoardIo;
use crate::motion::{StepEngine, StepperPort};

/// Pipeline slots on the board.
pub const PIPELINE_LEN: usize = 100;

pub type BoardEngine = StepEngine<BoardIo, PIPELINE_LEN>;

static ENGINE: Mutex<RefCell<Option<BoardEngine>>> = Mutex::new(RefCell::new(None));

/// Handle to the installed engine.
pub struct InterruptStepper {
    _private: (),
}

impl InterruptStepper {
    /// Hand `engine` to the tick interrupt.
    pub fn install(engine: BoardEngine) -> Self {
        interrupt::free(|cs| ENGINE.borrow(cs).replace(Some(engine)));
        Self { _private: () }
    }

    /// Tick interrupt body. Does nothing until an engine is installed.
    #[inline]
    pub fn on_tick() {
        interrupt::free(|cs| {
            if let Some(engine) = ENGINE.borrow(cs).borrow_mut().as_mut() {
                engine.on_tick();
            }
        });
    }
}

impl StepperPort<PIPELINE_LEN> for InterruptStepper {
    type Io = BoardIo;

    fn with_engine<R>(&mut self, f: impl FnOnce(&mut BoardEngine) -> R) -> Option<R> {
        interrupt::free(|cs| ENGINE.borrow(cs).borrow_mut().as_mut().map(f))
    }

    fn inspect<R>(&self, f: impl FnOnce(&BoardEngine) -> R) -> Option<R> {
        interrupt::free(|cs| ENGINE.borrow(cs).borrow().as_ref().map(f))
    }
}
