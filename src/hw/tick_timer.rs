// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Step tick timer.
//!
//! TIM2 is configured as a free-running up-counter whose update interrupt fires once every
//! [`TICK_INTERVAL_NS`]. The interrupt handler must call [`TickTimer::clear_update`] before
//! returning or it will re-enter immediately.

use stm32f7xx_hal::pac;

use crate::motion::block::TICK_INTERVAL_NS;

/// Counter clock after the prescaler: 1 MHz, so one count per microsecond.
const COUNTER_HZ: u32 = 1_000_000;

pub struct TickTimer<TIM> {
    tim: TIM,
}

impl TickTimer<pac::TIM2> {
    /// Start TIM2 with its update interrupt enabled. `timer_clk_hz` is the APB1 timer clock.
    ///
    /// The NVIC line is left masked; unmask `TIM2` once the handler's state is in place.
    pub fn tim2(tim2: pac::TIM2, timer_clk_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        let tim = tim2;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        let psc = (timer_clk_hz / COUNTER_HZ).saturating_sub(1);
        let arr = TICK_INTERVAL_NS / 1000 - 1;
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(arr) });

        // Load PSC/ARR now, then drop the update flag that caused
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());

        // Update interrupt on overflow only
        tim.cr1.modify(|_, w| w.urs().set_bit());
        tim.dier.modify(|_, w| w.uie().set_bit());

        tim.cnt.write(|w| unsafe { w.bits(0) });
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Acknowledge the update interrupt.
    #[inline]
    pub fn clear_update(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}
