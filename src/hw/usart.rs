// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART abstraction layer and `log` backend.
//!
//! [`Usart`] wraps the TX half of a configured serial port. [`UsartLogger`] owns one and prints
//! every enabled `log` record on it as `LEVEL target: message\r\n`.
//!
//! To access the terminal on the host machine, connect to the debug USB port and use
//! ```text
//! $ screen /dev/tty.usbmodem* <baud_rate>
//! ```
//!
//! To close the debug terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use core::cell::RefCell;
use core::fmt::{self, Write};

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, Record};
use nb::block;
use stm32f7xx_hal::{
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Write string and CRLF terminator.
    #[inline]
    pub fn println(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Usart`.
impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}

/// `log` backend printing to a [`Usart`].
///
/// Lives in a `static`. The port is taken out in a short critical section and written with
/// interrupts enabled, so a record never holds off the step tick. A record logged while another
/// is being written is dropped; keep the tick path free of logging.
pub struct UsartLogger<U: Instance> {
    usart: Mutex<RefCell<Option<Usart<U>>>>,
}

impl<U: Instance> UsartLogger<U> {
    pub const fn new() -> Self {
        Self {
            usart: Mutex::new(RefCell::new(None)),
        }
    }

    /// Take ownership of `usart` and install this logger.
    pub fn init(&'static self, usart: Usart<U>, level: LevelFilter)
    where
        U: Send,
    {
        interrupt::free(|cs| self.usart.borrow(cs).replace(Some(usart)));
        if log::set_logger(self).is_ok() {
            log::set_max_level(level);
        }
    }

    fn take(&self) -> Option<Usart<U>> {
        interrupt::free(|cs| self.usart.borrow(cs).borrow_mut().take())
    }

    fn put_back(&self, usart: Usart<U>) {
        interrupt::free(|cs| self.usart.borrow(cs).replace(Some(usart)));
    }
}

impl<U: Instance + Send> Log for UsartLogger<U> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(mut usart) = self.take() else {
            return;
        };
        let _ = write!(
            usart,
            "{} {}: {}\r\n",
            record.level(),
            record.target(),
            record.args()
        );
        self.put_back(usart);
    }

    fn flush(&self) {
        if let Some(mut usart) = self.take() {
            usart.flush();
            self.put_back(usart);
        }
    }
}
