// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt half of the motion subsystem.
//!
//! [`StepEngine`] bundles what the tick interrupt owns: the consumer end of the pipeline, the
//! step generator and the hardware port. The controller in the main loop reaches it only through
//! a [`StepperPort`], briefly, to read positions and flags or to stop. Blocks themselves flow
//! through the lock-free pipeline and never need the port.

use crate::motion::io::MotionIo;
use crate::motion::pipeline::{BlockReader, DEFAULT_PIPELINE_LEN};
use crate::motion::step_gen::StepGenerator;

pub struct StepEngine<IO: MotionIo, const N: usize = DEFAULT_PIPELINE_LEN> {
    queue: BlockReader<N>,
    gen: StepGenerator,
    io: IO,
}

impl<IO: MotionIo, const N: usize> StepEngine<IO, N> {
    pub fn new(queue: BlockReader<N>, io: IO) -> Self {
        Self {
            queue,
            gen: StepGenerator::new(),
            io,
        }
    }

    /// Step timer interrupt body.
    #[inline]
    pub fn on_tick(&mut self) {
        self.gen.on_tick(&mut self.queue, &mut self.io);
    }

    /// Abandon the block in progress and drop everything queued.
    pub fn stop(&mut self) {
        self.gen.stop();
        self.queue.clear();
    }

    #[inline]
    pub fn generator(&self) -> &StepGenerator {
        &self.gen
    }

    #[inline]
    pub fn generator_mut(&mut self) -> &mut StepGenerator {
        &mut self.gen
    }

    #[inline]
    pub fn io(&self) -> &IO {
        &self.io
    }

    #[inline]
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

/// Access to a [`StepEngine`] from the main loop.
///
/// On the host the engine is owned outright. On the board it lives where the tick interrupt can
/// reach it, and each call runs in a short critical section. `None` means no engine is installed.
pub trait StepperPort<const N: usize> {
    type Io: MotionIo;

    fn with_engine<R>(&mut self, f: impl FnOnce(&mut StepEngine<Self::Io, N>) -> R) -> Option<R>;

    fn inspect<R>(&self, f: impl FnOnce(&StepEngine<Self::Io, N>) -> R) -> Option<R>;
}

impl<IO: MotionIo, const N: usize> StepperPort<N> for StepEngine<IO, N> {
    type Io = IO;

    #[inline]
    fn with_engine<R>(&mut self, f: impl FnOnce(&mut StepEngine<IO, N>) -> R) -> Option<R> {
        Some(f(self))
    }

    #[inline]
    fn inspect<R>(&self, f: impl FnOnce(&StepEngine<IO, N>) -> R) -> Option<R> {
        Some(f(self))
    }
}
