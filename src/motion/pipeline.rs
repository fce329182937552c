// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-capacity FIFO of motion blocks, shared without locks between the planner and the
//! step generator.
//!
//! [`MotionPipeline::split`] hands out the two ends:
//!
//! - [`BlockWriter`] (main loop) appends at the "put" end and may revisit queued blocks from that
//!   end during look-ahead, inside [`BlockWriter::edit`].
//! - [`BlockReader`] (tick interrupt) claims the block at the "get" end, copies it out and later
//!   retires it. It never reads any other slot.
//!
//! The cursors are published with atomics. Slots between get and put belong to the writer only
//! while it holds the edit flag; the reader backs off for one tick if it lands inside an edit,
//! and the writer waits out a claim in progress. Neither side ever blocks the other for longer
//! than one slot copy.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use heapless::Vec;

use crate::motion::block::MotionBlock;
use crate::motion::error::ConfigError;

/// Default number of slots.
pub const DEFAULT_PIPELINE_LEN: usize = 100;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: UnsafeCell<MotionBlock> = UnsafeCell::new(MotionBlock::EMPTY);

/// Storage for `N` [`MotionBlock`]s plus the shared cursors.
///
/// Cursors run over `0..2N` so a full ring and an empty one differ.
pub struct MotionPipeline<const N: usize = DEFAULT_PIPELINE_LEN> {
    slots: [UnsafeCell<MotionBlock>; N],
    put: AtomicUsize,
    get: AtomicUsize,
    editing: AtomicBool,
    claiming: AtomicBool,
}

// Slots are only reached through the writer/reader pair, which never touch the same slot
// concurrently.
unsafe impl<const N: usize> Sync for MotionPipeline<N> {}

impl<const N: usize> MotionPipeline<N> {
    pub const fn new() -> Self {
        Self {
            slots: [EMPTY_SLOT; N],
            put: AtomicUsize::new(0),
            get: AtomicUsize::new(0),
            editing: AtomicBool::new(false),
            claiming: AtomicBool::new(false),
        }
    }

    /// Split into the producer and consumer halves.
    pub fn split(&'static mut self) -> (BlockWriter<N>, BlockReader<N>) {
        let ring: &'static Self = self;
        (
            BlockWriter { ring, len: N },
            BlockReader { ring },
        )
    }

    fn count(&self) -> usize {
        let put = self.put.load(Ordering::Acquire);
        let get = self.get.load(Ordering::Acquire);
        (put + 2 * N - get) % (2 * N)
    }

    #[inline]
    fn advance(cursor: usize, by: usize) -> usize {
        (cursor + by) % (2 * N)
    }

    #[inline]
    fn slot(&self, cursor: usize) -> *mut MotionBlock {
        self.slots[cursor % N].get()
    }
}

impl<const N: usize> Default for MotionPipeline<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-loop end of the pipeline.
pub struct BlockWriter<const N: usize = DEFAULT_PIPELINE_LEN> {
    ring: &'static MotionPipeline<N>,
    len: usize,
}

impl<const N: usize> BlockWriter<N> {
    /// Accept at most `len` blocks at a time.
    pub fn set_len(&mut self, len: usize) -> Result<(), ConfigError> {
        if len < 2 || len > N {
            return Err(ConfigError::PipelineLength {
                requested: len,
                capacity: N,
            });
        }
        self.len = len;
        Ok(())
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.ring.count()
    }

    /// Active number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[inline]
    pub fn can_accept(&self) -> bool {
        self.count() < self.len
    }

    /// Append a block at the put end. Returns false (leaving the pipeline unchanged) when full.
    pub fn add(&mut self, block: MotionBlock) -> bool {
        if !self.can_accept() {
            return false;
        }
        let put = self.ring.put.load(Ordering::Relaxed);
        // SAFETY: the slot at put is outside get..put, which the reader never touches.
        unsafe { *self.ring.slot(put) = block };
        self.ring
            .put
            .store(MotionPipeline::<N>::advance(put, 1), Ordering::Release);
        true
    }

    /// Run `f` over the queued blocks with the reader locked out of claiming.
    ///
    /// The reader may still retire its current block meanwhile; that block is already marked
    /// executing and must be left alone.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut QueuedBlocks<'_, N>) -> R) -> R {
        let ring = self.ring;
        ring.editing.store(true, Ordering::SeqCst);
        while ring.claiming.load(Ordering::SeqCst) {
            core::hint::spin_loop();
        }

        let get = ring.get.load(Ordering::Acquire);
        let put = ring.put.load(Ordering::Acquire);
        let mut queue = QueuedBlocks {
            ring,
            get,
            count: (put + 2 * N - get) % (2 * N),
        };
        let out = f(&mut queue);

        ring.editing.store(false, Ordering::SeqCst);
        out
    }

    /// Copy of the oldest block.
    pub fn peek_get(&mut self) -> Option<MotionBlock> {
        self.edit(|q| q.peek_get().copied())
    }

    /// Copy of the `n`-th block counting from the newest.
    pub fn peek_nth_from_put(&mut self, n: usize) -> Option<MotionBlock> {
        self.edit(|q| q.peek_nth_from_put(n).copied())
    }

    /// Copies of every queued block, oldest first.
    pub fn blocks(&mut self) -> Vec<MotionBlock, N> {
        self.edit(|q| q.iter().copied().collect())
    }
}

/// Tick-interrupt end of the pipeline.
pub struct BlockReader<const N: usize = DEFAULT_PIPELINE_LEN> {
    ring: &'static MotionPipeline<N>,
}

impl<const N: usize> BlockReader<N> {
    #[inline]
    pub fn count(&self) -> usize {
        self.ring.count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Mark the oldest block executing and return a copy of it.
    ///
    /// `None` if the pipeline is empty, the block is not yet executable or already claimed, or
    /// the writer is mid-edit.
    pub fn claim(&mut self) -> Option<MotionBlock> {
        let ring = self.ring;
        ring.claiming.store(true, Ordering::SeqCst);
        let claimed = if ring.editing.load(Ordering::SeqCst) {
            None
        } else {
            let get = ring.get.load(Ordering::Relaxed);
            if get == ring.put.load(Ordering::Acquire) {
                None
            } else {
                // SAFETY: the writer is not editing and will not start until `claiming` clears.
                let block = unsafe { &mut *ring.slot(get) };
                if block.can_execute && !block.is_executing {
                    block.is_executing = true;
                    Some(*block)
                } else {
                    None
                }
            }
        };
        ring.claiming.store(false, Ordering::SeqCst);
        claimed
    }

    /// Retire the oldest block. Returns false if the pipeline was empty.
    pub fn retire(&mut self) -> bool {
        let get = self.ring.get.load(Ordering::Relaxed);
        if get == self.ring.put.load(Ordering::Acquire) {
            return false;
        }
        self.ring
            .get
            .store(MotionPipeline::<N>::advance(get, 1), Ordering::Release);
        true
    }

    /// Drop every queued block.
    pub fn clear(&mut self) {
        let put = self.ring.put.load(Ordering::Acquire);
        self.ring.get.store(put, Ordering::Release);
    }
}

/// The blocks queued when an edit began.
pub struct QueuedBlocks<'a, const N: usize> {
    ring: &'a MotionPipeline<N>,
    get: usize,
    count: usize,
}

impl<const N: usize> QueuedBlocks<'_, N> {
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Oldest block, if any.
    pub fn peek_get(&self) -> Option<&MotionBlock> {
        self.peek_nth_from_get(0)
    }

    pub fn peek_get_mut(&mut self) -> Option<&mut MotionBlock> {
        self.peek_nth_from_get_mut(0)
    }

    /// `n`-th block counting from the oldest (0 = oldest).
    pub fn peek_nth_from_get(&self, n: usize) -> Option<&MotionBlock> {
        // SAFETY: slots inside the edit are not written by the reader.
        self.cursor_from_get(n).map(|c| unsafe { &*self.ring.slot(c) })
    }

    pub fn peek_nth_from_get_mut(&mut self, n: usize) -> Option<&mut MotionBlock> {
        // SAFETY: as above, and `&mut self` rules out a second live reference.
        self.cursor_from_get(n)
            .map(|c| unsafe { &mut *self.ring.slot(c) })
    }

    /// `n`-th block counting from the newest (0 = most recently added).
    pub fn peek_nth_from_put(&self, n: usize) -> Option<&MotionBlock> {
        self.peek_nth_from_get(self.count.checked_sub(n + 1)?)
    }

    pub fn peek_nth_from_put_mut(&mut self, n: usize) -> Option<&mut MotionBlock> {
        self.peek_nth_from_get_mut(self.count.checked_sub(n + 1)?)
    }

    /// Blocks from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MotionBlock> + '_ {
        (0..self.count).filter_map(move |n| self.peek_nth_from_get(n))
    }

    fn cursor_from_get(&self, n: usize) -> Option<usize> {
        (n < self.count).then(|| MotionPipeline::<N>::advance(self.get, n))
    }
}
