//! Outgoing frame queue.
//!
//! A fixed-capacity ring; a frame leaves it only once the controller took it.

use core::mem::MaybeUninit;

use crate::error::BufferFull;
use crate::frame::Frame;

/// Default capacity of the outgoing queue.
pub const TX_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of frames awaiting transmission.
///
/// The head stays in place while the driver works on it and is
/// only released by [`commit_sent`](Self::commit_sent).
pub struct FrameQueue<const N: usize = TX_CAPACITY> {
    buf: [MaybeUninit<Frame>; N],
    start_cursor: usize,
    size: usize,
    released: u32,
}

impl<const N: usize> Default for FrameQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameQueue<N> {
    pub const fn new() -> Self {
        Self {
            buf: [const { MaybeUninit::uninit() }; N],
            start_cursor: 0,
            size: 0,
            released: 0,
        }
    }

    /// Append a frame at the tail.
    ///
    /// A full queue is left untouched.
    pub fn enqueue(&mut self, frame: Frame) -> Result<(), BufferFull> {
        if self.is_full() {
            Err(BufferFull)?;
        }

        let write_cursor = self.end_cursor();
        // SAFETY:
        // 1. cursor must be next empty slot in buf
        unsafe { self.buf.get_unchecked_mut(write_cursor) }.write(frame);
        self.size += 1;

        Ok(())
    }

    /// The oldest frame, if any.
    pub fn peek(&self) -> Option<&Frame> {
        if self.is_empty() {
            return None;
        }

        // SAFETY: the slot at the start cursor is
        // initialized whenever size > 0
        Some(unsafe { self.buf.get_unchecked(self.start_cursor).assume_init_ref() })
    }

    /// Release the oldest frame.
    ///
    /// Does nothing on an empty queue.
    pub fn commit_sent(&mut self) {
        if self.is_empty() {
            return;
        }

        // SAFETY: populated slot (size > 0), never read again
        // after the cursor moves past it
        unsafe {
            self.buf
                .get_unchecked_mut(self.start_cursor)
                .assume_init_drop()
        };
        self.start_cursor = Self::wrap(self.start_cursor + 1);
        self.size -= 1;
        self.released = self.released.wrapping_add(1);
    }

    /// Number of frames released so far, wrapping.
    #[inline]
    pub const fn released(&self) -> u32 {
        self.released
    }

    /// Wrap a provided cursor to adhere
    /// to the buffer size.
    #[inline]
    fn wrap(cursor: usize) -> usize {
        cursor % N
    }

    /// Get the position of the end of
    /// the populated region of the buffer.
    #[inline]
    fn end_cursor(&self) -> usize {
        Self::wrap(self.start_cursor + self.len())
    }

    /// Get the capacity (maximum length) of the queue.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get the current length of the queue.
    #[inline]
    pub const fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Iterate over queued frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        (0..self.size).map(move |offset| {
            // SAFETY: every offset below size is populated
            unsafe {
                self.buf
                    .get_unchecked(Self::wrap(self.start_cursor + offset))
                    .assume_init_ref()
            }
        })
    }
}

impl<const N: usize> Drop for FrameQueue<N> {
    fn drop(&mut self) {
        while !self.is_empty() {
            self.commit_sent();
        }
    }
}
