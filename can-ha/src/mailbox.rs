//! Frame handoff between interrupt context and the refresh loop.
//!
//! The driver side is `&self` only and may run at interrupt level when `M`
//! is a critical-section mutex. Every critical section is O(1).

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use crate::config::Config;
use crate::error::{BufferFull, InboundOverflow, ReceiveError};
use crate::frame::{Frame, FrameKind};
use crate::frame_queue::{FrameQueue, TX_CAPACITY};

/// Default capacity of the inbound handoff queue.
pub const RX_CAPACITY: usize = 4;

/// Counters of every frame that did not take the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Frames handed to the driver and accepted.
    pub transmitted: u32,
    /// Inbound frames applied to an object.
    pub dispatched: u32,
    /// Inbound frames matching no registered object.
    pub unmatched_frames: u32,
    /// Inbound frames too short or out of range for their class.
    pub malformed_frames: u32,
    /// Inbound frames dropped because the handoff queue was full.
    pub inbound_overflows: u32,
    /// Frames not queued because the outgoing queue was full.
    pub buffer_full: u32,
    /// Transmit attempts refused by the driver.
    pub transmit_rejections: u32,
    /// Head frames dropped after too many refused attempts.
    pub stale_drops: u32,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            transmitted: 0,
            dispatched: 0,
            unmatched_frames: 0,
            malformed_frames: 0,
            inbound_overflows: 0,
            buffer_full: 0,
            transmit_rejections: 0,
            stale_drops: 0,
        }
    }
}

/// Shared frame storage of a node.
///
/// Usually placed in a `static` so the CAN interrupt handler can reach it:
///
/// ```ignore
/// static MAILBOX: Mailbox<CriticalSectionRawMutex> = Mailbox::new(Config::new(IdKind::Standard));
///
/// #[interrupt]
/// fn CAN_RX0() {
///     let (id, data) = read_fifo();
///     MAILBOX.on_receive_raw(id, FrameKind::Data, &data).ok();
/// }
/// ```
pub struct Mailbox<M: RawMutex, const TX: usize = TX_CAPACITY, const RX: usize = RX_CAPACITY> {
    config: Config,
    inbox: Channel<M, Frame, RX>,
    outbox: Mutex<M, RefCell<FrameQueue<TX>>>,
    stats: Mutex<M, Cell<Stats>>,
}

impl<M: RawMutex, const TX: usize, const RX: usize> Mailbox<M, TX, RX> {
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            inbox: Channel::new(),
            outbox: Mutex::new(RefCell::new(FrameQueue::new())),
            stats: Mutex::new(Cell::new(Stats::new())),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hand a received frame to the refresh loop.
    ///
    /// Constant time and never blocks. When the handoff queue is full the
    /// frame is dropped and counted.
    pub fn on_receive(&self, frame: Frame) -> Result<(), InboundOverflow> {
        self.inbox.try_send(frame).map_err(|_| {
            warn!("inbound queue full, frame dropped");
            self.count(|stats| &mut stats.inbound_overflows);
            InboundOverflow
        })
    }

    /// [`on_receive`](Self::on_receive) for a raw CAN identifier laid out
    /// per the configured [`IdKind`](crate::frame::IdKind).
    pub fn on_receive_raw(
        &self,
        can_id: u32,
        kind: FrameKind,
        data: &[u8],
    ) -> Result<(), ReceiveError> {
        let frame = Frame::from_can_id(can_id, self.config.id_kind, kind, data)?;
        Ok(self.on_receive(frame)?)
    }

    /// Queue a frame for transmission.
    pub fn enqueue(&self, frame: Frame) -> Result<(), BufferFull> {
        self.outbox
            .lock(|outbox| outbox.borrow_mut().enqueue(frame))
            .inspect_err(|_| self.count(|stats| &mut stats.buffer_full))
    }

    /// The frame the driver should transmit next. It stays queued until
    /// [`on_send_complete`](Self::on_send_complete).
    pub fn next_transmit(&self) -> Option<Frame> {
        self.outbox.lock(|outbox| outbox.borrow().peek().cloned())
    }

    /// The frame returned by [`next_transmit`](Self::next_transmit) left
    /// the controller.
    pub fn on_send_complete(&self) {
        self.outbox.lock(|outbox| outbox.borrow_mut().commit_sent());
    }

    /// Number of frames waiting for transmission.
    pub fn pending(&self) -> usize {
        self.outbox.lock(|outbox| outbox.borrow().len())
    }

    pub fn stats(&self) -> Stats {
        self.stats.lock(Cell::get)
    }

    pub(crate) fn take_received(&self) -> Option<Frame> {
        self.inbox.try_receive().ok()
    }

    /// The head frame along with how many frames left the queue before it.
    ///
    /// The position changes whenever the head is released, whichever side
    /// released it.
    pub(crate) fn head(&self) -> Option<(u32, Frame)> {
        self.outbox.lock(|outbox| {
            let outbox = outbox.borrow();
            outbox.peek().map(|frame| (outbox.released(), frame.clone()))
        })
    }

    /// Bump one counter. Counters wrap around.
    pub(crate) fn count(&self, counter: impl FnOnce(&mut Stats) -> &mut u32) {
        self.update(|stats| {
            let counter = counter(stats);
            *counter = counter.wrapping_add(1);
        });
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut Stats)) {
        self.stats.lock(|cell| {
            let mut stats = cell.get();
            f(&mut stats);
            cell.set(stats);
        });
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;
    use crate::frame::{IdKind, MessageType};

    fn frame(identifier: u32) -> Frame {
        Frame::new(MessageType::SingleCommand, identifier, &[1]).unwrap()
    }

    #[test]
    fn inbound_overflow() {
        let mailbox = Mailbox::<NoopRawMutex, 10, 2>::new(Config::default());

        mailbox.on_receive(frame(1)).unwrap();
        mailbox.on_receive(frame(2)).unwrap();

        assert_eq!(Err(InboundOverflow), mailbox.on_receive(frame(3)));
        assert_eq!(1, mailbox.stats().inbound_overflows);

        // oldest frames survive
        assert_eq!(Some(frame(1)), mailbox.take_received());
        assert_eq!(Some(frame(2)), mailbox.take_received());
        assert_eq!(None, mailbox.take_received());
    }

    #[test]
    fn raw_receive() {
        let mailbox = Mailbox::<NoopRawMutex>::new(Config::new(IdKind::Extended));

        let can_id = frame(0x1234).can_id(IdKind::Extended);
        mailbox.on_receive_raw(can_id, FrameKind::Data, &[1]).unwrap();

        assert_eq!(Some(frame(0x1234)), mailbox.take_received());

        assert_eq!(
            Err(ReceiveError::Invalid),
            mailbox.on_receive_raw(can_id, FrameKind::Data, &[0; 9])
        );
    }

    #[test]
    fn outbox() {
        let mailbox = Mailbox::<NoopRawMutex, 2>::new(Config::default());

        assert_eq!(None, mailbox.next_transmit());

        mailbox.enqueue(frame(1)).unwrap();
        mailbox.enqueue(frame(2)).unwrap();

        assert_eq!(Err(BufferFull), mailbox.enqueue(frame(3)));
        assert_eq!(1, mailbox.stats().buffer_full);

        assert_eq!(Some(frame(1)), mailbox.next_transmit());
        assert_eq!(2, mailbox.pending());

        mailbox.on_send_complete();

        assert_eq!(Some(frame(2)), mailbox.next_transmit());

        mailbox.on_send_complete();
        mailbox.on_send_complete();

        assert_eq!(0, mailbox.pending());
    }

    #[test]
    fn head_position() {
        let mailbox = Mailbox::<NoopRawMutex>::new(Config::default());

        assert_eq!(None, mailbox.head());

        mailbox.enqueue(frame(1)).unwrap();
        mailbox.enqueue(frame(2)).unwrap();

        assert_eq!(Some((0, frame(1))), mailbox.head());

        mailbox.on_send_complete();

        assert_eq!(Some((1, frame(2))), mailbox.head());
    }

    #[test]
    fn counters_wrap() {
        let mailbox = Mailbox::<NoopRawMutex, 10, 1>::new(Config::default());

        mailbox.update(|stats| stats.inbound_overflows = u32::MAX);

        mailbox.on_receive(frame(1)).unwrap();
        assert_eq!(Err(InboundOverflow), mailbox.on_receive(frame(2)));

        assert_eq!(0, mailbox.stats().inbound_overflows);
    }
}
