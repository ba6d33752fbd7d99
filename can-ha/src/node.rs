//! The refresh loop.
//!
//! A [`Node`] turns received frames into callbacks and queued reports into
//! driver calls, a bounded amount of each per tick.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::class::*;
use crate::codec::Stamped;
use crate::driver::Driver;
use crate::error::{ConfigError, WriteError};
use crate::frame::Frame;
use crate::frame_queue::TX_CAPACITY;
use crate::mailbox::{Mailbox, RX_CAPACITY};
use crate::registry::{Controls, Dispatch, Registry, Reports};
use crate::time::Clock;

/// The main-loop half of a node.
///
/// Owns the object tables and the clock, and borrows the [`Mailbox`] it
/// shares with the driver. All decoding and every callback run inside
/// [`refresh`](Self::refresh), never in interrupt context.
pub struct Node<'a, M, C, const TX: usize = TX_CAPACITY, const RX: usize = RX_CAPACITY>
where
    M: RawMutex,
    C: Clock,
{
    mailbox: &'a Mailbox<M, TX, RX>,
    registry: Registry<'a>,
    clock: C,
    rejections: u8,
    rejected_head: u32,
}

impl<'a, M, C, const TX: usize, const RX: usize> Node<'a, M, C, TX, RX>
where
    M: RawMutex,
    C: Clock,
{
    pub fn new(
        mailbox: &'a Mailbox<M, TX, RX>,
        registry: Registry<'a>,
        clock: C,
    ) -> Result<Self, ConfigError> {
        registry.validate(mailbox.config().id_kind)?;

        Ok(Self {
            mailbox,
            registry,
            clock,
            rejections: 0,
            rejected_head: 0,
        })
    }

    #[inline]
    pub fn mailbox(&self) -> &'a Mailbox<M, TX, RX> {
        self.mailbox
    }

    #[inline]
    pub fn registry(&self) -> &Registry<'a> {
        &self.registry
    }

    /// One tick: dispatch what the driver received, then hand queued
    /// frames to the driver until it refuses one.
    pub fn refresh(&mut self, driver: &mut impl Driver) {
        // bounded by the handoff capacity; later arrivals wait a tick
        for _ in 0..RX {
            let Some(frame) = self.mailbox.take_received() else {
                break;
            };

            self.dispatch(&frame);
        }

        self.drain(driver);
    }

    /// Call [`refresh`](Self::refresh) every `period_ms` forever.
    pub async fn run(
        &mut self,
        driver: &mut impl Driver,
        delay: &mut impl DelayNs,
        period_ms: u32,
    ) -> ! {
        loop {
            self.refresh(driver);
            delay.delay_ms(period_ms).await;
        }
    }

    /// Match a received frame against the registry and apply it.
    pub fn dispatch(&mut self, frame: &Frame) -> Dispatch {
        let now = self.clock.now();
        let outcome = self.registry.dispatch(frame, now);

        match &outcome {
            Dispatch::Applied => {
                debug!("applied {:?} {}", frame.message_type, frame.identifier);
                self.mailbox.count(|stats| &mut stats.dispatched);
            }
            Dispatch::Recalled(reply) => {
                if self.mailbox.enqueue(reply.clone()).is_ok() {
                    self.mailbox.count(|stats| &mut stats.dispatched);
                } else {
                    warn!(
                        "outgoing queue full, dropped reply for {:?} {}",
                        frame.message_type,
                        frame.identifier
                    );
                }
            }
            Dispatch::Unmatched => {
                trace!(
                    "no object for {:?} {}",
                    frame.message_type,
                    frame.identifier
                );
                self.mailbox.count(|stats| &mut stats.unmatched_frames);
            }
            Dispatch::Malformed => {
                warn!(
                    "malformed {:?} {} ({} bytes)",
                    frame.message_type,
                    frame.identifier,
                    frame.data_length()
                );
                self.mailbox.count(|stats| &mut stats.malformed_frames);
            }
        }

        outcome
    }

    fn drain(&mut self, driver: &mut impl Driver) {
        let config = *self.mailbox.config();

        for _ in 0..TX {
            let Some((position, frame)) = self.mailbox.head() else {
                break;
            };

            let accepted = driver.transmit(
                frame.can_id(config.id_kind),
                frame.kind,
                config.id_kind,
                &frame.data,
            );

            if accepted {
                self.mailbox.on_send_complete();
                self.rejections = 0;
                self.mailbox.count(|stats| &mut stats.transmitted);
                continue;
            }

            // refusals count against one frame only
            if self.rejected_head != position {
                self.rejected_head = position;
                self.rejections = 0;
            }

            self.rejections = self.rejections.saturating_add(1);
            self.mailbox.count(|stats| &mut stats.transmit_rejections);

            if let Some(max) = config.max_attempts {
                if self.rejections >= max.get() {
                    warn!(
                        "dropping {:?} {} after {} refused attempts",
                        frame.message_type,
                        frame.identifier,
                        self.rejections
                    );
                    self.mailbox.on_send_complete();
                    self.rejections = 0;
                    self.mailbox.count(|stats| &mut stats.stale_drops);
                }
            }

            break;
        }
    }

    /// Update an outbound object and queue its report.
    ///
    /// The object keeps the new value even when the queue is full.
    pub fn write<K: Outbound>(&mut self, index: usize, value: K::Value) -> Result<(), WriteError>
    where
        Registry<'a>: Reports<K>,
    {
        let now = self.clock.now();
        let frame = self
            .registry
            .write::<K>(index, value, now)
            .ok_or(WriteError::NoSuchObject)?;

        self.mailbox.enqueue(frame).inspect_err(|_| {
            warn!(
                "outgoing queue full, {:?} #{} not sent",
                K::MESSAGE_TYPE,
                index
            )
        })?;

        Ok(())
    }

    pub fn write_single_indication(&mut self, index: usize, state: bool) -> Result<(), WriteError> {
        self.write::<SingleIndication>(index, state)
    }

    pub fn write_double_indication(
        &mut self,
        index: usize,
        state: DoubleState,
    ) -> Result<(), WriteError> {
        self.write::<DoubleIndication>(index, state)
    }

    /// `value` in hundredths, e.g. 2153 for 21.53.
    pub fn write_measured_value16(&mut self, index: usize, value: i16) -> Result<(), WriteError> {
        self.write::<MeasuredValue16>(index, value)
    }

    pub fn write_measured_value32(&mut self, index: usize, value: i32) -> Result<(), WriteError> {
        self.write::<MeasuredValue32>(index, value)
    }

    /// Current state of an outbound object.
    pub fn report<K: Outbound>(&self, index: usize) -> Option<Stamped<K::Value>>
    where
        Registry<'a>: Reports<K>,
    {
        Reports::<K>::reports(&self.registry)
            .get(index)
            .map(|report| report.state())
    }

    /// Last value received by an inbound object.
    pub fn control<K: Inbound>(&self, index: usize) -> Option<Stamped<K::Value>>
    where
        Registry<'a>: Controls<'a, K>,
    {
        Controls::<'a, K>::controls(&self.registry)
            .get(index)
            .map(|control| control.state())
    }

    pub fn single_command(&self, index: usize) -> Option<Stamped<bool>> {
        self.control::<SingleCommand>(index)
    }

    pub fn double_command(&self, index: usize) -> Option<Stamped<DoubleState>> {
        self.control::<DoubleCommand>(index)
    }

    pub fn set_point16(&self, index: usize) -> Option<Stamped<i16>> {
        self.control::<SetPoint16>(index)
    }

    pub fn set_point32(&self, index: usize) -> Option<Stamped<i32>> {
        self.control::<SetPoint32>(index)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::num::NonZeroU8;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;
    use crate::codec;
    use crate::config::Config;
    use crate::frame::{FrameKind, IdKind, MessageType};
    use crate::object::{Control, Report};

    /// Accepts frames while `ready` is set and keeps a copy of each.
    struct MockDriver {
        ready: bool,
        sent: heapless::Vec<(u32, FrameKind, heapless::Vec<u8, 8>), 16>,
    }

    impl MockDriver {
        fn new() -> Self {
            Self {
                ready: true,
                sent: heapless::Vec::new(),
            }
        }
    }

    impl Driver for MockDriver {
        fn transmit(
            &mut self,
            can_id: u32,
            frame_kind: FrameKind,
            _id_kind: IdKind,
            data: &[u8],
        ) -> bool {
            if self.ready {
                self.sent
                    .push((can_id, frame_kind, heapless::Vec::from_slice(data).unwrap()))
                    .unwrap();
            }

            self.ready
        }
    }

    type TestMailbox = Mailbox<NoopRawMutex>;

    #[test]
    fn timestamps_follow_clock() {
        let mailbox = TestMailbox::new(Config::default());
        let now = Cell::new(100u32);
        let mut lights = [Report::<SingleIndication>::new(1, false)];
        let registry = Registry::new().with_single_indications(&mut lights);
        let mut node = Node::new(&mailbox, registry, || now.get()).unwrap();

        node.write_single_indication(0, true).unwrap();
        now.set(200);
        node.write_single_indication(0, false).unwrap();

        assert_eq!(
            Some(Stamped {
                value: false,
                timestamp: 200
            }),
            node.report::<SingleIndication>(0)
        );
        assert_eq!(2, mailbox.pending());
    }

    #[test]
    fn write_when_full() {
        let mailbox = Mailbox::<NoopRawMutex, 2>::new(Config::default());
        let mut values = [Report::<MeasuredValue32>::new(9, 0)];
        let registry = Registry::new().with_measured_values32(&mut values);
        let mut node = Node::new(&mailbox, registry, || 5u32).unwrap();

        node.write_measured_value32(0, 1).unwrap();
        node.write_measured_value32(0, 2).unwrap();

        assert_eq!(
            Err(WriteError::BufferFull),
            node.write_measured_value32(0, 123_456_789)
        );

        // local state is not rolled back
        assert_eq!(
            Some(123_456_789),
            node.report::<MeasuredValue32>(0).map(|s| s.value)
        );

        // queued frames untouched
        let head = mailbox.next_transmit().unwrap();
        assert_eq!(
            Ok(Stamped {
                value: 1,
                timestamp: 5
            }),
            codec::decode_report::<MeasuredValue32>(&head)
        );

        assert_eq!(
            Err(WriteError::NoSuchObject),
            node.write_measured_value32(1, 0)
        );
    }

    #[test]
    fn unknown_identifier() {
        let mailbox = TestMailbox::new(Config::default());
        let fired = Cell::new(false);
        let mut on_target = |_: i16| fired.set(true);
        let mut set_points = [Control::<SetPoint16>::new(7, &mut on_target)];
        let registry = Registry::new().with_set_points16(&mut set_points);
        let mut node = Node::new(&mailbox, registry, || 50u32).unwrap();

        let frame = codec::encode_control::<SetPoint16>(8, 2153);
        assert_eq!(Dispatch::Unmatched, node.dispatch(&frame));

        assert!(!fired.get());
        assert_eq!(Some(Stamped::default()), node.set_point16(0));
        assert_eq!(1, mailbox.stats().unmatched_frames);
    }

    #[test]
    fn refresh_dispatches_then_drains() {
        let mailbox = TestMailbox::new(Config::default());
        let seen = Cell::new(None);
        let mut on_light = |state: bool| seen.set(Some(state));
        let mut commands = [Control::<SingleCommand>::new(3, &mut on_light)];
        let mut temperatures = [Report::<MeasuredValue16>::new(4, 0)];
        let registry = Registry::new()
            .with_single_commands(&mut commands)
            .with_measured_values16(&mut temperatures);
        let mut node = Node::new(&mailbox, registry, || 77u32).unwrap();
        let mut driver = MockDriver::new();

        mailbox
            .on_receive(codec::encode_control::<SingleCommand>(3, true))
            .unwrap();
        node.write_measured_value16(0, -4096).unwrap();

        // nothing happens outside refresh
        assert_eq!(None, seen.get());

        node.refresh(&mut driver);

        assert_eq!(Some(true), seen.get());
        assert_eq!(
            Some(Stamped {
                value: true,
                timestamp: 77
            }),
            node.single_command(0)
        );

        assert_eq!(1, driver.sent.len());
        let (can_id, kind, data) = &driver.sent[0];
        assert_eq!(6 << 8 | 4, *can_id);
        assert_eq!(FrameKind::Data, *kind);
        assert_eq!([0x00u8, 0xf0, 77, 0, 0, 0], data[..]);

        assert_eq!(0, mailbox.pending());
        assert_eq!(1, mailbox.stats().transmitted);
        assert_eq!(1, mailbox.stats().dispatched);
    }

    #[test]
    fn rejected_frame_stays_queued() {
        let mailbox = TestMailbox::new(Config::default());
        let mut lights = [
            Report::<SingleIndication>::new(1, false),
            Report::<SingleIndication>::new(2, false),
        ];
        let registry = Registry::new().with_single_indications(&mut lights);
        let mut node = Node::new(&mailbox, registry, || 1u32).unwrap();
        let mut driver = MockDriver::new();

        node.write_single_indication(0, true).unwrap();
        node.write_single_indication(1, true).unwrap();

        driver.ready = false;
        node.refresh(&mut driver);
        node.refresh(&mut driver);

        assert_eq!(2, mailbox.pending());
        assert_eq!(2, mailbox.stats().transmit_rejections);

        driver.ready = true;
        node.refresh(&mut driver);

        assert_eq!(0, mailbox.pending());
        // FIFO order kept across the retry
        assert_eq!(4 << 8 | 1, driver.sent[0].0);
        assert_eq!(4 << 8 | 2, driver.sent[1].0);
    }

    #[test]
    fn stale_head_is_dropped() {
        let config = Config::new(IdKind::Standard).with_max_attempts(NonZeroU8::new(2).unwrap());
        let mailbox = TestMailbox::new(config);
        let mut lights = [Report::<SingleIndication>::new(1, false)];
        let registry = Registry::new().with_single_indications(&mut lights);
        let mut node = Node::new(&mailbox, registry, || 1u32).unwrap();
        let mut driver = MockDriver::new();

        node.write_single_indication(0, true).unwrap();
        node.write_single_indication(0, false).unwrap();

        driver.ready = false;
        node.refresh(&mut driver);
        assert_eq!(2, mailbox.pending());

        node.refresh(&mut driver);
        assert_eq!(1, mailbox.pending());
        assert_eq!(1, mailbox.stats().stale_drops);

        driver.ready = true;
        node.refresh(&mut driver);

        // only the newer report went out
        assert_eq!(1, driver.sent.len());
        assert_eq!([0u8, 1, 0, 0, 0], driver.sent[0].2[..]);
    }

    #[test]
    fn stale_count_follows_head() {
        let config = Config::new(IdKind::Standard).with_max_attempts(NonZeroU8::new(2).unwrap());
        let mailbox = TestMailbox::new(config);
        let mut lights = [Report::<SingleIndication>::new(1, false)];
        let registry = Registry::new().with_single_indications(&mut lights);
        let mut node = Node::new(&mailbox, registry, || 1u32).unwrap();
        let mut driver = MockDriver::new();

        node.write_single_indication(0, true).unwrap();
        node.write_single_indication(0, false).unwrap();

        driver.ready = false;
        node.refresh(&mut driver);

        // the controller sent the head on its own
        mailbox.on_send_complete();

        node.refresh(&mut driver);
        assert_eq!(1, mailbox.pending());
        assert_eq!(0, mailbox.stats().stale_drops);

        node.refresh(&mut driver);
        assert_eq!(0, mailbox.pending());
        assert_eq!(1, mailbox.stats().stale_drops);
    }

    #[test]
    fn malformed_frame_is_counted() {
        let mailbox = TestMailbox::new(Config::default());
        let fired = Cell::new(false);
        let mut on_target = |_: i32| fired.set(true);
        let mut set_points = [Control::<SetPoint32>::new(3, &mut on_target)];
        let registry = Registry::new().with_set_points32(&mut set_points);
        let mut node = Node::new(&mailbox, registry, || 9u32).unwrap();
        let mut driver = MockDriver::new();

        // two bytes of a four byte set point
        mailbox
            .on_receive(Frame::new(MessageType::SetPoint32, 3, &[1, 2]).unwrap())
            .unwrap();
        node.refresh(&mut driver);

        assert!(!fired.get());
        assert_eq!(Some(Stamped::default()), node.set_point32(0));
        assert_eq!(1, mailbox.stats().malformed_frames);
        assert_eq!(0, mailbox.stats().dispatched);
    }

    #[test]
    fn counters_wrap() {
        let mailbox = TestMailbox::new(Config::default());
        let mut noop = |_: i16| {};
        let mut set_points = [Control::<SetPoint16>::new(7, &mut noop)];
        let registry = Registry::new().with_set_points16(&mut set_points);
        let mut node = Node::new(&mailbox, registry, || 1u32).unwrap();

        mailbox.update(|stats| stats.unmatched_frames = u32::MAX);

        let frame = codec::encode_control::<SetPoint16>(8, 100);
        assert_eq!(Dispatch::Unmatched, node.dispatch(&frame));

        assert_eq!(0, mailbox.stats().unmatched_frames);
    }

    #[test]
    fn remote_request_is_answered() {
        let mailbox = TestMailbox::new(Config::default());
        let mut states = [Report::<DoubleIndication>::new(0x33, DoubleState::On)];
        let registry = Registry::new().with_double_indications(&mut states);
        let mut node = Node::new(&mailbox, registry, || 1u32).unwrap();
        let mut driver = MockDriver::new();

        mailbox
            .on_receive(Frame::remote(MessageType::DoubleIndication, 0x33))
            .unwrap();
        node.refresh(&mut driver);

        assert_eq!(1, driver.sent.len());
        assert_eq!((5 << 8 | 0x33, FrameKind::Data), (driver.sent[0].0, driver.sent[0].1));
        assert_eq!([2u8, 0, 0, 0, 0], driver.sent[0].2[..]);
    }

    #[test]
    fn rejects_invalid_tables() {
        let mailbox = TestMailbox::new(Config::default());
        let mut noop = |_: bool| {};
        let mut commands = [Control::<SingleCommand>::new(0x1ff, &mut noop)];
        let registry = Registry::new().with_single_commands(&mut commands);

        assert!(matches!(
            Node::new(&mailbox, registry, || 0u32),
            Err(ConfigError::IdentifierOutOfRange {
                message_type: MessageType::SingleCommand,
                identifier: 0x1ff
            })
        ));
    }
}
