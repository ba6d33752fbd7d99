//! Identifier registry.
//!
//! One table per message-type class. A frame is matched on its message type
//! first, which picks the table, and on its identifier second. Identifiers
//! shared between classes therefore never reach an object of the wrong class.
//!
//! Application writes address objects by their local table index, which is
//! unrelated to the identifier on the wire.

use crate::class::*;
use crate::codec;
use crate::error::{ConfigError, MalformedFrame};
use crate::frame::{Frame, FrameKind, IdKind, MessageType};
use crate::object::{Control, Identified, Report};

/// Result of matching one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Decoded and applied; the callback ran.
    Applied,
    /// A remote request for an outbound object; the reply should be sent.
    Recalled(Frame),
    /// No object of the frame's class carries its identifier.
    Unmatched,
    /// An object matched but the payload could not be decoded.
    Malformed,
}

/// Tables of device → bus objects.
pub trait Reports<C: Outbound> {
    fn reports(&self) -> &[Report<C>];
    fn reports_mut(&mut self) -> &mut [Report<C>];
}

/// Tables of bus → device objects.
pub trait Controls<'a, C: Inbound> {
    fn controls(&self) -> &[Control<'a, C>];
    fn controls_mut(&mut self) -> &mut [Control<'a, C>];
}

#[derive(Debug)]
pub struct Registry<'a> {
    single_indications: &'a mut [Report<SingleIndication>],
    double_indications: &'a mut [Report<DoubleIndication>],
    measured_values16: &'a mut [Report<MeasuredValue16>],
    measured_values32: &'a mut [Report<MeasuredValue32>],
    single_commands: &'a mut [Control<'a, SingleCommand>],
    double_commands: &'a mut [Control<'a, DoubleCommand>],
    set_points16: &'a mut [Control<'a, SetPoint16>],
    set_points32: &'a mut [Control<'a, SetPoint32>],
}

impl Default for Registry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! tables {
    ($(($CLASS:ident, $FIELD:ident, $WITH:ident)),+ $(,)?) => {
        $(
            impl<'a> Reports<$CLASS> for Registry<'a> {
                #[inline]
                fn reports(&self) -> &[Report<$CLASS>] {
                    &*self.$FIELD
                }

                #[inline]
                fn reports_mut(&mut self) -> &mut [Report<$CLASS>] {
                    &mut *self.$FIELD
                }
            }
        )+

        impl<'a> Registry<'a> {
            $(
                pub fn $WITH(self, table: &'a mut [Report<$CLASS>]) -> Self {
                    Self {
                        $FIELD: table,
                        ..self
                    }
                }
            )+
        }
    };
}

macro_rules! control_tables {
    ($(($CLASS:ident, $FIELD:ident, $WITH:ident)),+ $(,)?) => {
        $(
            impl<'a> Controls<'a, $CLASS> for Registry<'a> {
                #[inline]
                fn controls(&self) -> &[Control<'a, $CLASS>] {
                    &*self.$FIELD
                }

                #[inline]
                fn controls_mut(&mut self) -> &mut [Control<'a, $CLASS>] {
                    &mut *self.$FIELD
                }
            }
        )+

        impl<'a> Registry<'a> {
            $(
                pub fn $WITH(self, table: &'a mut [Control<'a, $CLASS>]) -> Self {
                    Self {
                        $FIELD: table,
                        ..self
                    }
                }
            )+
        }
    };
}

tables!(
    (SingleIndication, single_indications, with_single_indications),
    (DoubleIndication, double_indications, with_double_indications),
    (MeasuredValue16, measured_values16, with_measured_values16),
    (MeasuredValue32, measured_values32, with_measured_values32),
);

control_tables!(
    (SingleCommand, single_commands, with_single_commands),
    (DoubleCommand, double_commands, with_double_commands),
    (SetPoint16, set_points16, with_set_points16),
    (SetPoint32, set_points32, with_set_points32),
);

impl<'a> Registry<'a> {
    /// A registry with every table empty.
    pub fn new() -> Self {
        Self {
            single_indications: &mut [],
            double_indications: &mut [],
            measured_values16: &mut [],
            measured_values32: &mut [],
            single_commands: &mut [],
            double_commands: &mut [],
            set_points16: &mut [],
            set_points32: &mut [],
        }
    }

    /// Check identifier uniqueness per class and that every identifier
    /// fits the identifier layout.
    pub fn validate(&self, id_kind: IdKind) -> Result<(), ConfigError> {
        let max = id_kind.max_identifier();

        check(&*self.single_indications, max)?;
        check(&*self.double_indications, max)?;
        check(&*self.measured_values16, max)?;
        check(&*self.measured_values32, max)?;
        check(&*self.single_commands, max)?;
        check(&*self.double_commands, max)?;
        check(&*self.set_points16, max)?;
        check(&*self.set_points32, max)?;

        Ok(())
    }

    /// Match a received frame and apply it.
    pub fn dispatch(&mut self, frame: &Frame, now: u32) -> Dispatch {
        use MessageType as T;

        match (frame.kind, frame.message_type) {
            (FrameKind::Data, T::SingleCommand) => self.apply::<SingleCommand>(frame, now),
            (FrameKind::Data, T::DoubleCommand) => self.apply::<DoubleCommand>(frame, now),
            (FrameKind::Data, T::SetPoint16) => self.apply::<SetPoint16>(frame, now),
            (FrameKind::Data, T::SetPoint32) => self.apply::<SetPoint32>(frame, now),
            (FrameKind::Remote, T::SingleIndication) => self.recall::<SingleIndication>(frame),
            (FrameKind::Remote, T::DoubleIndication) => self.recall::<DoubleIndication>(frame),
            (FrameKind::Remote, T::MeasuredValue16) => self.recall::<MeasuredValue16>(frame),
            (FrameKind::Remote, T::MeasuredValue32) => self.recall::<MeasuredValue32>(frame),
            // reports of other nodes and requests for our inputs
            _ => Dispatch::Unmatched,
        }
    }

    /// Store a new value in the object at `index` and render its frame.
    pub fn write<C: Outbound>(&mut self, index: usize, value: C::Value, now: u32) -> Option<Frame>
    where
        Self: Reports<C>,
    {
        let report = Reports::<C>::reports_mut(self).get_mut(index)?;

        Some(report.write(value, now))
    }

    fn apply<C: Inbound>(&mut self, frame: &Frame, now: u32) -> Dispatch
    where
        Self: Controls<'a, C>,
    {
        let Some(control) = find(Controls::<'a, C>::controls_mut(self), frame.identifier) else {
            return Dispatch::Unmatched;
        };

        match codec::decode_control::<C>(frame) {
            Ok(value) => {
                control.apply(value, now);
                Dispatch::Applied
            }
            Err(MalformedFrame) => Dispatch::Malformed,
        }
    }

    fn recall<C: Outbound>(&mut self, frame: &Frame) -> Dispatch
    where
        Self: Reports<C>,
    {
        match find(Reports::<C>::reports_mut(self), frame.identifier) {
            Some(report) => Dispatch::Recalled(report.frame()),
            None => Dispatch::Unmatched,
        }
    }
}

fn find<T: Identified>(table: &mut [T], identifier: u32) -> Option<&mut T> {
    table
        .iter_mut()
        .find(|object| object.identity().identifier() == identifier)
}

fn check<T: Identified>(table: &[T], max: u32) -> Result<(), ConfigError> {
    for (i, object) in table.iter().enumerate() {
        let identity = object.identity();

        if identity.identifier() > max {
            Err(ConfigError::IdentifierOutOfRange {
                message_type: identity.message_type(),
                identifier: identity.identifier(),
            })?;
        }

        if table[..i]
            .iter()
            .any(|other| other.identity().identifier() == identity.identifier())
        {
            Err(ConfigError::DuplicateIdentifier {
                message_type: identity.message_type(),
                identifier: identity.identifier(),
            })?;
        }
    }

    Ok(())
}
