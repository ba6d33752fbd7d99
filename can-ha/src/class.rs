//! Message-type classes.
//!
//! Each class is an uninhabited marker type binding a [`MessageType`] to
//! the value it carries. Outbound classes report device state to the bus,
//! inbound classes are consumed from it.

use core::fmt::Debug;

use can_ha_payload::Payload;

use crate::frame::MessageType;

pub trait Class {
    const MESSAGE_TYPE: MessageType;
    type Value: Payload + Copy + Default + PartialEq + Debug + 'static;
}

/// Device → bus. Frames carry the value and its timestamp.
pub trait Outbound: Class {}

/// Bus → device. Frames carry the value only.
pub trait Inbound: Class {}

/// State of a two-bit (double point) indication or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Payload)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DoubleState {
    #[default]
    Intermediate,
    Off,
    On,
    Faulty,
}

macro_rules! class {
    ($(#[$meta:meta])* $NAME:ident, $VALUE:ty, $DIRECTION:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $NAME {}

        impl Class for $NAME {
            const MESSAGE_TYPE: MessageType = MessageType::$NAME;
            type Value = $VALUE;
        }

        impl $DIRECTION for $NAME {}
    };
}

class!(
    /// Binary sensor state.
    SingleIndication, bool, Outbound
);
class!(
    /// Two-bit sensor state, e.g. an end-position switch pair.
    DoubleIndication, DoubleState, Outbound
);
class!(
    /// Fixed point reading with two implied decimals (2153 = 21.53).
    MeasuredValue16, i16, Outbound
);
class!(MeasuredValue32, i32, Outbound);
class!(SingleCommand, bool, Inbound);
class!(DoubleCommand, DoubleState, Inbound);
class!(
    /// Fixed point target with two implied decimals.
    SetPoint16, i16, Inbound
);
class!(SetPoint32, i32, Inbound);
