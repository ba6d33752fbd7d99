//! Application objects bound to bus identifiers.
//!
//! An object composes its immutable [`Identity`] with mutable [`Stamped`]
//! state. Objects are created once when the tables are set up and are never
//! destroyed while the node runs.

use core::fmt;

use crate::class::{Inbound, Outbound};
use crate::codec::{self, Stamped};
use crate::frame::{Frame, MessageType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    identifier: u32,
    message_type: MessageType,
}

impl Identity {
    pub const fn new(message_type: MessageType, identifier: u32) -> Self {
        Self {
            identifier,
            message_type,
        }
    }

    #[inline]
    pub const fn identifier(&self) -> u32 {
        self.identifier
    }

    #[inline]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }
}

/// Anything registered under an identity.
pub trait Identified {
    fn identity(&self) -> Identity;
}

/// Later timestamps win. A clock that steps backwards leaves the
/// previous timestamp in place.
#[inline]
fn stamp<V>(state: &mut Stamped<V>, value: V, now: u32) {
    state.value = value;
    state.timestamp = state.timestamp.max(now);
}

/// A device → bus object: indication or measured value.
pub struct Report<C: Outbound> {
    identity: Identity,
    state: Stamped<C::Value>,
}

impl<C: Outbound> Report<C> {
    pub const fn new(identifier: u32, initial: C::Value) -> Self {
        Self {
            identity: Identity::new(C::MESSAGE_TYPE, identifier),
            state: Stamped {
                value: initial,
                timestamp: 0,
            },
        }
    }

    #[inline]
    pub fn value(&self) -> C::Value {
        self.state.value
    }

    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.state.timestamp
    }

    #[inline]
    pub fn state(&self) -> Stamped<C::Value> {
        self.state
    }

    /// Store a new value and render the frame reporting it.
    pub(crate) fn write(&mut self, value: C::Value, now: u32) -> Frame {
        stamp(&mut self.state, value, now);
        self.frame()
    }

    /// The frame reporting the current state.
    pub(crate) fn frame(&self) -> Frame {
        codec::encode_report::<C>(self.identity.identifier, &self.state)
    }
}

impl<C: Outbound> Identified for Report<C> {
    fn identity(&self) -> Identity {
        self.identity
    }
}

impl<C: Outbound> fmt::Debug for Report<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .finish()
    }
}

/// A bus → device object: command or set point.
///
/// The callback runs in the refresh context each time a valid frame
/// addressed to this object arrives.
pub struct Control<'a, C: Inbound> {
    identity: Identity,
    state: Stamped<C::Value>,
    callback: &'a mut dyn FnMut(C::Value),
}

impl<'a, C: Inbound> Control<'a, C> {
    pub fn new(identifier: u32, callback: &'a mut dyn FnMut(C::Value)) -> Self {
        Self {
            identity: Identity::new(C::MESSAGE_TYPE, identifier),
            state: Stamped::default(),
            callback,
        }
    }

    /// Last value received from the bus.
    #[inline]
    pub fn value(&self) -> C::Value {
        self.state.value
    }

    /// When the last value was received; zero if never.
    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.state.timestamp
    }

    #[inline]
    pub fn state(&self) -> Stamped<C::Value> {
        self.state
    }

    pub(crate) fn apply(&mut self, value: C::Value, now: u32) {
        stamp(&mut self.state, value, now);
        (self.callback)(value);
    }
}

impl<C: Inbound> Identified for Control<'_, C> {
    fn identity(&self) -> Identity {
        self.identity
    }
}

impl<C: Inbound> fmt::Debug for Control<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
