//! Error types.
//!
//! Nothing here is fatal. Each error marks a single value as stale or lost.

use crate::frame::MessageType;

/// The outgoing frame queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

/// The payload is too short for its class or holds an
/// out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MalformedFrame;

impl From<can_ha_payload::error::Error> for MalformedFrame {
    fn from(_: can_ha_payload::error::Error) -> Self {
        Self
    }
}

/// The inbound handoff queue was full and the frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InboundOverflow;

/// A frame cannot carry more than 8 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError {
    Invalid,
    Overflow,
}

impl From<InvalidFrame> for ReceiveError {
    fn from(_: InvalidFrame) -> Self {
        Self::Invalid
    }
}

impl From<InboundOverflow> for ReceiveError {
    fn from(_: InboundOverflow) -> Self {
        Self::Overflow
    }
}

/// Failure of an application write.
///
/// On `BufferFull` the local object already holds the new
/// value and timestamp; only the frame was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    BufferFull,
    NoSuchObject,
}

impl From<BufferFull> for WriteError {
    fn from(_: BufferFull) -> Self {
        Self::BufferFull
    }
}

/// Rejected object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    DuplicateIdentifier {
        message_type: MessageType,
        identifier: u32,
    },
    IdentifierOutOfRange {
        message_type: MessageType,
        identifier: u32,
    },
}
