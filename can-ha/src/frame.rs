//! CAN frame object and identifier layout.
//!
//! The message type occupies the three most significant bits of the CAN
//! identifier and the object identifier fills the rest:
//!
//! ```text
//! standard (11 bit):  [ type:3 | identifier:8  ]
//! extended (29 bit):  [ type:3 | identifier:26 ]
//! ```
//!
//! Commands and set points get the lowest codes so they win arbitration
//! over periodic reports.

use heapless::Vec;

use crate::error::InvalidFrame;

/// Maximum payload of a classic CAN frame.
pub const MAX_DATA_LEN: usize = 8;

/// Frame payload. Its length is the DataLength code.
pub type Data = Vec<u8, MAX_DATA_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    SingleCommand = 0,
    DoubleCommand = 1,
    SetPoint16 = 2,
    SetPoint32 = 3,
    SingleIndication = 4,
    DoubleIndication = 5,
    MeasuredValue16 = 6,
    MeasuredValue32 = 7,
}

impl MessageType {
    /// Identifier bits taken by the message type.
    pub const BITS: u32 = 3;

    /// Decode the message type from the low three bits of `code`.
    pub const fn from_bits(code: u8) -> Self {
        match code & 0b111 {
            0 => Self::SingleCommand,
            1 => Self::DoubleCommand,
            2 => Self::SetPoint16,
            3 => Self::SetPoint32,
            4 => Self::SingleIndication,
            5 => Self::DoubleIndication,
            6 => Self::MeasuredValue16,
            _ => Self::MeasuredValue32,
        }
    }

    /// Whether frames of this type travel from the bus into the device.
    pub const fn is_inbound(self) -> bool {
        (self as u8) < (Self::SingleIndication as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    Data,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdKind {
    #[default]
    Standard,
    Extended,
}

impl IdKind {
    /// Width of the raw CAN identifier.
    pub const fn bits(self) -> u32 {
        match self {
            IdKind::Standard => 11,
            IdKind::Extended => 29,
        }
    }

    /// Width left for the object identifier.
    pub const fn identifier_bits(self) -> u32 {
        self.bits() - MessageType::BITS
    }

    /// Largest object identifier that fits.
    pub const fn max_identifier(self) -> u32 {
        (1 << self.identifier_bits()) - 1
    }
}

/// A single home-automation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub message_type: MessageType,
    pub identifier: u32,
    pub kind: FrameKind,
    pub data: Data,
}

impl Frame {
    /// Create a data frame.
    pub fn new(
        message_type: MessageType,
        identifier: u32,
        data: &[u8],
    ) -> Result<Self, InvalidFrame> {
        Ok(Self {
            message_type,
            identifier,
            kind: FrameKind::Data,
            data: Vec::from_slice(data).map_err(|_| InvalidFrame)?,
        })
    }

    /// Create a remote request for the current value of an object.
    pub const fn remote(message_type: MessageType, identifier: u32) -> Self {
        Self {
            message_type,
            identifier,
            kind: FrameKind::Remote,
            data: Vec::new(),
        }
    }

    /// Split a raw CAN identifier received with the given layout.
    ///
    /// Bits above the identifier width are ignored.
    pub fn from_can_id(
        can_id: u32,
        id_kind: IdKind,
        kind: FrameKind,
        data: &[u8],
    ) -> Result<Self, InvalidFrame> {
        let shift = id_kind.identifier_bits();

        Ok(Self {
            message_type: MessageType::from_bits((can_id >> shift) as u8),
            identifier: can_id & id_kind.max_identifier(),
            kind,
            data: Vec::from_slice(data).map_err(|_| InvalidFrame)?,
        })
    }

    /// Render the raw CAN identifier for the given layout.
    pub const fn can_id(&self, id_kind: IdKind) -> u32 {
        ((self.message_type as u32) << id_kind.identifier_bits())
            | (self.identifier & id_kind.max_identifier())
    }

    /// The DataLength code.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.data.len()
    }
}
