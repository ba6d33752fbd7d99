//! Frame codec.
//!
//! Pure conversions between class values and frames. Outbound classes
//! carry `value ‖ timestamp`, inbound classes carry `value`, both
//! little-endian:
//!
//! | class            | bytes |
//! |------------------|-------|
//! | SingleIndication | 5     |
//! | DoubleIndication | 5     |
//! | MeasuredValue16  | 6     |
//! | MeasuredValue32  | 8     |
//! | SingleCommand    | 1     |
//! | DoubleCommand    | 1     |
//! | SetPoint16       | 2     |
//! | SetPoint32       | 4     |

use can_ha_payload::Payload;

use crate::class::{Class, Inbound, Outbound};
use crate::error::MalformedFrame;
use crate::frame::{Data, Frame, FrameKind, MAX_DATA_LEN};

/// A value together with the moment it was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Payload)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stamped<V> {
    pub value: V,
    pub timestamp: u32,
}

/// Encoded width of an outbound class.
pub const fn report_len<C: Outbound>() -> usize {
    <Stamped<C::Value> as Payload>::LEN
}

/// Encoded width of an inbound class.
pub const fn control_len<C: Inbound>() -> usize {
    <C::Value as Payload>::LEN
}

pub fn encode_report<C: Outbound>(identifier: u32, report: &Stamped<C::Value>) -> Frame {
    encode::<C, _>(identifier, report)
}

pub fn decode_report<C: Outbound>(frame: &Frame) -> Result<Stamped<C::Value>, MalformedFrame> {
    decode::<C, _>(frame)
}

pub fn encode_control<C: Inbound>(identifier: u32, value: C::Value) -> Frame {
    encode::<C, _>(identifier, &value)
}

pub fn decode_control<C: Inbound>(frame: &Frame) -> Result<C::Value, MalformedFrame> {
    decode::<C, _>(frame)
}

fn encode<C: Class, P: Payload>(identifier: u32, payload: &P) -> Frame {
    const { assert!(P::LEN <= MAX_DATA_LEN) };

    let mut data = Data::new();
    // cannot fail, checked above
    unwrap!(data.resize_default(P::LEN));
    unwrap!(payload.encode_iter(data.iter_mut()));

    Frame {
        message_type: C::MESSAGE_TYPE,
        identifier,
        kind: FrameKind::Data,
        data,
    }
}

/// Only the first `DataLength` bytes are visible to the payload.
fn decode<C: Class, P: Payload>(frame: &Frame) -> Result<P, MalformedFrame> {
    if frame.message_type != C::MESSAGE_TYPE || frame.kind != FrameKind::Data {
        return Err(MalformedFrame);
    }

    Ok(P::decode_from(&frame.data)?)
}
