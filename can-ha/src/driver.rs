use crate::frame::{FrameKind, IdKind};

/// CAN controller seen from the refresh loop.
pub trait Driver {
    /// Offer a frame to the controller.
    ///
    /// `data.len()` is the DataLength code. Returning `false` leaves the
    /// frame at the head of the outgoing queue for the next tick.
    fn transmit(&mut self, can_id: u32, frame_kind: FrameKind, id_kind: IdKind, data: &[u8])
        -> bool;
}

impl<D: Driver + ?Sized> Driver for &mut D {
    #[inline]
    fn transmit(
        &mut self,
        can_id: u32,
        frame_kind: FrameKind,
        id_kind: IdKind,
        data: &[u8],
    ) -> bool {
        (**self).transmit(can_id, frame_kind, id_kind, data)
    }
}
