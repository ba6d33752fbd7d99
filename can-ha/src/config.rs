use core::num::NonZeroU8;

use crate::frame::IdKind;

/// Static node configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// CAN identifier layout used on the bus.
    pub id_kind: IdKind,
    /// Drop the head frame after the driver rejected that same frame on
    /// this many refresh ticks. `None` retries forever.
    pub max_attempts: Option<NonZeroU8>,
}

impl Config {
    pub const fn new(id_kind: IdKind) -> Self {
        Self {
            id_kind,
            max_attempts: None,
        }
    }

    pub const fn with_max_attempts(self, max_attempts: NonZeroU8) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(IdKind::Standard)
    }
}
