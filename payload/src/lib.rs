//! Fixed-width byte encoding for CAN frame payloads.
//!
//! Every [`Payload`] type knows its encoded width at compile time, so a
//! receiver can reject a short frame before reading a single byte of it.
//! Multi-byte numbers are little-endian.

#![no_std]

mod impls;

// export proc macro
pub use can_ha_macros::Payload;

pub mod error {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct EndOfInput;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Invalid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Error {
        EndOfInput,
        Invalid,
    }

    impl From<EndOfInput> for Error {
        fn from(_: EndOfInput) -> Self {
            Self::EndOfInput
        }
    }

    impl From<Invalid> for Error {
        fn from(_: Invalid) -> Self {
            Self::Invalid
        }
    }
}

/// Types that can be written to and read from
/// a frame payload.
pub trait Payload: Sized {
    /// Number of bytes occupied by any value of the
    /// implementer type.
    const LEN: usize;

    /// Encode the implementer type into bytes
    /// via an iterator.
    fn encode_iter<'a>(
        &self,
        dst: impl IntoIterator<Item = &'a mut u8>,
    ) -> Result<(), error::EndOfInput>;

    /// Decode the implementer type from bytes
    /// via an iterator.
    fn decode_iter<'a>(src: impl IntoIterator<Item = &'a u8>) -> Result<Self, error::Error>;

    /// Encode into the front of `dst`, returning the number of bytes written.
    ///
    /// Nothing is written if `dst` is shorter than [`Self::LEN`].
    fn encode_into(&self, dst: &mut [u8]) -> Result<usize, error::EndOfInput> {
        let dst = dst.get_mut(..Self::LEN).ok_or(error::EndOfInput)?;
        self.encode_iter(dst.iter_mut())?;

        Ok(Self::LEN)
    }

    /// Decode from the front of `src`.
    ///
    /// Inputs shorter than [`Self::LEN`] are rejected up front; trailing
    /// bytes are ignored.
    fn decode_from(src: &[u8]) -> Result<Self, error::Error> {
        let src = src.get(..Self::LEN).ok_or(error::EndOfInput)?;

        Self::decode_iter(src.iter())
    }
}
