use core::marker::PhantomData;

use fill_array::fill;

use crate::{error, Payload};

macro_rules! impl_number {
    ($TYPE:ty, $SIZE:expr) => {
        impl Payload for $TYPE {
            const LEN: usize = $SIZE;

            fn encode_iter<'a>(
                &self,
                dst: impl IntoIterator<Item = &'a mut u8>,
            ) -> Result<(), error::EndOfInput> {
                let mut dst = dst.into_iter();

                for byte in self.to_le_bytes() {
                    *dst.next().ok_or(error::EndOfInput)? = byte;
                }

                Ok(())
            }

            fn decode_iter<'a>(
                src: impl IntoIterator<Item = &'a u8>,
            ) -> Result<Self, error::Error> {
                let mut src = src.into_iter();

                // all byte values are valid
                let bytes = fill![*src.next().ok_or(error::EndOfInput)?; $SIZE];

                Ok(Self::from_le_bytes(bytes))
            }
        }
    };
}

// NOTE: a wrong size here is a compile-time
// error through `from_le_bytes`
impl_number!(u8, 1);
impl_number!(u16, 2);
impl_number!(u32, 4);
impl_number!(u64, 8);
impl_number!(i8, 1);
impl_number!(i16, 2);
impl_number!(i32, 4);
impl_number!(i64, 8);

impl Payload for bool {
    const LEN: usize = 1;

    fn encode_iter<'a>(
        &self,
        dst: impl IntoIterator<Item = &'a mut u8>,
    ) -> Result<(), error::EndOfInput> {
        let mut dst = dst.into_iter();

        *dst.next().ok_or(error::EndOfInput)? = u8::from(*self);

        Ok(())
    }

    fn decode_iter<'a>(src: impl IntoIterator<Item = &'a u8>) -> Result<Self, error::Error> {
        let mut src = src.into_iter();

        match *src.next().ok_or(error::EndOfInput)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(error::Invalid)?,
        }
    }
}

macro_rules! impl_tuple {
    ( $(($TYPE:ident, $NAME:ident)),+ ) => {
        impl<$($TYPE: Payload),+> Payload for ($($TYPE,)+) {
            const LEN: usize = 0 $( + $TYPE::LEN )+;

            fn encode_iter<'a>(
                &self,
                dst: impl IntoIterator<Item = &'a mut u8>,
            ) -> Result<(), error::EndOfInput> {
                let mut dst = dst.into_iter();

                let ($($NAME,)+) = self;

                $(
                    $NAME.encode_iter(&mut dst)?;
                )+

                Ok(())
            }

            fn decode_iter<'a>(
                src: impl IntoIterator<Item = &'a u8>,
            ) -> Result<Self, error::Error> {
                let mut src = src.into_iter();

                $(
                    let $NAME = $TYPE::decode_iter(&mut src)?;
                )+

                Ok(($($NAME,)+))
            }
        }
    };
}

impl_tuple!((A, a));
impl_tuple!((A, a), (B, b));
impl_tuple!((A, a), (B, b), (C, c));
impl_tuple!((A, a), (B, b), (C, c), (D, d));

impl<T> Payload for PhantomData<T> {
    const LEN: usize = 0;

    fn encode_iter<'a>(
        &self,
        _dst: impl IntoIterator<Item = &'a mut u8>,
    ) -> Result<(), error::EndOfInput> {
        Ok(())
    }

    fn decode_iter<'a>(_src: impl IntoIterator<Item = &'a u8>) -> Result<Self, error::Error> {
        Ok(PhantomData)
    }
}
