//! Fixed-width little-endian scalars.
//!
//! Every numeric field in a GGUF stream is packed with no alignment padding,
//! so a scalar is exactly `WIDTH` bytes wherever it appears.

use std::io::{self, Write};

mod sealed {
    pub trait Sealed {}
}

/// A primitive that has a packed little-endian wire form.
///
/// Implemented for the integer and float widths GGUF uses. `bool` is not a
/// `Scalar`: it is read as a `u8` and interpreted by the reader.
pub trait Scalar: sealed::Sealed + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Write the little-endian form of `self`.
    fn write_le<W: Write + ?Sized>(self, w: &mut W) -> io::Result<()>;
}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Scalar for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut b = [0u8; std::mem::size_of::<$t>()];
                    b.copy_from_slice(bytes);
                    <$t>::from_le_bytes(b)
                }

                #[inline]
                fn write_le<W: Write + ?Sized>(self, w: &mut W) -> io::Result<()> {
                    w.write_all(&self.to_le_bytes())
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Largest scalar width; sizes the reader's scratch buffer.
pub(crate) const MAX_SCALAR_WIDTH: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_wire_layout() {
        assert_eq!(u8::WIDTH, 1);
        assert_eq!(i8::WIDTH, 1);
        assert_eq!(u16::WIDTH, 2);
        assert_eq!(i16::WIDTH, 2);
        assert_eq!(u32::WIDTH, 4);
        assert_eq!(i32::WIDTH, 4);
        assert_eq!(f32::WIDTH, 4);
        assert_eq!(u64::WIDTH, 8);
        assert_eq!(i64::WIDTH, 8);
        assert_eq!(f64::WIDTH, MAX_SCALAR_WIDTH);
    }

    #[test]
    fn little_endian_byte_order() {
        assert_eq!(u32::from_le_slice(&[0x47, 0x47, 0x55, 0x46]), 0x4655_4747);
        assert_eq!(i16::from_le_slice(&[0xFE, 0xFF]), -2);

        let mut out = Vec::new();
        0x0102_0304u32.write_le(&mut out).unwrap();
        assert_eq!(out, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn float_bit_patterns_preserved() {
        let bits = 1.5f64.to_le_bytes();
        assert_eq!(f64::from_le_slice(&bits), 1.5);
        let bits = (-0.0f32).to_le_bytes();
        assert!(f32::from_le_slice(&bits).is_sign_negative());
    }
}
