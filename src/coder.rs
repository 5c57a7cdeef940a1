//! Big-endian integer serialization for the NTP wire format.
//!
//! All multi-byte fields of an NTP packet cross the wire in network byte
//! order. The two free functions here are pure and stateless; the caller
//! guarantees that the buffer holds at least [`NetInt::WIDTH`] bytes.

use core::mem::size_of;

/// An unsigned integer that can be moved in and out of a raw data buffer
/// in big-endian order.
pub trait NetInt: Copy {
    /// Width of the integer in bytes.
    const WIDTH: usize;

    /// Reads a value from the first `WIDTH` bytes of `buf`.
    fn from_wire(buf: &[u8]) -> Self;

    /// Writes the value to the first `WIDTH` bytes of `buf`.
    fn to_wire(self, buf: &mut [u8]);
}

macro_rules! net_int_impl {
    ($($int:ty),*) => {
        $(
            impl NetInt for $int {
                const WIDTH: usize = size_of::<$int>();

                fn from_wire(buf: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$int>()];
                    raw.copy_from_slice(&buf[..size_of::<$int>()]);
                    <$int>::from_be_bytes(raw)
                }

                fn to_wire(self, buf: &mut [u8]) {
                    buf[..size_of::<$int>()].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

net_int_impl!(u8, u16, u32, u64);

/// Deserializes an integer from the beginning of a raw data buffer.
#[must_use]
pub fn deserialize<T: NetInt>(input: &[u8]) -> T {
    T::from_wire(input)
}

/// Serializes an integer to the beginning of a raw data buffer.
pub fn serialize<T: NetInt>(input: T, output: &mut [u8]) {
    input.to_wire(output);
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};

    #[test]
    fn deserialize_a_byte() {
        assert_eq!(deserialize::<u8>(&[0]), 0);
        assert_eq!(deserialize::<u8>(&[0xFF]), 0xFF);
    }

    #[test]
    fn deserialize_a_word() {
        assert_eq!(deserialize::<u16>(&[0, 0xFF]), 0xFF);
        assert_eq!(deserialize::<u16>(&[0x12, 0x34]), 0x1234);
    }

    #[test]
    fn deserialize_a_double_word() {
        assert_eq!(deserialize::<u32>(&[0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
    }

    #[test]
    fn deserialize_a_quad_word() {
        let data = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        assert_eq!(deserialize::<u64>(&data), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn serialize_a_byte() {
        let mut data = [1u8];
        serialize::<u8>(0, &mut data);
        assert_eq!(data, [0]);
        serialize::<u8>(0xFF, &mut data);
        assert_eq!(data, [0xFF]);
    }

    #[test]
    fn serialize_a_word() {
        let mut data = [1u8; 2];
        serialize::<u16>(0, &mut data);
        assert_eq!(data, [0, 0]);
        serialize::<u16>(0x1234, &mut data);
        assert_eq!(data, [0x12, 0x34]);
    }

    #[test]
    fn serialize_a_double_word() {
        let mut data = [1u8; 4];
        serialize::<u32>(0x1234_5678, &mut data);
        assert_eq!(data, [0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn serialize_a_quad_word() {
        let mut data = [1u8; 8];
        serialize::<u64>(0x0123_4567_89AB_CDEF, &mut data);
        assert_eq!(data, [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn round_trip_over_the_range_of_u16() {
        let mut data = [1u8; 2];
        for i in 0..=u16::MAX {
            serialize(i, &mut data);
            assert_eq!(deserialize::<u16>(&data), i);
        }
    }

    #[test]
    fn serialize_into_a_larger_buffer() {
        let mut data = [0xAAu8; 6];
        serialize::<u32>(0x0102_0304, &mut data);
        assert_eq!(data, [0x01, 0x02, 0x03, 0x04, 0xAA, 0xAA]);
    }
}
