//! Compact length coding used for every length prefix and [`IntX`](crate::IntX) value.
//!
//! The number of leading one-bits in the first byte tells how many bytes
//! follow. The remaining bits of the first byte and all following bytes make
//! up the value in network byte order:
//!
//! ```text
//! 0xxxxxxx                              values up to 2^7 - 1
//! 10xxxxxx xxxxxxxx                     values up to 2^14 - 1
//! 110xxxxx xxxxxxxx xxxxxxxx            values up to 2^21 - 1
//! ...
//! 11111110 xxxxxxxx (7 bytes)           values up to 2^56 - 1
//! ```
//!
//! Each value has exactly one valid encoding, the shortest one.
use bytes::BufMut;

use crate::{
    archive::{failure, read_u8, take_bytes},
    decode::{Cause, IResult},
    EncodeError,
};

/// Maximum number of bytes of an encoded length
pub const MAX_ENCODED_SIZE: usize = 8;

/// Largest value that can be length-encoded
pub const MAX_LENGTH: u64 = (1 << 56) - 1;

/// Number of bytes needed to encode `value`, `None` if it exceeds [`MAX_LENGTH`].
#[must_use]
pub fn encoded_size(value: u64) -> Option<usize> {
    (1..=MAX_ENCODED_SIZE).find(|size| value < 1 << (7 * size))
}

/// Appends the canonical encoding of `value` to `output`.
pub fn encode_length<B: BufMut>(value: u64, output: &mut B) -> Result<(), EncodeError> {
    let size = encoded_size(value).ok_or_else(|| {
        EncodeError::EncodingInvariantViolation(alloc::format!(
            "Length {value} exceeds the maximum encodable length {MAX_LENGTH}!"
        ))
    })?;
    let bytes = value.to_be_bytes();
    let mut encoded = [0u8; MAX_ENCODED_SIZE];
    encoded[..size].copy_from_slice(&bytes[bytes.len() - size..]);
    encoded[0] |= !(0xffu8 >> (size - 1));
    output.put_slice(&encoded[..size]);
    Ok(())
}

/// Decodes a length from the start of `input`.
/// Returns the value and the number of bytes it occupied.
pub fn decode_length(input: &[u8]) -> Result<(u64, usize), Cause> {
    match read_length(input) {
        Ok((remaining, value)) => Ok((value, input.len() - remaining.len())),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.cause),
        Err(nom::Err::Incomplete(_)) => Err(Cause::UnexpectedEndOfInput {
            needed: 1,
            available: input.len(),
        }),
    }
}

pub(crate) fn read_length(input: &[u8]) -> IResult<&[u8], u64> {
    let (rest, first) = read_u8(input)?;
    let additional = first.leading_ones() as usize;
    if additional >= MAX_ENCODED_SIZE {
        return Err(failure(input, Cause::UnsupportedLengthWidth));
    }
    let (rest, tail) = take_bytes(rest, additional)?;
    let value = tail.iter().fold(u64::from(first & (0x7f >> additional)), |value, byte| {
        (value << 8) | u64::from(*byte)
    });
    if additional > 0 && value < 1 << (7 * additional) {
        return Err(failure(input, Cause::NonCanonicalLength));
    }
    Ok((rest, value))
}

/// Reads the length prefix of a buffer or list and checks it against the
/// remaining input.
pub(crate) fn read_buffer_length(input: &[u8]) -> IResult<&[u8], usize> {
    let (rest, declared) = read_length(input)?;
    match usize::try_from(declared) {
        Ok(length) if length <= rest.len() => Ok((rest, length)),
        _ => Err(failure(
            input,
            Cause::TruncatedLength {
                declared,
                available: rest.len(),
            },
        )),
    }
}
