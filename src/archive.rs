extern crate alloc;

use alloc::vec::Vec;

use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    bytes::complete::take,
    number::complete::{be_i32, be_u16, be_u32, be_u64, be_u8},
};
use num_traits::ToBytes;

use crate::{
    decode::{Cause, IResult, ParseFailure},
    length, EncodeError,
};

/// Builds the error returned by a parser that stopped at `input`.
pub(crate) fn failure(input: &[u8], cause: Cause) -> nom::Err<ParseFailure> {
    nom::Err::Failure(ParseFailure::new(input, cause))
}

fn end_of_input(input: &[u8], needed: usize) -> nom::Err<ParseFailure> {
    failure(
        input,
        Cause::UnexpectedEndOfInput {
            needed,
            available: input.len(),
        },
    )
}

/// Takes `count` bytes from the input, failing if fewer remain.
pub(crate) fn take_bytes(input: &[u8], count: usize) -> IResult<&[u8], &[u8]> {
    take::<usize, &[u8], ParseFailure>(count)(input).map_err(|_| end_of_input(input, count))
}

pub(crate) fn read_array<const SIZE: usize>(input: &[u8]) -> IResult<&[u8], [u8; SIZE]> {
    let (rest, bytes) = take_bytes(input, SIZE)?;
    let mut array = [0u8; SIZE];
    array.copy_from_slice(bytes);
    Ok((rest, array))
}

macro_rules! read_int {
    ($name:ident, $typ:ty, $parser:ident) => {
        pub(crate) fn $name(input: &[u8]) -> IResult<&[u8], $typ> {
            $parser::<&[u8], ParseFailure>(input)
                .map_err(|_| end_of_input(input, core::mem::size_of::<$typ>()))
        }
    };
}

read_int!(read_u8, u8, be_u8);
read_int!(read_u16, u16, be_u16);
read_int!(read_u32, u32, be_u32);
read_int!(read_u64, u64, be_u64);
read_int!(read_i32, i32, be_i32);

/// Reads a length-prefixed opaque byte buffer.
pub(crate) fn read_opaque(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, length) = length::read_buffer_length(input)?;
    take_bytes(input, length)
}

/// Write side of the archive. Collects the encoded bytes of a value tree.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes a fixed-width integer in network byte order.
    pub fn write_int<I: ToBytes>(&mut self, integer: I) {
        self.buffer.put_slice(integer.to_be_bytes().as_ref());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    pub fn write_length(&mut self, length: u64) -> Result<(), EncodeError> {
        length::encode_length(length, &mut self.buffer)
    }

    /// Writes a buffer preceded by its length.
    pub fn write_opaque(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.write_length(bytes.len() as u64)?;
        self.write_bytes(bytes);
        Ok(())
    }

    /// Encodes `body` into a scratch encoder and writes the result
    /// preceded by its length in bytes.
    pub fn write_prefixed<F>(&mut self, body: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), EncodeError>,
    {
        let mut inner = Encoder::new();
        body(&mut inner)?;
        self.write_opaque(&inner.buffer)
    }
}

impl From<Encoder> for Vec<u8> {
    fn from(val: Encoder) -> Self {
        val.buffer.to_vec()
    }
}

impl From<Encoder> for Bytes {
    fn from(val: Encoder) -> Self {
        val.buffer.freeze()
    }
}
