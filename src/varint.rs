//! Canonical unsigned LEB128 codes and length prefixes.
//!
//! The wire form only ever carries values below 2^63, so a valid varint is at
//! most nine bytes long. Non-minimal encodings are rejected on decode; a
//! single zero byte is the only encoding of zero.

use crate::errors::ParseError;
use unsigned_varint::{decode, encode};

const MAX_VARINT_LEN: usize = 9;

/// Decode a varint from the front of `input`, returning the value and the
/// remaining bytes.
pub(crate) fn read_u64(input: &[u8]) -> Result<(u64, &[u8]), ParseError> {
    match decode::u64(input) {
        Ok((value, rest)) => {
            if input.len() - rest.len() > MAX_VARINT_LEN {
                return Err(ParseError::VarintOverflow);
            }
            Ok((value, rest))
        }
        Err(decode::Error::Insufficient) => Err(ParseError::VarintTruncated),
        Err(decode::Error::NotMinimal) => Err(ParseError::VarintNonMinimal),
        Err(_) => Err(ParseError::VarintOverflow),
    }
}

pub(crate) fn write_u32(value: u32, out: &mut Vec<u8>) {
    let mut buf = encode::u32_buffer();
    out.extend_from_slice(encode::u32(value, &mut buf));
}

pub(crate) fn write_usize(value: usize, out: &mut Vec<u8>) {
    let mut buf = encode::usize_buffer();
    out.extend_from_slice(encode::usize(value, &mut buf));
}
