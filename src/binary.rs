//! The binary form: `varint(code) || [varint(len) ||] value_bytes` per
//! component, concatenated.

use crate::component::Component;
use crate::errors::{ParseError, Result};
use crate::registry::{Registry, Size};
use crate::varint;
use std::convert::TryFrom;

/// Cap on a single length-prefixed value, guarding against hostile length
/// prefixes.
const MAX_VALUE_LEN: u64 = 4096;

/// Tokenize a byte buffer into a validated sequence of components.
pub(crate) fn decode_components(reg: &Registry, mut input: &[u8]) -> Result<Vec<Component>> {
    let mut parts = Vec::new();
    while !input.is_empty() {
        let (code, rest) = varint::read_u64(input)?;
        let proto = u32::try_from(code)
            .ok()
            .and_then(|c| reg.lookup_code(c).cloned())
            .ok_or(ParseError::UnknownProtocolCode(code))?;
        let (value, rest) = match proto.size() {
            Size::Fixed(bits) => take(rest, (bits / 8) as usize)?,
            Size::Variable | Size::Path => {
                let (len, rest) = varint::read_u64(rest)?;
                if len > MAX_VALUE_LEN {
                    return Err(ParseError::ValueTooLong(len as usize).into());
                }
                take(rest, len as usize)?
            }
        };
        let comp = Component::new(proto, value.to_vec())?;
        if comp.protocol().is_path() && !rest.is_empty() {
            // a path value terminates the address; anything after it could
            // never round-trip through the text form
            return Err(ParseError::TrailingGarbage.into());
        }
        parts.push(comp);
        input = rest;
    }
    Ok(parts)
}

/// Rebuild the canonical byte buffer from components, in order.
pub(crate) fn encode_components(parts: &[Component]) -> Vec<u8> {
    let mut out = Vec::new();
    for comp in parts {
        comp.write_bytes(&mut out);
    }
    out
}

fn take(input: &[u8], n: usize) -> std::result::Result<(&[u8], &[u8]), ParseError> {
    if input.len() < n {
        return Err(ParseError::Truncated);
    }
    Ok(input.split_at(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Vec<Component>> {
        decode_components(Registry::global(), bytes)
    }

    #[test]
    fn ip4_tcp_vector() {
        let bytes = [0x04, 0x7f, 0x00, 0x00, 0x01, 0x06, 0x0f, 0xa1];
        let parts = decode(&bytes).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].to_string(), "/ip4/127.0.0.1");
        assert_eq!(parts[1].to_string(), "/tcp/4001");
        assert_eq!(encode_components(&parts), bytes.to_vec());
    }

    #[test]
    fn unknown_code() {
        // varint 0x7f = 127 is not assigned
        assert_eq!(
            decode(&[0x7f]),
            Err(ParseError::UnknownProtocolCode(127).into())
        );
    }

    #[test]
    fn truncated_fixed_value() {
        assert_eq!(decode(&[0x04, 0x7f, 0x00]), Err(ParseError::Truncated.into()));
    }

    #[test]
    fn truncated_length_prefixed_value() {
        // dns, length prefix 5, only 2 bytes remain
        assert_eq!(
            decode(&[0x35, 0x05, b'a', b'b']),
            Err(ParseError::Truncated.into())
        );
    }

    #[test]
    fn hostile_length_prefix() {
        // dns with a 5000-byte length prefix
        assert_eq!(
            decode(&[0x35, 0x88, 0x27]),
            Err(ParseError::ValueTooLong(5000).into())
        );
    }

    #[test]
    fn non_minimal_code_rejected() {
        // ip4's code 4 encoded in two bytes
        assert_eq!(
            decode(&[0x84, 0x00, 0x7f, 0x00, 0x00, 0x01]),
            Err(ParseError::VarintNonMinimal.into())
        );
    }

    #[test]
    fn data_after_path_component_rejected() {
        let mut bytes = Vec::new();
        // /unix/a followed by /tcp/1
        varint::write_u32(crate::registry::UNIX, &mut bytes);
        varint::write_usize(1, &mut bytes);
        bytes.push(b'a');
        varint::write_u32(crate::registry::TCP, &mut bytes);
        bytes.extend_from_slice(&[0x00, 0x01]);
        assert_eq!(decode(&bytes), Err(ParseError::TrailingGarbage.into()));
    }

    #[test]
    fn empty_input_is_empty_address() {
        assert!(decode(&[]).unwrap().is_empty());
    }
}
