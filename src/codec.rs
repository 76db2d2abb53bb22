//! Per-protocol value transcoders.
//!
//! Every codec is a bijection between the textual value form and the
//! canonical binary value form, plus a validator used when an address is
//! parsed from bytes. A value that passes [`Codec::validate`] always renders
//! back to text, which is what makes the two address forms round-trip.

use crate::errors::CodecError;
use crate::varint;
use arrayref::array_ref;
use byteorder::{BigEndian, ByteOrder};
use data_encoding::{Encoding, Specification, BASE32, BASE32_NOPAD, BASE64URL_NOPAD, BASE64_NOPAD};
use lazy_static::lazy_static;
use multihash::MultihashRef;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::{self, FromStr};

/// The `libp2p-key` multicodec, carried by CIDv1 peer ids.
const LIBP2P_KEY_CODEC: u64 = 0x72;

/// Upper bound on dns-class names, from RFC 1035.
const MAX_DOMAIN_LEN: usize = 255;

lazy_static! {
    /// I2P-flavoured base64: `+` and `/` replaced by `-` and `~`.
    static ref GARLIC64: Encoding = {
        let mut spec = Specification::new();
        spec.symbols
            .push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~");
        spec.padding = Some('=');
        spec.encoding().expect("garlic64 alphabet is well-formed")
    };
}

/// Handle identifying the transcoder a protocol uses for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Dotted quad, 4 bytes network order.
    Ip4,
    /// RFC 4291 text form, 16 bytes.
    Ip6,
    /// Decimal port, 2 bytes big-endian.
    Port,
    /// Decimal prefix length, 1 byte.
    Cidr,
    /// Length-prefixed UTF-8 name (dns classes, ip6zone, sni).
    Domain,
    /// Filesystem path; text form carries a leading `/`, binary form does not.
    Path,
    /// 10-byte v2 onion address plus 2-byte port.
    Onion,
    /// 35-byte v3 onion address plus 2-byte port.
    Onion3,
    /// Lowercase unpadded base32 I2P address.
    Garlic32,
    /// I2P-flavoured base64 destination.
    Garlic64,
    /// Peer id: base58btc multihash or base32 CIDv1; stored as a raw multihash.
    P2p,
    /// Multibase-prefixed multihash.
    Certhash,
    /// Zero-size protocols carry no value at all.
    NoValue,
}

impl Codec {
    /// Convert the textual value form into canonical binary form.
    pub fn text_to_bytes(self, text: &str) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Ip4 => {
                let addr = Ipv4Addr::from_str(text).map_err(|_| CodecError::InvalidIp)?;
                Ok(addr.octets().to_vec())
            }
            Codec::Ip6 => {
                let addr = Ipv6Addr::from_str(text).map_err(|_| CodecError::InvalidIp)?;
                Ok(addr.octets().to_vec())
            }
            Codec::Port => {
                let port = parse_port(text)?;
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, port);
                Ok(buf.to_vec())
            }
            Codec::Cidr => {
                let prefix: u32 = text.parse().map_err(|_| CodecError::PrefixOutOfRange)?;
                if prefix > 255 {
                    return Err(CodecError::PrefixOutOfRange);
                }
                Ok(vec![prefix as u8])
            }
            Codec::Domain => {
                check_domain(text.as_bytes())?;
                Ok(text.as_bytes().to_vec())
            }
            Codec::Path => {
                // A single leading slash is the text-form separator, not part
                // of the stored path.
                let path = text.strip_prefix('/').unwrap_or(text);
                if path.is_empty() {
                    return Err(CodecError::EmptyName);
                }
                Ok(path.as_bytes().to_vec())
            }
            Codec::Onion => read_onion(text, 10, 16),
            Codec::Onion3 => read_onion(text, 35, 56),
            Codec::Garlic32 => {
                let b32 = text.trim_end_matches('=').to_uppercase();
                let bytes = BASE32_NOPAD
                    .decode(b32.as_bytes())
                    .map_err(|_| CodecError::BadBase32)?;
                check_garlic32_len(bytes.len())?;
                Ok(bytes)
            }
            Codec::Garlic64 => {
                let mut b64 = text.to_string();
                while b64.len() % 4 != 0 {
                    b64.push('=');
                }
                let bytes = GARLIC64
                    .decode(b64.as_bytes())
                    .map_err(|_| CodecError::BadBase64)?;
                if bytes.len() < 386 {
                    return Err(CodecError::LengthMismatch {
                        expected: 386,
                        got: bytes.len(),
                    });
                }
                Ok(bytes)
            }
            Codec::P2p => read_peer_id(text),
            Codec::Certhash => {
                let bytes = read_multibase(text)?;
                MultihashRef::from_slice(&bytes).map_err(|_| CodecError::InvalidMultihash)?;
                Ok(bytes)
            }
            Codec::NoValue => {
                if text.is_empty() {
                    Ok(Vec::new())
                } else {
                    Err(CodecError::LengthMismatch {
                        expected: 0,
                        got: text.len(),
                    })
                }
            }
        }
    }

    /// Render canonical binary form back into its textual value form.
    pub fn bytes_to_text(self, bytes: &[u8]) -> Result<String, CodecError> {
        match self {
            Codec::Ip4 => {
                check_len(bytes, 4)?;
                Ok(Ipv4Addr::from(*array_ref!(bytes, 0, 4)).to_string())
            }
            Codec::Ip6 => {
                check_len(bytes, 16)?;
                Ok(Ipv6Addr::from(*array_ref!(bytes, 0, 16)).to_string())
            }
            Codec::Port => {
                check_len(bytes, 2)?;
                Ok(BigEndian::read_u16(bytes).to_string())
            }
            Codec::Cidr => {
                check_len(bytes, 1)?;
                Ok(bytes[0].to_string())
            }
            Codec::Domain => {
                check_domain(bytes)?;
                let name = str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(name.to_string())
            }
            Codec::Path => {
                if bytes.is_empty() {
                    return Err(CodecError::EmptyName);
                }
                let path = str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(format!("/{}", path))
            }
            Codec::Onion => {
                check_len(bytes, 12)?;
                let port = read_onion_port(&bytes[10..])?;
                let s = BASE32.encode(&bytes[..10]);
                Ok(format!("{}:{}", s.to_lowercase(), port))
            }
            Codec::Onion3 => {
                check_len(bytes, 37)?;
                let port = read_onion_port(&bytes[35..])?;
                let s = BASE32.encode(&bytes[..35]);
                Ok(format!("{}:{}", s.to_lowercase(), port))
            }
            Codec::Garlic32 => {
                check_garlic32_len(bytes.len())?;
                Ok(BASE32_NOPAD.encode(bytes).to_lowercase())
            }
            Codec::Garlic64 => {
                if bytes.len() < 386 {
                    return Err(CodecError::LengthMismatch {
                        expected: 386,
                        got: bytes.len(),
                    });
                }
                Ok(GARLIC64.encode(bytes))
            }
            Codec::P2p => {
                MultihashRef::from_slice(bytes).map_err(|_| CodecError::InvalidMultihash)?;
                Ok(bs58::encode(bytes).into_string())
            }
            Codec::Certhash => {
                MultihashRef::from_slice(bytes).map_err(|_| CodecError::InvalidMultihash)?;
                Ok(format!("u{}", BASE64URL_NOPAD.encode(bytes)))
            }
            Codec::NoValue => {
                check_len(bytes, 0)?;
                Ok(String::new())
            }
        }
    }

    /// Check that `bytes` is a canonical value for this codec.
    pub fn validate(self, bytes: &[u8]) -> Result<(), CodecError> {
        match self {
            Codec::NoValue => check_len(bytes, 0),
            _ => self.bytes_to_text(bytes).map(drop),
        }
    }
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() != expected {
        return Err(CodecError::LengthMismatch {
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

fn check_domain(name: &[u8]) -> Result<(), CodecError> {
    if name.is_empty() {
        return Err(CodecError::EmptyName);
    }
    if name.len() > MAX_DOMAIN_LEN {
        return Err(CodecError::LengthMismatch {
            expected: MAX_DOMAIN_LEN,
            got: name.len(),
        });
    }
    if name.contains(&b'/') {
        return Err(CodecError::InvalidDomain);
    }
    str::from_utf8(name).map_err(|_| CodecError::InvalidUtf8)?;
    Ok(())
}

fn check_garlic32_len(len: usize) -> Result<(), CodecError> {
    // An I2P base32 address decodes to a 32-byte hash or a full >= 35-byte
    // certificate form.
    if len != 32 && len < 35 {
        return Err(CodecError::LengthMismatch { expected: 35, got: len });
    }
    Ok(())
}

fn parse_port(text: &str) -> Result<u16, CodecError> {
    let port: u32 = text.parse().map_err(|_| CodecError::PortOutOfRange)?;
    if port > u32::from(u16::max_value()) {
        return Err(CodecError::PortOutOfRange);
    }
    Ok(port as u16)
}

/// Parse `<base32 address>:<port>` into `addr_len + 2` canonical bytes.
fn read_onion(text: &str, addr_len: usize, encoded_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut parts = text.split(':');

    let b32 = parts.next().ok_or(CodecError::BadBase32)?;
    if b32.len() != encoded_len {
        return Err(CodecError::BadBase32);
    }
    let addr = BASE32
        .decode(b32.to_uppercase().as_bytes())
        .map_err(|_| CodecError::BadBase32)?;
    if addr.len() != addr_len {
        return Err(CodecError::LengthMismatch {
            expected: addr_len,
            got: addr.len(),
        });
    }

    let port = parts.next().ok_or(CodecError::PortOutOfRange).and_then(parse_port)?;
    // port 0 is not dialable for onion services
    if port == 0 {
        return Err(CodecError::PortOutOfRange);
    }
    if parts.next().is_some() {
        return Err(CodecError::BadBase32);
    }

    let mut bytes = addr;
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, port);
    bytes.extend_from_slice(&buf);
    Ok(bytes)
}

fn read_onion_port(bytes: &[u8]) -> Result<u16, CodecError> {
    let port = BigEndian::read_u16(bytes);
    if port == 0 {
        return Err(CodecError::PortOutOfRange);
    }
    Ok(port)
}

/// Decode a peer id into raw multihash bytes.
///
/// Both textual forms are accepted: the legacy base58btc multihash and a
/// base32 CIDv1 carrying the `libp2p-key` multicodec. The canonical binary
/// form is the raw multihash either way.
fn read_peer_id(text: &str) -> Result<Vec<u8>, CodecError> {
    // Base58btc-encoded multihashes start with "Qm" (sha2-256) or "1"
    // (identity); everything else goes through the CID path.
    if text.starts_with('Q') || text.starts_with('1') {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|_| CodecError::BadBase58)?;
        MultihashRef::from_slice(&bytes).map_err(|_| CodecError::InvalidMultihash)?;
        return Ok(bytes);
    }

    let b32 = text.strip_prefix('b').ok_or(CodecError::InvalidCid)?;
    let cid = BASE32_NOPAD
        .decode(b32.to_uppercase().as_bytes())
        .map_err(|_| CodecError::InvalidCid)?;
    let (version, rest) = varint::read_u64(&cid).map_err(|_| CodecError::InvalidCid)?;
    if version != 1 {
        return Err(CodecError::InvalidCid);
    }
    let (codec, hash) = varint::read_u64(rest).map_err(|_| CodecError::InvalidCid)?;
    if codec != LIBP2P_KEY_CODEC {
        return Err(CodecError::InvalidCid);
    }
    MultihashRef::from_slice(hash).map_err(|_| CodecError::InvalidMultihash)?;
    Ok(hash.to_vec())
}

/// Decode a multibase-prefixed string into raw bytes.
fn read_multibase(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut chars = text.chars();
    let prefix = chars.next().ok_or(CodecError::EmptyName)?;
    let rest = chars.as_str();
    match prefix {
        'u' => BASE64URL_NOPAD
            .decode(rest.as_bytes())
            .map_err(|_| CodecError::BadBase64),
        'm' => BASE64_NOPAD
            .decode(rest.as_bytes())
            .map_err(|_| CodecError::BadBase64),
        'b' => BASE32_NOPAD
            .decode(rest.to_uppercase().as_bytes())
            .map_err(|_| CodecError::BadBase32),
        'z' => bs58::decode(rest)
            .into_vec()
            .map_err(|_| CodecError::BadBase58),
        _ => Err(CodecError::BadBase64),
    }
}
