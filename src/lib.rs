//! Self-describing, composable network addresses.
//!
//! A multiaddr is an ordered sequence of *(protocol, value)* components —
//! an IP address, a transport port, a tunnel protocol, a peer identity —
//! with two interchangeable representations:
//!
//! - a human-readable text form, `/ip4/127.0.0.1/tcp/4001`;
//! - a compact, length-prefixed binary form suitable for the wire.
//!
//! The two forms round-trip without loss. Addresses compose by
//! concatenation ([`Multiaddr::encapsulate`]) and truncation
//! ([`Multiaddr::decapsulate`], [`Multiaddr::decapsulate_code`]), and can be
//! inspected component by component.
//!
//! ```
//! use multiaddr::Multiaddr;
//!
//! let addr: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
//! assert_eq!(addr.as_bytes(), &[0x04, 127, 0, 0, 1, 0x06, 0x0f, 0xa1]);
//! assert_eq!(addr.to_string(), "/ip4/127.0.0.1/tcp/4001");
//! ```
//!
//! Name-based components (`dns`, `dns4`, `dns6`, `dnsaddr`) are expanded
//! into concrete addresses by [`resolver::Resolver`], and wildcard-bound
//! addresses by [`thin_waist::expand_wildcard`]; both consume capabilities
//! supplied by the caller and never touch the network themselves.

mod binary;
mod codec;
mod component;
mod errors;
pub mod registry;
pub mod resolver;
mod text;
pub mod thin_waist;
mod varint;

pub use codec::Codec;
pub use component::Component;
pub use multihash;
pub use errors::{CodecError, DnsError, Error, ParseError, RegistryError, ResolverError, Result};
pub use registry::{Protocol, Registry, Size};

use byteorder::{BigEndian, ByteOrder};
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

/// An immutable sequence of `(protocol, value)` components, canonically
/// represented by its concatenated binary form.
///
/// Equality, ordering and hashing all operate on the canonical bytes, so
/// two addresses compare equal exactly when their wire forms do, whichever
/// textual spelling they were parsed from.
#[derive(Clone, Default)]
pub struct Multiaddr {
    bytes: Vec<u8>,
    parts: Vec<Component>,
}

impl Multiaddr {
    /// The empty multiaddr. Its canonical text form is the empty string.
    pub fn empty() -> Multiaddr {
        Multiaddr::default()
    }

    /// Build an address from already-validated components.
    pub(crate) fn from_parts(parts: Vec<Component>) -> Multiaddr {
        let bytes = binary::encode_components(&parts);
        Multiaddr { bytes, parts }
    }

    /// Build an address from a component sequence, checking that a
    /// path-terminal component only appears in final position.
    pub fn from_components(parts: Vec<Component>) -> Result<Multiaddr> {
        if parts
            .iter()
            .rev()
            .skip(1)
            .any(|c| c.protocol().is_path())
        {
            return Err(ParseError::TrailingGarbage.into());
        }
        Ok(Multiaddr::from_parts(parts))
    }

    /// The canonical binary form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The canonical binary form as an owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterate over the components in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.parts.iter()
    }

    /// The component at `index`; negative indices count from the end.
    pub fn component(&self, index: isize) -> Result<&Component> {
        let len = self.parts.len() as isize;
        let i = if index < 0 { index + len } else { index };
        if i < 0 || i >= len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.parts.len(),
            });
        }
        Ok(&self.parts[i as usize])
    }

    /// A new address made of the `[start, end)` component slice. Indices are
    /// clamped; negative indices count from the end. An empty slice yields
    /// the empty multiaddr.
    pub fn slice(&self, range: Range<isize>) -> Multiaddr {
        let len = self.parts.len() as isize;
        let clamp = |i: isize| -> usize {
            let i = if i < 0 { i + len } else { i };
            i.max(0).min(len) as usize
        };
        let (start, end) = (clamp(range.start), clamp(range.end));
        if start >= end {
            return Multiaddr::empty();
        }
        Multiaddr::from_parts(self.parts[start..end].to_vec())
    }

    /// The ordered protocol descriptors of this address.
    pub fn protocols(&self) -> Vec<Arc<Protocol>> {
        self.parts.iter().map(Component::descriptor).collect()
    }

    /// Textual value of the first component using the protocol with `code`.
    /// Zero-size protocols yield an empty string when present.
    pub fn value_for_protocol(&self, code: u32) -> Option<String> {
        self.parts
            .iter()
            .find(|c| c.protocol().code() == code)
            .map(|c| c.value_text().unwrap_or_default())
    }

    /// Like [`Multiaddr::value_for_protocol`], but keyed by protocol name.
    pub fn value_for_protocol_name(&self, name: &str) -> Option<String> {
        self.parts
            .iter()
            .find(|c| c.protocol().name() == name)
            .map(|c| c.value_text().unwrap_or_default())
    }

    /// Append `other`'s components; the byte form of the result is exactly
    /// `bytes(self) || bytes(other)`.
    pub fn encapsulate(&self, other: &Multiaddr) -> Multiaddr {
        let mut bytes = self.bytes.clone();
        bytes.extend_from_slice(&other.bytes);
        let mut parts = self.parts.clone();
        parts.extend_from_slice(&other.parts);
        Multiaddr { bytes, parts }
    }

    /// Append a single component.
    pub fn with(mut self, comp: Component) -> Multiaddr {
        comp.write_bytes(&mut self.bytes);
        self.parts.push(comp);
        self
    }

    /// True when `suffix`'s component sequence is a contiguous suffix of
    /// this address's component sequence.
    pub fn ends_with(&self, suffix: &Multiaddr) -> bool {
        self.parts.ends_with(&suffix.parts)
    }

    /// Remove `suffix` if its component sequence terminates this address;
    /// an absent suffix is not an error, a copy is returned unchanged.
    pub fn decapsulate(&self, suffix: &Multiaddr) -> Multiaddr {
        if suffix.is_empty() || !self.ends_with(suffix) {
            return self.clone();
        }
        Multiaddr::from_parts(self.parts[..self.parts.len() - suffix.parts.len()].to_vec())
    }

    /// Remove the rightmost component whose protocol has `code`, and
    /// everything after it. A copy is returned when `code` is absent.
    pub fn decapsulate_code(&self, code: u32) -> Multiaddr {
        match self.parts.iter().rposition(|c| c.protocol().code() == code) {
            Some(i) => Multiaddr::from_parts(self.parts[..i].to_vec()),
            None => self.clone(),
        }
    }

    /// Interpret a leading `ip4`/`ip6` plus `tcp`/`udp` pair as a socket
    /// address.
    pub fn to_socketaddr(&self) -> Option<SocketAddr> {
        let mut iter = self.parts.iter();
        let ip_comp = iter.next()?;
        let port_comp = iter.next()?;
        let ip: IpAddr = match ip_comp.protocol().code() {
            registry::IP4 => {
                let octets: [u8; 4] = ip_comp.value().try_into().ok()?;
                Ipv4Addr::from(octets).into()
            }
            registry::IP6 => {
                let octets: [u8; 16] = ip_comp.value().try_into().ok()?;
                Ipv6Addr::from(octets).into()
            }
            _ => return None,
        };
        match port_comp.protocol().code() {
            registry::TCP | registry::UDP => {
                Some(SocketAddr::new(ip, BigEndian::read_u16(port_comp.value())))
            }
            _ => None,
        }
    }
}

impl FromStr for Multiaddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Multiaddr> {
        Registry::global().parse_text(s)
    }
}

impl TryFrom<&[u8]> for Multiaddr {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Multiaddr> {
        Registry::global().parse_bytes(bytes)
    }
}

impl TryFrom<Vec<u8>> for Multiaddr {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Multiaddr> {
        Registry::global().parse_bytes(&bytes)
    }
}

impl From<Component> for Multiaddr {
    fn from(comp: Component) -> Multiaddr {
        Multiaddr::from_parts(vec![comp])
    }
}

impl<'a> IntoIterator for &'a Multiaddr {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comp in &self.parts {
            write!(f, "{}", comp)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiaddr({})", self)
    }
}

impl PartialEq for Multiaddr {
    fn eq(&self, other: &Multiaddr) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Multiaddr {}

impl PartialOrd for Multiaddr {
    fn partial_cmp(&self, other: &Multiaddr) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Multiaddr {
    fn cmp(&self, other: &Multiaddr) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Multiaddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Multiaddr;
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::convert::TryFrom;
    use std::fmt;

    impl Serialize for Multiaddr {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.serialize_str(&self.to_string())
            } else {
                serializer.serialize_bytes(self.as_bytes())
            }
        }
    }

    impl<'de> Deserialize<'de> for Multiaddr {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Multiaddr, D::Error> {
            struct MaVisitor;

            impl<'de> Visitor<'de> for MaVisitor {
                type Value = Multiaddr;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a multiaddr in text or binary form")
                }

                fn visit_str<E: de::Error>(self, s: &str) -> Result<Multiaddr, E> {
                    s.parse().map_err(de::Error::custom)
                }

                fn visit_bytes<E: de::Error>(self, b: &[u8]) -> Result<Multiaddr, E> {
                    Multiaddr::try_from(b).map_err(de::Error::custom)
                }
            }

            if deserializer.is_human_readable() {
                deserializer.deserialize_str(MaVisitor)
            } else {
                deserializer.deserialize_bytes(MaVisitor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ma(s: &str) -> Multiaddr {
        s.parse().unwrap()
    }

    #[test]
    fn empty_address() {
        let empty = Multiaddr::empty();
        assert_eq!(empty.to_string(), "");
        assert_eq!(empty.as_bytes(), &[] as &[u8]);
        assert_eq!(ma(""), empty);
        assert_eq!(ma("/"), empty);
    }

    #[test]
    fn equality_is_on_bytes() {
        // two spellings of the same address
        let a = ma("/ip6/::1/tcp/1");
        let b = ma("/ip6/0:0:0:0:0:0:0:1/tcp/1");
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let hash = |m: &Multiaddr| {
            let mut h = DefaultHasher::new();
            m.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn indexing() {
        let addr = ma("/ip4/1.2.3.4/tcp/80/ws");
        assert_eq!(addr.component(0).unwrap().to_string(), "/ip4/1.2.3.4");
        assert_eq!(addr.component(-1).unwrap().to_string(), "/ws");
        assert_eq!(addr.component(-3).unwrap().to_string(), "/ip4/1.2.3.4");
        assert_eq!(
            addr.component(3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            addr.component(-4),
            Err(Error::IndexOutOfRange { index: -4, len: 3 })
        );
    }

    #[test]
    fn slicing() {
        let addr = ma("/ip4/1.2.3.4/tcp/80/ws/p2p-circuit");
        assert_eq!(addr.slice(1..3).to_string(), "/tcp/80/ws");
        assert_eq!(addr.slice(0..4), addr);
        assert_eq!(addr.slice(-2..4).to_string(), "/ws/p2p-circuit");
        assert_eq!(addr.slice(2..2), Multiaddr::empty());
        // clamped
        assert_eq!(addr.slice(2..100).to_string(), "/ws/p2p-circuit");
        assert_eq!(addr.slice(-100..1).to_string(), "/ip4/1.2.3.4");
    }

    #[test]
    fn encapsulate_is_byte_concatenation() {
        let a = ma("/ip4/1.2.3.4/tcp/80");
        let b = ma("/ws");
        let ab = a.encapsulate(&b);
        let mut expected = a.to_vec();
        expected.extend_from_slice(b.as_bytes());
        assert_eq!(ab.as_bytes(), &expected[..]);
        assert_eq!(ab.to_string(), "/ip4/1.2.3.4/tcp/80/ws");
    }

    #[test]
    fn decapsulate_removes_the_suffix() {
        let a = ma("/ip4/1.2.3.4/tcp/80");
        let b = ma("/ws");
        assert_eq!(a.encapsulate(&b).decapsulate(&b), a);
    }

    #[test]
    fn decapsulate_of_absent_suffix_is_a_copy() {
        let addr = ma("/ip4/8.8.8.8/tcp/80");
        assert_eq!(addr.decapsulate(&ma("/udp/53")), addr);
        // value mismatch is not a suffix either
        assert_eq!(addr.decapsulate(&ma("/tcp/81")), addr);
        // a prefix is not a suffix
        assert_eq!(addr.decapsulate(&ma("/ip4/8.8.8.8")), addr);
    }

    #[test]
    fn decapsulate_code_drops_from_the_rightmost_occurrence() {
        let addr = ma(
            "/ip4/1.2.3.4/tcp/80/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN/p2p-circuit",
        );
        assert_eq!(
            addr.decapsulate_code(registry::P2P).to_string(),
            "/ip4/1.2.3.4/tcp/80"
        );
        // absent code returns a copy
        assert_eq!(addr.decapsulate_code(registry::QUIC), addr);
    }

    #[test]
    fn value_for_protocol() {
        let addr = ma("/ip4/1.2.3.4/tcp/80/ws");
        assert_eq!(addr.value_for_protocol(registry::IP4).unwrap(), "1.2.3.4");
        assert_eq!(addr.value_for_protocol(registry::TCP).unwrap(), "80");
        // present zero-size protocol yields an empty value
        assert_eq!(addr.value_for_protocol(registry::WS).unwrap(), "");
        assert_eq!(addr.value_for_protocol(registry::UDP), None);
        assert_eq!(addr.value_for_protocol_name("tcp").unwrap(), "80");
        assert_eq!(addr.value_for_protocol_name("quic"), None);
    }

    #[test]
    fn first_occurrence_wins_across_encapsulation() {
        let a = ma("/ip4/1.1.1.1/tcp/1");
        let b = ma("/ip4/2.2.2.2/tcp/2");
        let ab = a.encapsulate(&b);
        assert_eq!(ab.value_for_protocol(registry::IP4).unwrap(), "1.1.1.1");
        assert_eq!(ab.value_for_protocol(registry::TCP).unwrap(), "1");
    }

    #[test]
    fn protocols_in_order() {
        let names: Vec<String> = ma("/ip4/1.2.3.4/udp/1/quic-v1")
            .protocols()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["ip4", "udp", "quic-v1"]);
    }

    #[test]
    fn from_components_checks_path_position() {
        let unix = Component::unix("/tmp/s").unwrap();
        let tcp = Component::tcp(80);
        assert!(Multiaddr::from_components(vec![tcp.clone(), unix.clone()]).is_ok());
        assert!(Multiaddr::from_components(vec![unix, tcp]).is_err());
    }

    #[test]
    fn to_socketaddr() {
        assert_eq!(
            ma("/ip4/127.0.0.1/tcp/8080").to_socketaddr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            ma("/ip6/::1/udp/53").to_socketaddr().unwrap(),
            "[::1]:53".parse::<SocketAddr>().unwrap()
        );
        assert!(ma("/dns/example.com/tcp/80").to_socketaddr().is_none());
        assert!(ma("/ip4/127.0.0.1").to_socketaddr().is_none());
    }

    #[test]
    fn iteration_is_restartable() {
        let addr = ma("/ip4/1.2.3.4/tcp/80");
        assert_eq!(addr.iter().count(), 2);
        assert_eq!(addr.iter().count(), 2);
        let via_for: Vec<String> = (&addr).into_iter().map(|c| c.to_string()).collect();
        assert_eq!(via_for, vec!["/ip4/1.2.3.4", "/tcp/80"]);
    }
}
