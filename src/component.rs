//! A single `(protocol, value)` pair of a multiaddr.

use crate::errors::{Error, ParseError, Result};
use crate::registry::{self, Protocol, Registry, Size};
use crate::varint;
use multihash::Multihash;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// A protocol descriptor together with the canonical binary form of its
/// value. Zero-size protocols carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    proto: Arc<Protocol>,
    value: Vec<u8>,
}

impl Component {
    /// Build a component from canonical value bytes, validating them against
    /// the protocol's codec.
    pub fn new(proto: Arc<Protocol>, value: Vec<u8>) -> Result<Self> {
        if proto.is_zero_size() && !value.is_empty() {
            return Err(ParseError::UnexpectedValue(proto.name().to_string()).into());
        }
        proto
            .codec()
            .validate(&value)
            .map_err(|kind| Error::codec(proto.name(), kind))?;
        Ok(Component { proto, value })
    }

    /// Build a component from the textual value form; `None` for zero-size
    /// protocols.
    pub fn from_text(proto: Arc<Protocol>, value: Option<&str>) -> Result<Self> {
        let value = match value {
            None if proto.is_zero_size() => Vec::new(),
            None => return Err(ParseError::MissingValue(proto.name().to_string()).into()),
            Some(_) if proto.is_zero_size() => {
                return Err(ParseError::UnexpectedValue(proto.name().to_string()).into())
            }
            Some(text) => proto
                .codec()
                .text_to_bytes(text)
                .map_err(|kind| Error::codec(proto.name(), kind))?,
        };
        Ok(Component { proto, value })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.proto
    }

    pub(crate) fn descriptor(&self) -> Arc<Protocol> {
        self.proto.clone()
    }

    /// Canonical binary form of the value; empty for zero-size protocols.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Textual value form; `None` for zero-size protocols.
    pub fn value_text(&self) -> Option<String> {
        if self.proto.is_zero_size() {
            return None;
        }
        let text = self
            .proto
            .codec()
            .bytes_to_text(&self.value)
            .expect("component value validated on construction");
        Some(text)
    }

    /// Append the component's wire form to `out`.
    pub(crate) fn write_bytes(&self, out: &mut Vec<u8>) {
        varint::write_u32(self.proto.code(), out);
        match self.proto.size() {
            Size::Fixed(_) => {}
            Size::Variable | Size::Path => varint::write_usize(self.value.len(), out),
        }
        out.extend_from_slice(&self.value);
    }

    fn global(code: u32) -> Arc<Protocol> {
        Registry::global()
            .by_code(code)
            .expect("canonical protocol table")
    }

    pub fn ip4(addr: Ipv4Addr) -> Component {
        Component {
            proto: Self::global(registry::IP4),
            value: addr.octets().to_vec(),
        }
    }

    pub fn ip6(addr: Ipv6Addr) -> Component {
        Component {
            proto: Self::global(registry::IP6),
            value: addr.octets().to_vec(),
        }
    }

    pub fn tcp(port: u16) -> Component {
        Component {
            proto: Self::global(registry::TCP),
            value: port.to_be_bytes().to_vec(),
        }
    }

    pub fn udp(port: u16) -> Component {
        Component {
            proto: Self::global(registry::UDP),
            value: port.to_be_bytes().to_vec(),
        }
    }

    pub fn dns(name: &str) -> Result<Component> {
        Component::from_text(Self::global(registry::DNS), Some(name))
    }

    pub fn dns4(name: &str) -> Result<Component> {
        Component::from_text(Self::global(registry::DNS4), Some(name))
    }

    pub fn dns6(name: &str) -> Result<Component> {
        Component::from_text(Self::global(registry::DNS6), Some(name))
    }

    pub fn dnsaddr(name: &str) -> Result<Component> {
        Component::from_text(Self::global(registry::DNSADDR), Some(name))
    }

    pub fn unix(path: &str) -> Result<Component> {
        Component::from_text(Self::global(registry::UNIX), Some(path))
    }

    pub fn p2p(peer_id: Multihash) -> Component {
        Component {
            proto: Self::global(registry::P2P),
            value: peer_id.into_bytes(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.proto.name())?;
        if let Some(value) = self.value_text() {
            if self.proto.is_path() {
                // path values render with their own leading slash
                f.write_str(&value)
            } else {
                write!(f, "/{}", value)
            }
        } else {
            Ok(())
        }
    }
}

impl From<Ipv4Addr> for Component {
    #[inline]
    fn from(addr: Ipv4Addr) -> Self {
        Component::ip4(addr)
    }
}

impl From<Ipv6Addr> for Component {
    #[inline]
    fn from(addr: Ipv6Addr) -> Self {
        Component::ip6(addr)
    }
}

impl From<IpAddr> for Component {
    #[inline]
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Component::ip4(addr),
            IpAddr::V6(addr) => Component::ip6(addr),
        }
    }
}
