//! The protocol registry: the canonical table of known protocols and the
//! layering mechanism for user-defined ones.
//!
//! The process-wide default registry is initialized once, on first use, and
//! is immutable afterwards. User extension never mutates it; a private
//! [`Registry`] layered over the default is constructed instead and passed
//! explicitly to the parse operations that should see the extra protocols.

use crate::binary;
use crate::codec::Codec;
use crate::errors::{Error, RegistryError};
use crate::text;
use crate::Multiaddr;
use lazy_static::lazy_static;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const IP4: u32 = 4;
pub const TCP: u32 = 6;
pub const DCCP: u32 = 33;
pub const IP6: u32 = 41;
pub const IP6ZONE: u32 = 42;
pub const IPCIDR: u32 = 43;
pub const DNS: u32 = 53;
pub const DNS4: u32 = 54;
pub const DNS6: u32 = 55;
pub const DNSADDR: u32 = 56;
pub const SCTP: u32 = 132;
pub const UDP: u32 = 273;
pub const P2P_WEBRTC_STAR: u32 = 275;
pub const P2P_WEBRTC_DIRECT: u32 = 276;
pub const P2P_STARDUST: u32 = 277;
pub const P2P_CIRCUIT: u32 = 290;
pub const UDT: u32 = 301;
pub const UTP: u32 = 302;
pub const UNIX: u32 = 400;
pub const P2P: u32 = 421;
pub const HTTPS: u32 = 443;
pub const ONION: u32 = 444;
pub const ONION3: u32 = 445;
pub const GARLIC64: u32 = 446;
pub const GARLIC32: u32 = 447;
pub const TLS: u32 = 448;
pub const SNI: u32 = 449;
pub const NOISE: u32 = 454;
pub const QUIC: u32 = 460;
pub const QUIC_V1: u32 = 461;
pub const WEBTRANSPORT: u32 = 465;
pub const CERTHASH: u32 = 466;
pub const WS: u32 = 477;
pub const WSS: u32 = 478;
pub const P2P_WEBSOCKET_STAR: u32 = 479;
pub const HTTP: u32 = 480;

/// Size class of a protocol's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    /// Fixed bit width; `Fixed(0)` means the protocol carries no value.
    Fixed(u32),
    /// Varint length prefix followed by that many bytes.
    Variable,
    /// Length-prefixed like [`Size::Variable`], but the value is a path that
    /// consumes the remainder of the address in both forms.
    Path,
}

/// An immutable protocol descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    code: u32,
    name: Cow<'static, str>,
    size: Size,
    codec: Codec,
    resolvable: bool,
}

impl Protocol {
    pub fn new(code: u32, name: impl Into<Cow<'static, str>>, size: Size, codec: Codec) -> Self {
        Protocol {
            code,
            name: name.into(),
            size,
            codec,
            resolvable: false,
        }
    }

    /// Mark the protocol as expandable by the resolver.
    pub fn resolvable(mut self) -> Self {
        self.resolvable = true;
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn is_resolvable(&self) -> bool {
        self.resolvable
    }

    /// True for path-terminal protocols whose text value embeds slashes.
    pub fn is_path(&self) -> bool {
        self.size == Size::Path
    }

    /// True when the protocol carries no value bytes at all.
    pub fn is_zero_size(&self) -> bool {
        self.size == Size::Fixed(0)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A keyed mapping of protocols by code and by name.
pub struct Registry {
    by_code: HashMap<u32, Arc<Protocol>>,
    by_name: HashMap<String, Arc<Protocol>>,
    parent: Option<&'static Registry>,
}

lazy_static! {
    static ref GLOBAL: Registry = Registry::with_defaults();
}

impl Registry {
    /// The process-wide default registry holding the canonical protocol set.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// An empty private registry layered over the default one: lookups fall
    /// back to the canonical set, registrations stay private.
    pub fn extension() -> Registry {
        Registry {
            by_code: HashMap::new(),
            by_name: HashMap::new(),
            parent: Some(Registry::global()),
        }
    }

    fn with_defaults() -> Registry {
        let mut reg = Registry {
            by_code: HashMap::new(),
            by_name: HashMap::new(),
            parent: None,
        };
        for proto in defaults() {
            reg.register(proto)
                .expect("canonical protocol table is duplicate-free");
        }
        // deprecated alias, accepted on input and never emitted
        reg.alias("ipfs", P2P)
            .expect("canonical protocol table contains p2p");
        reg
    }

    /// Register a protocol. Fails if the code or name is already taken,
    /// here or in the layered-over registry.
    pub fn register(&mut self, proto: Protocol) -> Result<(), RegistryError> {
        check_name(proto.name())?;
        if self.lookup_code(proto.code()).is_some() {
            return Err(RegistryError::Duplicate(proto.name().to_string()));
        }
        if self.lookup_name(proto.name()).is_some() {
            return Err(RegistryError::Duplicate(proto.name().to_string()));
        }
        let proto = Arc::new(proto);
        self.by_code.insert(proto.code(), proto.clone());
        self.by_name.insert(proto.name().to_string(), proto);
        Ok(())
    }

    /// Register an additional name for an existing protocol.
    pub fn alias(&mut self, alias: &str, code: u32) -> Result<(), RegistryError> {
        check_name(alias)?;
        if self.lookup_name(alias).is_some() {
            return Err(RegistryError::Duplicate(alias.to_string()));
        }
        let proto = self.by_code(code)?;
        self.by_name.insert(alias.to_string(), proto);
        Ok(())
    }

    pub fn by_code(&self, code: u32) -> Result<Arc<Protocol>, RegistryError> {
        self.lookup_code(code)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Result<Arc<Protocol>, RegistryError> {
        self.lookup_name(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub(crate) fn lookup_code(&self, code: u32) -> Option<&Arc<Protocol>> {
        self.by_code
            .get(&code)
            .or_else(|| self.parent.and_then(|p| p.lookup_code(code)))
    }

    pub(crate) fn lookup_name(&self, name: &str) -> Option<&Arc<Protocol>> {
        self.by_name
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup_name(name)))
    }

    /// Parse the text form of a multiaddr against this registry.
    pub fn parse_text(&self, s: &str) -> Result<Multiaddr, Error> {
        let parts = text::parse_components(self, s)?;
        Ok(Multiaddr::from_parts(parts))
    }

    /// Parse the binary form of a multiaddr against this registry.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Multiaddr, Error> {
        let parts = binary::decode_components(self, bytes)?;
        Ok(Multiaddr::from_parts(parts))
    }
}

fn check_name(name: &str) -> Result<(), RegistryError> {
    let ok = !name.is_empty()
        && name.is_ascii()
        && !name.contains('/');
    if !ok {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn defaults() -> Vec<Protocol> {
    vec![
        Protocol::new(IP4, "ip4", Size::Fixed(32), Codec::Ip4),
        Protocol::new(TCP, "tcp", Size::Fixed(16), Codec::Port),
        Protocol::new(DCCP, "dccp", Size::Fixed(16), Codec::Port),
        Protocol::new(IP6, "ip6", Size::Fixed(128), Codec::Ip6),
        Protocol::new(IP6ZONE, "ip6zone", Size::Variable, Codec::Domain),
        Protocol::new(IPCIDR, "ipcidr", Size::Fixed(8), Codec::Cidr),
        Protocol::new(DNS, "dns", Size::Variable, Codec::Domain).resolvable(),
        Protocol::new(DNS4, "dns4", Size::Variable, Codec::Domain).resolvable(),
        Protocol::new(DNS6, "dns6", Size::Variable, Codec::Domain).resolvable(),
        Protocol::new(DNSADDR, "dnsaddr", Size::Variable, Codec::Domain).resolvable(),
        Protocol::new(SCTP, "sctp", Size::Fixed(16), Codec::Port),
        Protocol::new(UDP, "udp", Size::Fixed(16), Codec::Port),
        Protocol::new(P2P_WEBRTC_STAR, "p2p-webrtc-star", Size::Fixed(0), Codec::NoValue),
        Protocol::new(P2P_WEBRTC_DIRECT, "p2p-webrtc-direct", Size::Fixed(0), Codec::NoValue),
        Protocol::new(P2P_STARDUST, "p2p-stardust", Size::Fixed(0), Codec::NoValue),
        Protocol::new(P2P_CIRCUIT, "p2p-circuit", Size::Fixed(0), Codec::NoValue),
        Protocol::new(UDT, "udt", Size::Fixed(0), Codec::NoValue),
        Protocol::new(UTP, "utp", Size::Fixed(0), Codec::NoValue),
        Protocol::new(UNIX, "unix", Size::Path, Codec::Path),
        Protocol::new(P2P, "p2p", Size::Variable, Codec::P2p),
        Protocol::new(HTTPS, "https", Size::Fixed(0), Codec::NoValue),
        Protocol::new(ONION, "onion", Size::Fixed(96), Codec::Onion),
        Protocol::new(ONION3, "onion3", Size::Fixed(296), Codec::Onion3),
        Protocol::new(GARLIC64, "garlic64", Size::Variable, Codec::Garlic64),
        Protocol::new(GARLIC32, "garlic32", Size::Variable, Codec::Garlic32),
        Protocol::new(TLS, "tls", Size::Fixed(0), Codec::NoValue),
        Protocol::new(SNI, "sni", Size::Variable, Codec::Domain),
        Protocol::new(NOISE, "noise", Size::Fixed(0), Codec::NoValue),
        Protocol::new(QUIC, "quic", Size::Fixed(0), Codec::NoValue),
        Protocol::new(QUIC_V1, "quic-v1", Size::Fixed(0), Codec::NoValue),
        Protocol::new(WEBTRANSPORT, "webtransport", Size::Fixed(0), Codec::NoValue),
        Protocol::new(CERTHASH, "certhash", Size::Variable, Codec::Certhash),
        Protocol::new(WS, "ws", Size::Fixed(0), Codec::NoValue),
        Protocol::new(WSS, "wss", Size::Fixed(0), Codec::NoValue),
        Protocol::new(P2P_WEBSOCKET_STAR, "p2p-websocket-star", Size::Fixed(0), Codec::NoValue),
        Protocol::new(HTTP, "http", Size::Fixed(0), Codec::NoValue),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_lookups() {
        let reg = Registry::global();
        assert_eq!(reg.by_code(IP4).unwrap().name(), "ip4");
        assert_eq!(reg.by_name("quic-v1").unwrap().code(), QUIC_V1);
        assert!(reg.by_code(9999).is_err());
        assert!(reg.by_name("smtp").is_err());
    }

    #[test]
    fn ipfs_is_an_alias_for_p2p() {
        let reg = Registry::global();
        let p2p = reg.by_name("p2p").unwrap();
        let ipfs = reg.by_name("ipfs").unwrap();
        assert_eq!(ipfs.code(), p2p.code());
        assert_eq!(ipfs.name(), "p2p");
    }

    #[test]
    fn resolvable_flags() {
        let reg = Registry::global();
        for name in &["dns", "dns4", "dns6", "dnsaddr"] {
            assert!(reg.by_name(name).unwrap().is_resolvable());
        }
        assert!(!reg.by_name("ip4").unwrap().is_resolvable());
    }

    #[test]
    fn extension_layers_over_global() {
        let mut reg = Registry::extension();
        reg.register(Protocol::new(7777, "carrier-pigeon", Size::Fixed(0), Codec::NoValue))
            .unwrap();
        // sees its own protocol and the canonical ones
        assert_eq!(reg.by_name("carrier-pigeon").unwrap().code(), 7777);
        assert_eq!(reg.by_name("tcp").unwrap().code(), TCP);
        // the global registry is untouched
        assert!(Registry::global().by_name("carrier-pigeon").is_err());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut reg = Registry::extension();
        assert_eq!(
            reg.register(Protocol::new(TCP, "tcp2", Size::Fixed(16), Codec::Port)),
            Err(RegistryError::Duplicate("tcp2".to_string()))
        );
        assert_eq!(
            reg.register(Protocol::new(7778, "tcp", Size::Fixed(16), Codec::Port)),
            Err(RegistryError::Duplicate("tcp".to_string()))
        );
        reg.register(Protocol::new(7778, "tcp-ng", Size::Fixed(16), Codec::Port))
            .unwrap();
        assert_eq!(
            reg.register(Protocol::new(7778, "tcp-ng2", Size::Fixed(16), Codec::Port)),
            Err(RegistryError::Duplicate("tcp-ng2".to_string()))
        );
    }

    #[test]
    fn invalid_names_rejected() {
        let mut reg = Registry::extension();
        for bad in &["", "has/slash", "ünïcode"] {
            assert!(matches!(
                reg.register(Protocol::new(8000, *bad, Size::Fixed(0), Codec::NoValue)),
                Err(RegistryError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn parse_with_extension_registry() {
        let mut reg = Registry::extension();
        reg.register(Protocol::new(7779, "pigeon", Size::Fixed(16), Codec::Port))
            .unwrap();
        let addr = reg.parse_text("/ip4/10.0.0.1/pigeon/42").unwrap();
        assert_eq!(addr.to_string(), "/ip4/10.0.0.1/pigeon/42");
        // the default registry does not see it
        assert!("/ip4/10.0.0.1/pigeon/42".parse::<Multiaddr>().is_err());
        // but the binary form parses back under the extension
        let again = reg.parse_bytes(addr.as_bytes()).unwrap();
        assert_eq!(again, addr);
    }
}
