//! Expansion of wildcard-bound addresses against local interfaces.
//!
//! Listening on `/ip4/0.0.0.0/tcp/4001` binds every interface; to advertise
//! the address it must be rewritten once per concrete interface address.
//! Interface enumeration is the caller's business, supplied through the
//! [`NetIfaceProvider`] capability.

use crate::component::Component;
use crate::registry;
use crate::Multiaddr;
use async_trait::async_trait;
use log::debug;
use std::io;
use std::net::IpAddr;

/// One address of one local network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfaceAddr {
    pub name: String,
    pub addr: IpAddr,
    pub up: bool,
    pub loopback: bool,
    pub multicast: bool,
}

/// Network-interface enumeration capability.
#[async_trait]
pub trait NetIfaceProvider: Send + Sync {
    async fn list(&self) -> io::Result<Vec<IfaceAddr>>;
}

/// Expand a wildcard-bound address into one address per up, non-loopback
/// unicast interface address of the matching family. A non-wildcard input
/// is returned as-is, alone.
pub async fn expand_wildcard<P: NetIfaceProvider>(
    addr: &Multiaddr,
    provider: &P,
) -> io::Result<Vec<Multiaddr>> {
    let family = match wildcard_family(addr) {
        Some(family) => family,
        None => return Ok(vec![addr.clone()]),
    };

    let rest = addr.slice(1..addr.len() as isize);
    let mut out = Vec::new();
    for iface in provider.list().await? {
        if !iface.up || iface.loopback || iface.addr.is_multicast() {
            continue;
        }
        let matches = match (family, iface.addr) {
            (Family::V4, IpAddr::V4(_)) | (Family::V6, IpAddr::V6(_)) => true,
            _ => false,
        };
        if !matches {
            continue;
        }
        debug!("expanding wildcard onto {} ({})", iface.addr, iface.name);
        out.push(Multiaddr::from(Component::from(iface.addr)).encapsulate(&rest));
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

/// `Some(family)` when the address starts with an unspecified IP component.
fn wildcard_family(addr: &Multiaddr) -> Option<Family> {
    let first = addr.iter().next()?;
    match first.protocol().code() {
        registry::IP4 if first.value() == [0, 0, 0, 0] => Some(Family::V4),
        registry::IP6 if first.value() == [0u8; 16] => Some(Family::V6),
        _ => None,
    }
}
