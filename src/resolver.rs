//! Expansion of name-based components into concrete addresses.
//!
//! The resolver never talks to the network itself; DNS queries go through
//! the [`NameResolver`] capability handed in by the caller. Resolution is
//! cooperative: independent expansion branches are queried concurrently and
//! joined, results keep input order (left-to-right components, then
//! left-to-right records), and duplicates are dropped by canonical byte
//! form.

use crate::component::Component;
use crate::errors::{DnsError, ResolverError};
use crate::registry;
use crate::Multiaddr;
use async_trait::async_trait;
use futures::future::{self, BoxFuture, Either, FutureExt};
use log::{debug, trace};
use std::collections::HashSet;
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Upper bound on `dnsaddr` chains; TXT records can reference further
/// `dnsaddr` names, so expansion must be cycle-proof.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// DNS lookup capability consumed by the resolver. Implementations may
/// suspend; they are queried only inside [`Resolver::resolve`] calls.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// A records for `name`.
    async fn query_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError>;
    /// AAAA records for `name`.
    async fn query_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, DnsError>;
    /// TXT records for `name`.
    async fn query_txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
}

/// Expands `dns`, `dns4`, `dns6` and `dnsaddr` components until an address
/// is fully numeric.
pub struct Resolver<R> {
    names: R,
    max_depth: usize,
}

impl<R: NameResolver> Resolver<R> {
    pub fn new(names: R) -> Self {
        Resolver {
            names,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve `addr` into zero or more fully numeric addresses.
    ///
    /// An address without resolvable components is yielded unchanged.
    /// Results are deduplicated by canonical byte form, first seen wins.
    pub async fn resolve(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>, ResolverError> {
        let results = self.resolve_at(addr.clone(), 0).await?;
        let mut seen = HashSet::new();
        Ok(results
            .into_iter()
            .filter(|a| seen.insert(a.to_vec()))
            .collect())
    }

    /// Like [`Resolver::resolve`], aborted with [`ResolverError::Cancelled`]
    /// when `cancel` completes first. No partial results are surfaced.
    pub async fn resolve_with_cancel<C>(
        &self,
        addr: &Multiaddr,
        cancel: C,
    ) -> Result<Vec<Multiaddr>, ResolverError>
    where
        C: Future<Output = ()> + Send,
    {
        let work = self.resolve(addr);
        futures::pin_mut!(work);
        futures::pin_mut!(cancel);
        match future::select(work, cancel).await {
            Either::Left((res, _)) => res,
            Either::Right(((), _)) => Err(ResolverError::Cancelled),
        }
    }

    fn resolve_at(
        &self,
        addr: Multiaddr,
        depth: usize,
    ) -> BoxFuture<'_, Result<Vec<Multiaddr>, ResolverError>> {
        async move {
            let found = addr
                .iter()
                .enumerate()
                .find(|(_, c)| c.protocol().is_resolvable())
                .map(|(i, c)| (i, c.protocol().code(), c.value_text()));
            let (pos, code, name) = match found {
                Some((i, code, Some(name))) => (i, code, name),
                // nothing to expand, or a resolvable protocol we have no
                // query shape for
                _ => return Ok(vec![addr]),
            };
            if depth >= self.max_depth {
                return Err(ResolverError::RecursionLimit);
            }

            let len = addr.len() as isize;
            let prefix = addr.slice(0..pos as isize);
            let suffix = addr.slice(pos as isize + 1..len);
            trace!("expanding `{}` at depth {}", name, depth);

            let candidates = match code {
                registry::DNS4 => {
                    let ips = self.names.query_a(&name).await.map_err(query_failed)?;
                    ips.into_iter()
                        .map(|ip| splice(&prefix, Component::ip4(ip), &suffix))
                        .collect()
                }
                registry::DNS6 => {
                    let ips = self.names.query_aaaa(&name).await.map_err(query_failed)?;
                    ips.into_iter()
                        .map(|ip| splice(&prefix, Component::ip6(ip), &suffix))
                        .collect()
                }
                registry::DNS => {
                    let (a, aaaa) =
                        future::join(self.names.query_a(&name), self.names.query_aaaa(&name)).await;
                    let comps = merge_families(a, aaaa)?;
                    comps
                        .into_iter()
                        .map(|c| splice(&prefix, c, &suffix))
                        .collect()
                }
                registry::DNSADDR => {
                    let fqdn = format!("_dnsaddr.{}", name);
                    let records = self.names.query_txt(&fqdn).await.map_err(query_failed)?;
                    expand_dnsaddr(records, &prefix, &suffix)
                }
                _ => return Ok(vec![addr]),
            };

            let branches =
                future::join_all(candidates.into_iter().map(|c| self.resolve_at(c, depth + 1)))
                    .await;
            let mut out = Vec::new();
            for branch in branches {
                out.extend(branch?);
            }
            Ok(out)
        }
        .boxed()
    }
}

/// `prefix || component || suffix`.
fn splice(prefix: &Multiaddr, comp: Component, suffix: &Multiaddr) -> Multiaddr {
    prefix.clone().with(comp).encapsulate(suffix)
}

/// Merge A and AAAA answers for a `dns` component. One failing family is
/// tolerated as long as the other answers; timeouts always surface.
fn merge_families(
    a: Result<Vec<Ipv4Addr>, DnsError>,
    aaaa: Result<Vec<Ipv6Addr>, DnsError>,
) -> Result<Vec<Component>, ResolverError> {
    if a == Err(DnsError::Timeout) || aaaa == Err(DnsError::Timeout) {
        return Err(ResolverError::ResolutionTimeout);
    }
    match (a, aaaa) {
        (Err(err), Err(_)) => Err(ResolverError::ResolutionFailed(err)),
        (a, aaaa) => {
            let mut comps = Vec::new();
            if let Ok(ips) = a {
                comps.extend(ips.into_iter().map(Component::ip4));
            }
            if let Ok(ips) = aaaa {
                comps.extend(ips.into_iter().map(Component::ip6));
            }
            Ok(comps)
        }
    }
}

/// Expand `dnsaddr` TXT records. A record is kept when the remainder of the
/// input after the `dnsaddr` component is empty or terminates the record's
/// component sequence; this is what preserves an input peer id. Broken
/// records are skipped, not fatal.
fn expand_dnsaddr(records: Vec<String>, prefix: &Multiaddr, suffix: &Multiaddr) -> Vec<Multiaddr> {
    let mut out = Vec::new();
    for record in records {
        let rest = match record.strip_prefix("dnsaddr=") {
            Some(rest) => rest,
            None => continue,
        };
        let parsed: Multiaddr = match rest.parse() {
            Ok(addr) => addr,
            Err(err) => {
                debug!("skipping malformed dnsaddr record `{}`: {}", rest, err);
                continue;
            }
        };
        if !suffix.is_empty() && !parsed.ends_with(suffix) {
            trace!("dnsaddr record {} does not match {}", parsed, suffix);
            continue;
        }
        // the record already carries the suffix when one was required
        out.push(prefix.encapsulate(&parsed));
    }
    out
}

fn query_failed(err: DnsError) -> ResolverError {
    match err {
        DnsError::Timeout => ResolverError::ResolutionTimeout,
        other => ResolverError::ResolutionFailed(other),
    }
}
