//! Hostname resolution cache shared by the network transports.
//!
//! [`ResolutionCache`] memoizes hostname to IP lookups for its whole
//! lifetime. There is no expiry and no negative caching: a failed lookup is
//! retried by the next caller, and a successful one is never refreshed. A
//! long-lived process therefore keeps using an address after its DNS record
//! changes.
//!
//! The cache is an explicit, injectable component. Build one per
//! [`Dispatcher`](super::Dispatcher) (or share one between several) and hand
//! it a [`HostResolver`]; tests use counting fakes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetcher_core::download::{ResolutionCache, SystemResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ResolutionCache::new(Arc::new(SystemResolver));
//! let first = cache.resolve("example.com").await?;
//! // Served from the cache, no lookup
//! let second = cache.resolve("example.com").await?;
//! assert_eq!(first, second);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, instrument};

use super::error::FetchError;

/// Performs the actual name lookups on cache misses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolves `host` to one or more addresses.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the name cannot be resolved.
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// A cached hostname to address mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    /// The hostname as looked up.
    pub hostname: String,
    /// The first address the resolver returned.
    pub address: IpAddr,
}

/// Concurrency-safe hostname to IP cache.
///
/// Concurrent misses for the same host may both hit the resolver; the last
/// writer wins, which is harmless since every stored answer was valid.
pub struct ResolutionCache {
    resolver: Arc<dyn HostResolver>,
    entries: DashMap<String, IpAddr>,
}

impl ResolutionCache {
    /// Creates an empty cache backed by `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            resolver,
            entries: DashMap::new(),
        }
    }

    /// Creates an empty cache backed by the system resolver.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }

    /// Resolves `host`, consulting the cache first.
    ///
    /// IP literals are returned as-is without touching the resolver or the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DnsFailed`] if the resolver fails or returns no
    /// addresses. Failures are not cached.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, host: &str) -> Result<IpAddr, FetchError> {
        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        let key = host.to_ascii_lowercase();
        // Copy out of the map so no shard lock is held across the lookup
        let cached = self.entries.get(&key).map(|entry| *entry.value());
        if let Some(ip) = cached {
            debug!(%ip, "resolution cache hit");
            return Ok(ip);
        }

        let addresses = self
            .resolver
            .lookup(&key)
            .await
            .map_err(|e| FetchError::dns_failed(&key, e))?;
        let ip = addresses.first().copied().ok_or_else(|| {
            FetchError::dns_failed(
                &key,
                io::Error::new(io::ErrorKind::NotFound, "resolver returned no addresses"),
            )
        })?;

        debug!(%ip, candidates = addresses.len(), "resolution cache miss, stored");
        self.entries.insert(key, ip);
        Ok(ip)
    }

    /// Returns the cached address for `host` without resolving.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<IpAddr> {
        self.entries
            .get(&host.to_ascii_lowercase())
            .map(|entry| *entry.value())
    }

    /// Returns true if `host` has a cached address.
    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.entries.contains_key(&host.to_ascii_lowercase())
    }

    /// Pre-seeds or overwrites the address for `host`.
    pub fn insert(&self, host: &str, address: IpAddr) {
        self.entries.insert(host.to_ascii_lowercase(), address);
    }

    /// Number of cached hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every cached entry, sorted by hostname.
    #[must_use]
    pub fn entries(&self) -> Vec<ResolvedHost> {
        let mut hosts: Vec<ResolvedHost> = self
            .entries
            .iter()
            .map(|entry| ResolvedHost {
                hostname: entry.key().clone(),
                address: *entry.value(),
            })
            .collect();
        hosts.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        hosts
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Strips IPv6 brackets and parses an IP literal.
fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()
}

/// Adapter that makes reqwest connect through the [`ResolutionCache`].
///
/// The transports resolve explicitly before sending, so by the time reqwest
/// asks, the answer is already cached. Ports are filled in by the connector
/// from the URL.
#[derive(Debug, Clone)]
pub(crate) struct CacheBackedResolve {
    cache: Arc<ResolutionCache>,
}

impl CacheBackedResolve {
    pub(crate) fn new(cache: Arc<ResolutionCache>) -> Self {
        Self { cache }
    }
}

impl Resolve for CacheBackedResolve {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = Arc::clone(&self.cache);
        Box::pin(async move {
            let ip = cache.resolve(name.as_str()).await?;
            let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
            Ok(addrs)
        })
    }
}
