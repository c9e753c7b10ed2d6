//! # Key Wrapping Cache
//!
//! Wrapping a symmetric key under a host key and unwrapping it again are
//! full-size modular exponentiations. Encryption envelopes repeat both for
//! every message of a session, so the results are memoized here.
//!
//! ## Invariant
//!
//! Both caches are bounded LRUs. Entries are keyed by the fingerprint of the
//! host key involved, so a rotated key can be purged with
//! [`SymmetricKeyCache::invalidate`] instead of lingering until eviction.

use std::num::NonZeroUsize;

use idw_core::{BlockDigest, CryptoError, WireConfig};
use lru::LruCache;
use parking_lot::Mutex;

use crate::group::Element;
use crate::keys::{PrivateKey, PublicKey};
use crate::symmetric::{SymmetricKey, KEY_LENGTH};

type WrapKey = (BlockDigest, BlockDigest);
type UnwrapKey = (BlockDigest, Vec<u8>);

/// Memoizes symmetric key wraps and unwraps.
pub struct SymmetricKeyCache {
    wrapped: Mutex<LruCache<WrapKey, Element>>,
    unwrapped: Mutex<LruCache<UnwrapKey, SymmetricKey>>,
}

impl SymmetricKeyCache {
    /// A cache holding at most `capacity` entries in each direction.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            wrapped: Mutex::new(LruCache::new(capacity)),
            unwrapped: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// A cache sized by [`WireConfig::cache_capacity`].
    pub fn from_config(config: &WireConfig) -> Self {
        Self::new(NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN))
    }

    /// `key^e mod n` under `public`, memoized.
    pub fn wrap(&self, public: &PublicKey, key: &SymmetricKey) -> Result<Element, CryptoError> {
        let cache_key = (public.fingerprint(), BlockDigest::of(key.as_bytes()));
        if let Some(hit) = self.wrapped.lock().get(&cache_key) {
            tracing::debug!(fingerprint = %cache_key.0, "symmetric key wrap cache hit");
            return Ok(hit.clone());
        }
        let wrapped = public.wrap_key(key.as_bytes())?;
        self.wrapped.lock().put(cache_key, wrapped.clone());
        Ok(wrapped)
    }

    /// Recover a wrapped key with `private`, memoized.
    pub fn unwrap(&self, private: &PrivateKey, wrapped: &Element) -> Result<SymmetricKey, CryptoError> {
        let cache_key = (private.public_key().fingerprint(), wrapped.value().to_bytes_be());
        if let Some(hit) = self.unwrapped.lock().get(&cache_key) {
            tracing::debug!(fingerprint = %cache_key.0, "symmetric key unwrap cache hit");
            return Ok(hit.clone());
        }
        let bytes = private.unwrap_key(wrapped, KEY_LENGTH)?;
        let key = SymmetricKey::from_slice(&bytes)?;
        self.unwrapped.lock().put(cache_key, key.clone());
        Ok(key)
    }

    /// Drop every entry tied to the host key with `fingerprint`.
    pub fn invalidate(&self, fingerprint: &BlockDigest) {
        let mut wrapped = self.wrapped.lock();
        let stale: Vec<WrapKey> = wrapped
            .iter()
            .filter(|(key, _)| &key.0 == fingerprint)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            wrapped.pop(key);
        }
        drop(wrapped);

        let mut unwrapped = self.unwrapped.lock();
        let stale: Vec<UnwrapKey> = unwrapped
            .iter()
            .filter(|(key, _)| &key.0 == fingerprint)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            unwrapped.pop(key);
        }
        tracing::debug!(fingerprint = %fingerprint, "invalidated cached symmetric keys");
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.wrapped.lock().clear();
        self.unwrapped.lock().clear();
    }

    /// Number of cached entries in both directions.
    pub fn len(&self) -> usize {
        self.wrapped.lock().len() + self.unwrapped.lock().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SymmetricKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKeyCache")
            .field("entries", &self.len())
            .finish()
    }
}
