//! # Host Keys
//!
//! A host key lives in two groups built from the same primes `p` and `q`:
//!
//! - the **composite group** modulo `n = p·q`, with the RSA-style exponent
//!   pair `(e, d)` used for host signatures and symmetric key wrapping, and
//!   the generators `ab, au, ai, av, ao` used by client commitments and the
//!   credentials show protocol;
//! - the **square group** modulo `n²`, with generator `g`, secret `x` and
//!   `y = g^x`, used to verifiably encrypt hidden credential values so the
//!   host can later recover them.
//!
//! ## Security Invariant
//!
//! - [`PrivateKey`] never implements `Serialize` and its `Debug` output only
//!   names the modulus size.
//! - Key generation (prime search) is external. [`KeyPair::from_primes`]
//!   builds a key from primes supplied by the caller and rejects primes for
//!   which `e` has no inverse.
//!
//! ## Key Lookup
//!
//! Keys rotate. [`PublicKeyLookup`] and [`PrivateKeyLookup`] return the key
//! that was active for a host at a given time; [`KeyRing`] is the in-memory
//! implementation keyed by validity start time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use idw_core::{BlockDigest, CryptoError, Identifier, Timestamp};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{CheckedSub, One};
use parking_lot::RwLock;
use rand::{CryptoRng, RngCore};

use crate::exponent::Exponent;
use crate::group::{Element, Group};

/// The public exponent of every host key.
pub const PUBLIC_EXPONENT: u64 = 65_537;

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// The public half of a host key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    composite: Group,
    e: Exponent,
    ab: Element,
    au: Element,
    ai: Element,
    av: Element,
    ao: Element,
    square: Group,
    g: Element,
    y: Element,
    z_plus_1: Element,
}

impl PublicKey {
    /// The composite group modulo `n`.
    pub fn composite_group(&self) -> &Group {
        &self.composite
    }

    /// The square group modulo `n²`.
    pub fn square_group(&self) -> &Group {
        &self.square
    }

    /// The public exponent `e`.
    pub fn e(&self) -> &Exponent {
        &self.e
    }

    /// Generator for blinding factors.
    pub fn ab(&self) -> &Element {
        &self.ab
    }

    /// Generator for the client secret.
    pub fn au(&self) -> &Element {
        &self.au
    }

    /// Generator for the one-time exponent.
    pub fn ai(&self) -> &Element {
        &self.ai
    }

    /// Generator for the identity value.
    pub fn av(&self) -> &Element {
        &self.av
    }

    /// Generator for the exposed credential attributes.
    pub fn ao(&self) -> &Element {
        &self.ao
    }

    /// Generator of the square group.
    pub fn g(&self) -> &Element {
        &self.g
    }

    /// `g^x` in the square group.
    pub fn y(&self) -> &Element {
        &self.y
    }

    /// `n + 1` in the square group, whose powers encode plaintexts.
    pub fn z_plus_1(&self) -> &Element {
        &self.z_plus_1
    }

    /// A stable fingerprint of `n` and `e`, used to key memo caches.
    pub fn fingerprint(&self) -> BlockDigest {
        let n = self.composite.modulus().to_bytes_be();
        let e = self.e.to_signed_bytes_be();
        BlockDigest::of_parts([n.as_slice(), e.as_slice()])
    }

    /// Map a content digest into the composite group.
    pub fn hash_element(&self, digest: &BlockDigest) -> Element {
        self.composite.element_from_digest(digest)
    }

    /// Check an RSA-style host signature value against a content digest.
    pub fn verify_digest(&self, digest: &BlockDigest, value: &Element) -> Result<bool, CryptoError> {
        Ok(value.pow(&self.e)? == self.hash_element(digest))
    }

    /// Wrap a symmetric key as `key^e mod n`.
    pub fn wrap_key(&self, key: &[u8]) -> Result<Element, CryptoError> {
        let plain = self.composite.element(BigUint::from_bytes_be(key))?;
        plain.pow(&self.e)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PublicKey({} bits, {})",
            self.composite.bits(),
            &self.fingerprint().to_hex()[..16]
        )
    }
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// The private half of a host key.
///
/// Does not implement `Serialize`.
pub struct PrivateKey {
    public: Arc<PublicKey>,
    phi: BigUint,
    d: Exponent,
    x: Exponent,
}

impl PrivateKey {
    /// The matching public key.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public
    }

    /// Sign a content digest: `h^d mod n`.
    pub fn sign_digest(&self, digest: &BlockDigest) -> Result<Element, CryptoError> {
        self.public.hash_element(digest).pow(&self.d)
    }

    /// Unwrap a symmetric key wrapped with [`PublicKey::wrap_key`], left-padded
    /// to `length` bytes.
    pub fn unwrap_key(&self, wrapped: &Element, length: usize) -> Result<Vec<u8>, CryptoError> {
        let plain = wrapped.pow(&self.d)?.value().to_bytes_be();
        if plain.len() > length {
            return Err(CryptoError::InvalidKey(format!(
                "unwrapped key has {} bytes, expected at most {length}",
                plain.len()
            )));
        }
        let mut out = vec![0u8; length - plain.len()];
        out.extend_from_slice(&plain);
        Ok(out)
    }

    /// The inverse of `exponent` modulo `φ(n)`, as needed by credential issuers
    /// to take `e`-th roots.
    pub fn invert(&self, exponent: &Exponent) -> Result<Exponent, CryptoError> {
        let phi = BigInt::from(self.phi.clone());
        let reduced = exponent.as_bigint().mod_floor(&phi);
        let unsigned = reduced
            .to_biguint()
            .ok_or_else(|| CryptoError::NotInvertible("negative residue".into()))?;
        unsigned
            .modinv(&self.phi)
            .map(Exponent::from_biguint)
            .ok_or_else(|| CryptoError::NotInvertible(format!("{} bit exponent", exponent.bits())))
    }

    /// Recover the plaintext of a verifiable encryption `(W1, W2)`:
    /// `m = (W1 · W2^(−x) mod n² − 1) / n`.
    pub fn decrypt_lodged(&self, w1: &Element, w2: &Element) -> Result<Exponent, CryptoError> {
        let shared = w2.pow(&-&self.x)?;
        let encoded = w1.multiply(&shared)?;
        let n = self.public.composite.modulus();
        let shifted = encoded
            .value()
            .checked_sub(&BigUint::one())
            .ok_or_else(|| CryptoError::NotAnElement("lodged value decrypts to zero".into()))?;
        let (m, remainder) = shifted.div_rem(n);
        if remainder != BigUint::default() {
            return Err(CryptoError::NotAnElement(
                "lodged value does not decrypt to a power of n + 1".into(),
            ));
        }
        Ok(Exponent::from_biguint(m))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({} bits, <redacted>)", self.public.composite.bits())
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// A host key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: Arc<PublicKey>,
    private: Arc<PrivateKey>,
}

impl KeyPair {
    /// Build a key pair from two distinct odd primes. The generators are random
    /// squares drawn from `rng`.
    pub fn from_primes<R: RngCore + CryptoRng + ?Sized>(
        p: &BigUint,
        q: &BigUint,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        if p == q {
            return Err(CryptoError::InvalidKey("primes must be distinct".into()));
        }
        let one = BigUint::one();
        if p <= &one || q <= &one {
            return Err(CryptoError::InvalidKey("primes must exceed one".into()));
        }
        let n = p * q;
        let phi = (p - &one) * (q - &one);
        let e = BigUint::from(PUBLIC_EXPONENT);
        let d = e
            .modinv(&phi)
            .ok_or_else(|| CryptoError::InvalidKey("public exponent is not coprime to φ(n)".into()))?;

        let composite = Group::new(n.clone())?;
        let square = Group::new(&n * &n)?;
        let g = square.random_square(rng);
        let x = Exponent::random(square.bits().saturating_sub(2), rng);
        let y = g.pow(&x)?;
        let z_plus_1 = square.element(&n + &one)?;

        let public = Arc::new(PublicKey {
            e: Exponent::from_biguint(e),
            ab: composite.random_square(rng),
            au: composite.random_square(rng),
            ai: composite.random_square(rng),
            av: composite.random_square(rng),
            ao: composite.random_square(rng),
            composite,
            square,
            g,
            y,
            z_plus_1,
        });
        let private = Arc::new(PrivateKey {
            public: Arc::clone(&public),
            phi,
            d: Exponent::from_biguint(d),
            x,
        });
        Ok(Self { public, private })
    }

    /// The public key.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public
    }

    /// The private key.
    pub fn private_key(&self) -> &Arc<PrivateKey> {
        &self.private
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolves the public key a host used at a given time.
pub trait PublicKeyLookup: Send + Sync {
    /// The key valid for `host` at `time`.
    fn public_key(&self, host: &Identifier, time: Timestamp) -> Result<Arc<PublicKey>, CryptoError>;
}

/// Resolves the private key of a locally operated host at a given time.
pub trait PrivateKeyLookup: Send + Sync {
    /// The key valid for `host` at `time`.
    fn private_key(&self, host: &Identifier, time: Timestamp) -> Result<Arc<PrivateKey>, CryptoError>;
}

/// In-memory key chains: for each host, key pairs ordered by the time from
/// which they are valid. A key stays valid until the next one starts.
#[derive(Debug, Default)]
pub struct KeyRing {
    chains: RwLock<HashMap<Identifier, BTreeMap<Timestamp, KeyPair>>>,
}

impl KeyRing {
    /// An empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key pair for `host`, valid from `valid_from`.
    pub fn insert(&self, host: Identifier, valid_from: Timestamp, pair: KeyPair) {
        tracing::debug!(host = %host, valid_from = %valid_from, "registered host key");
        self.chains
            .write()
            .entry(host)
            .or_default()
            .insert(valid_from, pair);
    }

    /// The key pair valid for `host` at `time`.
    pub fn key_pair(&self, host: &Identifier, time: Timestamp) -> Result<KeyPair, CryptoError> {
        let chains = self.chains.read();
        chains
            .get(host)
            .and_then(|chain| chain.range(..=time).next_back())
            .map(|(_, pair)| pair.clone())
            .ok_or_else(|| CryptoError::KeyNotFound {
                host: host.to_string(),
                time: time.as_millis(),
            })
    }
}

impl PublicKeyLookup for KeyRing {
    fn public_key(&self, host: &Identifier, time: Timestamp) -> Result<Arc<PublicKey>, CryptoError> {
        self.key_pair(host, time).map(|pair| Arc::clone(pair.public_key()))
    }
}

impl PrivateKeyLookup for KeyRing {
    fn private_key(&self, host: &Identifier, time: Timestamp) -> Result<Arc<PrivateKey>, CryptoError> {
        self.key_pair(host, time).map(|pair| Arc::clone(pair.private_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    // Small primes keep the unit tests fast; the integration tests use
    // 512-bit primes.
    fn small_pair() -> KeyPair {
        let p = BigUint::from(1_000_003u32);
        let q = BigUint::from(1_000_033u32);
        KeyPair::from_primes(&p, &q, &mut OsRng).unwrap()
    }

    #[test]
    fn test_rejects_equal_primes() {
        let p = BigUint::from(1_000_003u32);
        assert!(matches!(
            KeyPair::from_primes(&p, &p, &mut OsRng),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_sign_and_verify_digest() {
        let pair = small_pair();
        let digest = BlockDigest::of(b"content");
        let value = pair.private_key().sign_digest(&digest).unwrap();
        assert!(pair.public_key().verify_digest(&digest, &value).unwrap());
        let other = BlockDigest::of(b"other");
        assert!(!pair.public_key().verify_digest(&other, &value).unwrap());
    }

    #[test]
    fn test_wrap_unwrap_pads_leading_zeros() {
        let pair = small_pair();
        let key = [0u8, 0, 1, 2];
        let wrapped = pair.public_key().wrap_key(&key).unwrap();
        let unwrapped = pair.private_key().unwrap_key(&wrapped, key.len()).unwrap();
        assert_eq!(unwrapped, key);
    }

    #[test]
    fn test_invert_handles_negative_exponent() {
        let pair = small_pair();
        let e = Exponent::new(BigInt::from(-7));
        let inverse = pair.private_key().invert(&e).unwrap();
        let x = pair.public_key().au().clone();
        // (x^(-7))^(inverse) == x
        assert_eq!(x.pow(&e).unwrap().pow(&inverse).unwrap(), x);
    }

    #[test]
    fn test_decrypt_lodged_recovers_plaintext() {
        let pair = small_pair();
        let public = pair.public_key();
        let m = Exponent::from_u64(123_456);
        let r = Exponent::random(64, &mut OsRng);
        let w1 = public
            .y()
            .pow(&r)
            .unwrap()
            .multiply(&public.z_plus_1().pow(&m).unwrap())
            .unwrap();
        let w2 = public.g().pow(&r).unwrap();
        assert_eq!(pair.private_key().decrypt_lodged(&w1, &w2).unwrap(), m);
    }

    #[test]
    fn test_key_ring_selects_by_validity_start() {
        let ring = KeyRing::new();
        let host = Identifier::new("example.org").unwrap();
        let first = small_pair();
        let second = small_pair();
        let t1 = Timestamp::from_millis(1_000).unwrap();
        let t2 = Timestamp::from_millis(2_000).unwrap();
        ring.insert(host.clone(), t1, first.clone());
        ring.insert(host.clone(), t2, second.clone());

        let at = |millis| ring.public_key(&host, Timestamp::from_millis(millis).unwrap());
        assert_eq!(*at(1_500).unwrap(), **first.public_key());
        assert_eq!(*at(2_000).unwrap(), **second.public_key());
        assert!(matches!(at(999), Err(CryptoError::KeyNotFound { time: 999, .. })));
        let unknown = Identifier::new("unknown.org").unwrap();
        assert!(ring.private_key(&unknown, t2).is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = small_pair();
        let debug = format!("{:?}", pair.private_key());
        assert!(debug.contains("redacted"));
    }
}
