//! Test fixtures: deterministic host keys from fixed primes, a signature
//! type over strings and test-only credential issuance.
//!
//! Compiled for this crate's unit tests and, through the `test-fixtures`
//! feature, for its integration tests.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use idw_block::string;
use idw_core::{syntax, ExponentBounds, Identifier, SemanticType, Timestamp};
use idw_crypto::{Exponent, KeyPair, KeyRing};
use num_bigint::BigUint;
use rand::rngs::OsRng;

use crate::content::Content;
use crate::credential::{Credential, CredentialSecrets, Exposure, Holder};
use crate::types;

const ISSUER_P: &[u8] = b"beb776df2bed59277a77d69d6fead2c9f201f8069874f601172664ad633e56e7f88eb9ecc676e621bba7ee03b576628bc728a2816ffcb1991d8666f7b40f25e3";
const ISSUER_Q: &[u8] = b"cafd555d7a8cfa328e9fcc3614ae20edd751d994b80ad3c5321c978d79f8825853c25dd8f74e5ca94324a067d25af18c687f064eb3f393792ba43f05ee96dfa1";
const HOST_P: &[u8] = b"d6cf521fac04f9173013822a3d9b34d4315dd114c1ecfbc8470bb94eaef80436161c0209402c984634b6220b5d5653e6ccefdbd0503bcee4eddbe4244e0c3187";
const HOST_Q: &[u8] = b"e352bc0883bd03bbe19897df6349cfc6e40c5638489891450361b63c8a676391378df7c9b273eea0e30a22048f991e69c4d1be075648d82be935abc0c3e01789";

fn pair(p: &[u8], q: &[u8]) -> KeyPair {
    KeyPair::from_primes(
        &BigUint::parse_bytes(p, 16).unwrap(),
        &BigUint::parse_bytes(q, 16).unwrap(),
        &mut OsRng,
    )
    .unwrap()
}

/// `example.org`.
pub fn host() -> Identifier {
    Identifier::new("example.org").unwrap()
}

/// `issuer.org`.
pub fn issuer() -> Identifier {
    Identifier::new("issuer.org").unwrap()
}

/// `alice@example.org`.
pub fn alice() -> Identifier {
    Identifier::new("alice@example.org").unwrap()
}

/// One millisecond after the Unix epoch; every fixture key is valid from here.
pub fn epoch() -> Timestamp {
    Timestamp::from_millis(1).unwrap()
}

/// `count` days.
pub fn days(count: u64) -> Duration {
    Duration::from_secs(count * 24 * 60 * 60)
}

/// `example.org` with a small key, for tests that do not lodge values.
pub fn small_ring() -> KeyRing {
    let ring = KeyRing::new();
    ring.insert(host(), epoch(), pair(b"f4243", b"f4261"));
    ring
}

/// The 1024-bit key pair of `issuer.org`.
pub fn issuer_pair() -> KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| pair(ISSUER_P, ISSUER_Q)).clone()
}

/// The 1024-bit key pair of `example.org`.
pub fn host_pair() -> KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| pair(HOST_P, HOST_Q)).clone()
}

/// `issuer.org` and `example.org` with 1024-bit keys.
pub fn ring() -> KeyRing {
    let ring = KeyRing::new();
    ring.insert(issuer(), epoch(), issuer_pair());
    ring.insert(host(), epoch(), host_pair());
    ring
}

/// A signature type over strings.
pub fn note() -> SemanticType {
    types::signature_of("note@example.org", syntax::string())
}

/// `text` signed about `alice@example.org`, created now.
pub fn note_content(text: &str) -> Content {
    Content::new(alice(), Timestamp::now(), string::encode(text))
}

/// The hidden values a credential is issued with.
pub struct Hidden {
    /// Client secret.
    pub u: Exponent,
    /// Subject value.
    pub v: Exponent,
    /// Credential identifier.
    pub i: Exponent,
}

impl Hidden {
    /// Fixed `u` and `v` with a random identifier.
    pub fn new(u: Exponent, v: Exponent) -> Self {
        let bounds = ExponentBounds::default();
        Self {
            u,
            v,
            i: Exponent::random(bounds.hash_bits, &mut OsRng),
        }
    }

    /// Random `u` and identifier for the subject value `v`.
    pub fn random(v: Exponent) -> Self {
        let bounds = ExponentBounds::default();
        Self::new(Exponent::random(bounds.hash_bits, &mut OsRng), v)
    }

    /// The same `u` and `v` under another identifier.
    pub fn with_identifier(&self, i: Exponent) -> Self {
        Self {
            u: self.u.clone(),
            v: self.v.clone(),
            i,
        }
    }
}

/// Issue a credential the way an issuer would: pick `e` invertible modulo
/// `φ(n)` and take the `e`-th root of
/// `ao^o · ab^−b · au^−u · ai^−i · av^−v`.
pub fn issue(pair: &KeyPair, exposure: Exposure, hidden: &Hidden, holder: Holder) -> Credential {
    let bounds = ExponentBounds::default();
    let public = pair.public_key();
    let b = Exponent::random(bounds.blinding_exponent_bits, &mut OsRng);
    let base = public
        .ao()
        .pow(&exposure.exponent().unwrap())
        .unwrap()
        .multiply(&public.ab().pow(&-&b).unwrap())
        .unwrap()
        .multiply(&public.au().pow(&-&hidden.u).unwrap())
        .unwrap()
        .multiply(&public.ai().pow(&-&hidden.i).unwrap())
        .unwrap()
        .multiply(&public.av().pow(&-&hidden.v).unwrap())
        .unwrap();
    let (e, root) = loop {
        let half = Exponent::random(bounds.credential_exponent_bits - 1, &mut OsRng);
        let e = &(&half * &Exponent::from_u64(2)) + &Exponent::one();
        if let Ok(root) = pair.private_key().invert(&e) {
            break (e, root);
        }
    };
    let secrets = CredentialSecrets {
        c: base.pow(&root).unwrap(),
        e,
        b,
        u: hidden.u.clone(),
        i: hidden.i.clone(),
        v: hidden.v.clone(),
    };
    Credential::new(exposure, Arc::clone(public), holder, secrets).unwrap()
}
