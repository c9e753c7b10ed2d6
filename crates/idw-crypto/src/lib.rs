#![deny(missing_docs)]

//! # idw-crypto — Group Arithmetic and Host Keys
//!
//! Provides the cryptographic building blocks the signature schemes consume
//! through a narrow interface:
//!
//! - **Groups and elements** modulo a composite `n` or `n²`, exponentiated by
//!   signed [`Exponent`]s (negative exponents invert first).
//! - **Host keys** built from supplied primes: RSA-style `(e, d)`, the
//!   credential generators `ab, au, ai, av, ao`, and a square-group key for
//!   verifiable encryption. Lookup by host and time through
//!   [`PublicKeyLookup`] / [`PrivateKeyLookup`].
//! - **Symmetric keys** (AES-256-GCM) for the encryption envelope, plus a
//!   bounded [`SymmetricKeyCache`] for key wraps.
//! - **Verifiable encryption** of hidden credential values for lodging.
//!
//! ## Crate Policy
//!
//! - Depends only on `idw-core` internally.
//! - No mocking of cryptographic operations in tests: all tests use real
//!   modular arithmetic and real AES-GCM.
//! - Prime search is out of scope; keys come from caller-supplied primes.

pub mod cache;
pub mod exponent;
pub mod group;
pub mod keys;
pub mod lodging;
pub mod symmetric;

pub use cache::SymmetricKeyCache;
pub use exponent::Exponent;
pub use group::{Element, Group};
pub use keys::{KeyPair, KeyRing, PrivateKey, PrivateKeyLookup, PublicKey, PublicKeyLookup};
pub use lodging::VerifiableEncryption;
pub use symmetric::{generate_iv, SymmetricKey, IV_LENGTH, KEY_LENGTH};
