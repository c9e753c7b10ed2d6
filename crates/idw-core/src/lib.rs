#![deny(missing_docs)]

//! # idw-core — Foundational Types for the Identity Wire Layer
//!
//! This crate is the leaf of the workspace. It defines the vocabulary every
//! other crate speaks: semantic types, identifiers, timestamps, block digests,
//! configuration, and the error hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **Types live beside the bytes, not in them.** A [`SemanticType`] tags
//!    each block but is never serialized; decoders assign it from context and
//!    only self-contained envelopes consult a [`TypeRegistry`].
//!
//! 2. **Distinct failure classes.** [`WireError`] keeps malformed input
//!    (`InvalidEncoding`), forged signatures (`InvalidSignature`) and stale
//!    signatures (`InactiveSignature`) apart so callers can react differently.
//!
//! 3. **Millisecond UTC timestamps.** [`Timestamp`] matches the `int64`
//!    millisecond representation used on the wire.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `idw-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod types;

// Re-export primary types for ergonomic imports.
pub use config::{ExponentBounds, WireConfig, DEFAULT_MAX_MESSAGE_SIZE};
pub use digest::{BlockDigest, DIGEST_LENGTH};
pub use error::{CryptoError, EncodingError, WireError};
pub use identity::Identifier;
pub use temporal::Timestamp;
pub use types::{syntax, MemoryTypeRegistry, SemanticType, TypeRegistry};
