//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout the wire layer. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Structural problems with a block are [`EncodingError`]s and always
//!   abort the enclosing decode. They surface as
//!   [`WireError::InvalidEncoding`].
//! - A signature whose mathematics does not check out is
//!   [`WireError::InvalidSignature`]; a signature that is merely too old is
//!   [`WireError::InactiveSignature`]. Callers log the two separately since
//!   the latter may just be clock skew.
//! - Group arithmetic and key lookup failures are [`CryptoError`]s.

use thiserror::Error;

/// Top-level error type for the wire layer.
#[derive(Error, Debug)]
pub enum WireError {
    /// The block violates the encoding rules of its type.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] EncodingError),

    /// The signature does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The signature, or a credential it relies on, is no longer recent enough.
    #[error("inactive signature: {0}")]
    InactiveSignature(String),

    /// The signer is not authorized for what the signature claims.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The credentials handed to a credentials signature cannot be shown together.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// `verify` was called on a signature that is already verified.
    #[error("signature has already been verified")]
    AlreadyVerified,

    /// Group arithmetic, key lookup or cipher failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration could not be loaded or is unsound.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Returns true if the error means "someone lied" rather than "malformed".
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidSignature(_))
    }
}

/// Structural violation while encoding or decoding a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A type is not based on the type required at that position.
    #[error("type {found} is not based on {expected}")]
    TypeMismatch {
        /// The required type identifier.
        expected: String,
        /// The offending type identifier.
        found: String,
    },

    /// The input ended before the structure was complete.
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to continue.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// Bytes remain after the last element of a composite block.
    #[error("{0} trailing bytes after the last element")]
    TrailingBytes(usize),

    /// An intvar was not encoded in its shortest form.
    #[error("intvar {value} is not minimally encoded in {length} bytes")]
    NonMinimalIntvar {
        /// Decoded value.
        value: u64,
        /// Length used on the wire.
        length: usize,
    },

    /// A composite block has more elements than its type declares.
    #[error("{found} elements exceed the {declared} parameters of {type_id}")]
    Arity {
        /// The composite type identifier.
        type_id: String,
        /// Number of declared parameters.
        declared: usize,
        /// Number of elements found.
        found: usize,
    },

    /// A required element is absent.
    #[error("missing element: {0}")]
    MissingElement(String),

    /// A length prefix announces more bytes than the decoder accepts.
    #[error("{size} bytes exceed the limit of {limit}")]
    TooLarge {
        /// Announced size.
        size: u64,
        /// Configured limit.
        limit: usize,
    },

    /// A value is out of range or otherwise malformed.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// More than one of the host, client and credentials tags is present.
    #[error("a signature may carry at most one of the host, client and credentials tags")]
    MixedSignatureTags,

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The envelope could not be decrypted or mixes request and response fields.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A type identifier is not known to the registry.
    #[error("unknown type identifier: {0}")]
    UnknownType(String),
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No key was valid for the host at the requested time.
    #[error("no key for {host} at {time}")]
    KeyNotFound {
        /// The host whose key was requested.
        host: String,
        /// The requested time (milliseconds since the epoch).
        time: i64,
    },

    /// Key material is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A symmetric cipher operation failed.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// An element has no inverse in its group.
    #[error("element is not invertible modulo the group order: {0}")]
    NotInvertible(String),

    /// A value does not belong to the group it was used in.
    #[error("value is not an element of the group: {0}")]
    NotAnElement(String),
}
