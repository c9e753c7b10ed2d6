#![deny(missing_docs)]

//! # idw-signature — Signed Content
//!
//! Wraps content `(subject, time, element, audit)` together with at most one
//! authenticity tag:
//!
//! - **Host**: an RSA-style signature by a host key.
//! - **Client**: a Schnorr-style proof of knowledge of a client secret that a
//!   host committed to.
//! - **Credentials**: an anonymous show of host-issued credentials, with
//!   optional lodging of hidden values and shortening.
//!
//! [`SignatureWrapper`] encodes and decodes the signature block and tracks
//! whether the tag has been verified, so verification can be deferred or
//! skipped for trusted storage.
//!
//! ## Error Discipline
//!
//! - Structure → [`WireError::InvalidEncoding`].
//! - Mathematics → [`WireError::InvalidSignature`].
//! - Staleness → [`WireError::InactiveSignature`].
//! - Policy → [`WireError::Authorization`] and [`WireError::InvalidCredentials`].
//!
//! [`WireError::InvalidEncoding`]: idw_core::WireError::InvalidEncoding
//! [`WireError::InvalidSignature`]: idw_core::WireError::InvalidSignature
//! [`WireError::InactiveSignature`]: idw_core::WireError::InactiveSignature
//! [`WireError::Authorization`]: idw_core::WireError::Authorization
//! [`WireError::InvalidCredentials`]: idw_core::WireError::InvalidCredentials

pub mod client;
pub mod content;
pub mod context;
pub mod credential;
pub mod credentials;
pub mod host;
pub mod signature;
pub mod types;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use client::{ClientCommitment, ClientSecret, ClientSignature};
pub use content::Content;
pub use context::Verifier;
pub use credential::{subject_exponent, Credential, CredentialSecrets, Exposure, Holder};
pub use credentials::{
    CredentialProof, CredentialsRequest, CredentialsSignature, LodgedValues, ShortenedCommitment,
};
pub use host::HostSignature;
pub use signature::{Signature, SignatureWrapper, Verify};
