//! # Host Signatures
//!
//! RSA-style signatures by a host over the content digest `h`:
//! `value = H(h)^d mod n`, checked as `value^e == H(h)` with the key the
//! signer's host used at the content time.
//!
//! ## Invariant
//!
//! Staleness is checked before the modular arithmetic: a signature older
//! than the host validity window is [`WireError::InactiveSignature`] whether
//! or not its value is correct.

use idw_block::{integer, string, Block, Tuple};
use idw_core::{BlockDigest, CryptoError, EncodingError, Identifier, Timestamp, WireError};
use idw_crypto::PrivateKeyLookup;
use num_bigint::BigInt;

use crate::context::Verifier;
use crate::types;

/// The tag of a host signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSignature {
    signer: Identifier,
    value: BigInt,
}

impl HostSignature {
    /// Sign `digest` as `signer`, with the key its host used at `time`.
    pub fn sign(
        digest: &BlockDigest,
        time: Timestamp,
        signer: &Identifier,
        keys: &dyn PrivateKeyLookup,
    ) -> Result<Self, WireError> {
        let private = keys.private_key(&signer.host(), time)?;
        let value = private.sign_digest(digest)?;
        tracing::debug!(signer = %signer, digest = %digest, "host signed content");
        Ok(Self {
            signer: signer.clone(),
            value: value.to_bigint(),
        })
    }

    /// The signing host (or entity at a host).
    pub fn signer(&self) -> &Identifier {
        &self.signer
    }

    /// Verify against the content `digest` created at `time`.
    pub fn verify(&self, digest: &BlockDigest, time: Timestamp, verifier: &Verifier<'_>) -> Result<(), WireError> {
        verifier.check_active("host signature", time, verifier.config().host_signature_validity())?;
        let public = verifier.keys().public_key(&self.signer.host(), time)?;
        let value = match public.composite_group().element_from_signed(&self.value) {
            Ok(value) => value,
            Err(CryptoError::NotAnElement(reason)) => {
                return Err(reject(&self.signer, &format!("signature value {reason}")));
            }
            Err(e) => return Err(e.into()),
        };
        if !public.verify_digest(digest, &value)? {
            return Err(reject(&self.signer, "signature value does not match the content"));
        }
        tracing::debug!(signer = %self.signer, "verified host signature");
        Ok(())
    }

    pub(crate) fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::host_tag(),
            vec![
                Some(string::encode_identifier(types::identifier(), &self.signer)?),
                Some(integer::encode(&self.value)),
            ],
        )?;
        Ok(tuple.into_block())
    }

    pub(crate) fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            signer: string::decode_identifier(tuple.require(0, "signer")?)?,
            value: integer::decode(tuple.require(1, "signature value")?)?,
        })
    }
}

fn reject(signer: &Identifier, reason: &str) -> WireError {
    tracing::warn!(signer = %signer, reason, "rejected host signature");
    WireError::InvalidSignature(format!("host signature by {signer}: {reason}"))
}
