//! # Client Signatures
//!
//! A Schnorr-style proof of knowledge of a client secret `u` committed to
//! at a host as `value = au^u`, bound to the content digest `h`:
//!
//! ```text
//! t = H(au^r)            s = r − u·(t ⊕ h)
//! verify: H(au^s · value^(t ⊕ h)) == t   and   bits(s) ≤ random_exponent_bits
//! ```
//!
//! The generator `au` is taken from the key the commitment host used at the
//! commitment time.

use std::sync::Arc;

use idw_block::{bytes, fixed, integer, string, Block, Tuple};
use idw_core::{BlockDigest, CryptoError, EncodingError, Identifier, Timestamp, WireConfig, WireError};
use idw_crypto::{Exponent, PublicKey, PublicKeyLookup};
use num_bigint::BigInt;
use rand::{CryptoRng, RngCore};

use crate::context::Verifier;
use crate::types;

// ---------------------------------------------------------------------------
// Commitment
// ---------------------------------------------------------------------------

/// `(host, time, au^u)`: a client secret committed under a host key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommitment {
    host: Identifier,
    time: Timestamp,
    value: BigInt,
}

impl ClientCommitment {
    /// The host whose key holds the commitment.
    pub fn host(&self) -> &Identifier {
        &self.host
    }

    /// The time selecting the host key.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// `au^u`.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::commitment(),
            vec![
                Some(string::encode_identifier(types::identifier(), &self.host)?),
                Some(fixed::encode_as(types::time(), self.time.as_millis())?),
                Some(integer::encode(&self.value)),
            ],
        )?;
        Ok(tuple.into_block())
    }

    fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            host: string::decode_identifier(tuple.require(0, "commitment host")?)?,
            time: Timestamp::from_millis(fixed::decode(tuple.require(1, "commitment time")?)?)?,
            value: integer::decode(tuple.require(2, "commitment value")?)?,
        })
    }
}

/// A client secret together with its commitment and the host key it lives in.
pub struct ClientSecret {
    commitment: ClientCommitment,
    secret: Exponent,
    public: Arc<PublicKey>,
}

impl ClientSecret {
    /// Commit to `secret` under the key `host` used at `time`.
    pub fn new(
        host: &Identifier,
        time: Timestamp,
        secret: Exponent,
        keys: &dyn PublicKeyLookup,
    ) -> Result<Self, WireError> {
        let public = keys.public_key(host, time)?;
        let value = public.au().pow(&secret)?;
        Ok(Self {
            commitment: ClientCommitment {
                host: host.clone(),
                time,
                value: value.to_bigint(),
            },
            secret,
            public,
        })
    }

    /// Draw a fresh hash-sized secret and commit to it.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(
        host: &Identifier,
        time: Timestamp,
        keys: &dyn PublicKeyLookup,
        config: &WireConfig,
        rng: &mut R,
    ) -> Result<Self, WireError> {
        let secret = Exponent::random(config.bounds.hash_bits, rng);
        Self::new(host, time, secret, keys)
    }

    /// The public commitment.
    pub fn commitment(&self) -> &ClientCommitment {
        &self.commitment
    }

    /// The secret `u`.
    pub fn secret(&self) -> &Exponent {
        &self.secret
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("commitment", &self.commitment)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// The tag of a client signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSignature {
    commitment: ClientCommitment,
    t: BlockDigest,
    s: Exponent,
}

impl ClientSignature {
    /// Prove knowledge of the secret for the content `digest`.
    pub fn sign<R: RngCore + CryptoRng + ?Sized>(
        secret: &ClientSecret,
        digest: &BlockDigest,
        config: &WireConfig,
        rng: &mut R,
    ) -> Result<Self, WireError> {
        let r = Exponent::random(config.bounds.random_exponent_bits, rng);
        let t = secret.public.au().pow(&r)?.digest();
        let challenge = Exponent::from_digest(&t.xor(digest));
        let s = Exponent::response(&r, &challenge, &secret.secret);
        tracing::debug!(host = %secret.commitment.host, "client signed content");
        Ok(Self {
            commitment: secret.commitment.clone(),
            t,
            s,
        })
    }

    /// The commitment the signature proves knowledge for.
    pub fn commitment(&self) -> &ClientCommitment {
        &self.commitment
    }

    /// Verify against the content `digest` created at `time`.
    pub fn verify(&self, digest: &BlockDigest, time: Timestamp, verifier: &Verifier<'_>) -> Result<(), WireError> {
        let config = verifier.config();
        verifier.check_active("client signature", time, config.client_signature_validity())?;
        if self.s.bits() > config.bounds.random_exponent_bits {
            return Err(self.reject(&format!("response has {} bits", self.s.bits())));
        }
        let public = verifier
            .keys()
            .public_key(&self.commitment.host, self.commitment.time)?;
        let value = match public.composite_group().element_from_signed(&self.commitment.value) {
            Ok(value) => value,
            Err(CryptoError::NotAnElement(reason)) => {
                return Err(self.reject(&format!("commitment {reason}")));
            }
            Err(e) => return Err(e.into()),
        };
        let challenge = Exponent::from_digest(&self.t.xor(digest));
        let recomputed = public.au().pow(&self.s)?.multiply(&value.pow(&challenge)?)?.digest();
        if recomputed != self.t {
            return Err(self.reject("challenge does not match"));
        }
        tracing::debug!(host = %self.commitment.host, "verified client signature");
        Ok(())
    }

    fn reject(&self, reason: &str) -> WireError {
        tracing::warn!(host = %self.commitment.host, reason, "rejected client signature");
        WireError::InvalidSignature(format!(
            "client signature committed at {}: {reason}",
            self.commitment.host
        ))
    }

    pub(crate) fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::client_tag(),
            vec![
                Some(self.commitment.to_block()?),
                Some(bytes::encode(self.t.as_bytes())),
                Some(integer::encode(self.s.as_bigint())),
            ],
        )?;
        Ok(tuple.into_block())
    }

    pub(crate) fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            commitment: ClientCommitment::decode(tuple.require(0, "client commitment")?)?,
            t: types::decode_challenge(tuple.require(1, "client challenge")?)?,
            s: integer::decode_exponent(tuple.require(2, "client response")?)?,
        })
    }
}
