//! # Verifiable Encryption
//!
//! Encrypts an exponent `m` under a host's square group so that the host can
//! later recover it with [`PrivateKey::decrypt_lodged`], while a proof of
//! knowledge shows that the ciphertext holds the same `m` a credential proof
//! uses:
//!
//! ```text
//! W1 = y^r · (n+1)^m      W2 = g^r            (mod n²)
//! F1 = y^rr · (n+1)^rm    F2 = g^rr           commitments
//! F1 = W1^t · y^sr · (n+1)^sm,  F2 = W2^t · g^sr   verification
//! ```
//!
//! `rm`/`sm` are the blinding and response already used for `m` in the
//! credential proof, which is what ties the ciphertext to the credential.
//!
//! [`PrivateKey::decrypt_lodged`]: crate::keys::PrivateKey::decrypt_lodged

use idw_core::CryptoError;

use crate::exponent::Exponent;
use crate::group::Element;
use crate::keys::PublicKey;

/// A verifiable encryption `(W1, W2)` of an exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiableEncryption {
    w1: Element,
    w2: Element,
}

impl VerifiableEncryption {
    /// Encrypt `value` under `public` with the given `randomness`.
    pub fn encrypt(public: &PublicKey, value: &Exponent, randomness: &Exponent) -> Result<Self, CryptoError> {
        let w1 = public.y().pow(randomness)?.multiply(&public.z_plus_1().pow(value)?)?;
        let w2 = public.g().pow(randomness)?;
        Ok(Self { w1, w2 })
    }

    /// Wrap decoded ciphertext elements, checking they belong to the square group.
    pub fn from_parts(public: &PublicKey, w1: Element, w2: Element) -> Result<Self, CryptoError> {
        let square = public.square_group();
        if w1.group() != square || w2.group() != square {
            return Err(CryptoError::NotAnElement(
                "verifiable encryption outside the square group".into(),
            ));
        }
        Ok(Self { w1, w2 })
    }

    /// `W1`.
    pub fn w1(&self) -> &Element {
        &self.w1
    }

    /// `W2`.
    pub fn w2(&self) -> &Element {
        &self.w2
    }

    /// The prover's commitments `(F1, F2)` for blindings of the value and the randomness.
    pub fn commit(
        public: &PublicKey,
        value_blinding: &Exponent,
        randomness_blinding: &Exponent,
    ) -> Result<(Element, Element), CryptoError> {
        let f1 = public
            .y()
            .pow(randomness_blinding)?
            .multiply(&public.z_plus_1().pow(value_blinding)?)?;
        let f2 = public.g().pow(randomness_blinding)?;
        Ok((f1, f2))
    }

    /// The verifier's recomputation of `(F1, F2)` from the challenge and responses.
    pub fn recompute(
        &self,
        public: &PublicKey,
        challenge: &Exponent,
        value_response: &Exponent,
        randomness_response: &Exponent,
    ) -> Result<(Element, Element), CryptoError> {
        let f1 = self
            .w1
            .pow(challenge)?
            .multiply(&public.y().pow(randomness_response)?)?
            .multiply(&public.z_plus_1().pow(value_response)?)?;
        let f2 = self.w2.pow(challenge)?.multiply(&public.g().pow(randomness_response)?)?;
        Ok((f1, f2))
    }
}
