//! # Group Arithmetic
//!
//! Elements of the multiplicative group modulo a composite `n` (the host
//! RSA-style group) or `n²` (the square group used for verifiable
//! encryption). Only the narrow interface the signature schemes need is
//! exposed: exponentiation by a signed [`Exponent`], multiplication,
//! inversion, and hashing an element.
//!
//! ## Invariant
//!
//! An [`Element`] always holds a value strictly below its modulus. Values
//! coming off the wire go through [`Group::element`], which rejects anything
//! else.

use std::sync::Arc;

use idw_core::{BlockDigest, CryptoError};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};

use crate::exponent::Exponent;

/// A multiplicative group modulo `modulus`.
#[derive(Clone, PartialEq, Eq)]
pub struct Group {
    modulus: Arc<BigUint>,
}

impl Group {
    /// A group modulo an odd `modulus > 1`.
    pub fn new(modulus: BigUint) -> Result<Self, CryptoError> {
        if modulus <= BigUint::one() || modulus.is_even() {
            return Err(CryptoError::InvalidKey(
                "group modulus must be odd and greater than one".into(),
            ));
        }
        Ok(Self {
            modulus: Arc::new(modulus),
        })
    }

    /// The modulus.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.modulus.bits()
    }

    /// Wrap a value as an element, rejecting values outside `[0, modulus)`.
    pub fn element(&self, value: BigUint) -> Result<Element, CryptoError> {
        if value >= *self.modulus {
            return Err(CryptoError::NotAnElement(format!(
                "{} bit value exceeds the {} bit modulus",
                value.bits(),
                self.bits()
            )));
        }
        Ok(Element {
            group: self.clone(),
            value,
        })
    }

    /// Interpret a signed value (as decoded from an integer block) as an element.
    pub fn element_from_signed(&self, value: &BigInt) -> Result<Element, CryptoError> {
        match value.to_biguint() {
            Some(unsigned) => self.element(unsigned),
            None => Err(CryptoError::NotAnElement("negative value".into())),
        }
    }

    /// Reduce a digest modulo the group order to obtain an element.
    pub fn element_from_digest(&self, digest: &BlockDigest) -> Element {
        let value = BigUint::from_bytes_be(digest.as_bytes()) % self.modulus.as_ref();
        Element {
            group: self.clone(),
            value,
        }
    }

    /// The identity element.
    pub fn one(&self) -> Element {
        Element {
            group: self.clone(),
            value: BigUint::one(),
        }
    }

    /// A uniformly random element.
    pub fn random_element<R: RngCore + CryptoRng + ?Sized>(&self, rng: &mut R) -> Element {
        let value = rng.gen_biguint_below(&self.modulus);
        Element {
            group: self.clone(),
            value,
        }
    }

    /// A random quadratic residue, suitable as a generator of the subgroup of squares.
    pub fn random_square<R: RngCore + CryptoRng + ?Sized>(&self, rng: &mut R) -> Element {
        let element = self.random_element(rng);
        let value = (&element.value * &element.value) % self.modulus.as_ref();
        Element {
            group: self.clone(),
            value,
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({} bits)", self.bits())
    }
}

/// An element of a [`Group`].
#[derive(Clone, PartialEq, Eq)]
pub struct Element {
    group: Group,
    value: BigUint,
}

impl Element {
    /// The group this element belongs to.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// The value in `[0, modulus)`.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// The value as a signed integer, as written into integer blocks.
    pub fn to_bigint(&self) -> BigInt {
        BigInt::from(self.value.clone())
    }

    /// `self^exponent`; negative exponents exponentiate the inverse.
    pub fn pow(&self, exponent: &Exponent) -> Result<Element, CryptoError> {
        let base = if exponent.is_negative() {
            self.inverse()?
        } else {
            self.clone()
        };
        let value = base.value.modpow(exponent.magnitude(), self.group.modulus());
        Ok(Element {
            group: self.group.clone(),
            value,
        })
    }

    /// `self · other`. Both elements must belong to the same group.
    pub fn multiply(&self, other: &Element) -> Result<Element, CryptoError> {
        if self.group != other.group {
            return Err(CryptoError::NotAnElement(format!(
                "{} bit group element multiplied into a {} bit group",
                other.group.bits(),
                self.group.bits()
            )));
        }
        let value = (&self.value * &other.value) % self.group.modulus();
        Ok(Element {
            group: self.group.clone(),
            value,
        })
    }

    /// The multiplicative inverse.
    pub fn inverse(&self) -> Result<Element, CryptoError> {
        let value = self
            .value
            .modinv(self.group.modulus())
            .ok_or_else(|| CryptoError::NotInvertible(format!("{} bit element", self.value.bits())))?;
        Ok(Element {
            group: self.group.clone(),
            value,
        })
    }

    /// SHA-256 over the two's-complement big-endian encoding of the value,
    /// the same bytes an integer block holds for it.
    pub fn digest(&self) -> BlockDigest {
        BlockDigest::of(&self.to_bigint().to_signed_bytes_be())
    }

    /// The digest of this element read as an exponent.
    pub fn hash_to_exponent(&self) -> Exponent {
        Exponent::from_digest(&self.digest())
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.value.to_str_radix(16);
        let prefix: String = hex.chars().take(8).collect();
        write!(f, "Element({prefix}...)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        // 61 · 53
        Group::new(BigUint::from(3233u32)).unwrap()
    }

    #[test]
    fn test_rejects_even_or_trivial_modulus() {
        assert!(Group::new(BigUint::from(1u32)).is_err());
        assert!(Group::new(BigUint::from(100u32)).is_err());
    }

    #[test]
    fn test_element_range_checked() {
        let g = group();
        assert!(g.element(BigUint::from(3232u32)).is_ok());
        assert!(matches!(
            g.element(BigUint::from(3233u32)),
            Err(CryptoError::NotAnElement(_))
        ));
        assert!(g.element_from_signed(&BigInt::from(-1)).is_err());
    }

    #[test]
    fn test_textbook_rsa_roundtrip() {
        let g = group();
        let message = g.element(BigUint::from(65u32)).unwrap();
        let cipher = message.pow(&Exponent::from_u64(17)).unwrap();
        assert_eq!(cipher.value(), &BigUint::from(2790u32));
        let plain = cipher.pow(&Exponent::from_u64(413)).unwrap();
        assert_eq!(plain, message);
    }

    #[test]
    fn test_negative_exponent_uses_inverse() {
        let g = group();
        let x = g.element(BigUint::from(42u32)).unwrap();
        let minus_three = Exponent::new(BigInt::from(-3));
        let product = x
            .pow(&minus_three)
            .unwrap()
            .multiply(&x.pow(&Exponent::from_u64(3)).unwrap())
            .unwrap();
        assert_eq!(product, g.one());
    }

    #[test]
    fn test_non_invertible_element() {
        let g = group();
        let x = g.element(BigUint::from(61u32)).unwrap();
        assert!(matches!(
            x.pow(&Exponent::new(BigInt::from(-1))),
            Err(CryptoError::NotInvertible(_))
        ));
    }

    #[test]
    fn test_multiply_rejects_foreign_group() {
        let x = group().element(BigUint::from(42u32)).unwrap();
        let other = Group::new(BigUint::from(3127u32)).unwrap();
        let y = other.element(BigUint::from(42u32)).unwrap();
        assert!(matches!(x.multiply(&y), Err(CryptoError::NotAnElement(_))));
        assert_eq!(x.multiply(&group().one()).unwrap(), x);
    }

    #[test]
    fn test_digest_matches_signed_encoding() {
        let g = group();
        let x = g.element(BigUint::from(200u32)).unwrap();
        // 200 needs a leading zero byte in two's complement.
        assert_eq!(x.digest(), BlockDigest::of(&[0x00, 0xc8]));
    }

    #[test]
    fn test_random_square_is_in_group() {
        let g = group();
        let mut rng = rand::rngs::OsRng;
        let s = g.random_square(&mut rng);
        assert!(s.value() < g.modulus());
    }
}
