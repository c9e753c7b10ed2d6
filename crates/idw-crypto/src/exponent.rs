//! # Exponents
//!
//! Signed arbitrary-precision exponents. Secrets, random blinding values,
//! challenges and responses are all exponents; responses of the form
//! `r − t·x` are routinely negative, which is why the representation is a
//! `BigInt` rather than an unsigned integer.
//!
//! `Debug` prints only the bit length: exponents are frequently secret.

use std::ops::{Add, Mul, Neg, Sub};

use idw_core::BlockDigest;
use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// A signed arbitrary-precision exponent.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exponent(BigInt);

impl Exponent {
    /// Wrap a `BigInt`.
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    /// A non-negative exponent from an unsigned integer.
    pub fn from_biguint(value: BigUint) -> Self {
        Self(BigInt::from(value))
    }

    /// A small exponent.
    pub fn from_u64(value: u64) -> Self {
        Self(BigInt::from(value))
    }

    /// Zero.
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    /// One.
    pub fn one() -> Self {
        Self(BigInt::one())
    }

    /// Interpret a digest as a non-negative big-endian exponent.
    pub fn from_digest(digest: &BlockDigest) -> Self {
        Self(BigInt::from_bytes_be(Sign::Plus, digest.as_bytes()))
    }

    /// A uniformly random non-negative exponent below `2^bits`.
    pub fn random<R: RngCore + CryptoRng + ?Sized>(bits: u64, rng: &mut R) -> Self {
        Self(BigInt::from(rng.gen_biguint(bits)))
    }

    /// Parse two's-complement big-endian bytes.
    pub fn from_signed_bytes_be(bytes: &[u8]) -> Self {
        Self(BigInt::from_signed_bytes_be(bytes))
    }

    /// Two's-complement big-endian bytes (at least one byte).
    pub fn to_signed_bytes_be(&self) -> Vec<u8> {
        self.0.to_signed_bytes_be()
    }

    /// Bit length of the magnitude.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    /// True if the exponent is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// True if the exponent is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The magnitude as an unsigned integer.
    pub fn magnitude(&self) -> &BigUint {
        self.0.magnitude()
    }

    /// Access the inner `BigInt`.
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// The Schnorr response `random − challenge · secret`.
    pub fn response(random: &Exponent, challenge: &Exponent, secret: &Exponent) -> Exponent {
        Exponent(&random.0 - &challenge.0 * &secret.0)
    }
}

impl Add for &Exponent {
    type Output = Exponent;

    fn add(self, rhs: &Exponent) -> Exponent {
        Exponent(&self.0 + &rhs.0)
    }
}

impl Sub for &Exponent {
    type Output = Exponent;

    fn sub(self, rhs: &Exponent) -> Exponent {
        Exponent(&self.0 - &rhs.0)
    }
}

impl Mul for &Exponent {
    type Output = Exponent;

    fn mul(self, rhs: &Exponent) -> Exponent {
        Exponent(&self.0 * &rhs.0)
    }
}

impl Neg for &Exponent {
    type Output = Exponent;

    fn neg(self) -> Exponent {
        Exponent(-&self.0)
    }
}

impl From<u64> for Exponent {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl std::fmt::Debug for Exponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "Exponent({sign}{} bits)", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_digest_is_non_negative() {
        let digest = BlockDigest([0xff; 32]);
        let exponent = Exponent::from_digest(&digest);
        assert!(!exponent.is_negative());
        assert_eq!(exponent.bits(), 256);
    }

    #[test]
    fn test_random_respects_bit_bound() {
        let mut rng = rand::rngs::OsRng;
        for _ in 0..16 {
            assert!(Exponent::random(100, &mut rng).bits() <= 100);
        }
    }

    #[test]
    fn test_response_can_be_negative() {
        let r = Exponent::from_u64(5);
        let t = Exponent::from_u64(3);
        let x = Exponent::from_u64(7);
        let s = Exponent::response(&r, &t, &x);
        assert!(s.is_negative());
        assert_eq!(s, Exponent::new(BigInt::from(-16)));
        assert_eq!(s.bits(), 5);
    }

    #[test]
    fn test_signed_bytes_roundtrip_negative() {
        let value = Exponent::new(BigInt::from(-129));
        let bytes = value.to_signed_bytes_be();
        assert_eq!(bytes, vec![0xff, 0x7f]);
        assert_eq!(Exponent::from_signed_bytes_be(&bytes), value);
    }

    #[test]
    fn test_debug_hides_value() {
        let debug = format!("{:?}", Exponent::from_u64(0xdead_beef));
        assert_eq!(debug, "Exponent(32 bits)");
    }

    proptest! {
        #[test]
        fn response_recombines(r in any::<i64>(), t in any::<i32>(), x in any::<i32>()) {
            let r = Exponent::new(BigInt::from(r));
            let t = Exponent::new(BigInt::from(t));
            let x = Exponent::new(BigInt::from(x));
            let s = Exponent::response(&r, &t, &x);
            prop_assert_eq!(&s + &(&t * &x), r);
        }
    }
}
