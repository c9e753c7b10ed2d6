//! # Arbitrary-Precision Integers
//!
//! Two's-complement big-endian, at least one byte, no redundant sign bytes.
//! Group elements and exponents travel in integer blocks, so decoding rejects
//! non-minimal encodings: every value has exactly one byte string, which
//! keeps signed digests unambiguous.

use idw_core::{syntax, EncodingError, SemanticType, WireError};
use idw_crypto::{Element, Exponent, Group};
use num_bigint::BigInt;

use crate::block::{Block, BlockWriter, Encodable};

struct IntegerWrapper(BigInt);

impl Encodable for IntegerWrapper {
    fn determine_length(&self) -> usize {
        self.0.to_signed_bytes_be().len()
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        out.put(&self.0.to_signed_bytes_be());
    }
}

/// An integer block of the syntactic type, encoded lazily.
pub fn encode(value: &BigInt) -> Block {
    Block::deferred(syntax::integer().clone(), IntegerWrapper(value.clone()))
}

/// An integer block of a type based on integer.
pub fn encode_as(ty: &SemanticType, value: &BigInt) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::integer())?;
    Ok(Block::deferred(ty.clone(), IntegerWrapper(value.clone())))
}

/// Decode an integer block.
pub fn decode(block: &Block) -> Result<BigInt, EncodingError> {
    block.expect_type(syntax::integer())?;
    let bytes = block.bytes();
    let value = BigInt::from_signed_bytes_be(bytes);
    if value.to_signed_bytes_be().len() != bytes.len() {
        return Err(EncodingError::InvalidValue(format!(
            "integer of {} bytes carries redundant sign bytes",
            bytes.len()
        )));
    }
    Ok(value)
}

/// An exponent as an integer block of type `ty`.
pub fn encode_exponent(ty: &SemanticType, exponent: &Exponent) -> Result<Block, EncodingError> {
    encode_as(ty, exponent.as_bigint())
}

/// Decode an exponent.
pub fn decode_exponent(block: &Block) -> Result<Exponent, EncodingError> {
    decode(block).map(Exponent::new)
}

/// A group element as an integer block of type `ty`.
pub fn encode_element(ty: &SemanticType, element: &Element) -> Result<Block, EncodingError> {
    encode_as(ty, &element.to_bigint())
}

/// Decode an integer block as an element of `group`.
pub fn decode_element(block: &Block, group: &Group) -> Result<Element, WireError> {
    let value = decode(block)?;
    Ok(group.element_from_signed(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use proptest::prelude::*;

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(&BigInt::from(0)).bytes(), &[0x00]);
        assert_eq!(encode(&BigInt::from(127)).bytes(), &[0x7f]);
        assert_eq!(encode(&BigInt::from(128)).bytes(), &[0x00, 0x80]);
        assert_eq!(encode(&BigInt::from(-1)).bytes(), &[0xff]);
        assert_eq!(encode(&BigInt::from(-129)).bytes(), &[0xff, 0x7f]);
    }

    #[test]
    fn test_lazy_until_read() {
        let block = encode(&BigInt::from(1_000_000));
        assert_eq!(block.len(), 3);
        assert!(!block.is_encoded());
        assert_eq!(decode(&block).unwrap(), BigInt::from(1_000_000));
        assert!(block.is_encoded());
    }

    #[test]
    fn test_rejects_redundant_sign_byte() {
        let block = Block::new(syntax::integer().clone(), vec![0x00, 0x01]).unwrap();
        assert!(decode(&block).is_err());
        let block = Block::new(syntax::integer().clone(), vec![0xff, 0xff]).unwrap();
        assert!(decode(&block).is_err());
    }

    #[test]
    fn test_element_range_checked() {
        let group = Group::new(BigUint::from(3233u32)).unwrap();
        let block = encode(&BigInt::from(5000));
        assert!(matches!(decode_element(&block, &group), Err(WireError::Crypto(_))));
        let block = encode(&BigInt::from(42));
        assert_eq!(decode_element(&block, &group).unwrap().value(), &BigUint::from(42u32));
    }

    proptest! {
        #[test]
        fn roundtrip(bytes in proptest::collection::vec(any::<u8>(), 1..64), negative in any::<bool>()) {
            let magnitude = BigInt::from(BigUint::from_bytes_be(&bytes));
            let value = if negative { -magnitude } else { magnitude };
            prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
        }
    }
}
