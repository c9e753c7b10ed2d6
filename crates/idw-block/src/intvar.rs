//! # Intvar Codec
//!
//! Variable-length non-negative integers in 1, 2, 4 or 8 bytes. The two most
//! significant bits of the first byte hold `log2(length)`; the remaining bits
//! hold the value big-endian. Every tuple and list length prefix is an intvar.
//!
//! | Value range        | Bytes |
//! |--------------------|-------|
//! | `0 ..= 2^6 − 1`    | 1     |
//! | `2^6 ..= 2^14 − 1` | 2     |
//! | `2^14 ..= 2^30 − 1`| 4     |
//! | `2^30 ..= 2^62 − 1`| 8     |
//!
//! ## Invariant
//!
//! Decoding rejects any encoding longer than necessary, so every value has
//! exactly one encoding. Block digests depend on this.

use std::io::Read;

use idw_core::{syntax, EncodingError, SemanticType, WireError};

use crate::block::{Block, BlockWriter, Encodable};

/// The largest encodable value.
pub const MAX_VALUE: u64 = (1 << 62) - 1;

/// The number of bytes `value` occupies.
pub fn encoded_length(value: u64) -> usize {
    if value < 1 << 6 {
        1
    } else if value < 1 << 14 {
        2
    } else if value < 1 << 30 {
        4
    } else {
        8
    }
}

/// The total length announced by the first byte of an intvar.
pub fn length_from_first_byte(first: u8) -> usize {
    1 << (first >> 6)
}

/// Write `value` in its minimal form. Values above [`MAX_VALUE`] are a caller bug.
pub fn write(value: u64, out: &mut BlockWriter<'_>) {
    assert!(value <= MAX_VALUE, "intvar {value} exceeds {MAX_VALUE}");
    let length = encoded_length(value);
    let mut bytes = value.to_be_bytes();
    let start = bytes.len() - length;
    bytes[start] |= (length.trailing_zeros() as u8) << 6;
    out.put(&bytes[start..]);
}

/// Encode `value` to a standalone byte vector.
pub fn to_bytes(value: u64) -> Result<Vec<u8>, EncodingError> {
    check_range(value)?;
    let mut out = vec![0u8; encoded_length(value)];
    write(value, &mut BlockWriter::new(&mut out));
    Ok(out)
}

/// Decode the intvar at the start of `input`, returning the value and the
/// number of bytes it occupied.
pub fn decode(input: &[u8]) -> Result<(u64, usize), EncodingError> {
    let first = *input.first().ok_or(EncodingError::Truncated {
        needed: 1,
        available: 0,
    })?;
    let length = length_from_first_byte(first);
    if input.len() < length {
        return Err(EncodingError::Truncated {
            needed: length,
            available: input.len(),
        });
    }
    let value = input[1..length]
        .iter()
        .fold(u64::from(first & 0x3f), |acc, &b| (acc << 8) | u64::from(b));
    if encoded_length(value) != length {
        return Err(EncodingError::NonMinimalIntvar { value, length });
    }
    Ok((value, length))
}

/// Read exactly one intvar from a stream, returning the value and the raw
/// bytes consumed.
pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<(u64, Vec<u8>), WireError> {
    let mut raw = vec![0u8; 1];
    reader.read_exact(&mut raw)?;
    let length = length_from_first_byte(raw[0]);
    raw.resize(length, 0);
    reader.read_exact(&mut raw[1..])?;
    let (value, _) = decode(&raw)?;
    Ok((value, raw))
}

fn check_range(value: u64) -> Result<(), EncodingError> {
    if value > MAX_VALUE {
        return Err(EncodingError::InvalidValue(format!(
            "intvar {value} exceeds {MAX_VALUE}"
        )));
    }
    Ok(())
}

struct IntvarWrapper(u64);

impl Encodable for IntvarWrapper {
    fn determine_length(&self) -> usize {
        encoded_length(self.0)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        write(self.0, out);
    }
}

/// An intvar block of the syntactic type.
pub fn encode(value: u64) -> Result<Block, EncodingError> {
    encode_as(syntax::intvar(), value)
}

/// An intvar block of a type based on intvar.
pub fn encode_as(ty: &SemanticType, value: u64) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::intvar())?;
    check_range(value)?;
    Ok(Block::deferred(ty.clone(), IntvarWrapper(value)))
}

/// Decode an intvar block, which must contain nothing else.
pub fn decode_block(block: &Block) -> Result<u64, EncodingError> {
    block.expect_type(syntax::intvar())?;
    let (value, length) = decode(block.bytes())?;
    if length != block.len() {
        return Err(EncodingError::TrailingBytes(block.len() - length));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_lengths() {
        for (value, length) in [
            (0, 1),
            (63, 1),
            (64, 2),
            (16_383, 2),
            (16_384, 4),
            ((1 << 30) - 1, 4),
            (1 << 30, 8),
            (MAX_VALUE, 8),
        ] {
            assert_eq!(to_bytes(value).unwrap().len(), length, "value {value}");
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(to_bytes(37).unwrap(), vec![0x25]);
        assert_eq!(to_bytes(15_293).unwrap(), vec![0x7b, 0xbd]);
        assert_eq!(to_bytes(494_878_333).unwrap(), vec![0x9d, 0x7f, 0x3e, 0x7d]);
    }

    #[test]
    fn test_rejects_oversized_value() {
        assert!(to_bytes(MAX_VALUE + 1).is_err());
        assert!(encode(u64::MAX).is_err());
    }

    #[test]
    fn test_rejects_non_minimal() {
        assert_eq!(
            decode(&[0x40, 0x25]),
            Err(EncodingError::NonMinimalIntvar { value: 37, length: 2 })
        );
    }

    #[test]
    fn test_rejects_truncated() {
        assert!(matches!(decode(&[]), Err(EncodingError::Truncated { .. })));
        assert_eq!(
            decode(&[0x80, 0x01]),
            Err(EncodingError::Truncated { needed: 4, available: 2 })
        );
    }

    #[test]
    fn test_stream_reader_consumes_exactly_one() {
        let mut input = to_bytes(16_384).unwrap();
        input.extend_from_slice(&[0xaa, 0xbb]);
        let mut cursor = std::io::Cursor::new(input);
        let (value, raw) = read(&mut cursor).unwrap();
        assert_eq!(value, 16_384);
        assert_eq!(raw.len(), 4);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_block_roundtrip_rejects_trailing() {
        let block = encode(300).unwrap();
        assert_eq!(decode_block(&block).unwrap(), 300);
        let padded = Block::new(syntax::intvar().clone(), vec![0x01, 0x00]).unwrap();
        assert_eq!(decode_block(&padded), Err(EncodingError::TrailingBytes(1)));
    }

    proptest! {
        #[test]
        fn roundtrip_is_minimal(value in 0..=MAX_VALUE) {
            let bytes = to_bytes(value).unwrap();
            let (decoded, length) = decode(&bytes).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(length, bytes.len());
            prop_assert_eq!(length, encoded_length(decoded));
        }
    }
}
