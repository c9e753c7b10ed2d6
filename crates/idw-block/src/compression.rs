//! # Compression Envelope
//!
//! One algorithm byte followed by the (possibly compressed) element bytes.
//! The compressed form is computed once, when the wrapper is built, so length
//! queries and encoding reuse it.
//!
//! | Tag | Algorithm |
//! |-----|-----------|
//! | `0` | none      |
//! | `1` | zlib      |

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use idw_core::{syntax, EncodingError, SemanticType, DEFAULT_MAX_MESSAGE_SIZE};

use crate::block::{Block, BlockWriter, Encodable};

/// The compression algorithm of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Algorithm {
    /// Stored as is.
    None = 0,
    /// zlib (RFC 1950).
    Zlib = 1,
}

impl Algorithm {
    /// The tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            other => Err(EncodingError::Compression(format!("unknown algorithm {other}"))),
        }
    }
}

struct CompressionWrapper {
    algorithm: Algorithm,
    payload: Vec<u8>,
}

impl Encodable for CompressionWrapper {
    fn determine_length(&self) -> usize {
        1 + self.payload.len()
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        out.put_u8(self.algorithm.tag());
        out.put(&self.payload);
    }
}

/// Compress `element` with `algorithm` into a block of the syntactic type.
pub fn compress(element: &Block, algorithm: Algorithm) -> Result<Block, EncodingError> {
    compress_as(syntax::compression(), element, algorithm)
}

/// Compress `element` into a block of a type based on compression.
pub fn compress_as(
    ty: &SemanticType,
    element: &Block,
    algorithm: Algorithm,
) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::compression())?;
    let payload = match algorithm {
        Algorithm::None => element.to_vec(),
        Algorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(element.bytes())
                .map_err(|e| EncodingError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| EncodingError::Compression(e.to_string()))?
        }
    };
    tracing::trace!(
        algorithm = ?algorithm,
        original = element.len(),
        compressed = payload.len(),
        "compressed element"
    );
    Ok(Block::deferred(ty.clone(), CompressionWrapper { algorithm, payload }))
}

/// The algorithm of a compression block.
pub fn algorithm(block: &Block) -> Result<Algorithm, EncodingError> {
    block.expect_type(syntax::compression())?;
    let tag = block.byte(0).ok_or(EncodingError::Truncated {
        needed: 1,
        available: 0,
    })?;
    Algorithm::from_tag(tag)
}

/// Recover the element of a compression block as a block of `element_type`,
/// inflating at most [`DEFAULT_MAX_MESSAGE_SIZE`] bytes.
///
/// An uncompressed element is a zero-copy slice of the envelope.
pub fn decompress(block: &Block, element_type: &SemanticType) -> Result<Block, EncodingError> {
    decompress_with_limit(block, element_type, DEFAULT_MAX_MESSAGE_SIZE)
}

/// [`decompress`] with an explicit cap on the inflated size, usually
/// [`WireConfig::max_message_size`](idw_core::WireConfig::max_message_size).
pub fn decompress_with_limit(
    block: &Block,
    element_type: &SemanticType,
    limit: usize,
) -> Result<Block, EncodingError> {
    match algorithm(block)? {
        Algorithm::None => Block::slice(element_type.clone(), block, 1, block.len() - 1),
        Algorithm::Zlib => {
            let mut decoded = Vec::new();
            ZlibDecoder::new(&block.bytes()[1..])
                .take(limit as u64 + 1)
                .read_to_end(&mut decoded)
                .map_err(|e| EncodingError::Compression(e.to_string()))?;
            if decoded.len() > limit {
                tracing::warn!(compressed = block.len(), limit, "rejected oversized compressed element");
                return Err(EncodingError::Compression(format!(
                    "element inflates beyond {limit} bytes"
                )));
            }
            Block::new(element_type.clone(), decoded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes;
    use proptest::prelude::*;

    #[test]
    fn test_none_is_byte_identical() {
        let element = bytes::encode(b"plain");
        let block = compress(&element, Algorithm::None).unwrap();
        assert_eq!(block.byte(0), Some(0));
        assert_eq!(&block.bytes()[1..], element.bytes());
        assert_eq!(decompress(&block, syntax::bytes()).unwrap(), element);
    }

    #[test]
    fn test_zlib_shrinks_repetitive_input() {
        let element = bytes::encode(&[b'a'; 4096]);
        let block = compress(&element, Algorithm::Zlib).unwrap();
        assert!(block.len() < 100);
        assert_eq!(algorithm(&block).unwrap(), Algorithm::Zlib);
        assert_eq!(decompress(&block, syntax::bytes()).unwrap(), element);
    }

    #[test]
    fn test_corrupt_stream_is_encoding_error() {
        let block = Block::new(syntax::compression().clone(), vec![1, 0xde, 0xad]).unwrap();
        assert!(matches!(
            decompress(&block, syntax::bytes()),
            Err(EncodingError::Compression(_))
        ));
    }

    #[test]
    fn test_inflation_is_capped() {
        let element = bytes::encode(&vec![0u8; 1 << 20]);
        let block = compress(&element, Algorithm::Zlib).unwrap();
        assert!(block.len() < 4096);
        assert!(matches!(
            decompress_with_limit(&block, syntax::bytes(), 64 * 1024),
            Err(EncodingError::Compression(msg)) if msg.contains("65536")
        ));
        let exact = decompress_with_limit(&block, syntax::bytes(), element.len()).unwrap();
        assert_eq!(exact, element);
    }

    #[test]
    fn test_unknown_algorithm() {
        let block = Block::new(syntax::compression().clone(), vec![9, 0]).unwrap();
        assert!(decompress(&block, syntax::bytes()).is_err());
    }

    #[test]
    fn test_empty_none_payload_rejected() {
        let block = Block::new(syntax::compression().clone(), vec![0]).unwrap();
        assert!(decompress(&block, syntax::bytes()).is_err());
    }

    proptest! {
        #[test]
        fn zlib_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let element = bytes::encode(&payload);
            let block = compress(&element, Algorithm::Zlib).unwrap();
            prop_assert_eq!(decompress(&block, syntax::bytes()).unwrap(), element);
        }
    }
}
