//! Byte-string blocks.
//!
//! A leading `0x00` byte precedes the payload so that an empty byte string
//! still yields a non-empty block and stays distinguishable from absence.

use idw_core::{syntax, EncodingError, SemanticType};

use crate::block::Block;

/// A bytes block of the syntactic type.
pub fn encode(value: &[u8]) -> Block {
    Block::allocated(syntax::bytes().clone(), prefixed(value))
}

/// A bytes block of a type based on bytes.
pub fn encode_as(ty: &SemanticType, value: &[u8]) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::bytes())?;
    Ok(Block::allocated(ty.clone(), prefixed(value)))
}

/// The payload of a bytes block, without copying.
pub fn decode(block: &Block) -> Result<&[u8], EncodingError> {
    block.expect_type(syntax::bytes())?;
    strip_prefix(block.bytes())
}

pub(crate) fn prefixed(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 1);
    out.push(0);
    out.extend_from_slice(value);
    out
}

pub(crate) fn strip_prefix(bytes: &[u8]) -> Result<&[u8], EncodingError> {
    match bytes.split_first() {
        Some((0, payload)) => Ok(payload),
        Some((other, _)) => Err(EncodingError::InvalidValue(format!(
            "expected leading 0x00, found {other:#04x}"
        ))),
        None => Err(EncodingError::Truncated {
            needed: 1,
            available: 0,
        }),
    }
}
