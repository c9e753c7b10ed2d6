//! String blocks: a leading `0x00` byte followed by UTF-8.

use idw_core::{syntax, EncodingError, Identifier, SemanticType};

use crate::block::Block;
use crate::bytes::{prefixed, strip_prefix};

/// A string block of the syntactic type.
pub fn encode(value: &str) -> Block {
    Block::allocated(syntax::string().clone(), prefixed(value.as_bytes()))
}

/// A string block of a type based on string.
pub fn encode_as(ty: &SemanticType, value: &str) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::string())?;
    Ok(Block::allocated(ty.clone(), prefixed(value.as_bytes())))
}

/// The string in a string block, without copying.
pub fn decode(block: &Block) -> Result<&str, EncodingError> {
    block.expect_type(syntax::string())?;
    let payload = strip_prefix(block.bytes())?;
    std::str::from_utf8(payload)
        .map_err(|e| EncodingError::InvalidValue(format!("string is not UTF-8: {e}")))
}

/// An identifier as a string block of type `ty`.
pub fn encode_identifier(ty: &SemanticType, identifier: &Identifier) -> Result<Block, EncodingError> {
    encode_as(ty, identifier.as_str())
}

/// Decode and validate an identifier.
pub fn decode_identifier(block: &Block) -> Result<Identifier, EncodingError> {
    Identifier::new(decode(block)?)
}
