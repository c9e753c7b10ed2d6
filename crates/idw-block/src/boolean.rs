//! Boolean blocks: one byte, `0` or `1`.

use idw_core::{syntax, EncodingError, SemanticType};

use crate::block::Block;

/// A boolean block of the syntactic type.
pub fn encode(value: bool) -> Block {
    Block::allocated(syntax::boolean().clone(), vec![u8::from(value)])
}

/// A boolean block of a type based on boolean.
pub fn encode_as(ty: &SemanticType, value: bool) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::boolean())?;
    Ok(Block::allocated(ty.clone(), vec![u8::from(value)]))
}

/// Decode a boolean block. Any byte other than `0` or `1` is invalid.
pub fn decode(block: &Block) -> Result<bool, EncodingError> {
    block.expect_type(syntax::boolean())?;
    match block.bytes() {
        [0] => Ok(false),
        [1] => Ok(true),
        [other] => Err(EncodingError::InvalidValue(format!("boolean byte {other:#04x}"))),
        bytes => Err(EncodingError::InvalidValue(format!(
            "boolean must be 1 byte, got {}",
            bytes.len()
        ))),
    }
}
