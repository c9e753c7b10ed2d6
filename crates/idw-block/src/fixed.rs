//! Fixed-width signed integers: `int8`, `int16`, `int32` and `int64`,
//! big-endian, exactly as wide as the type says.

use idw_core::{syntax, EncodingError, SemanticType};

use crate::block::Block;

/// A Rust integer with a fixed-width block encoding.
pub trait FixedWidth: Copy + Sized {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// The syntactic type for this width.
    fn syntax() -> &'static SemanticType;

    /// Big-endian bytes.
    fn to_be_vec(self) -> Vec<u8>;

    /// Parse exactly [`WIDTH`](Self::WIDTH) big-endian bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! fixed_width {
    ($ty:ty, $width:literal, $syntax:ident) => {
        impl FixedWidth for $ty {
            const WIDTH: usize = $width;

            fn syntax() -> &'static SemanticType {
                syntax::$syntax()
            }

            fn to_be_vec(self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }

            fn from_be_slice(bytes: &[u8]) -> Self {
                let mut array = [0u8; $width];
                array.copy_from_slice(bytes);
                <$ty>::from_be_bytes(array)
            }
        }
    };
}

fixed_width!(i8, 1, int8);
fixed_width!(i16, 2, int16);
fixed_width!(i32, 4, int32);
fixed_width!(i64, 8, int64);

/// A block of the syntactic type for `T`.
pub fn encode<T: FixedWidth>(value: T) -> Block {
    Block::allocated(T::syntax().clone(), value.to_be_vec())
}

/// A block of a type based on the syntactic type for `T`.
pub fn encode_as<T: FixedWidth>(ty: &SemanticType, value: T) -> Result<Block, EncodingError> {
    ty.check_based_on(T::syntax())?;
    Ok(Block::allocated(ty.clone(), value.to_be_vec()))
}

/// Decode a fixed-width block; the length must match the width exactly.
pub fn decode<T: FixedWidth>(block: &Block) -> Result<T, EncodingError> {
    block.expect_type(T::syntax())?;
    let bytes = block.bytes();
    if bytes.len() != T::WIDTH {
        return Err(EncodingError::InvalidValue(format!(
            "{} must be {} bytes, got {}",
            T::syntax(),
            T::WIDTH,
            bytes.len()
        )));
    }
    Ok(T::from_be_slice(bytes))
}
