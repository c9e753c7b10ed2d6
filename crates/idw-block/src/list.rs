//! # Lists
//!
//! A homogeneous, order-preserving sequence: an intvar element count, then
//! each element as a length-prefixed slot exactly like a tuple slot. Absent
//! elements are kept in place. The list type declares exactly one
//! parameter, and every present element is based on it.

use idw_core::{syntax, EncodingError, SemanticType};

use crate::block::{Block, BlockWriter, Encodable};
use crate::intvar;
use crate::tuple::{elements_length, read_slot, write_elements};

/// A list value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    ty: SemanticType,
    elements: Vec<Option<Block>>,
}

impl List {
    /// Build a list of `ty`, checking every element against its parameter.
    pub fn new(ty: &SemanticType, elements: Vec<Option<Block>>) -> Result<Self, EncodingError> {
        ty.check_based_on(syntax::list())?;
        let parameter = ty.single_parameter()?;
        for element in elements.iter().flatten() {
            element.expect_type(parameter)?;
        }
        Ok(Self {
            ty: ty.clone(),
            elements,
        })
    }

    /// Decode a list block.
    pub fn decode(block: &Block) -> Result<Self, EncodingError> {
        block.expect_type(syntax::list())?;
        let parameter = block.ty().single_parameter()?;
        let bytes = block.bytes();
        let (count, mut position) = intvar::decode(bytes)?;
        let mut elements = Vec::new();
        for _ in 0..count {
            if position >= bytes.len() {
                return Err(EncodingError::MissingElement(format!(
                    "{} of {count} list elements present in {}",
                    elements.len(),
                    block.ty()
                )));
            }
            let (span, next) = read_slot(bytes, position)?;
            let element = span
                .map(|(offset, length)| Block::slice(parameter.clone(), block, offset, length))
                .transpose()?;
            elements.push(element);
            position = next;
        }
        if position < bytes.len() {
            return Err(EncodingError::TrailingBytes(bytes.len() - position));
        }
        Ok(Self {
            ty: block.ty().clone(),
            elements,
        })
    }

    /// The list type.
    pub fn ty(&self) -> &SemanticType {
        &self.ty
    }

    /// Number of elements, absent ones included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    /// All elements in order.
    pub fn elements(&self) -> &[Option<Block>] {
        &self.elements
    }

    /// Present elements in order.
    pub fn present(&self) -> impl Iterator<Item = &Block> {
        self.elements.iter().flatten()
    }

    /// A lazily encoded block of the list type.
    pub fn into_block(self) -> Block {
        let ty = self.ty.clone();
        Block::deferred(ty, self)
    }
}

impl Encodable for List {
    fn determine_length(&self) -> usize {
        intvar::encoded_length(self.elements.len() as u64) + elements_length(&self.elements)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        out.put_intvar(self.elements.len() as u64);
        write_elements(&self.elements, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixed, string};

    fn names() -> SemanticType {
        SemanticType::with_parameters("names@example.org", syntax::list(), vec![syntax::string().clone()])
    }

    #[test]
    fn test_null_preserved_in_order() {
        let list = List::new(
            &names(),
            vec![Some(string::encode("A")), None, Some(string::encode("B"))],
        )
        .unwrap();
        let block = list.into_block();
        assert_eq!(block.bytes(), &[3, 2, 0, b'A', 0, 2, 0, b'B']);

        let decoded = List::decode(&block).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(string::decode(decoded.get(0).unwrap()).unwrap(), "A");
        assert!(decoded.get(1).is_none());
        assert_eq!(string::decode(decoded.get(2).unwrap()).unwrap(), "B");
        assert_eq!(decoded.present().count(), 2);
    }

    #[test]
    fn test_empty_list_is_one_byte() {
        let block = List::new(&names(), Vec::new()).unwrap().into_block();
        assert_eq!(block.bytes(), &[0]);
        assert!(List::decode(&block).unwrap().is_empty());
    }

    #[test]
    fn test_requires_single_parameter() {
        assert!(List::new(syntax::list(), Vec::new()).is_err());
    }

    #[test]
    fn test_rejects_foreign_element() {
        assert!(matches!(
            List::new(&names(), vec![Some(fixed::encode(1_i8))]),
            Err(EncodingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let surplus = Block::new(names(), vec![1, 2, 0, b'A', 2, 0, b'B']).unwrap();
        assert!(matches!(List::decode(&surplus), Err(EncodingError::TrailingBytes(3))));
        let missing = Block::new(names(), vec![2, 2, 0, b'A']).unwrap();
        assert!(matches!(List::decode(&missing), Err(EncodingError::MissingElement(_))));
    }
}
