//! # Tuples
//!
//! A tuple holds one optional element per parameter of its semantic type.
//! Every parameter slot is written as an intvar length followed by the
//! element bytes, with length `0` marking an absent element:
//!
//! ```text
//! [len₀][element₀][len₁][element₁] ... [lenₖ][elementₖ]
//! ```
//!
//! ## Invariants
//!
//! - Encoding writes every slot, so it is deterministic for a given element
//!   sequence. Signatures hash tuples, so this matters.
//! - Decoding accepts fewer slots than parameters (the missing trailing
//!   elements are absent) but rejects more, and rejects bytes after the last
//!   slot.
//! - Each present element is based on its parameter. Decoded elements are
//!   zero-copy slices typed with the parameter.
//!
//! The slot helpers ([`elements_length`], [`write_elements`],
//! [`read_slot`], [`element_spans`]) are shared with lists and the envelopes.

use idw_core::{syntax, EncodingError, SemanticType};

use crate::block::{Block, BlockWriter, Encodable};
use crate::intvar;

/// A tuple value: a tuple type and one optional element per parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    ty: SemanticType,
    elements: Vec<Option<Block>>,
}

impl Tuple {
    /// Build a tuple, padding missing trailing elements with absent.
    ///
    /// # Errors
    ///
    /// - [`EncodingError::TypeMismatch`] if `ty` is not based on tuple or an
    ///   element is not based on its parameter.
    /// - [`EncodingError::Arity`] for more elements than parameters.
    pub fn new(ty: &SemanticType, mut elements: Vec<Option<Block>>) -> Result<Self, EncodingError> {
        ty.check_based_on(syntax::tuple())?;
        let parameters = ty.parameters();
        if parameters.is_empty() {
            return Err(EncodingError::InvalidValue(format!(
                "tuple type {ty} declares no parameters"
            )));
        }
        if elements.len() > parameters.len() {
            return Err(EncodingError::Arity {
                type_id: ty.identifier().to_string(),
                declared: parameters.len(),
                found: elements.len(),
            });
        }
        for (element, parameter) in elements.iter().zip(parameters) {
            if let Some(element) = element {
                element.expect_type(parameter)?;
            }
        }
        elements.resize(parameters.len(), None);
        Ok(Self {
            ty: ty.clone(),
            elements,
        })
    }

    /// Decode a tuple block against the parameters of its type.
    pub fn decode(block: &Block) -> Result<Self, EncodingError> {
        block.expect_type(syntax::tuple())?;
        let parameters = block.ty().parameters();
        let elements = decode_elements(block, parameters)?;
        Ok(Self {
            ty: block.ty().clone(),
            elements,
        })
    }

    /// The tuple type.
    pub fn ty(&self) -> &SemanticType {
        &self.ty
    }

    /// Number of slots (the parameter count).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True for a tuple without slots, which construction never produces.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    /// True if the element at `index` is absent.
    pub fn is_element_null(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    /// The element at `index`, or [`EncodingError::MissingElement`] naming it.
    pub fn require(&self, index: usize, name: &str) -> Result<&Block, EncodingError> {
        self.get(index).ok_or_else(|| {
            EncodingError::MissingElement(format!("{name} in {}", self.ty.identifier()))
        })
    }

    /// All slots in order.
    pub fn elements(&self) -> &[Option<Block>] {
        &self.elements
    }

    /// A lazily encoded block of the tuple type.
    pub fn into_block(self) -> Block {
        let ty = self.ty.clone();
        Block::deferred(ty, self)
    }
}

impl Encodable for Tuple {
    fn determine_length(&self) -> usize {
        elements_length(&self.elements)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        write_elements(&self.elements, out);
    }
}

/// Encoded length of a sequence of length-prefixed slots.
pub fn elements_length(elements: &[Option<Block>]) -> usize {
    elements
        .iter()
        .map(|element| match element {
            Some(block) => {
                let length = block.len();
                intvar::encoded_length(length as u64) + length
            }
            None => 1,
        })
        .sum()
}

/// Write a sequence of length-prefixed slots.
pub fn write_elements(elements: &[Option<Block>], out: &mut BlockWriter<'_>) {
    for element in elements {
        match element {
            Some(block) => {
                out.put_intvar(block.len() as u64);
                out.put_block(block);
            }
            None => out.put_intvar(0),
        }
    }
}

/// Read the length-prefixed slot at `position` in `bytes`. Returns the
/// slot's `(offset, length)` (or `None` if absent) and the position after it.
pub fn read_slot(bytes: &[u8], position: usize) -> Result<(Option<(usize, usize)>, usize), EncodingError> {
    let (length, prefix) = intvar::decode(&bytes[position..])?;
    let start = position + prefix;
    if length == 0 {
        return Ok((None, start));
    }
    let length = usize::try_from(length)
        .map_err(|_| EncodingError::InvalidValue(format!("element length {length}")))?;
    let available = bytes.len() - start;
    if length > available {
        return Err(EncodingError::Truncated {
            needed: length,
            available,
        });
    }
    Ok((Some((start, length)), start + length))
}

/// Split `bytes` from `offset` to the end into slots.
pub fn element_spans(bytes: &[u8], offset: usize) -> Result<Vec<Option<(usize, usize)>>, EncodingError> {
    let mut spans = Vec::new();
    let mut position = offset;
    while position < bytes.len() {
        let (span, next) = read_slot(bytes, position)?;
        spans.push(span);
        position = next;
    }
    Ok(spans)
}

/// Decode the slots of `block` as elements typed by `parameters`.
pub fn decode_elements(block: &Block, parameters: &[SemanticType]) -> Result<Vec<Option<Block>>, EncodingError> {
    let spans = element_spans(block.bytes(), 0)?;
    if spans.len() > parameters.len() {
        return Err(EncodingError::Arity {
            type_id: block.ty().identifier().to_string(),
            declared: parameters.len(),
            found: spans.len(),
        });
    }
    let mut elements = spans
        .into_iter()
        .zip(parameters)
        .map(|(span, parameter)| {
            span.map(|(offset, length)| Block::slice(parameter.clone(), block, offset, length))
                .transpose()
        })
        .collect::<Result<Vec<_>, _>>()?;
    elements.resize(parameters.len(), None);
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixed, string};

    fn triple() -> SemanticType {
        SemanticType::with_parameters(
            "triple@example.org",
            syntax::tuple(),
            vec![
                syntax::string().clone(),
                syntax::int64().clone(),
                syntax::string().clone(),
            ],
        )
    }

    #[test]
    fn test_middle_element_null() {
        let tuple = Tuple::new(
            &triple(),
            vec![Some(string::encode("a")), None, Some(string::encode("c"))],
        )
        .unwrap();
        let block = tuple.into_block();
        assert_eq!(block.bytes(), &[2, 0, b'a', 0, 2, 0, b'c']);

        let decoded = Tuple::decode(&Block::new(triple(), block.to_vec()).unwrap()).unwrap();
        assert!(!decoded.is_element_null(0));
        assert!(decoded.is_element_null(1));
        assert!(!decoded.is_element_null(2));
        assert_eq!(string::decode(decoded.get(0).unwrap()).unwrap(), "a");
        assert_eq!(string::decode(decoded.get(2).unwrap()).unwrap(), "c");
    }

    #[test]
    fn test_short_tuple_pads_with_absent() {
        let block = Block::new(triple(), vec![2, 0, b'x']).unwrap();
        let decoded = Tuple::decode(&block).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded.is_element_null(1));
        assert!(decoded.is_element_null(2));
        assert!(matches!(decoded.require(2, "third"), Err(EncodingError::MissingElement(_))));
    }

    #[test]
    fn test_surplus_elements_rejected() {
        let block = Block::new(triple(), vec![0, 0, 0, 0]).unwrap();
        assert!(matches!(
            Tuple::decode(&block),
            Err(EncodingError::Arity { declared: 3, found: 4, .. })
        ));
        let too_many = vec![None, None, None, None];
        assert!(Tuple::new(&triple(), too_many).is_err());
    }

    #[test]
    fn test_element_type_checked_on_construction() {
        let wrong = vec![Some(fixed::encode(1_i64))];
        assert!(matches!(
            Tuple::new(&triple(), wrong),
            Err(EncodingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_element_rejected() {
        let block = Block::new(triple(), vec![5, 0, b'a']).unwrap();
        assert!(matches!(Tuple::decode(&block), Err(EncodingError::Truncated { .. })));
    }

    #[test]
    fn test_decoded_elements_typed_by_parameter() {
        let tuple = Tuple::new(&triple(), vec![None, Some(fixed::encode(7_i64))]).unwrap();
        let decoded = Tuple::decode(&tuple.into_block()).unwrap();
        assert_eq!(decoded.get(1).unwrap().ty(), syntax::int64());
        assert_eq!(fixed::decode::<i64>(decoded.get(1).unwrap()).unwrap(), 7);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let build = || {
            Tuple::new(&triple(), vec![Some(string::encode("k")), Some(fixed::encode(9_i64))])
                .unwrap()
                .into_block()
        };
        assert_eq!(build().digest(), build().digest());
        assert_eq!(build(), build());
    }
}
