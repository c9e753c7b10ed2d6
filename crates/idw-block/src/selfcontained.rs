//! # Self-Contained Envelopes
//!
//! A self-contained block pairs a type identifier with a payload so that a
//! field can hold a value of any type:
//!
//! ```text
//! [len][0x00 identifier UTF-8][len][payload]
//! ```
//!
//! Decoding resolves the identifier through a [`TypeRegistry`] and retypes
//! the payload slice with the resolved type. The same layout frames messages
//! on a stream: [`read_selfcontained`] consumes exactly one envelope.

use std::io::{Read, Write};

use idw_core::{syntax, EncodingError, SemanticType, TypeRegistry, WireError, DEFAULT_MAX_MESSAGE_SIZE};

use crate::block::{Block, BlockWriter, Encodable};
use crate::intvar;
use crate::string;
use crate::tuple::{element_spans, elements_length, write_elements};

struct SelfContainedWrapper {
    slots: [Option<Block>; 2],
}

impl Encodable for SelfContainedWrapper {
    fn determine_length(&self) -> usize {
        elements_length(&self.slots)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        write_elements(&self.slots, out);
    }
}

/// Wrap `payload` together with its type identifier.
pub fn encode(payload: &Block) -> Block {
    encode_as_unchecked(syntax::selfcontained(), payload)
}

/// Wrap `payload` as a block of a type based on selfcontained.
pub fn encode_as(ty: &SemanticType, payload: &Block) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::selfcontained())?;
    Ok(encode_as_unchecked(ty, payload))
}

fn encode_as_unchecked(ty: &SemanticType, payload: &Block) -> Block {
    let identifier = string::encode(payload.ty().identifier());
    Block::deferred(
        ty.clone(),
        SelfContainedWrapper {
            slots: [Some(identifier), Some(payload.clone())],
        },
    )
}

/// Unwrap a self-contained block, typing the payload through `registry`.
pub fn decode(block: &Block, registry: &dyn TypeRegistry) -> Result<Block, EncodingError> {
    block.expect_type(syntax::selfcontained())?;
    let spans = element_spans(block.bytes(), 0)?;
    let (identifier, payload) = match spans.as_slice() {
        [Some(identifier), Some(payload)] => (*identifier, *payload),
        [_, _] => {
            return Err(EncodingError::MissingElement(
                "self-contained identifier or payload".into(),
            ))
        }
        other => {
            return Err(EncodingError::Arity {
                type_id: block.ty().identifier().to_string(),
                declared: 2,
                found: other.len(),
            })
        }
    };
    let identifier = Block::slice(syntax::string().clone(), block, identifier.0, identifier.1)?;
    let ty = registry.resolve(string::decode(&identifier)?)?;
    Block::slice(ty, block, payload.0, payload.1)
}

/// Read exactly one self-contained envelope from `reader` and return its
/// payload, typed through `registry`. Envelopes larger than
/// [`DEFAULT_MAX_MESSAGE_SIZE`] are rejected.
pub fn read_selfcontained<R: Read + ?Sized>(
    reader: &mut R,
    registry: &dyn TypeRegistry,
) -> Result<Block, WireError> {
    read_selfcontained_with_limit(reader, registry, DEFAULT_MAX_MESSAGE_SIZE)
}

/// [`read_selfcontained`] with an explicit cap on the envelope size, usually
/// [`WireConfig::max_message_size`](idw_core::WireConfig::max_message_size).
///
/// Length prefixes are checked against `limit` before anything is buffered,
/// and the buffer only grows with bytes actually received.
pub fn read_selfcontained_with_limit<R: Read + ?Sized>(
    reader: &mut R,
    registry: &dyn TypeRegistry,
    limit: usize,
) -> Result<Block, WireError> {
    let mut raw = Vec::new();
    for _ in 0..2 {
        let (length, prefix) = intvar::read(reader)?;
        if length == 0 {
            return Err(EncodingError::MissingElement(
                "self-contained identifier or payload".into(),
            )
            .into());
        }
        let size = ((raw.len() + prefix.len()) as u64).saturating_add(length);
        if size > limit as u64 {
            tracing::warn!(size, limit, "rejected oversized self-contained envelope");
            return Err(EncodingError::TooLarge { size, limit }.into());
        }
        raw.extend_from_slice(&prefix);
        let start = raw.len();
        Read::take(&mut *reader, length).read_to_end(&mut raw)?;
        let received = raw.len() - start;
        if (received as u64) < length {
            return Err(EncodingError::Truncated {
                needed: length as usize,
                available: received,
            }
            .into());
        }
    }
    let envelope = Block::new(syntax::selfcontained().clone(), raw)?;
    Ok(decode(&envelope, registry)?)
}

/// Write `payload` to `writer` as one self-contained envelope.
pub fn write_selfcontained<W: Write + ?Sized>(writer: &mut W, payload: &Block) -> Result<(), WireError> {
    encode(payload).write_to(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixed, tuple::Tuple};
    use idw_core::MemoryTypeRegistry;
    use std::io::Cursor;

    fn point() -> SemanticType {
        SemanticType::with_parameters(
            "point@example.org",
            syntax::tuple(),
            vec![syntax::int32().clone(), syntax::int32().clone()],
        )
    }

    fn registry() -> MemoryTypeRegistry {
        MemoryTypeRegistry::new().with(point())
    }

    fn sample() -> Block {
        Tuple::new(&point(), vec![Some(fixed::encode(3_i32)), Some(fixed::encode(-4_i32))])
            .unwrap()
            .into_block()
    }

    #[test]
    fn test_payload_retyped_on_decode() {
        let envelope = Block::new(syntax::selfcontained().clone(), encode(&sample()).to_vec()).unwrap();
        let payload = decode(&envelope, &registry()).unwrap();
        assert_eq!(payload.ty(), &point());
        assert_eq!(payload, sample());
        let decoded = Tuple::decode(&payload).unwrap();
        assert_eq!(fixed::decode::<i32>(decoded.get(1).unwrap()).unwrap(), -4);
    }

    #[test]
    fn test_unknown_identifier() {
        let envelope = encode(&sample());
        assert!(matches!(
            decode(&envelope, &MemoryTypeRegistry::new()),
            Err(EncodingError::UnknownType(id)) if id == "point@example.org"
        ));
    }

    #[test]
    fn test_stream_framing_consumes_one_envelope() {
        let mut stream = Vec::new();
        write_selfcontained(&mut stream, &sample()).unwrap();
        write_selfcontained(&mut stream, &fixed::encode(7_i64)).unwrap();
        let mut cursor = Cursor::new(stream);

        let first = read_selfcontained(&mut cursor, &registry()).unwrap();
        assert_eq!(first, sample());
        let second = read_selfcontained(&mut cursor, &registry()).unwrap();
        assert_eq!(fixed::decode::<i64>(&second).unwrap(), 7);
        assert!(matches!(
            read_selfcontained(&mut cursor, &registry()),
            Err(WireError::Io(_))
        ));
    }

    #[test]
    fn test_stream_truncated_payload() {
        let bytes = encode(&sample()).to_vec();
        let mut cursor = Cursor::new(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            read_selfcontained(&mut cursor, &registry()),
            Err(WireError::InvalidEncoding(EncodingError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_huge_length_prefix_rejected_before_buffering() {
        // An 8-byte intvar announcing roughly 2^61 bytes, followed by two bytes.
        let mut cursor = Cursor::new([0xE0, 0, 0, 0, 0, 0, 0, 0, b'a', b'b']);
        assert!(matches!(
            read_selfcontained(&mut cursor, &MemoryTypeRegistry::new()),
            Err(WireError::InvalidEncoding(EncodingError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_configured_limit_applies_to_whole_envelope() {
        let bytes = encode(&sample()).to_vec();
        let exact = read_selfcontained_with_limit(&mut Cursor::new(&bytes), &registry(), bytes.len()).unwrap();
        assert_eq!(exact, sample());
        assert!(matches!(
            read_selfcontained_with_limit(&mut Cursor::new(&bytes), &registry(), bytes.len() - 1),
            Err(WireError::InvalidEncoding(EncodingError::TooLarge { .. }))
        ));
    }
}
