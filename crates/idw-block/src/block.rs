//! # Blocks
//!
//! A [`Block`] is a semantic type plus a byte span. The bytes either exist
//! already (an allocated span over a shared, immutable buffer) or are still
//! owned by a pending [`Encodable`] wrapper that produces them on first
//! access. Sub-blocks of a composite block are zero-copy slices of the
//! parent's buffer.
//!
//! ## Invariants
//!
//! - A block is never empty. Absence is the zero-length marker inside a
//!   tuple or list, never an empty block.
//! - `offset + length <= buffer.len()` for every span.
//! - The pending → allocated transition happens at most once, guarded by a
//!   `OnceLock`, and the wrapper is released once it has run. After that the
//!   bytes never change, so blocks are `Send + Sync` and cheap to clone.
//! - A type can only be narrowed to a type based on it, never widened.
//!
//! ## Contract Violations
//!
//! A wrapper that writes a different number of bytes than
//! [`Encodable::determine_length`] announced is a bug in the wrapper, not bad
//! input, and panics.

use std::io::{self, Cursor, Write};
use std::sync::{Arc, OnceLock};

use idw_core::{BlockDigest, EncodingError, SemanticType};
use parking_lot::Mutex;

/// A value that knows its encoded length and how to write itself.
pub trait Encodable: Send + Sync {
    /// The exact number of bytes [`encode`](Self::encode) writes. Must be positive.
    fn determine_length(&self) -> usize;

    /// Write exactly [`determine_length`](Self::determine_length) bytes.
    fn encode(&self, out: &mut BlockWriter<'_>);
}

// ---------------------------------------------------------------------------
// BlockWriter
// ---------------------------------------------------------------------------

/// A cursor over the target bytes of an [`Encodable::encode`] call.
///
/// Writing past the end panics, and so does finishing short of it.
pub struct BlockWriter<'a> {
    out: &'a mut [u8],
    position: usize,
}

impl<'a> BlockWriter<'a> {
    pub(crate) fn new(out: &'a mut [u8]) -> Self {
        Self { out, position: 0 }
    }

    /// Append one byte.
    pub fn put_u8(&mut self, byte: u8) {
        self.out[self.position] = byte;
        self.position += 1;
    }

    /// Append raw bytes.
    pub fn put(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.out[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    /// Append the bytes of a block, encoding it straight into place if it is pending.
    pub fn put_block(&mut self, block: &Block) {
        let end = self.position + block.len();
        block.write_into(&mut self.out[self.position..end]);
        self.position = end;
    }

    /// Append an intvar.
    pub fn put_intvar(&mut self, value: u64) {
        crate::intvar::write(value, self);
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.position
    }

    fn finish(self, announced: usize) {
        assert_eq!(
            self.position, announced,
            "wrapper announced {announced} bytes but wrote {}",
            self.position
        );
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// An allocated byte range inside a shared buffer.
#[derive(Clone)]
pub struct Span {
    buffer: Arc<[u8]>,
    offset: usize,
    length: usize,
}

impl AsRef<[u8]> for Span {
    fn as_ref(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

struct Content {
    encoded: OnceLock<Span>,
    pending: Mutex<Option<Box<dyn Encodable>>>,
    length: OnceLock<usize>,
    digest: OnceLock<BlockDigest>,
}

/// A typed, immutable, possibly lazily encoded byte span.
#[derive(Clone)]
pub struct Block {
    ty: SemanticType,
    content: Arc<Content>,
}

impl Block {
    /// An allocated block over `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::InvalidValue`] for empty input.
    pub fn new(ty: SemanticType, bytes: impl Into<Arc<[u8]>>) -> Result<Self, EncodingError> {
        let buffer: Arc<[u8]> = bytes.into();
        let length = buffer.len();
        if length == 0 {
            return Err(EncodingError::InvalidValue(format!(
                "block of type {ty} must not be empty"
            )));
        }
        Ok(Self::from_span(
            ty,
            Span {
                buffer,
                offset: 0,
                length,
            },
        ))
    }

    /// A zero-copy view of `length` bytes at `offset` inside `parent`.
    pub fn slice(
        ty: SemanticType,
        parent: &Block,
        offset: usize,
        length: usize,
    ) -> Result<Self, EncodingError> {
        if length == 0 {
            return Err(EncodingError::InvalidValue(format!(
                "block of type {ty} must not be empty"
            )));
        }
        let span = parent.span();
        let available = span.length.saturating_sub(offset);
        if length > available {
            return Err(EncodingError::Truncated {
                needed: length,
                available,
            });
        }
        Ok(Self::from_span(
            ty,
            Span {
                buffer: Arc::clone(&span.buffer),
                offset: span.offset + offset,
                length,
            },
        ))
    }

    /// A pending block whose bytes `wrapper` produces on first access.
    pub fn deferred<W: Encodable + 'static>(ty: SemanticType, wrapper: W) -> Self {
        Self {
            ty,
            content: Arc::new(Content {
                encoded: OnceLock::new(),
                pending: Mutex::new(Some(Box::new(wrapper))),
                length: OnceLock::new(),
                digest: OnceLock::new(),
            }),
        }
    }

    /// An allocated block over bytes the caller guarantees are non-empty.
    pub(crate) fn allocated(ty: SemanticType, bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.is_empty(), "block of type {ty} must not be empty");
        let length = bytes.len();
        Self::from_span(
            ty,
            Span {
                buffer: bytes.into(),
                offset: 0,
                length,
            },
        )
    }

    fn from_span(ty: SemanticType, span: Span) -> Self {
        Self {
            ty,
            content: Arc::new(Content {
                encoded: OnceLock::from(span),
                pending: Mutex::new(None),
                length: OnceLock::new(),
                digest: OnceLock::new(),
            }),
        }
    }

    /// The semantic type.
    pub fn ty(&self) -> &SemanticType {
        &self.ty
    }

    /// The encoded length; asks a pending wrapper without encoding.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        if let Some(span) = self.content.encoded.get() {
            return span.length;
        }
        *self.content.length.get_or_init(|| {
            let announced = self.content.pending.lock().as_ref().map(|w| w.determine_length());
            announced.unwrap_or_else(|| self.span().length)
        })
    }

    /// True once the bytes exist.
    pub fn is_encoded(&self) -> bool {
        self.content.encoded.get().is_some()
    }

    /// Run a pending wrapper now. No-op for allocated blocks.
    pub fn encode_if_pending(&self) {
        self.span();
    }

    fn span(&self) -> &Span {
        self.content.encoded.get_or_init(|| {
            let length = self.len();
            assert!(length > 0, "wrapper for {} announced an empty block", self.ty);
            let wrapper = self.content.pending.lock().take();
            let mut buffer = vec![0u8; length];
            match wrapper {
                Some(wrapper) => {
                    let mut writer = BlockWriter::new(&mut buffer);
                    wrapper.encode(&mut writer);
                    writer.finish(length);
                }
                None => unreachable!("block without bytes or pending wrapper"),
            }
            Span {
                buffer: buffer.into(),
                offset: 0,
                length,
            }
        })
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        self.span().as_ref()
    }

    /// The byte at `index`, if in range.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes().get(index).copied()
    }

    /// `length` bytes at `offset`.
    pub fn bytes_at(&self, offset: usize, length: usize) -> Result<&[u8], EncodingError> {
        let bytes = self.bytes();
        let available = bytes.len().saturating_sub(offset);
        if length > available {
            return Err(EncodingError::Truncated {
                needed: length,
                available,
            });
        }
        Ok(&bytes[offset..offset + length])
    }

    /// The encoded bytes as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }

    /// SHA-256 of the encoded bytes, memoized.
    pub fn digest(&self) -> BlockDigest {
        *self
            .content
            .digest
            .get_or_init(|| BlockDigest::of(self.bytes()))
    }

    /// Write the bytes into `out`, which must be exactly [`len`](Self::len)
    /// bytes. A pending block encodes straight into `out` and stays pending.
    pub fn write_into(&self, out: &mut [u8]) {
        let length = self.len();
        assert_eq!(out.len(), length, "target does not match block length");
        if let Some(span) = self.content.encoded.get() {
            out.copy_from_slice(span.as_ref());
            return;
        }
        {
            let pending = self.content.pending.lock();
            if let Some(wrapper) = pending.as_ref() {
                let mut writer = BlockWriter::new(out);
                wrapper.encode(&mut writer);
                writer.finish(length);
                return;
            }
        }
        out.copy_from_slice(self.bytes());
    }

    /// Write the bytes to an `io::Write`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.bytes())
    }

    /// An `io::Read` over the bytes.
    pub fn reader(&self) -> Cursor<Span> {
        Cursor::new(self.span().clone())
    }

    /// The same bytes under a type based on the current one.
    pub fn narrow(&self, ty: &SemanticType) -> Result<Self, EncodingError> {
        ty.check_based_on(&self.ty)?;
        Ok(Self {
            ty: ty.clone(),
            content: Arc::clone(&self.content),
        })
    }

    /// Check that this block's type is based on `ty`.
    pub fn expect_type(&self, ty: &SemanticType) -> Result<(), EncodingError> {
        self.ty.check_based_on(ty)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.bytes() == other.bytes()
    }
}

impl Eq for Block {}

impl std::hash::Hash for Block {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.bytes().hash(state);
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("type", &self.ty.identifier())
            .field("length", &self.len())
            .field("encoded", &self.is_encoded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idw_core::syntax;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        bytes: Vec<u8>,
        calls: Arc<AtomicUsize>,
    }

    impl Encodable for Counting {
        fn determine_length(&self) -> usize {
            self.bytes.len()
        }

        fn encode(&self, out: &mut BlockWriter<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            out.put(&self.bytes);
        }
    }

    struct Liar;

    impl Encodable for Liar {
        fn determine_length(&self) -> usize {
            4
        }

        fn encode(&self, out: &mut BlockWriter<'_>) {
            out.put(&[1, 2]);
        }
    }

    fn hash_of(block: &Block) -> u64 {
        let mut hasher = DefaultHasher::new();
        block.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_empty_block_rejected() {
        assert!(Block::new(syntax::bytes().clone(), Vec::new()).is_err());
    }

    #[test]
    fn test_equal_type_and_bytes_are_equal() {
        let a = Block::new(syntax::bytes().clone(), vec![0, 1, 2]).unwrap();
        let b = Block::new(syntax::bytes().clone(), vec![0, 1, 2]).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_different_type_same_bytes_not_equal() {
        let a = Block::new(syntax::bytes().clone(), vec![0, 1, 2]).unwrap();
        let b = Block::new(syntax::string().clone(), vec![0, 1, 2]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_slice_is_zero_copy_and_bounds_checked() {
        let parent = Block::new(syntax::bytes().clone(), vec![9, 8, 7, 6, 5]).unwrap();
        let child = Block::slice(syntax::int16().clone(), &parent, 1, 2).unwrap();
        assert_eq!(child.bytes(), &[8, 7]);
        assert_eq!(child.ty(), syntax::int16());
        let grandchild = Block::slice(syntax::int8().clone(), &child, 1, 1).unwrap();
        assert_eq!(grandchild.byte(0), Some(7));
        assert!(matches!(
            Block::slice(syntax::bytes().clone(), &parent, 4, 2),
            Err(EncodingError::Truncated { needed: 2, available: 1 })
        ));
        assert!(Block::slice(syntax::bytes().clone(), &parent, 0, 0).is_err());
    }

    #[test]
    fn test_deferred_encodes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let block = Block::deferred(
            syntax::bytes().clone(),
            Counting {
                bytes: vec![0, 42],
                calls: Arc::clone(&calls),
            },
        );
        assert_eq!(block.len(), 2);
        assert!(!block.is_encoded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(block.bytes(), &[0, 42]);
        assert_eq!(block.clone().bytes(), &[0, 42]);
        block.encode_if_pending();
        assert!(block.is_encoded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_write_into_pending_encodes_in_place() {
        let calls = Arc::new(AtomicUsize::new(0));
        let block = Block::deferred(
            syntax::bytes().clone(),
            Counting {
                bytes: vec![0, 1, 2],
                calls: Arc::clone(&calls),
            },
        );
        let mut out = [0u8; 3];
        block.write_into(&mut out);
        assert_eq!(out, [0, 1, 2]);
        assert!(!block.is_encoded());
    }

    #[test]
    fn test_concurrent_readers_share_one_encoding() {
        let calls = Arc::new(AtomicUsize::new(0));
        let block = Block::deferred(
            syntax::bytes().clone(),
            Counting {
                bytes: vec![0; 64],
                calls: Arc::clone(&calls),
            },
        );
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| assert_eq!(block.bytes().len(), 64));
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "announced 4 bytes but wrote 2")]
    fn test_length_mismatch_panics() {
        let block = Block::deferred(syntax::bytes().clone(), Liar);
        block.bytes();
    }

    #[test]
    fn test_narrow_only_to_subtype() {
        let name = SemanticType::based_on("name@example.org", syntax::string());
        let block = Block::new(syntax::string().clone(), vec![0, b'a']).unwrap();
        let narrowed = block.narrow(&name).unwrap();
        assert_eq!(narrowed.ty(), &name);
        assert!(matches!(
            narrowed.narrow(syntax::string()),
            Err(EncodingError::TypeMismatch { .. })
        ));
        assert!(block.narrow(syntax::int8()).is_err());
    }

    #[test]
    fn test_reader_and_write_to() {
        let block = Block::new(syntax::bytes().clone(), vec![0, 1, 2, 3]).unwrap();
        let mut read = Vec::new();
        block.reader().read_to_end(&mut read).unwrap();
        assert_eq!(read, block.to_vec());
        let mut written = Vec::new();
        block.write_to(&mut written).unwrap();
        assert_eq!(written, read);
        assert_eq!(block.bytes_at(1, 2).unwrap(), &[1, 2]);
        assert!(block.bytes_at(3, 2).is_err());
    }
}
