#![deny(missing_docs)]

//! # idw-block — Typed Binary Blocks
//!
//! A [`Block`] is a semantic type plus bytes. The bytes either exist already
//! (an allocated span, possibly a zero-copy slice of a parent) or are still
//! owned by a wrapper that knows its encoded length and writes itself on
//! first access. Composite values therefore cost nothing to build and are
//! encoded exactly once, directly into the parent's buffer when nested.
//!
//! ## Wrappers
//!
//! | Module            | Syntactic type      | Layout                                        |
//! |-------------------|---------------------|-----------------------------------------------|
//! | [`boolean`]       | `boolean`           | `0x00` / `0x01`                               |
//! | [`fixed`]         | `int8` .. `int64`   | big-endian, exact width                       |
//! | [`integer`]       | `integer`           | minimal two's complement, big-endian          |
//! | [`intvar`]        | `intvar`            | 1/2/4/8 bytes, length in the top two bits     |
//! | [`bytes`]         | `bytes`             | `0x00` + payload                              |
//! | [`string`]        | `string`            | `0x00` + UTF-8                                |
//! | [`tuple`]         | `tuple`             | one length-prefixed slot per parameter        |
//! | [`list`]          | `list`              | intvar count + length-prefixed slots          |
//! | [`selfcontained`] | `selfcontained`     | type identifier slot + payload slot           |
//! | [`compression`]   | `compression`       | algorithm byte + payload                      |
//! | [`encryption`]    | `encryption`        | `(time, recipient?, key?, iv?, element)`      |
//!
//! ## Invariants
//!
//! - A present block is never empty. Absent tuple and list elements are a
//!   zero length slot, which is why bytes and strings carry a leading `0x00`.
//! - Decoders assign types from context. Only self-contained envelopes carry
//!   a type identifier on the wire.
//! - Two blocks are equal when their type identifiers and bytes are equal.

pub mod block;
pub mod boolean;
pub mod bytes;
pub mod compression;
pub mod encryption;
pub mod fixed;
pub mod integer;
pub mod intvar;
pub mod list;
pub mod selfcontained;
pub mod string;
pub mod tuple;

pub use block::{Block, BlockWriter, Encodable, Span};
pub use compression::Algorithm;
pub use encryption::{Envelope, Mode};
pub use list::List;
pub use selfcontained::{read_selfcontained, read_selfcontained_with_limit, write_selfcontained};
pub use tuple::Tuple;
