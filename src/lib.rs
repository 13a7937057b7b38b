//! field-pack compresses individual fields of MessagePack records while keeping the record
//! self-describing. A record is a MessagePack array; each field selected by a [`FieldPolicy`] is
//! replaced, in place, by an extension block carrying the compressed bytes of that field. Fields
//! that don't shrink are left exactly as they were.
//!
//! The crate provides:
//!
//! - A registry of compression backends: a no-op "none" backend, zstd, and lz4. Each backend
//!     can bound, compress, decompress, and report the raw size of a payload.
//! - [`CompressionUnit`], one field's raw bytes plus the algorithm that will compress them.
//! - The extension-wrapper codec in [`codec`], the sole authority on the wire format:
//!     - `ext(MP_COMPRESSION, L) | algorithm tag (1 byte) | payload (L - 1 bytes)`
//!     - A field is only wrapped if the wrapped form is strictly smaller than the raw field.
//!     - Decoding is driven by the wire bytes alone. Anything that isn't a compression block is
//!         a plain value and is passed through.
//! - The field walker ([`compress_fields`] and [`decompress_fields`]), which sizes the output in
//!     a single pass and fills an exactly-allocated buffer.
//! - Diagnostic printing in [`print`] that renders a compressed field exactly as it would render
//!     the decompressed one.
//!
//! All scratch memory comes from an explicit [`Arena`], which is rewound to its entry watermark
//! when each call returns, whether it succeeds or fails.
//!
//! ```
//! use field_pack::{compress_fields, decompress_fields, Algorithm, Arena, FieldSchema, Registry};
//!
//! // A record of [1, "aaaa...aaaa"] where the second field should be zstd-compressed
//! let mut record = vec![0x92, 0x01, 0xda, 0x02, 0x00];
//! record.extend_from_slice(&[b'a'; 512]);
//!
//! let registry = Registry::default();
//! let schema = FieldSchema::new(vec![Algorithm::None, Algorithm::Zstd]);
//! let mut arena = Arena::new();
//!
//! let packed = compress_fields(&registry, &schema, &record, &mut arena).unwrap();
//! assert!(packed.len() < record.len());
//! let unpacked = decompress_fields(&registry, &packed, &mut arena).unwrap();
//! assert_eq!(unpacked, record);
//! ```

mod arena;
pub mod backend;
pub mod codec;
mod compress_type;
mod config;
mod cursor;
mod error;
mod fields;
pub mod marker;
mod policy;
pub mod print;
mod unit;

#[cfg(doc)]
#[path = "../spec/mod.rs"]
pub mod spec;

pub use self::arena::{Arena, ArenaScope, Region};
pub use self::backend::{Backend, Lz4Backend, NoneBackend, Registry, ZstdBackend};
pub use self::compress_type::Algorithm;
pub use self::config::{CompressionConfig, FallbackMode};
pub use self::cursor::{Cursor, Element};
pub use self::error::{CompressionError, Error, Result};
pub use self::fields::{compress_fields, decompress_fields};
pub use self::policy::{FieldPolicy, FieldSchema};
pub use self::unit::CompressionUnit;

/// The MessagePack extension type reserved for compressed fields.
pub const MP_COMPRESSION: i8 = 5;

/// The default limit on how much scratch memory an [`Arena`] will hand out: 16 MiB.
pub const DEFAULT_ARENA_LIMIT: usize = 1usize << 24;

/// The maximum nesting depth the diagnostic printer will descend into.
pub const MAX_DEPTH: usize = 100;
