//! The extension wrapper that carries a compressed field.
//!
//! A compressed field is a MessagePack extension of type [`MP_COMPRESSION`]:
//!
//! ```text
//! ext header (type = MP_COMPRESSION, length = L) | algorithm tag (1 byte) | payload (L - 1 bytes)
//! ```
//!
//! A field is only wrapped when the whole wrapped form is strictly smaller than the raw field.
//! Otherwise it is written as-is (or, with [`FallbackMode::TaggedNone`], wrapped with the `none`
//! tag around the raw bytes). On the decoding side, anything that isn't an `MP_COMPRESSION`
//! extension is a plain value and comes back unchanged.

use crate::{
    arena::{Arena, Region},
    backend::Registry,
    compress_type::Algorithm,
    config::FallbackMode,
    cursor::Cursor,
    error::{Error, Result},
    marker::{encode_ext_marker, sizeof_ext},
    unit::{decompress_to_region, CompressionUnit},
    MP_COMPRESSION,
};

/// Size of a compression block holding a `payload_len`-byte payload.
pub fn sizeof_block(payload_len: usize) -> usize {
    sizeof_ext(1 + payload_len)
}

/// How a field will be written, decided once its compressed size is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Plan {
    /// Write the field unchanged.
    Raw,
    /// Wrap the raw field under the `none` tag.
    TaggedNone,
    /// Wrap compressed bytes held in an arena region.
    Compressed {
        algorithm: Algorithm,
        payload: Region,
    },
}

impl Plan {
    /// Compress the unit into `arena` and decide how it should be written. A compressed payload
    /// stays allocated until the caller's arena scope ends.
    pub(crate) fn new(registry: &Registry, unit: &CompressionUnit, arena: &mut Arena) -> Result<Self> {
        if unit.algorithm() != Algorithm::None {
            let watermark = arena.watermark();
            let payload = unit.compress_to_region(registry, arena)?;
            if sizeof_block(payload.len()) < unit.raw_size() {
                return Ok(Plan::Compressed {
                    algorithm: unit.algorithm(),
                    payload,
                });
            }
            arena.truncate(watermark);
        }
        Ok(Self::fallback(registry))
    }

    fn fallback(registry: &Registry) -> Self {
        match registry.fallback() {
            FallbackMode::Unwrapped => Plan::Raw,
            FallbackMode::TaggedNone => Plan::TaggedNone,
        }
    }

    pub(crate) fn encoded_size(&self, raw_size: usize) -> usize {
        match self {
            Plan::Raw => raw_size,
            Plan::TaggedNone => sizeof_block(raw_size),
            Plan::Compressed { payload, .. } => sizeof_block(payload.len()),
        }
    }

    pub(crate) fn write(&self, raw: &[u8], arena: &Arena, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Plan::Raw => buf.extend_from_slice(raw),
            Plan::TaggedNone => {
                encode_ext_marker(buf, MP_COMPRESSION, 1 + raw.len())?;
                buf.push(Algorithm::None.tag());
                buf.extend_from_slice(raw);
            }
            Plan::Compressed { algorithm, payload } => {
                encode_ext_marker(buf, MP_COMPRESSION, 1 + payload.len())?;
                buf.push(algorithm.tag());
                buf.extend_from_slice(arena.bytes(*payload));
            }
        }
        Ok(())
    }
}

/// Exact number of bytes [`encode`] will produce for `unit`, computed without writing them.
/// This compresses the field into scratch memory to learn its size.
pub fn sizeof_encoded(registry: &Registry, unit: &CompressionUnit, arena: &mut Arena) -> Result<usize> {
    if unit.algorithm() == Algorithm::None {
        return Ok(Plan::fallback(registry).encoded_size(unit.raw_size()));
    }
    let compressed = unit.predict_compressed_size(registry, arena)?;
    if sizeof_block(compressed) < unit.raw_size() {
        Ok(sizeof_block(compressed))
    } else {
        Ok(Plan::fallback(registry).encoded_size(unit.raw_size()))
    }
}

/// Append the encoded form of `unit` to `buf`, returning the number of bytes written.
pub fn encode(
    registry: &Registry,
    unit: &CompressionUnit,
    arena: &mut Arena,
    buf: &mut Vec<u8>,
) -> Result<usize> {
    let mut scope = arena.scope();
    let plan = Plan::new(registry, unit, &mut scope)?;
    let start = buf.len();
    buf.reserve(plan.encoded_size(unit.raw_size()));
    plan.write(unit.raw(), &scope, buf)?;
    Ok(buf.len() - start)
}

/// The next value, as found on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Decoded<'a> {
    /// Not a compression block; the value's bytes, untouched.
    Plain(&'a [u8]),
    /// A decompressed field in an arena region.
    Decompressed { algorithm: Algorithm, raw: Region },
}

/// A compression block's algorithm tag and payload.
struct Block<'a> {
    algorithm: Algorithm,
    payload: &'a [u8],
}

/// If the next value is a compression block, consume its header and body and return them.
/// Returns `None` without consuming anything for any other value.
fn read_block<'a>(registry: &Registry, cursor: &mut Cursor<'a>) -> Result<Option<Block<'a>>> {
    // A truncated extension header is left for `skip_value` to report
    if cursor.peek_ext_type().ok().flatten() != Some(MP_COMPRESSION) {
        return Ok(None);
    }
    let (_, len) = cursor
        .read_ext_header()
        .map_err(|e| Error::Format(format!("Compression block header: {}", e)))?;
    if len == 0 {
        return Err(Error::Format(
            "Compression block has no algorithm tag".to_string(),
        ));
    }
    let available = cursor.remaining().len();
    let body = cursor.take(len, "get compression block").map_err(|_| {
        Error::Format(format!(
            "Compression block declares {} bytes, but only {} remain",
            len, available
        ))
    })?;
    let tag = body[0];
    let backend = registry
        .by_tag(tag)
        .ok_or_else(|| Error::Format(format!("Unknown compression algorithm tag {}", tag)))?;
    Ok(Some(Block {
        algorithm: backend.algorithm(),
        payload: &body[1..],
    }))
}

/// Decode the next value. Compression blocks are decompressed into `arena`; everything else is
/// passed through. On error the cursor is left where it was and nothing stays allocated.
pub(crate) fn decode_raw<'a>(
    registry: &Registry,
    cursor: &mut Cursor<'a>,
    arena: &mut Arena,
) -> Result<Decoded<'a>> {
    let start = cursor.position();
    let result = decode_inner(registry, cursor, arena);
    if result.is_err() {
        cursor.rewind(start);
    }
    result
}

fn decode_inner<'a>(
    registry: &Registry,
    cursor: &mut Cursor<'a>,
    arena: &mut Arena,
) -> Result<Decoded<'a>> {
    let Some(block) = read_block(registry, cursor)? else {
        return Ok(Decoded::Plain(cursor.skip_value()?));
    };
    let watermark = arena.watermark();
    let raw = decompress_to_region(registry, block.algorithm, block.payload, arena)?;
    let mut check = Cursor::new(arena.bytes(raw));
    let complete = matches!(check.skip_value(), Ok(v) if v.len() == raw.len());
    if !complete {
        arena.truncate(watermark);
        return Err(Error::Format(
            "Decompressed field isn't exactly one value".to_string(),
        ));
    }
    Ok(Decoded::Decompressed {
        algorithm: block.algorithm,
        raw,
    })
}

/// Decode the next value into a [`CompressionUnit`]. A compressed field comes back with the
/// algorithm it was stored under and its raw bytes in `arena`; any other value comes back as an
/// [`Algorithm::None`] unit over the input bytes.
///
/// # Errors
///
/// Fails with [`Error::Format`] for an unknown algorithm tag, inconsistent lengths, or a payload
/// that fails to decompress to its declared size. The cursor doesn't move on failure.
pub fn decode<'s, 'a: 's>(
    registry: &Registry,
    cursor: &mut Cursor<'a>,
    arena: &'s mut Arena,
) -> Result<CompressionUnit<'s>> {
    match decode_raw(registry, cursor, arena)? {
        Decoded::Plain(raw) => Ok(CompressionUnit::from_value(Algorithm::None, raw)),
        Decoded::Decompressed { algorithm, raw } => {
            let arena: &'s Arena = arena;
            Ok(CompressionUnit::from_value(algorithm, arena.bytes(raw)))
        }
    }
}

/// Size of the next value once decoded, read from headers alone. Nothing is decompressed and the
/// cursor doesn't move.
pub fn sizeof_decoded(registry: &Registry, cursor: &Cursor) -> Result<usize> {
    let mut peek = cursor.clone();
    match read_block(registry, &mut peek)? {
        None => Ok(peek.skip_value()?.len()),
        Some(block) => registry
            .get(block.algorithm)
            .decompressed_size(block.payload)
            .map_err(|e| Error::Format(format!("{} payload: {}", block.algorithm, e))),
    }
}
