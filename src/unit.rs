use crate::{
    arena::{Arena, Region},
    backend::Registry,
    compress_type::Algorithm,
    cursor::Cursor,
    error::{CompressionError, Error, Result},
};

/// One field's raw bytes, paired with the algorithm that compresses them (or, after decoding,
/// the algorithm that had compressed them).
///
/// The raw bytes are always exactly one complete MessagePack value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionUnit<'a> {
    algorithm: Algorithm,
    raw: &'a [u8],
}

impl<'a> CompressionUnit<'a> {
    /// Create a unit over `raw`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidFieldSpan`] if `raw` is not exactly one complete value.
    pub fn new(algorithm: Algorithm, raw: &'a [u8]) -> Result<Self> {
        let mut cursor = Cursor::new(raw);
        match cursor.skip_value() {
            Ok(value) if value.len() == raw.len() => Ok(Self { algorithm, raw }),
            Ok(value) => Err(Error::InvalidFieldSpan {
                span: raw.len(),
                value: Some(value.len()),
            }),
            Err(_) => Err(Error::InvalidFieldSpan {
                span: raw.len(),
                value: None,
            }),
        }
    }

    /// Build a unit from a span a [`Cursor`] has already verified.
    pub(crate) fn from_value(algorithm: Algorithm, raw: &'a [u8]) -> Self {
        Self { algorithm, raw }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn raw_size(&self) -> usize {
        self.raw.len()
    }

    /// Learn the exact compressed size by compressing into scratch memory and throwing the
    /// result away.
    ///
    /// Paired with [`compress_into`][Self::compress_into], this compresses the field twice: once
    /// to size the destination, once to fill it. Callers that can keep the scratch output alive
    /// (the field walker does) should compress once and copy instead.
    pub fn predict_compressed_size(&self, registry: &Registry, arena: &mut Arena) -> Result<usize> {
        let mut scope = arena.scope();
        let region = self.compress_to_region(registry, &mut scope)?;
        Ok(region.len())
    }

    /// Compress into `dst`, returning the number of bytes written. `dst` should be sized by
    /// [`predict_compressed_size`][Self::predict_compressed_size].
    pub fn compress_into(
        &self,
        registry: &Registry,
        arena: &mut Arena,
        dst: &mut [u8],
    ) -> Result<usize> {
        let mut scope = arena.scope();
        let region = self.compress_to_region(registry, &mut scope)?;
        let compressed = scope.bytes(region);
        if dst.len() < compressed.len() {
            return Err(Error::Backend(CompressionError::DestinationTooSmall {
                needed: compressed.len(),
                actual: dst.len(),
            }));
        }
        dst[..compressed.len()].copy_from_slice(compressed);
        Ok(compressed.len())
    }

    /// Compress into a fresh arena region that holds exactly the compressed bytes. The region
    /// lives until the caller's arena scope ends.
    pub(crate) fn compress_to_region(&self, registry: &Registry, arena: &mut Arena) -> Result<Region> {
        let backend = registry.get(self.algorithm);
        let region = arena.alloc(backend.bound(self.raw.len()))?;
        let written = backend.compress(self.raw, arena.bytes_mut(region))?;
        Ok(arena.trim(region, written))
    }
}

/// Decompress a payload written by `algorithm` into a fresh arena region of exactly the raw size
/// the payload declares. On failure, nothing stays allocated.
pub(crate) fn decompress_to_region(
    registry: &Registry,
    algorithm: Algorithm,
    payload: &[u8],
    arena: &mut Arena,
) -> Result<Region> {
    let backend = registry.get(algorithm);
    let raw_size = backend
        .decompressed_size(payload)
        .map_err(|e| Error::Format(format!("{} payload: {}", algorithm, e)))?;
    let watermark = arena.watermark();
    let region = arena.alloc(raw_size)?;
    if let Err(e) = backend.decompress(payload, arena.bytes_mut(region)) {
        arena.truncate(watermark);
        return Err(Error::Format(format!("{} payload: {}", algorithm, e)));
    }
    Ok(region)
}
