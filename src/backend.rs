//! Compression backends and the registry that maps algorithm tags to them.
//!
//! A backend is a small set of pure functions over byte slices. It never allocates its output;
//! callers size the destination from [`Backend::bound`] (when compressing) or
//! [`Backend::decompressed_size`] (when decompressing) and hand it in. Backends report failures
//! as [`CompressionError`] and never log them.

use crate::{
    compress_type::Algorithm,
    config::{CompressionConfig, FallbackMode},
    error::CompressionError,
};
use byteorder::{ByteOrder, LittleEndian};
use std::{cell::RefCell, convert::TryFrom, fmt};

thread_local! {
    static ZSTD_CCTX: RefCell<zstd_safe::CCtx<'static>> = RefCell::new(zstd_safe::CCtx::create());
    static ZSTD_DCTX: RefCell<zstd_safe::DCtx<'static>> = RefCell::new(zstd_safe::DCtx::create());
}

/// One compression algorithm.
pub trait Backend: Send + Sync + fmt::Debug {
    /// The algorithm this backend implements.
    fn algorithm(&self) -> Algorithm;

    /// Upper bound on the compressed size of `raw_len` bytes.
    fn bound(&self, raw_len: usize) -> usize;

    /// Compress `src` into `dst`, returning the number of bytes written. `dst` must hold at least
    /// [`bound`][Self::bound] bytes.
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CompressionError>;

    /// Read the raw size promised by a compressed payload, without decompressing it.
    fn decompressed_size(&self, payload: &[u8]) -> Result<usize, CompressionError>;

    /// Decompress `payload` into `dst`. Fails unless exactly `dst.len()` bytes are produced.
    fn decompress(&self, payload: &[u8], dst: &mut [u8]) -> Result<(), CompressionError>;
}

fn check_destination(needed: usize, dst: &[u8]) -> Result<(), CompressionError> {
    if dst.len() < needed {
        Err(CompressionError::DestinationTooSmall {
            needed,
            actual: dst.len(),
        })
    } else {
        Ok(())
    }
}

fn check_bound(bound: usize, actual: usize) -> Result<usize, CompressionError> {
    if actual > bound {
        Err(CompressionError::BoundExceeded { bound, actual })
    } else {
        Ok(actual)
    }
}

fn check_size(expected: usize, actual: usize) -> Result<(), CompressionError> {
    if expected != actual {
        Err(CompressionError::SizeMismatch { expected, actual })
    } else {
        Ok(())
    }
}

/// The identity backend: the payload is the raw field.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneBackend;

impl Backend for NoneBackend {
    fn algorithm(&self) -> Algorithm {
        Algorithm::None
    }

    fn bound(&self, raw_len: usize) -> usize {
        raw_len
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CompressionError> {
        check_destination(src.len(), dst)?;
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }

    fn decompressed_size(&self, payload: &[u8]) -> Result<usize, CompressionError> {
        Ok(payload.len())
    }

    fn decompress(&self, payload: &[u8], dst: &mut [u8]) -> Result<(), CompressionError> {
        check_size(dst.len(), payload.len())?;
        dst.copy_from_slice(payload);
        Ok(())
    }
}

/// zstandard backend. Payloads are single standard zstd frames that record their content size
/// and carry a content checksum, so corruption is caught rather than decoded into wrong bytes.
#[derive(Clone, Copy, Debug)]
pub struct ZstdBackend {
    level: i32,
}

impl ZstdBackend {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdBackend {
    fn default() -> Self {
        Self::new(CompressionConfig::default().zstd_level)
    }
}

impl Backend for ZstdBackend {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zstd
    }

    fn bound(&self, raw_len: usize) -> usize {
        zstd_safe::compress_bound(raw_len)
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CompressionError> {
        use zstd_safe::*;
        let bound = self.bound(src.len());
        check_destination(bound, dst)?;
        let dst = &mut dst[..bound];
        let written = ZSTD_CCTX.with_borrow_mut(|ctx| -> Result<usize, CompressionError> {
            ctx.reset(ResetDirective::SessionAndParameters)?;
            ctx.set_parameter(CParameter::CompressionLevel(self.level))?;
            ctx.set_parameter(CParameter::ChecksumFlag(true))?;
            ctx.set_parameter(CParameter::ContentSizeFlag(true))?;
            ctx.set_parameter(CParameter::DictIdFlag(false))?;
            ctx.set_pledged_src_size(Some(src.len() as u64))?;
            Ok(ctx.compress2(dst, src)?)
        })?;
        check_bound(bound, written)
    }

    fn decompressed_size(&self, payload: &[u8]) -> Result<usize, CompressionError> {
        match zstd_safe::get_frame_content_size(payload) {
            Ok(Some(size)) => usize::try_from(size)
                .map_err(|_| CompressionError::Parsing("zstd frame content size is too large")),
            Ok(None) => Err(CompressionError::Parsing(
                "zstd frame doesn't record its content size",
            )),
            Err(_) => Err(CompressionError::Parsing("Couldn't read zstd frame header")),
        }
    }

    fn decompress(&self, payload: &[u8], dst: &mut [u8]) -> Result<(), CompressionError> {
        use zstd_safe::*;
        let expected = dst.len();
        let used = ZSTD_DCTX.with_borrow_mut(|dtx| -> Result<usize, CompressionError> {
            dtx.reset(ResetDirective::SessionAndParameters)?;
            Ok(dtx.decompress(dst, payload)?)
        })?;
        check_size(expected, used)
    }
}

/// lz4 backend. Payloads are a little-endian `u32` holding the raw size, one lz4 block, and a
/// little-endian CRC32 over everything before it. The checksum is verified before the size prefix
/// is trusted, so any corrupted byte is reported instead of decoding to a different value.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lz4Backend;

const LZ4_SIZE_PREFIX: usize = 4;
const LZ4_CHECKSUM: usize = 4;

fn lz4_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

impl Lz4Backend {
    /// Split a payload into its size prefix and block after verifying its checksum.
    fn verified(payload: &[u8]) -> Result<(usize, &[u8]), CompressionError> {
        if payload.len() < LZ4_SIZE_PREFIX + LZ4_CHECKSUM {
            return Err(CompressionError::Parsing("lz4 payload is too short"));
        }
        let (body, checksum) = payload.split_at(payload.len() - LZ4_CHECKSUM);
        if LittleEndian::read_u32(checksum) != lz4_checksum(body) {
            return Err(CompressionError::Parsing("lz4 payload checksum mismatch"));
        }
        let raw_len = LittleEndian::read_u32(&body[..LZ4_SIZE_PREFIX]) as usize;
        Ok((raw_len, &body[LZ4_SIZE_PREFIX..]))
    }
}

impl Backend for Lz4Backend {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Lz4
    }

    fn bound(&self, raw_len: usize) -> usize {
        LZ4_SIZE_PREFIX + lz4_flex::block::get_maximum_output_size(raw_len) + LZ4_CHECKSUM
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CompressionError> {
        let raw_len = u32::try_from(src.len())
            .map_err(|_| CompressionError::Lz4("Input is larger than 4 GiB".into()))?;
        let bound = self.bound(src.len());
        check_destination(bound, dst)?;
        LittleEndian::write_u32(&mut dst[..LZ4_SIZE_PREFIX], raw_len);
        let written = lz4_flex::block::compress_into(
            src,
            &mut dst[LZ4_SIZE_PREFIX..bound - LZ4_CHECKSUM],
        )
        .map_err(|e| CompressionError::Lz4(e.to_string()))?;
        let body_len = LZ4_SIZE_PREFIX + written;
        let checksum = lz4_checksum(&dst[..body_len]);
        LittleEndian::write_u32(&mut dst[body_len..body_len + LZ4_CHECKSUM], checksum);
        check_bound(bound, body_len + LZ4_CHECKSUM)
    }

    fn decompressed_size(&self, payload: &[u8]) -> Result<usize, CompressionError> {
        Self::verified(payload).map(|(raw_len, _)| raw_len)
    }

    fn decompress(&self, payload: &[u8], dst: &mut [u8]) -> Result<(), CompressionError> {
        let (expected, block) = Self::verified(payload)?;
        check_size(dst.len(), expected)?;
        let used = lz4_flex::block::decompress_into(block, dst)
            .map_err(|e| CompressionError::Lz4(e.to_string()))?;
        check_size(expected, used)
    }
}

/// Table of backends, indexed by algorithm tag, along with the codec settings that go with them.
#[derive(Debug)]
pub struct Registry {
    backends: Vec<Box<dyn Backend>>,
    fallback: FallbackMode,
}

impl Registry {
    /// Build the standard registry (none, zstd, lz4) from a configuration.
    pub fn new(config: &CompressionConfig) -> Self {
        let mut registry = Self {
            backends: Vec::with_capacity(Algorithm::ALL.len()),
            fallback: config.fallback,
        };
        registry.register(Box::new(NoneBackend));
        registry.register(Box::new(ZstdBackend::new(config.zstd_level)));
        registry.register(Box::new(Lz4Backend));
        registry
    }

    /// Install a backend, replacing whatever was registered for its algorithm.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        let idx = backend.algorithm().tag() as usize;
        if let Some(slot) = self.backends.get_mut(idx) {
            *slot = backend;
            return;
        }
        // Fill any gap with identity backends so tags stay aligned with indices
        while self.backends.len() < idx {
            self.backends.push(Box::new(NoneBackend));
        }
        self.backends.push(backend);
    }

    pub fn get(&self, algorithm: Algorithm) -> &dyn Backend {
        self.backends[algorithm.tag() as usize].as_ref()
    }

    /// Look up a backend by its wire tag. Fails on tags outside the closed set.
    pub fn by_tag(&self, tag: u8) -> Option<&dyn Backend> {
        let algorithm = Algorithm::try_from(tag).ok()?;
        self.backends.get(algorithm.tag() as usize).map(|b| b.as_ref())
    }

    pub fn fallback(&self) -> FallbackMode {
        self.fallback
    }

    pub fn set_fallback(&mut self, fallback: FallbackMode) {
        self.fallback = fallback;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&CompressionConfig::default())
    }
}
