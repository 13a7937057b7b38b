//! Walking the fields of a record.
//!
//! A record is one MessagePack array. Compression replaces fields in place, so the array keeps
//! its length and order, and decompression only needs the wire bytes: every compression block
//! says how it was made.

use std::borrow::Cow;

use crate::{
    arena::Arena,
    backend::Registry,
    codec::{decode_raw, sizeof_decoded, Decoded, Plan},
    compress_type::Algorithm,
    cursor::Cursor,
    error::{Error, Result},
    marker::{encode_array_marker, sizeof_array},
    policy::FieldPolicy,
    unit::CompressionUnit,
    MP_COMPRESSION,
};

fn check_trailing(cursor: &Cursor) -> Result<()> {
    if cursor.is_empty() {
        Ok(())
    } else {
        Err(Error::BadEncode(format!(
            "Record has {} trailing bytes after its array",
            cursor.remaining().len()
        )))
    }
}

/// Compress the fields of `record` that `policy` selects.
///
/// The output size is worked out before anything is written: each selected field is compressed
/// once into `arena`, and the output buffer is allocated at its final size and filled from those
/// results. Fields that don't shrink are copied unchanged (see [`FallbackMode`][crate::FallbackMode]).
///
/// A policy covering zero fields returns `record` itself without allocating.
///
/// # Errors
///
/// Fails if `record` isn't exactly one MessagePack array, if a backend fails, or if `arena`
/// runs out of room. Arena memory is released before returning in every case.
pub fn compress_fields<'r, P: FieldPolicy + ?Sized>(
    registry: &Registry,
    policy: &P,
    record: &'r [u8],
    arena: &mut Arena,
) -> Result<Cow<'r, [u8]>> {
    let known = policy.field_count();
    if known == 0 {
        log::trace!("No compressible fields, record passed through");
        return Ok(Cow::Borrowed(record));
    }

    let mut cursor = Cursor::new(record);
    let count = cursor.read_array_len()?;
    let mut scope = arena.scope();

    // Every field takes at least one byte
    let mut plans = Vec::with_capacity(count.min(cursor.remaining().len()));
    let mut size = sizeof_array(count);
    for field in 0..count {
        let raw = cursor.skip_value()?;
        let algorithm = if field < known {
            policy.algorithm(field)
        } else {
            Algorithm::None
        };
        let plan = if algorithm == Algorithm::None {
            Plan::Raw
        } else {
            let unit = CompressionUnit::from_value(algorithm, raw);
            Plan::new(registry, &unit, &mut scope)?
        };
        let encoded = plan.encoded_size(raw.len());
        match plan {
            Plan::Raw if algorithm == Algorithm::None => {
                log::trace!("Field {}: passed through, {} bytes", field, raw.len())
            }
            Plan::Compressed { .. } => log::trace!(
                "Field {}: {} compressed {} -> {} bytes",
                field,
                algorithm,
                raw.len(),
                encoded
            ),
            _ => log::trace!(
                "Field {}: {} wouldn't shrink {} bytes, using fallback",
                field,
                algorithm,
                raw.len()
            ),
        }
        size += encoded;
        plans.push((plan, raw));
    }
    check_trailing(&cursor)?;

    let mut out = Vec::with_capacity(size);
    encode_array_marker(&mut out, count)?;
    for (plan, raw) in plans.iter() {
        plan.write(raw, &scope, &mut out)?;
    }
    debug_assert_eq!(out.len(), size);
    log::debug!(
        "Compressed record of {} fields: {} -> {} bytes",
        count,
        record.len(),
        out.len()
    );
    Ok(Cow::Owned(out))
}

/// Decompress every compressed field of `record`. Fields that aren't compression blocks are
/// copied unchanged, so this needs no policy.
///
/// # Errors
///
/// Fails with [`Error::Format`] if any compression block is malformed, and with a decoding
/// error if `record` isn't exactly one MessagePack array. Fails with [`Error::Allocation`] if
/// the compression blocks together declare more bytes than the arena limit, before any output
/// is allocated.
pub fn decompress_fields(registry: &Registry, record: &[u8], arena: &mut Arena) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(record);
    let count = cursor.read_array_len()?;
    let fields_start = cursor.position();

    // Size from headers alone. Declared sizes aren't trusted until the payload is decompressed,
    // so everything the blocks claim must fit within the arena limit before allocating.
    let mut size = sizeof_array(count);
    let mut expanded = 0usize;
    for _ in 0..count {
        let decoded = sizeof_decoded(registry, &cursor)?;
        if let Ok(Some(MP_COMPRESSION)) = cursor.peek_ext_type() {
            expanded = expanded.saturating_add(decoded);
            if expanded > arena.limit() {
                return Err(Error::Allocation {
                    requested: expanded,
                    available: arena.available(),
                });
            }
        }
        cursor.skip_value()?;
        size += decoded;
    }
    check_trailing(&cursor)?;

    cursor.rewind(fields_start);
    let mut out = Vec::with_capacity(size);
    encode_array_marker(&mut out, count)?;
    let mut decompressed = 0;
    for _ in 0..count {
        let mut scope = arena.scope();
        match decode_raw(registry, &mut cursor, &mut scope)? {
            Decoded::Plain(raw) => out.extend_from_slice(raw),
            Decoded::Decompressed { algorithm, raw } => {
                log::trace!("Field decompressed with {}: {} bytes", algorithm, raw.len());
                decompressed += 1;
                out.extend_from_slice(scope.bytes(raw));
            }
        }
    }
    debug_assert_eq!(out.len(), size);
    log::debug!(
        "Decompressed {} of {} fields: {} -> {} bytes",
        decompressed,
        count,
        record.len(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::sizeof_encoded,
        config::{CompressionConfig, FallbackMode},
        marker::encode_ext_marker,
        policy::FieldSchema,
        MP_COMPRESSION,
    };
    use rand::prelude::*;

    fn str_value(s: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        match s.len() {
            0..=31 => v.push(0xa0 | s.len() as u8),
            32..=255 => v.extend_from_slice(&[0xd9, s.len() as u8]),
            256..=65535 => {
                v.push(0xda);
                v.extend_from_slice(&(s.len() as u16).to_be_bytes());
            }
            _ => {
                v.push(0xdb);
                v.extend_from_slice(&(s.len() as u32).to_be_bytes());
            }
        }
        v.extend_from_slice(s);
        v
    }

    fn bin_value(b: &[u8]) -> Vec<u8> {
        let mut v = vec![0xc5];
        v.extend_from_slice(&(b.len() as u16).to_be_bytes());
        v.extend_from_slice(b);
        v
    }

    fn record(fields: &[Vec<u8>]) -> Vec<u8> {
        let mut v = Vec::new();
        encode_array_marker(&mut v, fields.len()).unwrap();
        for f in fields {
            v.extend_from_slice(f);
        }
        v
    }

    /// One of each kind of value, some of them large and repetitive.
    fn sample_fields() -> Vec<Vec<u8>> {
        let text = b"the quick brown fox jumps over the lazy dog. ".repeat(40);
        let mut nested = vec![0x82, 0xa4, b'k', b'e', b'y', b's'];
        nested.push(0xdc);
        nested.extend_from_slice(&200u16.to_be_bytes());
        for i in 0..200u8 {
            nested.push(i & 0x7f);
        }
        nested.extend_from_slice(&[0xa3, b'n', b'i', b'l', 0xc0]);
        let mut float32 = vec![0xca];
        float32.extend_from_slice(&(-123.456f32).to_be_bytes());
        let mut list = vec![0xdc];
        list.extend_from_slice(&300u16.to_be_bytes());
        for _ in 0..300 {
            list.extend_from_slice(&[0xa2, b'a', b'b']);
        }
        vec![
            vec![0xc0],
            vec![0xc3],
            vec![0xce, 0x07, 0x5b, 0xcd, 0x15],
            vec![0xd3, 0x80, 0, 0, 0, 0, 0, 0, 1],
            vec![0xcb, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18],
            float32,
            str_value(&text),
            bin_value(&[0u8; 1000]),
            nested,
            list,
            vec![0xd6, 0x02, 1, 2, 3, 4],
            str_value(b"short"),
        ]
    }

    #[test]
    fn round_trip_every_algorithm() {
        let fields = sample_fields();
        let rec = record(&fields);
        for fallback in [FallbackMode::Unwrapped, FallbackMode::TaggedNone] {
            let registry = Registry::new(&CompressionConfig {
                fallback,
                ..Default::default()
            });
            for alg in Algorithm::ALL {
                let schema = FieldSchema::new(vec![alg; fields.len()]);
                let mut arena = Arena::new();
                let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
                assert_eq!(arena.watermark(), 0);
                if alg != Algorithm::None {
                    assert!(packed.len() < rec.len());
                }
                let unpacked = decompress_fields(&registry, &packed, &mut arena).unwrap();
                assert_eq!(arena.watermark(), 0);
                assert_eq!(unpacked, rec, "{} with {:?}", alg, fallback);
            }
        }
    }

    #[test]
    fn walker_matches_codec_sizes() {
        let fields = sample_fields();
        let rec = record(&fields);
        let registry = Registry::default();
        let schema = FieldSchema::new(vec![Algorithm::Zstd; fields.len()]);
        let mut arena = Arena::new();
        let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
        let mut expected = sizeof_array(fields.len());
        for f in fields.iter() {
            let unit = CompressionUnit::new(Algorithm::Zstd, f).unwrap();
            let size = sizeof_encoded(&registry, &unit, &mut arena).unwrap();
            assert!(size <= f.len());
            expected += size;
        }
        assert_eq!(packed.len(), expected);
    }

    #[test]
    fn random_fields_never_grow() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let registry = Registry::default();
        let mut arena = Arena::new();
        for _ in 0..20 {
            let fields: Vec<Vec<u8>> = (0..rng.gen_range(1..12))
                .map(|_| {
                    let len = rng.gen_range(0..2000);
                    if rng.gen() {
                        let mut data = vec![0u8; len];
                        rng.fill(&mut data[..]);
                        bin_value(&data)
                    } else {
                        let letter = rng.gen_range(b'a'..=b'z');
                        str_value(&vec![letter; len])
                    }
                })
                .collect();
            let rec = record(&fields);
            let schema: Vec<Algorithm> = (0..fields.len())
                .map(|_| *Algorithm::ALL.choose(&mut rng).unwrap())
                .collect();
            let schema = FieldSchema::new(schema);
            let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
            assert!(packed.len() <= rec.len());
            let unpacked = decompress_fields(&registry, &packed, &mut arena).unwrap();
            assert_eq!(unpacked, rec);
        }
    }

    #[test]
    fn empty_policy_is_a_no_op() {
        let registry = Registry::default();
        let mut arena = Arena::with_limit(0);
        // Not even a valid record: nothing is looked at
        let rec = [0xc1, 0xc1];
        let packed = compress_fields(&registry, &FieldSchema::default(), &rec, &mut arena).unwrap();
        assert!(matches!(packed, Cow::Borrowed(_)));
        assert_eq!(&*packed, &rec[..]);
    }

    #[test]
    fn excess_fields_pass_through() {
        let long = str_value(&[b'x'; 600]);
        let rec = record(&[long.clone(), long.clone(), long.clone()]);
        let registry = Registry::default();
        let schema = FieldSchema::new(vec![Algorithm::Lz4]);
        let mut arena = Arena::new();
        let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
        // Only the first field was wrapped; the rest follow unchanged
        assert!(packed.ends_with(&[long.clone(), long.clone()].concat()));
        let mut cursor = Cursor::new(&packed);
        assert_eq!(cursor.read_array_len().unwrap(), 3);
        let (ty, _) = cursor.read_ext_header().unwrap();
        assert_eq!(ty, MP_COMPRESSION);
        assert_eq!(cursor.read_u8("tag").unwrap(), Algorithm::Lz4.tag());
        assert_eq!(decompress_fields(&registry, &packed, &mut arena).unwrap(), rec);
    }

    #[test]
    fn small_fields_are_copied() {
        let rec = record(&[vec![0xce, 0x07, 0x5b, 0xcd, 0x15], vec![0x2a]]);
        let registry = Registry::default();
        let schema = FieldSchema::new(vec![Algorithm::Zstd, Algorithm::Lz4]);
        let mut arena = Arena::new();
        let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
        assert_eq!(&*packed, &rec[..]);
    }

    #[test]
    fn malformed_records() {
        let registry = Registry::default();
        let schema = FieldSchema::new(vec![Algorithm::Zstd]);
        let mut arena = Arena::new();

        // Not an array
        let err = compress_fields(&registry, &schema, &[0xc0], &mut arena).unwrap_err();
        assert!(matches!(err, Error::BadEncode(_)));
        decompress_fields(&registry, &[0xc0], &mut arena).unwrap_err();

        // Trailing bytes
        let err = compress_fields(&registry, &schema, &[0x91, 0x01, 0x02], &mut arena).unwrap_err();
        assert!(matches!(err, Error::BadEncode(_)));
        decompress_fields(&registry, &[0x91, 0x01, 0x02], &mut arena).unwrap_err();

        // Array claiming more fields than it holds
        compress_fields(&registry, &schema, &[0x93, 0x01], &mut arena).unwrap_err();
        decompress_fields(&registry, &[0x93, 0x01], &mut arena).unwrap_err();
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn bad_block_aborts_the_record() {
        let registry = Registry::default();
        let mut rec = vec![0x92, 0x01];
        encode_ext_marker(&mut rec, MP_COMPRESSION, 2).unwrap();
        rec.extend_from_slice(&[0x09, 0xc0]);
        let mut arena = Arena::new();
        let err = decompress_fields(&registry, &rec, &mut arena).unwrap_err();
        assert!(err.is_format(), "got {:?}", err);
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn arena_limit_fails_cleanly() {
        let rec = record(&[str_value(&[b'a'; 4000])]);
        let registry = Registry::default();
        let schema = FieldSchema::new(vec![Algorithm::Zstd]);
        let mut arena = Arena::with_limit(64);
        match compress_fields(&registry, &schema, &rec, &mut arena) {
            Err(Error::Allocation { .. }) => (),
            other => panic!("Expected Allocation, got {:?}", other),
        }
        assert_eq!(arena.watermark(), 0);

        let mut big = Arena::new();
        let packed = compress_fields(&registry, &schema, &rec, &mut big).unwrap();
        match decompress_fields(&registry, &packed, &mut arena) {
            Err(Error::Allocation { .. }) => (),
            other => panic!("Expected Allocation, got {:?}", other),
        }
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn declared_sizes_are_limited_per_record() {
        // lz4 blocks with a valid checksum, each claiming 64 KiB of output but holding no data
        let mut payload = 65536u32.to_le_bytes().to_vec();
        let crc = crc32fast::hash(&payload);
        payload.extend_from_slice(&crc.to_le_bytes());
        let mut block = Vec::new();
        encode_ext_marker(&mut block, MP_COMPRESSION, 1 + payload.len()).unwrap();
        block.push(Algorithm::Lz4.tag());
        block.extend_from_slice(&payload);

        let registry = Registry::default();
        let mut arena = Arena::with_limit(1 << 20);
        // Each block fits the arena by itself, but not all of them together
        let rec = record(&vec![block.clone(); 100]);
        match decompress_fields(&registry, &rec, &mut arena) {
            Err(Error::Allocation { requested, .. }) => assert!(requested > 1 << 20),
            other => panic!("Expected Allocation, got {:?}", other),
        }
        assert_eq!(arena.watermark(), 0);

        // Under the limit, the headers pass and the empty block is caught when decoding
        let rec = record(&[block]);
        let err = decompress_fields(&registry, &rec, &mut arena).unwrap_err();
        assert!(err.is_format(), "got {:?}", err);
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn every_value_kind_round_trips_alone() {
        let registry = Registry::default();
        let mut arena = Arena::new();
        for field in sample_fields() {
            let rec = record(&[field.clone()]);
            for alg in Algorithm::ALL {
                let schema = FieldSchema::new(vec![alg]);
                let packed = compress_fields(&registry, &schema, &rec, &mut arena).unwrap();
                assert!(packed.len() <= rec.len());
                let unpacked = decompress_fields(&registry, &packed, &mut arena).unwrap();
                assert_eq!(unpacked, rec, "{} on field {:02x?}", alg, &field[..1]);
            }
        }
    }
}
