//! Human-readable rendering of MessagePack data, for logs and diagnostics.
//!
//! Compressed fields are decompressed and rendered as the value they hold, so a record prints the
//! same before and after [`compress_fields`][crate::compress_fields].
//!
//! | value | rendered as |
//! |-------|-------------|
//! | nil | `null` |
//! | boolean | `true` / `false` |
//! | integer | decimal |
//! | float | shortest decimal that reads back the same value |
//! | string, binary | double-quoted, with JSON escapes |
//! | array | `[a, b]` |
//! | map | `{k: v}` |
//! | other extension | `(extension: type N, len L)` |

use std::{fmt::Write as _, io};

use crate::{
    arena::Arena,
    backend::Registry,
    codec::{decode_raw, Decoded},
    cursor::{Cursor, Element},
    error::{Error, Result},
    MAX_DEPTH, MP_COMPRESSION,
};

/// Render the single MessagePack value in `data`.
///
/// ```
/// # use field_pack::{print, Arena, Registry};
/// let data = [0x93, 0xc0, 0xa2, b'h', b'i', 0xce, 0x00, 0x01, 0xe2, 0x40];
/// let text = print::to_text(&Registry::default(), &data, &mut Arena::new()).unwrap();
/// assert_eq!(text, r#"[null, "hi", 123456]"#);
/// ```
///
/// # Errors
///
/// Fails if `data` isn't exactly one value, if nesting goes deeper than [`MAX_DEPTH`], or if a
/// compressed field can't be decompressed.
pub fn to_text(registry: &Registry, data: &[u8], arena: &mut Arena) -> Result<String> {
    let mut out = String::new();
    let mut cursor = Cursor::new(data);
    render(registry, &mut cursor, arena, &mut out)?;
    if !cursor.is_empty() {
        return Err(Error::BadEncode(format!(
            "{} trailing bytes after value",
            cursor.remaining().len()
        )));
    }
    Ok(out)
}

/// Render the single MessagePack value in `data` to a writer.
pub fn write_text<W: io::Write>(
    registry: &Registry,
    data: &[u8],
    arena: &mut Arena,
    out: &mut W,
) -> Result<()> {
    let text = to_text(registry, data, arena)?;
    out.write_all(text.as_bytes())?;
    Ok(())
}

/// Render the next value under `cursor`, appending to `out`. The cursor is advanced past it.
pub fn render(
    registry: &Registry,
    cursor: &mut Cursor,
    arena: &mut Arena,
    out: &mut String,
) -> Result<()> {
    let mut scope = arena.scope();
    let mut renderer = Renderer {
        registry,
        arena: &mut *scope,
        out,
    };
    renderer.value(cursor, 0)
}

struct Renderer<'r, 'o> {
    registry: &'r Registry,
    arena: &'r mut Arena,
    out: &'o mut String,
}

impl<'r, 'o> Renderer<'r, 'o> {
    fn value(&mut self, cursor: &mut Cursor, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::ParseLimit(format!(
                "Nesting goes past the depth limit of {}",
                MAX_DEPTH
            )));
        }
        if cursor.peek_ext_type().ok().flatten() == Some(MP_COMPRESSION) {
            return self.compressed(cursor, depth);
        }
        match cursor.next_element()? {
            Element::Nil => self.out.push_str("null"),
            Element::Bool(v) => self.out.push_str(if v { "true" } else { "false" }),
            Element::UInt(v) => self.push(format_args!("{}", v)),
            Element::Int(v) => self.push(format_args!("{}", v)),
            Element::F32(v) => self.push(format_args!("{}", v)),
            Element::F64(v) => self.push(format_args!("{}", v)),
            Element::Str(v) | Element::Bin(v) => self.quoted(v),
            Element::Array(len) => {
                self.out.push('[');
                for i in 0..len {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.value(cursor, depth + 1)?;
                }
                self.out.push(']');
            }
            Element::Map(len) => {
                self.out.push('{');
                for i in 0..len {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.value(cursor, depth + 1)?;
                    self.out.push_str(": ");
                    self.value(cursor, depth + 1)?;
                }
                self.out.push('}');
            }
            Element::Ext(ty, data) => self.push(format_args!(
                "(extension: type {}, len {})",
                ty,
                data.len()
            )),
        }
        Ok(())
    }

    fn compressed(&mut self, cursor: &mut Cursor, depth: usize) -> Result<()> {
        let watermark = self.arena.watermark();
        let raw = match decode_raw(self.registry, cursor, self.arena)? {
            Decoded::Decompressed { raw, .. } => raw,
            Decoded::Plain(_) => {
                return Err(Error::BadEncode(
                    "Compression block read as a plain value".to_string(),
                ))
            }
        };
        // Nested blocks grow the arena while this field is being read, so it is copied out
        let inner = self.arena.bytes(raw).to_vec();
        self.arena.truncate(watermark);
        let mut inner_cursor = Cursor::new(&inner);
        self.value(&mut inner_cursor, depth + 1)
    }

    fn push(&mut self, args: std::fmt::Arguments) {
        // Writing to a String can't fail
        let _ = self.out.write_fmt(args);
    }

    fn quoted(&mut self, bytes: &[u8]) {
        self.out.push('"');
        for c in String::from_utf8_lossy(bytes).chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\u{08}' => self.out.push_str("\\b"),
                '\u{0c}' => self.out.push_str("\\f"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => self.push(format_args!("\\u{:04x}", c as u32)),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compress_fields, marker::encode_ext_marker, Algorithm, CompressionConfig, CompressionUnit,
        FallbackMode, FieldSchema,
    };

    fn text(data: &[u8]) -> String {
        let mut arena = Arena::new();
        let text = to_text(&Registry::default(), data, &mut arena).unwrap();
        assert_eq!(arena.watermark(), 0);

        let mut written = Vec::new();
        write_text(&Registry::default(), data, &mut arena, &mut written).unwrap();
        assert_eq!(written, text.as_bytes());
        text
    }

    #[test]
    fn scalars() {
        assert_eq!(text(&[0xc0]), "null");
        assert_eq!(text(&[0xc3]), "true");
        assert_eq!(text(&[0xc2]), "false");
        assert_eq!(text(&[0xce, 0x00, 0x01, 0xe2, 0x40]), "123456");
        assert_eq!(text(&[0xd2, 0xff, 0xfe, 0x1d, 0xc0]), "-123456");
        let mut f32_data = vec![0xca];
        f32_data.extend_from_slice(&(-123.456f32).to_be_bytes());
        assert_eq!(text(&f32_data), "-123.456");
        let mut f64_data = vec![0xcb];
        f64_data.extend_from_slice(&(-123.456f64).to_be_bytes());
        assert_eq!(text(&f64_data), "-123.456");
    }

    #[test]
    fn strings_are_escaped() {
        let mut data = vec![0xb1];
        data.extend_from_slice(b"test_mp_print_str");
        assert_eq!(text(&data), "\"test_mp_print_str\"");
        assert_eq!(
            text(&[0xc4, 0x05, 0x12, b'U', b']', 0x06, b'M']),
            "\"\\u0012U]\\u0006M\""
        );
        assert_eq!(
            text(&[0xa6, b'"', b'\\', b'\n', b'\t', 0x08, 0x0c]),
            r#""\"\\\n\t\b\f""#
        );
    }

    #[test]
    fn containers() {
        let mut data = vec![0x93, 0xc0, 0xb3];
        data.extend_from_slice(b"test_mp_print_array");
        data.extend_from_slice(&[0xce, 0x00, 0x01, 0xe2, 0x40]);
        assert_eq!(text(&data), "[null, \"test_mp_print_array\", 123456]");

        let mut data = vec![0x83, 0x01, 0xc0, 0xa1, b'1', 0xb3];
        data.extend_from_slice(b"test_mp_print_array");
        data.extend_from_slice(&[0x03, 0xce, 0x00, 0x01, 0xe2, 0x40]);
        assert_eq!(
            text(&data),
            "{1: null, \"1\": \"test_mp_print_array\", 3: 123456}"
        );
        assert_eq!(text(&[0x90]), "[]");
        assert_eq!(text(&[0x80]), "{}");
    }

    #[test]
    fn other_extensions() {
        let mut data = Vec::new();
        encode_ext_marker(&mut data, 0, 10).unwrap();
        data.extend_from_slice(&[0u8; 10]);
        assert_eq!(text(&data), "(extension: type 0, len 10)");
    }

    #[test]
    fn compressed_fields_are_transparent() {
        let mut long = vec![0xda, 0x02, 0x00];
        long.extend_from_slice(&[b'a'; 512]);
        let mut map = vec![0x81, 0xa3, b'k', b'e', b'y', 0xdc, 0x01, 0x00];
        map.extend((0..256).map(|_| 0x07u8));
        let mut record = vec![0x94, 0xce, 0x07, 0x5b, 0xcd, 0x15];
        record.extend_from_slice(&long);
        record.extend_from_slice(&map);
        record.push(0xc0);

        for fallback in [FallbackMode::Unwrapped, FallbackMode::TaggedNone] {
            let registry = Registry::new(&CompressionConfig {
                fallback,
                ..Default::default()
            });
            for alg in [Algorithm::Zstd, Algorithm::Lz4] {
                let schema = FieldSchema::new(vec![alg; 4]);
                let mut arena = Arena::new();
                let packed = compress_fields(&registry, &schema, &record, &mut arena).unwrap();
                assert_ne!(&*packed, &record[..]);
                assert_eq!(
                    to_text(&registry, &packed, &mut arena).unwrap(),
                    to_text(&registry, &record, &mut arena).unwrap()
                );
                assert_eq!(arena.watermark(), 0);
            }
        }
    }

    #[test]
    fn nested_compression_is_transparent() {
        let registry = Registry::default();
        let mut arena = Arena::new();
        let mut long = vec![0xda, 0x02, 0x00];
        long.extend_from_slice(&[b'z'; 512]);
        let inner = CompressionUnit::new(Algorithm::Lz4, &long).unwrap();
        let mut wrapped = vec![0x92, 0x01];
        crate::codec::encode(&registry, &inner, &mut arena, &mut wrapped).unwrap();
        // Wrap the array holding a compressed field once more, under the none tag
        let mut outer = Vec::new();
        encode_ext_marker(&mut outer, MP_COMPRESSION, 1 + wrapped.len()).unwrap();
        outer.push(Algorithm::None.tag());
        outer.extend_from_slice(&wrapped);

        let mut plain = vec![0x92, 0x01];
        plain.extend_from_slice(&long);
        assert_eq!(
            to_text(&registry, &outer, &mut arena).unwrap(),
            to_text(&registry, &plain, &mut arena).unwrap()
        );
    }

    #[test]
    fn depth_limit() {
        let mut data = vec![0x91; MAX_DEPTH + 2];
        data.push(0xc0);
        let mut arena = Arena::new();
        match to_text(&Registry::default(), &data, &mut arena) {
            Err(Error::ParseLimit(_)) => (),
            other => panic!("Expected ParseLimit, got {:?}", other),
        }
        let mut data = vec![0x91; MAX_DEPTH];
        data.push(0xc0);
        to_text(&Registry::default(), &data, &mut arena).unwrap();
    }

    #[test]
    fn bad_input() {
        let registry = Registry::default();
        let mut arena = Arena::new();
        to_text(&registry, &[0x92, 0x01], &mut arena).unwrap_err();
        to_text(&registry, &[0x01, 0x02], &mut arena).unwrap_err();
        to_text(&registry, &[0xc1], &mut arena).unwrap_err();
        let err = to_text(&registry, &[0xd5, MP_COMPRESSION as u8, 0x09, 0x00], &mut arena)
            .unwrap_err();
        assert!(err.is_format());
    }
}
