use crate::{
    error::{Error, Result},
    marker::Marker,
};
use byteorder::{BigEndian, ByteOrder};

/// One MessagePack element. Scalars carry their value; arrays and maps only carry their length,
/// with the contained values following as further elements.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Nil,
    Bool(bool),
    UInt(u64),
    Int(i64),
    F32(f32),
    F64(f64),
    Str(&'a [u8]),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
    Ext(i8, &'a [u8]),
}

/// A read position over a MessagePack buffer.
///
/// The cursor tracks the unconsumed remainder of the buffer. Every multi-step read either
/// completes or leaves the cursor where it started, so a caller can always rewind and try
/// interpreting the same bytes another way.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    rest: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, rest: data }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.data.len() - self.rest.len()
    }

    /// The bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.rest
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Move back (or forward) to a position previously returned by [`position`][Self::position].
    pub fn rewind(&mut self, pos: usize) {
        self.rest = &self.data[pos.min(self.data.len())..];
    }

    pub fn peek_marker(&self) -> Option<Marker> {
        self.rest.first().map(|n| Marker::from_u8(*n))
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.rest.len() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.rest.len(),
                expected: len,
            });
        }
        let (bytes, rest) = self.rest.split_at(len);
        self.rest = rest;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, step: &'static str) -> Result<u8> {
        Ok(self.take(1, step)?[0])
    }

    fn read_len(&mut self, width: usize, step: &'static str) -> Result<usize> {
        let bytes = self.take(width, step)?;
        Ok(match width {
            1 => bytes[0] as usize,
            2 => BigEndian::read_u16(bytes) as usize,
            _ => BigEndian::read_u32(bytes) as usize,
        })
    }

    /// Read the header of an array and return its element count.
    pub fn read_array_len(&mut self) -> Result<usize> {
        let start = self.position();
        let result = match self.read_u8("decode array marker")?.into() {
            Marker::FixArray(len) => Ok(len as usize),
            Marker::Array16 => self.read_len(2, "decode Array16 length"),
            Marker::Array32 => self.read_len(4, "decode Array32 length"),
            m => Err(Error::BadEncode(format!("Expected an array, got marker {:?}", m))),
        };
        if result.is_err() {
            self.rewind(start);
        }
        result
    }

    /// Read an extension header, returning the extension type and payload length. The cursor is
    /// left at the start of the payload.
    pub fn read_ext_header(&mut self) -> Result<(i8, usize)> {
        let start = self.position();
        let result = self.read_ext_header_inner();
        if result.is_err() {
            self.rewind(start);
        }
        result
    }

    fn read_ext_header_inner(&mut self) -> Result<(i8, usize)> {
        let len = match self.read_u8("decode ext marker")?.into() {
            Marker::FixExt1 => 1,
            Marker::FixExt2 => 2,
            Marker::FixExt4 => 4,
            Marker::FixExt8 => 8,
            Marker::FixExt16 => 16,
            Marker::Ext8 => self.read_len(1, "decode Ext8 length")?,
            Marker::Ext16 => self.read_len(2, "decode Ext16 length")?,
            Marker::Ext32 => self.read_len(4, "decode Ext32 length")?,
            m => {
                return Err(Error::BadEncode(format!(
                    "Expected an extension, got marker {:?}",
                    m
                )))
            }
        };
        let ty = self.read_u8("decode ext type")? as i8;
        Ok((ty, len))
    }

    /// Look at the extension type of the next value without consuming anything. Returns `None`
    /// if the next value isn't an extension.
    pub fn peek_ext_type(&self) -> Result<Option<i8>> {
        match self.peek_marker() {
            Some(m) if m.is_ext() => {
                let mut peek = self.clone();
                peek.read_ext_header().map(|(ty, _)| Some(ty))
            }
            _ => Ok(None),
        }
    }

    /// Parse the next element. Strings, binaries, and extension payloads are borrowed from the
    /// buffer; array and map contents are left for subsequent calls.
    pub fn next_element(&mut self) -> Result<Element<'a>> {
        let start = self.position();
        let result = self.parse_element();
        if result.is_err() {
            self.rewind(start);
        }
        result
    }

    fn parse_element(&mut self) -> Result<Element<'a>> {
        use self::Marker::*;
        let marker = Marker::from_u8(self.read_u8("decode marker")?);
        let elem = match marker {
            Reserved => return Err(Error::BadEncode(String::from("Reserved marker found"))),
            Nil => Element::Nil,
            False => Element::Bool(false),
            True => Element::Bool(true),
            PosFixInt(v) => Element::UInt(v as u64),
            NegFixInt(v) => Element::Int(v as i64),
            UInt8 => Element::UInt(self.read_u8("decode UInt8")? as u64),
            UInt16 => Element::UInt(BigEndian::read_u16(self.take(2, "decode UInt16")?) as u64),
            UInt32 => Element::UInt(BigEndian::read_u32(self.take(4, "decode UInt32")?) as u64),
            UInt64 => Element::UInt(BigEndian::read_u64(self.take(8, "decode UInt64")?)),
            Int8 => Element::Int(self.read_u8("decode Int8")? as i8 as i64),
            Int16 => Element::Int(BigEndian::read_i16(self.take(2, "decode Int16")?) as i64),
            Int32 => Element::Int(BigEndian::read_i32(self.take(4, "decode Int32")?) as i64),
            Int64 => Element::Int(BigEndian::read_i64(self.take(8, "decode Int64")?)),
            F32 => Element::F32(BigEndian::read_f32(self.take(4, "decode F32")?)),
            F64 => Element::F64(BigEndian::read_f64(self.take(8, "decode F64")?)),
            FixStr(len) => Element::Str(self.take(len as usize, "get FixStr content")?),
            Str8 => {
                let len = self.read_len(1, "decode Str8 length")?;
                Element::Str(self.take(len, "get Str8 content")?)
            }
            Str16 => {
                let len = self.read_len(2, "decode Str16 length")?;
                Element::Str(self.take(len, "get Str16 content")?)
            }
            Str32 => {
                let len = self.read_len(4, "decode Str32 length")?;
                Element::Str(self.take(len, "get Str32 content")?)
            }
            Bin8 => {
                let len = self.read_len(1, "decode Bin8 length")?;
                Element::Bin(self.take(len, "get Bin8 content")?)
            }
            Bin16 => {
                let len = self.read_len(2, "decode Bin16 length")?;
                Element::Bin(self.take(len, "get Bin16 content")?)
            }
            Bin32 => {
                let len = self.read_len(4, "decode Bin32 length")?;
                Element::Bin(self.take(len, "get Bin32 content")?)
            }
            FixArray(len) => Element::Array(len as usize),
            Array16 => Element::Array(self.read_len(2, "decode Array16 length")?),
            Array32 => Element::Array(self.read_len(4, "decode Array32 length")?),
            FixMap(len) => Element::Map(len as usize),
            Map16 => Element::Map(self.read_len(2, "decode Map16 length")?),
            Map32 => Element::Map(self.read_len(4, "decode Map32 length")?),
            FixExt1 | FixExt2 | FixExt4 | FixExt8 | FixExt16 | Ext8 | Ext16 | Ext32 => {
                self.rest = &self.data[self.position() - 1..];
                let (ty, len) = self.read_ext_header_inner()?;
                Element::Ext(ty, self.take(len, "get ext content")?)
            }
        };
        Ok(elem)
    }

    /// Step over exactly one complete value, including everything nested inside it, and return
    /// the bytes it occupied. Fails without moving the cursor if the value is truncated or
    /// malformed.
    pub fn skip_value(&mut self) -> Result<&'a [u8]> {
        let start = self.position();
        let result = self.skip_value_inner();
        match result {
            Ok(()) => Ok(&self.data[start..self.position()]),
            Err(e) => {
                self.rewind(start);
                Err(e)
            }
        }
    }

    fn skip_value_inner(&mut self) -> Result<()> {
        // Every pending value occupies at least one byte, which bounds the counter.
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            let added = match self.parse_element()? {
                Element::Array(len) => len,
                Element::Map(len) => len.saturating_mul(2),
                _ => 0,
            };
            pending = pending.saturating_add(added);
            if pending > self.rest.len() {
                return Err(Error::LengthTooShort {
                    step: "skip nested values",
                    actual: self.rest.len(),
                    expected: pending,
                });
            }
        }
        Ok(())
    }
}
