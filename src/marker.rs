//! MessagePack format markers.

use crate::error::{Error, Result};

/// The first byte of every MessagePack value, classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    PosFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    F32,
    F64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegFixInt(i8),
}

impl Marker {
    /// Construct a marker from a single byte.
    pub fn from_u8(n: u8) -> Marker {
        match n {
            0x00..=0x7f => Marker::PosFixInt(n),
            0x80..=0x8f => Marker::FixMap(n & 0x0F),
            0x90..=0x9f => Marker::FixArray(n & 0x0F),
            0xa0..=0xbf => Marker::FixStr(n & 0x1F),
            0xc0 => Marker::Nil,
            0xc1 => Marker::Reserved,
            0xc2 => Marker::False,
            0xc3 => Marker::True,
            0xc4 => Marker::Bin8,
            0xc5 => Marker::Bin16,
            0xc6 => Marker::Bin32,
            0xc7 => Marker::Ext8,
            0xc8 => Marker::Ext16,
            0xc9 => Marker::Ext32,
            0xca => Marker::F32,
            0xcb => Marker::F64,
            0xcc => Marker::UInt8,
            0xcd => Marker::UInt16,
            0xce => Marker::UInt32,
            0xcf => Marker::UInt64,
            0xd0 => Marker::Int8,
            0xd1 => Marker::Int16,
            0xd2 => Marker::Int32,
            0xd3 => Marker::Int64,
            0xd4 => Marker::FixExt1,
            0xd5 => Marker::FixExt2,
            0xd6 => Marker::FixExt4,
            0xd7 => Marker::FixExt8,
            0xd8 => Marker::FixExt16,
            0xd9 => Marker::Str8,
            0xda => Marker::Str16,
            0xdb => Marker::Str32,
            0xdc => Marker::Array16,
            0xdd => Marker::Array32,
            0xde => Marker::Map16,
            0xdf => Marker::Map32,
            0xe0..=0xff => Marker::NegFixInt(n as i8),
        }
    }

    /// Converts a marker object into a single-byte representation.
    /// Assumes the content of the marker is already masked appropriately.
    pub fn into_u8(self) -> u8 {
        match self {
            Marker::PosFixInt(val) => val,
            Marker::FixMap(len) => 0x80 | len,
            Marker::FixArray(len) => 0x90 | len,
            Marker::FixStr(len) => 0xa0 | len,
            Marker::Nil => 0xc0,
            Marker::Reserved => 0xc1,
            Marker::False => 0xc2,
            Marker::True => 0xc3,
            Marker::Bin8 => 0xc4,
            Marker::Bin16 => 0xc5,
            Marker::Bin32 => 0xc6,
            Marker::Ext8 => 0xc7,
            Marker::Ext16 => 0xc8,
            Marker::Ext32 => 0xc9,
            Marker::F32 => 0xca,
            Marker::F64 => 0xcb,
            Marker::UInt8 => 0xcc,
            Marker::UInt16 => 0xcd,
            Marker::UInt32 => 0xce,
            Marker::UInt64 => 0xcf,
            Marker::Int8 => 0xd0,
            Marker::Int16 => 0xd1,
            Marker::Int32 => 0xd2,
            Marker::Int64 => 0xd3,
            Marker::FixExt1 => 0xd4,
            Marker::FixExt2 => 0xd5,
            Marker::FixExt4 => 0xd6,
            Marker::FixExt8 => 0xd7,
            Marker::FixExt16 => 0xd8,
            Marker::Str8 => 0xd9,
            Marker::Str16 => 0xda,
            Marker::Str32 => 0xdb,
            Marker::Array16 => 0xdc,
            Marker::Array32 => 0xdd,
            Marker::Map16 => 0xde,
            Marker::Map32 => 0xdf,
            Marker::NegFixInt(val) => val as u8,
        }
    }

    /// True for the markers that open an extension value.
    pub fn is_ext(self) -> bool {
        matches!(
            self,
            Marker::FixExt1
                | Marker::FixExt2
                | Marker::FixExt4
                | Marker::FixExt8
                | Marker::FixExt16
                | Marker::Ext8
                | Marker::Ext16
                | Marker::Ext32
        )
    }
}

impl From<u8> for Marker {
    fn from(val: u8) -> Marker {
        Marker::from_u8(val)
    }
}

impl From<Marker> for u8 {
    fn from(val: Marker) -> u8 {
        val.into_u8()
    }
}

/// Size of an array header for `len` elements.
pub fn sizeof_array(len: usize) -> usize {
    if len <= 15 {
        1
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Size of an extension header (marker, length, and type byte) for a `len`-byte payload.
pub fn sizeof_ext_header(len: usize) -> usize {
    match len {
        1 | 2 | 4 | 8 | 16 => 2,
        _ if len <= u8::MAX as usize => 3,
        _ if len <= u16::MAX as usize => 4,
        _ => 6,
    }
}

/// Total size of an extension value holding a `len`-byte payload.
pub fn sizeof_ext(len: usize) -> usize {
    sizeof_ext_header(len) + len
}

fn check_len(len: usize, what: &str) -> Result<()> {
    if len > u32::MAX as usize {
        Err(Error::BadEncode(format!(
            "{} length {} doesn't fit in 32 bits",
            what, len
        )))
    } else {
        Ok(())
    }
}

/// Write an array header for `len` elements, using the shortest encoding. Fails without writing
/// anything if `len` doesn't fit in 32 bits.
pub fn encode_array_marker(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    check_len(len, "Array")?;
    if len <= 15 {
        buf.push(Marker::FixArray(len as u8).into());
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Array16.into());
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(Marker::Array32.into());
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
    Ok(())
}

/// Write an extension header for a `len`-byte payload of type `ty`, using the shortest encoding.
/// Fails without writing anything if `len` doesn't fit in 32 bits.
pub fn encode_ext_marker(buf: &mut Vec<u8>, ty: i8, len: usize) -> Result<()> {
    check_len(len, "Extension")?;
    match len {
        1 => buf.push(Marker::FixExt1.into()),
        2 => buf.push(Marker::FixExt2.into()),
        4 => buf.push(Marker::FixExt4.into()),
        8 => buf.push(Marker::FixExt8.into()),
        16 => buf.push(Marker::FixExt16.into()),
        _ if len <= u8::MAX as usize => {
            buf.push(Marker::Ext8.into());
            buf.push(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            buf.push(Marker::Ext16.into());
            buf.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            buf.push(Marker::Ext32.into());
            buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
    buf.push(ty as u8);
    Ok(())
}
