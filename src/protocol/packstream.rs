//! PackStream value serialization
//!
//! Covers the value types exchanged during login: null, booleans, integers, floats,
//! byte arrays, strings, lists, maps and structures. Decoding is bounded in nesting
//! depth and never trusts a length header beyond the bytes actually present.

use super::constants::markers;
use bytes::{BufMut, BytesMut};
use std::collections::BTreeMap;
use std::io;

/// Maximum nesting of lists, maps and structures accepted when decoding
pub const MAX_DEPTH: usize = 32;

/// A PackStream value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Signed 64-bit integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed map
    Map(BTreeMap<String, Value>),
    /// Tagged structure
    Structure(Structure),
}

/// Tagged structure (messages and graph types)
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Signature byte
    pub signature: u8,
    /// Fields in order
    pub fields: Vec<Value>,
}

impl Value {
    /// Borrow as `&str` if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a map if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Serialize `value` onto `buf`
pub fn pack(value: &Value, buf: &mut BytesMut) -> io::Result<()> {
    match value {
        Value::Null => buf.put_u8(markers::NULL),
        Value::Boolean(true) => buf.put_u8(markers::TRUE),
        Value::Boolean(false) => buf.put_u8(markers::FALSE),
        Value::Integer(i) => pack_integer(*i, buf),
        Value::Float(f) => {
            buf.put_u8(markers::FLOAT_64);
            buf.put_f64(*f);
        }
        Value::Bytes(b) => {
            pack_header(
                b.len(),
                None,
                [markers::BYTES_8, markers::BYTES_16, markers::BYTES_32],
                buf,
            )?;
            buf.put_slice(b);
        }
        Value::String(s) => pack_string(s, buf)?,
        Value::List(items) => {
            pack_header(
                items.len(),
                Some(markers::TINY_LIST),
                [markers::LIST_8, markers::LIST_16, markers::LIST_32],
                buf,
            )?;
            for item in items {
                pack(item, buf)?;
            }
        }
        Value::Map(entries) => {
            pack_header(
                entries.len(),
                Some(markers::TINY_MAP),
                [markers::MAP_8, markers::MAP_16, markers::MAP_32],
                buf,
            )?;
            for (key, item) in entries {
                pack_string(key, buf)?;
                pack(item, buf)?;
            }
        }
        Value::Structure(s) => pack_structure(s, buf)?,
    }
    Ok(())
}

/// Serialize a structure onto `buf`
pub fn pack_structure(s: &Structure, buf: &mut BytesMut) -> io::Result<()> {
    let n = s.fields.len();
    if n < 0x10 {
        buf.put_u8(markers::TINY_STRUCT | n as u8);
    } else if n <= u8::MAX as usize {
        buf.put_u8(markers::STRUCT_8);
        buf.put_u8(n as u8);
    } else if n <= u16::MAX as usize {
        buf.put_u8(markers::STRUCT_16);
        buf.put_u16(n as u16);
    } else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("structure has too many fields: {}", n),
        ));
    }
    buf.put_u8(s.signature);
    for field in &s.fields {
        pack(field, buf)?;
    }
    Ok(())
}

fn pack_integer(i: i64, buf: &mut BytesMut) {
    if (-16..=127).contains(&i) {
        buf.put_i8(i as i8);
    } else if (i8::MIN as i64..=i8::MAX as i64).contains(&i) {
        buf.put_u8(markers::INT_8);
        buf.put_i8(i as i8);
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&i) {
        buf.put_u8(markers::INT_16);
        buf.put_i16(i as i16);
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&i) {
        buf.put_u8(markers::INT_32);
        buf.put_i32(i as i32);
    } else {
        buf.put_u8(markers::INT_64);
        buf.put_i64(i);
    }
}

fn pack_string(s: &str, buf: &mut BytesMut) -> io::Result<()> {
    pack_header(
        s.len(),
        Some(markers::TINY_STRING),
        [markers::STRING_8, markers::STRING_16, markers::STRING_32],
        buf,
    )?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn pack_header(len: usize, tiny: Option<u8>, sized: [u8; 3], buf: &mut BytesMut) -> io::Result<()> {
    match tiny {
        Some(marker) if len < 0x10 => buf.put_u8(marker | len as u8),
        _ if len <= u8::MAX as usize => {
            buf.put_u8(sized[0]);
            buf.put_u8(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            buf.put_u8(sized[1]);
            buf.put_u16(len as u16);
        }
        _ if len <= u32::MAX as usize => {
            buf.put_u8(sized[2]);
            buf.put_u32(len as u32);
        }
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("value too large to pack: {} elements", len),
            ))
        }
    }
    Ok(())
}

/// Deserialize one value from the front of `data`, advancing it past the value.
pub fn unpack(data: &mut &[u8]) -> io::Result<Value> {
    unpack_at(data, 0)
}

fn unpack_at(data: &mut &[u8], depth: usize) -> io::Result<Value> {
    if depth > MAX_DEPTH {
        return Err(invalid("value nested too deeply"));
    }

    let marker = take_u8(data)?;
    let high = marker & 0xF0;
    let low = (marker & 0x0F) as usize;

    let value = match marker {
        0x00..=0x7F => Value::Integer(marker as i64),
        0xF0..=0xFF => Value::Integer(marker as i8 as i64),
        markers::NULL => Value::Null,
        markers::TRUE => Value::Boolean(true),
        markers::FALSE => Value::Boolean(false),
        markers::FLOAT_64 => Value::Float(f64::from_be_bytes(take_array(data)?)),
        markers::INT_8 => Value::Integer(i8::from_be_bytes(take_array(data)?) as i64),
        markers::INT_16 => Value::Integer(i16::from_be_bytes(take_array(data)?) as i64),
        markers::INT_32 => Value::Integer(i32::from_be_bytes(take_array(data)?) as i64),
        markers::INT_64 => Value::Integer(i64::from_be_bytes(take_array(data)?)),
        markers::BYTES_8 | markers::BYTES_16 | markers::BYTES_32 => {
            let len = take_len(data, marker - markers::BYTES_8)?;
            Value::Bytes(take(data, len)?.to_vec())
        }
        markers::STRING_8 | markers::STRING_16 | markers::STRING_32 => {
            let len = take_len(data, marker - markers::STRING_8)?;
            Value::String(take_string(data, len)?)
        }
        markers::LIST_8 | markers::LIST_16 | markers::LIST_32 => {
            let len = take_len(data, marker - markers::LIST_8)?;
            unpack_list(data, len, depth)?
        }
        markers::MAP_8 | markers::MAP_16 | markers::MAP_32 => {
            let len = take_len(data, marker - markers::MAP_8)?;
            unpack_map(data, len, depth)?
        }
        markers::STRUCT_8 => {
            let len = take_u8(data)? as usize;
            unpack_structure(data, len, depth)?
        }
        markers::STRUCT_16 => {
            let len = u16::from_be_bytes(take_array(data)?) as usize;
            unpack_structure(data, len, depth)?
        }
        _ if high == markers::TINY_STRING => Value::String(take_string(data, low)?),
        _ if high == markers::TINY_LIST => unpack_list(data, low, depth)?,
        _ if high == markers::TINY_MAP => unpack_map(data, low, depth)?,
        _ if high == markers::TINY_STRUCT => unpack_structure(data, low, depth)?,
        other => return Err(invalid(&format!("unknown marker byte: 0x{:02X}", other))),
    };

    Ok(value)
}

fn unpack_list(data: &mut &[u8], len: usize, depth: usize) -> io::Result<Value> {
    // Every element takes at least one byte
    let mut items = Vec::with_capacity(len.min(data.len()));
    for _ in 0..len {
        items.push(unpack_at(data, depth + 1)?);
    }
    Ok(Value::List(items))
}

fn unpack_map(data: &mut &[u8], len: usize, depth: usize) -> io::Result<Value> {
    let mut entries = BTreeMap::new();
    for _ in 0..len {
        let key = match unpack_at(data, depth + 1)? {
            Value::String(s) => s,
            other => return Err(invalid(&format!("map key is not a string: {:?}", other))),
        };
        let item = unpack_at(data, depth + 1)?;
        entries.insert(key, item);
    }
    Ok(Value::Map(entries))
}

fn unpack_structure(data: &mut &[u8], len: usize, depth: usize) -> io::Result<Value> {
    let signature = take_u8(data)?;
    let mut fields = Vec::with_capacity(len.min(data.len()));
    for _ in 0..len {
        fields.push(unpack_at(data, depth + 1)?);
    }
    Ok(Value::Structure(Structure { signature, fields }))
}

/// Length header following an 8/16/32-bit sized marker (`width` = 0, 1, 2)
fn take_len(data: &mut &[u8], width: u8) -> io::Result<usize> {
    match width {
        0 => Ok(take_u8(data)? as usize),
        1 => Ok(u16::from_be_bytes(take_array(data)?) as usize),
        _ => Ok(u32::from_be_bytes(take_array(data)?) as usize),
    }
}

fn take<'a>(data: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    if data.len() < n {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated packstream value",
        ));
    }
    let (head, tail) = data.split_at(n);
    *data = tail;
    Ok(head)
}

fn take_u8(data: &mut &[u8]) -> io::Result<u8> {
    Ok(take(data, 1)?[0])
}

fn take_array<const N: usize>(data: &mut &[u8]) -> io::Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(data, N)?);
    Ok(out)
}

fn take_string(data: &mut &[u8], len: usize) -> io::Result<String> {
    let bytes = take(data, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| invalid(&format!("invalid UTF-8 string: {}", e)))
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}
