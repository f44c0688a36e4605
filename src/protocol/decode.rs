//! Protocol message decoding

use super::constants::{signatures, MAX_MESSAGE_SIZE};
use super::message::{BackendMessage, FailureFields};
use super::packstream::{unpack, Structure, Value};
use bytes::BytesMut;
use std::collections::BTreeMap;
use std::io;

/// Reassemble one chunked message from the front of `data`.
///
/// Returns the message payload and the number of bytes consumed. Empty messages
/// (a bare end marker, used as keep-alive) are skipped.
///
/// Chunk headers are walked first and the payload is copied only once the whole
/// message has arrived, so an incomplete message costs one pass over its headers.
///
/// # Returns
/// `Ok((payload, consumed))` - Complete message
/// `Err(e)` with [`io::ErrorKind::UnexpectedEof`] - need more bytes
/// `Err(e)` with [`io::ErrorKind::InvalidData`] - message exceeds [`MAX_MESSAGE_SIZE`]
pub fn dechunk(data: &[u8]) -> io::Result<(Vec<u8>, usize)> {
    let mut start = 0;
    let mut offset = 0;
    let mut total = 0;

    let end = loop {
        let size = chunk_size(data, offset)?;
        offset += 2;

        if size == 0 {
            if total == 0 {
                start = offset;
                continue;
            }
            break offset;
        }

        total += size;
        if total > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("message exceeds maximum allowed size {}", MAX_MESSAGE_SIZE),
            ));
        }
        if data.len() < offset + size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "incomplete chunk body",
            ));
        }
        offset += size;
    };

    let mut payload = Vec::with_capacity(total);
    let mut offset = start;
    while offset < end {
        let size = chunk_size(data, offset)?;
        offset += 2;
        payload.extend_from_slice(&data[offset..offset + size]);
        offset += size;
    }

    Ok((payload, end))
}

fn chunk_size(data: &[u8], offset: usize) -> io::Result<usize> {
    match data.get(offset..offset + 2) {
        Some(header) => Ok(u16::from_be_bytes([header[0], header[1]]) as usize),
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete chunk header",
        )),
    }
}

/// Decode a backend message from the front of `data` without consuming it.
///
/// The caller must advance the buffer by the returned byte count.
///
/// # Returns
/// `Ok((msg, consumed))` - Message and number of bytes consumed
/// `Err(e)` - [`io::ErrorKind::UnexpectedEof`] if incomplete, other kinds if invalid
pub fn decode_message(data: &mut BytesMut) -> io::Result<(BackendMessage, usize)> {
    let (payload, consumed) = dechunk(data)?;

    let mut slice = &payload[..];
    let structure = match unpack(&mut slice) {
        Ok(Value::Structure(s)) => s,
        Ok(other) => {
            return Err(invalid(format!("expected message structure, got {:?}", other)))
        }
        // A complete message that fails to unpack is malformed, not short
        Err(e) => return Err(invalid(format!("malformed message: {}", e))),
    };
    if !slice.is_empty() {
        return Err(invalid(format!(
            "{} trailing bytes after message",
            slice.len()
        )));
    }

    Ok((decode_structure(structure)?, consumed))
}

fn decode_structure(s: Structure) -> io::Result<BackendMessage> {
    let Structure { signature, fields } = s;

    let msg = match signature {
        signatures::SUCCESS => BackendMessage::Success(single_map(fields, "SUCCESS")?),
        signatures::FAILURE => {
            let metadata = single_map(fields, "FAILURE")?;
            BackendMessage::Failure(FailureFields {
                code: metadata.get("code").and_then(Value::as_str).map(str::to_string),
                message: metadata
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        signatures::IGNORED => BackendMessage::Ignored,
        signatures::RECORD => match fields.into_iter().next() {
            Some(Value::List(values)) => BackendMessage::Record(values),
            _ => return Err(invalid("RECORD must carry a list".into())),
        },
        other => return Err(invalid(format!("unknown message signature: 0x{:02X}", other))),
    };

    Ok(msg)
}

fn single_map(fields: Vec<Value>, name: &str) -> io::Result<BTreeMap<String, Value>> {
    match fields.into_iter().next() {
        Some(Value::Map(m)) => Ok(m),
        None => Ok(BTreeMap::new()),
        Some(other) => Err(invalid(format!(
            "{} metadata must be a map, got {:?}",
            name, other
        ))),
    }
}

/// Decode the server's 4-byte version reply
pub fn decode_version(reply: [u8; 4]) -> u32 {
    u32::from_be_bytes(reply)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
