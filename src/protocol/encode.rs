//! Protocol message encoding

use super::constants::{signatures, BOLT_MAGIC, MAX_CHUNK_SIZE, PROPOSED_VERSIONS};
use super::message::FrontendMessage;
use super::packstream::{pack_structure, Structure, Value};
use bytes::{BufMut, BytesMut};
use std::io;

/// Encode the 20-byte handshake: magic preamble followed by four proposed versions
pub fn encode_handshake() -> BytesMut {
    let mut buf = BytesMut::with_capacity(20);
    buf.put_slice(&BOLT_MAGIC);
    for version in PROPOSED_VERSIONS {
        buf.put_u32(version);
    }
    buf
}

/// Encode a frontend message into chunked bytes ready for the wire
pub fn encode_message(msg: &FrontendMessage) -> io::Result<BytesMut> {
    let structure = match msg {
        FrontendMessage::Init {
            user_agent,
            auth_token,
        } => Structure {
            signature: signatures::INIT,
            fields: vec![
                Value::String(user_agent.clone()),
                Value::Map(auth_token.clone()),
            ],
        },
    };

    let mut payload = BytesMut::new();
    pack_structure(&structure, &mut payload)?;

    let mut buf = BytesMut::with_capacity(payload.len() + 4);
    write_chunked(&payload, &mut buf);
    Ok(buf)
}

/// Frame `payload` as one message: chunks of at most [`MAX_CHUNK_SIZE`] bytes, each
/// with a 2-byte length header, followed by a zero-length end marker.
pub fn write_chunked(payload: &[u8], buf: &mut BytesMut) {
    for chunk in payload.chunks(MAX_CHUNK_SIZE) {
        buf.put_u16(chunk.len() as u16);
        buf.put_slice(chunk);
    }
    buf.put_u16(0);
}
