//! Bolt protocol constants

/// Preamble sent before version negotiation
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Versions proposed during the handshake, in order of preference (0 = unused slot)
pub const PROPOSED_VERSIONS: [u32; 4] = [1, 0, 0, 0];

/// Version reply meaning "none of the proposed versions"
pub const NO_VERSION: u32 = 0;

/// First four bytes of an HTTP response (`HTTP`), seen when dialing the HTTP port
pub const HTTP_SIGNATURE: u32 = 0x4854_5450;

/// Largest chunk body allowed by the chunked transfer encoding
pub const MAX_CHUNK_SIZE: usize = 0xFFFF;

/// Largest reassembled message accepted from the server (16 MiB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default Bolt port
pub const DEFAULT_PORT: u16 = 7687;

/// Message structure signatures
pub mod signatures {
    /// INIT request (client → server)
    pub const INIT: u8 = 0x01;

    /// SUCCESS summary
    pub const SUCCESS: u8 = 0x70;

    /// RECORD detail
    pub const RECORD: u8 = 0x71;

    /// IGNORED summary
    pub const IGNORED: u8 = 0x7E;

    /// FAILURE summary
    pub const FAILURE: u8 = 0x7F;
}

/// PackStream marker bytes
pub mod markers {
    /// Null
    pub const NULL: u8 = 0xC0;
    /// 64-bit float
    pub const FLOAT_64: u8 = 0xC1;
    /// false
    pub const FALSE: u8 = 0xC2;
    /// true
    pub const TRUE: u8 = 0xC3;

    /// 8-bit integer
    pub const INT_8: u8 = 0xC8;
    /// 16-bit integer
    pub const INT_16: u8 = 0xC9;
    /// 32-bit integer
    pub const INT_32: u8 = 0xCA;
    /// 64-bit integer
    pub const INT_64: u8 = 0xCB;

    /// Byte array, 8-bit length
    pub const BYTES_8: u8 = 0xCC;
    /// Byte array, 16-bit length
    pub const BYTES_16: u8 = 0xCD;
    /// Byte array, 32-bit length
    pub const BYTES_32: u8 = 0xCE;

    /// String, length in low nibble
    pub const TINY_STRING: u8 = 0x80;
    /// String, 8-bit length
    pub const STRING_8: u8 = 0xD0;
    /// String, 16-bit length
    pub const STRING_16: u8 = 0xD1;
    /// String, 32-bit length
    pub const STRING_32: u8 = 0xD2;

    /// List, length in low nibble
    pub const TINY_LIST: u8 = 0x90;
    /// List, 8-bit length
    pub const LIST_8: u8 = 0xD4;
    /// List, 16-bit length
    pub const LIST_16: u8 = 0xD5;
    /// List, 32-bit length
    pub const LIST_32: u8 = 0xD6;

    /// Map, length in low nibble
    pub const TINY_MAP: u8 = 0xA0;
    /// Map, 8-bit length
    pub const MAP_8: u8 = 0xD8;
    /// Map, 16-bit length
    pub const MAP_16: u8 = 0xD9;
    /// Map, 32-bit length
    pub const MAP_32: u8 = 0xDA;

    /// Structure, field count in low nibble
    pub const TINY_STRUCT: u8 = 0xB0;
    /// Structure, 8-bit field count
    pub const STRUCT_8: u8 = 0xDC;
    /// Structure, 16-bit field count
    pub const STRUCT_16: u8 = 0xDD;
}
