#![no_main]

use bolt_wire::protocol::packstream::{pack, unpack};
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut slice = data;
    if let Ok(value) = unpack(&mut slice) {
        // Anything we accept must re-encode
        let mut buf = BytesMut::new();
        pack(&value, &mut buf).expect("decoded value failed to re-encode");
    }
});
