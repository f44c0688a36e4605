#![no_main]

use bolt_wire::trust::store::parse_records;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(records) = parse_records(data) {
        // Accepted tables never contain two records for one server
        let mut identities: Vec<_> = records.iter().map(|r| &r.identity).collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), records.len());
    }
});
