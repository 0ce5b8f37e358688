#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: SubElementHeader::read_from with arbitrary bytes.
//
// Catches bugs in:
// - Truncated header handling
// - Tag validation
// - Length decoding
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = ota_wire::SubElementHeader::read_from(data) {
        assert_eq!(header.tag, ota_wire::TAG_UPGRADE_IMAGE);
        assert_eq!(&header.to_bytes()[..], &data[..ota_wire::HEADER_SIZE]);
    }
});
