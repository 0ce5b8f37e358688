#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ota_wire::{HeaderCursor, SubElementHeader};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    data: Vec<u8>,
    splits: Vec<u8>,
}

// Fuzz target: HeaderCursor fed the same bytes under arbitrary splits must
// agree with a one-shot parse, and must hand back exactly the bytes after
// the header.
fuzz_target!(|input: FuzzInput| {
    let expected = SubElementHeader::read_from(&input.data);

    let mut cursor = HeaderCursor::new();
    let mut rest = Vec::new();
    let mut result = None;
    let mut data = &input.data[..];
    let mut splits = input.splits.iter();

    while !data.is_empty() {
        let take = splits.next().map_or(data.len(), |n| (*n as usize).min(data.len()));
        let (piece, tail) = data.split_at(take);
        data = tail;
        match cursor.consume(piece) {
            Ok(consumed) => {
                assert!(consumed.consumed <= piece.len());
                rest.extend_from_slice(consumed.rest);
                if let Some(header) = consumed.header {
                    result = Some(Ok(header));
                }
            }
            Err(e) => {
                result = Some(Err(e));
                break;
            }
        }
    }

    match (expected, result) {
        (Ok(header), Some(Ok(got))) => {
            assert_eq!(header, got);
            assert_eq!(rest, &input.data[ota_wire::HEADER_SIZE..]);
        }
        (Err(_), Some(Err(_))) => {}
        (Err(_), None) => assert!(input.data.len() < ota_wire::HEADER_SIZE),
        (expected, got) => panic!("one-shot {expected:?} vs incremental {got:?}"),
    }
});
