#![no_main]

use libfuzzer_sys::fuzz_target;
use ota_session::Inflater;

// Fuzz target: the streaming inflater on arbitrary input, delivered in
// 7-byte pieces.
//
// Catches bugs in:
// - Chunk bounds (no chunk may exceed the scratch buffer)
// - Error handling on corrupt streams
// - Termination when the decoder makes no progress
fuzz_target!(|data: &[u8]| {
    let mut inflater = Inflater::new(64).unwrap();
    let mut total = 0u64;
    'outer: for piece in data.chunks(7) {
        let mut feed = inflater.feed(piece);
        while let Some(chunk) = feed.next() {
            match chunk {
                Ok(chunk) => {
                    assert!(chunk.len() <= 64);
                    total += chunk.len() as u64;
                }
                Err(_) => break 'outer,
            }
        }
    }
    assert!(total <= inflater.total_out());
});
