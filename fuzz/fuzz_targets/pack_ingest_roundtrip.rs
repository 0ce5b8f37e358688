#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash, SlotId};
use ota_packer::ImagePacker;
use ota_session::{EventLog, UpdateSession};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    firmware: Vec<u8>,
    level: u8,
    chunk: u8,
    padding: u8,
}

// Fuzz target: pack arbitrary firmware, deliver it in arbitrary chunk
// sizes, and read back exactly what went in.
fuzz_target!(|input: FuzzInput| {
    if input.firmware.is_empty() || input.firmware.len() > 64 * 1024 {
        return;
    }
    let image = ImagePacker::new(&input.firmware)
        .level(u32::from(input.level % 10))
        .padding(usize::from(input.padding))
        .pack()
        .unwrap();

    let layout = PartitionLayout::contiguous(4096, 16 * 4096);
    let flash = RamFlash::new(layout.total_size() as usize);
    let storage = NorFlashStorage::open(flash, layout).unwrap();
    let mut session = UpdateSession::new(storage, EventLog::new());

    session.on_start().unwrap();
    for piece in image.as_bytes().chunks(usize::from(input.chunk).max(1)) {
        session.on_receive(piece).unwrap();
    }
    assert_eq!(session.on_finish().unwrap(), SlotId::B);

    let (mut storage, _) = session.into_parts();
    let len = input.firmware.len() as u32;
    assert_eq!(storage.read_image(SlotId::B, len).unwrap(), input.firmware);
});
