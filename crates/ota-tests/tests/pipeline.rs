//! End-to-end ingestion: packed image in, committed slot out.
//!
//! Every test drives a real `UpdateSession` through `on_start`,
//! `on_receive` and `on_finish`, over either the NOR storage on a
//! `RamFlash` or the call-recording storage from the fixtures crate.

use ota_flash::{SlotId, UpdateStorage};
use ota_packer::ImagePacker;
use ota_session::{EventLog, Outcome, SessionState, UpdateError, UpdateSession};
use ota_tests::{
    HELLO_ZLIB_HEX, RecordingStorage, StorageOp, compressible_firmware, deliver, firmware,
    nor_storage, pack,
};
use ota_wire::SubElementHeader;

const SLOT: u32 = 256 * 1024;

// ── Round trips over NOR flash ────────────────────────────────────────────────

fn round_trip(data: &[u8], chunk: usize) {
    let image = pack(data);
    let mut session = UpdateSession::new(nor_storage(SLOT), EventLog::new());

    session.on_start().unwrap();
    let appended = deliver(&mut session, &image, chunk).unwrap();
    assert_eq!(appended, data.len(), "chunk size {chunk}");
    let slot = session.on_finish().unwrap();

    let (mut storage, log) = session.into_parts();
    assert_eq!(slot, SlotId::B);
    assert_eq!(storage.boot_target(), SlotId::B);
    assert_eq!(storage.boot_record().image_len, Some(data.len() as u32));
    let written = storage.read_image(slot, data.len() as u32).unwrap();
    assert_eq!(
        blake3::hash(&written),
        blake3::hash(data),
        "chunk size {chunk}"
    );
    assert!(log.restart_requested());
}

#[test]
fn round_trip_random_firmware_across_chunk_sizes() {
    let data = firmware(40_000, 7);
    for chunk in [1, 7, 64, 4096] {
        round_trip(&data, chunk);
    }
}

#[test]
fn round_trip_compressible_firmware_across_chunk_sizes() {
    let data = compressible_firmware(150_000);
    for chunk in [1, 7, 4096] {
        round_trip(&data, chunk);
    }
}

#[test]
fn consecutive_updates_alternate_slots() {
    let mut storage = Some(nor_storage(SLOT));
    for (round, expected) in [SlotId::B, SlotId::A, SlotId::B].into_iter().enumerate() {
        let data = firmware(5_000 + round, round as u32 + 1);
        let mut session = UpdateSession::new(storage.take().unwrap(), EventLog::new());
        session.on_start().unwrap();
        deliver(&mut session, &pack(&data), 64).unwrap();
        assert_eq!(session.on_finish(), Ok(expected));

        let (mut s, _) = session.into_parts();
        assert_eq!(s.read_image(expected, data.len() as u32).unwrap(), data);
        storage = Some(s);
    }
}

// ── Header framing ────────────────────────────────────────────────────────────

#[test]
fn header_split_at_every_offset() {
    let data = firmware(2_000, 3);
    let image = pack(&data);

    for split in 0..=8 {
        let mut storage = RecordingStorage::new();
        let mut session = UpdateSession::new(&mut storage, EventLog::new());
        session.on_start().unwrap();
        session.on_receive(&image[..split]).unwrap();
        if split < 6 {
            assert_eq!(session.remaining(), None, "split {split}");
        }
        session.on_receive(&image[split..]).unwrap();
        session.on_finish().unwrap();
        drop(session);

        assert_eq!(storage.image(SlotId::B), Some(&data[..]), "split {split}");
    }
}

#[test]
fn header_bytes_one_per_delivery() {
    let data = firmware(500, 11);
    let image = pack(&data);
    let mut session = UpdateSession::new(RecordingStorage::new(), EventLog::new());

    session.on_start().unwrap();
    for byte in &image[..6] {
        assert_eq!(session.on_receive(std::slice::from_ref(byte)), Ok(0));
    }
    assert_eq!(session.remaining(), Some(500));
    deliver(&mut session, &image[6..], 100).unwrap();
    session.on_finish().unwrap();

    let (storage, _) = session.into_parts();
    assert_eq!(storage.image(SlotId::B), Some(&data[..]));
}

#[test]
fn empty_deliveries_are_harmless() {
    let data = firmware(1_000, 5);
    let image = pack(&data);
    let mut session = UpdateSession::new(RecordingStorage::new(), EventLog::new());

    session.on_start().unwrap();
    for piece in image.chunks(50) {
        assert_eq!(session.on_receive(&[]), Ok(0));
        session.on_receive(piece).unwrap();
    }
    assert_eq!(session.on_finish(), Ok(SlotId::B));
}

// ── Wire fixtures ─────────────────────────────────────────────────────────────

#[test]
fn hello_fixture_from_reference_encoder() {
    let mut image = hex::decode("000005000000").unwrap();
    image.extend(hex::decode(HELLO_ZLIB_HEX).unwrap());

    let mut session = UpdateSession::new(RecordingStorage::new(), EventLog::new());
    session.on_start().unwrap();
    assert_eq!(deliver(&mut session, &image, 3), Ok(5));
    session.on_finish().unwrap();

    let (storage, _) = session.into_parts();
    assert_eq!(storage.image(SlotId::B), Some(&b"hello"[..]));
}

#[test]
fn packer_output_matches_header_layout() {
    let image = ImagePacker::new(b"hello").pack().unwrap();
    assert_eq!(hex::encode(&image.as_bytes()[..6]), "000005000000");
    assert_eq!(image.header(), SubElementHeader::upgrade_image(5));
}

// ── Length enforcement ────────────────────────────────────────────────────────

#[test]
fn never_appends_past_declared_length() {
    let data = firmware(10_000, 9);
    let mut image = pack(&data);
    image[2..6].copy_from_slice(&4_000u32.to_le_bytes());

    let mut session = UpdateSession::new(RecordingStorage::new(), EventLog::new());
    session.on_start().unwrap();
    for piece in image.chunks(7) {
        session.on_receive(piece).unwrap();
        assert!(session.bytes_written().unwrap() <= 4_000);
    }
    session.on_finish().unwrap();

    let (storage, log) = session.into_parts();
    assert_eq!(storage.appended(), 4_000);
    assert_eq!(storage.image(SlotId::B), Some(&data[..4_000]));
    assert_eq!(
        log.last_outcome(),
        Some(Outcome::Success {
            slot: SlotId::B,
            bytes_written: 4_000
        })
    );
}

#[test]
fn short_stream_is_premature_finish() {
    let data = firmware(3_000, 13);
    let mut image = pack(&data);
    image[2..6].copy_from_slice(&3_500u32.to_le_bytes());

    let mut session = UpdateSession::new(RecordingStorage::new(), EventLog::new());
    session.on_start().unwrap();
    deliver(&mut session, &image, 64).unwrap();
    assert_eq!(session.remaining(), Some(500));

    assert_eq!(
        session.on_finish(),
        Err(UpdateError::PrematureFinish {
            expected: 3_500,
            written: 3_000
        })
    );
    assert_eq!(session.state(), SessionState::Failed);

    let (storage, _) = session.into_parts();
    assert_eq!(storage.boot_target(), SlotId::A);
    assert_eq!(storage.open_handles(), 0);
    assert!(matches!(storage.ops().last(), Some(StorageOp::Abort(SlotId::B))));
}

#[test]
fn trailing_padding_after_stream_is_ignored() {
    let data = firmware(4_096, 17);
    let image = ImagePacker::new(&data).padding(300).pack().unwrap();

    let mut session = UpdateSession::new(nor_storage(SLOT), EventLog::new());
    session.on_start().unwrap();
    deliver(&mut session, image.as_bytes(), 64).unwrap();
    assert_eq!(session.on_finish(), Ok(SlotId::B));
}

#[test]
fn image_larger_than_slot_fails_on_write() {
    let data = firmware(SLOT as usize + 10, 19);
    let image = pack(&data);

    let mut session = UpdateSession::new(nor_storage(SLOT), EventLog::new());
    session.on_start().unwrap();
    let err = deliver(&mut session, &image, 4096).unwrap_err();

    assert!(matches!(err, UpdateError::StorageWrite(_)));
    let (storage, _) = session.into_parts();
    assert_eq!(storage.boot_target(), SlotId::A);
    assert!(!storage.has_pending_update());
}
