//! Shared fixtures for the integration tests and benches.

use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash, SlotId, StorageError, UpdateStorage};
use ota_packer::ImagePacker;
use ota_session::{Clock, UpdateError, UpdateObserver, UpdateSession};

/// Erase sector used by every test layout.
pub const SECTOR: u32 = 4096;

/// `zlib.compress(b"hello")`, a 13-byte stream from a well-known encoder.
pub const HELLO_ZLIB_HEX: &str = "789ccb48cdc9c90700062c0215";

/// Pseudo-random, effectively incompressible bytes.
#[must_use]
pub fn firmware(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x.to_le_bytes()[0]
        })
        .collect()
}

/// Bytes that look like code: repetitive, compresses well.
#[must_use]
pub fn compressible_firmware(len: usize) -> Vec<u8> {
    b"\x00\xb5\x01\x4b\x18\x68\x70\x47\x00\x20\x02\x40"
        .iter()
        .copied()
        .cycle()
        .enumerate()
        .map(|(i, b)| if i % 97 == 0 { b.wrapping_add(1) } else { b })
        .take(len)
        .collect()
}

/// Header + zlib stream at the default level.
///
/// # Panics
///
/// Panics if `firmware` is empty.
#[must_use]
pub fn pack(firmware: &[u8]) -> Vec<u8> {
    ImagePacker::new(firmware).pack().unwrap().into_bytes()
}

/// Erased NOR storage with two slots of `slot_size` bytes.
///
/// # Panics
///
/// Panics if `slot_size` is not a multiple of [`SECTOR`].
#[must_use]
pub fn nor_storage(slot_size: u32) -> NorFlashStorage<RamFlash> {
    let layout = PartitionLayout::contiguous(SECTOR, slot_size);
    let flash = RamFlash::new(usize::try_from(layout.total_size()).unwrap());
    NorFlashStorage::open(flash, layout).unwrap()
}

/// Feed `image` to `session` in `chunk`-byte deliveries, stopping at the
/// first error. Returns the decompressed bytes appended.
///
/// # Errors
///
/// The first error `on_receive` returns.
pub fn deliver<S, O, C>(
    session: &mut UpdateSession<S, O, C>,
    image: &[u8],
    chunk: usize,
) -> Result<usize, UpdateError>
where
    S: UpdateStorage,
    O: UpdateObserver,
    C: Clock,
{
    let mut appended = 0;
    for piece in image.chunks(chunk) {
        appended += session.on_receive(piece)?;
    }
    Ok(appended)
}

// ── Recording storage ─────────────────────────────────────────────────────────

/// One call observed by [`RecordingStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageOp {
    Begin(SlotId),
    Append(usize),
    Commit(SlotId),
    Abort(SlotId),
    SetBootTarget(SlotId),
}

/// Failures [`RecordingStorage`] injects on demand.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub begin: Option<StorageError>,
    /// Fail any append that would take the image past this many bytes.
    pub append_limit: Option<usize>,
    pub commit: Option<StorageError>,
    pub boot_target: Option<StorageError>,
}

/// In-memory A/B storage that logs every call and counts open handles.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    pub faults: Faults,
    ops: Vec<StorageOp>,
    boot: Option<SlotId>,
    images: [Option<Vec<u8>>; 2],
    open: usize,
    max_open: usize,
}

#[derive(Debug)]
pub struct RecordingHandle {
    slot: SlotId,
    data: Vec<u8>,
}

impl RecordingStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ops(&self) -> &[StorageOp] {
        &self.ops
    }

    /// Handles currently outstanding.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.open
    }

    /// Most handles ever outstanding at once.
    #[must_use]
    pub fn max_open_handles(&self) -> usize {
        self.max_open
    }

    /// Bytes appended across all handles.
    #[must_use]
    pub fn appended(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                StorageOp::Append(n) => *n,
                _ => 0,
            })
            .sum()
    }

    /// The committed image in `slot`.
    #[must_use]
    pub fn image(&self, slot: SlotId) -> Option<&[u8]> {
        self.images[slot.index()].as_deref()
    }
}

impl UpdateStorage for RecordingStorage {
    type Handle = RecordingHandle;

    fn begin(&mut self) -> Result<RecordingHandle, StorageError> {
        if let Some(e) = self.faults.begin.clone() {
            return Err(e);
        }
        if self.open > 0 {
            return Err(StorageError::Busy);
        }
        self.open += 1;
        self.max_open = self.max_open.max(self.open);
        let slot = self.boot_target().other();
        self.ops.push(StorageOp::Begin(slot));
        Ok(RecordingHandle {
            slot,
            data: Vec::new(),
        })
    }

    fn append(&mut self, handle: &mut RecordingHandle, bytes: &[u8]) -> Result<(), StorageError> {
        let needed = handle.data.len() + bytes.len();
        if let Some(limit) = self.faults.append_limit {
            if needed > limit {
                return Err(StorageError::OutOfSpace {
                    slot: handle.slot,
                    needed: needed as u64,
                    capacity: u32::try_from(limit).unwrap_or(u32::MAX),
                });
            }
        }
        handle.data.extend_from_slice(bytes);
        self.ops.push(StorageOp::Append(bytes.len()));
        Ok(())
    }

    fn commit(&mut self, handle: RecordingHandle) -> Result<SlotId, StorageError> {
        self.open -= 1;
        if let Some(e) = self.faults.commit.clone() {
            return Err(e);
        }
        self.ops.push(StorageOp::Commit(handle.slot));
        self.images[handle.slot.index()] = Some(handle.data);
        Ok(handle.slot)
    }

    fn set_boot_target(&mut self, slot: SlotId) -> Result<(), StorageError> {
        if let Some(e) = self.faults.boot_target.clone() {
            return Err(e);
        }
        if self.images[slot.index()].is_none() {
            return Err(StorageError::NotCommitted { slot });
        }
        self.ops.push(StorageOp::SetBootTarget(slot));
        self.boot = Some(slot);
        Ok(())
    }

    fn abort(&mut self, handle: RecordingHandle) {
        self.open -= 1;
        self.ops.push(StorageOp::Abort(handle.slot));
    }

    fn boot_target(&self) -> SlotId {
        self.boot.unwrap_or(SlotId::A)
    }
}
