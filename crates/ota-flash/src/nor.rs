use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use tracing::{debug, info, warn};

use crate::boot_record::{BootRecord, RECORD_LEN};
use crate::error::{self, StorageError};
use crate::layout::{PartitionLayout, Region};
use crate::storage::{SlotId, UpdateStorage};

/// Bytes buffered in a handle before they are written to flash.
///
/// Small appends from the session land here first so the device sees
/// aligned, page-sized writes.
pub const STAGING_SIZE: usize = 256;

/// A/B image storage on a NOR flash device.
///
/// Updates always go to the slot the bootloader is *not* using. Sectors are
/// erased lazily just ahead of the write cursor, so an aborted update only
/// costs the sectors it actually touched. The boot record is rewritten only
/// by [`set_boot_target`](UpdateStorage::set_boot_target), and only for a
/// slot this storage committed.
pub struct NorFlashStorage<F> {
    flash: F,
    layout: PartitionLayout,
    erase_size: u32,
    boot: BootRecord,
    committed: [Option<u32>; 2],
    pending: bool,
}

/// Write cursor for one candidate image.
pub struct NorHandle {
    slot: SlotId,
    /// Logical bytes appended, including those still staged.
    len: u32,
    /// Bytes already written to flash, always a multiple of `STAGING_SIZE`
    /// until the final padded flush.
    flushed: u32,
    /// Bytes of the slot erased so far.
    erased: u32,
    staging: [u8; STAGING_SIZE],
    fill: usize,
}

impl NorHandle {
    #[must_use]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Bytes appended through this handle.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn round_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

impl<F: NorFlash> NorFlashStorage<F> {
    /// Validate `layout` against the device and load the boot record.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Layout`] if a region is misaligned, overlaps another
    ///   or lies beyond the device, or the device's write size does not
    ///   divide the staging buffer.
    /// - [`StorageError::Flash`] if the boot record cannot be read.
    pub fn open(mut flash: F, layout: PartitionLayout) -> Result<Self, StorageError> {
        let erase_size = u32::try_from(F::ERASE_SIZE).map_err(|_| StorageError::Layout {
            reason: "erase size exceeds 32 bits",
        })?;
        if STAGING_SIZE % F::WRITE_SIZE != 0 {
            return Err(StorageError::Layout {
                reason: "write size does not divide the staging buffer",
            });
        }
        layout.validate(flash.capacity(), erase_size)?;
        if round_up(RECORD_LEN, F::WRITE_SIZE) > layout.boot_record.size as usize {
            return Err(StorageError::Layout {
                reason: "boot record region too small",
            });
        }

        let mut raw = vec![0u8; round_up(RECORD_LEN, F::READ_SIZE)];
        flash
            .read(layout.boot_record.offset, &mut raw)
            .map_err(error::flash)?;
        let boot = BootRecord::decode(&raw).unwrap_or_else(|| {
            debug!("no boot record, assuming factory image in slot A");
            BootRecord::default()
        });

        Ok(Self {
            flash,
            layout,
            erase_size,
            boot,
            committed: [None; 2],
            pending: false,
        })
    }

    #[must_use]
    pub fn boot_record(&self) -> BootRecord {
        self.boot
    }

    #[must_use]
    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// `true` while a handle from [`begin`](UpdateStorage::begin) is alive.
    #[must_use]
    pub fn has_pending_update(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    #[must_use]
    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Read the first `len` bytes of `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OutOfSpace`] if `len` exceeds the slot, or a
    /// flash error if the read fails.
    pub fn read_image(&mut self, slot: SlotId, len: u32) -> Result<Vec<u8>, StorageError> {
        let region = self.layout.slot(slot);
        if len > region.size {
            return Err(StorageError::OutOfSpace {
                slot,
                needed: u64::from(len),
                capacity: region.size,
            });
        }
        let mut buf = vec![0u8; round_up(len as usize, F::READ_SIZE)];
        self.flash.read(region.offset, &mut buf).map_err(error::flash)?;
        buf.truncate(len as usize);
        Ok(buf)
    }

    fn flush_staging(&mut self, handle: &mut NorHandle, region: Region) -> Result<(), StorageError> {
        if handle.fill == 0 {
            return Ok(());
        }

        let padded = round_up(handle.fill, F::WRITE_SIZE);
        handle.staging[handle.fill..padded].fill(0xFF);

        #[allow(clippy::cast_possible_truncation)]
        let end = handle.flushed + padded as u32;
        while handle.erased < end {
            let from = region.offset + handle.erased;
            self.flash
                .erase(from, from + self.erase_size)
                .map_err(error::flash)?;
            handle.erased += self.erase_size;
        }

        self.flash
            .write(region.offset + handle.flushed, &handle.staging[..padded])
            .map_err(error::flash)?;
        handle.flushed = end;
        handle.fill = 0;
        Ok(())
    }

    fn write_boot_record(&mut self, record: BootRecord) -> Result<(), StorageError> {
        let region = self.layout.boot_record;
        let mut buf = vec![0xFF; round_up(RECORD_LEN, F::WRITE_SIZE)];
        buf[..RECORD_LEN].copy_from_slice(&record.encode());

        self.flash
            .erase(region.offset, region.offset + region.size)
            .map_err(error::flash)?;
        self.flash.write(region.offset, &buf).map_err(error::flash)
    }
}

impl<F: NorFlash> UpdateStorage for NorFlashStorage<F> {
    type Handle = NorHandle;

    fn begin(&mut self) -> Result<NorHandle, StorageError> {
        if self.pending {
            return Err(StorageError::Busy);
        }
        let slot = self.boot.slot.other();
        self.committed[slot.index()] = None;
        self.pending = true;
        debug!(%slot, "update slot opened");

        Ok(NorHandle {
            slot,
            len: 0,
            flushed: 0,
            erased: 0,
            staging: [0xFF; STAGING_SIZE],
            fill: 0,
        })
    }

    fn append(&mut self, handle: &mut NorHandle, mut bytes: &[u8]) -> Result<(), StorageError> {
        let region = self.layout.slot(handle.slot);
        let needed = u64::from(handle.len) + bytes.len() as u64;
        if needed > u64::from(region.size) {
            return Err(StorageError::OutOfSpace {
                slot: handle.slot,
                needed,
                capacity: region.size,
            });
        }

        while !bytes.is_empty() {
            let take = (STAGING_SIZE - handle.fill).min(bytes.len());
            handle.staging[handle.fill..handle.fill + take].copy_from_slice(&bytes[..take]);
            handle.fill += take;
            bytes = &bytes[take..];
            #[allow(clippy::cast_possible_truncation)]
            {
                handle.len += take as u32;
            }

            if handle.fill == STAGING_SIZE {
                self.flush_staging(handle, region)?;
            }
        }
        Ok(())
    }

    fn commit(&mut self, mut handle: NorHandle) -> Result<SlotId, StorageError> {
        self.pending = false;
        let region = self.layout.slot(handle.slot);
        self.flush_staging(&mut handle, region)?;

        self.committed[handle.slot.index()] = Some(handle.len);
        debug!(slot = %handle.slot, len = handle.len, "update slot committed");
        Ok(handle.slot)
    }

    fn set_boot_target(&mut self, slot: SlotId) -> Result<(), StorageError> {
        let Some(len) = self.committed[slot.index()] else {
            warn!(%slot, "refusing to boot an uncommitted slot");
            return Err(StorageError::NotCommitted { slot });
        };

        let record = BootRecord {
            slot,
            image_len: Some(len),
        };
        self.write_boot_record(record)?;
        self.boot = record;
        info!(%slot, len, "boot target switched");
        Ok(())
    }

    fn abort(&mut self, handle: NorHandle) {
        self.pending = false;
        self.committed[handle.slot.index()] = None;
        debug!(slot = %handle.slot, len = handle.len, "update slot released");
    }

    fn boot_target(&self) -> SlotId {
        self.boot.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ram::{RamFlash, SECTOR_SIZE};

    const SLOT: u32 = 2 * SECTOR_SIZE as u32;

    fn storage() -> NorFlashStorage<RamFlash> {
        let layout = PartitionLayout::contiguous(SECTOR_SIZE as u32, SLOT);
        let flash = RamFlash::new(layout.total_size() as usize);
        NorFlashStorage::open(flash, layout).unwrap()
    }

    fn firmware(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn fresh_device_boots_slot_a() {
        let storage = storage();
        assert_eq!(storage.boot_target(), SlotId::A);
        assert_eq!(storage.boot_record().image_len, None);
    }

    #[test]
    fn small_appends_land_contiguously() {
        let mut storage = storage();
        let image = firmware(1000);
        let mut handle = storage.begin().unwrap();
        assert_eq!(handle.slot(), SlotId::B);
        for chunk in image.chunks(13) {
            storage.append(&mut handle, chunk).unwrap();
        }
        let slot = storage.commit(handle).unwrap();
        assert_eq!(storage.read_image(slot, 1000).unwrap(), image);
    }

    #[test]
    fn boot_switch_persists_across_reopen() {
        let mut storage = storage();
        let image = firmware(SECTOR_SIZE + 77);
        let mut handle = storage.begin().unwrap();
        storage.append(&mut handle, &image).unwrap();
        let slot = storage.commit(handle).unwrap();
        storage.set_boot_target(slot).unwrap();

        let layout = *storage.layout();
        let mut reopened = NorFlashStorage::open(storage.into_inner(), layout).unwrap();
        assert_eq!(reopened.boot_target(), SlotId::B);
        assert_eq!(
            reopened.boot_record().image_len,
            Some(image.len() as u32)
        );
        assert_eq!(
            reopened.read_image(SlotId::B, image.len() as u32).unwrap(),
            image
        );
    }

    #[test]
    fn second_begin_is_busy() {
        let mut storage = storage();
        let handle = storage.begin().unwrap();
        assert!(matches!(storage.begin(), Err(StorageError::Busy)));
        storage.abort(handle);
        assert!(storage.begin().is_ok());
    }

    #[test]
    fn abort_leaves_boot_target() {
        let mut storage = storage();
        let mut handle = storage.begin().unwrap();
        storage.append(&mut handle, &firmware(600)).unwrap();
        storage.abort(handle);
        assert!(!storage.has_pending_update());
        assert_eq!(storage.boot_target(), SlotId::A);
        assert_eq!(
            storage.set_boot_target(SlotId::B),
            Err(StorageError::NotCommitted { slot: SlotId::B })
        );
    }

    #[test]
    fn overflow_is_rejected_before_writing() {
        let mut storage = storage();
        let mut handle = storage.begin().unwrap();
        let result = storage.append(&mut handle, &vec![0u8; SLOT as usize + 1]);
        assert!(matches!(result, Err(StorageError::OutOfSpace { .. })));
        assert_eq!(storage.flash().write_count(), 0);
    }

    #[test]
    fn flash_fault_surfaces_as_error() {
        let mut storage = storage();
        storage.flash_mut().fail_writes_after(0);
        let mut handle = storage.begin().unwrap();
        let result = storage.append(&mut handle, &firmware(STAGING_SIZE));
        assert!(matches!(result, Err(StorageError::Flash(_))));
    }

    #[test]
    fn rewriting_a_slot_erases_old_content() {
        let mut storage = storage();
        for fill in [0x00u8, 0xA5] {
            let mut handle = storage.begin().unwrap();
            storage.append(&mut handle, &[fill; 300]).unwrap();
            let slot = storage.commit(handle).unwrap();
            assert_eq!(storage.read_image(slot, 300).unwrap(), vec![fill; 300]);
        }
    }
}
