//! Flash dumps on disk, opened as A/B storage.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, bail};
use ota_flash::ram::SECTOR_SIZE;
use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash};

/// Default size of one image slot.
pub const DEFAULT_SLOT_SIZE: u32 = 1024 * 1024;

/// The layout `otactl` uses: one boot-record sector, then slot A, then B.
pub fn layout(slot_size: u32) -> Result<PartitionLayout> {
    #[allow(clippy::cast_possible_truncation)]
    let sector = SECTOR_SIZE as u32;
    if slot_size == 0 || slot_size % sector != 0 {
        bail!("slot size {slot_size} is not a non-zero multiple of {sector}");
    }
    Ok(PartitionLayout::contiguous(sector, slot_size))
}

/// Open `path` as NOR storage. A missing file is treated as a fully erased
/// device; a short one is padded with erased bytes.
pub fn open(path: &Path, slot_size: u32, create: bool) -> Result<NorFlashStorage<RamFlash>> {
    let layout = layout(slot_size)?;
    let mut bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if create && e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
    };

    let total = usize::try_from(layout.total_size()).context("layout exceeds address space")?;
    if bytes.len() > total {
        bail!(
            "{} is {} bytes, larger than the {total}-byte layout; check --slot-size",
            path.display(),
            bytes.len()
        );
    }
    bytes.resize(total, 0xFF);

    NorFlashStorage::open(RamFlash::from_bytes(bytes), layout)
        .with_context(|| format!("cannot open {} as update storage", path.display()))
}

/// Write the device contents back to `path`.
pub fn save(path: &Path, storage: NorFlashStorage<RamFlash>) -> Result<()> {
    let bytes = storage.into_inner().into_bytes();
    fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
}
