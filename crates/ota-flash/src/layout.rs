use crate::error::StorageError;
use crate::storage::SlotId;

/// A contiguous byte range on the flash device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: u32,
    pub size: u32,
}

impl Region {
    #[must_use]
    pub fn end(self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }

    fn overlaps(self, other: Region) -> bool {
        u64::from(self.offset) < other.end() && u64::from(other.offset) < self.end()
    }
}

/// Where the boot record and the two image slots live.
///
/// ```text
/// ┌─────────────┬──────────────────┬──────────────────┐
/// │ boot record │ slot A           │ slot B           │
/// │ (1 sector)  │ (slot_size)      │ (slot_size)      │
/// └─────────────┴──────────────────┴──────────────────┘
/// ```
///
/// Every region must start and end on an erase-sector boundary and the
/// regions must not overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionLayout {
    pub boot_record: Region,
    pub slots: [Region; 2],
}

impl PartitionLayout {
    /// Boot record in the first `sector` bytes, then slot A, then slot B.
    #[must_use]
    pub fn contiguous(sector: u32, slot_size: u32) -> Self {
        Self {
            boot_record: Region {
                offset: 0,
                size: sector,
            },
            slots: [
                Region {
                    offset: sector,
                    size: slot_size,
                },
                Region {
                    offset: sector + slot_size,
                    size: slot_size,
                },
            ],
        }
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> Region {
        self.slots[id.index()]
    }

    /// Bytes of flash the layout spans, from offset 0.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.slots
            .iter()
            .map(|r| r.end())
            .chain(std::iter::once(self.boot_record.end()))
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn validate(&self, capacity: usize, erase_size: u32) -> Result<(), StorageError> {
        let regions = [self.boot_record, self.slots[0], self.slots[1]];

        for region in regions {
            if region.size == 0 {
                return Err(StorageError::Layout {
                    reason: "empty region",
                });
            }
            if region.offset % erase_size != 0 || region.size % erase_size != 0 {
                return Err(StorageError::Layout {
                    reason: "region not aligned to erase sector",
                });
            }
            if region.end() > capacity as u64 {
                return Err(StorageError::Layout {
                    reason: "region beyond flash capacity",
                });
            }
        }

        for (i, a) in regions.iter().enumerate() {
            if regions[i + 1..].iter().any(|b| a.overlaps(*b)) {
                return Err(StorageError::Layout {
                    reason: "regions overlap",
                });
            }
        }

        Ok(())
    }
}
