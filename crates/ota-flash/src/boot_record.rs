use crate::storage::SlotId;

/// Magic bytes that open a valid boot record.
pub const RECORD_MAGIC: [u8; 4] = *b"OTAB";

/// Encoded size of a boot record before padding to the write granularity.
pub const RECORD_LEN: usize = 12;

/// Which slot the bootloader loads, and how long its image is.
///
/// ```text
/// ┌────────┬─────────┬─────────────────────────────────┐
/// │ Offset │ Size    │ Description                     │
/// ├────────┼─────────┼─────────────────────────────────┤
/// │ 0x00   │ 4 bytes │ Magic "OTAB"                    │
/// │ 0x04   │ 1 byte  │ Slot index (0 = A, 1 = B)       │
/// │ 0x05   │ 1 byte  │ Bitwise complement of the index │
/// │ 0x06   │ 2 bytes │ Reserved (0xFF)                 │
/// │ 0x08   │ 4 bytes │ Image length, little-endian     │
/// └────────┴─────────┴─────────────────────────────────┘
/// ```
///
/// An erased or damaged record decodes to `None`; the storage then falls
/// back to slot A with an unknown length (factory image).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootRecord {
    pub slot: SlotId,
    pub image_len: Option<u32>,
}

impl Default for BootRecord {
    fn default() -> Self {
        Self {
            slot: SlotId::A,
            image_len: None,
        }
    }
}

impl BootRecord {
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        #[allow(clippy::cast_possible_truncation)]
        let index = self.slot.index() as u8;
        let mut buf = [0xFF; RECORD_LEN];
        buf[0..4].copy_from_slice(&RECORD_MAGIC);
        buf[4] = index;
        buf[5] = !index;
        buf[8..12].copy_from_slice(&self.image_len.unwrap_or(u32::MAX).to_le_bytes());
        buf
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < RECORD_LEN || buf[0..4] != RECORD_MAGIC || buf[5] != !buf[4] {
            return None;
        }
        let slot = SlotId::from_index(buf[4])?;
        let len = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        Some(Self {
            slot,
            image_len: (len != u32::MAX).then_some(len),
        })
    }
}
