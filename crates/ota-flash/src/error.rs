use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

use crate::storage::SlotId;

/// Errors raised by an [`UpdateStorage`](crate::UpdateStorage) backend.
///
/// ```text
/// ┌───────────────┬────────────────────────────────────────────────────┐
/// │ Variant       │ Cause                                              │
/// ├───────────────┼────────────────────────────────────────────────────┤
/// │ Busy          │ begin() while another handle is still outstanding  │
/// │ OutOfSpace    │ append would overflow the update slot              │
/// │ NotCommitted  │ boot target set to a slot with no committed image  │
/// │ Layout        │ partition table does not fit or is misaligned      │
/// │ Flash         │ the device rejected a read, erase or write         │
/// └───────────────┴────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("an update slot is already open")]
    Busy,

    #[error("slot {slot} overflow: {needed} bytes needed, {capacity} available")]
    OutOfSpace {
        slot: SlotId,
        needed: u64,
        capacity: u32,
    },

    #[error("slot {slot} holds no committed image")]
    NotCommitted { slot: SlotId },

    #[error("invalid partition layout: {reason}")]
    Layout { reason: &'static str },

    #[error("flash operation failed: {0:?}")]
    Flash(NorFlashErrorKind),
}

pub(crate) fn flash<E: NorFlashError>(err: E) -> StorageError {
    StorageError::Flash(err.kind())
}
