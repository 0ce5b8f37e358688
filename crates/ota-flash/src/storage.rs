use std::fmt;

use crate::error::StorageError;

/// One of the two image slots. The device boots from one and updates the
/// other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    /// The slot that is not `self`.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SlotId::A),
            1 => Some(SlotId::B),
            _ => None,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::A => f.write_str("A"),
            SlotId::B => f.write_str("B"),
        }
    }
}

/// Sequential-append storage for the next boot image.
///
/// The session is the only caller. It holds at most one handle at a time and
/// hands it back through exactly one of [`commit`](Self::commit) or
/// [`abort`](Self::abort), both of which consume it.
///
/// ```text
///   begin() ──▶ Handle ──append()*──▶ commit() ──▶ set_boot_target(slot)
///                  │
///                  └──────────────▶ abort()   (boot target untouched)
/// ```
pub trait UpdateStorage {
    /// In-progress write state for one candidate image.
    type Handle;

    /// Claim the update slot and prepare it for sequential writes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Busy`] if a handle is already outstanding, or
    /// a backend error if the slot cannot be prepared.
    fn begin(&mut self) -> Result<Self::Handle, StorageError>;

    /// Append `bytes` after everything written so far. Must tolerate many
    /// small calls.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the medium rejects the write or the slot
    /// is full.
    fn append(&mut self, handle: &mut Self::Handle, bytes: &[u8]) -> Result<(), StorageError>;

    /// Flush and seal the written image. Does not change the boot target.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the final flush fails.
    fn commit(&mut self, handle: Self::Handle) -> Result<SlotId, StorageError>;

    /// Make `slot` the image the bootloader loads next.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotCommitted`] if `slot` was not committed by
    /// this storage, or a backend error if the boot record cannot be written.
    fn set_boot_target(&mut self, slot: SlotId) -> Result<(), StorageError>;

    /// Release the slot without touching the boot target.
    fn abort(&mut self, handle: Self::Handle);

    /// The slot the bootloader will load next.
    fn boot_target(&self) -> SlotId;
}

impl<S: UpdateStorage + ?Sized> UpdateStorage for &mut S {
    type Handle = S::Handle;

    fn begin(&mut self) -> Result<Self::Handle, StorageError> {
        (**self).begin()
    }

    fn append(&mut self, handle: &mut Self::Handle, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).append(handle, bytes)
    }

    fn commit(&mut self, handle: Self::Handle) -> Result<SlotId, StorageError> {
        (**self).commit(handle)
    }

    fn set_boot_target(&mut self, slot: SlotId) -> Result<(), StorageError> {
        (**self).set_boot_target(slot)
    }

    fn abort(&mut self, handle: Self::Handle) {
        (**self).abort(handle);
    }

    fn boot_target(&self) -> SlotId {
        (**self).boot_target()
    }
}
