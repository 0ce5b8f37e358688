use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};

/// Erase sector size of [`RamFlash`].
pub const SECTOR_SIZE: usize = 4096;

/// Write granularity of [`RamFlash`].
pub const WORD_SIZE: usize = 4;

/// In-memory NOR flash for host-side runs and tests.
///
/// Behaves like the real part where it matters: erase sets a sector to
/// `0xFF`, writes can only clear bits, and misaligned or out-of-range
/// operations fail. A write fault can be armed to simulate a worn device.
#[derive(Clone, Debug)]
pub struct RamFlash {
    data: Vec<u8>,
    writes: usize,
    erases: usize,
    fail_after: Option<usize>,
}

impl RamFlash {
    /// A fully erased device. `capacity` is rounded up to whole sectors.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::from_bytes(vec![0xFF; capacity])
    }

    /// Wrap an existing flash dump, padding it with erased bytes to a whole
    /// number of sectors.
    #[must_use]
    pub fn from_bytes(mut data: Vec<u8>) -> Self {
        let padded = data.len().div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
        data.resize(padded, 0xFF);
        Self {
            data,
            writes: 0,
            erases: 0,
            fail_after: None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Successful `write` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn erase_count(&self) -> usize {
        self.erases
    }

    /// Let `n` more writes succeed, then fail every write after that.
    pub fn fail_writes_after(&mut self, n: usize) {
        self.fail_after = Some(self.writes + n);
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, NorFlashErrorKind> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(NorFlashErrorKind::OutOfBounds)?;
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = WORD_SIZE;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        if from as usize % SECTOR_SIZE != 0 || to as usize % SECTOR_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let range = self.range(from, (to - from) as usize)?;
        self.data[range].fill(0xFF);
        self.erases += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset as usize % WORD_SIZE != 0 || bytes.len() % WORD_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(NorFlashErrorKind::Other);
        }
        let range = self.range(offset, bytes.len())?;
        for (cell, byte) in self.data[range].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        self.writes += 1;
        Ok(())
    }
}
