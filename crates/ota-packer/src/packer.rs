use ota_wire::header::{HEADER_SIZE, SubElementHeader, TAG_UPGRADE_IMAGE};

use crate::compression::{self, DEFAULT_LEVEL, MAX_LEVEL};
use crate::error::PackError;

/// Builds the byte stream a device receives for an update.
///
/// ```text
/// ┌──────────────┬────────────────────────────────────────────┐
/// │ [6 bytes]    │ Sub-element header (tag, decompressed len) │
/// │ [N bytes]    │ zlib(firmware)                             │
/// │ [P bytes]    │ optional 0xFF padding (ignored by devices) │
/// └──────────────┴────────────────────────────────────────────┘
/// ```
///
/// # Usage
///
/// ```rust
/// use ota_packer::ImagePacker;
///
/// let firmware = vec![0u8; 4096];
/// let image = ImagePacker::new(&firmware).level(6).pack().unwrap();
/// assert_eq!(image.header().length, 4096);
/// ```
pub struct ImagePacker<'a> {
    firmware: &'a [u8],
    level: u32,
    tag: u16,
    padding: usize,
}

/// A packed update image plus the facts the CLI reports about it.
#[derive(Clone, Debug)]
pub struct PackedImage {
    bytes: Vec<u8>,
    header: SubElementHeader,
    compressed_len: usize,
}

impl<'a> ImagePacker<'a> {
    #[must_use]
    pub fn new(firmware: &'a [u8]) -> Self {
        Self {
            firmware,
            level: DEFAULT_LEVEL,
            tag: TAG_UPGRADE_IMAGE,
            padding: 0,
        }
    }

    /// zlib level, `0..=9`.
    #[must_use]
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Override the sub-element tag. Devices only accept
    /// [`TAG_UPGRADE_IMAGE`]; anything else produces an image they refuse.
    #[must_use]
    pub fn tag(mut self, tag: u16) -> Self {
        self.tag = tag;
        self
    }

    /// Append `bytes` of `0xFF` after the compressed stream.
    #[must_use]
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    /// Compress the firmware and frame it.
    ///
    /// # Errors
    ///
    /// - [`PackError::EmptyFirmware`] for a zero-length firmware.
    /// - [`PackError::InvalidLevel`] for a level above 9.
    /// - [`PackError::Wire`] if the firmware exceeds `u32::MAX` bytes.
    pub fn pack(&self) -> Result<PackedImage, PackError> {
        if self.firmware.is_empty() {
            return Err(PackError::EmptyFirmware);
        }
        if self.level > MAX_LEVEL {
            return Err(PackError::InvalidLevel { level: self.level });
        }

        let mut header = SubElementHeader::for_payload_len(self.firmware.len())?;
        header.tag = self.tag;

        let stream = compression::compress(self.firmware, self.level)?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + stream.len() + self.padding);
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&stream);
        bytes.resize(bytes.len() + self.padding, 0xFF);

        Ok(PackedImage {
            bytes,
            header,
            compressed_len: stream.len(),
        })
    }
}

impl PackedImage {
    #[must_use]
    pub fn header(&self) -> SubElementHeader {
        self.header
    }

    /// Size of the zlib stream alone, without header or padding.
    #[must_use]
    pub fn compressed_len(&self) -> usize {
        self.compressed_len
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
