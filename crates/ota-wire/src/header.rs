use crate::error::WireError;

/// Type tag of the upgrade-image sub-element, the only one this device applies.
pub const TAG_UPGRADE_IMAGE: u16 = 0x0000;

/// Total header size in bytes (fixed).
pub const HEADER_SIZE: usize = 6;

/// Sub-element header: the first 6 bytes of the payload delivered by the
/// transport, ahead of the zlib stream.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────────┐
/// │ Offset │ Size    │ Description                              │
/// ├────────┼─────────┼──────────────────────────────────────────┤
/// │ 0x00   │ 2 bytes │ Type tag, little-endian (0x0000 = image) │
/// │ 0x02   │ 4 bytes │ Decompressed payload length, LE          │
/// └────────┴─────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubElementHeader {
    pub tag: u16,
    pub length: u32,
}

impl SubElementHeader {
    /// Header for an upgrade image of `length` decompressed bytes.
    #[must_use]
    pub fn upgrade_image(length: u32) -> Self {
        Self {
            tag: TAG_UPGRADE_IMAGE,
            length,
        }
    }

    /// Header describing `payload`, failing if it is too large for the
    /// length field.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] if `payload_len > u32::MAX`.
    pub fn for_payload_len(payload_len: usize) -> Result<Self, WireError> {
        let length =
            u32::try_from(payload_len).map_err(|_| WireError::LengthOverflow { len: payload_len })?;
        Ok(Self::upgrade_image(length))
    }

    /// Serialize the header into its 6-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.tag.to_le_bytes());
        buf[2..6].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Write the 6-byte header into the front of `buf`.
    ///
    /// No tag validation happens here, so producers can emit headers the
    /// device will refuse (useful for exercising the failure path).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }
        buf[..HEADER_SIZE].copy_from_slice(&self.to_bytes());
        Ok(())
    }

    /// Parse and validate a header from the first 6 bytes of `buf`.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the buffer is too short.
    /// - [`WireError::UnsupportedSubElement`] if the tag is not
    ///   [`TAG_UPGRADE_IMAGE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        let tag = u16::from_le_bytes([buf[0], buf[1]]);
        if tag != TAG_UPGRADE_IMAGE {
            return Err(WireError::UnsupportedSubElement { tag });
        }

        let length = u32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]);
        Ok(Self { tag, length })
    }
}
