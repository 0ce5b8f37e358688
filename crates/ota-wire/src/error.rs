/// Errors raised while framing the sub-element header.
///
/// ```text
///   WireError
///   ├── UnexpectedEof          ← buffer shorter than the 6-byte header
///   ├── UnsupportedSubElement  ← type tag is not the upgrade image tag
///   └── LengthOverflow         ← payload does not fit the u32 length field
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Input ended before a complete header could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The header's type tag names a sub-element this device cannot apply.
    #[error("sub-element type {tag:#06X} not supported")]
    UnsupportedSubElement { tag: u16 },

    /// A producer tried to describe a payload larger than `u32::MAX` bytes.
    #[error("payload of {len} bytes does not fit the 32-bit length field")]
    LengthOverflow { len: usize },
}
