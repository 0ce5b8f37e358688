use ota_wire::WireError;

/// Errors that can occur while packing a firmware image.
///
/// ```text
///   PackError
///   ├── EmptyFirmware       ← nothing to pack
///   ├── InvalidLevel        ← zlib level outside 0..=9
///   ├── Wire(WireError)     ← header could not describe the payload
///   └── Io(std::io::Error)  ← from the zlib writer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("firmware image is empty")]
    EmptyFirmware,

    #[error("compression level {level} out of range (0..=9)")]
    InvalidLevel { level: u32 },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
