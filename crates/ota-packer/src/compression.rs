use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Default zlib compression level.
///
/// Images are packed once and inflated on a small device many times, so the
/// packer spends the extra CPU for the best ratio.
pub const DEFAULT_LEVEL: u32 = 9;

/// Highest level zlib accepts.
pub const MAX_LEVEL: u32 = 9;

/// Compress `data` into a single zlib stream (RFC 1950 framing).
///
/// # Errors
///
/// Propagates I/O errors from the in-memory zlib writer.
///
/// # Example
///
/// ```rust
/// use ota_packer::compression::{compress, DEFAULT_LEVEL};
///
/// let firmware = b"\x7fELF".repeat(256);
/// let packed = compress(&firmware, DEFAULT_LEVEL).unwrap();
/// assert!(packed.len() < firmware.len());
/// ```
pub fn compress(data: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}
