/// Implementation of `otactl pack`.
///
/// # Output format
///
/// ```text
/// Firmware: fw.bin (183204 bytes, blake3 4f0c…)
/// Image:    fw.ota (6 + 91877 bytes, ratio 0.50)
/// ```
use std::fs;

use anyhow::{Context, Result};
use ota_packer::ImagePacker;

use crate::PackArgs;

/// Run the `otactl pack` command.
///
/// # Errors
///
/// Returns an error if the firmware cannot be read, is empty or too large,
/// the level is out of range, or the image cannot be written.
pub fn run(args: &PackArgs) -> Result<()> {
    let firmware = fs::read(&args.firmware)
        .with_context(|| format!("cannot read {}", args.firmware.display()))?;

    let image = ImagePacker::new(&firmware)
        .level(args.level)
        .padding(args.padding)
        .pack()
        .with_context(|| format!("cannot pack {}", args.firmware.display()))?;

    let compressed = image.compressed_len();
    fs::write(&args.output, image.as_bytes())
        .with_context(|| format!("cannot write {}", args.output.display()))?;

    #[allow(clippy::cast_precision_loss)]
    let ratio = compressed as f64 / firmware.len() as f64;
    println!(
        "Firmware: {} ({} bytes, blake3 {})",
        args.firmware.display(),
        firmware.len(),
        blake3::hash(&firmware).to_hex()
    );
    println!(
        "Image:    {} ({} + {compressed} bytes, ratio {ratio:.2})",
        args.output.display(),
        ota_wire::HEADER_SIZE
    );
    Ok(())
}
