/// Implementation of `otactl status`.
///
/// # Output format
///
/// ```text
/// Boot slot: B
/// Image:     183204 bytes, blake3 4f0c…
/// ```
///
/// A flash file whose boot record is blank reports slot A with an unknown
/// image length, the state of a freshly provisioned device.
use anyhow::{Context, Result};
use serde::Serialize;

use crate::{StatusArgs, flash_file};

#[derive(Serialize)]
struct StatusReport {
    boot_slot: String,
    image_len: Option<u32>,
    blake3: Option<String>,
}

/// Run the `otactl status` command.
///
/// # Errors
///
/// Returns an error if the flash file cannot be read or does not match the
/// slot size.
pub fn run(args: &StatusArgs) -> Result<()> {
    let mut storage = flash_file::open(&args.flash, args.slot_size, false)?;
    let record = storage.boot_record();

    let blake3 = match record.image_len {
        Some(len) => {
            let image = storage
                .read_image(record.slot, len)
                .with_context(|| format!("cannot read slot {}", record.slot))?;
            Some(blake3::hash(&image).to_hex().to_string())
        }
        None => None,
    };

    let report = StatusReport {
        boot_slot: record.slot.to_string(),
        image_len: record.image_len,
        blake3,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Boot slot: {}", report.boot_slot);
    match (report.image_len, &report.blake3) {
        (Some(len), Some(digest)) => println!("Image:     {len} bytes, blake3 {digest}"),
        _ => println!("Image:     unknown length (no boot record)"),
    }
    Ok(())
}
