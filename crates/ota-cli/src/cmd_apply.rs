/// Implementation of `otactl apply`.
///
/// Plays the transport's part: start, one receive per chunk, then finish,
/// all through [`UpdateSession::dispatch`]. The session writes into an
/// in-memory copy of the flash file, which is saved back whatever the
/// outcome, so a failed run leaves the boot record untouched on disk too.
///
/// # Output format
///
/// ```text
/// Image:    fw.ota (91883 bytes in 1436 chunks of 64)
/// Outcome:  success, slot B, 183204 bytes written
/// Restart:  requested
/// Boot:     slot B
/// ```
use std::fs;

use anyhow::{Context, Result, bail};
use ota_flash::{NorFlashStorage, RamFlash, UpdateStorage};
use ota_session::{
    EventLog, MonotonicClock, Notification, Outcome, SessionConfig, TransportStatus, UpdateError,
    UpdateSession,
};
use serde::Serialize;
use tracing::info;

use crate::{ApplyArgs, flash_file};

type HostSession = UpdateSession<NorFlashStorage<RamFlash>, EventLog, MonotonicClock>;

#[derive(Serialize)]
struct ApplyReport {
    image_len: usize,
    chunks: usize,
    outcome: String,
    slot: Option<String>,
    bytes_written: Option<u64>,
    progress_reports: usize,
    restart_requested: bool,
    boot_slot: String,
    error: Option<String>,
}

/// Run the `otactl apply` command.
///
/// # Errors
///
/// Returns an error if a file cannot be read or written, the options are
/// invalid, or the update does not end in success.
pub fn run(args: &ApplyArgs) -> Result<()> {
    if args.chunk == 0 {
        bail!("--chunk must be at least 1");
    }
    let image =
        fs::read(&args.image).with_context(|| format!("cannot read {}", args.image.display()))?;
    let storage = flash_file::open(&args.flash, args.slot_size, true)?;

    let config = SessionConfig {
        scratch_size: args.scratch,
        ..SessionConfig::default()
    };
    let mut session =
        UpdateSession::with_config(config, storage, EventLog::new(), MonotonicClock::default());

    let chunks = image.len().div_ceil(args.chunk);
    info!(chunks, chunk = args.chunk, "delivering image");
    let error = deliver(&mut session, &image, args).err();

    let (storage, log) = session.into_parts();
    let report = ApplyReport {
        image_len: image.len(),
        chunks,
        outcome: match log.last_outcome() {
            Some(Outcome::Success { .. }) => "success".to_owned(),
            Some(Outcome::Failure(reason)) => format!("failure ({reason:?})"),
            None => "none".to_owned(),
        },
        slot: match log.last_outcome() {
            Some(Outcome::Success { slot, .. }) => Some(slot.to_string()),
            _ => None,
        },
        bytes_written: match log.last_outcome() {
            Some(Outcome::Success { bytes_written, .. }) => Some(bytes_written),
            _ => None,
        },
        progress_reports: log.progress().count(),
        restart_requested: log.restart_requested(),
        boot_slot: storage.boot_target().to_string(),
        error: error.as_ref().map(ToString::to_string),
    };
    flash_file::save(&args.flash, storage)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(args, &report);
    }

    if let Some(e) = error {
        return Err(e).context("update failed");
    }
    if args.no_finish {
        return Ok(());
    }
    if report.slot.is_none() {
        bail!("update did not complete");
    }
    Ok(())
}

/// Drive the session through one full update. Stops at the first error.
fn deliver(session: &mut HostSession, image: &[u8], args: &ApplyArgs) -> Result<(), UpdateError> {
    session.dispatch(Notification::ok(TransportStatus::<&[u8]>::Start))?;
    for chunk in image.chunks(args.chunk) {
        session.dispatch(Notification::ok(TransportStatus::Receive(chunk)))?;
    }
    let last = if args.no_finish {
        TransportStatus::<&[u8]>::Abort
    } else {
        TransportStatus::Finish
    };
    session.dispatch(Notification::ok(last))
}

fn print_report(args: &ApplyArgs, report: &ApplyReport) {
    println!(
        "Image:    {} ({} bytes in {} chunks of {})",
        args.image.display(),
        report.image_len,
        report.chunks,
        args.chunk
    );
    match (&report.slot, report.bytes_written) {
        (Some(slot), Some(bytes)) => {
            println!("Outcome:  success, slot {slot}, {bytes} bytes written");
        }
        _ => println!("Outcome:  {}", report.outcome),
    }
    if let Some(error) = &report.error {
        println!("Error:    {error}");
    }
    println!("Progress: {} reports", report.progress_reports);
    println!(
        "Restart:  {}",
        if report.restart_requested { "requested" } else { "not requested" }
    );
    println!("Boot:     slot {}", report.boot_slot);
}
