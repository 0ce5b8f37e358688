/// Implementation of `otactl inspect`.
///
/// Parses the sub-element header and pushes the payload through the
/// device's streaming inflater, hashing what it would write.
///
/// # Output format
///
/// ```text
/// Header:   tag 0x0000, declared length 183204
/// Payload:  91877 compressed bytes (0 trailing), stream complete
/// Inflated: 183204 bytes, ratio 0.50
/// Digest:   blake3 4f0c…
/// Verdict:  ok
/// ```
use std::fs;

use anyhow::{Context, Result, bail};
use ota_session::Inflater;
use ota_session::config::DEFAULT_SCRATCH_SIZE;
use ota_wire::SubElementHeader;
use serde::Serialize;

use crate::InspectArgs;

/// Read size used when streaming the payload.
const READ_CHUNK: usize = 4096;

#[derive(Serialize)]
struct InspectReport {
    tag: u16,
    declared_len: u32,
    compressed_len: u64,
    trailing_bytes: u64,
    stream_complete: bool,
    inflated_len: u64,
    blake3: String,
    ok: bool,
}

/// Run the `otactl inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header is truncated or
/// carries an unsupported tag, or the payload does not decompress. An image
/// that decompresses to a length other than the declared one is reported
/// and then returned as an error.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.image).with_context(|| format!("cannot read {}", args.image.display()))?;

    let header = SubElementHeader::read_from(&bytes)
        .with_context(|| format!("bad header in {}", args.image.display()))?;
    let payload = &bytes[ota_wire::HEADER_SIZE..];

    let mut inflater = Inflater::new(DEFAULT_SCRATCH_SIZE)?;
    let mut hasher = blake3::Hasher::new();
    let mut inflated = 0u64;
    let declared = u64::from(header.length);

    for piece in payload.chunks(READ_CHUNK) {
        let mut feed = inflater.feed(piece);
        while let Some(chunk) = feed.next() {
            let chunk = chunk.context("payload does not decompress")?;
            absorb(&mut hasher, &mut inflated, declared, chunk);
        }
    }
    let mut feed = inflater.finish();
    while let Some(chunk) = feed.next() {
        let chunk = chunk.context("payload does not decompress")?;
        absorb(&mut hasher, &mut inflated, declared, chunk);
    }

    let report = InspectReport {
        tag: header.tag,
        declared_len: header.length,
        compressed_len: inflater.total_in(),
        trailing_bytes: payload.len() as u64 - inflater.total_in(),
        stream_complete: inflater.is_finished(),
        inflated_len: inflater.total_out(),
        blake3: hasher.finalize().to_hex().to_string(),
        ok: inflated == declared,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.ok {
        bail!(
            "payload inflates to {} bytes, header declares {}",
            report.inflated_len,
            report.declared_len
        );
    }
    Ok(())
}

/// Hash the part of `chunk` that falls within the declared length.
#[allow(clippy::cast_possible_truncation)]
fn absorb(hasher: &mut blake3::Hasher, inflated: &mut u64, declared: u64, chunk: &[u8]) {
    let room = declared.saturating_sub(*inflated);
    let take = chunk.len().min(room as usize);
    hasher.update(&chunk[..take]);
    *inflated += take as u64;
}

fn print_report(report: &InspectReport) {
    println!(
        "Header:   tag {:#06X}, declared length {}",
        report.tag, report.declared_len
    );
    println!(
        "Payload:  {} compressed bytes ({} trailing), stream {}",
        report.compressed_len,
        report.trailing_bytes,
        if report.stream_complete { "complete" } else { "truncated" }
    );
    #[allow(clippy::cast_precision_loss)]
    let ratio = if report.inflated_len == 0 {
        0.0
    } else {
        report.compressed_len as f64 / report.inflated_len as f64
    };
    println!("Inflated: {} bytes, ratio {ratio:.2}", report.inflated_len);
    println!("Digest:   blake3 {}", report.blake3);
    println!("Verdict:  {}", if report.ok { "ok" } else { "length mismatch" });
}
