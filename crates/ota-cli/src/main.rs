/// Host-side tool for packing, inspecting and rehearsing firmware updates.
///
/// # Command overview
///
/// ```text
/// otactl <COMMAND> [OPTIONS]
///
/// Commands:
///   pack       Wrap a firmware binary into an update image
///   inspect    Parse and decompress an update image without flashing it
///   apply      Stream an image into a flash file through an update session
///   status     Show the boot slot recorded in a flash file
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log session activity to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                         |
/// |------|-------------------------------------------------|
/// | 0    | Success                                         |
/// | 1    | Error (I/O failure, bad image, failed update)   |
///
/// Diagnostics and logs go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_apply;
mod cmd_inspect;
mod cmd_pack;
mod cmd_status;
mod flash_file;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "otactl", version, about = "Firmware update image tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log session activity at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Wrap a firmware binary into a header + zlib update image.
    Pack(PackArgs),
    /// Parse the header and decompress the payload of an update image.
    Inspect(InspectArgs),
    /// Deliver an image in chunks to an update session backed by a flash file.
    Apply(ApplyArgs),
    /// Print the boot record and active image digest of a flash file.
    Status(StatusArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `otactl pack`.
#[derive(clap::Args)]
pub struct PackArgs {
    /// Raw firmware binary.
    pub firmware: PathBuf,

    /// Output image path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// zlib compression level, 0-9.
    #[arg(long, default_value_t = ota_packer::compression::DEFAULT_LEVEL)]
    pub level: u32,

    /// Append this many `0xFF` bytes after the compressed stream.
    #[arg(long, default_value_t = 0)]
    pub padding: usize,
}

/// Arguments for `otactl inspect`.
///
/// Runs the payload through the same streaming inflater the device uses, so
/// a corrupt or truncated image shows up here before it is ever sent.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Update image to inspect.
    pub image: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `otactl apply`.
///
/// Rehearses an over-the-air update on the host. The flash file holds a
/// boot-record sector followed by slots A and B; it is created erased if it
/// does not exist and written back afterwards, so repeated runs alternate
/// between slots like a real device.
///
/// ```text
/// ┌───────────────┬───────────────────────────────────────────────────┐
/// │ Flag          │ Effect                                            │
/// ├───────────────┼───────────────────────────────────────────────────┤
/// │ --chunk N     │ bytes per receive notification (default 64)       │
/// │ --slot-size N │ bytes per image slot (default 1 MiB)              │
/// │ --scratch N   │ inflate buffer size (default 256, minimum 64)     │
/// │ --no-finish   │ stop after the last chunk without finishing       │
/// │ --json        │ print the report as JSON                          │
/// └───────────────┴───────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Update image to deliver.
    pub image: PathBuf,

    /// Flash dump to update in place.
    #[arg(long)]
    pub flash: PathBuf,

    /// Bytes per receive notification.
    #[arg(long, default_value_t = 64)]
    pub chunk: usize,

    /// Size of each image slot in bytes (a multiple of 4096).
    #[arg(long, default_value_t = flash_file::DEFAULT_SLOT_SIZE)]
    pub slot_size: u32,

    /// Inflate scratch buffer in bytes.
    #[arg(long, default_value_t = ota_session::config::DEFAULT_SCRATCH_SIZE)]
    pub scratch: usize,

    /// Abort instead of finishing once every chunk is delivered.
    #[arg(long)]
    pub no_finish: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `otactl status`.
#[derive(clap::Args)]
pub struct StatusArgs {
    /// Flash dump to read.
    #[arg(long)]
    pub flash: PathBuf,

    /// Size of each image slot in bytes; must match the value used by `apply`.
    #[arg(long, default_value_t = flash_file::DEFAULT_SLOT_SIZE)]
    pub slot_size: u32,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Pack(args) => cmd_pack::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Apply(args) => cmd_apply::run(&args),
        Commands::Status(args) => cmd_status::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
