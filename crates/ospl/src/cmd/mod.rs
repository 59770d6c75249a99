use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use ospl_afe::{LOOPBACK_RX_INDEX, LOOPBACK_TX_INDEX};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod chunks;
pub mod emulate;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one packet and print its fields and bytes.
    Encode(EncodeArgs),
    /// Show how a configuration file would be split into chunks.
    Chunks(ChunksArgs),
    /// Run a control-surface session against the loopback peripheral.
    Emulate(EmulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Chunks(args) => chunks::run(args, format),
        Command::Emulate(args) => emulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EncodeKind {
    /// Scalar set (one value).
    Set,
    /// Triple set (three values).
    Tri,
    /// Get request (no values).
    Get,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Packet kind.
    #[arg(value_enum)]
    pub kind: EncodeKind,
    /// Parameter id in hex (e.g. 0x1000B101).
    #[arg(long)]
    pub param: String,
    /// Values to set.
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<i32>,
    /// Transport index of the RX port.
    #[arg(long, default_value_t = LOOPBACK_RX_INDEX)]
    pub rx_index: u32,
    /// Transport index of the TX port.
    #[arg(long, default_value_t = LOOPBACK_TX_INDEX)]
    pub tx_index: u32,
}

#[derive(Args, Debug)]
pub struct ChunksArgs {
    /// Configuration file.
    pub file: PathBuf,
    /// External-config parameter id in hex. Default: RX external config.
    #[arg(long)]
    pub param: Option<String>,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Engine configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory holding the external configuration blobs.
    #[arg(long, value_name = "DIR")]
    pub firmware_dir: Option<PathBuf>,
    /// Get response timeout (e.g. 300ms, 2s).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Only accept get responses for the requested parameter.
    #[arg(long)]
    pub strict: bool,
    /// RX use case to select.
    #[arg(long, default_value_t = 0)]
    pub use_case: u32,
    /// RX external configuration index.
    #[arg(long, default_value_t = 0)]
    pub rx_config: usize,
    /// TX external configuration index.
    #[arg(long, default_value_t = 0)]
    pub tx_config: usize,
    /// Make the peripheral ignore get requests.
    #[arg(long)]
    pub silent: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a parameter id written in hex, with or without a `0x` prefix.
pub fn parse_param_id(input: &str) -> CliResult<u32> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .replace('_', "");
    u32::from_str_radix(&digits, 16)
        .map_err(|_| CliError::new(USAGE, format!("invalid parameter id: {input}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, true)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
