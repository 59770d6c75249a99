use std::fmt;
use std::io;

use ospl_afe::{AfeError, LoadError};
use ospl_packet::PacketError;
use ospl_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    let code = match err {
        PacketError::UnsupportedParameter(_) => USAGE,
        PacketError::AllocationFailure { .. } => INTERNAL,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn load_error(context: &str, err: LoadError) -> CliError {
    match err {
        LoadError::Io { source, .. } => io_error(context, source),
        LoadError::NotFound { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn afe_error(context: &str, err: AfeError) -> CliError {
    match err {
        AfeError::Packet(err) => packet_error(context, err),
        AfeError::Transport(err) => transport_error(context, err),
        AfeError::Load(err) => load_error(context, err),
        AfeError::Io(err) => io_error(context, err),
        AfeError::GetTimeout { .. } | AfeError::ConfigsNotLoaded => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        AfeError::InvalidUseCase(_) | AfeError::InvalidConfigIndex { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        AfeError::InvalidConfig(_) | AfeError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AfeError::ConfigUnavailable { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
