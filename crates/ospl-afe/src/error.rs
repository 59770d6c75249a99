use std::time::Duration;

use ospl_transport::Direction;

/// Errors that can occur while loading a firmware configuration blob.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No blob exists under the name.
    #[error("config {name} not found")]
    NotFound { name: String },

    /// The blob exists but has no content.
    #[error("config {name} is empty")]
    Empty { name: String },

    /// The blob exceeds the configured size cap.
    #[error("config {name} too large ({size} bytes, max {max})")]
    TooLarge {
        name: String,
        size: u64,
        max: usize,
    },

    /// Reading the blob failed.
    #[error("failed reading config {name}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },
}

/// Errors that can occur in protocol engine operations.
#[derive(Debug, thiserror::Error)]
pub enum AfeError {
    /// Packet-level error (unsupported parameter, allocation failure).
    #[error("packet error: {0}")]
    Packet(#[from] ospl_packet::PacketError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ospl_transport::TransportError),

    /// Firmware configuration load error.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The selected configuration slot holds no blob.
    #[error("external config {index} is not available")]
    ConfigUnavailable { index: usize },

    /// The background configuration load has not completed.
    #[error("external configs not loaded yet")]
    ConfigsNotLoaded,

    /// The configuration index is out of range for the direction.
    #[error("external config index {index} out of range for {direction}")]
    InvalidConfigIndex { direction: Direction, index: usize },

    /// The use-case index is out of range.
    #[error("use case {0} out of range")]
    InvalidUseCase(u32),

    /// No response arrived for a get request within the bound.
    #[error("get {param_id:#010x} timed out after {timeout:?}")]
    GetTimeout { param_id: u32, timeout: Duration },

    /// Engine configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error outside blob loading.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AfeError>;
