use crate::traits::{Direction, PortHandle};

/// Errors that can occur while handing packets to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport accepted the packet but reported a failure code.
    #[error("send to port {port} rejected with code {code}")]
    Rejected { port: PortHandle, code: i32 },

    /// The packet could not be delivered to the destination.
    #[error("packet undeliverable to port {port}: {reason}")]
    Undeliverable { port: PortHandle, reason: String },

    /// No transport index is currently mapped for the direction.
    #[error("no port available for {0} direction")]
    PortUnavailable(Direction),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Numeric code for logs, mirroring the transport's negative errno style.
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Rejected { code, .. } => *code,
            TransportError::Undeliverable { .. } => -5,
            TransportError::PortUnavailable(_) => -19,
            TransportError::Shutdown => -108,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
