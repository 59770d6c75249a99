use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Signal direction of a peripheral module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Playback path (speaker protection, excitation model).
    Rx,
    /// Feedback path (current/voltage sense, calibration).
    Tx,
}

impl Direction {
    /// Both directions, RX first.
    pub const ALL: [Direction; 2] = [Direction::Rx, Direction::Tx];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level destination index for a port.
///
/// The protocol also places this value in the packet header token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortHandle(u32);

impl PortHandle {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw transport index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Out-of-band message delivered by the transport to the registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData {
    /// Response opcode.
    pub opcode: u32,
    /// Token echoed from the request header.
    pub token: u32,
    /// Response body. `None` when the transport delivered no payload.
    pub payload: Option<Bytes>,
}

impl CallbackData {
    pub fn new(opcode: u32, token: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            token,
            payload: Some(payload.into()),
        }
    }

    /// A delivery without a body.
    pub fn empty(opcode: u32, token: u32) -> Self {
        Self {
            opcode,
            token,
            payload: None,
        }
    }
}

/// Callback invoked by the transport on a context it controls.
///
/// Handlers must not block.
pub type ResponseHandler = Arc<dyn Fn(&CallbackData) + Send + Sync>;

/// Maps a module direction to its transport index.
pub trait PortResolver {
    fn resolve_port(&self, direction: Direction) -> PortHandle;
}

/// Shared message channel to the peripheral.
pub trait Transport: PortResolver + Send + Sync {
    /// Hand a serialized packet to the transport for the given port.
    fn send(&self, packet: Bytes, port: PortHandle) -> Result<()>;

    /// Install the response handler. Re-registering replaces the previous one.
    fn register_callback(&self, handler: ResponseHandler);
}

impl<T: PortResolver + ?Sized> PortResolver for Arc<T> {
    fn resolve_port(&self, direction: Direction) -> PortHandle {
        (**self).resolve_port(direction)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, packet: Bytes, port: PortHandle) -> Result<()> {
        (**self).send(packet, port)
    }

    fn register_callback(&self, handler: ResponseHandler) {
        (**self).register_callback(handler)
    }
}

/// Fixed direction-to-index mapping, for callers that already know the indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPorts {
    pub rx: PortHandle,
    pub tx: PortHandle,
}

impl PortResolver for StaticPorts {
    fn resolve_port(&self, direction: Direction) -> PortHandle {
        match direction {
            Direction::Rx => self.rx,
            Direction::Tx => self.tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_payload_presence() {
        let data = CallbackData::new(1, 4, vec![7u8, 0, 0, 0]);
        assert_eq!(data.payload.as_deref(), Some(&[7u8, 0, 0, 0][..]));
        assert_eq!(data.token, 4);
        assert_eq!(CallbackData::empty(1, 0).payload, None);
    }

    #[test]
    fn static_ports_resolve_by_direction() {
        let ports = StaticPorts {
            rx: PortHandle::new(10),
            tx: PortHandle::new(11),
        };
        assert_eq!(ports.resolve_port(Direction::Rx).index(), 10);
        assert_eq!(ports.resolve_port(Direction::Tx).index(), 11);

        let shared = Arc::new(ports);
        assert_eq!(shared.resolve_port(Direction::Tx), PortHandle::new(11));
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Rx.to_string(), "rx");
        assert_eq!(Direction::ALL, [Direction::Rx, Direction::Tx]);
    }
}
