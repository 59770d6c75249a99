//! Transport abstraction for the OSPL smart-amplifier DSP.
//!
//! The peripheral sits behind a shared, asynchronous message-passing channel.
//! This crate only names the pieces the protocol engine consumes:
//! - [`Direction`] and [`PortHandle`] for addressing a module's port
//! - [`Transport`] for sending packets and registering the response callback
//! - [`CallbackData`] for what the transport hands back
//!
//! This is the lowest layer of ospl. Everything else builds on top of it.

pub mod error;
pub mod traits;

pub use error::{Result, TransportError};
pub use traits::{
    CallbackData, Direction, PortHandle, PortResolver, ResponseHandler, StaticPorts, Transport,
};
