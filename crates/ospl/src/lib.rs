//! Host-side driver for the OSPL smart amplifier.
//!
//! The amplifier's DSP module is controlled by set/get parameter packets
//! sent over a shared, asynchronous transport. Get results come back later
//! through a transport callback.
//!
//! # Crate Structure
//!
//! - [`transport`]: the transport seam (`Transport`, `PortHandle`, callbacks)
//! - [`packet`]: wire encoding, decoding and chunk planning
//! - [`afe`]: protocol engine and the `SmartAmp` control surface

/// Re-export transport types.
pub mod transport {
    pub use ospl_transport::*;
}

/// Re-export packet types.
pub mod packet {
    pub use ospl_packet::*;
}

/// Re-export protocol engine types.
pub mod afe {
    pub use ospl_afe::*;
}
