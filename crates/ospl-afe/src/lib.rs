//! Protocol engine for the OSPL smart amplifier.
//!
//! Builds on [`ospl_packet`] for encoding and [`ospl_transport`] for
//! delivery. Provides:
//! - single set/get commands ([`set_param`], [`get_param`])
//! - chunked transfer of external configurations ([`send_bulk`])
//! - correlation of gets with their asynchronous responses ([`ResponseCorrelator`])
//! - the external configuration cache ([`ConfigCache`])
//! - the control surface ([`SmartAmp`])
//!
//! [`LoopbackPeripheral`] emulates the peripheral in-process.

pub mod amp;
pub mod bulk;
pub mod command;
pub mod config;
pub mod correlator;
pub mod error;
pub mod firmware;
pub mod loopback;

pub use amp::{SmartAmp, USE_CASE_COUNT};
pub use bulk::send_bulk;
pub use command::{get_param, set_param};
pub use config::{
    AfeConfig, CONFIG_SLOTS, DEFAULT_CONFIG_NAMES, DEFAULT_GET_TIMEOUT_MS,
    DEFAULT_MAX_CONFIG_SIZE, RX_CONFIG_COUNT, TX_CONFIG_COUNT,
};
pub use correlator::ResponseCorrelator;
pub use error::{AfeError, LoadError, Result};
pub use firmware::{
    config_string, directory_source, load_all, BlobSource, ConfigCache, DirectoryBlobSource,
    MemoryBlobSource,
};
pub use loopback::{LoopbackPeripheral, LOOPBACK_RX_INDEX, LOOPBACK_TX_INDEX};
