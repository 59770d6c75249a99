//! Module and parameter identifiers.
//!
//! The upper 24 bits of a parameter id select the module. The module in turn
//! fixes the destination port and direction.

use ospl_transport::Direction;

use crate::error::{PacketError, Result};

/// RX (playback) processing module. Also the RX enable pseudo-parameter.
pub const RX_MODULE: u32 = 0x1000_B100;
/// TX (feedback) processing module. Also the TX enable pseudo-parameter.
pub const TX_MODULE: u32 = 0x1000_B200;

/// Generic enable parameter the two module-level enables are rewritten to.
pub const PARAM_ENABLE: u32 = 0x0001_0203;

pub const RX_SET_USE_CASE: u32 = 0x1000_B101;
pub const RX_RUN_CALIBRATION: u32 = 0x1000_B102;
pub const RX_SET_EXTERNAL_CONFIG: u32 = 0x1000_B103;
pub const RX_EXC_MODEL: u32 = 0x1000_B104;
pub const RX_TEMPERATURE: u32 = 0x1000_B105;
pub const RX_TEMP_CAL_DATA: u32 = 0x1000_B106;

pub const TX_RUN_CALIBRATION: u32 = 0x1000_B201;
pub const TX_F0_CALIBRATION_VALUE: u32 = 0x1000_B202;
pub const TX_TEMP_MEASUREMENT_VALUE: u32 = 0x1000_B203;
pub const TX_SET_EXTERNAL_CONFIG: u32 = 0x1000_B204;

/// Quinary MI2S RX port.
pub const RX_PORT_ID: u16 = 0x1016;
/// Quinary MI2S TX port.
pub const TX_PORT_ID: u16 = 0x1017;

const MODULE_MASK: u32 = 0xFFFF_FF00;

/// A processing module inside the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Rx,
    Tx,
}

impl Module {
    /// Resolve the module a parameter id belongs to.
    pub fn resolve(param_id: u32) -> Result<Self> {
        Self::from_id(param_id & MODULE_MASK).ok_or(PacketError::UnsupportedParameter(param_id))
    }

    /// Match an exact module id.
    pub fn from_id(module_id: u32) -> Option<Self> {
        match module_id {
            RX_MODULE => Some(Module::Rx),
            TX_MODULE => Some(Module::Tx),
            _ => None,
        }
    }

    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Rx => Module::Rx,
            Direction::Tx => Module::Tx,
        }
    }

    pub const fn id(self) -> u32 {
        match self {
            Module::Rx => RX_MODULE,
            Module::Tx => TX_MODULE,
        }
    }

    /// Peripheral port id carried in the parameter descriptor.
    pub const fn port_id(self) -> u16 {
        match self {
            Module::Rx => RX_PORT_ID,
            Module::Tx => TX_PORT_ID,
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Module::Rx => Direction::Rx,
            Module::Tx => Direction::Tx,
        }
    }
}

/// Rewrite the module-level enable pseudo-parameters to [`PARAM_ENABLE`].
pub fn wire_param_id(param_id: u32) -> u32 {
    match param_id {
        RX_MODULE | TX_MODULE => PARAM_ENABLE,
        other => other,
    }
}

/// External-config parameter for a direction.
pub fn external_config_param(direction: Direction) -> u32 {
    match direction {
        Direction::Rx => RX_SET_EXTERNAL_CONFIG,
        Direction::Tx => TX_SET_EXTERNAL_CONFIG,
    }
}

/// Calibration trigger parameter for a direction.
pub fn run_calibration_param(direction: Direction) -> u32 {
    match direction {
        Direction::Rx => RX_RUN_CALIBRATION,
        Direction::Tx => TX_RUN_CALIBRATION,
    }
}

/// Whether the parameter carries an external-config chunk.
pub fn is_external_config(param_id: u32) -> bool {
    matches!(param_id, RX_SET_EXTERNAL_CONFIG | TX_SET_EXTERNAL_CONFIG)
}

/// Parameters whose get responses are published to a waiting caller.
pub fn is_reported_param(param_id: u32) -> bool {
    matches!(
        param_id,
        RX_EXC_MODEL | RX_TEMPERATURE | TX_F0_CALIBRATION_VALUE | TX_TEMP_MEASUREMENT_VALUE
    )
}

/// Returns a human-readable name for a parameter id.
pub fn param_name(param_id: u32) -> &'static str {
    match param_id {
        RX_MODULE => "RX_ENABLE",
        TX_MODULE => "TX_ENABLE",
        PARAM_ENABLE => "ENABLE",
        RX_SET_USE_CASE => "RX_SET_USE_CASE",
        RX_RUN_CALIBRATION => "RX_RUN_CALIBRATION",
        RX_SET_EXTERNAL_CONFIG => "RX_SET_EXTERNAL_CONFIG",
        RX_EXC_MODEL => "RX_EXC_MODEL",
        RX_TEMPERATURE => "RX_TEMPERATURE",
        RX_TEMP_CAL_DATA => "RX_TEMP_CAL_DATA",
        TX_RUN_CALIBRATION => "TX_RUN_CALIBRATION",
        TX_F0_CALIBRATION_VALUE => "TX_F0_CALIBRATION_VALUE",
        TX_TEMP_MEASUREMENT_VALUE => "TX_TEMP_MEASUREMENT_VALUE",
        TX_SET_EXTERNAL_CONFIG => "TX_SET_EXTERNAL_CONFIG",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_modules_from_upper_bits() {
        assert_eq!(Module::resolve(RX_EXC_MODEL).unwrap(), Module::Rx);
        assert_eq!(Module::resolve(RX_MODULE).unwrap(), Module::Rx);
        assert_eq!(Module::resolve(TX_F0_CALIBRATION_VALUE).unwrap(), Module::Tx);
        assert_eq!(Module::resolve(0x1000_B2FF).unwrap(), Module::Tx);
    }

    #[test]
    fn rejects_unknown_module() {
        assert_eq!(
            Module::resolve(0x1000_B301),
            Err(PacketError::UnsupportedParameter(0x1000_B301))
        );
        assert!(Module::resolve(PARAM_ENABLE).is_err());
    }

    #[test]
    fn module_routing_is_fixed() {
        assert_eq!(Module::Rx.port_id(), RX_PORT_ID);
        assert_eq!(Module::Tx.port_id(), TX_PORT_ID);
        assert_eq!(Module::Tx.direction(), Direction::Tx);
        assert_eq!(Module::for_direction(Direction::Rx), Module::Rx);
    }

    #[test]
    fn enable_aliases_rewritten() {
        assert_eq!(wire_param_id(RX_MODULE), PARAM_ENABLE);
        assert_eq!(wire_param_id(TX_MODULE), PARAM_ENABLE);
        assert_eq!(wire_param_id(RX_SET_USE_CASE), RX_SET_USE_CASE);
    }

    #[test]
    fn reported_param_whitelist() {
        assert!(is_reported_param(RX_EXC_MODEL));
        assert!(is_reported_param(TX_TEMP_MEASUREMENT_VALUE));
        assert!(!is_reported_param(RX_SET_USE_CASE));
        assert!(!is_reported_param(PARAM_ENABLE));
    }

    #[test]
    fn names() {
        assert_eq!(param_name(RX_TEMPERATURE), "RX_TEMPERATURE");
        assert_eq!(param_name(0xDEAD_BEEF), "UNKNOWN");
    }
}
