//! Single-packet set and get commands.

use std::fmt;

use ospl_packet::{encode_get, encode_set, Packet, SetValue};
use ospl_transport::Transport;
use tracing::{error, info};

use crate::error::Result;

/// Formats a parameter or module id the way the peripheral documentation does.
#[derive(Clone, Copy)]
pub(crate) struct Hex(pub u32);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// Encode and send a set-parameter command.
pub fn set_param<T: Transport + ?Sized>(
    transport: &T,
    param_id: u32,
    value: &SetValue<'_>,
) -> Result<()> {
    let packet = encode_set(param_id, value, transport).map_err(|err| {
        error!(param_id = %Hex(param_id), error = %err, "cannot build set_param packet");
        err
    })?;
    send_packet(transport, &packet)
}

/// Encode and send a get-parameter request. The answer arrives via callback.
pub fn get_param<T: Transport + ?Sized>(transport: &T, param_id: u32) -> Result<()> {
    let packet = encode_get(param_id, transport).map_err(|err| {
        error!(param_id = %Hex(param_id), error = %err, "cannot build get_param packet");
        err
    })?;
    send_packet(transport, &packet)
}

pub(crate) fn send_packet<T: Transport + ?Sized>(transport: &T, packet: &Packet) -> Result<()> {
    let kind = if packet.is_get() { "get_param" } else { "set_param" };
    match transport.send(packet.bytes.clone(), packet.port) {
        Ok(()) => {
            info!(
                param_id = %Hex(packet.param_id),
                module_id = %Hex(packet.module.id()),
                size = packet.wire_size(),
                "{kind} packet sent"
            );
            Ok(())
        }
        Err(err) => {
            error!(
                port_id = %Hex(u32::from(packet.module.port_id())),
                param_id = %Hex(packet.param_id),
                code = err.code(),
                "{kind} failed"
            );
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use ospl_packet::param::{PARAM_ENABLE, RX_MODULE, RX_TEMPERATURE};
    use ospl_packet::{decode_packet, DecodedValue, PacketError};
    use ospl_transport::TransportError;

    use super::*;
    use crate::error::AfeError;
    use crate::loopback::LoopbackPeripheral;

    #[test]
    fn set_param_sends_one_packet() {
        let peripheral = LoopbackPeripheral::new();
        set_param(&peripheral, RX_MODULE, &SetValue::Scalar(1)).unwrap();

        let sent = peripheral.sent_packets();
        assert_eq!(sent.len(), 1);
        let decoded = decode_packet(&sent[0].1).unwrap();
        assert_eq!(decoded.data.param_id, PARAM_ENABLE);
        assert_eq!(decoded.value, DecodedValue::Scalar(1));
    }

    #[test]
    fn unsupported_parameter_sends_nothing() {
        let peripheral = LoopbackPeripheral::new();
        let err = set_param(&peripheral, 0x2000_0001, &SetValue::Scalar(1)).unwrap_err();
        assert!(matches!(
            err,
            AfeError::Packet(PacketError::UnsupportedParameter(0x2000_0001))
        ));
        assert!(peripheral.sent_packets().is_empty());
    }

    #[test]
    fn transport_failure_is_propagated() {
        let peripheral = LoopbackPeripheral::new();
        peripheral.fail_send(0, -11);
        let err = get_param(&peripheral, RX_TEMPERATURE).unwrap_err();
        assert!(matches!(
            err,
            AfeError::Transport(TransportError::Rejected { code: -11, .. })
        ));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Hex(0x1000_B101).to_string(), "0x1000B101");
    }
}
