use ospl_packet::{
    decode_packet, encode_get, encode_set, param, DecodedPacket, DecodedValue, Packet, SetValue,
};
use ospl_transport::{PortHandle, StaticPorts};
use serde::Serialize;

use crate::cmd::{parse_param_id, EncodeArgs, EncodeKind};
use crate::exit::{packet_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{hex_dump, hex_id, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    kind: &'static str,
    param_id: String,
    param_name: &'static str,
    module_id: String,
    port_id: String,
    token: u32,
    opcode: String,
    pkt_size: u16,
    payload_size: u16,
    param_size: u16,
    values: Vec<i32>,
    bytes: String,
}

impl EncodeKind {
    fn as_str(self) -> &'static str {
        match self {
            EncodeKind::Set => "set",
            EncodeKind::Tri => "tri",
            EncodeKind::Get => "get",
        }
    }

    fn arity(self) -> usize {
        match self {
            EncodeKind::Set => 1,
            EncodeKind::Tri => 3,
            EncodeKind::Get => 0,
        }
    }
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let param_id = parse_param_id(&args.param)?;
    let ports = StaticPorts {
        rx: PortHandle::new(args.rx_index),
        tx: PortHandle::new(args.tx_index),
    };

    let packet = encode(args.kind, param_id, &args.values, &ports)?;
    let decoded =
        decode_packet(&packet.bytes).map_err(|err| packet_error("decode failed", err))?;
    let out = describe(args.kind, param_id, &packet, &decoded);

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["FIELD", "VALUE"],
            vec![
                vec!["kind".to_string(), out.kind.to_string()],
                vec!["param_id".to_string(), format!("{} ({})", out.param_id, out.param_name)],
                vec!["module_id".to_string(), out.module_id.clone()],
                vec!["port_id".to_string(), out.port_id.clone()],
                vec!["token".to_string(), out.token.to_string()],
                vec!["opcode".to_string(), out.opcode.clone()],
                vec!["pkt_size".to_string(), out.pkt_size.to_string()],
                vec!["payload_size".to_string(), out.payload_size.to_string()],
                vec!["param_size".to_string(), out.param_size.to_string()],
                vec!["values".to_string(), format!("{:?}", out.values)],
                vec!["bytes".to_string(), out.bytes.clone()],
            ],
        ),
        OutputFormat::Pretty => {
            println!(
                "{} {} ({}) module={} port={} token={} opcode={} pkt_size={} payload_size={} param_size={} values={:?}",
                out.kind,
                out.param_id,
                out.param_name,
                out.module_id,
                out.port_id,
                out.token,
                out.opcode,
                out.pkt_size,
                out.payload_size,
                out.param_size,
                out.values
            );
            println!("{}", out.bytes);
        }
    }
    Ok(SUCCESS)
}

fn encode(
    kind: EncodeKind,
    param_id: u32,
    values: &[i32],
    ports: &StaticPorts,
) -> CliResult<Packet> {
    let encoded = match (kind, values) {
        (EncodeKind::Set, [value]) => encode_set(param_id, &SetValue::Scalar(*value), ports),
        (EncodeKind::Tri, [a, b, c]) => encode_set(param_id, &SetValue::Triple(*a, *b, *c), ports),
        (EncodeKind::Get, []) => encode_get(param_id, ports),
        (kind, values) => {
            return Err(CliError::new(
                USAGE,
                format!(
                    "{} expects {} value(s), got {}",
                    kind.as_str(),
                    kind.arity(),
                    values.len()
                ),
            ))
        }
    };
    encoded.map_err(|err| packet_error("encode failed", err))
}

fn describe(
    kind: EncodeKind,
    param_id: u32,
    packet: &Packet,
    decoded: &DecodedPacket,
) -> EncodeOutput {
    let values = match &decoded.value {
        DecodedValue::Scalar(value) => vec![*value],
        DecodedValue::Triple(values) => values.to_vec(),
        _ => Vec::new(),
    };
    EncodeOutput {
        kind: kind.as_str(),
        param_id: hex_id(param_id),
        param_name: param::param_name(param_id),
        module_id: hex_id(decoded.data.module_id),
        port_id: hex_id(u32::from(decoded.descriptor.port_id)),
        token: decoded.header.token,
        opcode: hex_id(decoded.header.opcode),
        pkt_size: decoded.header.pkt_size,
        payload_size: decoded.descriptor.payload_size,
        param_size: decoded.data.param_size,
        values,
        bytes: hex_dump(&packet.bytes),
    }
}

#[cfg(test)]
mod tests {
    use ospl_packet::param::{RX_MODULE, RX_TEMP_CAL_DATA, TX_TEMP_MEASUREMENT_VALUE};

    use super::*;

    fn ports() -> StaticPorts {
        StaticPorts {
            rx: PortHandle::new(7),
            tx: PortHandle::new(8),
        }
    }

    #[test]
    fn enable_alias_is_visible_in_description() {
        let packet = encode(EncodeKind::Set, RX_MODULE, &[1], &ports()).unwrap();
        let decoded = decode_packet(&packet.bytes).unwrap();
        let out = describe(EncodeKind::Set, RX_MODULE, &packet, &decoded);

        assert_eq!(out.param_name, "RX_ENABLE");
        assert_eq!(out.pkt_size, 52);
        assert_eq!(out.param_size, 4);
        assert_eq!(out.token, 7);
        assert_eq!(out.values, vec![1]);
    }

    #[test]
    fn get_reports_container_sizes() {
        let packet = encode(EncodeKind::Get, TX_TEMP_MEASUREMENT_VALUE, &[], &ports()).unwrap();
        let decoded = decode_packet(&packet.bytes).unwrap();
        let out = describe(EncodeKind::Get, TX_TEMP_MEASUREMENT_VALUE, &packet, &decoded);

        assert_eq!((out.pkt_size, out.payload_size, out.param_size), (68, 24, 12));
        assert_eq!(out.port_id, "0x00001017");
        assert!(out.values.is_empty());
    }

    #[test]
    fn wrong_value_count_is_usage_error() {
        let err = encode(EncodeKind::Tri, RX_TEMP_CAL_DATA, &[1, 2], &ports()).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn unknown_module_is_usage_error() {
        let err = encode(EncodeKind::Set, 0x2000_0001, &[1], &ports()).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
