use bytes::{Buf, BufMut, Bytes, BytesMut};
use ospl_transport::{CallbackData, PortHandle, PortResolver};

use crate::chunk::{ExtConfigChunk, EXT_CONFIG_HEADER_SIZE, MAX_CHUNK_SIZE};
use crate::error::{PacketError, Result};
use crate::param::{self, Module};

/// Packet header: 20 bytes.
pub const HEADER_SIZE: usize = 20;
/// Set-param descriptor: port (2) + payload size (2) + three unused addressing words (12).
pub const SET_DESCRIPTOR_SIZE: usize = 16;
/// Get-param descriptor: set descriptor + module id (4) + param id (4).
pub const GET_DESCRIPTOR_SIZE: usize = 24;
/// Data block: module id (4) + param id (4) + param size (2) + reserved (2).
pub const PARAM_DATA_SIZE: usize = 12;
pub const SCALAR_SIZE: usize = 4;
pub const TRIPLE_SIZE: usize = 12;

/// Words in a get response: status, module, param, size, value0, value1.
pub const GET_RESPONSE_WORDS: usize = 6;

pub const OPCODE_SET_PARAM: u32 = 0x0001_00EF;
pub const OPCODE_GET_PARAM: u32 = 0x0001_00F0;
pub const OPCODE_GET_PARAM_RESPONSE: u32 = 0x0001_0106;

pub const SVC_AFE: u8 = 0x04;
pub const DOMAIN_APPS: u8 = 0x05;
pub const DOMAIN_ADSP: u8 = 0x04;

const MSG_TYPE_SEQ_CMD: u16 = 1;
const PKT_VERSION: u16 = 0;

/// Sequential command, 5-word header, version 0.
pub const HDR_FIELD: u16 = ((MSG_TYPE_SEQ_CMD & 0x3) << 8)
    | ((((HEADER_SIZE / 4) as u16) & 0xF) << 4)
    | (PKT_VERSION & 0xF);

/// Packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub hdr_field: u16,
    pub pkt_size: u16,
    pub src_svc: u8,
    pub src_domain: u8,
    pub src_port: u16,
    pub dest_svc: u8,
    pub dest_domain: u8,
    pub dest_port: u16,
    pub token: u32,
    pub opcode: u32,
}

impl Header {
    /// Header for a command from the application processor to the DSP.
    pub fn command(pkt_size: u16, token: u32, opcode: u32) -> Self {
        Self {
            hdr_field: HDR_FIELD,
            pkt_size,
            src_svc: SVC_AFE,
            src_domain: DOMAIN_APPS,
            src_port: 0,
            dest_svc: SVC_AFE,
            dest_domain: DOMAIN_ADSP,
            dest_port: 0,
            token,
            opcode,
        }
    }

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.hdr_field);
        dst.put_u16_le(self.pkt_size);
        dst.put_u8(self.src_svc);
        dst.put_u8(self.src_domain);
        dst.put_u16_le(self.src_port);
        dst.put_u8(self.dest_svc);
        dst.put_u8(self.dest_domain);
        dst.put_u16_le(self.dest_port);
        dst.put_u32_le(self.token);
        dst.put_u32_le(self.opcode);
    }

    fn parse(src: &mut &[u8]) -> Result<Self> {
        ensure(src, HEADER_SIZE)?;
        Ok(Self {
            hdr_field: src.get_u16_le(),
            pkt_size: src.get_u16_le(),
            src_svc: src.get_u8(),
            src_domain: src.get_u8(),
            src_port: src.get_u16_le(),
            dest_svc: src.get_u8(),
            dest_domain: src.get_u8(),
            dest_port: src.get_u16_le(),
            token: src.get_u32_le(),
            opcode: src.get_u32_le(),
        })
    }
}

/// Parameter descriptor following the header.
///
/// The addressing words are always zero: parameters travel in-band, never
/// through a memory-mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub port_id: u16,
    /// Data block plus value, excluding header and descriptor.
    pub payload_size: u16,
    pub payload_address_lsw: u32,
    pub payload_address_msw: u32,
    pub mem_map_handle: u32,
    /// `(module_id, param_id)`, present on get requests only.
    pub target: Option<(u32, u32)>,
}

impl ParamDescriptor {
    fn in_band(port_id: u16, payload_size: u16, target: Option<(u32, u32)>) -> Self {
        Self {
            port_id,
            payload_size,
            payload_address_lsw: 0,
            payload_address_msw: 0,
            mem_map_handle: 0,
            target,
        }
    }

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.port_id);
        dst.put_u16_le(self.payload_size);
        dst.put_u32_le(self.payload_address_lsw);
        dst.put_u32_le(self.payload_address_msw);
        dst.put_u32_le(self.mem_map_handle);
        if let Some((module_id, param_id)) = self.target {
            dst.put_u32_le(module_id);
            dst.put_u32_le(param_id);
        }
    }

    fn parse(src: &mut &[u8], with_target: bool) -> Result<Self> {
        let size = if with_target {
            GET_DESCRIPTOR_SIZE
        } else {
            SET_DESCRIPTOR_SIZE
        };
        ensure(src, size)?;
        let port_id = src.get_u16_le();
        let payload_size = src.get_u16_le();
        let payload_address_lsw = src.get_u32_le();
        let payload_address_msw = src.get_u32_le();
        let mem_map_handle = src.get_u32_le();
        let target = with_target.then(|| (src.get_u32_le(), src.get_u32_le()));
        Ok(Self {
            port_id,
            payload_size,
            payload_address_lsw,
            payload_address_msw,
            mem_map_handle,
            target,
        })
    }
}

/// Data block naming the module, parameter and value size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamData {
    pub module_id: u32,
    pub param_id: u32,
    /// Size of the value that follows, excluding this block.
    pub param_size: u16,
    pub reserved: u16,
}

impl ParamData {
    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.module_id);
        dst.put_u32_le(self.param_id);
        dst.put_u16_le(self.param_size);
        dst.put_u16_le(self.reserved);
    }

    fn parse(src: &mut &[u8]) -> Result<Self> {
        ensure(src, PARAM_DATA_SIZE)?;
        Ok(Self {
            module_id: src.get_u32_le(),
            param_id: src.get_u32_le(),
            param_size: src.get_u16_le(),
            reserved: src.get_u16_le(),
        })
    }
}

/// Typed value of a set command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetValue<'a> {
    Scalar(i32),
    Triple(i32, i32, i32),
    Bulk(ExtConfigChunk<'a>),
}

impl SetValue<'_> {
    /// Serialized size of the value alone.
    pub fn wire_size(&self) -> usize {
        match self {
            SetValue::Scalar(_) => SCALAR_SIZE,
            SetValue::Triple(..) => TRIPLE_SIZE,
            SetValue::Bulk(chunk) => chunk.wire_size(),
        }
    }

    fn put(&self, dst: &mut impl BufMut) {
        match self {
            SetValue::Scalar(value) => dst.put_i32_le(*value),
            SetValue::Triple(a, b, c) => {
                dst.put_i32_le(*a);
                dst.put_i32_le(*b);
                dst.put_i32_le(*c);
            }
            SetValue::Bulk(chunk) => {
                dst.put_u32_le(chunk.total_size);
                dst.put_u32_le(chunk.chunk_size());
                dst.put_u8(u8::from(chunk.done));
                dst.put_slice(chunk.bytes);
            }
        }
    }
}

/// A fully serialized packet ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub module: Module,
    /// Parameter id as carried in the data block.
    pub param_id: u32,
    pub opcode: u32,
    /// Destination transport index; also the header token.
    pub port: PortHandle,
    pub bytes: Bytes,
}

impl Packet {
    /// Total serialized length.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_get(&self) -> bool {
        self.opcode == OPCODE_GET_PARAM
    }
}

/// Build a set-parameter packet.
///
/// The module-level enable ids are rewritten to the generic enable parameter.
/// Every size field is derived from `value`.
pub fn encode_set<R: PortResolver + ?Sized>(
    param_id: u32,
    value: &SetValue<'_>,
    ports: &R,
) -> Result<Packet> {
    let module = Module::resolve(param_id)?;
    if let SetValue::Bulk(chunk) = value {
        if chunk.bytes.len() > MAX_CHUNK_SIZE {
            return Err(PacketError::ChunkTooLarge {
                size: chunk.bytes.len(),
                max: MAX_CHUNK_SIZE,
            });
        }
    }

    let wire_param = param::wire_param_id(param_id);
    let port = ports.resolve_port(module.direction());
    let value_size = value.wire_size();
    let payload_size = PARAM_DATA_SIZE + value_size;
    let pkt_size = HEADER_SIZE + SET_DESCRIPTOR_SIZE + payload_size;

    let mut buf = alloc_packet(pkt_size)?;
    Header::command(pkt_size as u16, port.index(), OPCODE_SET_PARAM).put(&mut buf);
    ParamDescriptor::in_band(module.port_id(), payload_size as u16, None).put(&mut buf);
    ParamData {
        module_id: module.id(),
        param_id: wire_param,
        param_size: value_size as u16,
        reserved: 0,
    }
    .put(&mut buf);
    value.put(&mut buf);
    debug_assert_eq!(buf.len(), pkt_size);

    Ok(Packet {
        module,
        param_id: wire_param,
        opcode: OPCODE_SET_PARAM,
        port,
        bytes: Bytes::from(buf),
    })
}

/// Build a get-parameter packet.
///
/// The peripheral expects the request to describe a three-value container no
/// matter what the parameter actually returns, so `payload_size` and
/// `param_size` are fixed and a zeroed container follows the data block.
pub fn encode_get<R: PortResolver + ?Sized>(param_id: u32, ports: &R) -> Result<Packet> {
    let module = Module::resolve(param_id)?;
    let port = ports.resolve_port(module.direction());
    let payload_size = PARAM_DATA_SIZE + TRIPLE_SIZE;
    let pkt_size = HEADER_SIZE + GET_DESCRIPTOR_SIZE + PARAM_DATA_SIZE + TRIPLE_SIZE;

    let mut buf = alloc_packet(pkt_size)?;
    Header::command(pkt_size as u16, port.index(), OPCODE_GET_PARAM).put(&mut buf);
    ParamDescriptor::in_band(
        module.port_id(),
        payload_size as u16,
        Some((module.id(), param_id)),
    )
    .put(&mut buf);
    ParamData {
        module_id: module.id(),
        param_id,
        param_size: TRIPLE_SIZE as u16,
        reserved: 0,
    }
    .put(&mut buf);
    buf.put_bytes(0, TRIPLE_SIZE);
    debug_assert_eq!(buf.len(), pkt_size);

    Ok(Packet {
        module,
        param_id,
        opcode: OPCODE_GET_PARAM,
        port,
        bytes: Bytes::from(buf),
    })
}

/// Value section of a decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Scalar(i32),
    Triple([i32; 3]),
    ExtConfig {
        total_size: u32,
        done: bool,
        bytes: Bytes,
    },
    /// Placeholder container of a get request.
    GetContainer,
    /// A value whose shape this decoder does not know.
    Raw(Bytes),
}

/// A parsed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub header: Header,
    pub descriptor: ParamDescriptor,
    pub data: ParamData,
    pub value: DecodedValue,
}

/// Parse a packet produced by [`encode_set`] or [`encode_get`].
///
/// Bytes past `pkt_size` are ignored.
pub fn decode_packet(packet: &[u8]) -> Result<DecodedPacket> {
    let mut src = packet;
    let header = Header::parse(&mut src)?;
    let pkt_size = usize::from(header.pkt_size);
    if packet.len() < pkt_size {
        return Err(PacketError::Truncated {
            needed: pkt_size,
            available: packet.len(),
        });
    }
    let mut src = &packet[HEADER_SIZE.min(pkt_size)..pkt_size];

    let descriptor = match header.opcode {
        OPCODE_SET_PARAM => ParamDescriptor::parse(&mut src, false)?,
        OPCODE_GET_PARAM => ParamDescriptor::parse(&mut src, true)?,
        other => return Err(PacketError::UnknownOpcode(other)),
    };
    let data = ParamData::parse(&mut src)?;
    let value_len = usize::from(data.param_size);
    ensure(src, value_len)?;
    let mut value_src = &src[..value_len];

    let value = if header.opcode == OPCODE_GET_PARAM {
        DecodedValue::GetContainer
    } else if param::is_external_config(data.param_id) {
        ensure(value_src, EXT_CONFIG_HEADER_SIZE)?;
        let total_size = value_src.get_u32_le();
        let chunk_size = value_src.get_u32_le() as usize;
        let done = value_src.get_u8() != 0;
        ensure(value_src, chunk_size)?;
        DecodedValue::ExtConfig {
            total_size,
            done,
            bytes: Bytes::copy_from_slice(&value_src[..chunk_size]),
        }
    } else if value_len == SCALAR_SIZE {
        DecodedValue::Scalar(value_src.get_i32_le())
    } else if value_len == TRIPLE_SIZE {
        DecodedValue::Triple([
            value_src.get_i32_le(),
            value_src.get_i32_le(),
            value_src.get_i32_le(),
        ])
    } else {
        DecodedValue::Raw(Bytes::copy_from_slice(value_src))
    };

    Ok(DecodedPacket {
        header,
        descriptor,
        data,
        value,
    })
}

/// Parsed body of a get response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetResponse {
    pub status: u32,
    pub module_id: u32,
    pub param_id: u32,
    pub values: [i32; 2],
}

/// Parse a get response delivered through the transport callback.
pub fn decode_get_response(data: &CallbackData) -> Result<GetResponse> {
    if data.opcode != OPCODE_GET_PARAM_RESPONSE {
        return Err(PacketError::UnknownOpcode(data.opcode));
    }
    let payload = data.payload.as_ref().ok_or(PacketError::MissingPayload)?;
    let mut src = payload.as_ref();
    ensure(src, GET_RESPONSE_WORDS * 4)?;

    let status = src.get_u32_le();
    let module_id = src.get_u32_le();
    let param_id = src.get_u32_le();
    let _size = src.get_u32_le();
    let values = [src.get_i32_le(), src.get_i32_le()];
    Ok(GetResponse {
        status,
        module_id,
        param_id,
        values,
    })
}

/// Serialize a get response body, as the peripheral would send it.
pub fn get_response_payload(status: u32, module_id: u32, param_id: u32, values: [i32; 2]) -> Bytes {
    let mut buf = BytesMut::with_capacity(GET_RESPONSE_WORDS * 4);
    buf.put_u32_le(status);
    buf.put_u32_le(module_id);
    buf.put_u32_le(param_id);
    buf.put_u16_le((values.len() * 4) as u16);
    buf.put_u16_le(0);
    buf.put_i32_le(values[0]);
    buf.put_i32_le(values[1]);
    buf.freeze()
}

fn alloc_packet(size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| PacketError::AllocationFailure { size })?;
    Ok(buf)
}

fn ensure(src: &[u8], needed: usize) -> Result<()> {
    if src.len() < needed {
        return Err(PacketError::Truncated {
            needed,
            available: src.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ospl_transport::{Direction, StaticPorts};

    use super::*;
    use crate::chunk::plan_chunks;
    use crate::param::*;

    const PORTS: StaticPorts = StaticPorts {
        rx: PortHandle::new(0x2A),
        tx: PortHandle::new(0x2B),
    };

    fn pkt_size(bytes: &[u8]) -> usize {
        usize::from(u16::from_le_bytes([bytes[2], bytes[3]]))
    }

    #[test]
    fn test_enable_alias_scalar() {
        let packet = encode_set(RX_MODULE, &SetValue::Scalar(1), &PORTS).unwrap();
        let decoded = decode_packet(&packet.bytes).unwrap();

        assert_eq!(decoded.header.opcode, OPCODE_SET_PARAM);
        assert_eq!(decoded.data.module_id, RX_MODULE);
        assert_eq!(decoded.data.param_id, PARAM_ENABLE);
        assert_eq!(decoded.data.param_size, 4);
        assert_eq!(decoded.value, DecodedValue::Scalar(1));
        assert_eq!(packet.param_id, PARAM_ENABLE);
    }

    #[test]
    fn test_tx_enable_alias() {
        let packet = encode_set(TX_MODULE, &SetValue::Scalar(0), &PORTS).unwrap();
        let decoded = decode_packet(&packet.bytes).unwrap();
        assert_eq!(decoded.data.module_id, TX_MODULE);
        assert_eq!(decoded.data.param_id, PARAM_ENABLE);
        assert_eq!(decoded.descriptor.port_id, TX_PORT_ID);
    }

    #[test]
    fn test_scalar_header_bytes() {
        let packet = encode_set(RX_SET_USE_CASE, &SetValue::Scalar(2), &PORTS).unwrap();
        let b = packet.bytes.as_ref();

        assert_eq!(b.len(), 52);
        assert_eq!(&b[0..2], &[0x50, 0x01]);
        assert_eq!(pkt_size(b), 52);
        assert_eq!(&b[4..8], &[SVC_AFE, DOMAIN_APPS, 0, 0]);
        assert_eq!(&b[8..12], &[SVC_AFE, DOMAIN_ADSP, 0, 0]);
        assert_eq!(&b[12..16], &0x2Au32.to_le_bytes());
        assert_eq!(&b[16..20], &OPCODE_SET_PARAM.to_le_bytes());
        assert_eq!(&b[20..22], &RX_PORT_ID.to_le_bytes());
        assert_eq!(&b[22..24], &16u16.to_le_bytes());
        assert_eq!(&b[24..36], &[0u8; 12]);
        assert_eq!(&b[48..52], &2i32.to_le_bytes());
    }

    #[test]
    fn test_scalar_roundtrip_recovers_value() {
        for value in [i32::MIN, -1, 0, 1, 77, i32::MAX] {
            let packet = encode_set(RX_SET_USE_CASE, &SetValue::Scalar(value), &PORTS).unwrap();
            let decoded = decode_packet(&packet.bytes).unwrap();
            assert_eq!(decoded.value, DecodedValue::Scalar(value));
        }
    }

    #[test]
    fn test_triple_sizes() {
        let packet =
            encode_set(RX_TEMP_CAL_DATA, &SetValue::Triple(1200, 40, 25), &PORTS).unwrap();
        let decoded = decode_packet(&packet.bytes).unwrap();

        assert_eq!(packet.wire_size(), 60);
        assert_eq!(usize::from(decoded.header.pkt_size), packet.wire_size());
        assert_eq!(decoded.descriptor.payload_size, 24);
        assert_eq!(decoded.data.param_size, 12);
        assert_eq!(decoded.value, DecodedValue::Triple([1200, 40, 25]));
    }

    #[test]
    fn test_bulk_sizes_follow_chunk() {
        let payload = vec![b'x'; 4321];
        for chunk in plan_chunks(&payload).unwrap() {
            let packet = encode_set(TX_SET_EXTERNAL_CONFIG, &SetValue::Bulk(chunk), &PORTS)
                .unwrap();
            let decoded = decode_packet(&packet.bytes).unwrap();
            let n = chunk.bytes.len();

            assert_eq!(usize::from(decoded.header.pkt_size), packet.wire_size());
            assert_eq!(packet.wire_size(), 57 + n);
            assert_eq!(usize::from(decoded.descriptor.payload_size), 21 + n);
            assert_eq!(usize::from(decoded.data.param_size), 9 + n);
            match decoded.value {
                DecodedValue::ExtConfig {
                    total_size,
                    done,
                    bytes,
                } => {
                    assert_eq!(total_size, 4321);
                    assert_eq!(done, chunk.done);
                    assert_eq!(bytes.as_ref(), chunk.bytes);
                }
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_bulk_chunk() {
        let chunk = ExtConfigChunk::whole(b"").unwrap();
        let packet = encode_set(RX_SET_EXTERNAL_CONFIG, &SetValue::Bulk(chunk), &PORTS).unwrap();
        assert_eq!(packet.wire_size(), 57);
        assert_eq!(pkt_size(&packet.bytes), 57);
    }

    #[test]
    fn test_bulk_chunk_too_large() {
        let payload = vec![0u8; MAX_CHUNK_SIZE + 1];
        let chunk = ExtConfigChunk::whole(&payload).unwrap();
        let err = encode_set(RX_SET_EXTERNAL_CONFIG, &SetValue::Bulk(chunk), &PORTS).unwrap_err();
        assert!(matches!(err, PacketError::ChunkTooLarge { .. }));
    }

    #[test]
    fn test_get_fixed_container_quirk() {
        for param in [RX_EXC_MODEL, RX_TEMPERATURE, TX_F0_CALIBRATION_VALUE, TX_TEMP_MEASUREMENT_VALUE] {
            let packet = encode_get(param, &PORTS).unwrap();
            let decoded = decode_packet(&packet.bytes).unwrap();

            assert!(packet.is_get());
            assert_eq!(packet.wire_size(), 68);
            assert_eq!(usize::from(decoded.header.pkt_size), 68);
            assert_eq!(decoded.descriptor.payload_size, 24);
            assert_eq!(decoded.data.param_size, 12);
            assert_eq!(decoded.value, DecodedValue::GetContainer);
            let module = Module::resolve(param).unwrap();
            assert_eq!(decoded.descriptor.target, Some((module.id(), param)));
        }
    }

    #[test]
    fn test_token_is_port_index() {
        let rx = encode_get(RX_TEMPERATURE, &PORTS).unwrap();
        let tx = encode_set(TX_RUN_CALIBRATION, &SetValue::Scalar(1), &PORTS).unwrap();
        let rx2 = encode_get(RX_TEMPERATURE, &PORTS).unwrap();

        assert_eq!(decode_packet(&rx.bytes).unwrap().header.token, 0x2A);
        assert_eq!(decode_packet(&tx.bytes).unwrap().header.token, 0x2B);
        assert_eq!(rx.bytes, rx2.bytes);
        assert_eq!(rx.port, PORTS.resolve_port(Direction::Rx));
    }

    #[test]
    fn test_unsupported_parameter() {
        let err = encode_set(0x0BAD_0001, &SetValue::Scalar(1), &PORTS).unwrap_err();
        assert_eq!(err, PacketError::UnsupportedParameter(0x0BAD_0001));
        assert!(encode_get(0x0BAD_0001, &PORTS).is_err());
    }

    #[test]
    fn test_decode_truncated() {
        let packet = encode_set(RX_SET_USE_CASE, &SetValue::Scalar(1), &PORTS).unwrap();
        let err = decode_packet(&packet.bytes[..40]).unwrap_err();
        assert!(matches!(err, PacketError::Truncated { .. }));
        assert!(matches!(
            decode_packet(&packet.bytes[..10]),
            Err(PacketError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        let mut bytes = encode_get(RX_EXC_MODEL, &PORTS).unwrap().bytes.to_vec();
        bytes[16..20].copy_from_slice(&0x1234u32.to_le_bytes());
        assert_eq!(
            decode_packet(&bytes).unwrap_err(),
            PacketError::UnknownOpcode(0x1234)
        );
    }

    #[test]
    fn test_get_response_roundtrip() {
        let payload = get_response_payload(0, TX_MODULE, TX_TEMP_MEASUREMENT_VALUE, [31, -4]);
        let data = CallbackData::new(OPCODE_GET_PARAM_RESPONSE, 0x2B, payload);
        let response = decode_get_response(&data).unwrap();

        assert_eq!(response.module_id, TX_MODULE);
        assert_eq!(response.param_id, TX_TEMP_MEASUREMENT_VALUE);
        assert_eq!(response.values, [31, -4]);
        assert_eq!(response.status, 0);
    }

    #[test]
    fn test_get_response_rejects_bad_input() {
        let empty = CallbackData::empty(OPCODE_GET_PARAM_RESPONSE, 0);
        assert_eq!(decode_get_response(&empty), Err(PacketError::MissingPayload));

        let short = CallbackData::new(OPCODE_GET_PARAM_RESPONSE, 0, vec![0u8; 20]);
        assert!(matches!(
            decode_get_response(&short),
            Err(PacketError::Truncated { .. })
        ));

        let other = CallbackData::new(OPCODE_SET_PARAM, 0, vec![0u8; 24]);
        assert!(matches!(
            decode_get_response(&other),
            Err(PacketError::UnknownOpcode(_))
        ));
    }

    #[test]
    fn test_oversized_allocation_is_reported() {
        assert_eq!(
            alloc_packet(usize::MAX),
            Err(PacketError::AllocationFailure { size: usize::MAX })
        );
        assert_eq!(alloc_packet(HEADER_SIZE).map(|buf| buf.capacity()), Ok(HEADER_SIZE));
    }
}
