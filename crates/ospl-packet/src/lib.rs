//! Wire encoding for the OSPL smart-amplifier parameter protocol.
//!
//! Every command is a single packet with three sections:
//! - A 20-byte header (message kind, size, service/domain, token, opcode)
//! - A parameter descriptor (destination port, payload size, unused addressing)
//! - A data block (module id, parameter id, value size) followed by the value
//!
//! Encoding is pure. Sending is the caller's business.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod param;

pub use chunk::{chunk_count, plan_chunks, ChunkPlan, ExtConfigChunk, MAX_CHUNK_SIZE};
pub use codec::{
    decode_get_response, decode_packet, encode_get, encode_set, get_response_payload,
    DecodedPacket, DecodedValue, GetResponse, Header, Packet, ParamData, ParamDescriptor,
    SetValue, HEADER_SIZE,
};
pub use error::{PacketError, Result};
pub use param::Module;
