//! Chunked transfer of external configuration strings.
//!
//! A configuration is split into packets of at most [`MAX_CHUNK_SIZE`] bytes
//! and sent strictly in order. All packets are built before the first send,
//! so a build failure never leaves a partial transfer on the peripheral.
//! A failed send is logged and the remaining chunks still go out; the last
//! failure is returned once every chunk has been attempted.

use ospl_packet::{encode_set, plan_chunks, Module, Packet, SetValue, MAX_CHUNK_SIZE};
use ospl_transport::Transport;
use tracing::{debug, warn};

use crate::command::{send_packet, Hex};
use crate::error::Result;

/// Send `payload` to `param_id` as a sequence of external-config chunks.
pub fn send_bulk<T: Transport + ?Sized>(transport: &T, param_id: u32, payload: &[u8]) -> Result<()> {
    Module::resolve(param_id)?;
    let packets = build_chunk_packets(transport, param_id, payload)?;
    let total = packets.len();

    let mut failed = 0usize;
    let mut last_error = None;
    for (index, packet) in packets.iter().enumerate() {
        match send_packet(transport, packet) {
            Ok(()) => debug!(param_id = %Hex(param_id), chunk = index + 1, total, "chunk sent"),
            Err(err) => {
                failed += 1;
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) => {
            warn!(
                param_id = %Hex(param_id),
                failed,
                total,
                bytes = payload.len(),
                "external config transfer incomplete"
            );
            Err(err)
        }
        None => {
            debug!(param_id = %Hex(param_id), total, bytes = payload.len(), "external config sent");
            Ok(())
        }
    }
}

fn build_chunk_packets<T: Transport + ?Sized>(
    transport: &T,
    param_id: u32,
    payload: &[u8],
) -> Result<Vec<Packet>> {
    let plan = plan_chunks(payload)?;
    let mut packets = Vec::with_capacity(plan.len());
    for chunk in plan {
        debug_assert!(chunk.bytes.len() <= MAX_CHUNK_SIZE);
        packets.push(encode_set(param_id, &SetValue::Bulk(chunk), transport)?);
    }
    Ok(packets)
}
