//! In-process stand-in for the peripheral.
//!
//! [`LoopbackPeripheral`] implements [`Transport`] by decoding every packet
//! it is handed, keeping the parameter state a real module would keep, and
//! answering get requests through the registered handler from its own thread.
//! Faults (rejected sends, silence, misrouted responses) can be injected.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use bytes::Bytes;
use ospl_packet::codec::OPCODE_GET_PARAM_RESPONSE;
use ospl_packet::{decode_packet, get_response_payload, DecodedPacket, DecodedValue, Module};
use ospl_transport::{
    CallbackData, Direction, PortHandle, PortResolver, ResponseHandler, StaticPorts, Transport,
    TransportError,
};
use tracing::{debug, warn};

use crate::command::Hex;

/// Default transport index of the RX port.
pub const LOOPBACK_RX_INDEX: u32 = 42;
/// Default transport index of the TX port.
pub const LOOPBACK_TX_INDEX: u32 = 43;

#[derive(Debug)]
struct Assembly {
    total_size: u32,
    buf: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    attempts: usize,
    failures: HashMap<usize, i32>,
    sent: Vec<(PortHandle, Bytes)>,
    params: HashMap<(u32, u32), Vec<i32>>,
    get_responses: HashMap<u32, [i32; 2]>,
    misroutes: HashMap<u32, u32>,
    silent: bool,
    status: u32,
    assemblies: HashMap<Module, Assembly>,
    configs: HashMap<Module, Bytes>,
}

/// Emulated peripheral reachable through the [`Transport`] trait.
pub struct LoopbackPeripheral {
    ports: StaticPorts,
    state: Mutex<State>,
    handler: Mutex<Option<ResponseHandler>>,
}

impl LoopbackPeripheral {
    pub fn new() -> Self {
        Self::with_ports(StaticPorts {
            rx: PortHandle::new(LOOPBACK_RX_INDEX),
            tx: PortHandle::new(LOOPBACK_TX_INDEX),
        })
    }

    pub fn with_ports(ports: StaticPorts) -> Self {
        Self {
            ports,
            state: Mutex::new(State::default()),
            handler: Mutex::new(None),
        }
    }

    /// Values returned for gets of `param_id`.
    pub fn set_get_response(&self, param_id: u32, values: [i32; 2]) {
        lock(&self.state).get_responses.insert(param_id, values);
    }

    /// Answer gets of `requested` as if `reported` had been asked for.
    pub fn misroute_get(&self, requested: u32, reported: u32) {
        lock(&self.state).misroutes.insert(requested, reported);
    }

    /// Stop (or resume) answering get requests.
    pub fn set_silent(&self, silent: bool) {
        lock(&self.state).silent = silent;
    }

    /// Status word placed in get responses.
    pub fn set_status(&self, status: u32) {
        lock(&self.state).status = status;
    }

    /// Reject the send with sequence number `attempt` (0-based) with `code`.
    pub fn fail_send(&self, attempt: usize, code: i32) {
        lock(&self.state).failures.insert(attempt, code);
    }

    /// Deliver a message to the registered handler from the caller's thread.
    pub fn emit(&self, data: &CallbackData) {
        if let Some(handler) = lock(&self.handler).clone() {
            handler(data);
        }
    }

    /// Packets accepted so far, in send order.
    pub fn sent_packets(&self) -> Vec<(PortHandle, Bytes)> {
        lock(&self.state).sent.clone()
    }

    /// Number of sends attempted, including rejected ones.
    pub fn send_attempts(&self) -> usize {
        lock(&self.state).attempts
    }

    /// Last value set for a parameter of a module.
    pub fn param_value(&self, module: Module, param_id: u32) -> Option<Vec<i32>> {
        lock(&self.state)
            .params
            .get(&(module.id(), param_id))
            .cloned()
    }

    /// Last completely reassembled external configuration for a direction.
    pub fn external_config(&self, direction: Direction) -> Option<Bytes> {
        lock(&self.state)
            .configs
            .get(&Module::for_direction(direction))
            .cloned()
    }

    /// Whether a callback handler has been registered.
    pub fn has_handler(&self) -> bool {
        lock(&self.handler).is_some()
    }

    fn apply(state: &mut State, module: Module, packet: &DecodedPacket) -> Option<CallbackData> {
        let param_id = packet.data.param_id;
        match &packet.value {
            DecodedValue::Scalar(value) => {
                state.params.insert((module.id(), param_id), vec![*value]);
                None
            }
            DecodedValue::Triple(values) => {
                state.params.insert((module.id(), param_id), values.to_vec());
                None
            }
            DecodedValue::Raw(_) => None,
            DecodedValue::ExtConfig {
                total_size,
                done,
                bytes,
            } => {
                reassemble(state, module, *total_size, *done, bytes);
                None
            }
            DecodedValue::GetContainer => {
                if state.silent {
                    return None;
                }
                let reported = state.misroutes.get(&param_id).copied().unwrap_or(param_id);
                let values = state.get_responses.get(&reported).copied().unwrap_or([0, 0]);
                let module_id = Module::resolve(reported).map_or(module.id(), Module::id);
                Some(CallbackData::new(
                    OPCODE_GET_PARAM_RESPONSE,
                    packet.header.token,
                    get_response_payload(state.status, module_id, reported, values),
                ))
            }
        }
    }
}

fn reassemble(state: &mut State, module: Module, total_size: u32, done: bool, bytes: &[u8]) {
    let assembly = state.assemblies.entry(module).or_insert_with(|| Assembly {
        total_size,
        buf: Vec::new(),
    });
    if assembly.total_size != total_size {
        warn!(
            expected = assembly.total_size,
            got = total_size,
            "total_size changed mid-transfer, restarting reassembly"
        );
        assembly.total_size = total_size;
        assembly.buf.clear();
    }
    assembly.buf.extend_from_slice(bytes);
    if !done {
        return;
    }

    if let Some(assembly) = state.assemblies.remove(&module) {
        if assembly.buf.len() == assembly.total_size as usize {
            debug!(?module, size = assembly.buf.len(), "external config reassembled");
            state.configs.insert(module, Bytes::from(assembly.buf));
        } else {
            warn!(
                ?module,
                expected = assembly.total_size,
                got = assembly.buf.len(),
                "external config incomplete, discarded"
            );
        }
    }
}

impl Default for LoopbackPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl PortResolver for LoopbackPeripheral {
    fn resolve_port(&self, direction: Direction) -> PortHandle {
        self.ports.resolve_port(direction)
    }
}

impl Transport for LoopbackPeripheral {
    fn send(&self, packet: Bytes, port: PortHandle) -> ospl_transport::Result<()> {
        let response = {
            let mut state = lock(&self.state);
            let attempt = state.attempts;
            state.attempts += 1;
            if let Some(code) = state.failures.remove(&attempt) {
                return Err(TransportError::Rejected { port, code });
            }

            let decoded = decode_packet(&packet).map_err(|err| TransportError::Undeliverable {
                port,
                reason: err.to_string(),
            })?;
            let module = Module::from_id(decoded.data.module_id).ok_or_else(|| {
                TransportError::Undeliverable {
                    port,
                    reason: format!("unknown module {}", Hex(decoded.data.module_id)),
                }
            })?;
            if self.ports.resolve_port(module.direction()) != port {
                return Err(TransportError::Undeliverable {
                    port,
                    reason: format!("module {:?} is not served by this port", module),
                });
            }

            state.sent.push((port, packet));
            Self::apply(&mut state, module, &decoded)
        };

        if let Some(data) = response {
            if let Some(handler) = lock(&self.handler).clone() {
                let spawned = thread::Builder::new()
                    .name("ospl-loopback".to_string())
                    .spawn(move || handler(&data));
                if let Err(err) = spawned {
                    warn!(error = %err, "failed to spawn loopback response thread");
                }
            }
        }
        Ok(())
    }

    fn register_callback(&self, handler: ResponseHandler) {
        *lock(&self.handler) = Some(handler);
    }
}

impl fmt::Debug for LoopbackPeripheral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackPeripheral")
            .field("ports", &self.ports)
            .field("handler", &self.has_handler())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
