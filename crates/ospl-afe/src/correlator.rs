//! Correlation of get requests with their asynchronous responses.
//!
//! A get goes through `Idle -> AwaitingCallback -> Delivered | TimedOut`:
//!
//! 1. take the get-request lock (one outstanding get at a time)
//! 2. arm the pending slot and (re-)register the response handler
//! 3. send the request
//! 4. wait on the slot until a response is published or the bound expires
//! 5. read and clear the slot, release the lock
//!
//! The response handler runs on a transport-owned context. It only holds the
//! slot lock long enough to write two values, so it never waits on a getter.
//!
//! Correlation is loose by default: any recognised response (known module,
//! whitelisted parameter) satisfies whichever get is pending, and the last one
//! delivered wins. Strict mode also requires the parameter id to match the
//! pending request and drops everything else.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ospl_packet::codec::OPCODE_GET_PARAM_RESPONSE;
use ospl_packet::{decode_get_response, param, Module};
use ospl_transport::{CallbackData, ResponseHandler, Transport};
use tracing::{debug, error, info, warn};

use crate::command::{self, Hex};
use crate::config::AfeConfig;
use crate::error::{AfeError, Result};

#[derive(Debug, Default)]
struct Slot {
    awaited: Option<u32>,
    result: Option<[i32; 2]>,
}

#[derive(Debug, Default)]
struct PendingGet {
    slot: Mutex<Slot>,
    delivered: Condvar,
}

impl PendingGet {
    fn arm(&self, param_id: u32) {
        let mut slot = lock(&self.slot);
        slot.awaited = Some(param_id);
        slot.result = None;
    }

    fn clear(&self) {
        let mut slot = lock(&self.slot);
        slot.awaited = None;
        slot.result = None;
    }

    /// A bound too large to express as an `Instant` waits without a deadline.
    fn wait(&self, timeout: Duration) -> Option<[i32; 2]> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = lock(&self.slot);
        loop {
            if let Some(values) = slot.result.take() {
                slot.awaited = None;
                return Some(values);
            }
            slot = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        slot.awaited = None;
                        return None;
                    }
                    self.delivered
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .delivered
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn on_response(&self, data: &CallbackData, strict: bool) {
        if data.payload.is_none() {
            error!(opcode = %Hex(data.opcode), "invalid callback data: no payload");
            return;
        }
        if data.opcode != OPCODE_GET_PARAM_RESPONSE {
            return;
        }
        let response = match decode_get_response(data) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "malformed get response ignored");
                return;
            }
        };
        if Module::from_id(response.module_id).is_none()
            || !param::is_reported_param(response.param_id)
        {
            debug!(
                module_id = %Hex(response.module_id),
                param_id = %Hex(response.param_id),
                "unrelated get response ignored"
            );
            return;
        }
        if response.status != 0 {
            warn!(
                param_id = %Hex(response.param_id),
                status = response.status,
                "get response reports non-zero status"
            );
        }

        {
            let mut slot = lock(&self.slot);
            if strict && slot.awaited != Some(response.param_id) {
                debug!(
                    param_id = %Hex(response.param_id),
                    awaited = ?slot.awaited.map(Hex).map(|hex| hex.to_string()),
                    "uncorrelated get response dropped"
                );
                return;
            }
            slot.result = Some(response.values);
        }
        self.delivered.notify_all();

        info!(
            module_id = %Hex(response.module_id),
            param_id = %Hex(response.param_id),
            value0 = response.values[0],
            value1 = response.values[1],
            "get response delivered"
        );
    }
}

/// Single-slot synchronization point between `get` callers and the callback.
#[derive(Debug)]
pub struct ResponseCorrelator {
    request_lock: Mutex<()>,
    pending: Arc<PendingGet>,
    timeout: Duration,
    strict: bool,
}

impl ResponseCorrelator {
    /// Loose correlation with the given round-trip bound.
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_lock: Mutex::new(()),
            pending: Arc::new(PendingGet::default()),
            timeout,
            strict: false,
        }
    }

    /// Only accept responses whose parameter id matches the pending get.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn from_config(config: &AfeConfig) -> Self {
        Self::new(config.get_timeout()).strict(config.strict_correlation)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Response handler to install on the transport.
    pub fn handler(&self) -> ResponseHandler {
        let pending = Arc::clone(&self.pending);
        let strict = self.strict;
        Arc::new(move |data: &CallbackData| pending.on_response(data, strict))
    }

    /// Issue a get and wait for its two result values.
    pub fn get<T: Transport + ?Sized>(&self, transport: &T, param_id: u32) -> Result<(i32, i32)> {
        Module::resolve(param_id)?;
        let _request = lock(&self.request_lock);

        self.pending.arm(param_id);
        transport.register_callback(self.handler());
        if let Err(err) = command::get_param(transport, param_id) {
            self.pending.clear();
            return Err(err);
        }

        match self.pending.wait(self.timeout) {
            Some([first, second]) => Ok((first, second)),
            None => {
                error!(
                    param_id = %Hex(param_id),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "get_param timed out"
                );
                Err(AfeError::GetTimeout {
                    param_id,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Run `f` while holding the get-request lock.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _request = lock(&self.request_lock);
        f()
    }

    /// Whether a get is currently waiting for its response.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending.slot).awaited.is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
