//! Control surface of the smart amplifier.

use std::sync::Arc;

use ospl_packet::param::{
    self, RX_EXC_MODEL, RX_SET_USE_CASE, RX_TEMPERATURE, RX_TEMP_CAL_DATA,
    TX_F0_CALIBRATION_VALUE, TX_TEMP_MEASUREMENT_VALUE,
};
use ospl_packet::{Module, SetValue};
use ospl_transport::{Direction, Transport};
use tracing::info;

use crate::bulk::send_bulk;
use crate::command::set_param;
use crate::config::{AfeConfig, RX_CONFIG_COUNT, TX_CONFIG_COUNT};
use crate::correlator::ResponseCorrelator;
use crate::error::{AfeError, Result};
use crate::firmware::{config_string, BlobSource, ConfigCache};

/// Number of internal RX use cases.
pub const USE_CASE_COUNT: u32 = 3;

/// Driver for one amplifier reachable over `T`.
#[derive(Debug)]
pub struct SmartAmp<T: Transport> {
    transport: T,
    correlator: ResponseCorrelator,
    configs: Arc<ConfigCache>,
}

impl<T: Transport> SmartAmp<T> {
    /// Register the response handler and start loading external configs in
    /// the background.
    pub fn init<S>(transport: T, source: S, config: &AfeConfig) -> Result<Self>
    where
        S: BlobSource + 'static,
    {
        config.validate()?;
        let amp = Self::new(
            transport,
            ResponseCorrelator::from_config(config),
            Arc::new(ConfigCache::new()),
        );
        amp.configs
            .spawn_load(source, config.config_names.clone())?;
        Ok(amp)
    }

    /// Assemble a driver from parts; the cache may already be loaded.
    pub fn new(transport: T, correlator: ResponseCorrelator, configs: Arc<ConfigCache>) -> Self {
        transport.register_callback(correlator.handler());
        Self {
            transport,
            correlator,
            configs,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn correlator(&self) -> &ResponseCorrelator {
        &self.correlator
    }

    pub fn configs(&self) -> &Arc<ConfigCache> {
        &self.configs
    }

    /// Enable or disable the processing module of one direction.
    pub fn set_enable(&self, direction: Direction, enable: bool) -> Result<()> {
        let module = Module::for_direction(direction);
        set_param(&self.transport, module.id(), &SetValue::Scalar(i32::from(enable)))
    }

    /// Select one of the internal RX use cases.
    pub fn set_use_case(&self, index: u32) -> Result<()> {
        if index >= USE_CASE_COUNT {
            return Err(AfeError::InvalidUseCase(index));
        }
        set_param(&self.transport, RX_SET_USE_CASE, &SetValue::Scalar(index as i32))
    }

    pub fn run_calibration(&self, direction: Direction) -> Result<()> {
        let param_id = param::run_calibration_param(direction);
        self.correlator
            .exclusive(|| set_param(&self.transport, param_id, &SetValue::Scalar(1)))
    }

    /// Send cached external configuration `index` of `direction`.
    ///
    /// TX indices address the cache after the RX slots. The blob is sent up to
    /// its first NUL byte.
    pub fn set_external_config(&self, direction: Direction, index: usize) -> Result<()> {
        let (count, offset) = match direction {
            Direction::Rx => (RX_CONFIG_COUNT, 0),
            Direction::Tx => (TX_CONFIG_COUNT, RX_CONFIG_COUNT),
        };
        if index >= count {
            return Err(AfeError::InvalidConfigIndex { direction, index });
        }
        if !self.configs.is_loaded() {
            return Err(AfeError::ConfigsNotLoaded);
        }

        let slot = index + offset;
        let blob = self
            .configs
            .get(slot)
            .ok_or(AfeError::ConfigUnavailable { index: slot })?;
        let config = config_string(&blob);
        info!(%direction, index = slot, size = config.len(), "sending external config");
        send_bulk(&self.transport, param::external_config_param(direction), config)
    }

    pub fn get_excitation_model(&self) -> Result<i32> {
        self.get_first(RX_EXC_MODEL)
    }

    pub fn get_temperature(&self) -> Result<i32> {
        self.get_first(RX_TEMPERATURE)
    }

    /// Send accumulated temperature calibration data to the RX module.
    pub fn set_temperature_calibration(
        &self,
        accumulated: i32,
        count: i32,
        temperature: i32,
    ) -> Result<()> {
        let value = SetValue::Triple(accumulated, count, temperature);
        self.correlator
            .exclusive(|| set_param(&self.transport, RX_TEMP_CAL_DATA, &value))
    }

    pub fn get_f0_calibration(&self) -> Result<i32> {
        self.get_first(TX_F0_CALIBRATION_VALUE)
    }

    pub fn get_temperature_measurement(&self) -> Result<(i32, i32)> {
        self.correlator.get(&self.transport, TX_TEMP_MEASUREMENT_VALUE)
    }

    fn get_first(&self, param_id: u32) -> Result<i32> {
        self.correlator
            .get(&self.transport, param_id)
            .map(|(first, _)| first)
    }
}
