//! Drive the control surface against the in-process loopback peripheral.
//!
//! Run: `cargo run --example loopback-session`

use std::sync::Arc;
use std::time::Duration;

use ospl::afe::{AfeConfig, LoopbackPeripheral, MemoryBlobSource, SmartAmp};
use ospl::packet::param::{RX_TEMPERATURE, TX_TEMP_MEASUREMENT_VALUE};
use ospl::transport::Direction;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    peripheral.set_get_response(RX_TEMPERATURE, [38, 0]);
    peripheral.set_get_response(TX_TEMP_MEASUREMENT_VALUE, [4000, 38]);

    let source = MemoryBlobSource::new()
        .with_blob("opalum.rx.ext.config.0", "speaker=default\n")
        .with_blob("opalum.tx.ext.config.0", "sense=default\n");
    let amp = SmartAmp::init(Arc::clone(&peripheral), source, &AfeConfig::default())?;
    amp.configs().wait_loaded(Duration::from_secs(1));

    amp.set_enable(Direction::Rx, true)?;
    amp.set_enable(Direction::Tx, true)?;
    amp.set_external_config(Direction::Rx, 0)?;
    amp.set_external_config(Direction::Tx, 0)?;

    println!("temperature: {}", amp.get_temperature()?);
    let (accumulated, temperature) = amp.get_temperature_measurement()?;
    println!("measurement: accumulated={accumulated} temperature={temperature}");
    println!("packets sent: {}", peripheral.sent_packets().len());
    Ok(())
}
