use std::sync::Arc;
use std::time::Duration;

use ospl_afe::{directory_source, AfeConfig, LoopbackPeripheral, MemoryBlobSource, SmartAmp};
use ospl_packet::param::{
    RX_EXC_MODEL, RX_TEMPERATURE, TX_F0_CALIBRATION_VALUE, TX_TEMP_MEASUREMENT_VALUE,
};
use ospl_transport::Direction;
use serde::Serialize;
use tracing::info;

use crate::cmd::{parse_duration, EmulateArgs};
use crate::exit::{afe_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_json, print_table, OutputFormat};

const CONFIG_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct StepOutput {
    step: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct EmulateOutput {
    strict: bool,
    timeout_ms: u64,
    configs_loaded: usize,
    sent_packets: usize,
    rx_config: Option<String>,
    tx_config: Option<String>,
    steps: Vec<StepOutput>,
}

#[derive(Default)]
struct Session {
    steps: Vec<StepOutput>,
    first_error: Option<CliError>,
}

impl Session {
    fn record(&mut self, step: String, result: ospl_afe::Result<Option<String>>) {
        match result {
            Ok(result) => self.steps.push(StepOutput {
                step,
                ok: true,
                result,
                error: None,
            }),
            Err(err) => {
                let message = err.to_string();
                if self.first_error.is_none() {
                    self.first_error = Some(afe_error(&step, err));
                }
                self.steps.push(StepOutput {
                    step,
                    ok: false,
                    result: None,
                    error: Some(message),
                });
            }
        }
    }
}

pub fn run(args: EmulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;
    let peripheral = Arc::new(LoopbackPeripheral::new());
    seed_responses(&peripheral);
    peripheral.set_silent(args.silent);

    let amp = match directory_source(&config) {
        Some(source) => SmartAmp::init(Arc::clone(&peripheral), source, &config),
        None => SmartAmp::init(Arc::clone(&peripheral), sample_source(&config), &config),
    }
    .map_err(|err| afe_error("init failed", err))?;

    if !amp.configs().wait_loaded(CONFIG_LOAD_TIMEOUT) {
        return Err(CliError::new(
            TIMEOUT,
            format!("external configs not loaded within {CONFIG_LOAD_TIMEOUT:?}"),
        ));
    }
    info!(available = amp.configs().available(), "external configs loaded");

    let session = run_session(&amp, &args);

    let out = EmulateOutput {
        strict: config.strict_correlation,
        timeout_ms: config.get_timeout_ms,
        configs_loaded: amp.configs().available(),
        sent_packets: peripheral.sent_packets().len(),
        rx_config: peripheral
            .external_config(Direction::Rx)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        tx_config: peripheral
            .external_config(Direction::Tx)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        steps: session.steps,
    };
    print_session(&out, format);

    match session.first_error {
        Some(err) => Err(err),
        None => Ok(SUCCESS),
    }
}

fn resolve_config(args: &EmulateArgs) -> CliResult<AfeConfig> {
    let mut config = match &args.config {
        Some(path) => AfeConfig::from_file(path).map_err(|err| {
            afe_error(&format!("failed loading config {}", path.display()), err)
        })?,
        None => AfeConfig::default(),
    };
    if let Some(dir) = &args.firmware_dir {
        config.firmware_dir = Some(dir.clone());
    }
    if let Some(timeout) = &args.timeout {
        let timeout = parse_duration(timeout)?;
        config.get_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }
    if args.strict {
        config.strict_correlation = true;
    }
    config
        .validate()
        .map_err(|err| afe_error("invalid configuration", err))?;
    Ok(config)
}

fn seed_responses(peripheral: &LoopbackPeripheral) {
    peripheral.set_get_response(RX_EXC_MODEL, [1, 0]);
    peripheral.set_get_response(RX_TEMPERATURE, [36, 0]);
    peripheral.set_get_response(TX_F0_CALIBRATION_VALUE, [812, 0]);
    peripheral.set_get_response(TX_TEMP_MEASUREMENT_VALUE, [4096, 36]);
}

fn sample_source(config: &AfeConfig) -> MemoryBlobSource {
    config
        .config_names
        .iter()
        .fold(MemoryBlobSource::new(), |source, name| {
            source.with_blob(name.clone(), format!("# sample\nname={name}\n"))
        })
}

fn run_session(amp: &SmartAmp<Arc<LoopbackPeripheral>>, args: &EmulateArgs) -> Session {
    let mut session = Session::default();

    for direction in Direction::ALL {
        session.record(
            format!("set_enable {direction}"),
            amp.set_enable(direction, true).map(|()| None),
        );
    }
    session.record(
        format!("set_use_case {}", args.use_case),
        amp.set_use_case(args.use_case).map(|()| None),
    );
    session.record(
        format!("set_external_config rx {}", args.rx_config),
        amp.set_external_config(Direction::Rx, args.rx_config)
            .map(|()| None),
    );
    session.record(
        format!("set_external_config tx {}", args.tx_config),
        amp.set_external_config(Direction::Tx, args.tx_config)
            .map(|()| None),
    );
    for direction in Direction::ALL {
        session.record(
            format!("run_calibration {direction}"),
            amp.run_calibration(direction).map(|()| None),
        );
    }
    session.record(
        "set_temperature_calibration".to_string(),
        amp.set_temperature_calibration(1200, 40, 30).map(|()| None),
    );

    session.record(
        "get_excitation_model".to_string(),
        amp.get_excitation_model().map(|v| Some(v.to_string())),
    );
    session.record(
        "get_temperature".to_string(),
        amp.get_temperature().map(|v| Some(v.to_string())),
    );
    session.record(
        "get_f0_calibration".to_string(),
        amp.get_f0_calibration().map(|v| Some(v.to_string())),
    );
    session.record(
        "get_temperature_measurement".to_string(),
        amp.get_temperature_measurement()
            .map(|(first, second)| Some(format!("{first},{second}"))),
    );

    session
}

fn print_session(out: &EmulateOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["STEP", "STATUS", "RESULT"],
            out.steps
                .iter()
                .map(|step| {
                    vec![
                        step.step.clone(),
                        if step.ok { "ok" } else { "failed" }.to_string(),
                        step.result
                            .clone()
                            .or_else(|| step.error.clone())
                            .unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for step in &out.steps {
                match (&step.result, &step.error) {
                    (_, Some(error)) => println!("{:<32} failed: {error}", step.step),
                    (Some(result), None) => println!("{:<32} {result}", step.step),
                    (None, None) => println!("{:<32} ok", step.step),
                }
            }
            println!(
                "sent {} packets, {} configs loaded",
                out.sent_packets, out.configs_loaded
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> EmulateArgs {
        EmulateArgs {
            config: None,
            firmware_dir: None,
            timeout: Some("2s".to_string()),
            strict: false,
            use_case: 1,
            rx_config: 2,
            tx_config: 0,
            silent: false,
        }
    }

    #[test]
    fn session_runs_every_operation() {
        let config = resolve_config(&args()).unwrap();
        let peripheral = Arc::new(LoopbackPeripheral::new());
        seed_responses(&peripheral);
        let amp =
            SmartAmp::init(Arc::clone(&peripheral), sample_source(&config), &config).unwrap();
        assert!(amp.configs().wait_loaded(CONFIG_LOAD_TIMEOUT));

        let session = run_session(&amp, &args());
        assert!(session.first_error.is_none());
        assert_eq!(session.steps.len(), 12);
        assert_eq!(
            session.steps.last().and_then(|step| step.result.clone()),
            Some("4096,36".to_string())
        );
        assert_eq!(
            peripheral.external_config(Direction::Rx),
            Some("# sample\nname=opalum.rx.ext.config.2\n".into())
        );
    }

    #[test]
    fn overrides_apply_to_default_config() {
        let mut args = args();
        args.strict = true;
        args.timeout = Some("150ms".to_string());
        let config = resolve_config(&args).unwrap();
        assert!(config.strict_correlation);
        assert_eq!(config.get_timeout_ms, 150);
    }

    #[test]
    fn first_failure_sets_exit_code() {
        let mut session = Session::default();
        session.record("ok".to_string(), Ok(None));
        session.record(
            "bad".to_string(),
            Err(ospl_afe::AfeError::InvalidUseCase(9)),
        );
        session.record(
            "later".to_string(),
            Err(ospl_afe::AfeError::ConfigsNotLoaded),
        );
        assert_eq!(session.first_error.map(|err| err.code), Some(crate::exit::USAGE));
        assert_eq!(session.steps.len(), 3);
    }
}
