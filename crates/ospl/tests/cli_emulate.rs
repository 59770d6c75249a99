#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ospl-emulate-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn emulate(extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ospl"))
        .args(["--log-level", "error", "--format", "json", "emulate"])
        .args(extra)
        .output()
        .expect("emulate should run")
}

#[test]
fn emulate_runs_full_session() {
    let output = emulate(&[]);
    assert!(output.status.success());

    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("emulate should emit json");
    let steps = payload["steps"].as_array().expect("steps array");
    assert_eq!(steps.len(), 12);
    assert!(steps.iter().all(|step| step["ok"] == true));
    assert_eq!(payload["configs_loaded"], 4);
    assert_eq!(
        payload["rx_config"],
        "# sample\nname=opalum.rx.ext.config.0\n"
    );
    let measurement = steps
        .iter()
        .find(|step| step["step"] == "get_temperature_measurement")
        .expect("measurement step");
    assert_eq!(measurement["result"], "4096,36");
}

#[test]
fn emulate_with_firmware_dir_reports_missing_config() {
    let dir = unique_temp_dir("firmware");
    std::fs::write(dir.join("opalum.rx.ext.config.0"), b"rx-zero\0junk")
        .expect("config should be writable");

    let output = emulate(&["--firmware-dir", dir.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));

    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("emulate should emit json");
    assert_eq!(payload["configs_loaded"], 1);
    assert_eq!(payload["rx_config"], "rx-zero");
    let tx_step = payload["steps"]
        .as_array()
        .and_then(|steps| {
            steps
                .iter()
                .find(|step| step["step"] == "set_external_config tx 0")
        })
        .expect("tx config step");
    assert_eq!(tx_step["ok"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn emulate_silent_peripheral_times_out() {
    let output = emulate(&["--silent", "--timeout", "50ms"]);
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn emulate_invalid_use_case_is_usage_error() {
    let output = emulate(&["--use-case", "7"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn emulate_rejects_bad_config_file() {
    let dir = unique_temp_dir("bad-config");
    let path = dir.join("afe.json");
    std::fs::write(&path, r#"{"get_timeout_ms": 0}"#).expect("config should be writable");

    let output = emulate(&["--config", path.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}
