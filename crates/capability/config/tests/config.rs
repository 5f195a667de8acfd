use ems_config::{
    AppConfig, ConfigError, DeviceKind, FailurePolicyKind, MAX_REPLAY_SECONDS, RunMode, SinkKind,
};
use std::collections::HashMap;

fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    AppConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("EMS_POLL_INTERVAL_MS", "250");
        std::env::set_var("EMS_DEVICE_NAME", "inverter-env");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.poll_interval_ms, 250);
    assert_eq!(config.devices[0].identity.name, "inverter-env");
}

#[test]
fn defaults_when_nothing_is_set() {
    let config = load(&[]).expect("config");
    assert_eq!(config.sink, SinkKind::Memory);
    assert_eq!(config.poll_interval_ms, 100);
    assert_eq!(config.failure_policy, FailurePolicyKind::Abort);
    assert_eq!(config.run_mode, RunMode::Poll);
    assert_eq!(config.replay_path, "telemetry.txt");
    assert_eq!(config.replay_stride, 2);
    assert_eq!(config.replay_step_seconds, 600);
    assert_eq!(config.replay_lookback_seconds, 82_800);

    assert_eq!(config.devices.len(), 1);
    let device = &config.devices[0];
    assert_eq!(device.identity.name, "inverter");
    assert_eq!(device.identity.model, "model");
    assert_eq!(device.identity.location, "location");
    assert_eq!(device.identity.port, "COM_port");
    assert_eq!(device.kind, DeviceKind::Replay);
    assert_eq!(device.request_command.as_deref(), Some("Q1\r"));
}

#[test]
fn postgres_sink_requires_database_url() {
    let err = load(&[("EMS_SINK", "postgres")]).expect_err("missing url");
    assert!(matches!(err, ConfigError::Missing(key) if key == "EMS_DATABASE_URL"));

    let config = load(&[
        ("EMS_SINK", "postgres"),
        ("EMS_DATABASE_URL", "postgres://ems@localhost/ems"),
    ])
    .expect("config");
    assert_eq!(config.sink, SinkKind::Postgres);
    assert_eq!(
        config.database_url.as_deref(),
        Some("postgres://ems@localhost/ems")
    );
}

#[test]
fn invalid_values_are_reported_with_key() {
    let err = load(&[("EMS_POLL_INTERVAL_MS", "fast")]).expect_err("not a number");
    assert!(matches!(err, ConfigError::Invalid(key, value)
        if key == "EMS_POLL_INTERVAL_MS" && value == "fast"));

    let err = load(&[("EMS_FAILURE_POLICY", "retry")]).expect_err("unknown policy");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_FAILURE_POLICY"));

    let err = load(&[("EMS_REPLAY_STRIDE", "0")]).expect_err("zero stride");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_REPLAY_STRIDE"));
}

#[test]
fn replay_clock_bounds_are_enforced() {
    let err = load(&[("EMS_REPLAY_STEP_SECONDS", "0")]).expect_err("zero step");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_REPLAY_STEP_SECONDS"));

    let err = load(&[("EMS_REPLAY_STEP_SECONDS", "9300000000000000")]).expect_err("huge step");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_REPLAY_STEP_SECONDS"));

    let err = load(&[("EMS_REPLAY_LOOKBACK_SECONDS", "9300000000000000")])
        .expect_err("huge lookback");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_REPLAY_LOOKBACK_SECONDS"));

    let max = MAX_REPLAY_SECONDS.to_string();
    let config = load(&[
        ("EMS_REPLAY_STEP_SECONDS", max.as_str()),
        ("EMS_REPLAY_LOOKBACK_SECONDS", "0"),
    ])
    .expect("bounds are inclusive");
    assert_eq!(config.replay_step_seconds, MAX_REPLAY_SECONDS);
    assert_eq!(config.replay_lookback_seconds, 0);
}

#[test]
fn single_device_from_env_vars() {
    let config = load(&[
        ("EMS_RUN_MODE", "replay"),
        ("EMS_FAILURE_POLICY", "skip"),
        ("EMS_DEVICE_KIND", "inverter"),
        ("EMS_DEVICE_NAME", "inv-1"),
        ("EMS_DEVICE_MODEL", "axpert"),
        ("EMS_DEVICE_LOCATION", "roof"),
        ("EMS_DEVICE_PORT", "10.0.0.5:4001"),
        ("EMS_DEVICE_REQUEST", "QPIGS\\r"),
    ])
    .expect("config");
    assert_eq!(config.run_mode, RunMode::Replay);
    assert_eq!(config.failure_policy, FailurePolicyKind::Skip);
    let device = &config.devices[0];
    assert_eq!(device.kind, DeviceKind::Inverter);
    assert_eq!(device.identity.name, "inv-1");
    assert_eq!(device.identity.model, "axpert");
    assert_eq!(device.identity.location, "roof");
    assert_eq!(device.identity.port, "10.0.0.5:4001");
    assert_eq!(device.request_command.as_deref(), Some("QPIGS\r"));
}

#[test]
fn device_list_from_json() {
    let json = r#"[
        { "name": "inv-a", "kind": "inverter", "port": "10.0.0.5:4001" },
        { "name": "replay-b", "location": "lab", "request_command": null }
    ]"#;
    let config = load(&[("EMS_DEVICES", json)]).expect("config");
    assert_eq!(config.devices.len(), 2);

    let first = &config.devices[0];
    assert_eq!(first.identity.name, "inv-a");
    assert_eq!(first.identity.model, "model");
    assert_eq!(first.kind, DeviceKind::Inverter);
    assert_eq!(first.request_command.as_deref(), Some("Q1\r"));

    let second = &config.devices[1];
    assert_eq!(second.identity.location, "lab");
    assert_eq!(second.identity.port, "COM_port");
    assert_eq!(second.kind, DeviceKind::Replay);
    assert_eq!(second.request_command, None);
}

#[test]
fn malformed_device_list_is_invalid() {
    let err = load(&[("EMS_DEVICES", "{not json")]).expect_err("bad json");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "EMS_DEVICES"));
}
