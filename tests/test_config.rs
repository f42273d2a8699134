mod common;
use common::*;

use solaredge_bridge::config::Config;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn load(content: &str) -> anyhow::Result<Config> {
    common_setup();
    let file = write_config(content);
    Config::new(file.path().to_string_lossy().to_string())
}

#[test]
fn minimal_config_applies_defaults() {
    let config = load(
        r#"
inverter:
  host: "192.168.1.10"
"#,
    )
    .unwrap();

    assert_eq!(config.inverter.host(), "192.168.1.10");
    assert_eq!(config.inverter.port(), 502);
    assert_eq!(config.inverter.unit_id(), 1);
    assert_eq!(config.period, 5);
    assert_eq!(config.loglevel, "info");
    assert!(config.influx.enabled());
    assert_eq!(config.influx.url(), "http://localhost:8086");
    assert_eq!(config.influx.database(), "solaredge");
}

#[test]
fn explicit_values_override_defaults() {
    let config = load(
        r#"
inverter:
  host: "10.0.0.7"
  port: 1502
  unit_id: 3
influx:
  host: "influx.example.org"
  port: 9999
  database: "pv"
  username: "solar"
  password: "edge"
period: 30
loglevel: "trace"
"#,
    )
    .unwrap();

    assert_eq!(config.inverter.port(), 1502);
    assert_eq!(config.inverter.unit_id(), 3);
    assert_eq!(config.influx.url(), "http://influx.example.org:9999");
    assert_eq!(config.influx.database(), "pv");
    assert_eq!(config.influx.username(), &Some("solar".to_string()));
    assert_eq!(config.period, 30);
}

#[test]
fn empty_inverter_host_is_rejected() {
    let result = load(
        r#"
inverter:
  host: ""
"#,
    );

    assert!(result.is_err());
}

#[test]
fn zero_period_is_rejected() {
    let result = load(
        r#"
inverter:
  host: "192.168.1.10"
period: 0
"#,
    );

    assert!(result.is_err());
}

#[test]
fn empty_database_is_rejected() {
    let result = load(
        r#"
inverter:
  host: "192.168.1.10"
influx:
  database: ""
"#,
    );

    assert!(result.is_err());
}
