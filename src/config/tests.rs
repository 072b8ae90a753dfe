use super::settings::Settings;
use super::{load_config, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.server.addr(), "127.0.0.1:5000");
    assert_eq!(settings.broker.max_connections, 1024);
    assert_eq!(settings.broker.outbound_queue_capacity, 256);
    assert_eq!(settings.log.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("missing");

    let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 5000);
    assert_eq!(cfg.broker.outbound_queue_capacity, 256);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        max_connections = 10

        [log]
        level = "debug"
    "#;
    fs::write(tmp.path().join("broker.toml"), toml).expect("write config file");
    let stem = tmp.path().join("broker");

    let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.broker.max_connections, 10);
    // not in the file
    assert_eq!(cfg.broker.outbound_queue_capacity, 256);
    assert_eq!(cfg.log.level, "debug");
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    temp_env::with_vars(
        [
            ("TOPICAST__SERVER__PORT", Some("6100")),
            ("TOPICAST__BROKER__OUTBOUND_QUEUE_CAPACITY", Some("8")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 6100);
            assert_eq!(cfg.broker.outbound_queue_capacity, 8);
            assert_eq!(cfg.server.host, "127.0.0.1");
        },
    );
}

#[test]
#[serial]
fn zero_queue_capacity_falls_back_to_default() {
    temp_env::with_var("TOPICAST__BROKER__OUTBOUND_QUEUE_CAPACITY", Some("0"), || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.broker.outbound_queue_capacity, 256);
    });
}
