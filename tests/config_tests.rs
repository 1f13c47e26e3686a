/// Configuration module tests
use sqlsink::config::*;
use sqlsink::error::{ConfigError, Error};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn parse(content: &str) -> sqlsink::Result<Config> {
    Config::from_str(content, PathBuf::from("test.toml"))
}

const MINIMAL: &str = r#"
[transport]
server_node = "localhost:5432"
user = "app"
password = "secret"
database = "public"
table = "app_logs"
"#;

// ==================== Parsing ====================

#[test]
fn test_minimal_config_uses_defaults() {
    let config = parse(MINIMAL).unwrap();
    assert_eq!(config.logging.level(), "info");
    assert_eq!(config.logging.file(), None);
    assert_eq!(config.transport.backend, Backend::Sqlite);
    assert_eq!(config.transport.pool, PoolOptions::default());
    assert!(!config.transport.emit_acquisition_errors);

    let settings = config.transport.validate().unwrap();
    assert_eq!(settings.qualified_table(), "public.app_logs");
    assert_eq!(settings.level_filter, None);
    assert_eq!(settings.timeout, None);
    assert_eq!(settings.pool.max_idle, 10);
    assert_eq!(settings.pool.max_total, 20);
    assert_eq!(settings.pool.idle_timeout(), Duration::from_secs(3600));
}

#[test]
fn test_full_config() {
    let content = r#"
[logging]
level = "debug"
file = "logs/sqlsink.log"

[transport]
backend = "postgres"
level = "error"
server_address = "db.internal:5433"
user = "app"
password = "secret"
database = "public"
table = "app_logs"
timeout_ms = 1500
emit_acquisition_errors = true

[transport.fields]
level = "MYLEVEL"
timestamp = "ADDDATE"

[transport.pool]
max_idle = 1
max_total = 4
idle_timeout_secs = 60
ping_check = true
"#;
    let config = parse(content).unwrap();
    assert_eq!(config.logging.file(), Some("logs/sqlsink.log"));
    assert_eq!(config.transport.backend, Backend::Postgres);
    assert_eq!(config.transport.server_node.as_deref(), Some("db.internal:5433"));

    let settings = config.transport.validate().unwrap();
    assert_eq!(settings.level_filter.as_deref(), Some("error"));
    assert_eq!(settings.timeout, Some(Duration::from_millis(1500)));
    assert!(settings.emit_acquisition_errors);
    assert_eq!(settings.fields.level, "MYLEVEL");
    assert_eq!(settings.fields.message, "MESSAGE");
    assert_eq!(settings.fields.meta, "META");
    assert_eq!(settings.fields.timestamp, "ADDDATE");
    assert_eq!(settings.pool.max_idle, 1);
    assert_eq!(settings.pool.max_total, 4);
    assert!(settings.pool.ping_check);
    assert!(!settings.pool.allow_user_switch);
}

#[test]
fn test_missing_transport_section_fails() {
    let err = parse("[logging]\nlevel = \"info\"\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingField {
            field: "database serverNode",
            ..
        })
    ));
}

#[test]
fn test_invalid_toml() {
    let err = parse("[transport\nserver_node = ").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ParseFailed { .. })));
}

#[test]
fn test_unknown_backend_rejected() {
    let content = format!("{MINIMAL}backend = \"oracle\"\n");
    assert!(matches!(
        parse(&content),
        Err(Error::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[test]
fn test_invalid_logging_level() {
    let content = format!("[logging]\nlevel = \"loud\"\n{MINIMAL}");
    let err = parse(&content).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidLogLevel { .. })
    ));
    assert!(err.to_string().contains("trace, debug, info, warn, error"));
}

#[test]
fn test_zero_timeout_rejected() {
    let content = MINIMAL.replace("table = \"app_logs\"", "table = \"app_logs\"\ntimeout_ms = 0");
    assert!(matches!(
        parse(&content),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[test]
fn test_pool_idle_above_total_rejected() {
    let content = format!("{MINIMAL}\n[transport.pool]\nmax_idle = 30\nmax_total = 20\n");
    let err = parse(&content).unwrap_err();
    assert!(err.to_string().contains("transport.pool.max_idle"));
}

#[test]
fn test_field_name_must_be_identifier() {
    let content = format!("{MINIMAL}\n[transport.fields]\nmeta = \"meta data\"\n");
    let err = parse(&content).unwrap_err();
    assert!(err.to_string().contains("transport.fields.meta"));
}

// ==================== Files ====================

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.transport.table.as_deref(), Some("app_logs"));
}

#[test]
fn test_from_missing_file() {
    let err = Config::from_file("/nonexistent/sqlsink.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::NotFound(_))));
}

// ==================== Programmatic construction ====================

#[test]
fn test_builder_methods() {
    let config = TransportConfig::new("logs.db", "u", "p", "main", "LOGS")
        .with_backend(Backend::Sqlite)
        .with_level("warn")
        .with_timeout(Duration::from_secs(2))
        .with_acquisition_error_events(true)
        .with_pool(PoolOptions {
            max_total: 3,
            max_idle: 3,
            ..PoolOptions::default()
        });

    let settings = config.validate().unwrap();
    assert!(settings.accepts("warn"));
    assert!(!settings.accepts("error"));
    assert_eq!(settings.timeout, Some(Duration::from_secs(2)));
    assert_eq!(settings.pool.max_total, 3);
}

#[test]
fn test_password_masked_in_debug_output() {
    let settings = TransportConfig::new("logs.db", "u", "hunter2", "main", "LOGS")
        .validate()
        .unwrap();
    let debug = format!("{:?}", settings.connection);
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("***"));
}
