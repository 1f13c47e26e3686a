/// `log` 门面适配器测试
mod common;

use common::fake::FakePool;
use log::{Level, LevelFilter, Log, Metadata, Record};
use sqlsink::bridge::SinkLogger;
use sqlsink::config::TransportConfig;
use sqlsink::{LogSinkTransport, TransportEvent};
use std::time::Duration;

fn transport() -> LogSinkTransport<FakePool> {
    let cfg = TransportConfig::new("logs.db", "app", "secret", "main", "SYS_LOGS");
    LogSinkTransport::new(&cfg, |_, _| FakePool::succeed()).unwrap()
}

fn metadata(level: Level, target: &str) -> Metadata<'_> {
    Metadata::builder().level(level).target(target).build()
}

#[tokio::test]
async fn test_enabled_respects_level_and_ignored_targets() {
    let logger = SinkLogger::new(transport(), LevelFilter::Info).ignore_target("hyper");

    assert!(logger.enabled(&metadata(Level::Info, "app")));
    assert!(logger.enabled(&metadata(Level::Error, "app::db")));
    assert!(!logger.enabled(&metadata(Level::Debug, "app")));

    // 传输层自身与数据库驱动的日志
    assert!(!logger.enabled(&metadata(Level::Error, "sqlsink")));
    assert!(!logger.enabled(&metadata(Level::Error, "sqlsink::transport")));
    assert!(!logger.enabled(&metadata(Level::Error, "tokio_postgres::connection")));
    assert!(!logger.enabled(&metadata(Level::Error, "r2d2")));
    assert!(!logger.enabled(&metadata(Level::Error, "hyper::client")));

    // 只按完整路径段匹配前缀
    assert!(logger.enabled(&metadata(Level::Error, "sqlsinkextra")));
    assert!(logger.enabled(&metadata(Level::Error, "postgresql_app")));
}

#[tokio::test]
async fn test_log_forwards_enabled_records() {
    let transport = transport();
    let mut events = transport.subscribe();
    let logger = SinkLogger::new(transport.clone(), LevelFilter::Warn);

    logger.log(
        &Record::builder()
            .level(Level::Info)
            .target("app")
            .args(format_args!("dropped"))
            .build(),
    );
    logger.log(
        &Record::builder()
            .level(Level::Error)
            .target("app::payments")
            .args(format_args!("card declined"))
            .line(Some(12))
            .build(),
    );

    let event = tokio::time::timeout(Duration::from_millis(200), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        TransportEvent::Logged(record) => {
            assert_eq!(record.level, "error");
            assert_eq!(record.message, "card declined");
            assert_eq!(record.meta["target"], "app::payments");
            assert_eq!(record.meta["line"], 12);
        }
        TransportEvent::Error(err) => panic!("unexpected error event: {err}"),
    }

    let executions = transport.pool().calls.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].1[0], "error");
}

#[tokio::test]
async fn test_installed_logger_receives_log_macros() {
    let transport = transport();
    let mut events = transport.subscribe();
    SinkLogger::new(transport.clone(), LevelFilter::Info)
        .install()
        .unwrap();

    log::info!(target: "app::orders", "order {} shipped", 42);
    log::debug!(target: "app::orders", "below threshold");

    let event = tokio::time::timeout(Duration::from_millis(200), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        TransportEvent::Logged(record) => {
            assert_eq!(record.level, "info");
            assert_eq!(record.message, "order 42 shipped");
        }
        TransportEvent::Error(err) => panic!("unexpected error event: {err}"),
    }
    assert_eq!(transport.pool().calls.executions().len(), 1);
}
