//! `log` 门面适配器
//!
//! 将 `log::info!` 等宏产生的记录转为 [`LogRecord`] 并交给传输层。
//! 传输层与数据库驱动自身的日志会被忽略，避免写入路径上的日志再次触发写入。

use crate::pool::ConnectionPool;
use crate::record::LogRecord;
use crate::transport::LogSinkTransport;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// 默认忽略的 target 前缀
const IGNORED_TARGETS: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "r2d2",
    "tokio_postgres",
    "postgres",
];

/// 把 `log` 记录转发到 [`LogSinkTransport`] 的 Logger
#[derive(Debug)]
pub struct SinkLogger<P: ConnectionPool> {
    transport: LogSinkTransport<P>,
    level: LevelFilter,
    ignored: Vec<String>,
}

impl<P: ConnectionPool> SinkLogger<P> {
    pub fn new(transport: LogSinkTransport<P>, level: LevelFilter) -> Self {
        Self {
            transport,
            level,
            ignored: IGNORED_TARGETS.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    /// 额外忽略某个 target 前缀
    #[must_use]
    pub fn ignore_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored.push(prefix.into());
        self
    }

    /// 注册为全局 logger
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored.iter().any(|prefix| {
            target == prefix
                || target
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

impl<P: ConnectionPool> Log for SinkLogger<P> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && !self.is_ignored(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.transport.log(to_log_record(record), None);
    }

    fn flush(&self) {}
}

/// `log::Record` -> [`LogRecord`]
///
/// 级别使用小写名称（`info`、`warn` ...），target/module/file/line 作为元数据。
pub fn to_log_record(record: &Record) -> LogRecord {
    let mut converted = LogRecord::new(
        record.level().as_str().to_ascii_lowercase(),
        record.args().to_string(),
    )
    .with_meta("target", record.target());

    if let Some(module) = record.module_path() {
        converted = converted.with_meta("module_path", module);
    }
    if let Some(file) = record.file() {
        converted = converted.with_meta("file", file);
    }
    if let Some(line) = record.line() {
        converted = converted.with_meta("line", line);
    }
    converted
}
