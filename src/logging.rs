use crate::config::LoggingConfig;
use crate::constants::LOG_LEVELS;
use crate::error::{ConfigError, Error, FileError, Result};
use log::LevelFilter;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

// 使用 once_cell 缓存日志级别映射表，避免每次查找时重新构建
static LOG_LEVEL_MAP: Lazy<HashMap<&'static str, LevelFilter>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("trace", LevelFilter::Trace);
    map.insert("debug", LevelFilter::Debug);
    map.insert("info", LevelFilter::Info);
    map.insert("warn", LevelFilter::Warn);
    map.insert("error", LevelFilter::Error);
    map
});

/// 初始化诊断日志（env_logger），可选追加写入文件
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(config.level())?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_millis();

    if let Some(file) = config.file() {
        let log_path = Path::new(file);

        // 创建日志目录（如果不存在）
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty())
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::File(FileError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                Error::File(FileError::WriteFailed {
                    path: log_path.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().map_err(|e| {
        Error::Config(ConfigError::InvalidValue {
            field: "logging".to_string(),
            value: config.level().to_string(),
            reason: format!("Failed to install logger: {e}"),
        })
    })?;

    log::info!(
        "Logging initialized - level: {:?}, file: {}",
        level,
        config.file().unwrap_or("<stderr>")
    );

    Ok(())
}

/// 解析日志级别字符串
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    let lower = level_str.to_lowercase();
    LOG_LEVEL_MAP.get(lower.as_str()).copied().ok_or_else(|| {
        Error::Config(ConfigError::InvalidLogLevel {
            level: level_str.to_string(),
            valid_levels: LOG_LEVELS.iter().map(|s| (*s).to_string()).collect(),
        })
    })
}
