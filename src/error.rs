use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration related error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File operation error
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// Log delivery error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Log record error
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Configuration file parse failed
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// Invalid log level
    #[error("Invalid log level '{level}', valid values: {}", valid_levels.join(", "))]
    InvalidLogLevel {
        level: String,
        valid_levels: Vec<String>,
    },

    /// Required transport option is absent or blank
    #[error("The {field} is required ({hint})")]
    MissingField {
        field: &'static str,
        hint: &'static str,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value {field} = '{value}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Backend selected in configuration was not compiled in
    #[error("Backend '{0}' is not enabled in this build")]
    BackendDisabled(String),

    /// Transport constructed outside of a Tokio runtime
    #[error("A Tokio runtime is required to construct the transport")]
    NoRuntime,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// File already exists
    #[error("File already exists: {path} (use --force to replace)")]
    AlreadyExists { path: PathBuf },

    /// File read failed
    #[error("Failed to read file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// File write failed
    #[error("Failed to write file {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// Create directory failed
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirectoryFailed { path: PathBuf, reason: String },
}

/// 日志投递错误
///
/// 通过回调和 `Error` 事件传递给调用方，需要 `Clone` 以便广播给多个订阅者。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The pool could not hand back a connection
    #[error("Failed to acquire a pooled connection: {reason}")]
    Acquisition { reason: String },

    /// The insert statement failed
    #[error("Failed to insert log record into {table}: {reason}")]
    Execution { table: String, reason: String },

    /// A suspension point exceeded the configured deadline
    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout {
        stage: TimeoutStage,
        timeout_ms: u64,
    },

    /// Metadata could not be encoded as JSON
    #[error("Failed to serialize log metadata: {reason}")]
    Serialization { reason: String },
}

impl TransportError {
    /// 是否发生在获取连接阶段（尚未持有连接）
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            TransportError::Acquisition { .. }
                | TransportError::Timeout {
                    stage: TimeoutStage::Acquire,
                    ..
                }
        )
    }
}

/// 超时发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    Acquire,
    Execute,
}

impl std::fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutStage::Acquire => f.write_str("Connection acquisition"),
            TimeoutStage::Execute => f.write_str("Insert execution"),
        }
    }
}

/// 日志记录错误
#[derive(Debug, Error)]
pub enum RecordError {
    /// Input is not a JSON object
    #[error("Log record must be a JSON object, got: {0}")]
    NotAnObject(String),

    /// The level field is missing or not a string
    #[error("Log record is missing a string 'level' field")]
    MissingLevel,

    /// Input line is not valid JSON
    #[error("Invalid JSON log record: {0}")]
    InvalidJson(String),
}

/// 数据库后端错误（连接池或驱动返回）
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 应用程序 Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;

// 辅助宏，用于快速创建错误
#[macro_export]
macro_rules! config_error {
    ($variant:ident { $($field:ident: $value:expr),+ $(,)? }) => {
        $crate::error::Error::Config($crate::error::ConfigError::$variant {
            $($field: $value),+
        })
    };
}

#[macro_export]
macro_rules! file_error {
    ($variant:ident { $($field:ident: $value:expr),+ $(,)? }) => {
        $crate::error::Error::File($crate::error::FileError::$variant {
            $($field: $value),+
        })
    };
}
