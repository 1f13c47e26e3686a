use crate::constants::{
    DEFAULT_POOL_CONNECTION_TIMEOUT_MS, DEFAULT_POOL_IDLE_TIMEOUT_SECS, DEFAULT_POOL_MAX_IDLE,
    DEFAULT_POOL_MAX_TOTAL, LOG_LEVELS,
};
use crate::error::{ConfigError, Error, Result};
use crate::schema::{self, FieldNames};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::Config(ConfigError::NotFound(path.to_path_buf())))?;
        Self::from_str(&content, path.to_path_buf())
    }

    /// 从字符串解析配置
    pub fn from_str(content: &str, path: PathBuf) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| {
            Error::Config(ConfigError::ParseFailed {
                path,
                reason: e.to_string(),
            })
        })?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.transport.validate()?;
        Ok(())
    }
}

/// 诊断日志配置（程序自身的运行日志，而非被投递的日志记录）
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// 可选的日志输出文件路径，未设置时输出到 stderr
    #[serde(default)]
    pub file: Option<String>,
}

impl LoggingConfig {
    /// 获取日志级别
    pub fn level(&self) -> &str {
        &self.level
    }

    /// 获取日志输出文件路径
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// 验证日志级别是否有效
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS
            .iter()
            .any(|&l| l.eq_ignore_ascii_case(self.level.as_str()))
        {
            return Err(Error::Config(ConfigError::InvalidLogLevel {
                level: self.level.clone(),
                valid_levels: LOG_LEVELS.iter().map(|s| (*s).to_string()).collect(),
            }));
        }

        if let Some(file) = &self.file
            && file.trim().is_empty()
        {
            return Err(crate::config_error!(InvalidValue {
                field: "logging.file".to_string(),
                value: file.clone(),
                reason: "Log file path cannot be empty".to_string(),
            }));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// 数据库后端类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgres,
}

impl Backend {
    /// 后端对应的参数占位符风格
    pub fn dialect(self) -> schema::Dialect {
        match self {
            Backend::Sqlite => schema::Dialect::Question,
            Backend::Postgres => schema::Dialect::Dollar,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

/// 连接参数，原样交给连接池工厂
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub server_node: String,
    pub user: String,
    pub password: String,
}

// 密码不出现在日志中
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server_node", &self.server_node)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// 连接池参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// 池中最多保留的空闲连接数
    pub max_idle: usize,
    /// 空闲 + 使用中连接数上限
    pub max_total: usize,
    /// 空闲连接保留时间（秒）
    pub idle_timeout_secs: u64,
    /// 池满或连接建立失败时，获取连接的最长等待时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 复用空闲连接前是否先探测其可用性
    pub ping_check: bool,
    /// 是否允许在池化连接上切换用户
    pub allow_user_switch: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_POOL_MAX_IDLE,
            max_total: DEFAULT_POOL_MAX_TOTAL,
            idle_timeout_secs: DEFAULT_POOL_IDLE_TIMEOUT_SECS,
            connection_timeout_ms: DEFAULT_POOL_CONNECTION_TIMEOUT_MS,
            ping_check: false,
            allow_user_switch: false,
        }
    }
}

impl PoolOptions {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_total == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transport.pool.max_total".to_string(),
                value: self.max_total.to_string(),
                reason: "Pool must allow at least one connection".to_string(),
            });
        }
        if u32::try_from(self.max_total).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "transport.pool.max_total".to_string(),
                value: self.max_total.to_string(),
                reason: format!("Cannot exceed {}", u32::MAX),
            });
        }
        for (field, value) in [
            ("transport.pool.idle_timeout_secs", self.idle_timeout_secs),
            ("transport.pool.connection_timeout_ms", self.connection_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Must be greater than zero".to_string(),
                });
            }
        }
        if self.max_idle > self.max_total {
            return Err(ConfigError::InvalidValue {
                field: "transport.pool.max_idle".to_string(),
                value: self.max_idle.to_string(),
                reason: format!("Cannot exceed max_total ({})", self.max_total),
            });
        }
        Ok(())
    }
}

/// 用户自定义的字段名（可部分覆盖）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldNamesConfig {
    pub level: Option<String>,
    pub meta: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

/// 传输层配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportConfig {
    /// 数据库后端（仅 CLI 用于选择连接池实现）
    #[serde(default)]
    pub backend: Backend,
    /// 只持久化与该级别完全相同的记录
    #[serde(default)]
    pub level: Option<String>,
    /// 数据库地址 (host:port 或 SQLite 文件路径)
    #[serde(default, alias = "server_address")]
    pub server_node: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 数据库/schema 名
    #[serde(default)]
    pub database: Option<String>,
    /// 日志表名
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub fields: Option<FieldNamesConfig>,
    #[serde(default)]
    pub pool: PoolOptions,
    /// 获取连接与执行插入各自的超时（毫秒）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// 获取连接失败时是否也发出 Error 事件
    #[serde(default)]
    pub emit_acquisition_errors: bool,
}

impl TransportConfig {
    /// 以必填项创建配置，其余使用默认值
    pub fn new(
        server_node: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            server_node: Some(server_node.into()),
            user: Some(user.into()),
            password: Some(password.into()),
            database: Some(database.into()),
            table: Some(table.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldNamesConfig) -> Self {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_acquisition_error_events(mut self, enabled: bool) -> Self {
        self.emit_acquisition_errors = enabled;
        self
    }

    /// 验证配置并解析出运行期使用的不可变设置
    pub fn validate(&self) -> std::result::Result<TransportSettings, ConfigError> {
        let server_node = required(
            self.server_node.as_ref(),
            "database serverNode",
            "transport.server_node",
        )?;
        let user = required(self.user.as_ref(), "database username", "transport.user")?;
        let password = required(
            self.password.as_ref(),
            "database password",
            "transport.password",
        )?;
        let database = required(self.database.as_ref(), "database name", "transport.database")?;
        let table = required(self.table.as_ref(), "database table", "transport.table")?;

        schema::check_identifier("transport.database", &database)?;
        schema::check_identifier("transport.table", &table)?;

        let fields = FieldNames::resolve(self.fields.as_ref())?;
        self.pool.validate()?;

        let timeout = match self.timeout_ms {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "transport.timeout_ms".to_string(),
                    value: "0".to_string(),
                    reason: "Timeout must be greater than zero".to_string(),
                });
            }
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        // 空字符串等同于未设置
        let level_filter = self.level.clone().filter(|l| !l.is_empty());

        Ok(TransportSettings {
            level_filter,
            connection: ConnectionParams {
                server_node,
                user,
                password,
            },
            pool: self.pool.clone(),
            database,
            table,
            fields,
            timeout,
            emit_acquisition_errors: self.emit_acquisition_errors,
        })
    }
}

fn required(
    value: Option<&String>,
    field: &'static str,
    hint: &'static str,
) -> std::result::Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::MissingField { field, hint }),
    }
}

/// 构造完成后不再变化的传输层设置
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub level_filter: Option<String>,
    pub connection: ConnectionParams,
    pub pool: PoolOptions,
    pub database: String,
    pub table: String,
    pub fields: FieldNames,
    pub timeout: Option<Duration>,
    pub emit_acquisition_errors: bool,
}

impl TransportSettings {
    /// 完整表名 database.table
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// 记录是否通过级别过滤
    pub fn accepts(&self, level: &str) -> bool {
        self.level_filter.as_deref().is_none_or(|f| f == level)
    }
}
