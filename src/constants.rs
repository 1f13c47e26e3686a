//! 公共常量
//! 提供：
//! - 合法日志级别常量 LOG_LEVELS
//! - 日志表默认字段名
//! - 连接池默认参数

/// 合法的日志级别（统一来源）
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 默认字段名（大写，与常见数据库的未加引号标识符习惯一致）
pub const DEFAULT_LEVEL_FIELD: &str = "LEVEL";
pub const DEFAULT_META_FIELD: &str = "META";
pub const DEFAULT_MESSAGE_FIELD: &str = "MESSAGE";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "TIMESTAMP";

/// 池中最多保留的空闲连接数
pub const DEFAULT_POOL_MAX_IDLE: usize = 10;
/// 空闲连接 + 使用中连接的上限
pub const DEFAULT_POOL_MAX_TOTAL: usize = 20;
/// 空闲连接最长保留时间（秒），1 小时
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 3600;
/// 等待可用连接的最长时间（毫秒）
pub const DEFAULT_POOL_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// PostgreSQL 默认端口
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// 事件通道容量
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 每条插入语句绑定的参数个数：level, message, meta, timestamp
pub const INSERT_PARAM_COUNT: usize = 4;
