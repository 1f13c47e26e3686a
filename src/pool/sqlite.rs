use super::managed::{ManagedPool, SqlManager};
use crate::config::{ConnectionParams, PoolOptions};
use crate::error::BackendError;
use crate::schema::Dialect;
use log::debug;
use r2d2::ManageConnection;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use std::time::Duration;

/// 并发写入时等待数据库锁的时长
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite 连接管理器
///
/// `server_node` 为数据库文件路径；用户名与密码对 SQLite 无意义，仅用于统一的配置校验。
/// 不会自动创建数据库文件，日志表需事先建好。
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
}

impl SqliteManager {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        debug!("Opening SQLite database: {}", self.path);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, _conn: &mut Connection) -> bool {
        false
    }
}

impl SqlManager for SqliteManager {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Question
    }

    fn execute(conn: &mut Connection, sql: &str, params: &[String]) -> Result<u64, BackendError> {
        let rows = conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(|e| BackendError::new(e.to_string()))?;
        Ok(rows as u64)
    }
}

/// SQLite 连接池
pub type SqlitePool = ManagedPool<SqliteManager>;

impl ManagedPool<SqliteManager> {
    /// 连接池工厂，签名与 `LogSinkTransport::new` 的参数一致
    pub fn create(params: &ConnectionParams, options: &PoolOptions) -> Self {
        Self::new(SqliteManager::new(params.server_node.clone()), options)
    }
}
