/// Pool 模块 - 传输层与数据库之间的接口
///
/// 传输层只依赖两个能力：
/// - `ConnectionPool::get_connection` 异步获取连接
/// - `PooledConnection::execute` / `disconnect` 执行插入并归还连接
///
/// 连接的上限、空闲回收与借出前探测由 r2d2 负责。
///
/// 支持的后端:
/// - SQLite (feature `sqlite`)
/// - PostgreSQL (feature `postgres`)
use crate::error::BackendError;
use crate::schema::Dialect;
use async_trait::async_trait;

mod managed;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use managed::{ManagedConnection, ManagedPool, PoolState, Slot, SqlManager, Tracked};
#[cfg(feature = "postgres")]
pub use self::postgres::{PostgresManager, PostgresPool};
#[cfg(feature = "sqlite")]
pub use self::sqlite::{SqliteManager, SqlitePool};

/// 连接池 trait - 传输层在构造时获得唯一的池句柄，之后只通过它获取连接
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection: PooledConnection;

    /// 获取一个连接；池已满时等待其他连接归还
    async fn get_connection(&self) -> Result<Self::Connection, BackendError>;

    /// 后端使用的参数占位符风格
    fn dialect(&self) -> Dialect;
}

/// 池化连接 - 仅在一次插入期间持有
#[async_trait]
pub trait PooledConnection: Send + 'static {
    /// 执行参数化语句，返回受影响行数
    async fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, BackendError>;

    /// 将连接归还给连接池（按值消费，保证最多归还一次）
    fn disconnect(self);
}
