//! r2d2 连接池到传输层接口的适配
//!
//! r2d2 负责连接上限、空闲回收、借出前探测与按需建连；这里只补充
//! `max_idle` 上限，并把所有同步驱动调用放到阻塞线程池中执行。

use super::{ConnectionPool, PooledConnection};
use crate::config::PoolOptions;
use crate::error::BackendError;
use crate::schema::Dialect;
use async_trait::async_trait;
use log::{debug, warn};
use r2d2::ManageConnection;
use std::fmt;
use tokio::runtime::Handle;
use tokio::task;

/// 可写入日志表的 r2d2 后端
pub trait SqlManager: ManageConnection {
    /// 关闭连接时会阻塞当前线程（例如内部持有运行时的同步客户端）
    const BLOCKING_CLOSE: bool = false;

    /// 后端名称 (用于日志记录)
    fn name(&self) -> &'static str;

    fn dialect(&self) -> Dialect;

    /// 执行参数化语句，返回受影响行数
    fn execute(
        conn: &mut Self::Connection,
        sql: &str,
        params: &[String],
    ) -> Result<u64, BackendError>;
}

/// 池中保存的连接，带退役标记
pub struct Slot<C: Send + 'static> {
    // 仅在析构时为 None
    conn: Option<C>,
    retired: bool,
    blocking_close: bool,
}

impl<C: Send + 'static> Slot<C> {
    fn driver(&mut self) -> Result<&mut C, BackendError> {
        self.conn
            .as_mut()
            .ok_or_else(|| BackendError::new("Connection is no longer usable"))
    }
}

impl<C: Send + 'static> fmt::Debug for Slot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("retired", &self.retired)
            .finish_non_exhaustive()
    }
}

impl<C: Send + 'static> Drop for Slot<C> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.blocking_close
            && let Ok(handle) = Handle::try_current()
        {
            handle.spawn_blocking(move || drop(conn));
        }
    }
}

/// 包装后端管理器，使归还时被标记退役的连接直接关闭
pub struct Tracked<M>(M);

impl<M: SqlManager> fmt::Debug for Tracked<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.0.name()).finish()
    }
}

impl<M: SqlManager> ManageConnection for Tracked<M> {
    type Connection = Slot<M::Connection>;
    type Error = M::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let conn = self.0.connect()?;
        Ok(Slot {
            conn: Some(conn),
            retired: false,
            blocking_close: M::BLOCKING_CLOSE,
        })
    }

    fn is_valid(&self, slot: &mut Self::Connection) -> Result<(), Self::Error> {
        match slot.conn.as_mut() {
            Some(conn) => self.0.is_valid(conn),
            None => Ok(()),
        }
    }

    fn has_broken(&self, slot: &mut Self::Connection) -> bool {
        slot.retired
            || slot
                .conn
                .as_mut()
                .is_none_or(|conn| self.0.has_broken(conn))
    }
}

/// 连接池状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// 池中空闲连接数
    pub idle: usize,
    /// 已借出的连接数
    pub in_use: usize,
}

/// 有界连接池
///
/// - `max_total` -> r2d2 `max_size`
/// - `idle_timeout_secs` -> r2d2 `idle_timeout`
/// - `ping_check` -> r2d2 `test_on_check_out`
/// - `connection_timeout_ms` -> r2d2 `connection_timeout`
/// - `max_idle`：归还时空闲连接已达上限则关闭该连接
///
/// `min_idle` 固定为 0，构造时不建立任何连接，地址或凭据错误会在第一次写入时
/// 表现为获取失败。
pub struct ManagedPool<M: SqlManager> {
    pool: r2d2::Pool<Tracked<M>>,
    name: &'static str,
    dialect: Dialect,
    max_idle: usize,
}

impl<M: SqlManager> ManagedPool<M> {
    pub fn new(manager: M, options: &PoolOptions) -> Self {
        let name = manager.name();
        let dialect = manager.dialect();
        if options.allow_user_switch {
            warn!("{name}: allow_user_switch is not supported by this backend, ignoring");
        }
        debug!(
            "{} pool created (max_idle: {}, max_total: {}, idle_timeout: {}s, ping_check: {})",
            name,
            options.max_idle,
            options.max_total,
            options.idle_timeout_secs,
            options.ping_check
        );

        let pool = r2d2::Pool::builder()
            .max_size(u32::try_from(options.max_total).unwrap_or(u32::MAX))
            .min_idle(Some(0))
            .idle_timeout(Some(options.idle_timeout()))
            .connection_timeout(options.connection_timeout())
            .test_on_check_out(options.ping_check)
            .build_unchecked(Tracked(manager));

        Self {
            pool,
            name,
            dialect,
            max_idle: options.max_idle,
        }
    }

    /// 底层 r2d2 连接池
    pub fn inner(&self) -> &r2d2::Pool<Tracked<M>> {
        &self.pool
    }

    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            idle: state.idle_connections as usize,
            in_use: state.connections.saturating_sub(state.idle_connections) as usize,
        }
    }
}

impl<M: SqlManager> fmt::Debug for ManagedPool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedPool")
            .field("backend", &self.name)
            .field("max_idle", &self.max_idle)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<M: SqlManager> ConnectionPool for ManagedPool<M> {
    type Connection = ManagedConnection<M>;

    async fn get_connection(&self) -> Result<Self::Connection, BackendError> {
        let pool = self.pool.clone();
        let conn = task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| BackendError::new(format!("Checkout task failed: {e}")))?
            .map_err(|e| BackendError::new(format!("{}: {}", self.name, e)))?;

        Ok(ManagedConnection {
            conn: Some(conn),
            pool: self.pool.clone(),
            max_idle: self.max_idle,
        })
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// 从 [`ManagedPool`] 借出的连接
///
/// 执行期间连接移入阻塞任务；执行被中途放弃时，该任务在驱动调用返回后
/// 才归还连接，池的连接数上限因此始终成立。
pub struct ManagedConnection<M: SqlManager> {
    conn: Option<r2d2::PooledConnection<Tracked<M>>>,
    pool: r2d2::Pool<Tracked<M>>,
    max_idle: usize,
}

impl<M: SqlManager> fmt::Debug for ManagedConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("attached", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<M: SqlManager> PooledConnection for ManagedConnection<M> {
    async fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, BackendError> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| BackendError::new("Connection is no longer usable"))?;
        let sql = sql.to_string();
        let params = params.to_vec();

        let (conn, result) = task::spawn_blocking(move || {
            let result = conn
                .driver()
                .and_then(|driver| M::execute(driver, &sql, &params));
            (conn, result)
        })
        .await
        .map_err(|e| BackendError::new(format!("Execute task failed: {e}")))?;

        self.conn = Some(conn);
        result
    }

    fn disconnect(mut self) {
        if let Some(mut conn) = self.conn.take() {
            if self.pool.state().idle_connections as usize >= self.max_idle {
                conn.retired = true;
            }
            drop(conn);
        }
    }
}
