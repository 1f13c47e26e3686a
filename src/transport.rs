/// 日志传输层 - 将日志记录写入数据库表
///
/// 调用 `log` 后立即返回，真正的写入在 Tokio 任务中完成：
/// 获取连接 -> 执行参数化 INSERT -> 归还连接 -> 回调 -> 发出生命周期事件。
/// 并发调用之间不保证写入顺序。
use crate::config::{ConnectionParams, PoolOptions, TransportConfig, TransportSettings};
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::error::{ConfigError, TimeoutStage, TransportError};
use crate::events::{EventBus, TransportEvent};
use crate::pool::{ConnectionPool, PooledConnection};
use crate::record::LogRecord;
use crate::schema;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, trace};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};

/// 写入完成回调：`Ok(())` 表示已写入，`Err` 携带失败原因
pub type LogCallback = Box<dyn FnOnce(Result<(), TransportError>) + Send + 'static>;

/// 投递统计信息
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    /// 成功写入的记录数
    pub logged: usize,
    /// 获取连接或执行失败的记录数
    pub failed: usize,
    /// 被级别过滤丢弃的记录数
    pub filtered: usize,
}

impl DeliveryStats {
    pub fn total(&self) -> usize {
        self.logged + self.failed + self.filtered
    }
}

#[derive(Debug, Default)]
struct Counters {
    logged: AtomicUsize,
    failed: AtomicUsize,
    filtered: AtomicUsize,
}

struct Inner<P: ConnectionPool> {
    settings: TransportSettings,
    statement: String,
    pool: P,
    events: EventBus,
    runtime: Handle,
    counters: Counters,
}

/// 数据库日志传输层
///
/// 在构造时通过工厂创建唯一的连接池句柄，生命周期内不会重建或关闭。
/// 克隆得到的实例共享同一个连接池与事件总线。
pub struct LogSinkTransport<P: ConnectionPool> {
    inner: Arc<Inner<P>>,
}

impl<P: ConnectionPool> Clone for LogSinkTransport<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ConnectionPool> fmt::Debug for LogSinkTransport<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSinkTransport")
            .field("table", &self.inner.settings.qualified_table())
            .field("level_filter", &self.inner.settings.level_filter)
            .field("statement", &self.inner.statement)
            .finish_non_exhaustive()
    }
}

impl<P: ConnectionPool> LogSinkTransport<P> {
    /// 校验配置并创建传输层
    ///
    /// 配置无效时直接失败，不会调用连接池工厂。连接池不在此处探测可用性，
    /// 地址或凭据错误会在第一次写入时以获取连接失败的形式出现。
    /// 必须在 Tokio 运行时内调用。
    pub fn new<F>(config: &TransportConfig, factory: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&ConnectionParams, &PoolOptions) -> P,
    {
        let settings = config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let pool = factory(&settings.connection, &settings.pool);
        let statement =
            schema::insert_sql(pool.dialect(), &settings.qualified_table(), &settings.fields);

        info!(
            "Log sink transport ready: {} (level filter: {})",
            settings.qualified_table(),
            settings.level_filter.as_deref().unwrap_or("none")
        );
        debug!("Insert statement: {statement}");

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                statement,
                pool,
                events: EventBus::new(EVENT_CHANNEL_CAPACITY),
                runtime,
                counters: Counters::default(),
            }),
        })
    }

    /// 写入一条日志记录
    ///
    /// 不会阻塞也不会返回错误。未通过级别过滤的记录被直接丢弃：
    /// 不调用回调、不发出事件、不访问连接池。其余记录恰好触发一次回调。
    pub fn log(&self, record: LogRecord, callback: Option<LogCallback>) {
        if !self.inner.settings.accepts(&record.level) {
            self.inner.counters.filtered.fetch_add(1, Ordering::Relaxed);
            trace!("Record filtered out (level: {})", record.level);
            return;
        }

        let callback: LogCallback = match callback {
            Some(callback) => callback,
            None => Box::new(|_| {}),
        };
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.deliver(record).await;
            callback(outcome);
        });
    }

    /// 写入一条记录并等待结果；被级别过滤时返回 `None`
    pub async fn log_and_wait(&self, record: LogRecord) -> Option<Result<(), TransportError>> {
        if !self.inner.settings.accepts(&record.level) {
            self.inner.counters.filtered.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let (tx, rx) = oneshot::channel();
        let callback: LogCallback = Box::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        self.log(record, Some(callback));

        Some(rx.await.unwrap_or_else(|_| {
            Err(TransportError::Execution {
                table: self.inner.settings.qualified_table(),
                reason: "Delivery task was aborted".to_string(),
            })
        }))
    }

    /// 订阅生命周期事件
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.inner.settings
    }

    /// 运行期使用的 INSERT 语句
    pub fn statement(&self) -> &str {
        &self.inner.statement
    }

    pub fn pool(&self) -> &P {
        &self.inner.pool
    }

    /// 获取投递统计信息的快照
    pub fn stats(&self) -> DeliveryStats {
        let counters = &self.inner.counters;
        DeliveryStats {
            logged: counters.logged.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            filtered: counters.filtered.load(Ordering::Relaxed),
        }
    }
}

impl<P: ConnectionPool> Inner<P> {
    async fn deliver(&self, record: LogRecord) -> Result<(), TransportError> {
        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!("Connection acquisition failed: {err}");
                if self.settings.emit_acquisition_errors {
                    self.emit(TransportEvent::Error(err.clone()));
                }
                return Err(err);
            }
        };

        let result = self.insert(&mut conn, &record).await;
        conn.disconnect();

        match result {
            Ok(rows) => {
                self.counters.logged.fetch_add(1, Ordering::Relaxed);
                trace!("Inserted log record ({rows} row(s))");
                self.emit(TransportEvent::Logged(record));
                Ok(())
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!("Insert failed: {err}");
                self.emit(TransportEvent::Error(err.clone()));
                Err(err)
            }
        }
    }

    async fn acquire(&self) -> Result<P::Connection, TransportError> {
        let acquired = with_deadline(
            self.settings.timeout,
            TimeoutStage::Acquire,
            self.pool.get_connection(),
        )
        .await?;
        acquired.map_err(|e| TransportError::Acquisition {
            reason: e.to_string(),
        })
    }

    async fn insert(
        &self,
        conn: &mut P::Connection,
        record: &LogRecord,
    ) -> Result<u64, TransportError> {
        let meta = record
            .meta_json()
            .map_err(|e| TransportError::Serialization {
                reason: e.to_string(),
            })?;
        let params = [
            record.level.clone(),
            record.message.clone(),
            meta,
            current_timestamp(),
        ];

        let executed = with_deadline(
            self.settings.timeout,
            TimeoutStage::Execute,
            conn.execute(&self.statement, &params),
        )
        .await?;
        executed.map_err(|e| TransportError::Execution {
            table: self.settings.qualified_table(),
            reason: e.to_string(),
        })
    }

    fn emit(&self, event: TransportEvent) {
        self.events.emit_deferred(&self.runtime, event);
    }
}

/// 对挂起点施加可选的超时
async fn with_deadline<F: Future>(
    limit: Option<Duration>,
    stage: TimeoutStage,
    fut: F,
) -> Result<F::Output, TransportError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout {
                stage,
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        None => Ok(fut.await),
    }
}

/// 当前 UTC 时间的 ISO-8601 文本，精确到毫秒，例如 `2024-05-01T08:30:00.123Z`
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_current_timestamp_format() {
        let ts = current_timestamp();
        assert!(ts.ends_with('Z'), "{ts}");
        assert_eq!(ts.len(), "2024-05-01T08:30:00.123Z".len());
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_delivery_stats_total() {
        let stats = DeliveryStats {
            logged: 3,
            failed: 1,
            filtered: 2,
        };
        assert_eq!(stats.total(), 6);
    }

    #[tokio::test]
    async fn test_deadline_elapsed() {
        let result = with_deadline(
            Some(Duration::from_millis(10)),
            TimeoutStage::Execute,
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(
            result,
            Err(TransportError::Timeout {
                stage: TimeoutStage::Execute,
                timeout_ms: 10,
            })
        );
    }

    #[tokio::test]
    async fn test_no_deadline_passes_through() {
        let result = with_deadline(None, TimeoutStage::Acquire, async { 7 }).await;
        assert_eq!(result, Ok(7));
    }
}
