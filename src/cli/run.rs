use log::{debug, info, warn};
use sqlsink::config::{Backend, Config};
use sqlsink::error::{Error, FileError, Result};
use sqlsink::pool::ConnectionPool;
use sqlsink::{LogCallback, LogRecord, LogSinkTransport, TransportError, TransportEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

/// 输入结束后等待事件监视器输出剩余事件的上限
const MONITOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 读取 JSON Lines 日志记录并写入配置的日志表
pub async fn handle_run(cfg: &Config, input: Option<&str>) -> Result<()> {
    info!("Starting log delivery ({} backend)", cfg.transport.backend);
    match cfg.transport.backend {
        Backend::Sqlite => run_sqlite(cfg, input).await,
        Backend::Postgres => run_postgres(cfg, input).await,
    }
}

#[cfg(feature = "sqlite")]
async fn run_sqlite(cfg: &Config, input: Option<&str>) -> Result<()> {
    let transport = LogSinkTransport::new(&cfg.transport, sqlsink::pool::SqlitePool::create)?;
    deliver(transport, input).await
}

#[cfg(not(feature = "sqlite"))]
async fn run_sqlite(_cfg: &Config, _input: Option<&str>) -> Result<()> {
    Err(sqlsink::ConfigError::BackendDisabled("sqlite".to_string()).into())
}

#[cfg(feature = "postgres")]
async fn run_postgres(cfg: &Config, input: Option<&str>) -> Result<()> {
    let transport = LogSinkTransport::new(&cfg.transport, sqlsink::pool::PostgresPool::create)?;
    deliver(transport, input).await
}

#[cfg(not(feature = "postgres"))]
async fn run_postgres(_cfg: &Config, _input: Option<&str>) -> Result<()> {
    Err(sqlsink::ConfigError::BackendDisabled("postgres".to_string()).into())
}

/// 打开输入：文件或标准输入
async fn open_input(input: Option<&str>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                Error::File(FileError::ReadFailed {
                    path: path.into(),
                    reason: e.to_string(),
                })
            })?;
            info!("Reading log records from {path}");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading log records from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// 消费生命周期事件；失败记录以 warn 级别输出
fn spawn_event_monitor(mut events: broadcast::Receiver<TransportEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TransportEvent::Error(err)) => warn!("Delivery failed: {err}"),
                Ok(TransportEvent::Logged(record)) => {
                    debug!("Logged [{}] {}", record.level, record.message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event monitor lagged, {skipped} event(s) skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// 一次输入的投递结果
#[derive(Debug, Default)]
struct RunSummary {
    /// 无法解析而跳过的行数
    skipped: usize,
    first_error: Option<TransportError>,
}

/// 逐行解析并投递，等待所有回调完成
///
/// 同时在途的投递不超过 `max_in_flight`：许可在 `log` 之前获取，随回调一起释放；
/// 被级别过滤的记录丢弃回调，许可随之归还。
async fn deliver_lines<P, R>(
    transport: &LogSinkTransport<P>,
    reader: R,
    max_in_flight: usize,
) -> Result<RunSummary>
where
    P: ConnectionPool,
    R: AsyncBufRead + Unpin,
{
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut lines = reader.lines();

    let (tx, mut rx) = mpsc::unbounded_channel::<std::result::Result<(), TransportError>>();
    let mut line_no = 0usize;
    let mut summary = RunSummary::default();

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match LogRecord::from_json_str(line) {
            Ok(record) => {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let tx = tx.clone();
                let callback: LogCallback = Box::new(move |outcome| {
                    let _ = tx.send(outcome);
                    drop(permit);
                });
                transport.log(record, Some(callback));
            }
            Err(e) => {
                warn!("Skipping line {line_no}: {e}");
                summary.skipped += 1;
            }
        }
    }

    // 所有回调执行或被丢弃后通道关闭
    drop(tx);
    while let Some(outcome) = rx.recv().await {
        if let Err(err) = outcome
            && summary.first_error.is_none()
        {
            summary.first_error = Some(err);
        }
    }
    Ok(summary)
}

async fn deliver<P: ConnectionPool>(
    transport: LogSinkTransport<P>,
    input: Option<&str>,
) -> Result<()> {
    // 记录总体开始时间
    let start = Instant::now();

    let monitor = spawn_event_monitor(transport.subscribe());
    let reader = open_input(input).await?;
    let max_in_flight = transport.settings().pool.max_total;
    let summary = deliver_lines(&transport, reader, max_in_flight).await?;

    let stats = transport.stats();
    let table = transport.settings().qualified_table();

    // 最后一个事件发送端释放后，监视器输出剩余事件并退出
    drop(transport);
    if tokio::time::timeout(MONITOR_DRAIN_TIMEOUT, monitor)
        .await
        .is_err()
    {
        warn!(
            "Event monitor still running after {}s, remaining events dropped",
            MONITOR_DRAIN_TIMEOUT.as_secs()
        );
    }

    let elapsed = start.elapsed().as_secs_f64();
    let skipped = summary.skipped;
    info!(
        "Delivery stats: logged: {}, failed: {}, filtered: {}, skipped: {}",
        stats.logged, stats.failed, stats.filtered, skipped
    );

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("✓ Log Delivery Completed");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("  Table:     {table}");
    eprintln!("  Logged:    {}", stats.logged);
    eprintln!("  Failed:    {}", stats.failed);
    eprintln!("  Filtered:  {}", stats.filtered);
    eprintln!("  Skipped:   {skipped}");
    eprintln!("  Elapsed:   {elapsed:.3} seconds");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    // 一条都没写入时以首个错误退出
    match summary.first_error {
        Some(err) if stats.logged == 0 => Err(err.into()),
        _ => Ok(()),
    }
}
