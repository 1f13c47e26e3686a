use super::managed::{ManagedPool, SqlManager};
use crate::config::{ConnectionParams, PoolOptions};
use crate::constants::DEFAULT_POSTGRES_PORT;
use crate::error::BackendError;
use crate::schema::Dialect;
use log::debug;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls};
use r2d2_postgres::PostgresConnectionManager;

/// PostgreSQL 连接管理器
///
/// `server_node` 形如 `host` 或 `host:port`；`database` 配置项对应 schema，
/// 连接的数据库名沿用 PostgreSQL 默认规则（与用户名相同）。
pub type PostgresManager = PostgresConnectionManager<NoTls>;

fn manager(params: &ConnectionParams) -> PostgresManager {
    let (host, port) = split_server_node(&params.server_node);
    debug!("PostgreSQL target: {host}:{port}");
    let mut config = Config::new();
    config
        .host(&host)
        .port(port)
        .user(&params.user)
        .password(&params.password)
        .application_name("sqlsink");
    PostgresConnectionManager::new(config, NoTls)
}

/// 拆分 `host:port`，端口缺失或无法解析时使用默认端口
fn split_server_node(server_node: &str) -> (String, u16) {
    match server_node.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (server_node.to_string(), DEFAULT_POSTGRES_PORT),
        },
        _ => (server_node.to_string(), DEFAULT_POSTGRES_PORT),
    }
}

impl SqlManager for PostgresManager {
    // 同步客户端析构时会阻塞等待后台连接任务
    const BLOCKING_CLOSE: bool = true;

    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Dollar
    }

    fn execute(conn: &mut Client, sql: &str, params: &[String]) -> Result<u64, BackendError> {
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        conn.execute(sql, &refs)
            .map_err(|e| BackendError::new(e.to_string()))
    }
}

/// PostgreSQL 连接池
pub type PostgresPool = ManagedPool<PostgresManager>;

impl ManagedPool<PostgresManager> {
    /// 连接池工厂，签名与 `LogSinkTransport::new` 的参数一致
    pub fn create(params: &ConnectionParams, options: &PoolOptions) -> Self {
        Self::new(manager(params), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server_node() {
        assert_eq!(split_server_node("db:6543"), ("db".to_string(), 6543));
        assert_eq!(split_server_node("db"), ("db".to_string(), 5432));
        assert_eq!(split_server_node("db:abc"), ("db:abc".to_string(), 5432));
    }
}
