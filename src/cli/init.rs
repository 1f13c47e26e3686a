use log::{debug, error, info, warn};

use sqlsink::error::Result;
use sqlsink::file_error;
use std::fs;
use std::path::Path;

/// 默认配置内容
pub const DEFAULT_CONFIG: &str = r#"# sqlsink 日志传输配置文件

[logging]
# 诊断日志级别: trace, debug, info, warn, error
level = "info"
# 诊断日志输出文件（不设置则输出到 stderr）
# file = "logs/sqlsink.log"

[transport]
# 数据库后端: sqlite, postgres
backend = "sqlite"
# 数据库地址：SQLite 为数据库文件路径，PostgreSQL 为 host:port
server_node = "logs.db"
user = "sqlsink"
password = "sqlsink"
# 数据库/schema 名（SQLite 主库为 main）
database = "main"
# 日志表名（需事先创建，可用 `sqlsink schema` 生成建表语句）
table = "SYS_LOGS_DEFAULT"
# 只写入该级别的日志（不设置则全部写入）
# level = "error"
# 获取连接与执行插入各自的超时（毫秒）
# timeout_ms = 5000
# 获取连接失败时是否也发出 error 事件
emit_acquisition_errors = false

# 自定义表字段名（未设置的字段使用默认值 LEVEL/META/MESSAGE/TIMESTAMP）
# [transport.fields]
# level = "MYLEVEL"
# message = "SOURCE"
# meta = "METADATA"
# timestamp = "ADDDATE"

[transport.pool]
# 池中最多保留的空闲连接数
max_idle = 10
# 空闲 + 使用中连接数上限
max_total = 20
# 空闲连接保留时间（秒）
idle_timeout_secs = 3600
# 池满或连接失败时获取连接的最长等待时间（毫秒）
connection_timeout_ms = 30000
# 复用空闲连接前是否先探测
ping_check = false
allow_user_switch = false
"#;

/// 生成默认配置文件
pub fn handle_init(output_path: &str, force: bool) -> Result<()> {
    let path = Path::new(output_path);

    info!("Generating configuration file: {output_path}");

    // 检查文件是否已存在
    if path.exists() && !force {
        error!("Configuration file already exists: {output_path}");
        info!("Tip: use --force to overwrite");
        return Err(file_error!(AlreadyExists {
            path: path.to_path_buf(),
        }));
    }

    if path.exists() && force {
        warn!("Overwriting existing configuration file");
    }

    // 创建目录（如果需要）
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        && !parent.exists()
    {
        info!("Creating directory: {}", parent.display());
        fs::create_dir_all(parent).map_err(|e| {
            file_error!(CreateDirectoryFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
    }

    // 写入配置文件
    debug!("Writing configuration file...");
    fs::write(path, DEFAULT_CONFIG).map_err(|e| {
        file_error!(WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })?;

    info!("Configuration file written: {output_path}");
    info!("Next steps:");
    info!("  1. Edit the configuration file: {output_path}");
    info!("  2. Create the log table: sqlsink schema -c {output_path}");
    info!("  3. Validate: sqlsink validate -c {output_path}");
    info!("  4. Deliver logs: sqlsink run -c {output_path} -i logs.jsonl");

    Ok(())
}
