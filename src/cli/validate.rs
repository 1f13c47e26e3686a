use log::info;

use sqlsink::config::Config;
use sqlsink::error::Result;

/// 验证配置文件并输出解析结果
pub fn handle_validate(cfg: &Config) -> Result<()> {
    let settings = cfg.transport.validate()?;

    info!("Backend: {}", cfg.transport.backend);
    info!("Server: {}", settings.connection.server_node);
    info!("User: {}", settings.connection.user);
    info!("Target table: {}", settings.qualified_table());
    info!(
        "Level filter: {}",
        settings.level_filter.as_deref().unwrap_or("none (all levels)")
    );
    info!(
        "Field names - level: {}, message: {}, meta: {}, timestamp: {}",
        settings.fields.level, settings.fields.message, settings.fields.meta, settings.fields.timestamp
    );
    info!(
        "Pool - max_idle: {}, max_total: {}, idle_timeout: {}s, ping_check: {}",
        settings.pool.max_idle,
        settings.pool.max_total,
        settings.pool.idle_timeout_secs,
        if settings.pool.ping_check { "yes" } else { "no" }
    );
    match settings.timeout {
        Some(timeout) => info!("Timeout: {} ms", timeout.as_millis()),
        None => info!("Timeout: none"),
    }
    info!(
        "Acquisition failures emitted as error events: {}",
        if settings.emit_acquisition_errors { "yes" } else { "no" }
    );

    Ok(())
}
