use sqlsink::config::Config;
use sqlsink::error::Result;
use sqlsink::schema;

/// 输出与配置字段名一致的建表语句
pub fn handle_schema(cfg: &Config) -> Result<()> {
    let settings = cfg.transport.validate()?;
    let ddl = schema::create_table_sql(
        cfg.transport.backend.dialect(),
        &settings.qualified_table(),
        &settings.fields,
    );
    println!("{ddl}");
    Ok(())
}
