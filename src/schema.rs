//! 日志表结构映射
//!
//! 字段名来自配置，插入语句按解析后的字段名显式列出目标列，
//! 因此表的物理列顺序不影响写入结果。

use crate::config::FieldNamesConfig;
use crate::constants::{
    DEFAULT_LEVEL_FIELD, DEFAULT_MESSAGE_FIELD, DEFAULT_META_FIELD, DEFAULT_TIMESTAMP_FIELD,
    INSERT_PARAM_COUNT,
};
use crate::error::ConfigError;

/// 解析后的字段名映射，四个字段均为非空的合法标识符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub level: String,
    pub meta: String,
    pub message: String,
    pub timestamp: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL_FIELD.to_string(),
            meta: DEFAULT_META_FIELD.to_string(),
            message: DEFAULT_MESSAGE_FIELD.to_string(),
            timestamp: DEFAULT_TIMESTAMP_FIELD.to_string(),
        }
    }
}

impl FieldNames {
    /// 合并用户覆盖与默认值：只替换提供的键，未提供的键回退到默认字段名
    pub fn resolve(overrides: Option<&FieldNamesConfig>) -> Result<Self, ConfigError> {
        let mut names = Self::default();
        let Some(overrides) = overrides else {
            return Ok(names);
        };

        let slots = [
            ("transport.fields.level", &overrides.level, &mut names.level),
            ("transport.fields.meta", &overrides.meta, &mut names.meta),
            (
                "transport.fields.message",
                &overrides.message,
                &mut names.message,
            ),
            (
                "transport.fields.timestamp",
                &overrides.timestamp,
                &mut names.timestamp,
            ),
        ];

        for (field, supplied, slot) in slots {
            if let Some(value) = supplied {
                check_identifier(field, value)?;
                slot.clone_from(value);
            }
        }

        Ok(names)
    }

    /// 按插入参数顺序返回列名：level, message, meta, timestamp
    pub fn insert_columns(&self) -> [&str; INSERT_PARAM_COUNT] {
        [
            self.level.as_str(),
            self.message.as_str(),
            self.meta.as_str(),
            self.timestamp.as_str(),
        ]
    }
}

/// 校验拼接进 SQL 文本的标识符
pub fn check_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    if is_plain_identifier(value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Must be a plain SQL identifier ([A-Za-z_][A-Za-z0-9_$]*)".to_string(),
    })
}

fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// 参数占位符风格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?` 占位符 (SQLite, HANA, MySQL)
    Question,
    /// `$1..$n` 占位符 (PostgreSQL)
    Dollar,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Question => "?".to_string(),
            Dialect::Dollar => format!("${index}"),
        }
    }

    fn identity_column(self) -> &'static str {
        match self {
            Dialect::Question => "ID INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Dollar => "ID INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY",
        }
    }

    fn timestamp_type(self) -> &'static str {
        match self {
            Dialect::Question => "TEXT",
            Dialect::Dollar => "TIMESTAMPTZ",
        }
    }
}

/// 生成单行 INSERT 语句
pub fn insert_sql(dialect: Dialect, qualified_table: &str, fields: &FieldNames) -> String {
    let columns = fields.insert_columns().join(", ");
    let placeholders = (1..=INSERT_PARAM_COUNT)
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");

    let values = match dialect {
        Dialect::Question => placeholders,
        // 时间戳以 ISO-8601 文本绑定，由服务端转换为 TIMESTAMPTZ
        Dialect::Dollar => placeholders.replacen(
            &format!("${INSERT_PARAM_COUNT}"),
            &format!("CAST(${INSERT_PARAM_COUNT}::text AS TIMESTAMPTZ)"),
            1,
        ),
    };

    format!("INSERT INTO {qualified_table} ({columns}) VALUES ({values})")
}

/// 生成建议的建表语句（传输层从不执行该语句）
pub fn create_table_sql(dialect: Dialect, qualified_table: &str, fields: &FieldNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {},\n    {} VARCHAR(16) NOT NULL,\n    {} VARCHAR(2048) NOT NULL,\n    {} VARCHAR(2048) NOT NULL,\n    {} {} NOT NULL\n);",
        qualified_table,
        dialect.identity_column(),
        fields.level,
        fields.message,
        fields.meta,
        fields.timestamp,
        dialect.timestamp_type(),
    )
}
