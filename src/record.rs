use crate::error::RecordError;
use serde_json::{Map, Value};

/// 单条日志记录：级别、消息，以及其余任意元数据字段
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: String,
    pub message: String,
    /// 除 level/message 之外的全部字段，写入时序列化为一个 JSON 文本
    pub meta: Map<String, Value>,
}

impl LogRecord {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            meta: Map::new(),
        }
    }

    /// 追加一个元数据字段
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// 从 JSON 对象拆出 level 与 message，其余字段作为元数据
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut fields) = value else {
            return Err(RecordError::NotAnObject(value.to_string()));
        };

        let level = match fields.remove("level") {
            Some(Value::String(level)) => level,
            _ => return Err(RecordError::MissingLevel),
        };

        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            level,
            message,
            meta: fields,
        })
    }

    /// 解析一行 JSON 文本
    pub fn from_json_str(line: &str) -> Result<Self, RecordError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| RecordError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// 元数据的 JSON 文本（无元数据时为 `{}`）
    pub fn meta_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_splits_metadata() {
        let record = LogRecord::from_value(json!({
            "level": "info",
            "message": "hello",
            "user": "alice",
        }))
        .unwrap();

        assert_eq!(record.level, "info");
        assert_eq!(record.message, "hello");
        assert_eq!(record.meta_json().unwrap(), r#"{"user":"alice"}"#);
    }

    #[test]
    fn test_empty_metadata_serializes_to_empty_object() {
        let record = LogRecord::new("warn", "x");
        assert_eq!(record.meta_json().unwrap(), "{}");
    }

    #[test]
    fn test_missing_level_rejected() {
        let err = LogRecord::from_value(json!({ "message": "x" })).unwrap_err();
        assert!(matches!(err, RecordError::MissingLevel));

        let err = LogRecord::from_value(json!({ "level": 3, "message": "x" })).unwrap_err();
        assert!(matches!(err, RecordError::MissingLevel));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = LogRecord::from_value(json!(["info", "x"])).unwrap_err();
        assert!(matches!(err, RecordError::NotAnObject(_)));
    }

    #[test]
    fn test_non_string_message_kept_as_json_text() {
        let record = LogRecord::from_value(json!({ "level": "info", "message": {"a": 1} })).unwrap();
        assert_eq!(record.message, r#"{"a":1}"#);

        let record = LogRecord::from_value(json!({ "level": "info" })).unwrap();
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(matches!(
            LogRecord::from_json_str("{not json"),
            Err(RecordError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_with_meta_builder() {
        let record = LogRecord::new("error", "boom")
            .with_meta("type", "demo")
            .with_meta("code", 42);
        assert_eq!(record.meta_json().unwrap(), r#"{"code":42,"type":"demo"}"#);
    }
}
