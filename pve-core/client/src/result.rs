//! 请求结果
//!
//! PVE 的响应包裹在 `{"data": ..., "errors": ...}` 中。HTTP 状态和 `errors`
//! 是两个独立的信号, 调用方需要同时检查 [`PveResult::is_success_status_code`]
//! 和 [`PveResult::response_in_error`]。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PveError, Result};
use crate::task::Upid;

static NULL: Value = Value::Null;

/// 一次请求的结果, 创建后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct PveResult {
    response: Value,
    status_code: u16,
    reason_phrase: String,
}

impl PveResult {
    pub fn new(response: Value, status_code: u16, reason_phrase: impl Into<String>) -> Self {
        Self {
            response,
            status_code,
            reason_phrase: reason_phrase.into(),
        }
    }

    /// 把原始响应体解码为 JSON 对象; 空响应或非对象内容替换为 `{}`
    pub(crate) fn decode_body(body: &[u8]) -> Value {
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        }
    }

    /// 完整的响应 JSON
    pub fn response(&self) -> &Value {
        &self.response
    }

    pub fn into_response(self) -> Value {
        self.response
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    /// HTTP 状态是否为 2xx
    pub fn is_success_status_code(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// 响应体中是否包含 `errors` 键, 与 HTTP 状态无关
    pub fn response_in_error(&self) -> bool {
        self.response.get("errors").is_some()
    }

    /// HTTP 成功且没有 `errors`
    pub fn is_ok(&self) -> bool {
        self.is_success_status_code() && !self.response_in_error()
    }

    /// 非成功响应转换为 [`PveError::ApiError`], 供类型化接口使用
    pub fn ensure_ok(self) -> Result<Self> {
        if self.is_ok() {
            return Ok(self);
        }
        let message = match self.get_error() {
            errors if errors.is_empty() => self.reason_phrase.clone(),
            errors => errors,
        };
        Err(PveError::ApiError(self.status_code, message))
    }

    /// `data` 字段, 不存在时为 `Value::Null`
    pub fn data(&self) -> &Value {
        self.response.get("data").unwrap_or(&NULL)
    }

    /// 把 `data` 解码为具体类型
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data().clone())
            .map_err(|e| PveError::ParseError(format!("data 解码失败: {}", e)))
    }

    /// 读取 `data` 中的字符串字段
    pub fn get_str(&self, key: &str) -> Result<&str> {
        let value = self.field(key)?;
        value.as_str().ok_or_else(|| mismatch(key, "string", value))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        let value = self.field(key)?;
        value.as_i64().ok_or_else(|| mismatch(key, "integer", value))
    }

    /// 读取布尔字段, PVE 常用 `0` / `1` 表示布尔值, 这里一并接受
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.field(key)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
            _ => Err(mismatch(key, "boolean", value)),
        }
    }

    pub fn get_array(&self, key: &str) -> Result<&Vec<Value>> {
        let value = self.field(key)?;
        value.as_array().ok_or_else(|| mismatch(key, "array", value))
    }

    pub fn get_object(&self, key: &str) -> Result<&Map<String, Value>> {
        let value = self.field(key)?;
        value.as_object().ok_or_else(|| mismatch(key, "object", value))
    }

    /// 当 `data` 本身是字符串时返回它, 例如异步操作返回的 UPID
    pub fn data_str(&self) -> Result<&str> {
        self.data()
            .as_str()
            .ok_or_else(|| mismatch("data", "string", self.data()))
    }

    /// 把 `data` 解析为任务 UPID
    pub fn upid(&self) -> Result<Upid> {
        self.data_str()?.parse()
    }

    /// 把所有错误项格式化为 `key : value`, 每行一项
    pub fn get_error(&self) -> String {
        let mut lines = Vec::new();
        match self.response.get("errors") {
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    lines.push(format!("{} : {}", key, display_value(value)));
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => lines.push(display_value(other)),
        }
        lines.join("\n")
    }

    /// 缩进格式的 JSON, 便于调试
    pub fn to_json(&self) -> String {
        to_json(&self.response).unwrap_or_default()
    }

    fn field(&self, key: &str) -> Result<&Value> {
        self.data()
            .get(key)
            .ok_or_else(|| PveError::TypeMismatch(format!("data 中缺少字段 '{}'", key)))
    }
}

/// 把任意可序列化对象转换为缩进格式的 JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PveError::ParseError(e.to_string()))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn mismatch(key: &str, expected: &str, found: &Value) -> PveError {
    let kind = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    PveError::TypeMismatch(format!("字段 '{}' 期望 {}, 实际为 {}", key, expected, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_in_error_is_independent_of_status() {
        let failed = PveResult::new(json!({ "errors": { "foo": "bad" } }), 200, "OK");
        assert!(failed.is_success_status_code());
        assert!(failed.response_in_error());
        assert!(!failed.is_ok());

        let ok = PveResult::new(json!({ "data": { "vmid": 100 } }), 500, "Internal Server Error");
        assert!(!ok.is_success_status_code());
        assert!(!ok.response_in_error());
        assert!(!ok.is_ok());
    }

    #[test]
    fn test_decode_body_substitutes_empty_object() {
        assert_eq!(PveResult::decode_body(b""), json!({}));
        assert_eq!(PveResult::decode_body(b"not json"), json!({}));
        assert_eq!(PveResult::decode_body(b"[1,2]"), json!({}));
        assert_eq!(PveResult::decode_body(br#"{"data":null}"#), json!({ "data": null }));
    }

    #[test]
    fn test_get_error_lines() {
        let result = PveResult::new(
            json!({ "errors": { "vmid": "invalid format", "memory": 16 } }),
            400,
            "Parameter verification failed.",
        );
        let text = result.get_error();
        assert!(text.contains("vmid : invalid format"));
        assert!(text.contains("memory : 16"));
        assert_eq!(text.lines().count(), 2);

        let clean = PveResult::new(json!({ "data": 1 }), 200, "OK");
        assert_eq!(clean.get_error(), "");
    }

    #[test]
    fn test_typed_accessors() {
        let result = PveResult::new(
            json!({
                "data": { "status": "running", "pid": 1234, "ha": 0, "tags": [], "nics": {} }
            }),
            200,
            "OK",
        );
        assert_eq!(result.get_str("status").unwrap(), "running");
        assert_eq!(result.get_i64("pid").unwrap(), 1234);
        assert!(!result.get_bool("ha").unwrap());
        assert!(result.get_array("tags").unwrap().is_empty());
        assert!(result.get_object("nics").unwrap().is_empty());

        assert!(matches!(result.get_i64("status"), Err(PveError::TypeMismatch(_))));
        assert!(matches!(result.get_str("missing"), Err(PveError::TypeMismatch(_))));
    }

    #[test]
    fn test_upid_from_data() {
        let result = PveResult::new(
            json!({ "data": "UPID:pve1:00001234:0000ABCD:65A1B2C3:qmstart:100:root@pam:" }),
            200,
            "OK",
        );
        let upid = result.upid().unwrap();
        assert_eq!(upid.node, "pve1");
        assert_eq!(upid.task_type, "qmstart");

        let not_a_task = PveResult::new(json!({ "data": { "a": 1 } }), 200, "OK");
        assert!(matches!(not_a_task.upid(), Err(PveError::TypeMismatch(_))));
    }

    #[test]
    fn test_data_as_typed() {
        #[derive(serde::Deserialize)]
        struct Version {
            version: String,
        }
        let result = PveResult::new(json!({ "data": { "version": "8.1.4" } }), 200, "OK");
        let version: Version = result.data_as().unwrap();
        assert_eq!(version.version, "8.1.4");
        assert!(result.data_as::<Vec<String>>().is_err());
    }

    #[test]
    fn test_ensure_ok() {
        let ok = PveResult::new(json!({ "data": null }), 200, "OK");
        assert!(ok.ensure_ok().is_ok());

        let soft = PveResult::new(json!({ "errors": { "foo": "bad" } }), 200, "OK");
        match soft.ensure_ok() {
            Err(PveError::ApiError(200, msg)) => assert_eq!(msg, "foo : bad"),
            other => panic!("unexpected: {:?}", other),
        }

        let hard = PveResult::new(json!({}), 401, "Unauthorized");
        match hard.ensure_ok() {
            Err(PveError::ApiError(401, msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_to_json_is_indented() {
        let result = PveResult::new(json!({ "data": { "a": 1 } }), 200, "OK");
        assert!(result.to_json().contains("\n  "));
    }
}
