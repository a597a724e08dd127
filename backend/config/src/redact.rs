//! Config redaction: safe-to-print config snapshots for `doctor` and logs.

use serde_json::Value;

use crate::schema::MangoConfig;

const SENSITIVE_KEYS: &[&str] = &["token", "botToken", "secret", "password"];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Redact a config JSON value, masking sensitive fields as `"abcd***"`.
fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Serialize `config` with its secrets masked.
pub fn redact_config(config: &MangoConfig) -> Value {
    redact(&serde_json::to_value(config).unwrap_or(Value::Null))
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 8 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
