//! Config show subcommand
//!
//! Displays the resolved configuration in table or JSON format.
//! Uses serde serialization to automatically include all Config fields.

use anyhow::{Result, anyhow};
use bootgate_core::Config;
use bootgate_core::config::schema::is_all_interfaces;
use comfy_table::{Cell, Color, Table};
use serde_json::{Map, Value};

/// Substrings marking environment entries whose values are masked
const SENSITIVE_MARKERS: &[&str] = &["TOKEN", "SECRET", "PASSWORD", "API_KEY", "ACCESS_KEY"];

/// Keys holding bind hosts, highlighted by exposure
const HOST_KEYS: &[&str] = &["backend.host"];

/// Show the resolved configuration
///
/// Nested sections are flattened into dotted keys. Environment values that
/// look like credentials are masked in both formats.
pub fn cmd_config_show(config: &Config, json: bool) -> Result<i32> {
    let mut value = serde_json::to_value(config)?;
    mask_sensitive_env(&mut value);

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(0);
    }

    let Value::Object(obj) = value else {
        return Err(anyhow!("Config did not serialize to an object"));
    };

    let mut rows = Vec::new();
    flatten("", &obj, &mut rows);

    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);
    for (key, val) in &rows {
        let cell = apply_cell_styling(key, val, format_value(val));
        table.add_row(vec![Cell::new(key), cell]);
    }
    println!("{table}");

    Ok(0)
}

/// Collect `(dotted.key, leaf)` pairs; maps of strings stay as one row
fn flatten(prefix: &str, obj: &Map<String, Value>, rows: &mut Vec<(String, Value)>) {
    for (key, val) in obj {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) if !inner.is_empty() && !is_string_map(inner) => {
                flatten(&full_key, inner, rows)
            }
            _ => rows.push((full_key, val.clone())),
        }
    }
}

fn is_string_map(obj: &Map<String, Value>) -> bool {
    obj.values().all(Value::is_string)
}

/// Format a JSON value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "(not set)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format_array(arr),
        Value::Object(obj) if obj.is_empty() => "(none)".to_string(),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn format_array(arr: &[Value]) -> String {
    if arr.is_empty() {
        return "(none)".to_string();
    }

    arr.iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Highlight bind hosts by exposure
fn apply_cell_styling(key: &str, value: &Value, display_value: String) -> Cell {
    let Some(host) = value.as_str().filter(|_| HOST_KEYS.contains(&key)) else {
        return Cell::new(display_value);
    };

    if is_all_interfaces(host) {
        Cell::new(display_value).fg(Color::Yellow)
    } else if matches!(host, "127.0.0.1" | "::1" | "localhost") {
        Cell::new(display_value).fg(Color::Green)
    } else {
        Cell::new(display_value)
    }
}

fn is_sensitive(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Mask credential-like values under `backend.env` and `worker.env`
fn mask_sensitive_env(value: &mut Value) {
    for section in ["backend", "worker"] {
        let Some(Value::Object(env)) = value.pointer_mut(&format!("/{section}/env")) else {
            continue;
        };
        for (key, val) in env.iter_mut() {
            if is_sensitive(key) && val.as_str().is_some_and(|s| !s.is_empty()) {
                *val = Value::String("********".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_uses_dotted_keys() {
        let value = serde_json::to_value(Config::default()).unwrap();
        let mut rows = Vec::new();
        flatten("", value.as_object().unwrap(), &mut rows);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();

        assert!(keys.contains(&"backend.port"));
        assert!(keys.contains(&"readiness.interval"));
        assert!(keys.contains(&"storage.mappings"));
        assert!(keys.contains(&"diagnostics.tail_lines"));
    }

    #[test]
    fn test_format_value_variants() {
        assert_eq!(format_value(&Value::Null), "(not set)");
        assert_eq!(format_value(&serde_json::json!(8188)), "8188");
        assert_eq!(format_value(&serde_json::json!(["-u", "handler.py"])), "-u handler.py");
        assert_eq!(format_value(&serde_json::json!([])), "(none)");
        assert_eq!(format_value(&serde_json::json!({})), "(none)");
        assert_eq!(format_value(&serde_json::json!({"A": "1"})), "A=1");
    }

    #[test]
    fn test_env_secrets_are_masked() {
        let mut config = Config::default();
        config
            .worker
            .env
            .insert("RUNPOD_API_KEY".to_string(), "rp_abc".to_string());
        config
            .worker
            .env
            .insert("LOG_LEVEL".to_string(), "debug".to_string());
        let mut value = serde_json::to_value(&config).unwrap();

        mask_sensitive_env(&mut value);

        assert_eq!(value["worker"]["env"]["RUNPOD_API_KEY"], "********");
        assert_eq!(value["worker"]["env"]["LOG_LEVEL"], "debug");
    }

    #[test]
    fn test_sensitive_names() {
        assert!(is_sensitive("hf_token"));
        assert!(is_sensitive("AWS_SECRET_ACCESS_KEY"));
        assert!(!is_sensitive("COMFY_PORT"));
    }
}
