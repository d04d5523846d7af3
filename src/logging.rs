//! Structured JSON-line logging for the fetch/render pipelines.
//!
//! Every record carries a timestamp, level, and module tag so a run against a
//! live server can be replayed from stderr alone.

use std::sync::OnceLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("debug") => Level::Debug,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

static MIN_LEVEL: OnceLock<Level> = OnceLock::new();

/// LOG_LEVEL is read once, on the first log call.
pub fn min_level() -> Level {
    *MIN_LEVEL.get_or_init(Level::from_env)
}

pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit one JSON line to stderr if `level` clears the LOG_LEVEL filter.
pub fn log(level: Level, module: &str, event: &str, fields: Map<String, Value>) {
    if level < min_level() {
        return;
    }
    let mut entry = Map::new();
    entry.insert("ts".to_string(), Value::String(ts_now()));
    entry.insert("level".to_string(), Value::String(level.as_str().to_string()));
    entry.insert("module".to_string(), Value::String(module.to_string()));
    entry.insert("event".to_string(), Value::String(event.to_string()));
    for (k, v) in fields {
        entry.insert(k, v);
    }
    eprintln!("{}", Value::Object(entry));
}

/// Info-level convenience wrapper.
pub fn json_log(module: &str, fields: Map<String, Value>) {
    log(Level::Info, module, module, fields);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
