use url::Url;

use crate::logging::{log, obj, v_str, Level};

const DEFAULT_BASE: &str = "http://127.0.0.1:5000";

/// Client configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the demo server.
    pub base_url: Url,
    /// Max characters of a response body kept in error diagnostics.
    pub body_preview_chars: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let raw = std::env::var("DOSEVIEW_BASE").unwrap_or_else(|_| DEFAULT_BASE.to_string());
        let base_url = Url::parse(&raw).unwrap_or_else(|e| {
            log(
                Level::Warn,
                "config",
                "invalid_base_url",
                obj(&[
                    ("value", v_str(&raw)),
                    ("detail", v_str(&e.to_string())),
                    ("fallback", v_str(DEFAULT_BASE)),
                ]),
            );
            Url::parse(DEFAULT_BASE).expect("static default url")
        });
        let body_preview_chars = std::env::var("DOSEVIEW_BODY_PREVIEW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);
        Self {
            base_url,
            body_preview_chars,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE).expect("static default url"),
            body_preview_chars: 200,
        }
    }
}
