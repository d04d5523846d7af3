//! Response validation: decide once whether a completed HTTP exchange is safe
//! to parse as JSON, before any payload shaping happens.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::RawResponse;

/// Truncate a body for error diagnostics without splitting a char.
pub fn preview(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", cut)
}

fn declares_json(content_type: &str) -> bool {
    // Covers application/json, application/problem+json, with charset params
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Checks run in order: status, content-type, emptiness, JSON syntax.
/// A non-2xx status fails before the body is ever looked at.
pub fn validate(raw: &RawResponse, preview_chars: usize) -> Result<Value> {
    if !(200..300).contains(&raw.status) {
        return Err(Error::Server { status: raw.status });
    }

    let is_json = raw
        .content_type
        .as_deref()
        .map(declares_json)
        .unwrap_or(false);
    if !is_json {
        return Err(Error::UnexpectedContentType {
            status: raw.status,
            body_preview: preview(&raw.body, preview_chars),
        });
    }

    if raw.body.trim().is_empty() {
        return Err(Error::EmptyResponse { status: raw.status });
    }

    serde_json::from_str(&raw.body).map_err(|e| Error::MalformedJson {
        status: raw.status,
        body_preview: preview(&raw.body, preview_chars),
        parse_error: e.to_string(),
    })
}
