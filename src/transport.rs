//! HTTP seam between the coordinator and the demo server.
//!
//! The coordinator only sees `RawResponse`s coming back through the
//! `Transport` trait, so tests can script a stub instead of a live server.

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use url::Url;

use crate::error::{Error, Result};

/// A completed HTTP exchange, reduced to what validation needs.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// One file destined for a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<RawResponse>;
    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<RawResponse>;
    /// POST `files` as a multipart form, repeating `field` once per file.
    async fn post_files(&self, path: &str, field: &str, files: Vec<FilePart>)
        -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Network(format!("bad endpoint {}: {}", path, e)))
    }

    async fn read(resp: reqwest::Response) -> Result<RawResponse> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.text().await?;
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<RawResponse> {
        let url = self.endpoint(path)?;
        let resp = self.client.get(url).send().await?;
        Self::read(resp).await
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<RawResponse> {
        let url = self.endpoint(path)?;
        let resp = self.client.post(url).json(&body).send().await?;
        Self::read(resp).await
    }

    async fn post_files(
        &self,
        path: &str,
        field: &str,
        files: Vec<FilePart>,
    ) -> Result<RawResponse> {
        let url = self.endpoint(path)?;
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
            form = form.part(field.to_string(), part);
        }
        let resp = self.client.post(url).multipart(form).send().await?;
        Self::read(resp).await
    }
}

/// Scripted stub: replays canned responses in order and records every call.
/// Lets the coordinator run without a server, in tests or offline demos.
#[derive(Default)]
pub struct StubTransport {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<RawResponse>>>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn with(replies: Vec<Result<RawResponse>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into_iter().collect()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// JSON reply shorthand.
    pub fn json_reply(status: u16, body: serde_json::Value) -> Result<RawResponse> {
        Ok(RawResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next(&self, call: String) -> Result<RawResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(Error::Network("stub transport exhausted".to_string())))
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path: &str) -> Result<RawResponse> {
        self.next(format!("GET {}", path))
    }

    async fn post_json(&self, path: &str, _body: serde_json::Value) -> Result<RawResponse> {
        self.next(format!("POST {}", path))
    }

    async fn post_files(
        &self,
        path: &str,
        field: &str,
        files: Vec<FilePart>,
    ) -> Result<RawResponse> {
        self.next(format!("POST {} ({} x{})", path, field, files.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_path() {
        let t = HttpTransport::new(Url::parse("http://127.0.0.1:5000").unwrap());
        let url = t.endpoint("/load_data/datasets").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/load_data/datasets");
    }

    #[test]
    fn endpoint_tolerates_missing_leading_slash() {
        let t = HttpTransport::new(Url::parse("http://127.0.0.1:5000").unwrap());
        let url = t.endpoint("patients/load").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/patients/load");
    }
}
