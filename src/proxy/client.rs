// src/proxy/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::Method;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A fully resolved outbound call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Bytes>,
    pub json: bool,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    /// `host[:port]` that answered.
    pub host: Option<String>,
}

/// The network boundary. Timeouts and connection handling belong to the
/// implementation.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse> {
        let mut headers = request.headers;
        if request.json && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut builder = self.client.request(request.method, request.url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let host = host_of(response.url());
        let body = response.text().await?;

        Ok(HttpResponse {
            status_code,
            body,
            host,
        })
    }
}

pub fn host_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(host_of(&url).as_deref(), Some("127.0.0.1:8080"));

        let url = Url::parse("http://backend.local/x").unwrap();
        assert_eq!(host_of(&url).as_deref(), Some("backend.local"));
    }
}
