// ────────────────────────────────
// src/proxy/dispatcher.rs
// Picks an endpoint per call, forwards the request and falls back to the
// canned response table when the call fails.
// ────────────────────────────────

use super::client::{HttpClient, HttpResponse, OutboundRequest};
use super::endpoint::EndpointList;
use super::fallback::FallbackTable;
use super::pool::Registry;
use crate::error::{DispatchError, Result};
use crate::metrics::{MetricsCollector, Outcome, Timer};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// What the caller wants sent; the endpoint is chosen by the dispatcher.
///
/// The body and headers reach the endpoint byte for byte.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Bytes>,
    /// `body` is JSON; a JSON content type is added unless one is set.
    pub json: bool,
    pub headers: HeaderMap,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            json: false,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_json(mut self, body: &Value) -> Self {
        self.body = Some(Bytes::from(body.to_string()));
        self.json = true;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self.json = false;
        self
    }

    /// Appends a header; repeated names keep every value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

pub struct Dispatcher {
    registry: Registry,
    fallbacks: FallbackTable,
    client: Arc<dyn HttpClient>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Dispatcher {
    pub fn new(registry: Registry, client: Arc<dyn HttpClient>) -> Self {
        Self {
            registry,
            fallbacks: FallbackTable::new(),
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fallbacks(&self) -> &FallbackTable {
        &self.fallbacks
    }

    pub fn upsert_endpoints(&self, applications: &Value) -> Result<()> {
        self.registry.upsert_endpoints(applications)
    }

    pub fn upsert<I>(&self, applications: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, EndpointList)>,
    {
        self.registry.upsert(applications)
    }

    /// Registers canned bodies served with status 200 when a request to one
    /// of these paths fails.
    pub fn fake_positive_res<I, P, B>(&self, app: &str, mapping: I)
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<String>,
    {
        self.fallbacks.register_all(app, mapping);
    }

    pub fn register_fallback(&self, app: &str, path: impl Into<String>, body: impl Into<String>) {
        self.fallbacks.register(app, path, body);
    }

    /// Sends `spec` to the next endpoint of `app`.
    ///
    /// Only status 200 counts as success. A failed call is answered from the
    /// fallback table when it has an entry for `app` + `spec.path`.
    pub async fn request(&self, app: &str, spec: RequestSpec) -> Result<HttpResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "dispatch",
            %request_id,
            app,
            method = %spec.method,
            path = %spec.path
        );
        self.dispatch(app, spec).instrument(span).await
    }

    async fn dispatch(&self, app: &str, spec: RequestSpec) -> Result<HttpResponse> {
        let timer = Timer::new();
        let server = self.registry.pick(app).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_pick(app, &server);
        }

        let path = spec.path.clone();
        let cause = match self.forward(&server, spec).await {
            Ok(response) if response.status_code <= 200 => {
                tracing::debug!(server = %server, status = response.status_code, "Request succeeded");
                self.record(app, Outcome::Success, &timer);
                return Ok(response);
            }
            Ok(response) => {
                tracing::debug!(server = %server, status = response.status_code, "Upstream rejected request");
                response.body
            }
            Err(err) => {
                tracing::debug!(server = %server, error = %err, "Transport error");
                format!("{:#}", err)
            }
        };

        match self.fallbacks.lookup(app, &path) {
            Some(body) => {
                tracing::debug!("Serving fallback response");
                if let Some(metrics) = &self.metrics {
                    metrics.record_fallback(app, &path);
                }
                self.record(app, Outcome::Fallback, &timer);
                Ok(HttpResponse {
                    status_code: 200,
                    body,
                    host: None,
                })
            }
            None => {
                tracing::warn!(server = %server, cause = %cause, "Request failed without fallback");
                self.record(app, Outcome::Failure, &timer);
                Err(DispatchError::RequestFailed(cause))
            }
        }
    }

    async fn forward(&self, server: &str, spec: RequestSpec) -> anyhow::Result<HttpResponse> {
        let url = build_target(server, &spec.path)?;
        self.client
            .send(OutboundRequest {
                method: spec.method,
                url,
                body: spec.body,
                json: spec.json,
                headers: spec.headers,
            })
            .await
    }

    fn record(&self, app: &str, outcome: Outcome, timer: &Timer) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(app, outcome, timer.elapsed());
        }
    }
}

/// `http://` + server + path, unless the server already names its scheme.
pub fn build_target(server: &str, path: &str) -> std::result::Result<Url, url::ParseError> {
    let base = if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", server)
    };

    if path.is_empty() || path.starts_with('/') {
        Url::parse(&format!("{}{}", base, path))
    } else {
        Url::parse(&format!("{}/{}", base, path))
    }
}
