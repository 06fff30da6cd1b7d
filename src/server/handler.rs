// src/server/handler.rs
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use hyper::{Body, Request, Response, StatusCode};
use std::sync::Arc;
use tower::Service;

use crate::error::DispatchError;
use crate::proxy::{Dispatcher, RequestSpec};

/// Serves `/<app>/<path>` by dispatching `<path>` to one of `<app>`'s endpoints.
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Arc<Dispatcher>,
}

impl RequestHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let (app, spec) = match into_request_spec(req).await {
            Ok(parts) => parts,
            Err(err) => return error_response(&err),
        };

        match self.dispatcher.request(&app, spec).await {
            Ok(response) => {
                let mut out = Response::new(Body::from(response.body));
                *out.status_mut() =
                    StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::OK);
                out
            }
            Err(err) => {
                tracing::debug!(%app, %err, "dispatch error");
                error_response(&err)
            }
        }
    }
}

/// Splits `/<app>/<rest>?<query>` into the application name and `/<rest>?<query>`.
pub fn split_route(path_and_query: &str) -> Option<(String, String)> {
    let trimmed = path_and_query.strip_prefix('/')?;
    let (head, query) = match trimmed.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (trimmed, None),
    };
    let (app, rest) = match head.split_once('/') {
        Some((app, rest)) => (app, rest),
        None => (head, ""),
    };
    if app.is_empty() {
        return None;
    }

    let mut path = format!("/{}", rest);
    if let Some(query) = query {
        path.push('?');
        path.push_str(query);
    }
    Some((app.to_string(), path))
}

async fn into_request_spec(req: Request<Body>) -> Result<(String, RequestSpec), DispatchError> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let (app, path) = split_route(path_and_query).ok_or_else(|| {
        DispatchError::invalid_input("request path must start with /<application>")
    })?;

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    let mut headers = parts.headers;
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    let mut spec = RequestSpec::new(parts.method, path).with_headers(headers);

    let bytes = hyper::body::to_bytes(body)
        .await
        .map_err(|e| DispatchError::invalid_input(format!("failed to read request body: {}", e)))?;
    if !bytes.is_empty() {
        spec = spec.with_body(bytes);
        spec.json = is_json;
    }

    Ok((app, spec))
}

pub fn error_response(err: &DispatchError) -> Response<Body> {
    let status = match err {
        DispatchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DispatchError::UnknownApplication(_) => StatusCode::NOT_FOUND,
        DispatchError::EmptyPool(_) => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::RequestFailed(_) => StatusCode::BAD_GATEWAY,
    };

    let mut response = Response::new(Body::from(err.to_string()));
    *response.status_mut() = status;
    response
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}
