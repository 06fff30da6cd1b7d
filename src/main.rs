// src/main.rs
use anyhow::Result;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use turdus::{
    config,
    metrics::MetricsRegistry,
    proxy::{Dispatcher, Registry, ReqwestClient},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turdus=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    let registry = Registry::new(config.algorithm, config.applications.clone())?;
    let client = Arc::new(ReqwestClient::new(config.client.timeout())?);
    let dispatcher = Dispatcher::new(registry, client).with_metrics(metrics);
    for (app, mapping) in &config.fallbacks {
        dispatcher.fake_positive_res(app, mapping.clone());
    }

    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }

    let handler = RequestHandler::new(Arc::new(dispatcher));

    info!("Starting dispatcher on {}", config.listen);
    ServerBuilder::new(config.listen)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn start_metrics_server(
    addr: SocketAddr,
    registry: MetricsRegistry,
    path: String,
) -> Result<()> {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path);
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    if req.uri().path() != path.as_str() {
                        let mut response = Response::new(Body::from("Not Found"));
                        *response.status_mut() = StatusCode::NOT_FOUND;
                        return Ok::<_, Infallible>(response);
                    }

                    let response = match registry.gather() {
                        Ok(metrics) => {
                            let mut response = Response::new(Body::from(metrics));
                            response.headers_mut().insert(
                                CONTENT_TYPE,
                                HeaderValue::from_static("text/plain; version=0.0.4"),
                            );
                            response
                        }
                        Err(err) => {
                            error!("Failed to encode metrics: {}", err);
                            let mut response = Response::new(Body::from("metrics unavailable"));
                            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            response
                        }
                    };
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
