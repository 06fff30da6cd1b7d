// src/lib.rs
pub mod config;
pub mod error;
pub mod load_balancer;
pub mod metrics;
pub mod proxy;
pub mod server;

pub use error::DispatchError;
pub use proxy::{Dispatcher, EndpointList, EndpointRecord, HttpClient, HttpResponse, Registry, RequestSpec};
