//
// src/proxy/mod.rs
//
mod client;
mod dispatcher;
mod endpoint;
mod fallback;
mod pool;

pub use client::{host_of, HttpClient, HttpResponse, OutboundRequest, ReqwestClient};
pub use dispatcher::{build_target, Dispatcher, RequestSpec};
pub use endpoint::{EndpointList, EndpointRecord, WRONG_ENDPOINTS};
pub use fallback::FallbackTable;
pub use pool::{Pool, Registry, DEFAULT_APP, WRONG_APPLICATIONS};
