// src/config/models.rs
use crate::proxy::EndpointList;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerAlgorithm {
    /// Every pool is plain round robin; weights are ignored.
    RoundRobin,
    #[default]
    WeightedRoundRobin,
    SmoothWeightedRoundRobin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub algorithm: LoadBalancerAlgorithm,

    pub applications: HashMap<String, EndpointList>,

    /// app -> request path -> substitute body
    #[serde(default)]
    pub fallbacks: HashMap<String, HashMap<String, String>>,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.applications.is_empty() {
            bail!("at least one application must be configured");
        }
        for app in self.fallbacks.keys() {
            if !self.applications.contains_key(app) {
                bail!("fallbacks configured for unknown application '{}'", app);
            }
        }
        if self.client.timeout_secs == 0 {
            bail!("client.timeout_secs must be positive");
        }
        if !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }
        Ok(())
    }
}
