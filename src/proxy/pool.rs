//
// src/proxy/pool.rs
//

use super::endpoint::EndpointList;
use crate::config::LoadBalancerAlgorithm;
use crate::error::{DispatchError, Result};
use crate::load_balancer::{LoadBalancer, Scheduler, SchedulingMode};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application name used when the registry is built from a bare endpoint list.
pub const DEFAULT_APP: &str = "default";

pub const WRONG_APPLICATIONS: &str = "applications should be a non-empty map of name to \
     string[] or {server: string, weight: number}[]";

/// Endpoints and selection state of one application.
#[derive(Debug)]
pub struct Pool {
    app: String,
    scheduler: Scheduler,
}

impl Pool {
    pub fn new(
        app: impl Into<String>,
        algorithm: LoadBalancerAlgorithm,
        endpoints: EndpointList,
    ) -> Result<Self> {
        let scheduler = Scheduler::new(algorithm, &endpoints)?;
        Ok(Self {
            app: app.into(),
            scheduler,
        })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn mode(&self) -> SchedulingMode {
        self.scheduler.mode()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn pick(&mut self) -> Result<String> {
        self.scheduler
            .pick()
            .map(str::to_string)
            .ok_or_else(|| DispatchError::EmptyPool(self.app.clone()))
    }
}

/// Application name -> pool.
///
/// Each pool sits behind its own mutex: picks for one application are
/// serialized, picks for different applications never contend. The lock
/// covers only the pick, never the outbound request.
#[derive(Clone)]
pub struct Registry {
    pools: Arc<DashMap<String, Arc<Mutex<Pool>>>>,
    algorithm: LoadBalancerAlgorithm,
}

impl Registry {
    pub fn new<I>(algorithm: LoadBalancerAlgorithm, applications: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, EndpointList)>,
    {
        let registry = Self {
            pools: Arc::new(DashMap::new()),
            algorithm,
        };

        let mut registered = 0;
        for (app, endpoints) in applications {
            registry.insert(app, endpoints)?;
            registered += 1;
        }
        if registered == 0 {
            return Err(DispatchError::invalid_input(WRONG_APPLICATIONS));
        }

        tracing::info!(
            algorithm = ?algorithm,
            applications = registered,
            "Endpoint registry initialized"
        );
        Ok(registry)
    }

    /// Single-application registry, registered under [`DEFAULT_APP`].
    pub fn single(algorithm: LoadBalancerAlgorithm, endpoints: EndpointList) -> Result<Self> {
        Self::new(algorithm, [(DEFAULT_APP.to_string(), endpoints)])
    }

    /// Accepts either a bare endpoint list (single application) or a
    /// mapping of application name to endpoint list.
    pub fn from_value(algorithm: LoadBalancerAlgorithm, value: &Value) -> Result<Self> {
        match value {
            Value::Array(_) => Self::single(algorithm, EndpointList::from_value(value)?),
            _ => Self::new(algorithm, parse_applications(value)?),
        }
    }

    /// Replaces the pools of the named applications with freshly built
    /// ones. Applications not mentioned are untouched; nothing is removed.
    pub fn upsert<I>(&self, applications: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, EndpointList)>,
    {
        // Build everything first so a bad entry leaves the registry unchanged.
        let pools = applications
            .into_iter()
            .map(|(app, endpoints)| Pool::new(app, self.algorithm, endpoints))
            .collect::<Result<Vec<_>>>()?;

        for pool in pools {
            tracing::info!(app = pool.app(), mode = ?pool.mode(), "Upserted endpoints");
            self.pools
                .insert(pool.app().to_string(), Arc::new(Mutex::new(pool)));
        }
        Ok(())
    }

    pub fn upsert_endpoints(&self, value: &Value) -> Result<()> {
        self.upsert(parse_applications(value)?)
    }

    pub fn contains(&self, app: &str) -> bool {
        self.pools.contains_key(app)
    }

    pub fn applications(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        apps.sort();
        apps
    }

    pub async fn mode(&self, app: &str) -> Result<SchedulingMode> {
        let pool = self.pool(app)?;
        let mode = pool.lock().await.mode();
        Ok(mode)
    }

    /// Picks the next endpoint for `app`.
    pub async fn pick(&self, app: &str) -> Result<String> {
        let pool = self.pool(app)?;
        let mut pool = pool.lock().await;
        let server = pool.pick()?;
        tracing::debug!(app, server = %server, policy = pool.scheduler().name(), "Picked endpoint");
        Ok(server)
    }

    fn pool(&self, app: &str) -> Result<Arc<Mutex<Pool>>> {
        self.pools
            .get(app)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DispatchError::UnknownApplication(app.to_string()))
    }

    fn insert(&self, app: String, endpoints: EndpointList) -> Result<()> {
        let pool = Pool::new(app.clone(), self.algorithm, endpoints)?;
        self.pools.insert(app, Arc::new(Mutex::new(pool)));
        Ok(())
    }
}

fn parse_applications(value: &Value) -> Result<Vec<(String, EndpointList)>> {
    let map = match value.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return Err(DispatchError::invalid_input(WRONG_APPLICATIONS)),
    };

    map.iter()
        .map(|(app, endpoints)| Ok((app.clone(), EndpointList::from_value(endpoints)?)))
        .collect()
}
