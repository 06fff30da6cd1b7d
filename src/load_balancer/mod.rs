// src/load_balancer/mod.rs
mod algorithm;
pub mod gcd;
mod round_robin;
mod smooth;
mod weighted;

pub use algorithm::LoadBalancer; // trait
pub use crate::config::LoadBalancerAlgorithm;
pub use gcd::{gcd, gcd_of_many};
pub use round_robin::RoundRobinBalancer;
pub use smooth::SmoothWeightedBalancer;
pub use weighted::WeightedRoundRobinBalancer;

use crate::error::Result;
use crate::proxy::EndpointList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    Raw,
    ClassicWeighted,
    SmoothWeighted,
}

/// The selection state of one application, tagged by policy.
#[derive(Debug, Clone)]
pub enum Scheduler {
    Raw(RoundRobinBalancer),
    ClassicWeighted(WeightedRoundRobinBalancer),
    SmoothWeighted(SmoothWeightedBalancer),
}

impl Scheduler {
    /// Builds the scheduler for `endpoints`. Pools without any positive
    /// weight, or an explicit `RoundRobin` algorithm, are plain round robin.
    pub fn new(algorithm: LoadBalancerAlgorithm, endpoints: &EndpointList) -> Result<Self> {
        if algorithm == LoadBalancerAlgorithm::RoundRobin || endpoints.is_unweighted() {
            return Ok(Self::Raw(RoundRobinBalancer::new(endpoints.servers())));
        }

        let records = endpoints.records();
        match algorithm {
            LoadBalancerAlgorithm::SmoothWeightedRoundRobin => {
                Ok(Self::SmoothWeighted(SmoothWeightedBalancer::new(records)?))
            }
            _ => Ok(Self::ClassicWeighted(WeightedRoundRobinBalancer::new(records)?)),
        }
    }

    pub fn mode(&self) -> SchedulingMode {
        match self {
            Self::Raw(_) => SchedulingMode::Raw,
            Self::ClassicWeighted(_) => SchedulingMode::ClassicWeighted,
            Self::SmoothWeighted(_) => SchedulingMode::SmoothWeighted,
        }
    }
}

impl LoadBalancer for Scheduler {
    fn pick(&mut self) -> Option<&str> {
        match self {
            Self::Raw(balancer) => balancer.pick(),
            Self::ClassicWeighted(balancer) => balancer.pick(),
            Self::SmoothWeighted(balancer) => balancer.pick(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Raw(balancer) => balancer.name(),
            Self::ClassicWeighted(balancer) => balancer.name(),
            Self::SmoothWeighted(balancer) => balancer.name(),
        }
    }
}
