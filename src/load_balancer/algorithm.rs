// src/load_balancer/algorithm.rs

/// A selection policy over one application's endpoints.
///
/// `pick` mutates the policy's counters, so callers sharing a policy must
/// serialize their calls (see [`crate::proxy::Registry`]).
pub trait LoadBalancer: Send {
    fn pick(&mut self) -> Option<&str>;

    fn name(&self) -> &'static str;
}
