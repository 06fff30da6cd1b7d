// src/load_balancer/smooth.rs
use crate::error::{DispatchError, Result};
use crate::load_balancer::LoadBalancer;
use crate::proxy::EndpointRecord;

#[derive(Debug, Clone)]
struct Slot {
    server: String,
    weight: i64,
    current_weight: i64,
}

/// Smooth weighted round robin as done by nginx: every pick adds each
/// weight to its running total, takes the largest and charges it the sum
/// of all weights. Same long-run ratio as the classic policy, without the
/// long runs of one endpoint.
#[derive(Debug, Clone)]
pub struct SmoothWeightedBalancer {
    slots: Vec<Slot>,
    weight_sum: i64,
}

impl SmoothWeightedBalancer {
    pub fn new(endpoints: &[EndpointRecord]) -> Result<Self> {
        let slots: Vec<Slot> = endpoints
            .iter()
            .map(|e| Slot {
                server: e.server.clone(),
                weight: i64::from(e.weight),
                current_weight: 0,
            })
            .collect();
        let weight_sum = slots.iter().map(|s| s.weight).sum();
        if weight_sum == 0 {
            return Err(DispatchError::invalid_input(
                "smooth weighted round robin needs at least one positive weight",
            ));
        }

        Ok(Self { slots, weight_sum })
    }

    pub fn current_weights(&self) -> Vec<i64> {
        self.slots.iter().map(|s| s.current_weight).collect()
    }
}

impl LoadBalancer for SmoothWeightedBalancer {
    fn pick(&mut self) -> Option<&str> {
        let mut best: Option<usize> = None;
        for index in 0..self.slots.len() {
            self.slots[index].current_weight += self.slots[index].weight;
            match best {
                Some(b) if self.slots[b].current_weight >= self.slots[index].current_weight => {}
                _ => best = Some(index),
            }
        }

        let slot = &mut self.slots[best?];
        slot.current_weight -= self.weight_sum;
        Some(slot.server.as_str())
    }

    fn name(&self) -> &'static str {
        "smooth_weighted_round_robin"
    }
}
