// src/load_balancer/weighted.rs
use super::gcd::gcd_of_many;
use crate::error::{DispatchError, Result};
use crate::load_balancer::LoadBalancer;
use crate::proxy::EndpointRecord;

#[derive(Debug, Clone)]
struct Slot {
    server: String,
    weight: u32,
    current_weight: u32,
}

/// Classic weighted round robin stepping each pick down by the gcd of all
/// weights. Over `sum(weight) / gcd` picks every endpoint is chosen exactly
/// `weight / gcd` times.
#[derive(Debug, Clone)]
pub struct WeightedRoundRobinBalancer {
    slots: Vec<Slot>,
    gcd_step: u32,
}

impl WeightedRoundRobinBalancer {
    pub fn new(endpoints: &[EndpointRecord]) -> Result<Self> {
        let weights: Vec<u32> = endpoints.iter().map(|e| e.weight).collect();
        let gcd_step = gcd_of_many(&weights)?;
        if gcd_step == 0 {
            return Err(DispatchError::invalid_input(
                "weighted round robin needs at least one positive weight",
            ));
        }

        let slots = endpoints
            .iter()
            .map(|e| Slot {
                server: e.server.clone(),
                weight: e.weight,
                current_weight: e.weight,
            })
            .collect();

        Ok(Self { slots, gcd_step })
    }

    pub fn gcd_step(&self) -> u32 {
        self.gcd_step
    }

    pub fn current_weights(&self) -> Vec<u32> {
        self.slots.iter().map(|s| s.current_weight).collect()
    }

    fn restore_current_weights(&mut self) {
        for slot in &mut self.slots {
            slot.current_weight = slot.weight;
        }
    }

    // First occurrence wins ties.
    fn heaviest_eligible(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.current_weight < self.gcd_step {
                continue;
            }
            match best {
                Some(b) if self.slots[b].current_weight >= slot.current_weight => {}
                _ => best = Some(index),
            }
        }
        best
    }
}

impl LoadBalancer for WeightedRoundRobinBalancer {
    fn pick(&mut self) -> Option<&str> {
        let index = match self.heaviest_eligible() {
            Some(index) => index,
            None => {
                self.restore_current_weights();
                self.heaviest_eligible()?
            }
        };

        let slot = &mut self.slots[index];
        slot.current_weight -= self.gcd_step;
        Some(slot.server.as_str())
    }

    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }
}
