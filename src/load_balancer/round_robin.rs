// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;

/// Plain round robin in configuration order.
#[derive(Debug, Clone)]
pub struct RoundRobinBalancer {
    servers: Vec<String>,
    cursor: usize,
}

impl RoundRobinBalancer {
    pub fn new(servers: Vec<String>) -> Self {
        Self { servers, cursor: 0 }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn pick(&mut self) -> Option<&str> {
        if self.servers.is_empty() {
            return None;
        }
        if self.cursor >= self.servers.len() {
            self.cursor = 0;
        }

        let index = self.cursor;
        self.cursor += 1;
        Some(self.servers[index].as_str())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
