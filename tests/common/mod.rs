// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use turdus::proxy::{host_of, HttpClient, HttpResponse, OutboundRequest};

/// Answers by request path; unknown paths get 200 "hello world".
#[derive(Default)]
pub struct ScriptedClient {
    replies: HashMap<String, (u16, String)>,
    unreachable: Vec<String>,
    sent: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, path: &str, status: u16, body: &str) -> Self {
        self.replies.insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn unreachable(mut self, path: &str) -> Self {
        self.unreachable.push(path.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse> {
        self.sent.lock().unwrap().push(request.clone());
        let path = request.url.path().to_string();

        if self.unreachable.contains(&path) {
            bail!("connect ECONNREFUSED {}", request.url);
        }

        let (status_code, body) = self
            .replies
            .get(&path)
            .cloned()
            .unwrap_or((200, "hello world".to_string()));
        Ok(HttpResponse {
            status_code,
            body,
            host: host_of(&request.url),
        })
    }
}

pub fn count(hosts: &[String], server: &str) -> usize {
    hosts.iter().filter(|h| *h == server).count()
}
