// src/proxy/fallback.rs
use dashmap::DashMap;
use std::collections::HashMap;

/// Canned response bodies per application, keyed by exact request path.
#[derive(Debug, Default)]
pub struct FallbackTable {
    entries: DashMap<String, HashMap<String, String>>,
}

impl FallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the body served for `app` + `path`.
    pub fn register(&self, app: &str, path: impl Into<String>, body: impl Into<String>) {
        self.entries
            .entry(app.to_string())
            .or_default()
            .insert(path.into(), body.into());
    }

    pub fn register_all<I, P, B>(&self, app: &str, mapping: I)
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<String>,
    {
        let mut table = self.entries.entry(app.to_string()).or_default();
        for (path, body) in mapping {
            table.insert(path.into(), body.into());
        }
    }

    pub fn lookup(&self, app: &str, path: &str) -> Option<String> {
        self.entries
            .get(app)
            .and_then(|table| table.get(path).cloned())
    }
}
