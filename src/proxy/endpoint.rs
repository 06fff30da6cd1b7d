// src/proxy/endpoint.rs
use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WRONG_ENDPOINTS: &str =
    "endpoints structure should be string[] or {server: string, weight: number}[]";

/// A backend server with its configured weight (0 = unweighted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub server: String,
    #[serde(default)]
    pub weight: u32,
}

impl EndpointRecord {
    pub fn new(server: impl Into<String>, weight: u32) -> Self {
        Self {
            server: server.into(),
            weight,
        }
    }
}

/// A validated, non-empty, ordered endpoint list for one application.
///
/// Order matters: it drives plain round robin and tie-breaking in the
/// weighted policies. Duplicate servers are independent slots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct EndpointList {
    records: Vec<EndpointRecord>,
}

impl EndpointList {
    pub fn from_servers<I, S>(servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = servers
            .into_iter()
            .map(|server| EndpointRecord::new(server, 0))
            .collect();
        Self::from_weighted(records)
    }

    pub fn from_weighted(records: Vec<EndpointRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(DispatchError::invalid_input(WRONG_ENDPOINTS));
        }
        Ok(Self { records })
    }

    /// Validates a dynamic value: either an array of strings or an array of
    /// `{server, weight}` objects. The first element decides which.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = match value.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => return Err(DispatchError::invalid_input(WRONG_ENDPOINTS)),
        };

        match &items[0] {
            Value::String(_) => {
                let servers = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| DispatchError::invalid_input(WRONG_ENDPOINTS))?;
                Self::from_servers(servers)
            }
            Value::Object(_) => {
                let records = items
                    .iter()
                    .map(record_from_value)
                    .collect::<Result<Vec<_>>>()?;
                Self::from_weighted(records)
            }
            _ => Err(DispatchError::invalid_input(WRONG_ENDPOINTS)),
        }
    }

    pub fn records(&self) -> &[EndpointRecord] {
        &self.records
    }

    pub fn servers(&self) -> Vec<String> {
        self.records.iter().map(|r| r.server.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when no endpoint carries a positive weight.
    pub fn is_unweighted(&self) -> bool {
        self.records.iter().all(|r| r.weight == 0)
    }
}

impl TryFrom<Value> for EndpointList {
    type Error = DispatchError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

fn record_from_value(value: &Value) -> Result<EndpointRecord> {
    let object = value
        .as_object()
        .ok_or_else(|| DispatchError::invalid_input(WRONG_ENDPOINTS))?;
    let server = object
        .get("server")
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::invalid_input(WRONG_ENDPOINTS))?;

    let weight = match object.get("weight") {
        None | Some(Value::Null) => 0,
        Some(weight) => weight
            .as_u64()
            .and_then(|w| u32::try_from(w).ok())
            .ok_or_else(|| {
                DispatchError::invalid_input(format!(
                    "weight of '{}' must be a non-negative integer",
                    server
                ))
            })?,
    };

    Ok(EndpointRecord::new(server, weight))
}
