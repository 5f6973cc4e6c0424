//! Recognized context keys and the `RequestContext` map.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A recognized context field.
///
/// Variant order is the iteration order of [`RequestContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    CorrelationId,
    TransactionId,
    UserId,
    ClientIp,
    RequestUri,
    RequestMethod,
    Operation,
    OperationId,
}

impl ContextKey {
    pub const ALL: [ContextKey; 8] = [
        ContextKey::CorrelationId,
        ContextKey::TransactionId,
        ContextKey::UserId,
        ContextKey::ClientIp,
        ContextKey::RequestUri,
        ContextKey::RequestMethod,
        ContextKey::Operation,
        ContextKey::OperationId,
    ];

    /// Field name used in log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKey::CorrelationId => "correlation_id",
            ContextKey::TransactionId => "transaction_id",
            ContextKey::UserId => "user_id",
            ContextKey::ClientIp => "client_ip",
            ContextKey::RequestUri => "request_uri",
            ContextKey::RequestMethod => "request_method",
            ContextKey::Operation => "operation",
            ContextKey::OperationId => "operation_id",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named fields describing one logical unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    fields: BTreeMap<ContextKey, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: ContextKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: ContextKey, value: impl Into<String>) {
        self.fields.insert(key, value.into());
    }

    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.fields.get(&key).map(String::as_str)
    }

    /// Remove one field, returning its previous value.
    pub fn remove(&mut self, key: ContextKey) -> Option<String> {
        self.fields.remove(&key)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContextKey, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for RequestContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}
