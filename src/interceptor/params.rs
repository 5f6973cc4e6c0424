//! Named call arguments captured for the entry record.

use std::fmt::Debug;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::masking::MaskingEngine;

pub(crate) const UNSERIALIZABLE: &str = "<unserializable>";

#[derive(Debug, Clone)]
enum Arg {
    Json(Value),
    Text(String),
    Unserializable,
}

/// Ordered `(name, value)` arguments of one call.
///
/// Values are serialized when added and masked one by one when the entry
/// record is rendered.
#[derive(Debug, Clone, Default)]
pub struct Params {
    args: Vec<(String, Arg)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        let arg = serde_json::to_value(value)
            .map(Arg::Json)
            .unwrap_or(Arg::Unserializable);
        self.args.push((name.into(), arg));
        self
    }

    /// Like [`with`](Self::with), falling back to the `Debug` text when
    /// serialization fails.
    pub fn with_debug<T: Serialize + Debug + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Self {
        let arg = match serde_json::to_value(value) {
            Ok(json) => Arg::Json(json),
            Err(_) => Arg::Text(format!("{value:?}")),
        };
        self.args.push((name.into(), arg));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Masked JSON object text, keys in insertion order.
    pub(crate) fn render_masked(&self, masker: &MaskingEngine) -> String {
        let masked: Vec<(&str, Value)> = self
            .args
            .iter()
            .map(|(name, arg)| {
                let value = match arg {
                    Arg::Json(json) => masker.mask_json(json),
                    Arg::Text(text) => Value::String(masker.mask(text)),
                    Arg::Unserializable => Value::String(UNSERIALIZABLE.to_string()),
                };
                (name.as_str(), value)
            })
            .collect();
        serde_json::to_string(&Ordered(&masked)).unwrap_or_else(|_| "{}".to_string())
    }
}

struct Ordered<'a>(&'a [(&'a str, Value)]);

impl Serialize for Ordered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
