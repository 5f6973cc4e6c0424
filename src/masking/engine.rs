//! Ordered masking engine.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::config::schema::MaskingConfig;
use crate::masking::defaults::default_rules;
use crate::masking::{MaskingError, MaskingRule};

const MAX_PASSES: usize = 4;

/// Applies an ordered list of [`MaskingRule`]s to text.
///
/// The rule list is read-only after construction, so one engine can be shared
/// through an `Arc` by every request without locking.
#[derive(Debug, Clone)]
pub struct MaskingEngine {
    rules: Vec<MaskingRule>,
}

impl MaskingEngine {
    /// Engine with an explicit rule list, replacing the defaults entirely.
    pub fn new(rules: Vec<MaskingRule>) -> Self {
        Self { rules }
    }

    /// Engine with the default catalog.
    pub fn with_defaults() -> Result<Self, MaskingError> {
        Ok(Self::new(default_rules()?))
    }

    /// Engine that returns every input unchanged.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Build the engine described by the `[masking]` config section.
    ///
    /// Extra rules are compiled and appended after the defaults.
    pub fn from_config(config: &MaskingConfig) -> Result<Self, MaskingError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let mut engine = Self::with_defaults()?;
        for extra in &config.extra_rules {
            engine = engine.with_rule(MaskingRule::new(
                extra.name.clone(),
                &extra.pattern,
                extra.replacement.clone(),
            )?);
        }
        Ok(engine)
    }

    /// Append a rule. It runs after every rule already present.
    pub fn with_rule(mut self, rule: MaskingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[MaskingRule] {
        &self.rules
    }

    pub fn is_enabled(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Mask `input`, applying every rule in declaration order.
    ///
    /// The pass repeats, a bounded number of times, until the text stops
    /// changing. A mask can open a word boundary that exposes a value no rule
    /// could see in the raw text, such as a grouped card glued to the tail of
    /// another one.
    ///
    /// Never fails: a rule that panics is skipped and the text produced by the
    /// rules that did succeed is returned.
    pub fn mask(&self, input: &str) -> String {
        if input.is_empty() || self.rules.is_empty() {
            return input.to_string();
        }

        let mut current = self.pass(input);
        for _ in 1..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn pass(&self, input: &str) -> String {
        let mut current: Cow<'_, str> = Cow::Borrowed(input);
        for rule in &self.rules {
            let applied = panic::catch_unwind(AssertUnwindSafe(|| rule.apply(&current).into_owned()));
            match applied {
                Ok(next) => current = Cow::Owned(next),
                Err(_) => {
                    tracing::debug!(rule = rule.name(), "Masking rule failed, skipping");
                }
            }
        }
        current.into_owned()
    }

    /// Mask an optional value; `None` stays `None`.
    pub fn mask_opt(&self, input: Option<&str>) -> Option<String> {
        input.map(|s| self.mask(s))
    }

    /// Mask a JSON value through its serialized form.
    ///
    /// The masked text is parsed back when it is still valid JSON, otherwise
    /// it is returned as a JSON string.
    pub fn mask_json(&self, value: &Value) -> Value {
        match value {
            Value::Null | Value::Bool(_) => value.clone(),
            Value::String(s) => Value::String(self.mask(s)),
            _ => {
                let masked = self.mask(&value.to_string());
                serde_json::from_str(&masked).unwrap_or(Value::String(masked))
            }
        }
    }
}
