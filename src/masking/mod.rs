//! Sensitive-data masking subsystem.
//!
//! # Data Flow
//! ```text
//! config (masking.enabled, masking.extra_rules)
//!     → defaults.rs (ordered catalog: IBAN, card, email, phone, CVV, national id)
//!     → rule.rs (compile pattern + replacement, fail on bad regex)
//!     → engine.rs (MaskingEngine, immutable, shared via Arc)
//!
//! Consumers:
//!     → interceptor (params, results, error messages)
//!     → observability serializer (message, context values, exception)
//!     → step loggers (payloads)
//! ```
//!
//! # Design Decisions
//! - Rules run sequentially; each rule sees the output of the previous one
//! - Extra rules are appended after the defaults, never interleaved
//! - Bad patterns fail at construction; `mask` itself never fails
//! - Replacements never match their own pattern, and `mask` repeats the pass
//!   until the text settles, so masking is idempotent

pub mod defaults;
pub mod engine;
pub mod rule;

pub use engine::MaskingEngine;
pub use rule::MaskingRule;

/// Error raised while building masking rules.
#[derive(Debug, thiserror::Error)]
pub enum MaskingError {
    #[error("masking rule `{name}` has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
