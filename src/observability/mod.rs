//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing event
//!     → layer.rs (StructuredJsonLayer)
//!         target "audit" → audit writer, raw AuditRecord JSON
//!         otherwise     → serializer.rs renders event + current context
//!                       → stdout
//!
//! interceptor timings → metrics.rs → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every string that reaches a sink has been through the masking engine
//! - Metrics are cheap (atomic increments) and off until a recorder is installed

pub mod layer;
pub mod logging;
pub mod metrics;
pub mod serializer;

pub use layer::StructuredJsonLayer;
pub use logging::{init, LoggingError, MaskingMakeWriter, MaskingWriter};
pub use serializer::{ExceptionInfo, RawLogEvent, StructuredLogSerializer};
