//! Operation instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! setup:
//!     Interceptor::wrap(OperationOptions) → Operation<R>
//!
//! per call:
//!     Operation::call / call_async
//!         → context gains operation + operation_id
//!         → ENTRY record (masked params)
//!         → wrapped call runs
//!         → EXIT record (masked result) or ERROR record (masked message)
//!         → SLOW warning on threshold overrun
//!         → AUDIT record when enabled
//!         → context tags restored
//! ```
//!
//! # Design Decisions
//! - Wrappers are built explicitly, once per operation
//! - The wrapped call's error is handed back untouched
//! - Logging and masking failures degrade to a bare record; they never
//!   reach the caller

pub mod audit;
pub mod operation;
pub mod options;
pub mod params;

/// Target of every interceptor record except audit records.
pub const TARGET: &str = "paylog::interceptor";

pub use audit::{AuditRecord, AuditStatus, AUDIT_TARGET};
pub use operation::{InstrumentationSettings, Interceptor, Operation};
pub use options::{LogLevel, OperationOptions};
pub use params::Params;
