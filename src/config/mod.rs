//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! paylog.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → PaylogConfig (validated, immutable)
//!     → MaskingEngine / Interceptor / CorrelationLayer / Propagator
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → instrumentation settings swapped atomically (arc-swap)
//! ```
//!
//! # Design Decisions
//! - Every field has a default, so an empty file is a valid config
//! - Only instrumentation settings are hot-swappable; masking rules and
//!   header names are fixed for the life of the process

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorrelationConfig, InstrumentationConfig, MaskingConfig, ObservabilityConfig, PaylogConfig,
    PropagationConfig,
};
