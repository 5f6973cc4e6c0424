//! Payment-service logging, masking and context propagation.
//!
//! # Architecture Overview
//!
//! ```text
//!   inbound request
//!        │
//!        ▼
//!   ┌──────────┐   opens   ┌─────────────┐   read by   ┌───────────────┐
//!   │   http   │──────────▶│   context   │◀────────────│ observability │──▶ JSON lines
//!   │ boundary │           │ (task-local)│             │  serializer   │──▶ audit sink
//!   └──────────┘           └─────────────┘             └───────────────┘
//!        │                   ▲       │                         ▲
//!        ▼                   │       ▼                         │
//!   ┌─────────────┐  tags    │  ┌─────────────┐        ┌──────────┐
//!   │ interceptor │──────────┘  │ propagation │        │ masking  │
//!   │ steps       │             │ (outbound)  │        │  engine  │
//!   └─────────────┘             └─────────────┘        └──────────┘
//! ```
//!
//! `config` and `lifecycle` assemble the pieces; `masking` is consulted by
//! every component that writes user data.

pub mod config;
pub mod context;
pub mod http;
pub mod interceptor;
pub mod lifecycle;
pub mod masking;
pub mod observability;
pub mod propagation;
pub mod steps;

pub use config::PaylogConfig;
pub use lifecycle::{initialize, Components, Shutdown};
pub use masking::MaskingEngine;
