//! Request context subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → http::boundary resolves a RequestContext
//!     → store::scope(ctx, handler)          (one unit of work)
//!         → interceptor adds operation / operation_id for each wrapped call
//!         → observability reads the context for every record
//!         → propagation copies ids into outbound headers
//!     → scope ends: context destroyed
//!
//! fork onto another task:
//!     ContextSnapshot::capture() at the fork point
//!     → spawn_with(snapshot, fut) restores it inside the new task
//! ```
//!
//! # Design Decisions
//! - Task-local, never global: no locking, and nothing outlives its scope
//! - No implicit inheritance by spawned tasks; forking is always explicit
//! - Outside a scope all writes are ignored and all reads are empty

pub mod keys;
pub mod store;

pub use keys::{ContextKey, RequestContext};
pub use store::{
    clear, clear_all, current, get, is_active, restore, scope, set, snapshot, spawn_with,
    sync_scope, ContextSnapshot,
};
