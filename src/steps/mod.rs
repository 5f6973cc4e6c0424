//! Step loggers for the standard stages of a transaction flow.
//!
//! # Data Flow
//! ```text
//! handler
//!     → ControllerFlow::start / request
//!     → ValidationStep::start / success | failed
//!     → DatabaseStep::start / success | failed
//!     → ExternalCall (HTTP API or mainframe transaction)
//!     → ControllerFlow::response / end / end_request
//! ```
//!
//! Every body is serialized with serde and masked before it is logged.

pub mod external;
pub mod flow;

use serde::Serialize;

use crate::masking::MaskingEngine;

pub use external::{ExternalCall, ExternalKind};
pub use flow::{ControllerFlow, DatabaseStep, ValidationStep};

const UNSERIALIZABLE_BODY: &str = "\"<unserializable>\"";

/// Masked JSON text of `body`.
pub(crate) fn masked_json<T: Serialize + ?Sized>(masker: &MaskingEngine, body: &T) -> String {
    match serde_json::to_value(body) {
        Ok(value) => masker.mask_json(&value).to_string(),
        Err(_) => UNSERIALIZABLE_BODY.to_string(),
    }
}
