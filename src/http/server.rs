//! Demo payment service wired with the full instrumentation stack.
//!
//! # Responsibilities
//! - Create the Axum Router with the payment handlers
//! - Wire up middleware (timeout, correlation boundary, tracing)
//! - Bind to the listener and serve until shutdown
//!
//! Every transfer goes through the controller and validation step loggers
//! and an audited `PROCESS_TRANSFER` operation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::boundary::CorrelationLayer;
use crate::interceptor::{Operation, OperationOptions, Params};
use crate::lifecycle::{Components, Shutdown};
use crate::masking::MaskingEngine;
use crate::steps::{ControllerFlow, DatabaseStep, ValidationStep};

/// Largest single transfer accepted by the demo ledger, in cents.
pub const TRANSFER_LIMIT_CENTS: u64 = 1_000_000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRequest {
    pub debtor_iban: String,
    pub creditor_iban: String,
    pub amount_cents: u64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

impl TransferRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount_cents == 0 {
            return Err("amount must be positive".to_string());
        }
        if self.currency.len() != 3 {
            return Err(format!("unsupported currency {}", self.currency));
        }
        if self.debtor_iban == self.creditor_iban {
            return Err(format!("debtor and creditor are both {}", self.debtor_iban));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub status: String,
    pub amount_cents: u64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer of {amount} cents from {iban} exceeds the limit")]
    LimitExceeded { iban: String, amount: u64 },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub masker: Arc<MaskingEngine>,
    pub transfer: Operation<TransferReceipt>,
}

/// HTTP server for the demo payment service.
pub struct HttpServer {
    router: Router,
    request_timeout: Duration,
}

impl HttpServer {
    pub fn new(components: &Components) -> Self {
        let state = AppState {
            masker: components.masker.clone(),
            transfer: components
                .interceptor
                .wrap(OperationOptions::new("process_transfer").audit(true)),
        };
        let request_timeout = Duration::from_secs(components.config.listener.request_timeout_secs);
        let router = Self::build_router(state, components.boundary.clone(), request_timeout);
        Self {
            router,
            request_timeout,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, boundary: CorrelationLayer, timeout: Duration) -> Router {
        Router::new()
            .route("/transfers", post(create_transfer))
            .route("/health", get(health))
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(boundary)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.request_timeout.as_secs(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "UP" }))
}

async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    let flow = ControllerFlow::new(state.masker.clone(), "POST", "/transfers", "create_transfer");
    flow.start();
    flow.request(&request);

    let validation = ValidationStep::new(state.masker.clone(), "transfer");
    validation.start();
    if let Err(reason) = request.validate() {
        validation.failed(&reason);
        flow.end();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": state.masker.mask(&reason) })),
        )
            .into_response();
    }
    validation.success();

    let params = Params::new().with("request", &request);
    let db = DatabaseStep::new(state.masker.clone());
    match state.transfer.call_async(params, book_transfer(&db, &request)).await {
        Ok(receipt) => {
            flow.response(&receipt);
            flow.end();
            (StatusCode::CREATED, Json(receipt)).into_response()
        }
        Err(err) => {
            let message = state.masker.mask(&err.to_string());
            flow.error(&message);
            flow.end();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response()
        }
    }
}

async fn book_transfer(
    db: &DatabaseStep,
    request: &TransferRequest,
) -> Result<TransferReceipt, TransferError> {
    let start = Instant::now();
    db.start("INSERT transfer", Some(request));

    if request.amount_cents > TRANSFER_LIMIT_CENTS {
        let err = TransferError::LimitExceeded {
            iban: request.debtor_iban.clone(),
            amount: request.amount_cents,
        };
        db.failed("INSERT transfer", start.elapsed(), &err.to_string());
        return Err(err);
    }

    let receipt = TransferReceipt {
        transfer_id: uuid::Uuid::new_v4().to_string(),
        status: "ACCEPTED".to_string(),
        amount_cents: request.amount_cents,
        currency: request.currency.clone(),
    };
    db.success_rows("INSERT transfer", start.elapsed(), 1);
    Ok(receipt)
}
