//! HTTP server: health, metrics, and the transfer API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eyre::eyre;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use skyway_core::BridgeError;
use tokio::sync::RwLock;
use tracing::info;

use crate::context::AppContext;

/// Node statistics shared between the watcher and the HTTP server.
#[derive(Debug, Default, Clone)]
pub struct BridgeStats {
    pub node_id: String,
    pub environment: String,
    pub cosmos_address: Option<String>,
    pub evm_address: Option<String>,
    pub cosmos_balance: Option<String>,
    pub evm_balance: Option<String>,
    pub notifications_queued: u64,
}

/// Prometheus metrics
pub struct Metrics {
    pub deposits_submitted_total: IntCounter,
    pub withdrawals_submitted_total: IntCounter,
    pub transfer_failures_total: IntCounter,
    pub poll_errors_total: IntCounter,
    pub notifications_queued: IntGauge,
    pub registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let deposits_submitted_total = IntCounter::new(
            "skyway_deposits_submitted_total",
            "Total IBC deposit transfers submitted",
        )
        .expect("constant metric name is valid");

        let withdrawals_submitted_total = IntCounter::new(
            "skyway_withdrawals_submitted_total",
            "Total withdrawer contract calls submitted",
        )
        .expect("constant metric name is valid");

        let transfer_failures_total = IntCounter::new(
            "skyway_transfer_failures_total",
            "Total transfer submissions that failed",
        )
        .expect("constant metric name is valid");

        let poll_errors_total = IntCounter::new(
            "skyway_balance_poll_errors_total",
            "Total balance fetches that failed",
        )
        .expect("constant metric name is valid");

        let notifications_queued = IntGauge::new(
            "skyway_notifications_queued",
            "Notifications currently queued",
        )
        .expect("constant metric name is valid");

        // Registration happens exactly once at startup
        registry
            .register(Box::new(deposits_submitted_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(withdrawals_submitted_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(transfer_failures_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(poll_errors_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(notifications_queued.clone()))
            .expect("metric registration must not be called twice");

        Self {
            deposits_submitted_total,
            withdrawals_submitted_total,
            transfer_failures_total,
            poll_errors_total,
            notifications_queued,
            registry,
        }
    }
}

pub type SharedStats = Arc<RwLock<BridgeStats>>;
pub type SharedMetrics = Arc<Metrics>;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub stats: SharedStats,
    pub metrics: SharedMetrics,
}

// ============================================================================
// Health and metrics
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub environment: String,
    pub cosmos_address: Option<String>,
    pub evm_address: Option<String>,
    pub cosmos_balance: Option<String>,
    pub evm_balance: Option<String>,
    pub notifications_queued: u64,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.stats.read().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: stats.node_id.clone(),
        environment: stats.environment.clone(),
        cosmos_address: stats.cosmos_address.clone(),
        evm_address: stats.evm_address.clone(),
        cosmos_balance: stats.cosmos_balance.clone(),
        evm_balance: stats.evm_balance.clone(),
        notifications_queued: stats.notifications_queued,
    })
}

async fn liveness() -> &'static str {
    "OK"
}

/// Ready once both wallets are connected.
async fn readiness(State(state): State<AppState>) -> &'static str {
    let stats = state.stats.read().await;
    if stats.cosmos_address.is_some() && stats.evm_address.is_some() {
        "OK"
    } else {
        "NOT_READY"
    }
}

async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response();
    }

    match Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

// ============================================================================
// Transfer API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Amount in display units, e.g. "5" or "0.5".
    pub amount: String,
    /// Recipient address on the EVM chain.
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Amount in display units.
    pub amount: String,
    /// Destination address on the IBC chain.
    pub destination: String,
}

#[derive(Serialize)]
pub struct TransferResponse {
    pub tx_hash: String,
    pub height: Option<u64>,
    pub success: bool,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        let status = match &err {
            BridgeError::InvalidSelection(_) | BridgeError::Amount(_) => StatusCode::BAD_REQUEST,
            BridgeError::ChainUnknown { .. } => StatusCode::BAD_REQUEST,
            BridgeError::AccountNotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::WalletUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Transfer(_) | BridgeError::Other(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, err.to_string())
    }
}

async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    if state.ctx.dispatch_guard.is_in_flight() {
        return Err(ApiError(
            StatusCode::CONFLICT,
            "a transfer is already in flight".to_string(),
        ));
    }

    let outcome = state
        .ctx
        .deposit(&request.amount, &request.recipient)
        .await
        .map_err(|e| {
            state.metrics.transfer_failures_total.inc();
            ApiError::from(e)
        })?;

    state.metrics.deposits_submitted_total.inc();
    Ok(Json(TransferResponse {
        tx_hash: outcome.tx_hash,
        height: outcome.height,
        success: outcome.success,
    }))
}

async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    if state.ctx.dispatch_guard.is_in_flight() {
        return Err(ApiError(
            StatusCode::CONFLICT,
            "a transfer is already in flight".to_string(),
        ));
    }

    let outcome = state
        .ctx
        .withdraw(&request.amount, &request.destination)
        .await
        .map_err(|e| {
            state.metrics.transfer_failures_total.inc();
            ApiError::from(e)
        })?;

    state.metrics.withdrawals_submitted_total.inc();
    Ok(Json(TransferResponse {
        tx_hash: outcome.tx_hash,
        height: outcome.height,
        success: outcome.success,
    }))
}

// ============================================================================
// Server
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .with_state(state)
}

pub async fn start_server(bind_address: &str, port: u16, state: AppState) -> eyre::Result<()> {
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .map_err(|e| eyre!("Invalid bind address {}:{}: {}", bind_address, port, e))?;
    info!("HTTP server listening on {}", addr);
    info!("  /health   - Full health status (JSON)");
    info!("  /metrics  - Prometheus metrics");
    info!("  /deposit  - Submit an IBC deposit");
    info!("  /withdraw - Submit an EVM withdrawal");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
