//! HTTP API server for the swap node.
//!
//! Provides REST endpoints for node status, ledger balances, and every step
//! of the swap lifecycle.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use htlcswap_core::{AcceptTerms, Actor, AssetId, OfferTerms, SwapId, SwapOffer, SwapStatus};
use htlcswap_crypto::Secret;
use htlcswap_engine::{ClaimReceipt, EngineError, OfferFilter};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;

// --- Response types ---

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub ledger: String,
    pub assets: Vec<AssetId>,
    pub swaps: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct BalancesResponse {
    pub balances: Vec<AssetBalance>,
}

#[derive(Serialize, Deserialize)]
pub struct OffersResponse {
    pub offers: Vec<SwapOffer>,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct CompletedResponse {
    pub status: SwapStatus,
    pub swap_id: SwapId,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub retryable: bool,
}

// --- Request types ---

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ClaimAcceptorRequest {
    /// Hex preimage observed on the initiator's claim.
    pub secret: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    #[serde(default)]
    pub actor: Actor,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Validation(_) | EngineError::SecretMismatch(_) => StatusCode::BAD_REQUEST,
        EngineError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        EngineError::IllegalTransition { .. }
        | EngineError::OperationInProgress { .. }
        | EngineError::AlreadyExists(_)
        | EngineError::TimelockNotExpired { .. }
        | EngineError::TimelockExpired { .. } => StatusCode::CONFLICT,
        EngineError::LedgerAdapterFailure { .. } => StatusCode::BAD_GATEWAY,
        EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn engine_error(err: EngineError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::warn!(error = %err, kind = err.kind(), "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
            retryable: err.is_retryable(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    engine_error(EngineError::Validation(message.into()))
}

fn parse_id(raw: &str) -> Result<SwapId, ApiError> {
    raw.parse::<SwapId>()
        .map_err(|e| bad_request(e.to_string()))
}

/// Parse an optional JSON body; an empty body yields the default.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid request body: {}", e)))
}

fn required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid request body: {}", e)))
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let ledger = state.controller.ledger();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        ledger: ledger.adapter_id().to_string(),
        assets: ledger.supported_assets(),
        swaps: state.query.total(),
        by_status: state.query.counts(),
    })
}

async fn handle_balances(State(state): State<Arc<AppState>>) -> Json<BalancesResponse> {
    let ledger = state.controller.ledger();
    let mut balances = Vec::new();
    for asset in ledger.supported_assets() {
        let entry = match ledger.balance(&asset).await {
            Ok(balance) => AssetBalance {
                asset,
                balance: Some(balance),
                error: None,
            },
            Err(e) => AssetBalance {
                asset,
                balance: None,
                error: Some(e.to_string()),
            },
        };
        balances.push(entry);
    }
    Json(BalancesResponse { balances })
}

async fn handle_create_offer(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<SwapOffer>), ApiError> {
    let terms: OfferTerms = required_body(&body)?;
    let offer = state.controller.create_offer(terms).map_err(engine_error)?;
    Ok((StatusCode::CREATED, Json(offer)))
}

fn offers_response(offers: Vec<SwapOffer>) -> Json<OffersResponse> {
    let count = offers.len();
    Json(OffersResponse { offers, count })
}

async fn handle_list_offers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<OffersResponse> {
    let filter = match query.status {
        Some(raw) => OfferFilter::Status(
            raw.parse::<SwapStatus>()
                .map_err(|e| bad_request(e.to_string()))?,
        ),
        None => OfferFilter::All,
    };
    Ok(offers_response(state.query.list(filter)))
}

async fn handle_open_offers(State(state): State<Arc<AppState>>) -> Json<OffersResponse> {
    offers_response(state.query.list(OfferFilter::Open))
}

async fn handle_active_offers(State(state): State<Arc<AppState>>) -> Json<OffersResponse> {
    offers_response(state.query.list(OfferFilter::Active))
}

async fn handle_get_offer(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    state.query.get(&id).map(Json).map_err(engine_error)
}

async fn handle_accept(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
    body: Bytes,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    let terms: AcceptTerms = required_body(&body)?;
    state
        .controller
        .accept_offer(&id, terms)
        .map(Json)
        .map_err(engine_error)
}

async fn handle_lock_initiator(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    state
        .controller
        .lock_initiator(&id)
        .await
        .map(Json)
        .map_err(engine_error)
}

async fn handle_lock_acceptor(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    state
        .controller
        .lock_acceptor(&id)
        .await
        .map(Json)
        .map_err(engine_error)
}

async fn handle_claim_initiator(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
) -> ApiResult<ClaimReceipt> {
    let id = parse_id(&swap_id)?;
    state
        .controller
        .claim_initiator(&id)
        .await
        .map(Json)
        .map_err(engine_error)
}

async fn handle_claim_acceptor(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
    body: Bytes,
) -> ApiResult<CompletedResponse> {
    let id = parse_id(&swap_id)?;
    let req: ClaimAcceptorRequest = optional_body(&body)?;
    let secret = match req.secret {
        Some(hex) => Some(Secret::from_hex(&hex).map_err(|e| bad_request(e.to_string()))?),
        None => None,
    };
    let offer = state
        .controller
        .claim_acceptor(&id, secret)
        .await
        .map_err(engine_error)?;
    Ok(Json(CompletedResponse {
        status: offer.status,
        swap_id: offer.swap_id,
    }))
}

async fn handle_cancel(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
    body: Bytes,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    let req: CancelRequest = optional_body(&body)?;
    state
        .controller
        .cancel_offer(&id, req.actor)
        .map(Json)
        .map_err(engine_error)
}

async fn handle_refund(
    State(state): State<Arc<AppState>>,
    Path(swap_id): Path<String>,
) -> ApiResult<SwapOffer> {
    let id = parse_id(&swap_id)?;
    state
        .controller
        .refund(&id)
        .await
        .map(Json)
        .map_err(engine_error)
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/balances", get(handle_balances))
        .route("/api/v1/offers", get(handle_list_offers).post(handle_create_offer))
        .route("/api/v1/offers/open", get(handle_open_offers))
        .route("/api/v1/offers/active", get(handle_active_offers))
        .route("/api/v1/offers/{swap_id}", get(handle_get_offer))
        .route("/api/v1/offers/{swap_id}/accept", post(handle_accept))
        .route("/api/v1/offers/{swap_id}/lock-initiator", post(handle_lock_initiator))
        .route("/api/v1/offers/{swap_id}/lock-acceptor", post(handle_lock_acceptor))
        .route("/api/v1/offers/{swap_id}/claim-initiator", post(handle_claim_initiator))
        .route("/api/v1/offers/{swap_id}/claim-acceptor", post(handle_claim_acceptor))
        .route("/api/v1/offers/{swap_id}/cancel", post(handle_cancel))
        .route("/api/v1/offers/{swap_id}/refund", post(handle_refund))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
