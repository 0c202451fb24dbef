//! HTTP API consumed by the Mini App: balance lookup and tap registration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use foxcore::config::Config;
use foxcore::storage::db::{self, DbPool, TapOutcome};

// ============================================================================
// API DATA STRUCTURES
// ============================================================================

/// Projection of a player returned by `GET /balance/{user_id}`
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub fur: i64,
    pub energy: i64,
    pub max_energy: i64,
    pub invited_count: i64,
}

/// Body of `POST /tap`
///
/// `user_id` is an `Option` so that a missing field produces the API's
/// own 400 response instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct TapRequest {
    pub user_id: Option<i64>,
}

/// Response of `POST /tap`
///
/// A refused tap (no energy left) is a normal outcome: `success: false`
/// with a message, status 200.
#[derive(Debug, Serialize)]
pub struct TapResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fur: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Shared state for all endpoints
#[derive(Clone)]
pub struct WebAppState {
    pub db_pool: Arc<DbPool>,
    pub config: Arc<Config>,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(detail) => {
                // The detail stays in the log; clients get a generic body.
                log::error!("Mini App API internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn internal<E: std::fmt::Display>(err: E) -> ApiError {
    ApiError::Internal(err.to_string())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Creates the Mini App API router
pub fn create_webapp_router(state: WebAppState) -> Router {
    // CORS for the Mini App
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/balance/:user_id", get(handle_balance))
        .route("/tap", post(handle_tap))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Runs the Mini App API server
pub async fn run_webapp_server(host: &str, port: u16, state: WebAppState) -> anyhow::Result<()> {
    let app = create_webapp_router(state);

    let addr = format!("{}:{}", host, port);
    log::info!("🌐 Starting Mini App API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "foxfury-webapp"
    }))
}

/// GET /balance/{user_id} — current balances of a player
async fn handle_balance(
    State(state): State<Arc<WebAppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let conn = db::get_connection(&state.db_pool).map_err(internal)?;

    let user = db::get_user(&conn, user_id)
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(BalanceResponse {
        fur: user.fur,
        energy: user.energy,
        max_energy: user.max_energy,
        invited_count: user.invited_count,
    }))
}

/// POST /tap — register one tap for a player
async fn handle_tap(
    State(state): State<Arc<WebAppState>>,
    Json(req): Json<TapRequest>,
) -> Result<Json<TapResponse>, ApiError> {
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;

    let conn = db::get_connection(&state.db_pool).map_err(internal)?;

    match db::apply_tap(&conn, user_id).map_err(internal)? {
        TapOutcome::NotFound => Err(ApiError::NotFound("User not found".to_string())),
        TapOutcome::NoEnergy => Ok(Json(TapResponse {
            success: false,
            fur: None,
            energy: None,
            message: Some("No energy".to_string()),
        })),
        TapOutcome::Tapped { fur, energy } => Ok(Json(TapResponse {
            success: true,
            fur: Some(fur),
            energy: Some(energy),
            message: None,
        })),
    }
}
