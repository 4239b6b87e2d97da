use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::{
    DomainError, FrequencyBounds, Hardware, LedgerResponse, QuantityRequest, ScanRequest,
    ScanResponse, SkillFrequency, User, UserUpdate,
};
use tower_http::trace::TraceLayer;

use crate::db::DbPool;
use crate::error::ServiceError;
use crate::ledger::HardwareLedger;
use crate::profiles::UserService;
use crate::queries::RosterQueries;

#[derive(Clone)]
pub struct AppState {
    pub ledger: HardwareLedger,
    pub users: UserService,
    pub queries: RosterQueries,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            ledger: HardwareLedger::new(pool.clone()),
            users: UserService::new(pool.clone()),
            queries: RosterQueries::new(pool),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).patch(update_user))
        .route("/users/:id/scans", post(scan_user))
        .route("/skills", get(list_skills))
        .route("/hardware", get(list_hardware))
        .route("/hardware/:id", get(get_hardware))
        .route("/hardware/:id/checkout", post(check_out_hardware))
        .route("/hardware/:id/checkin", post(check_in_hardware))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub fn error_response(error: ServiceError) -> ApiError {
    let status = match &error {
        ServiceError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
        ServiceError::Domain(DomainError::InsufficientStock { .. })
        | ServiceError::Domain(DomainError::InsufficientOwnership { .. })
        | ServiceError::LedgerConflict { .. } => StatusCode::CONFLICT,
        ServiceError::Domain(DomainError::Validation(_)) => StatusCode::BAD_REQUEST,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let message = if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
        "internal error".to_string()
    } else {
        tracing::warn!("Request rejected: {}", error);
        error.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            code: error.code().to_string(),
        }),
    )
}

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.queries.list_users().await)
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<i32>) -> ApiResult<User> {
    match state.queries.get_user(user_id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(error_response(DomainError::user_not_found(user_id).into())),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<User> {
    state
        .users
        .update_user(user_id, update)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn scan_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<ScanResponse> {
    let recorded = state
        .users
        .record_scan(user_id, &request.event)
        .await
        .map_err(error_response)?;

    Ok(Json(ScanResponse { recorded }))
}

pub async fn list_skills(
    State(state): State<AppState>,
    Query(bounds): Query<FrequencyBounds>,
) -> Json<Vec<SkillFrequency>> {
    Json(state.queries.list_skill_frequency(bounds).await)
}

pub async fn list_hardware(State(state): State<AppState>) -> Json<Vec<Hardware>> {
    Json(state.queries.list_hardware().await)
}

pub async fn get_hardware(
    State(state): State<AppState>,
    Path(hardware_id): Path<i32>,
) -> ApiResult<Hardware> {
    match state.queries.get_hardware(hardware_id).await {
        Ok(Some(item)) => Ok(Json(item)),
        Ok(None) => Err(error_response(DomainError::hardware_not_found(hardware_id).into())),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn check_out_hardware(
    State(state): State<AppState>,
    Path(hardware_id): Path<i32>,
    Json(request): Json<QuantityRequest>,
) -> ApiResult<LedgerResponse> {
    let success = state
        .ledger
        .check_out(hardware_id, request.user_id, request.quantity)
        .await
        .map_err(error_response)?;

    Ok(Json(LedgerResponse { success }))
}

pub async fn check_in_hardware(
    State(state): State<AppState>,
    Path(hardware_id): Path<i32>,
    Json(request): Json<QuantityRequest>,
) -> ApiResult<LedgerResponse> {
    let success = state
        .ledger
        .check_in(hardware_id, request.user_id, request.quantity)
        .await
        .map_err(error_response)?;

    Ok(Json(LedgerResponse { success }))
}

pub async fn health_check() -> &'static str {
    "OK"
}
