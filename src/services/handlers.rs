use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{
    dto::ServiceDetails,
    query::{build_service_search, ServiceFilter, ServiceListQuery},
    repo::{self, ServiceSummary},
    validation::{ValidatedCreateService, ValidatedUpdateService},
    workflow,
};
use crate::{error::ApiError, extractors::IdPath, state::AppState};

/// Room for a 5MB image plus the text fields, so oversize images reach validation.
const SERVICE_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/:id", get(get_service).delete(delete_service))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/services", post(create_service))
        .route("/services/:id", axum::routing::put(update_service))
        .layer(DefaultBodyLimit::max(SERVICE_BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list_services(
    State(state): State<AppState>,
    Query(q): Query<ServiceListQuery>,
) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    let filter = ServiceFilter::from_query(&q).map_err(ApiError::Validation)?;
    let built = build_service_search(&filter);
    debug!(sql = built.sql(), params = built.params().len(), "service search");
    let rows = repo::search(&state.db, &built).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<ServiceDetails>, ApiError> {
    Ok(Json(workflow::service_details(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_service(
    State(state): State<AppState>,
    ValidatedCreateService(payload): ValidatedCreateService,
) -> Result<(StatusCode, Json<ServiceDetails>), ApiError> {
    let details = workflow::create_service(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state, changes))]
pub async fn update_service(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidatedUpdateService(changes): ValidatedUpdateService,
) -> Result<Json<ServiceDetails>, ApiError> {
    Ok(Json(workflow::update_service(&state, id, changes).await?))
}

#[instrument(skip(state))]
pub async fn delete_service(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Value>, ApiError> {
    workflow::delete_service(&state, id).await?;
    Ok(Json(json!({ "message": "Service deleted successfully" })))
}
