use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{dto::CategoryPayload, repo::Category};
use crate::{error::ApiError, extractors::IdPath, state::AppState};

const NOT_FOUND: &str = "Category not found";

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let rows = Category::list(&state.db).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Category>, ApiError> {
    Category::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let Some(name) = payload.name() else {
        warn!("category name missing");
        return Err(ApiError::BadRequest("Name is required".into()));
    };

    let category = Category::create(&state.db, name, payload.name_th.as_deref()).await?;
    info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<Category>, ApiError> {
    let Some(name) = payload.name() else {
        return Err(ApiError::BadRequest("Name is required".into()));
    };

    Category::update(&state.db, id, name, payload.name_th.as_deref())
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Value>, ApiError> {
    if !Category::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    info!(category_id = id, "category deleted");
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
