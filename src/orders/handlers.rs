use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, instrument};

use super::{format::OrderView, repo};
use crate::{error::ApiError, extractors::UuidPath, state::AppState};

pub fn order_routes() -> Router<AppState> {
    Router::new().route("/orders/my-orders/:user_id", get(my_orders))
}

#[instrument(skip(state))]
pub async fn my_orders(
    State(state): State<AppState>,
    UuidPath(user_id): UuidPath,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let rows = repo::list_by_user(&state.db, user_id).await?;
    debug!(%user_id, orders = rows.len(), "orders loaded");
    Ok(Json(rows.into_iter().map(OrderView::from).collect()))
}
