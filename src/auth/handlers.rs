use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{RegisterRequest, RegisterResponse},
        services::{is_valid_email, register_local, register_with_identity},
    },
    config::AuthBackend,
    error::ApiError,
    identity::OAuthProvider,
    state::AppState,
};

pub fn register_routes() -> Router<AppState> {
    Router::new().route("/auth/register", post(register))
}

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/oauth/google", get(google_oauth))
        .route("/auth/oauth/facebook", get(facebook_oauth))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Some(reg) = payload.into_registration() else {
        warn!("register missing fields");
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };

    if !is_valid_email(&reg.email) {
        warn!(email = %reg.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    let user = match state.config.auth_backend {
        AuthBackend::Local => register_local(&state, reg).await?,
        AuthBackend::Identity => register_with_identity(&state, reg).await?,
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Register success",
            user,
        }),
    ))
}

fn oauth_redirect(state: &AppState, provider: OAuthProvider) -> Result<Response, ApiError> {
    let url = state
        .identity
        .authorize_url(provider, &state.config.oauth_redirect_url)?;
    info!(provider = provider.as_str(), "oauth redirect");
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

#[instrument(skip(state))]
pub async fn google_oauth(State(state): State<AppState>) -> Result<Response, ApiError> {
    oauth_redirect(&state, OAuthProvider::Google)
}

#[instrument(skip(state))]
pub async fn facebook_oauth(State(state): State<AppState>) -> Result<Response, ApiError> {
    oauth_redirect(&state, OAuthProvider::Facebook)
}
