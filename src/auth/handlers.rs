use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    accounts::{dto::PublicAccount, error::AccountError},
    auth::{
        dto::{LoginRequest, LoginResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Response> {
    let account = state
        .accounts
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(IntoResponse::into_response)?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(account.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Could not start session".to_string()).into_response()
    })?;

    info!(account_id = account.id, "session started");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        account: account.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
) -> Result<Json<PublicAccount>, Response> {
    match state.accounts.get(account_id).await {
        Ok(account) => Ok(Json(account.into())),
        // token outlived its account
        Err(AccountError::NotFound(_)) => {
            Err((StatusCode::UNAUTHORIZED, "Account not found".to_string()).into_response())
        }
        Err(e) => Err(e.into_response()),
    }
}
