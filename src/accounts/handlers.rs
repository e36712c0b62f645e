use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::{AuthRejection, AuthUser},
    state::AppState,
};

use super::dto::{CreateAccountRequest, PublicAccount, UpdateAccountRequest};
use super::error::AccountError;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/:id", get(get_account))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/:id", put(update_account).delete(delete_account))
}

#[instrument(skip(state))]
pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<PublicAccount>>, AccountError> {
    let accounts = state.accounts.list().await?;
    Ok(Json(accounts.into_iter().map(PublicAccount::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicAccount>, AccountError> {
    Ok(Json(state.accounts.get(id).await?.into()))
}

/// POST /accounts
///
/// Needs a session, except while no account exists yet so the first
/// operator can register. A rejected token on a non-empty store is
/// answered with the extractor's own message.
#[instrument(skip(state, caller, payload))]
pub async fn create_account(
    State(state): State<AppState>,
    caller: Result<AuthUser, AuthRejection>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Response, Response> {
    let name = payload.name.as_str();
    let email = payload.email.as_str();
    let phone = payload.phone.as_deref();
    let password = payload.password.as_str();

    let account = match caller {
        Ok(_) => state
            .accounts
            .create(name, email, phone, password)
            .await
            .map_err(IntoResponse::into_response)?,
        Err(rejection) => {
            let first = state
                .accounts
                .create_first(name, email, phone, password)
                .await
                .map_err(IntoResponse::into_response)?;
            match first {
                Some(account) => {
                    info!(account_id = account.id, "registered first account");
                    account
                }
                None => {
                    warn!("anonymous registration refused");
                    return Err(rejection.into_response());
                }
            }
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/accounts/{}", account.id).parse::<HeaderValue>() {
        headers.insert(header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(PublicAccount::from(account)),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<PublicAccount>, AccountError> {
    let account = state
        .accounts
        .update(id, &payload.name, &payload.email, payload.phone.as_deref())
        .await?;
    Ok(Json(account.into()))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AccountError> {
    state.accounts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
