//! Account and session endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{User, UserId};
use domain::{
    LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest, UserError,
};
use serde::Serialize;
use store::{OrderStore, UserStore};

use crate::AppState;
use crate::auth::{AdminUser, AuthUser, RefreshUser, TokenPair};
use crate::error::ApiError;

/// Response for register and login: the account plus a token pair.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// POST /register — create a customer account.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = state.users.register(req).await?;
    let tokens = state.auth.issue_pair(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

/// POST /login — authenticate and receive a token pair.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state.users.login(req).await?;
    let tokens = state.auth.issue_pair(&user)?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// POST /refresh — trade a refresh token for a fresh pair.
///
/// The account is re-checked so a ban issued after login cuts the
/// session off at the next refresh.
#[tracing::instrument(skip(state))]
pub async fn refresh<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RefreshUser(caller): RefreshUser,
) -> Result<Json<TokenPair>, ApiError> {
    let user = state.users.get_user(caller.user_id).await?;
    if user.is_banned {
        return Err(UserError::Banned.into());
    }
    Ok(Json(state.auth.issue_pair(&user)?))
}

/// GET /me — the caller's own account.
#[tracing::instrument(skip(state))]
pub async fn me<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_user(caller.user_id).await?))
}

/// PUT /me/profile — update the caller's profile fields.
#[tracing::instrument(skip(state, req))]
pub async fn update_profile<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update_profile(caller.user_id, req).await?))
}

/// PUT /me/password — change the caller's password.
#[tracing::instrument(skip(state, req))]
pub async fn update_password<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update_password(caller.user_id, req).await?))
}

/// GET /users — list all accounts (admin).
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list_users(false).await?))
}

/// GET /users/banned — list banned accounts (admin).
#[tracing::instrument(skip(state))]
pub async fn list_banned<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list_users(true).await?))
}

/// GET /user/:id — fetch an account by id (admin).
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_user(UserId::new(id)).await?))
}

/// PUT /user/:id/ban — ban an account (admin).
#[tracing::instrument(skip(state))]
pub async fn ban<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.ban_user(UserId::new(id)).await?))
}

/// PUT /user/:id/unban — lift a ban (admin).
#[tracing::instrument(skip(state))]
pub async fn unban<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.unban_user(UserId::new(id)).await?))
}
