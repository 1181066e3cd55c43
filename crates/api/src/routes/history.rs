//! Archived-order read endpoints. History is append-only; there are no
//! write routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{History, OrderId, UserId};
use store::{OrderStore, UserStore};

use crate::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::routes::Pagination;

/// GET /histories — list the caller's archived orders.
#[tracing::instrument(skip(state))]
pub async fn list_mine<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<History>>, ApiError> {
    let query = page.to_query().for_user(caller.user_id);
    Ok(Json(state.orders.list_history(caller, query).await?))
}

/// GET /histories/all — list every user's archived orders (admin).
#[tracing::instrument(skip(state))]
pub async fn list_all<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(caller): AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<History>>, ApiError> {
    Ok(Json(state.orders.list_history(caller, page.to_query()).await?))
}

/// GET /histories/user/:id — list one user's archived orders (admin).
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(caller): AdminUser,
    Path(user_id): Path<i64>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<History>>, ApiError> {
    let query = page.to_query().for_user(UserId::new(user_id));
    Ok(Json(state.orders.list_history(caller, query).await?))
}

/// GET /history/:id — fetch an archived order by its original id.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<History>, ApiError> {
    Ok(Json(
        state.orders.get_history(caller, &OrderId::new(id)).await?,
    ))
}
