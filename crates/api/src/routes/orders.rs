//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{History, Order, OrderId, UserId};
use domain::{OrderDraft, OrderPatch, PaymentRequest};
use serde::Deserialize;
use store::{OrderStore, UserStore};

use crate::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::routes::Pagination;

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    /// Raw weight value as submitted, parsed and validated downstream.
    pub weight: String,
}

/// POST /order — place a new order.
#[tracing::instrument(skip(state, draft))]
pub async fn create<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(draft): Json<OrderDraft>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders.create_order(caller, draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — list the caller's active orders.
#[tracing::instrument(skip(state))]
pub async fn list_mine<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let query = page.to_query().for_user(caller.user_id);
    Ok(Json(state.orders.list_orders(caller, query).await?))
}

/// GET /orders/all — list every user's active orders (admin).
#[tracing::instrument(skip(state))]
pub async fn list_all<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(caller): AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders(caller, page.to_query()).await?))
}

/// GET /orders/user/:id — list one user's active orders (admin).
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(caller): AdminUser,
    Path(user_id): Path<i64>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let query = page.to_query().for_user(UserId::new(user_id));
    Ok(Json(state.orders.list_orders(caller, query).await?))
}

/// GET /order/:id — fetch a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_order(caller, &OrderId::new(id)).await?))
}

/// PUT /order/:id/edit — edit a created order's descriptive fields.
#[tracing::instrument(skip(state, patch))]
pub async fn edit<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .edit_order(caller, &OrderId::new(id), patch)
            .await?,
    ))
}

/// PUT /order/:id/cancel — cancel a created order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<History>, ApiError> {
    Ok(Json(
        state.orders.cancel_order(caller, &OrderId::new(id)).await?,
    ))
}

/// PUT /order/:id/accept — accept a created order (admin).
#[tracing::instrument(skip(state))]
pub async fn accept<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.accept_order(&OrderId::new(id)).await?))
}

/// PUT /order/:id/reject — reject a created order (admin).
#[tracing::instrument(skip(state))]
pub async fn reject<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<History>, ApiError> {
    Ok(Json(state.orders.reject_order(&OrderId::new(id)).await?))
}

/// PUT /order/:id/deliver — mark an accepted order delivered (admin).
#[tracing::instrument(skip(state))]
pub async fn deliver<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.deliver_order(&OrderId::new(id)).await?))
}

/// PUT /order/:id/weight — record the measured weight (admin).
#[tracing::instrument(skip(state, req))]
pub async fn weight<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(_caller): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<WeightRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .update_weight(&OrderId::new(id), &req.weight)
            .await?,
    ))
}

/// PUT /order/:id/pay — attach a payment transaction.
#[tracing::instrument(skip(state, payment))]
pub async fn pay<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(payment): Json<PaymentRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .pay_order(caller, &OrderId::new(id), payment)
            .await?,
    ))
}

/// PUT /order/:id/complete — confirm delivery, archiving the order.
#[tracing::instrument(skip(state))]
pub async fn complete<S: OrderStore + UserStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<History>, ApiError> {
    Ok(Json(
        state
            .orders
            .complete_order(caller, &OrderId::new(id))
            .await?,
    ))
}
