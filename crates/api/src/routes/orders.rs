//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use lifecycle::{InventoryPort, OrderEngine};
use order_store::{InvalidOrderStatus, Order, OrderLine, OrderStatus, OrderStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Page size used when the caller does not supply one.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore, I: InventoryPort> {
    pub engine: OrderEngine<S, I>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub total_cents: i64,
    #[serde(default)]
    pub shipping_address: String,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
    pub address: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct DetailsQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Uuid,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: OrderId,
}

#[derive(Serialize)]
pub struct SettleOrderResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: OrderBody,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<OrderBody>,
    pub total: u64,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct OrderBody {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItemBody>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemBody {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<Order> for OrderBody {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.owner_id,
            items: order
                .lines
                .into_iter()
                .map(|line| OrderItemBody {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total.cents(),
            status: order.status,
            shipping_address: order.shipping_address,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn parse_status(s: &str) -> Result<OrderStatus, ApiError> {
    s.parse()
        .map_err(|e: InvalidOrderStatus| ApiError::BadRequest(e.to_string()))
}

// -- Handlers --

/// POST /orders — create a new pending order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let lines: Vec<OrderLine> = req
        .items
        .iter()
        .map(|item| {
            OrderLine::new(
                item.product_id.as_str(),
                item.product_name.as_str(),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();

    let order = state
        .engine
        .create_order(
            UserId::from_uuid(req.user_id),
            lines,
            Money::from_cents(req.total_cents),
            req.shipping_address,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            order_id: order.id,
        }),
    ))
}

/// POST /orders/:id/settle — settle a pending order.
#[tracing::instrument(skip(state))]
pub async fn settle<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettleOrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let status = state.engine.settle_order(order_id).await?;

    Ok(Json(SettleOrderResponse {
        success: true,
        order_id,
        status,
    }))
}

/// GET /orders/:id — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.get_order(OrderId::from_uuid(id)).await?;

    Ok(Json(OrderResponse {
        success: true,
        order: order.into(),
    }))
}

/// GET /orders/:id/details — load an order, checking ownership.
#[tracing::instrument(skip(state, query))]
pub async fn details<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .get_order_details(OrderId::from_uuid(id), UserId::from_uuid(query.user_id))
        .await?;

    Ok(Json(OrderResponse {
        success: true,
        order: order.into(),
    }))
}

/// GET /orders — list a user's orders, paged and filtered to one status.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => OrderStatus::Pending,
    };

    let page = state
        .engine
        .list_user_orders(
            UserId::from_uuid(query.user_id),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            status,
        )
        .await?;

    Ok(Json(OrderListResponse {
        success: true,
        orders: page.orders.into_iter().map(Into::into).collect(),
        total: page.total,
    }))
}

/// PUT /orders/:id — administrative status/address overwrite.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let status = parse_status(&req.status)?;
    state
        .engine
        .update_order(OrderId::from_uuid(id), status, req.address)
        .await?;

    Ok(Json(AckResponse { success: true }))
}

/// POST /orders/:id/cancel — cancel a pending or paid order.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: OrderStore + 'static, I: InventoryPort + 'static>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .engine
        .cancel_order(OrderId::from_uuid(id), &req.reason)
        .await?;

    Ok(Json(AckResponse { success: true }))
}
