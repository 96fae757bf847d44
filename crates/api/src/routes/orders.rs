//! Order endpoints: placement, listing, status updates, and statistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, ProductId};
use domain::{LineRequest, Order, OrderDraft, OrderLine, OrderStatus, Page};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub number: String,
    pub status: String,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub data: Vec<OrderResponse>,
    pub page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: i64,
    pub order_number: String,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct OrderStatsResponse {
    pub total_orders: i64,
    pub total_amount_cents: i64,
    pub today_orders: i64,
    pub today_amount_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.as_i64(),
            user_id: order.buyer_id.as_i64(),
            number: order.number.into(),
            status: order.status.to_string(),
            total_amount_cents: order.total_amount.cents(),
            created_at: order.created_at,
        }
    }
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id.as_i64(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal.cents(),
        }
    }
}

// -- Handlers --

/// POST /api/orders — place a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let lines = req
        .items
        .iter()
        .map(|item| LineRequest::new(ProductId::new(item.product_id), item.quantity))
        .collect();
    let draft = OrderDraft::new(BuyerId::new(req.user_id), lines)?;

    let placed = state.store.place_order(draft).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderPlacedResponse {
            order_id: placed.id.as_i64(),
            order_number: placed.number.into(),
        }),
    ))
}

/// GET /api/orders — paged order listing.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(20))?;
    let orders = state.store.list_orders(page).await?;

    Ok(Json(OrderListResponse {
        data: orders.data.into_iter().map(OrderResponse::from).collect(),
        page: orders.page,
        total_pages: orders.total_pages,
        total_items: orders.total_items,
    }))
}

/// GET /api/orders/:id — a single order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order_id = OrderId::new(id);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let lines = state.store.list_lines(order_id).await?;

    Ok(Json(OrderDetailResponse {
        order: OrderResponse::from(order),
        lines: lines.into_iter().map(OrderLineResponse::from).collect(),
    }))
}

/// PUT /api/orders/:id/status — update an order's lifecycle status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let status: OrderStatus = req.status.parse()?;
    state.store.update_status(OrderId::new(id), status).await?;
    Ok(Json(UpdateStatusResponse { success: true }))
}

/// GET /api/orders/stats — aggregate order statistics.
#[tracing::instrument(skip(state))]
pub async fn stats<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderStatsResponse>, ApiError> {
    let stats = state.store.order_stats().await?;
    Ok(Json(OrderStatsResponse {
        total_orders: stats.total_orders,
        total_amount_cents: stats.total_amount.cents(),
        today_orders: stats.today_orders,
        today_amount_cents: stats.today_amount.cents(),
    }))
}
