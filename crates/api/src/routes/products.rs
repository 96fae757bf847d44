//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::{Page, Product};
use order_store::OrderStore;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::orders::PageParams;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
}

#[derive(Serialize)]
pub struct ProductListResponse {
    pub data: Vec<ProductResponse>,
    pub page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
        }
    }
}

/// GET /api/products — paged listing of active products.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(50))?;
    let products = state.store.list_products(page).await?;

    Ok(Json(ProductListResponse {
        data: products
            .data
            .into_iter()
            .map(ProductResponse::from)
            .collect(),
        page: products.page,
        total_pages: products.total_pages,
        total_items: products.total_items,
    }))
}
