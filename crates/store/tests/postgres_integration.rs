//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{BuyerId, OrderId, ProductId};
use domain::{LineRequest, Money, OrderDraft, OrderStatus, Page};
use order_store::{OrderStore, PostgresOrderStore, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for schema setup
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE order_lines, orders, products RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

async fn seed_product(store: &PostgresOrderStore, name: &str, price_cents: i64, stock: i64) -> ProductId {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (name, price_cents, stock) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(price_cents)
    .bind(stock)
    .fetch_one(store.pool())
    .await
    .unwrap();
    ProductId::new(id)
}

async fn stock_of(store: &PostgresOrderStore, id: ProductId) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(id.as_i64())
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn order_rows(store: &PostgresOrderStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn line_rows(store: &PostgresOrderStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

fn draft(buyer: i64, lines: Vec<LineRequest>) -> OrderDraft {
    OrderDraft::new(BuyerId::new(buyer), lines).unwrap()
}

#[tokio::test]
#[serial]
async fn placement_commits_order_lines_and_decrement() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;

    let placed = store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 3)]))
        .await
        .unwrap();

    assert!(placed.number.as_str().starts_with("ORD"));
    assert_eq!(stock_of(&store, product).await, 2);

    let order = store.get_order(placed.id).await.unwrap().unwrap();
    assert_eq!(order.buyer_id, BuyerId::new(1));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Money::from_cents(3000));
    assert_eq!(order.number, placed.number);

    let lines = store.list_lines(placed.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, product);
    assert_eq!(lines[0].quantity, 3);
    assert_eq!(lines[0].unit_price, Money::from_cents(1000));
    assert_eq!(lines[0].subtotal, Money::from_cents(3000));
}

#[tokio::test]
#[serial]
async fn total_equals_sum_of_subtotals_across_products() {
    let store = get_test_store().await;
    let a = seed_product(&store, "A", 250, 10).await;
    let b = seed_product(&store, "B", 1999, 10).await;

    let placed = store
        .place_order(draft(
            7,
            vec![
                LineRequest::new(b.as_i64(), 2),
                LineRequest::new(a.as_i64(), 4),
            ],
        ))
        .await
        .unwrap();

    let order = store.get_order(placed.id).await.unwrap().unwrap();
    let lines = store.list_lines(placed.id).await.unwrap();
    assert_eq!(lines.len(), 2);

    let sum = lines
        .iter()
        .fold(Money::zero(), |acc, line| acc.add(line.subtotal));
    assert_eq!(order.total_amount, sum);
    assert_eq!(stock_of(&store, a).await, 6);
    assert_eq!(stock_of(&store, b).await, 8);
}

#[tokio::test]
#[serial]
async fn insufficient_stock_rolls_back_everything() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 2).await;

    let err = store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 5)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            available: 2,
            requested: 5,
            ..
        }
    ));
    assert_eq!(stock_of(&store, product).await, 2);
    assert_eq!(order_rows(&store).await, 0);
    assert_eq!(line_rows(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn missing_product_leaves_no_partial_rows() {
    let store = get_test_store().await;

    let err = store
        .place_order(draft(1, vec![LineRequest::new(999_999, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::ProductNotFound(id) if id.as_i64() == 999_999));
    assert_eq!(order_rows(&store).await, 0);
    assert_eq!(line_rows(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn soft_deleted_product_aborts_placement() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Retired", 500, 5).await;
    sqlx::query("UPDATE products SET is_deleted = TRUE WHERE id = $1")
        .bind(product.as_i64())
        .execute(store.pool())
        .await
        .unwrap();

    let err = store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::ProductUnavailable(id) if id == product));
    assert_eq!(stock_of(&store, product).await, 5);
    assert_eq!(order_rows(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn failing_second_line_undoes_first_decrement() {
    let store = get_test_store().await;
    let a = seed_product(&store, "A", 100, 10).await;
    let b = seed_product(&store, "B", 100, 1).await;

    let err = store
        .place_order(draft(
            1,
            vec![
                LineRequest::new(a.as_i64(), 2),
                LineRequest::new(b.as_i64(), 5),
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InsufficientStock { .. }));
    // Product A was locked and decremented before B failed; the rollback
    // must restore it.
    assert_eq!(stock_of(&store, a).await, 10);
    assert_eq!(stock_of(&store, b).await, 1);
    assert_eq!(order_rows(&store).await, 0);
    assert_eq!(line_rows(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn unit_price_is_a_snapshot() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;

    let placed = store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 1)]))
        .await
        .unwrap();

    sqlx::query("UPDATE products SET price_cents = 9999 WHERE id = $1")
        .bind(product.as_i64())
        .execute(store.pool())
        .await
        .unwrap();

    let lines = store.list_lines(placed.id).await.unwrap();
    assert_eq!(lines[0].unit_price, Money::from_cents(1000));
    let order = store.get_order(placed.id).await.unwrap().unwrap();
    assert_eq!(order.total_amount, Money::from_cents(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn concurrent_contention_yields_exactly_one_success() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Hot item", 100, 5).await;

    let s1 = store.clone();
    let s2 = store.clone();
    let pid = product.as_i64();
    let t1 = tokio::spawn(async move {
        s1.place_order(draft(1, vec![LineRequest::new(pid, 3)])).await
    });
    let t2 = tokio::spawn(async move {
        s2.place_order(draft(2, vec![LineRequest::new(pid, 3)])).await
    });

    let (r1, r2) = (t1.await.unwrap(), t2.await.unwrap());
    let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two orders must win");

    // The loser observed the winner's committed decrement under its own
    // lock, so the failure is InsufficientStock, not a write conflict.
    let loser = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(
        loser.unwrap_err(),
        StoreError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));

    assert_eq!(stock_of(&store, product).await, 2);
    assert_eq!(order_rows(&store).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn opposite_caller_order_does_not_deadlock() {
    let store = get_test_store().await;
    let a = seed_product(&store, "A", 100, 10).await;
    let b = seed_product(&store, "B", 100, 10).await;

    // Drafts reference the products in opposite caller order; the draft
    // sorts them, so both placements lock A before B and neither waits
    // on a cycle.
    let s1 = store.clone();
    let s2 = store.clone();
    let (a_id, b_id) = (a.as_i64(), b.as_i64());
    let t1 = tokio::spawn(async move {
        s1.place_order(draft(
            1,
            vec![LineRequest::new(a_id, 1), LineRequest::new(b_id, 2)],
        ))
        .await
    });
    let t2 = tokio::spawn(async move {
        s2.place_order(draft(
            2,
            vec![LineRequest::new(b_id, 1), LineRequest::new(a_id, 2)],
        ))
        .await
    });

    t1.await.unwrap().unwrap();
    t2.await.unwrap().unwrap();

    assert_eq!(stock_of(&store, a).await, 7);
    assert_eq!(stock_of(&store, b).await, 7);
}

#[tokio::test]
#[serial]
async fn status_update_persists_and_missing_order_errors() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 100, 5).await;
    let placed = store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 1)]))
        .await
        .unwrap();

    store
        .update_status(placed.id, OrderStatus::Processing)
        .await
        .unwrap();
    let order = store.get_order(placed.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);

    let err = store
        .update_status(OrderId::new(123_456), OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OrderNotFound(_)));
}

#[tokio::test]
#[serial]
async fn order_listing_pages_and_counts() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 100, 100).await;
    for buyer in 1..=5 {
        store
            .place_order(draft(buyer, vec![LineRequest::new(product.as_i64(), 1)]))
            .await
            .unwrap();
    }

    let first = store.list_orders(Page::new(1, 2).unwrap()).await.unwrap();
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.total_items, 5);
    assert_eq!(first.total_pages, 3);
    assert!(first.data[0].id < first.data[1].id);

    let last = store.list_orders(Page::new(3, 2).unwrap()).await.unwrap();
    assert_eq!(last.data.len(), 1);
}

#[tokio::test]
#[serial]
async fn product_listing_excludes_soft_deleted() {
    let store = get_test_store().await;
    seed_product(&store, "Active", 100, 1).await;
    let retired = seed_product(&store, "Retired", 100, 1).await;
    sqlx::query("UPDATE products SET is_deleted = TRUE WHERE id = $1")
        .bind(retired.as_i64())
        .execute(store.pool())
        .await
        .unwrap();

    let page = store.list_products(Page::new(1, 50).unwrap()).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.data[0].name, "Active");
}

#[tokio::test]
#[serial]
async fn stats_aggregate_totals_and_today() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 10).await;
    store
        .place_order(draft(1, vec![LineRequest::new(product.as_i64(), 2)]))
        .await
        .unwrap();
    store
        .place_order(draft(2, vec![LineRequest::new(product.as_i64(), 1)]))
        .await
        .unwrap();

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_amount, Money::from_cents(3000));
    assert_eq!(stats.today_orders, 2);
    assert_eq!(stats.today_amount, Money::from_cents(3000));
}

#[tokio::test]
#[serial]
async fn duplicate_order_number_is_rejected_by_constraint() {
    let store = get_test_store().await;

    sqlx::query("INSERT INTO orders (buyer_id, number) VALUES (1, 'ORD-dup')")
        .execute(store.pool())
        .await
        .unwrap();
    let result = sqlx::query("INSERT INTO orders (buyer_id, number) VALUES (2, 'ORD-dup')")
        .execute(store.pool())
        .await;

    assert!(result.is_err());
}
