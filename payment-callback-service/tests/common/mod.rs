//! Common test utilities for payment-callback-service integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use payment_callback_service::config::{
    DatabaseConfig, GatewayConfig, PaymentCallbackConfig, PayloadConfig, RedirectConfig,
};
use payment_callback_service::models::{Coupon, Order, PaymentKind, Product, User};
use payment_callback_service::services::{
    CallbackPayload, Database, HmacGatewayVerifier, InMemoryStore,
};
use payment_callback_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::Secret;
use service_core::config::Config as CommonConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, Once};
use tower::ServiceExt;

pub const SIGN_KEY: &str = "test-gateway-sign-key";
pub const CHECKSUM_KEY: &str = "test-payload-checksum-key";
pub const BUYER: &str = "buyer@example.com";
pub const OTHER_USER: &str = "other@example.com";

/// Tea, two variants; 2 integral points per unit.
pub const TEA: i64 = 1;
/// Teapot, single stock, no points.
pub const TEAPOT: i64 = 2;

/// 2 × 250g tea at 30.00 plus 5.00 freight.
pub const TEA_ORDER: i64 = 101;
/// 1 teapot at 80.00.
pub const TEAPOT_ORDER: i64 = 102;
/// 2 × 500g tea at 55.00, but only one unit is in stock.
pub const SHORT_STOCK_ORDER: i64 = 103;
/// Belongs to another user.
pub const FOREIGN_ORDER: i64 = 104;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,payment_callback_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Connect to the database named by `TEST_DATABASE_URL` and bring its schema up to date.
pub async fn test_database() -> Database {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run the database tests");

    let db = Database::new(&database_url, 4, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");
    db
}

pub fn test_config() -> PaymentCallbackConfig {
    PaymentCallbackConfig {
        common: CommonConfig { port: 0 },
        service_name: "payment-callback-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        gateway: GatewayConfig {
            sign_key: Secret::new(SIGN_KEY.to_string()),
        },
        payload: PayloadConfig {
            checksum_key: Secret::new(CHECKSUM_KEY.to_string()),
        },
        redirect: RedirectConfig::default(),
    }
}

/// Router wired to a seeded in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    verifier: HmacGatewayVerifier,
}

pub async fn spawn_app() -> TestApp {
    init_tracing();

    let store = Arc::new(InMemoryStore::new());
    seed(&store).await;

    let state = AppState::new(test_config(), store.clone());

    TestApp {
        router: build_router(state),
        store,
        verifier: HmacGatewayVerifier::new(Secret::new(SIGN_KEY.to_string())),
    }
}

async fn seed(store: &InMemoryStore) {
    for (email, money) in [(BUYER, dec!(100)), (OTHER_USER, dec!(0))] {
        store
            .insert_user(User {
                email: email.to_string(),
                money,
            })
            .await;
    }

    store
        .insert_product(Product {
            id: TEA,
            title: "Green Tea".to_string(),
            market_price: dec!(35),
            integral: 2,
            spec: "250g:5;500g:1".to_string(),
        })
        .await;
    store
        .insert_product(Product {
            id: TEAPOT,
            title: "Teapot".to_string(),
            market_price: dec!(90),
            integral: 0,
            spec: "3".to_string(),
        })
        .await;

    let orders = [
        (TEA_ORDER, BUYER, TEA, 2, dec!(30), dec!(5), "250g"),
        (TEAPOT_ORDER, BUYER, TEAPOT, 1, dec!(80), dec!(0), ""),
        (SHORT_STOCK_ORDER, BUYER, TEA, 2, dec!(55), dec!(0), "500g"),
        (FOREIGN_ORDER, OTHER_USER, TEAPOT, 1, dec!(80), dec!(0), ""),
    ];
    for (id, email, product_id, quantity, unit_price, freight, spec_ref) in orders {
        store
            .insert_order(Order {
                id,
                user_email: email.to_string(),
                product_id,
                quantity,
                unit_price,
                freight,
                spec_ref: spec_ref.to_string(),
                is_paid: false,
                order_list_id: None,
            })
            .await;
    }
}

/// Sealed payload for a goods payment.
pub fn goods_body(order_ids: &[i64], coupon: Option<(i64, Decimal)>) -> String {
    CallbackPayload {
        kind: PaymentKind::Goods,
        order_ids: order_ids.to_vec(),
        user_email: BUYER.to_string(),
        coupon: coupon.map(|(id, amount)| Coupon { id, amount }),
        address_id: 7,
    }
    .seal(CHECKSUM_KEY)
    .expect("payload seals")
}

/// Sealed payload for an account recharge.
pub fn recharge_body(email: &str) -> String {
    CallbackPayload {
        kind: PaymentKind::Recharge,
        order_ids: vec![],
        user_email: email.to_string(),
        coupon: None,
        address_id: 0,
    }
    .seal(CHECKSUM_KEY)
    .expect("payload seals")
}

/// Unsigned gateway parameters.
pub fn callback_params(
    out_trade_no: &str,
    trade_no: &str,
    trade_status: &str,
    total_fee: &str,
    body: &str,
) -> BTreeMap<String, String> {
    [
        ("out_trade_no", out_trade_no),
        ("trade_no", trade_no),
        ("trade_status", trade_status),
        ("total_fee", total_fee),
        ("body", body),
        ("notify_type", "trade_status_sync"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Captured response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestApp {
    /// Attach the gateway signature to `params`.
    pub fn sign(&self, mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let sign = self.verifier.sign(&params).expect("params sign");
        params.insert("sign".to_string(), sign);
        params.insert("sign_type".to_string(), "HMAC-SHA256".to_string());
        params
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        self.send(request).await
    }

    pub async fn get_return(&self, params: &BTreeMap<String, String>) -> TestResponse {
        let query = serde_urlencoded::to_string(params).expect("query encodes");
        self.get(&format!("/alipay/return?{}", query)).await
    }

    pub async fn post_notify(&self, params: &BTreeMap<String, String>) -> TestResponse {
        let form = serde_urlencoded::to_string(params).expect("form encodes");
        let request = Request::builder()
            .method("POST")
            .uri("/alipay/notify")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("request builds");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body reads")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
