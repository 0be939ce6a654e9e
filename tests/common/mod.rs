#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use clothingstore_api::{
    auth::{AuthService, TokenPair},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        accounts::UserModel,
        catalog::{product_size, CategoryModel, ProductModel, SizeModel, SizeType},
        commerce::{Coupon, CouponModel, DiscountType},
    },
    errors::ServiceError,
    handlers::AppServices,
    services::{
        accounts::RegisterInput,
        catalog::{CategoryInput, ProductInput, SizeInput},
        commerce::CouponInput,
        payments::{payment_signature, GatewayOrder, PaymentGateway},
    },
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key_for_integration_tests_7Hq2";
pub const GATEWAY_SECRET: &str = "gw_test_secret";

/// Gateway double: numbered order ids and real HMAC signatures.
pub struct FakeGateway {
    next_id: AtomicU64,
    pub fail_create: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            fail_create: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        "gw_test_key"
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ServiceError::PaymentGateway("gateway unavailable".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".into()),
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError> {
        let expected = payment_signature(GATEWAY_SECRET, gateway_order_id, payment_id)?;
        Ok(expected == signature)
    }
}

/// A seeded account and its bearer token
pub struct TestUser {
    pub user: UserModel,
    pub token: String,
}

/// Full router over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub customer: TestUser,
    pub admin: TestUser,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            sqlx_logging: false,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.low_stock_threshold = 5;
        let cfg = Arc::new(cfg);

        let gateway = Arc::new(FakeGateway::new());
        let auth = Arc::new(AuthService::new(cfg.as_ref().into()));
        let services = AppServices::new(db_arc.clone(), cfg.clone(), gateway.clone());

        let state = AppState {
            db: db_arc,
            config: cfg,
            auth,
            services,
        };
        let router = clothingstore_api::build_router(state.clone());

        let customer = Self::register(&state, "asha", "asha@example.com", false).await;
        let admin = Self::register(&state, "admin", "admin@example.com", true).await;

        Self {
            router,
            state,
            gateway,
            customer,
            admin,
        }
    }

    async fn register(state: &AppState, username: &str, email: &str, staff: bool) -> TestUser {
        let accounts = &state.services.accounts;
        let mut user = accounts
            .register(RegisterInput {
                username: username.to_string(),
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: username.to_string(),
                password: "s3cret-pass".to_string(),
                password2: "s3cret-pass".to_string(),
            })
            .await
            .expect("seed user");
        if staff {
            user = accounts.grant_admin(email).await.expect("grant admin");
        }
        let TokenPair { access_token, .. } =
            state.auth.generate_token(&user).expect("mint token");
        TestUser {
            user,
            token: access_token,
        }
    }

    /// Another shopper with a fresh token.
    pub async fn new_customer(&self, username: &str) -> TestUser {
        Self::register(
            &self.state,
            username,
            &format!("{username}@example.com"),
            false,
        )
        .await
    }

    pub fn customer_token(&self) -> &str {
        &self.customer.token
    }

    pub fn admin_token(&self) -> &str {
        &self.admin.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    /// Send a prebuilt request.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as the default shopper.
    pub async fn as_customer(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.customer.token))
            .await
    }

    /// Request as the staff account.
    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.admin.token)).await
    }

    // ----- seed helpers -----

    pub async fn seed_category(&self, name: &str) -> CategoryModel {
        self.state
            .services
            .catalog
            .create_category(CategoryInput {
                name: name.to_string(),
                slug: None,
                description: None,
                is_active: true,
            })
            .await
            .expect("seed category")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> ProductModel {
        let category = self.seed_category(&format!("{name} category")).await;
        self.seed_product_in(&category, name, price, stock).await
    }

    pub async fn seed_product_in(
        &self,
        category: &CategoryModel,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> ProductModel {
        self.state
            .services
            .catalog
            .create_product(ProductInput {
                category_id: category.id,
                name: name.to_string(),
                slug: None,
                description: format!("{name} for tests"),
                price,
                discount_price: None,
                stock,
                available_colors: vec!["Black".into(), "White".into()],
                is_active: true,
                is_featured: false,
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_size(&self, name: &str, sort_order: i32) -> SizeModel {
        self.state
            .services
            .catalog
            .create_size(SizeInput {
                name: name.to_string(),
                display_name: format!("Size {name}"),
                size_type: SizeType::Clothing,
                sort_order,
                is_active: true,
            })
            .await
            .expect("seed size")
    }

    /// Stock a product in one size.
    pub async fn stock_size(&self, product: &ProductModel, size: &SizeModel, quantity: i32) {
        product_size::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            size_id: Set(size.id),
            quantity: Set(quantity),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product size");
    }

    pub async fn seed_coupon(&self, input: CouponInput) -> CouponModel {
        self.state
            .services
            .coupons
            .create(input)
            .await
            .expect("seed coupon")
    }

    pub async fn reload_coupon(&self, id: Uuid) -> CouponModel {
        Coupon::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("load coupon")
            .expect("coupon exists")
    }

    /// Put `quantity` of a size-less product in the shopper's cart.
    pub async fn add_to_cart(&self, token: &str, product_id: Uuid, quantity: i32) -> Response {
        self.request(
            Method::POST,
            "/api/v1/cart/items",
            Some(serde_json::json!({ "product_id": product_id, "quantity": quantity })),
            Some(token),
        )
        .await
    }
}

/// Coupon valid from yesterday for a month.
pub fn coupon_input(code: &str, discount_type: DiscountType, value: Decimal) -> CouponInput {
    let now = Utc::now();
    CouponInput {
        code: code.to_string(),
        description: None,
        discount_type,
        discount_value: value,
        min_order_amount: Decimal::ZERO,
        max_discount: None,
        valid_from: now - Duration::days(1),
        valid_to: now + Duration::days(30),
        is_active: true,
        usage_limit: 100,
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a decimal that may be serialized as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub fn shipping_body() -> Value {
    serde_json::json!({
        "full_name": "Asha Rao",
        "email": "asha@example.com",
        "phone": "9876543210",
        "address": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "zip_code": "560001"
    })
}
