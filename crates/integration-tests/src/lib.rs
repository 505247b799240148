//! Integration test harness for Bramble.
//!
//! Spins up an in-process mock of the commerce backend's store/auth APIs
//! on an ephemeral port, then wires a real client stack against it. The
//! mock keeps carts in memory, records every request it serves, and can
//! be switched into a handful of failure modes (missing login token,
//! revoked sessions, rejected completion, slow mutations).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use bramble_client::state::{CartState, RegionState, Session};
use bramble_client::storage::{KeyValueStore, MemoryStore, TokenStore};
use bramble_client::{ApiClient, StoreConfig};

/// Bearer token the mock issues on login/register.
pub const TEST_TOKEN: &str = "token_test_session";

/// Publishable key the harness configures the client with.
pub const TEST_PUBLISHABLE_KEY: &str = "pk_test_bramble";

// =============================================================================
// Mock Backend
// =============================================================================

/// One request the mock served, for assertions on call patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Default)]
struct Flags {
    omit_login_token: bool,
    reject_credentials: bool,
    tokens_revoked: bool,
    completion_error: Option<String>,
    mutation_delay: Duration,
}

struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    carts: Mutex<HashMap<String, Value>>,
    orders: Mutex<Vec<Value>>,
    customer: Mutex<Value>,
    flags: Mutex<Flags>,
    next_id: AtomicU64,
}

impl MockState {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            carts: Mutex::new(HashMap::new()),
            orders: Mutex::new(Vec::new()),
            customer: Mutex::new(json!({
                "id": "cus_01",
                "email": "shopper@example.com",
                "first_name": "Sam",
                "last_name": "Shopper",
            })),
            flags: Mutex::new(Flags::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{n:02}")
    }

    fn flags(&self) -> std::sync::MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn carts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn mutation_delay(&self) {
        let delay = self.flags().mutation_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// In-process mock commerce backend.
pub struct MockBackend {
    base_url: String,
    state: Arc<MockState>,
}

/// Install a test-writer tracing subscriber, once per process.
///
/// Honors `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockBackend {
    /// Bind the mock on an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        init_tracing();
        let state = Arc::new(MockState::new());
        let router = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make the next login responses omit the token field.
    pub fn omit_login_token(&self) {
        self.state.flags().omit_login_token = true;
    }

    /// Make login answer 401 with an invalid-credentials message.
    pub fn reject_credentials(&self) {
        self.state.flags().reject_credentials = true;
    }

    /// Make every authenticated endpoint answer 401 from now on.
    pub fn revoke_tokens(&self) {
        self.state.flags().tokens_revoked = true;
    }

    /// Make cart completion fail with the given message.
    pub fn reject_completion(&self, message: &str) {
        self.state.flags().completion_error = Some(message.to_string());
    }

    /// Delay every line-item mutation, to hold the client's in-flight
    /// guard long enough for a second call to collide with it.
    pub fn set_mutation_delay(&self, delay: Duration) {
        self.state.flags().mutation_delay = delay;
    }

    /// Every request served so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many requests matched the given method and exact path.
    #[must_use]
    pub fn count_requests(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// The server-side cart JSON, if the cart still exists.
    #[must_use]
    pub fn server_cart(&self, cart_id: &str) -> Option<Value> {
        self.state.carts().get(cart_id).cloned()
    }
}

// =============================================================================
// Client Harness
// =============================================================================

/// A full client stack wired against a fresh mock backend.
pub struct TestApp {
    pub backend: MockBackend,
    pub api: ApiClient,
    pub session: Session,
    pub regions: RegionState,
    pub cart: CartState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Spawn a mock backend and build the client stack against it.
    pub async fn spawn() -> Self {
        let backend = MockBackend::spawn().await;
        let config = StoreConfig::new(backend.base_url(), TEST_PUBLISHABLE_KEY)
            .expect("test store config");

        let store = Arc::new(MemoryStore::new());
        let kv: Arc<dyn KeyValueStore> = Arc::clone(&store) as Arc<dyn KeyValueStore>;
        let tokens = TokenStore::new(Arc::clone(&kv));

        let api = ApiClient::new(&config, tokens).expect("api client");
        let session = Session::new(api.clone());
        let regions = RegionState::new(api.clone(), Arc::clone(&kv));
        let cart = CartState::new(api.clone(), kv);

        Self {
            backend,
            api,
            session,
            regions,
            cart,
            store,
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/customer/emailpass", post(login))
        .route("/auth/customer/emailpass/register", post(register))
        .route("/auth/customer/emailpass/logout", post(ok_empty))
        .route("/auth/customer/emailpass/reset-password", post(ok_empty))
        .route("/auth/customer/emailpass/update", post(ok_empty))
        .route("/store/customers", post(create_customer))
        .route("/store/customers/me", get(get_me).post(update_me))
        .route("/store/regions", get(list_regions))
        .route("/store/products", get(list_products))
        .route("/store/products/{id}", get(get_product))
        .route("/store/orders", get(list_orders))
        .route("/store/orders/{id}", get(get_order))
        .route("/store/carts", post(create_cart))
        .route("/store/carts/{id}", get(get_cart).post(update_cart))
        .route("/store/carts/{id}/line-items", post(add_line_item))
        .route(
            "/store/carts/{id}/line-items/{line_id}",
            post(update_line_item).delete(remove_line_item),
        )
        .route("/store/carts/{id}/shipping-methods", post(add_shipping_method))
        .route("/store/carts/{id}/complete", post(complete_cart))
        .route("/store/shipping-options", get(list_shipping_options))
        .route("/store/payment-collections", post(create_payment_collection))
        .route(
            "/store/payment-collections/{id}/payment-sessions",
            post(init_payment_session),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            record_request,
        ))
        .with_state(state)
}

async fn record_request(
    State(state): State<Arc<MockState>>,
    req: Request,
    next: Next,
) -> Response {
    if req.headers().get("x-publishable-api-key").is_none() {
        return error_response(StatusCode::BAD_REQUEST, "missing publishable api key");
    }

    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedRequest {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
        });

    next.run(req).await
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    if state.flags().tokens_revoked {
        return false;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"))
}

// =============================================================================
// Auth & Customer Handlers
// =============================================================================

async fn login(State(state): State<Arc<MockState>>) -> Response {
    let flags = state.flags();
    if flags.reject_credentials {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    if flags.omit_login_token {
        return Json(json!({})).into_response();
    }
    Json(json!({ "token": TEST_TOKEN })).into_response()
}

async fn register() -> Json<Value> {
    Json(json!({ "token": TEST_TOKEN }))
}

async fn ok_empty() -> Json<Value> {
    Json(json!({}))
}

async fn create_customer(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut customer = state
        .customer
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for field in ["email", "first_name", "last_name"] {
        if let Some(value) = body.get(field) {
            customer[field] = value.clone();
        }
    }
    Json(json!({ "customer": customer.clone() }))
}

async fn get_me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let customer = state
        .customer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(json!({ "customer": customer })).into_response()
}

async fn update_me(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut customer = state
        .customer
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for field in ["first_name", "last_name", "phone"] {
        if let Some(value) = body.get(field) {
            customer[field] = value.clone();
        }
    }
    Json(json!({ "customer": customer.clone() })).into_response()
}

// =============================================================================
// Catalog Handlers
// =============================================================================

async fn list_regions() -> Json<Value> {
    Json(json!({
        "regions": [{
            "id": "reg_eu",
            "name": "Europe",
            "currency_code": "eur",
            "countries": [
                { "iso_2": "fr", "display_name": "France" },
                { "iso_2": "de", "display_name": "Germany" },
            ],
        }],
    }))
}

fn product_json() -> Value {
    json!({
        "id": "prod_01",
        "title": "Enamel Mug",
        "description": "A mug.",
        "thumbnail": "https://img.test/mug.jpg",
        "variants": [{
            "id": "variant_01",
            "title": "Blue",
            "calculated_price": { "calculated_amount": 12.5, "currency_code": "eur" },
        }],
    })
}

async fn list_products() -> Json<Value> {
    Json(json!({ "products": [product_json()], "count": 1 }))
}

async fn get_product(Path(id): Path<String>) -> Response {
    if id == "prod_01" {
        Json(json!({ "product": product_json() })).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Product not found")
    }
}

// =============================================================================
// Cart Handlers
// =============================================================================

fn recompute_totals(cart: &mut Value) {
    let item_total: f64 = cart["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item["unit_price"].as_f64().unwrap_or(0.0)
                        * item["quantity"].as_f64().unwrap_or(0.0)
                })
                .sum()
        })
        .unwrap_or(0.0);
    let shipping_total: f64 = cart["shipping_methods"]
        .as_array()
        .map(|methods| {
            methods
                .iter()
                .map(|m| m["amount"].as_f64().unwrap_or(0.0))
                .sum()
        })
        .unwrap_or(0.0);

    cart["item_total"] = json!(item_total);
    cart["shipping_total"] = json!(shipping_total);
    cart["total"] = json!(item_total + shipping_total);
}

async fn create_cart(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let id = state.next_id("cart");
    let cart = json!({
        "id": id.clone(),
        "region_id": body.get("region_id").cloned().unwrap_or(Value::Null),
        "currency_code": "eur",
        "items": [],
        "shipping_methods": [],
        "item_total": 0.0,
        "shipping_total": 0.0,
        "discount_total": 0.0,
        "tax_total": 0.0,
        "total": 0.0,
    });
    state.carts().insert(id, cart.clone());
    Json(json!({ "cart": cart }))
}

async fn get_cart(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    match state.carts().get(&id) {
        Some(cart) => Json(json!({ "cart": cart })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Cart not found"),
    }
}

async fn update_cart(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };
    for field in ["shipping_address", "email", "region_id"] {
        if let Some(value) = body.get(field) {
            cart[field] = value.clone();
        }
    }
    Json(json!({ "cart": cart.clone() })).into_response()
}

async fn add_line_item(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.mutation_delay().await;
    let line_id = state.next_id("li");
    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    let item = json!({
        "id": line_id,
        "title": "Enamel Mug",
        "variant_id": body.get("variant_id").cloned().unwrap_or(Value::Null),
        "quantity": body.get("quantity").cloned().unwrap_or(json!(1)),
        "unit_price": 12.5,
    });
    if let Some(items) = cart["items"].as_array_mut() {
        items.push(item);
    }
    recompute_totals(cart);
    Json(json!({ "cart": cart.clone() })).into_response()
}

async fn update_line_item(
    State(state): State<Arc<MockState>>,
    Path((id, line_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    state.mutation_delay().await;
    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    let line_value = json!(line_id);
    let Some(item) = cart["items"]
        .as_array_mut()
        .and_then(|items| items.iter_mut().find(|item| item["id"] == line_value))
    else {
        return error_response(StatusCode::NOT_FOUND, "Line item not found");
    };
    item["quantity"] = body.get("quantity").cloned().unwrap_or(json!(1));
    recompute_totals(cart);
    Json(json!({ "cart": cart.clone() })).into_response()
}

async fn remove_line_item(
    State(state): State<Arc<MockState>>,
    Path((id, line_id)): Path<(String, String)>,
) -> Response {
    state.mutation_delay().await;
    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    let line_value = json!(line_id);
    if let Some(items) = cart["items"].as_array_mut() {
        items.retain(|item| item["id"] != line_value);
    }
    recompute_totals(cart);
    // Deliberately minimal: clients must refetch rather than trust this.
    Json(json!({ "id": line_value, "deleted": true })).into_response()
}

async fn add_shipping_method(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let method_id = state.next_id("sm");
    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    let method = json!({
        "id": method_id,
        "shipping_option_id": body.get("option_id").cloned().unwrap_or(Value::Null),
        "name": "Standard",
        "amount": 4.5,
    });
    if let Some(methods) = cart["shipping_methods"].as_array_mut() {
        methods.push(method);
    }
    recompute_totals(cart);
    Json(json!({ "cart": cart.clone() })).into_response()
}

async fn complete_cart(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let rejection = state.flags().completion_error.clone();
    let mut carts = state.carts();
    let Some(cart) = carts.get(&id).cloned() else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    if let Some(message) = rejection {
        return Json(json!({
            "type": "cart",
            "cart": cart,
            "error": { "message": message },
        }))
        .into_response();
    }

    let order = json!({
        "id": state.next_id("order"),
        "display_id": 1,
        "status": "pending",
        "payment_status": "captured",
        "fulfillment_status": "not_fulfilled",
        "items": cart["items"],
        "shipping_address": cart.get("shipping_address").cloned().unwrap_or(Value::Null),
        "currency_code": cart["currency_code"],
        "total": cart["total"],
    });
    carts.remove(&id);
    state
        .orders
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(order.clone());

    Json(json!({ "type": "order", "order": order })).into_response()
}

// =============================================================================
// Shipping & Payment Handlers
// =============================================================================

async fn list_shipping_options(Query(params): Query<HashMap<String, String>>) -> Response {
    if !params.contains_key("cart_id") {
        return error_response(StatusCode::BAD_REQUEST, "cart_id is required");
    }
    Json(json!({
        "shipping_options": [
            { "id": "so_standard", "name": "Standard", "amount": 4.5 },
            { "id": "so_express", "name": "Express", "amount": 9.0 },
        ],
    }))
    .into_response()
}

async fn create_payment_collection(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    let collection_id = state.next_id("paycol");
    let Some(cart_id) = body.get("cart_id").and_then(Value::as_str) else {
        return error_response(StatusCode::BAD_REQUEST, "cart_id is required");
    };

    let mut carts = state.carts();
    let Some(cart) = carts.get_mut(cart_id) else {
        return error_response(StatusCode::NOT_FOUND, "Cart not found");
    };

    let collection = json!({ "id": collection_id, "amount": cart["total"] });
    cart["payment_collection"] = collection.clone();
    Json(json!({ "payment_collection": collection })).into_response()
}

async fn init_payment_session(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let session_id = state.next_id("payses");
    let id_value = json!(id);
    let mut carts = state.carts();
    let Some(cart) = carts
        .values_mut()
        .find(|cart| cart.get("payment_collection").and_then(|pc| pc.get("id")) == Some(&id_value))
    else {
        return error_response(StatusCode::NOT_FOUND, "Payment collection not found");
    };

    cart["payment_collection"]["payment_sessions"] = json!([{
        "id": session_id,
        "provider_id": body.get("provider_id").cloned().unwrap_or(Value::Null),
        "status": "pending",
    }]);
    Json(json!({ "payment_collection": cart["payment_collection"].clone() })).into_response()
}

// =============================================================================
// Orders Handlers
// =============================================================================

async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let orders = state
        .orders
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(json!({ "orders": orders })).into_response()
}

async fn get_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let orders = state
        .orders
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let id_value = json!(id);
    match orders.iter().find(|order| order["id"] == id_value) {
        Some(order) => Json(json!({ "order": order })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Order not found"),
    }
}
