//! HTTP surface: the storefront pages as JSON view-models

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, warn};
use validator::Validate;

use crate::domain::aggregates::{product::product_grid, Cart, CartLineItem, DesignPlacement, LastOrder, OrderSummary, ProductCard};
use crate::domain::services::{InvoiceNormalizer, NormalizedInvoice, QuantityTier, TierQuote, TierSchedule};
use crate::domain::value_objects::SizeQuantities;
use crate::export::InvoiceDocument;
use crate::remote::StorefrontApi;
use crate::storage::Storage;
use crate::store::CartStore;
use crate::{Result, StorefrontError};

pub type SharedStore = Arc<Mutex<CartStore<Box<dyn Storage>>>>;
type StoreHandle = CartStore<Box<dyn Storage>>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub api: StorefrontApi,
    pub normalizer: InvoiceNormalizer,
}

impl AppState {
    pub fn new(storage: Box<dyn Storage>, api: StorefrontApi, normalizer: InvoiceNormalizer) -> Self {
        Self { store: Arc::new(Mutex::new(CartStore::load(storage))), api, normalizer }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/banner", get(banner))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/remove", post(remove_from_cart))
        .route("/api/v1/cart/quantity", put(update_quantity))
        .route("/api/v1/configurator/quote", post(quote))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/complete", post(complete_order))
        .route("/api/v1/orders/success", get(order_success))
        .route("/api/v1/orders/:order_id/invoice.pdf", get(invoice_pdf))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        if self.is_fatal() {
            warn!(error = %self, "Leaving page");
            return Redirect::to("/").into_response();
        }
        let status = match self {
            Self::ItemNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCurrency(_) | Self::InvalidTier(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

fn validated<T: Validate>(request: T) -> Result<T> {
    request.validate().map_err(|e| StorefrontError::InvalidRequest(e.to_string()))?;
    Ok(request)
}

fn log_events(store: &mut StoreHandle) {
    for event in store.take_events() {
        debug!(?event, "storefront event");
    }
}

/// Runs a store operation on the blocking pool while holding the store lock.
/// Storage reads and writes are synchronous file I/O.
async fn with_store<T, F>(store: &SharedStore, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut StoreHandle) -> Result<T> + Send + 'static,
{
    let mut guard = store.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || {
        let out = op(&mut *guard);
        log_events(&mut *guard);
        out
    })
    .await
    .map_err(|e| StorefrontError::Storage(format!("storage task failed: {e}")))?
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductGrid {
    pub currency: String,
    pub currency_symbol: &'static str,
    pub products: Vec<ProductCard>,
}

async fn list_products(State(s): State<AppState>) -> Json<ProductGrid> {
    let (products, pricing) = tokio::join!(s.api.products(), s.api.location_pricing());
    Json(ProductGrid {
        currency: pricing.currency.to_string(),
        currency_symbol: pricing.symbol(),
        products: product_grid(&products, &pricing),
    })
}

async fn banner(State(s): State<AppState>) -> Json<Value> { Json(s.api.banner().await) }

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub line_count: usize,
    pub total_pieces: u32,
    pub subtotal: Decimal,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self { items: cart.items().to_vec(), line_count: cart.line_count(), total_pieces: cart.total_pieces(), subtotal: cart.subtotal() }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[serde(default)]
    pub design_selections: Vec<DesignPlacement>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size_quantities: SizeQuantities,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub color_label: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl From<AddToCartRequest> for CartLineItem {
    fn from(r: AddToCartRequest) -> Self {
        Self {
            product_id: r.product_id, id: None, design_selections: r.design_selections, color: r.color,
            size_quantities: r.size_quantities, unit_price: r.unit_price, color_label: r.color_label,
            gender: r.gender, display_name: r.display_name, images: r.images, description: r.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub color: Option<String>,
    pub design_selections: Option<Vec<DesignPlacement>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub size_quantities: SizeQuantities,
}

async fn get_cart(State(s): State<AppState>) -> Json<CartView> {
    Json(CartView::from(s.store.lock().await.cart()))
}

async fn add_to_cart(State(s): State<AppState>, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartView>)> {
    let r = validated(r)?;
    let view = with_store(&s.store, move |store| {
        store.add(r.into())?;
        Ok(CartView::from(store.cart()))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn remove_from_cart(State(s): State<AppState>, Json(r): Json<RemoveRequest>) -> Result<Json<CartView>> {
    let r = validated(r)?;
    let view = with_store(&s.store, move |store| {
        store.remove(&r.product_id, r.color.as_deref(), r.design_selections.as_deref())?;
        Ok(CartView::from(store.cart()))
    })
    .await?;
    Ok(Json(view))
}

async fn update_quantity(State(s): State<AppState>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>> {
    let r = validated(r)?;
    let view = with_store(&s.store, move |store| {
        store.update_quantity(&r.product_id, r.size_quantities)?;
        Ok(CartView::from(store.cart()))
    })
    .await?;
    Ok(Json(view))
}

async fn clear_cart(State(s): State<AppState>) -> Result<StatusCode> {
    with_store(&s.store, |store| store.clear()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Size configurator
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub tiers: Option<Vec<QuantityTier>>,
    #[serde(default)]
    pub sizes: SizeQuantities,
}

async fn quote(Json(r): Json<QuoteRequest>) -> Result<Json<TierQuote>> {
    let schedule = match r.tiers.as_deref() {
        Some(tiers) if !tiers.is_empty() => TierSchedule::new(tiers)?,
        _ => TierSchedule::default(),
    };
    Ok(Json(schedule.quote(&r.sizes)))
}

// =============================================================================
// Orders and invoices
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct OrdersQuery {
    #[validate(length(min = 1))]
    pub user_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderRequest {
    #[validate(length(min = 1))]
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub order_id: Option<String>,
}

async fn list_orders(State(s): State<AppState>, Query(q): Query<OrdersQuery>) -> Result<Json<Vec<OrderSummary>>> {
    let q = validated(q)?;
    Ok(Json(s.api.orders_for_user(&q.user_id).await))
}

async fn complete_order(State(s): State<AppState>, Json(r): Json<CompleteOrderRequest>) -> Result<(StatusCode, Json<LastOrder>)> {
    let r = validated(r)?;
    let last = with_store(&s.store, move |store| store.complete_order(&r.order_id)).await?;
    Ok((StatusCode::CREATED, Json(last)))
}

async fn load_invoice(s: &AppState, order_id: Option<String>) -> Result<NormalizedInvoice> {
    let order_id = match order_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => Some(id),
        None => with_store(&s.store, |store| Ok(store.last_order())).await?.map(|o| o.order_id),
    };
    let order_id = order_id.ok_or(StorefrontError::MissingOrderId)?;
    let raw = s.api.invoice(&order_id).await;
    s.normalizer.normalize(Some(order_id.as_str()), raw.as_ref())
}

async fn order_success(State(s): State<AppState>, Query(q): Query<SuccessQuery>) -> Result<Json<NormalizedInvoice>> {
    Ok(Json(load_invoice(&s, q.order_id).await?))
}

async fn invoice_pdf(State(s): State<AppState>, Path(order_id): Path<String>) -> Result<Response> {
    let invoice = load_invoice(&s, Some(order_id)).await?;
    let document = InvoiceDocument::new(&invoice);
    let bytes = document.render_pdf()?;
    let disposition = format!("attachment; filename=\"{}\"", document.file_name());
    Ok(([(header::CONTENT_TYPE, "application/pdf".to_string()), (header::CONTENT_DISPOSITION, disposition)], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> (Router, SharedStore) {
        let api = StorefrontApi::new("http://127.0.0.1:9", "http://127.0.0.1:9/location");
        let state = AppState::new(Box::new(MemoryStorage::new()), api, InvoiceNormalizer::default());
        let store = state.store.clone();
        (router(state), store)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Response) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        (resp.status(), resp)
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn tee(sizes: Value) -> Value {
        json!({ "productId": "P1", "color": "black", "unitPrice": 467, "sizeQuantities": sizes,
                "designSelections": [{ "placement": "front", "designId": "D1" }] })
    }

    #[tokio::test]
    async fn test_add_merges_same_line() {
        let (app, _) = app();
        let (status, _) = send(&app, "POST", "/api/v1/cart", Some(tee(json!({"S": 2})))).await;
        assert_eq!(status, StatusCode::CREATED);
        send(&app, "POST", "/api/v1/cart", Some(tee(json!({"S": 1, "M": 1})))).await;
        let (_, resp) = send(&app, "GET", "/api/v1/cart", None).await;
        let cart = json_body(resp).await;
        assert_eq!(cart["lineCount"], 1);
        assert_eq!(cart["items"][0]["sizeQuantities"], json!({"M": 1, "S": 3}));
        assert_eq!(cart["totalPieces"], 4);
    }

    #[tokio::test]
    async fn test_remove_without_variant_removes_all_lines() {
        let (app, store) = app();
        send(&app, "POST", "/api/v1/cart", Some(tee(json!({"S": 1})))).await;
        let mut white = tee(json!({"L": 1}));
        white["color"] = json!("white");
        send(&app, "POST", "/api/v1/cart", Some(white)).await;
        assert_eq!(store.lock().await.cart().line_count(), 2);
        let (status, _) = send(&app, "POST", "/api/v1/cart/remove", Some(json!({"productId": "P1"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.lock().await.cart().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_line_is_not_found() {
        let (app, _) = app();
        let (status, _) = send(&app, "PUT", "/api/v1/cart/quantity", Some(json!({"productId": "nope", "sizeQuantities": {"S": 1}}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_product_id_rejected() {
        let (app, _) = app();
        let (status, _) = send(&app, "POST", "/api/v1/cart", Some(json!({"productId": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quote_uses_default_tiers() {
        let (app, _) = app();
        let (_, resp) = send(&app, "POST", "/api/v1/configurator/quote", Some(json!({"sizes": {"S": 1, "M": 2}}))).await;
        let quote = json_body(resp).await;
        assert_eq!(quote["totalQuantity"], 3);
        assert_eq!(quote["pricePerPiece"], json!(467.0));
        assert_eq!(quote["subtotal"], json!(1401.0));

        let (_, resp) = send(&app, "POST", "/api/v1/configurator/quote", Some(json!({"sizes": {}}))).await;
        assert_eq!(json_body(resp).await["pricePerPiece"], Value::Null);

        let (status, _) = send(&app, "POST", "/api/v1/configurator/quote", Some(json!({"tiers": [{"range": "x", "price": 1}]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_success_without_order_redirects() {
        let (app, _) = app();
        let (status, resp) = send(&app, "GET", "/api/v1/orders/success", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_success_without_invoice_redirects() {
        let (app, _) = app();
        let (status, _) = send(&app, "GET", "/api/v1/orders/success?order_id=ord-1", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_complete_order_clears_cart() {
        let (app, store) = app();
        send(&app, "POST", "/api/v1/cart", Some(tee(json!({"S": 2})))).await;
        let (status, resp) = send(&app, "POST", "/api/v1/orders/complete", Some(json!({"orderId": "ord-5"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(resp).await["orderId"], "ord-5");
        let store = store.lock().await;
        assert!(store.cart().is_empty());
        assert_eq!(store.last_order().map(|o| o.pieces), Some(2));
    }

    #[tokio::test]
    async fn test_product_grid_degrades_to_empty() {
        let (app, _) = app();
        let (status, resp) = send(&app, "GET", "/api/v1/products", None).await;
        assert_eq!(status, StatusCode::OK);
        let grid = json_body(resp).await;
        assert_eq!(grid["products"], json!([]));
        assert_eq!(grid["currency"], "INR");
    }
}
