use std::convert::Infallible;
use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use futures_util::stream::{self, StreamExt};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::config::Config;
use crate::live::FeedEvent;
use crate::metrics::Metrics;
use crate::service::{NewOrderRequest, OrderService, StatusUpdateRequest};

mod error;

pub use error::ApiError;

// ============================================================================
// HTTP API
// ============================================================================
//
// Request/response surface over the order service, plus the SSE live feed.
// All failures come back as { "success": false, "error": ... } JSON.
//
// ============================================================================

pub struct AppState {
    pub service: Arc<OrderService>,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/", web::get().to(index))
        .route("/order", web::post().to(create_order))
        .route("/api/orders", web::get().to(list_orders))
        .route("/update-status", web::post().to(update_status))
        .route("/download-orders", web::get().to(download_orders))
        .route("/events", web::get().to(events))
        .route("/login", web::post().to(login))
        .route("/admin/clear-orders", web::post().to(clear_orders))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler));
}

pub async fn run(state: AppState) -> std::io::Result<()> {
    let port = state.config.port;
    let data = web::Data::new(state);

    tracing::info!(port, "Starting HTTP server on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

/// Malformed request bodies get the same JSON envelope as every other
/// failure, instead of actix's default plain-text 400.
fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": err.to_string(),
    }));
    actix_web::error::InternalError::from_response(err, response).into()
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Server running. Order data at /api/orders, live feed at /events")
}

async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let order_id = state.service.create_order(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "orderId": order_id,
    })))
}

async fn list_orders(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let orders = state.service.list_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn update_status(
    state: web::Data<AppState>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    state.service.update_status(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// Raw persisted collection as a download, the export counterpart of the
/// storefront's spreadsheet button. An empty store downloads as `[]`.
async fn download_orders(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let path = state.service.store().path();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => b"[]".to_vec(),
        Err(e) => {
            return Err(ApiError::Service(crate::service::ServiceError::Store(
                e.into(),
            )))
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"orders.json\"",
        ))
        .body(bytes))
}

/// SSE live feed. The first frame is always a full `all-orders` snapshot,
/// which is the resync mechanism for reconnecting clients; after that the
/// subscriber sees every broadcast until it disconnects or lags out.
async fn events(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    // Subscribe before reading the snapshot: an order created while the
    // load is in flight then shows up as a duplicate new-order rather than
    // going missing entirely. Clients dedupe by tracking id.
    let rx = state.service.feed().subscribe();
    let snapshot = state.service.list_orders().await?;

    state.metrics.live_clients.inc();
    let guard = FeedGuard(state.metrics.clone());
    tracing::debug!(
        subscribers = state.service.feed().subscriber_count(),
        "Live client connected"
    );

    let initial = web::Bytes::from(FeedEvent::AllOrders(snapshot).to_sse_frame());

    let live = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        match rx.recv().await {
            Ok(event) => {
                let bytes = web::Bytes::from(event.to_sse_frame());
                Some((Ok::<_, Infallible>(bytes), (rx, guard)))
            }
            Err(RecvError::Lagged(skipped)) => {
                // Dropping the connection forces a reconnect, which resyncs
                // via the snapshot-on-connect rule.
                tracing::warn!(skipped, "Live subscriber lagged, disconnecting");
                None
            }
            Err(RecvError::Closed) => None,
        }
    });

    let body = stream::iter([Ok::<_, Infallible>(initial)]).chain(live);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

/// Decrements the live-client gauge when the SSE stream is dropped,
/// however the connection ends.
struct FeedGuard(Arc<Metrics>);

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.0.live_clients.dec();
    }
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl Credentials {
    fn matches(&self, config: &Config) -> bool {
        config.is_admin(
            self.email.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

/// Hardcoded-credential login. Anyone who is not the admin is still "logged
/// in" as a plain user; there is no account store.
async fn login(state: web::Data<AppState>, body: web::Json<Credentials>) -> impl Responder {
    let is_admin = body.matches(&state.config);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "isAdmin": is_admin,
    }))
}

async fn clear_orders(
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    if !body.matches(&state.config) {
        return Err(ApiError::Unauthorized);
    }

    state.service.clear_orders().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "orderdesk",
    }))
}

async fn metrics_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return Ok(HttpResponse::InternalServerError().finish());
    }

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer))
}

// ============================================================================
// Integration Tests
// ============================================================================
