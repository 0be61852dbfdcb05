//! HTTP adapter.
//!
//! JSON API over the dataset store, the tool registry, the e-invoicing
//! service and the sales source. Errors are rendered as `{"error": message}` with a mapped status.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::techaura_adapter::TechauraClient;
use crate::domain::config_validation::{DEFAULT_FRONTEND_URL, Settings};
use crate::domain::dataset::DatasetStore;
use crate::domain::einvoice::EInvoiceService;
use crate::ports::sales_port::SalesPort;

pub struct AppState {
    pub store: Arc<DatasetStore>,
    pub einvoice: EInvoiceService,
    pub sales: Arc<dyn SalesPort + Send + Sync>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let einvoice =
            EInvoiceService::new(settings.einvoice_provider, settings.nit_emisor.clone());
        let sales = Arc::new(TechauraClient::new(settings.sales.clone()));
        Self {
            store: Arc::new(DatasetStore::new()),
            einvoice,
            sales,
            settings,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.frontend_url);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/api/upload", post(handlers::upload_csv))
        .route("/api/datasets", get(handlers::list_datasets))
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/tools/calls", post(handlers::run_calls))
        .route("/api/tools/{name}", post(handlers::invoke_tool))
        .route("/api/einvoice/validate", post(handlers::validate))
        .route("/api/einvoice/invoices", post(handlers::issue_invoice))
        .route("/api/einvoice/credit-notes", post(handlers::issue_credit_note))
        .route(
            "/api/einvoice/invoices/{numero}/status",
            get(handlers::invoice_status),
        )
        .route("/api/sales/sync", post(handlers::sync_sales))
        .route("/api/sales/{sale_id}", get(handlers::sale_details))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(Arc::new(state))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in [frontend_url, DEFAULT_FRONTEND_URL] {
        match origin.parse::<HeaderValue>() {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(_) => tracing::warn!(origin, "ignoring unparsable CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}
