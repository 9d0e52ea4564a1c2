// Price List - Read-only Web API
//
// Serves the stored catalog with sell prices computed on each request
// against the current FX table.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use price_list::catalog::{self, CatalogView, PricedRow};
use price_list::db::{self, IngestRecord};
use price_list::{Config, PricingEngine};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    engine: PricingEngine,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }

    fn failed(context: &str, err: anyhow::Error) -> Response {
        error!(error = %err, "{}", context);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<T> {
                success: false,
                data: None,
                error: Some(format!("{}: {}", context, err)),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct FxRateResponse {
    code: String,
    rate: f64,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/catalog - Category → sub-category → priced items
async fn get_catalog(State(state): State<AppState>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return ApiResponse::<CatalogView>::failed("Database lock poisoned", anyhow::anyhow!("poisoned"));
    };
    match catalog::load_catalog_view(&conn, &state.engine) {
        Ok(view) => ApiResponse::ok(view),
        Err(e) => ApiResponse::<CatalogView>::failed("Error loading catalog", e),
    }
}

/// GET /api/items - Flat priced rows
async fn get_items(State(state): State<AppState>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return ApiResponse::<Vec<PricedRow>>::failed("Database lock poisoned", anyhow::anyhow!("poisoned"));
    };
    match catalog::load_priced_rows(&conn, &state.engine) {
        Ok(rows) => ApiResponse::ok(rows),
        Err(e) => ApiResponse::<Vec<PricedRow>>::failed("Error loading items", e),
    }
}

/// GET /api/fx - Current exchange rates
async fn get_fx(State(state): State<AppState>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return ApiResponse::<Vec<FxRateResponse>>::failed("Database lock poisoned", anyhow::anyhow!("poisoned"));
    };
    match db::load_fx(&conn) {
        Ok(fx) => {
            let rates: Vec<FxRateResponse> = fx
                .iter()
                .map(|(code, rate)| FxRateResponse {
                    code: code.to_string(),
                    rate,
                })
                .collect();
            ApiResponse::ok(rates)
        }
        Err(e) => ApiResponse::<Vec<FxRateResponse>>::failed("Error loading FX rates", e.into()),
    }
}

/// GET /api/ingests?limit=N - Recent ingests
async fn get_ingests(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return ApiResponse::<Vec<IngestRecord>>::failed("Database lock poisoned", anyhow::anyhow!("poisoned"));
    };
    match db::get_ingest_history(&conn, q.limit.unwrap_or(20)) {
        Ok(records) => ApiResponse::ok(records),
        Err(e) => ApiResponse::<Vec<IngestRecord>>::failed("Error loading ingest history", e.into()),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = Config::load_or_default(config_path.as_deref())?;

    let db_path = PathBuf::from(&cfg.db_path);
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}; run `price-list ingest <file>` first",
            db_path.display()
        );
    }

    let conn = db::open(&db_path)?;
    db::setup_database(&conn)?;
    info!(path = %db_path.display(), "Database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        engine: PricingEngine::new(cfg.pricing.vat_rate),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/catalog", get(get_catalog))
        .route("/items", get(get_items))
        .route("/fx", get(get_fx))
        .route("/ingests", get(get_ingests))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(cfg.server.bind.as_str()).await?;
    info!(bind = %cfg.server.bind, "🚀 Server running");

    axum::serve(listener, app).await?;
    Ok(())
}
