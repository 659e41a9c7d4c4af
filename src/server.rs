//! Read-only HTTP server over the collected rankings.
//!
//! Serves the files written by `devrank collect` straight from the data
//! directory; nothing is cached, so a running server picks up a new run as
//! soon as its files are renamed into place.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/rankings` | The run summary (`rankings.json`) |
//! | `GET`  | `/location/{key}` | One location's ranking file |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Every route is also mounted under `/api`. When `[server].static_dir` is
//! set, any other path is served from that directory.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "location not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the static frontend
//! can be hosted elsewhere.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::{is_reserved_location_key, is_valid_location_key, Config};
use crate::store::{read_json, OutputStore};

/// Build the application router.
///
/// Exposed separately from [`run_server`] so tests can serve it on an
/// ephemeral port.
pub fn router(store: OutputStore, static_dir: Option<&std::path::Path>) -> Router {
    let routes = Router::new()
        .route("/rankings", get(handle_rankings))
        .route("/location/{key}", get(handle_location))
        .route("/health", get(handle_health));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .with_state(store);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = OutputStore::new(&config.output.data_dir);
    let app = router(store, config.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, data_dir = %config.output.data_dir.display(), "server started");
    println!("devrank server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

// ============ Handlers ============

async fn handle_rankings(
    State(store): State<OutputStore>,
) -> Result<Json<serde_json::Value>, AppError> {
    read_json(&store.summary_path())
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("no data available"))
}

async fn handle_location(
    State(store): State<OutputStore>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !is_valid_location_key(&key) {
        return Err(bad_request(format!("invalid location key: '{}'", key)));
    }
    if is_reserved_location_key(&key) {
        return Err(not_found("location not found"));
    }
    let path = store.location_path(&key).map_err(internal)?;
    read_json(&path)
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("location not found"))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
