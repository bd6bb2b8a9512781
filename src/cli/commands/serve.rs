//! HTTP server exposing the query answerer.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::orchestrator::Orchestrator;
use crate::rag::QueryAnswerer;
use crate::vector_store::ContextMatch;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the router. `debug` adds request tracing.
pub fn router(answerer: Arc<QueryAnswerer>, debug: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/eto/search", get(search))
        .layer(cors)
        .with_state(answerer);

    if debug {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    debug: bool,
    settings: Settings,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| settings.server.host.clone()),
        port.unwrap_or(settings.server.port)
    );

    let orchestrator = Orchestrator::new(settings, credentials)?;
    let dataset = Arc::new(orchestrator.setup().await?);
    let answerer = Arc::new(orchestrator.answerer(dataset));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Eto API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Search", "GET /eto/search?q=<question>");
    if debug {
        Output::kv("Debug", "request tracing enabled");
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(answerer, debug))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Serialize)]
struct SearchResponse {
    completion: String,
    top_match: Option<ContextMatch>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn search(
    State(answerer): State<Arc<QueryAnswerer>>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    info!("Query: {}", query.q);

    match answerer.answer(&query.q).await {
        Ok(answer) => {
            let top_match = answer.top_match().cloned();
            Json(SearchResponse {
                completion: answer.completion,
                top_match,
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
