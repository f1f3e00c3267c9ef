pub mod embed;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;

use anyhow::Context;
use axum::http::{header, HeaderValue};
use axum::routing::{get, patch};
use axum::{middleware, Router};
use progress_core::config::{Config, PortRange};
use progress_core::DocumentStore;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use security::{perimeter_middleware, Perimeter};
use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    let perimeter = state.perimeter.clone();

    Router::new()
        // Documents
        .route("/api/files", get(routes::files::list_files))
        .route(
            "/api/file",
            get(routes::files::get_file).put(routes::files::put_file),
        )
        .route("/api/checkbox", patch(routes::checkbox::patch_checkbox))
        // Tracker
        .route("/api/status-summary", get(routes::summary::status_summary))
        .route("/api/status-detail", get(routes::summary::status_detail))
        .route("/api/plan-health", get(routes::summary::plan_health))
        .route("/api/session", get(routes::session::get_session))
        .fallback(embed::static_handler)
        .layer(middleware::from_fn_with_state(
            perimeter,
            perimeter_middleware,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind on 127.0.0.1 only. An explicit port is tried alone (0 lets the OS
/// pick); otherwise the first free port in `range` wins.
pub async fn bind_loopback(port: Option<u16>, range: PortRange) -> anyhow::Result<TcpListener> {
    if let Some(port) = port {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        return TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {addr}"));
    }

    for candidate in range.ports() {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => tracing::debug!(port = candidate, error = %e, "port unavailable"),
        }
    }
    anyhow::bail!(
        "no free port in {}-{} on 127.0.0.1",
        range.start,
        range.end
    )
}

/// Start the progress UI server for the project at `root`.
pub async fn serve(root: &Path, port: Option<u16>, open_browser: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let range = config.port_range;
    let store = DocumentStore::open(root, config)?;
    let listener = bind_loopback(port, range).await?;
    serve_on(store, listener, open_browser).await
}

/// Start the progress UI server on a pre-bound listener.
///
/// The listener must be bound to a loopback address; the session token is
/// printed once so scripted clients can authenticate mutations.
pub async fn serve_on(
    store: DocumentStore,
    listener: TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let local = listener.local_addr()?;
    if !local.ip().is_loopback() {
        anyhow::bail!("refusing to serve on non-loopback address {local}");
    }

    let perimeter = Perimeter::new(local.port());
    let url = perimeter.origin();
    let token = perimeter.token().to_string();
    let app = build_router(AppState::new(store.clone(), perimeter));

    tracing::info!(root = %store.root().display(), "progress UI listening on {url}");
    println!("Progress UI → {url}");
    println!("Session token ({}): {token}", security::TOKEN_HEADER);

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
