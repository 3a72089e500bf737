mod error;
mod fetch;
mod parse;
mod render;
mod thread;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use encoding_rs::Encoding;
use error::{CardError, Result};
use fetch::{FetchConfig, Fetcher, Upstream};
use std::env;
use std::sync::Arc;
use thread::ThreadCoordinates;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application configuration, read once at startup
#[derive(Clone)]
struct Config {
    port: u16,
    request_timeout: u64,
    max_content_length: usize,
    max_redirects: usize,
    user_agent: String,
    upstream_charset: &'static Encoding,
    card_redirect: bool,
}

impl Config {
    fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30154),
            request_timeout: env::var("REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_content_length: env::var("MAX_CONTENT_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024), // 10MB
            max_redirects: env::var("MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| "thread-card/0.1".to_string()),
            upstream_charset: parse::encoding_for_label(
                &env::var("UPSTREAM_CHARSET").unwrap_or_else(|_| "shift_jis".to_string()),
            ),
            card_redirect: env::var("CARD_REDIRECT")
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(true),
        }
    }
}

/// Anything but an explicit "off" keeps the flag on
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Shared application state
struct AppState<U> {
    upstream: Arc<U>,
    fallback_charset: &'static Encoding,
    card_redirect: bool,
}

impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            fallback_charset: self.fallback_charset,
            card_redirect: self.card_redirect,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env();

    let fetcher = Fetcher::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout_secs: config.request_timeout,
        max_content_length: config.max_content_length,
        max_redirects: config.max_redirects,
    })?;

    let state = AppState {
        upstream: Arc::new(fetcher),
        fallback_charset: config.upstream_charset,
        card_redirect: config.card_redirect,
    };

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        charset = config.upstream_charset.name(),
        redirect = config.card_redirect,
        "thread-card listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Everything except `GET /health` is treated as a thread link, whatever the method
fn router<U: Upstream>(state: AppState<U>) -> Router {
    Router::new()
        .route(
            "/health",
            get(health_handler).fallback(card_handler::<U>),
        )
        .fallback(card_handler::<U>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Thread link handler: always answers 200 with an HTML page
async fn card_handler<U: Upstream>(State(state): State<AppState<U>>, uri: Uri) -> Response {
    match build_card(&state, uri.path()).await {
        Ok(html) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(e) => {
            match &e {
                CardError::UpstreamTransport { url, reason } => {
                    tracing::warn!(kind = e.kind(), %url, "fetch failed: {}", reason)
                }
                CardError::UpstreamParse(cause) => {
                    tracing::error!(kind = e.kind(), path = uri.path(), "parse failed: {}", cause)
                }
                _ => tracing::debug!(kind = e.kind(), path = uri.path(), "rejected request"),
            }
            e.into_response()
        }
    }
}

/// Path -> coordinates -> fetch -> extract -> render
async fn build_card<U: Upstream>(state: &AppState<U>, path: &str) -> Result<String> {
    let coords = ThreadCoordinates::from_path(path)?;
    let target = coords.target_url()?;

    let response = state.upstream.fetch(&target).await?;
    if response.final_url != target {
        tracing::debug!(%target, final_url = %response.final_url, "upstream redirected");
    }

    let html = parse::decode_body(&response.body, response.charset(), state.fallback_charset);
    let card = parse::extract_card(&html).map_err(|e| match e {
        CardError::UpstreamParse(cause) => {
            CardError::UpstreamParse(format!("{} (upstream status {})", cause, response.status))
        }
        other => other,
    })?;

    Ok(render::render_card_page(
        &card,
        target.as_str(),
        state.card_redirect,
    ))
}
