//! vault-drive server binary.
//!
//! Exposes the local filesystem over HTTP: storage roots, directory listings,
//! previews and range streaming, downloads, folder creation and multipart
//! uploads. `main` parses configuration, builds the Axum router and runs the
//! listener until a shutdown signal arrives.

mod auth;
mod config;
mod drive;
mod error;
mod handlers;
mod http;
mod logging;
mod range;

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::auth::AuthConfig;
use crate::config::Args;
use crate::drive::{Drive, DriveConfig, PathGuard};
use crate::http::{build_cors_layer, client_ip_for_span};

shadow!(build);

/// Starts the vault-drive server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let args = Args::parse();
    logging::init_logging(&args.log_filter);

    let mut drive_config = DriveConfig {
        upload_workers: args.upload_workers.max(1),
        list_timeout: Duration::from_secs(args.list_timeout_secs),
        ..DriveConfig::default()
    };
    if let Some(spool_dir) = args.upload_spool_dir.clone() {
        drive_config.spool_dir = spool_dir;
    }
    let drive = Arc::new(Drive::new(PathGuard::platform_default(), drive_config));
    let auth_config = Arc::new(AuthConfig {
        username: args.auth_user.clone(),
        password: args.auth_pass.clone(),
    });

    let mut app = build_router(drive, auth_config, args.upload_max_size);
    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let http_addr = SocketAddr::new(host, args.http_port);
    let handle = Handle::new();

    info!(
        version = build::PKG_VERSION,
        commit = build::SHORT_COMMIT,
        "Starting HTTP server at {}",
        http_addr
    );

    let http_server = axum_server::bind(http_addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = http_server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

/// Assembles every route with the auth, security-header and trace layers.
///
/// `upload_limit` caps the upload request body in bytes; 0 lifts the cap.
pub fn build_router(drive: Arc<Drive>, auth: Arc<AuthConfig>, upload_limit: u64) -> Router {
    let body_limit = if upload_limit == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(usize::try_from(upload_limit).unwrap_or(usize::MAX))
    };

    Router::new()
        .route("/drivers/root", get(handlers::list_roots))
        .route("/drive/root", get(handlers::list_roots))
        .route("/drive/list", get(handlers::list_path))
        .route("/drive/download", post(handlers::download))
        .route("/drive/create-folder", post(handlers::create_folder))
        .route("/drive/preview", get(handlers::preview))
        .route("/drive/stream", get(handlers::stream))
        .route(
            "/drive/upload-files",
            post(handlers::upload_files).layer(body_limit),
        )
        .layer(middleware::from_fn(auth::auth_middleware))
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = client_ip_for_span(request);
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(drive))
        .layer(Extension(auth))
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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

    info!("Received termination signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
