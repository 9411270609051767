use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use futures::lock::Mutex;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;

pub mod blobs;
pub mod config;
pub mod domain;
pub mod error;
pub mod file_reply;
mod handlers;
pub mod json;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::blobs::BlobStorage;
use crate::config::Config;
use crate::domain::Storage;
use crate::error::StoreError;
use crate::json::JsonFile;
use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::handlers::PERMISSION_DENIED;

/// Room for multipart boundaries and the owner name on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

type Metadata = Arc<Mutex<JsonFile>>;

/// Shared by all handlers. The mutex serializes read-modify-write cycles on the metadata file.
#[derive(Clone)]
pub struct AppState {
    pub metadata: Metadata,
    pub blobs: BlobStorage,
    pub max_file_size: usize,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upload,
        handlers::get_files,
        handlers::delete_file,
        handlers::get_media
    ),
    components(schemas(kernel::UploadRecord, kernel::MediaType, kernel::DeleteRequest)),
    tags((name = "media", description = "Photo and video upload API"))
)]
pub struct ApiDoc;

pub async fn run() -> Result<(), StoreError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let app = create_routes(&config).await?;

    let socket = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(socket).await?;
    tracing::debug!("listening on http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Prepares the metadata file and the blob directories, then builds the router.
pub async fn create_routes(config: &Config) -> Result<Router, StoreError> {
    let metadata = JsonFile::new(config.metadata_file());
    metadata.initialize().await?;

    let blobs = BlobStorage::new(&config.upload_dir);
    blobs.ensure_dirs().await?;

    let state = AppState {
        metadata: Arc::new(Mutex::new(metadata)),
        blobs,
        max_file_size: config.max_file_size,
    };

    Ok(Router::new()
        .route("/upload", post(handlers::upload))
        .route("/files", get(handlers::get_files))
        .route("/delete", post(handlers::delete_file))
        .route("/media/:type/:filename", get(handlers::get_media))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    config.max_file_size.saturating_add(MULTIPART_OVERHEAD),
                ))
                .into_inner(),
        )
        .with_state(state))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
