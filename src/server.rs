//! HTTP front end.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /images` | `{"images": [{"file_name", "exif_info"}]}` |
//! | `GET /image-preview/:filename` | preview JPEG, rendered on demand |
//! | `GET /download/:filename` | original RAW bytes as an attachment |
//!
//! Errors are JSON `{"detail": "..."}` bodies. Unknown or unservable names
//! answer 404; a known file whose preview can't be rendered answers 500, so
//! clients can tell the two apart.
//!
//! Cache work (EXIF reads, RAW decoding, ledger I/O) is blocking and runs on
//! tokio's blocking pool.

use crate::config::ServerConfig;
use crate::preview::{PreviewCache, PreviewError};
use crate::types::{ErrorBody, ImageList};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<PreviewCache>,
}

/// Error response with a status code and a `detail` message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "File not found")
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

impl From<PreviewError> for ApiError {
    fn from(e: PreviewError) -> Self {
        if e.is_not_found() {
            return Self::not_found();
        }
        error!(error = %e, "request failed");
        match e {
            PreviewError::GenerationFailed { name, .. } => {
                Self::internal(format!("Could not render a preview for {}", name))
            }
            _ => Self::internal("Internal server error"),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!(error = %e, "blocking task failed");
        Self::internal("Internal server error")
    }
}

/// Build the application router.
pub fn router(state: AppState, cors: bool) -> Router {
    let app = Router::new()
        .route("/images", get(list_images))
        .route("/image-preview/:filename", get(image_preview))
        .route("/download/:filename", get(download_image))
        .with_state(state);
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn list_images(State(state): State<AppState>) -> Result<Json<ImageList>, ApiError> {
    let cache = Arc::clone(&state.cache);
    let listing = tokio::task::spawn_blocking(move || cache.listing()).await?;
    listing.map(Json).map_err(|e| {
        error!(error = %e, "listing RAW directory failed");
        ApiError::internal("Could not list images")
    })
}

async fn image_preview(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let cache = Arc::clone(&state.cache);
    let bytes = tokio::task::spawn_blocking(move || cache.read_preview(&filename)).await??;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// Stream the RAW file; it is never buffered whole in memory.
async fn download_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.cache.source_path(&filename)?;
    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ApiError::not_found()),
        Err(e) => return Err(PreviewError::Io(e).into()),
    };
    let length = file.metadata().await.map_err(PreviewError::Io)?.len();
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<(), ServeError> {
    let cache = PreviewCache::from_config(config)?;
    let state = AppState {
        cache: Arc::new(cache),
    };
    let app = router(state, config.server.cors);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(
        address = %listener.local_addr()?,
        raw_dir = %config.raw_dir.display(),
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::TestDirs;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(dirs: &TestDirs, backend: Arc<MockBackend>) -> Router {
        let state = AppState {
            cache: Arc::new(dirs.cache(backend)),
        };
        router(state, true)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec(), headers)
    }

    #[tokio::test]
    async fn list_images_returns_raw_files() {
        let dirs = TestDirs::new();
        dirs.add_source("a.CR2");
        dirs.add_source("b.NEF");
        std::fs::write(dirs.raw_dir.join("notes.txt"), b"x").unwrap();

        let (status, body, _) = get(app(&dirs, Arc::new(MockBackend::new())), "/images").await;
        assert_eq!(status, StatusCode::OK);

        let list: ImageList = serde_json::from_slice(&body).unwrap();
        let mut names: Vec<String> = list.images.into_iter().map(|i| i.file_name).collect();
        names.sort();
        assert_eq!(names, vec!["a.CR2", "b.NEF"]);
    }

    #[tokio::test]
    async fn preview_is_jpeg_and_cached() {
        let dirs = TestDirs::new();
        dirs.add_source("a.CR2");
        let backend = Arc::new(MockBackend::new());
        let app = app(&dirs, backend.clone());

        let (status, first, headers) = get(app.clone(), "/image-preview/a.CR2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(&first[..2], &[0xFF, 0xD8]);

        let (_, second, _) = get(app, "/image-preview/a.CR2").await;
        assert_eq!(first, second);
        assert_eq!(backend.decode_count(), 1);
    }

    #[tokio::test]
    async fn preview_of_unknown_file_is_404() {
        let dirs = TestDirs::new();
        let (status, body, _) =
            get(app(&dirs, Arc::new(MockBackend::new())), "/image-preview/ghost.CR2").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.detail, "File not found");
    }

    #[tokio::test]
    async fn preview_of_non_raw_name_is_404() {
        let dirs = TestDirs::new();
        std::fs::write(dirs.raw_dir.join("notes.txt"), b"x").unwrap();
        let (status, _, _) =
            get(app(&dirs, Arc::new(MockBackend::new())), "/image-preview/notes.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_render_is_500_not_404() {
        let dirs = TestDirs::new();
        dirs.add_source("bad.NEF");
        let (status, body, _) = get(
            app(&dirs, Arc::new(MockBackend::failing("corrupt"))),
            "/image-preview/bad.NEF",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(err.detail.contains("bad.NEF"));
    }

    #[tokio::test]
    async fn download_returns_raw_bytes_as_attachment() {
        let dirs = TestDirs::new();
        dirs.add_source("a.CR2");

        let (status, body, headers) =
            get(app(&dirs, Arc::new(MockBackend::new())), "/download/a.CR2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"fake raw bytes");
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"a.CR2\""
        );
    }

    #[tokio::test]
    async fn download_streams_large_file_intact() {
        let dirs = TestDirs::new();
        // Several reader chunks' worth, with a pattern that catches reordering.
        let data: Vec<u8> = (0..3 * 1024 * 1024 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(dirs.raw_dir.join("big.DNG"), &data).unwrap();

        let (status, body, headers) =
            get(app(&dirs, Arc::new(MockBackend::new())), "/download/big.DNG").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_LENGTH], data.len().to_string().as_str());
        assert_eq!(body.len(), data.len());
        assert!(body == data);
    }

    #[tokio::test]
    async fn download_missing_file_is_404() {
        let dirs = TestDirs::new();
        let (status, body, _) =
            get(app(&dirs, Arc::new(MockBackend::new())), "/download/ghost.CR2").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.detail, "File not found");
    }

    #[tokio::test]
    async fn download_rejects_traversal() {
        let dirs = TestDirs::new();
        let (status, _, _) = get(
            app(&dirs, Arc::new(MockBackend::new())),
            "/download/..%2Fconfig.CR2",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
