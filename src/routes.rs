use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use maud::Markup;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    classify::{classify, Classification},
    error::BrowseError,
    resolver::{resolve, BaseRoot, ResolvedPath},
    views,
};

// --- State ---
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub base: BaseRoot,
}

#[derive(Deserialize, Debug)]
pub struct PathQuery {
    #[serde(default)]
    path: String,
}

pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/", get(browse_handler))
        .route("/download", get(download_handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Runs the resolver off the async workers; canonicalization hits the disk.
async fn resolve_request(
    state: &SharedState,
    requested: String,
) -> Result<ResolvedPath, BrowseError> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || resolve(&state.base, &requested))
        .await
        .map_err(|e| BrowseError::Internal(std::io::Error::other(e)))?
        .map_err(|_| BrowseError::Forbidden)
}

/// Lists a directory or shows a file, depending on what `path` points at.
async fn browse_handler(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> Result<Markup, BrowseError> {
    let resolved = resolve_request(&state, query.path.clone()).await?;
    let current = state.base.relative(&resolved);

    match classify(&state.base, &resolved).await? {
        Classification::Listing(listing) => Ok(views::listing_page(&current, &listing)),
        // Download by the requested path so a symlink keeps its own name.
        Classification::File(view) => Ok(views::file_page(&current, &query.path, &view)),
    }
}

/// Streams a file back as an attachment, bytes untouched.
async fn download_handler(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, BrowseError> {
    let resolved = resolve_request(&state, query.path).await?;
    let path = resolved.as_path();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(BrowseError::from_io)?;
    if !metadata.is_file() {
        return Err(BrowseError::NotFound);
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(BrowseError::from_io)?;
    info!("Serving download: {}", path.display());

    let name = resolved.name().unwrap_or("download");
    let mime_type = mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(name));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// `attachment` header keeping the original file name. Names that are not
/// plain ASCII also get an RFC 5987 `filename*` parameter.
fn content_disposition(name: &str) -> HeaderValue {
    let ascii_safe = name
        .chars()
        .all(|c| (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ');
    let value = if ascii_safe {
        format!("attachment; filename=\"{}\"", name)
    } else {
        let fallback: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || ".-_".contains(c) {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(name)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|e| {
        error!("Invalid Content-Disposition for {}: {}", name, e);
        HeaderValue::from_static("attachment; filename=\"download\"")
    })
}
