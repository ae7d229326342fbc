//! Static file serving.
//!
//! Serves files straight off the filesystem beneath the configured site
//! root. There is no in-memory cache and no embedding: the whole point is
//! that every request observes the file's current bytes.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Create router serving files beneath the site root.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_path)
}

/// Serve the file addressed by the request path.
///
/// Directory requests (including the bare root) fall back to the
/// directory's `index.html`. Anything resolving outside the root gets
/// the same 404 as a missing file, never a distinguishable 403.
async fn serve_path(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let Some(relative) = sanitize_request_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut target = state.root.join(relative);
    if let Ok(meta) = tokio::fs::metadata(&target).await
        && meta.is_dir()
    {
        target.push("index.html");
    }

    match tokio::fs::read(&target).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(&target).first_or_octet_stream();
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(contents))
                .unwrap()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            tracing::warn!(path = %target.display(), error = %err, "failed to read file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Map a request path onto a path relative to the site root.
///
/// Rejects anything that could escape the root: parent-directory
/// components, embedded absolute paths, or prefixes. The query string is
/// never part of `Uri::path`, so it needs no stripping here.
fn sanitize_request_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}
