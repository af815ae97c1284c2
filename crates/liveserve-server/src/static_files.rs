//! Static file serving.
//!
//! Maps request paths onto the root directory and serves files, index pages
//! and directory listings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::RequestError;
use crate::listing;
use crate::resolve::resolve_request_path;
use crate::state::AppState;

/// Files served in place of a directory listing, in order of preference.
const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Serve the file, index page or listing for the request path.
pub(crate) async fn serve_path(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, RequestError> {
    let uri_path = req.uri().path().to_owned();
    let lexical = resolve_request_path(&state.root_dir, &uri_path)?;
    let path = canonicalize_within(&state.root_dir, &lexical, &uri_path).await?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| RequestError::from_io(&uri_path, e))?;
    if !metadata.is_dir() {
        // A file never has children, so `/page.html/` names nothing
        if uri_path.ends_with('/') {
            return Err(RequestError::NotFound(uri_path));
        }
        return Ok(serve_file(&path, req).await);
    }

    // Relative links in index pages and listings need the trailing slash
    if !uri_path.ends_with('/') {
        return Ok(redirect_to_directory(req.uri()));
    }

    for index in INDEX_FILES {
        let candidate =
            match canonicalize_within(&state.root_dir, &path.join(index), &uri_path).await {
                Ok(candidate) => candidate,
                Err(RequestError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|m| m.is_file())
        {
            return Ok(serve_file(&candidate, req).await);
        }
    }

    Ok(listing::render(&path, &uri_path).await?.into_response())
}

/// Canonicalize `path`, following symlinks, and require it to stay under `root`.
async fn canonicalize_within(
    root: &Path,
    path: &Path,
    uri_path: &str,
) -> Result<PathBuf, RequestError> {
    let canonical = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| RequestError::from_io(uri_path, e))?;
    if !canonical.starts_with(root) {
        return Err(RequestError::Forbidden(uri_path.to_owned()));
    }
    Ok(canonical)
}

/// Stream a regular file.
///
/// `ServeFile` infers the content type and handles HEAD, ranges and
/// `Last-Modified`. Read failures become a 500 inside `ServeFile`.
async fn serve_file(path: &Path, req: Request) -> Response {
    match ServeFile::new(path).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// Redirect `/dir` to `/dir/`, keeping the query string.
///
/// Leading slashes are collapsed so `//host` cannot become a
/// scheme-relative redirect to another site.
fn redirect_to_directory(uri: &Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let location = match uri.query() {
        Some(query) => format!("/{path}/?{query}"),
        None => format!("/{path}/"),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_to_directory() {
        let uri: Uri = "/docs".parse().unwrap();
        let response = redirect_to_directory(&uri);

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/docs/");
    }

    #[test]
    fn test_redirect_to_directory_keeps_query() {
        let uri: Uri = "/docs?v=2".parse().unwrap();
        let response = redirect_to_directory(&uri);

        assert_eq!(response.headers()[header::LOCATION], "/docs/?v=2");
    }

    #[test]
    fn test_redirect_to_directory_collapses_leading_slashes() {
        let uri: Uri = "//evil.example".parse().unwrap();
        let response = redirect_to_directory(&uri);

        assert_eq!(response.headers()[header::LOCATION], "/evil.example/");
    }

    #[test]
    fn test_index_files_order() {
        assert_eq!(INDEX_FILES, &["index.html", "index.htm"]);
    }
}
