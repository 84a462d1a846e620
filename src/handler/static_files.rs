//! Static file serving module
//!
//! Resolves request paths against the configured root directory and builds
//! file, index-file and directory-listing responses.

use std::path::{Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;

/// What a request path resolved to on the filesystem
enum Resolved {
    File(PathBuf),
    Listing(PathBuf),
}

/// Serve a request path from the static root
pub async fn serve_path(
    ctx: &RequestContext<'_>,
    config: &StaticFilesConfig,
) -> Response<Full<Bytes>> {
    match resolve(&config.root, ctx.path, &config.index_files) {
        Some(Resolved::File(file_path)) => serve_file(ctx, &file_path).await,
        Some(Resolved::Listing(dir_path)) => serve_listing(ctx, &dir_path).await,
        None => http::build_404_response(),
    }
}

/// Map a request path onto the filesystem.
///
/// Traversal is rejected by canonicalizing both sides and requiring the
/// resolved path to stay under the root. Directories first try the
/// configured index files and otherwise resolve to a listing.
fn resolve(root: &str, request_path: &str, index_files: &[String]) -> Option<Resolved> {
    // Remove leading slash and prevent directory traversal
    let clean_path = request_path.trim_start_matches('/').replace("..", "");
    let candidate = Path::new(root).join(&clean_path);

    let root_canonical = match Path::new(root).canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static root not found or inaccessible '{root}': {e}"
            ));
            return None;
        }
    };

    // Resolution failure is the common 404 case, not worth a warning
    let Ok(candidate_canonical) = candidate.canonicalize() else {
        return None;
    };
    if !candidate_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            candidate_canonical.display()
        ));
        return None;
    }

    if candidate_canonical.is_dir() {
        for index_file in index_files {
            let index_path = candidate_canonical.join(index_file);
            if index_path.is_file() {
                return Some(Resolved::File(index_path));
            }
        }
        return Some(Resolved::Listing(candidate_canonical));
    }

    Some(Resolved::File(candidate_canonical))
}

/// Serve a resolved file with `ETag` validation
async fn serve_file(ctx: &RequestContext<'_>, file_path: &Path) -> Response<Full<Bytes>> {
    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return http::build_404_response();
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    let etag = cache::generate_etag(&content);

    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }

    if ctx.access_log {
        logger::log_response(content.len());
    }

    http::build_cached_response(Bytes::from(content), content_type, &etag, ctx.is_head)
}

/// Serve an HTML listing for a directory with no index file
async fn serve_listing(ctx: &RequestContext<'_>, dir_path: &Path) -> Response<Full<Bytes>> {
    let Some(html) = render_listing(dir_path, ctx.path).await else {
        return http::build_404_response();
    };

    if ctx.access_log {
        logger::log_response(html.len());
    }

    http::build_html_response(html, ctx.is_head)
}

/// Render the directory listing page
async fn render_listing(dir_path: &Path, request_path: &str) -> Option<String> {
    let mut reader = fs::read_dir(dir_path).await.ok()?;

    let mut names: Vec<String> = Vec::new();
    while let Ok(Some(entry)) = reader.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let title = escape_html(request_path);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">\
         <title>Directory listing for {title}</title></head>\n\
         <body>\n<h1>Directory listing for {title}</h1>\n<hr>\n<ul>\n"
    );
    for name in &names {
        let escaped = escape_html(name);
        html.push_str(&format!("<li><a href=\"{escaped}\">{escaped}</a></li>\n"));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Some(html)
}

/// Escape the characters that would break out of HTML text or attributes
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
