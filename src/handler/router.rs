//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method dispatch and access
//! logging. POST requests are handed to the body-echo responder; every other
//! method falls through to the static-file responder, with HEAD responses
//! carrying headers only.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};

use crate::config::AppState;
use crate::handler::{post, static_files};
use crate::logger::{self, AccessLogEntry};

/// Request context for the static-file responder
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub access_log: bool,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let started = Instant::now();
    let method = req.method().clone();

    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        method.to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = http_version_label(req.version()).to_string();
    entry.referer = header_string(&req, "referer");
    entry.user_agent = header_string(&req, "user-agent");

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let response = if method == Method::POST {
        post::handle_post(req).await
    } else {
        let ctx = RequestContext {
            path: req.uri().path(),
            is_head: method == Method::HEAD,
            if_none_match: header_string(&req, "if-none-match"),
            access_log,
        };
        static_files::serve_path(&ctx, &state.config.static_files).await
    };

    if access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response_body_bytes(&response);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Extract a header as an owned string, skipping non-UTF-8 values
fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Exact body size of a buffered response
fn response_body_bytes(response: &Response<Full<Bytes>>) -> usize {
    let exact = Body::size_hint(response.body()).exact().unwrap_or(0);
    usize::try_from(exact).unwrap_or(usize::MAX)
}

/// Version label used in access log lines
fn http_version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
